//! CPU side of the audio DSP: its memories as seen through the controller
//! windows, plus the reset, run and semaphore controls.

use tracing::debug;

pub const DSP_MEMORY_WORDS: usize = 0x400;

pub trait Dsp {
    fn mem_read(&mut self, address: u16) -> u16;
    fn mem_write(&mut self, address: u16, value: u16);
    fn imem_read(&mut self, address: u16) -> u16;
    fn imem_write(&mut self, address: u16, value: u16);
    fn reset(&mut self);
    fn set_running(&mut self, running: bool);
    fn semaphore_read(&mut self) -> u32;
    fn semaphore_write(&mut self, value: u32);
}

/// Plain storage standing in for the DSP: memories, the run flag and the
/// semaphore, without executing anything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DspMemory {
    pub data: Vec<u16>,
    pub instructions: Vec<u16>,
    pub running: bool,
    pub semaphore: u32,
}

impl Default for DspMemory {
    fn default() -> Self {
        Self {
            data: vec![0; DSP_MEMORY_WORDS],
            instructions: vec![0; DSP_MEMORY_WORDS],
            running: false,
            semaphore: 0,
        }
    }
}

const fn slot(address: u16) -> usize {
    address as usize & (DSP_MEMORY_WORDS - 1)
}

impl Dsp for DspMemory {
    fn mem_read(&mut self, address: u16) -> u16 {
        self.data[slot(address)]
    }

    fn mem_write(&mut self, address: u16, value: u16) {
        self.data[slot(address)] = value;
    }

    fn imem_read(&mut self, address: u16) -> u16 {
        self.instructions[slot(address)]
    }

    fn imem_write(&mut self, address: u16, value: u16) {
        self.instructions[slot(address)] = value;
    }

    fn reset(&mut self) {
        debug!("DSP reset");
        self.running = false;
        self.semaphore = 0;
    }

    fn set_running(&mut self, running: bool) {
        debug!(running, "DSP run state");
        self.running = running;
    }

    fn semaphore_read(&mut self) -> u32 {
        self.semaphore
    }

    fn semaphore_write(&mut self, value: u32) {
        self.semaphore = value;
    }
}
