//! Everything on the bus besides RAM and ROM.
//!
//! [`Peripherals`] owns one instance of each device. The CLIO controller
//! needs to reach the others while it handles a register access, so each
//! access borrows them as a [`ClioPorts`] bundle.

use std::collections::VecDeque;

use crate::cpu::memory::Memory;

pub mod clio;
pub mod dma;
pub mod dsp;
pub mod fifo;
pub mod interrupt_control;
pub mod madam;
pub mod sport;
pub mod timers;
pub mod xbus;

use clio::Clio;
use dsp::{Dsp, DspMemory};
use madam::{Madam, MadamRegisters};
use sport::{DetachedSport, Sport};
use xbus::Xbus;

/// Diagnostic port: the guest writes words out and reads host-fed words in.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DiagnosticPort {
    pub input: VecDeque<u32>,
    pub output: Vec<u32>,
}

impl DiagnosticPort {
    /// Next host-supplied word, 0 once the queue is empty.
    pub fn read(&mut self) -> u32 {
        self.input.pop_front().unwrap_or(0)
    }

    pub fn write(&mut self, value: u32) {
        self.output.push(value);
    }
}

pub struct Peripherals {
    pub clio: Clio,
    pub xbus: Xbus,
    pub diagnostic: DiagnosticPort,
    pub madam: Box<dyn Madam>,
    pub sport: Box<dyn Sport>,
    pub dsp: Box<dyn Dsp>,
}

impl Default for Peripherals {
    fn default() -> Self {
        Self {
            clio: Clio::default(),
            xbus: Xbus::default(),
            diagnostic: DiagnosticPort::default(),
            madam: Box::new(MadamRegisters::default()),
            sport: Box::new(DetachedSport::default()),
            dsp: Box::new(DspMemory::default()),
        }
    }
}

/// What CLIO may touch while it handles one register access.
pub struct ClioPorts<'a> {
    pub memory: &'a mut Memory,
    pub xbus: &'a mut Xbus,
    pub madam: &'a mut dyn Madam,
    pub dsp: &'a mut dyn Dsp,
}

impl Peripherals {
    /// Splits off the controller from the devices it drives.
    pub fn clio_ports<'a>(&'a mut self, memory: &'a mut Memory) -> (&'a mut Clio, ClioPorts<'a>) {
        let Self {
            clio,
            xbus,
            madam,
            dsp,
            ..
        } = self;
        (
            clio,
            ClioPorts {
                memory,
                xbus,
                madam: madam.as_mut(),
                dsp: dsp.as_mut(),
            },
        )
    }

    /// Per-line housekeeping: timers, then the XBUS poll interrupt.
    pub fn tick_line(&mut self) {
        self.clio.tick_timers();
        self.clio.check_xbus_poll(&mut self.xbus);
    }

    pub fn reset(&mut self) {
        self.clio.reset();
        self.xbus.reset();
        self.dsp.reset();
        self.diagnostic = DiagnosticPort::default();
    }
}
