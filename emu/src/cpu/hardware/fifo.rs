//! # Serial FIFO Channels
//!
//! 13 input channels (RAM to device) and 4 output channels (device to RAM)
//! move one 16-bit element per access. Each channel has a current buffer and
//! a "next" buffer that takes over when the current one runs dry.
//!
//! Register layout per channel, 16 bytes apart:
//!
//! | Offset | Read                 | Write                   |
//! |--------|----------------------|-------------------------|
//! | +0x0   | current pointer      | current start address   |
//! | +0x4   | remaining bytes      | current length          |
//! | +0x8   | next start address   | next start address      |
//! | +0xC   | next length          | next length             |
//!
//! A buffer is armed while its start address is non-zero.

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::cpu::memory::{Memory, RAM_END};

pub const INPUT_CHANNELS: usize = 13;
pub const OUTPUT_CHANNELS: usize = 4;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FifoChannel {
    pub start_address: u32,
    pub start_length: u32,

    /// Bytes already moved from the current buffer.
    pub index: u32,
    pub next_address: u32,
    pub next_length: u32,
}

/// What a FIFO access did besides moving data.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FifoEvent {
    /// The current buffer ran dry during this access.
    pub exhausted: bool,
}

impl FifoChannel {
    #[must_use]
    pub const fn armed(&self) -> bool {
        self.start_address != 0
    }

    #[must_use]
    pub const fn remaining(&self) -> i64 {
        self.start_length as i64 - self.index as i64
    }

    #[must_use]
    pub const fn current_address(&self) -> u32 {
        self.start_address.wrapping_add(self.index)
    }

    /// Register read at `offset` (0x0, 0x4, 0x8 or 0xC).
    #[must_use]
    pub const fn read_register(&self, offset: u32) -> u32 {
        match offset & 0xC {
            0x0 => self.current_address(),
            0x4 => {
                let remaining = self.remaining();
                if remaining > 0 { remaining as u32 } else { 0 }
            }
            0x8 => self.next_address,
            _ => self.next_length,
        }
    }

    /// Register write at `offset`. A zero length disarms that buffer.
    pub const fn write_register(&mut self, offset: u32, value: u32) {
        match offset & 0xC {
            0x0 => {
                self.start_address = value;
                self.index = 0;
            }
            0x4 => {
                self.start_length = value;
                self.index = 0;
                if value == 0 {
                    self.start_address = 0;
                }
            }
            0x8 => self.next_address = value,
            _ => {
                self.next_length = value;
                if value == 0 {
                    self.next_address = 0;
                }
            }
        }
    }

    /// Moves the cursor to the next buffer when the current one is used up.
    /// Returns `false` when the channel ends up disarmed.
    fn roll_over(&mut self, event: &mut FifoEvent) -> bool {
        if self.remaining() > 0 {
            return true;
        }
        self.index = 0;
        event.exhausted = true;
        if self.next_address == 0 {
            self.start_address = 0;
            false
        } else {
            self.start_address = self.next_address;
            self.start_length = self.next_length;
            true
        }
    }

    /// Pulls one element from RAM. A disarmed channel yields 0.
    pub fn read(&mut self, memory: &Memory) -> (u16, FifoEvent) {
        let mut event = FifoEvent::default();
        if !self.armed() || !self.roll_over(&mut event) {
            return (0, event);
        }
        let value = memory.read_ram_half_word(self.current_address() % RAM_END);
        self.index += 2;
        (value, event)
    }

    /// Pushes one element to RAM. A disarmed channel drops it.
    pub fn write(&mut self, value: u16, memory: &mut Memory) -> FifoEvent {
        let mut event = FifoEvent::default();
        if !self.armed() || !self.roll_over(&mut event) {
            trace!(value, "FIFO write dropped");
            return event;
        }
        memory.write_ram_half_word(self.current_address() % RAM_END, value);
        self.index += 2;
        event
    }
}
