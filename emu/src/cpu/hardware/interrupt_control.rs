use serde::{Deserialize, Serialize};

/// Bit 31 of the primary pending register mirrors "any secondary pending".
pub const SECONDARY_AGGREGATE: u32 = 1 << 31;

/// Primary pending bits raised by the controller itself.
pub mod primary {
    pub const VINT0: u32 = 1 << 0;
    pub const VINT1: u32 = 1 << 1;
    pub const EXINT: u32 = 1 << 2;
    pub const XBUS_DMA_DONE: u32 = 1 << 29;

    /// Completion bit of output FIFO `channel` (0..4).
    #[must_use]
    pub const fn output_fifo(channel: usize) -> u32 {
        1 << (12 + channel)
    }

    /// Completion bit of input FIFO `channel` (0..13).
    #[must_use]
    pub const fn input_fifo(channel: usize) -> u32 {
        1 << (16 + channel)
    }

    /// Underflow bit of odd timer `timer`.
    #[must_use]
    pub const fn timer(timer: usize) -> u32 {
        1 << (10 - timer / 2)
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterruptControl {
    pub primary_pending: u32,
    pub primary_enable: u32,
    pub secondary_pending: u32,
    pub secondary_enable: u32,
}

impl InterruptControl {
    pub const fn set_primary_pending(&mut self, bits: u32) {
        self.primary_pending |= bits;
        self.sync_aggregate();
    }

    pub const fn clear_primary_pending(&mut self, bits: u32) {
        self.primary_pending &= !bits;
        self.sync_aggregate();
    }

    pub const fn set_secondary_pending(&mut self, bits: u32) {
        self.secondary_pending |= bits;
        self.sync_aggregate();
    }

    pub const fn clear_secondary_pending(&mut self, bits: u32) {
        self.secondary_pending &= !bits;
        self.sync_aggregate();
    }

    pub const fn set_primary_enable(&mut self, bits: u32) {
        self.primary_enable |= bits;
    }

    pub const fn clear_primary_enable(&mut self, bits: u32) {
        self.primary_enable &= !bits;
    }

    pub const fn set_secondary_enable(&mut self, bits: u32) {
        self.secondary_enable |= bits;
    }

    pub const fn clear_secondary_enable(&mut self, bits: u32) {
        self.secondary_enable &= !bits;
    }

    /// Raises `primary` and `secondary` pending bits in one go.
    pub const fn generate_fiq(&mut self, primary: u32, secondary: u32) {
        self.primary_pending |= primary;
        self.secondary_pending |= secondary;
        self.sync_aggregate();
    }

    #[must_use]
    pub const fn fiq_needed(&self) -> bool {
        (self.primary_pending & self.primary_enable) != 0
            || (self.secondary_pending & self.secondary_enable) != 0
    }

    /// Recomputes bit 31 of the primary pending register from the secondary
    /// pending register.
    pub const fn sync_aggregate(&mut self) {
        if self.secondary_pending == 0 {
            self.primary_pending &= !SECONDARY_AGGREGATE;
        } else {
            self.primary_pending |= SECONDARY_AGGREGATE;
        }
    }
}
