//! # Programmable Timers
//!
//! Sixteen 16-bit down-counters. Each one is configured by a 4-bit nibble in
//! the timer control word (timer 0 in the lowest nibble):
//!
//! | Bit | Meaning                                        |
//! |-----|------------------------------------------------|
//! | 0   | decrement enable                               |
//! | 1   | reload from backup on underflow                |
//! | 2   | cascade: count the previous timer's underflows |
//! | 3   | alternate reload select (stored, unused)       |
//!
//! Two adjacent timers with the upper one cascading form a 32-bit counter.

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::cpu::hardware::interrupt_control::primary;

pub const TIMER_COUNT: usize = 16;

const DECREMENT: u64 = 0b0001;
const RELOAD: u64 = 0b0010;
const CASCADE: u64 = 0b0100;

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timers {
    pub counter: [u16; TIMER_COUNT],
    pub backup: [u16; TIMER_COUNT],

    /// 16 nibbles, see module docs.
    pub control: u64,
}

impl Timers {
    #[must_use]
    pub const fn flags(&self, timer: usize) -> u64 {
        (self.control >> (timer * 4)) & 0xF
    }

    /// `high` selects timers 8-15, otherwise 0-7.
    pub const fn set_control(&mut self, high: bool, bits: u32) {
        self.control |= (bits as u64) << if high { 32 } else { 0 };
    }

    pub const fn clear_control(&mut self, high: bool, bits: u32) {
        self.control &= !((bits as u64) << if high { 32 } else { 0 });
    }

    #[must_use]
    pub const fn control_word(&self, high: bool) -> u32 {
        (self.control >> if high { 32 } else { 0 }) as u32
    }

    /// Advances every timer once, in order. Returns the primary pending bits
    /// raised by underflowing odd timers.
    pub fn tick(&mut self) -> u32 {
        let mut raised = 0;
        let mut carry = 1;
        for timer in 0..TIMER_COUNT {
            let flags = self.flags(timer);
            if flags & DECREMENT == 0 {
                carry = 0;
                continue;
            }

            let step = if flags & CASCADE == 0 { 1 } else { carry };
            let (value, underflow) = self.counter[timer].overflowing_sub(step);
            self.counter[timer] = value;

            if underflow {
                carry = 1;
                if timer % 2 == 1 {
                    trace!(timer, "timer underflow");
                    raised |= primary::timer(timer);
                }
                if flags & RELOAD == 0 {
                    self.control &= !(DECREMENT << (timer * 4));
                } else {
                    self.counter[timer] = self.backup[timer];
                }
            } else {
                carry = 0;
            }
        }
        raised
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn check_single_timer_reload() {
        let mut timers = Timers::default();
        timers.counter[1] = 1;
        timers.backup[1] = 5;
        timers.set_control(false, 0x30);

        assert_eq!(timers.tick(), 0);
        assert_eq!(timers.counter[1], 0);
        assert_eq!(timers.tick(), primary::timer(1));
        assert_eq!(timers.counter[1], 5);
        assert_eq!(timers.flags(1), 0b0011);
    }

    #[test]
    fn check_underflow_without_reload_stops() {
        let mut timers = Timers::default();
        timers.set_control(false, 0x1);
        assert_eq!(timers.tick(), 0);
        assert_eq!(timers.counter[0], 0xFFFF);
        assert_eq!(timers.flags(0), 0);
        timers.tick();
        assert_eq!(timers.counter[0], 0xFFFF);
    }

    #[test]
    fn check_cascade_pair() {
        let mut timers = Timers::default();
        // Timer 2 counts lines, timer 3 counts timer 2 underflows: a 32-bit
        // counter starting at 0x0001_0001.
        timers.counter[2] = 1;
        timers.counter[3] = 1;
        timers.backup[2] = 0xFFFF;
        timers.backup[3] = 0xFFFF;
        timers.set_control(false, 0x7300);

        let mut fired = Vec::new();
        for tick in 0..0x1_0003 {
            let raised = timers.tick();
            if raised != 0 {
                fired.push((tick, raised));
            }
        }
        // Counter reaches -1 after 0x1_0002 ticks, the low half underflows
        // twice along the way but the pair only once.
        assert_eq!(fired, vec![(0x1_0001, primary::timer(3))]);
        assert_eq!(timers.counter[3], 0xFFFF);
        assert_eq!(timers.counter[2], 0xFFFE);
    }

    #[test]
    fn check_control_words() {
        let mut timers = Timers::default();
        timers.set_control(true, 0xF000_0001);
        assert_eq!(timers.flags(8), 1);
        assert_eq!(timers.flags(15), 0xF);
        timers.clear_control(true, 0x8000_0000);
        assert_eq!(timers.control_word(true), 0x7000_0001);
        assert_eq!(timers.control_word(false), 0);
    }
}
