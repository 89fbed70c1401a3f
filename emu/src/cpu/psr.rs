//! # Program Status Registers (CPSR and SPSR)
//!
//! ```text
//! 31 30 29 28 27        8 7 6 5 4   0
//! ┌──┬──┬──┬──┬──────────┬─┬─┬─┬─────┐
//! │N │Z │C │V │ Reserved │I│F│-│Mode │
//! └──┴──┴──┴──┴──────────┴─┴─┴─┴─────┘
//! ```
//!
//! - **Flags (28-31)**: tested through [`condition`](super::condition)
//! - **I/F bits (7/6)**: IRQ/FIQ disable
//! - **Mode (0-4)**: see [`cpu_modes`](super::cpu_modes)
//!
//! An SPSR is plain storage and may hold any bit pattern. The CPSR only ever
//! holds a valid mode, `Arm60` rejects invalid mode bits before they land.

use crate::bitwise::Bits;
use crate::cpu::arm::alu_instruction::ArithmeticOpResult;
use crate::cpu::cpu_modes::Mode;

pub const FLAGS_MASK: u32 = 0xF000_0000;
pub const MODE_MASK: u32 = 0x1F;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Psr(u32);

impl Psr {
    /// N, Z, C, V as a nibble, the index into the condition table.
    #[must_use]
    pub const fn flags(self) -> u32 {
        self.0 >> 28
    }

    /// N => Bit 31
    #[must_use]
    pub fn sign_flag(self) -> bool {
        self.0.get_bit(31)
    }

    /// Z => Bit 30
    #[must_use]
    pub fn zero_flag(self) -> bool {
        self.0.get_bit(30)
    }

    /// C => Bit 29
    #[must_use]
    pub fn carry_flag(self) -> bool {
        self.0.get_bit(29)
    }

    /// V => Bit 28
    #[must_use]
    pub fn overflow_flag(self) -> bool {
        self.0.get_bit(28)
    }

    /// I => Bit 7
    #[must_use]
    pub fn irq_disable(self) -> bool {
        self.0.get_bit(7)
    }

    /// F => Bit 6
    #[must_use]
    pub fn fiq_disable(self) -> bool {
        self.0.get_bit(6)
    }

    #[must_use]
    pub fn mode(self) -> Option<Mode> {
        Mode::try_from(self.0).ok()
    }

    pub fn set_sign_flag(&mut self, value: bool) {
        self.0.set_bit(31, value);
    }

    pub fn set_zero_flag(&mut self, value: bool) {
        self.0.set_bit(30, value);
    }

    pub fn set_carry_flag(&mut self, value: bool) {
        self.0.set_bit(29, value);
    }

    pub fn set_overflow_flag(&mut self, value: bool) {
        self.0.set_bit(28, value);
    }

    pub fn set_irq_disable(&mut self, value: bool) {
        self.0.set_bit(7, value);
    }

    pub fn set_fiq_disable(&mut self, value: bool) {
        self.0.set_bit(6, value);
    }

    pub const fn set_mode(&mut self, mode: Mode) {
        self.0 = (self.0 & !MODE_MASK) | mode as u32;
    }

    /// Replaces N, Z, C, V and leaves the control byte alone.
    pub const fn set_flag_bits(&mut self, value: u32) {
        self.0 = (self.0 & !FLAGS_MASK) | (value & FLAGS_MASK);
    }

    /// Flags from an arithmetic op, all four are written.
    pub fn set_flags(&mut self, op_result: &ArithmeticOpResult) {
        self.set_sign_flag(op_result.sign);
        self.set_zero_flag(op_result.zero);
        self.set_carry_flag(op_result.carry);
        self.set_overflow_flag(op_result.overflow);
    }

    /// Flags from a logical op: V is left unchanged.
    pub fn set_logical_flags(&mut self, op_result: &ArithmeticOpResult) {
        self.set_sign_flag(op_result.sign);
        self.set_zero_flag(op_result.zero);
        self.set_carry_flag(op_result.carry);
    }
}

impl From<Mode> for Psr {
    fn from(mode: Mode) -> Self {
        Self(mode as u32)
    }
}

impl From<u32> for Psr {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl From<Psr> for u32 {
    fn from(psr: Psr) -> Self {
        psr.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn check_flags_nibble() {
        let mut cpsr = Psr::from(Mode::User);
        cpsr.set_sign_flag(true);
        cpsr.set_overflow_flag(true);
        assert_eq!(cpsr.flags(), 0b1001);
        assert!(!cpsr.zero_flag());
        assert!(!cpsr.carry_flag());
    }

    #[test]
    fn check_set_mode_keeps_flags() {
        let mut cpsr = Psr::from(0xF000_00D3);
        cpsr.set_mode(Mode::Fiq);
        assert_eq!(u32::from(cpsr), 0xF000_00D1);
        assert_eq!(cpsr.mode(), Some(Mode::Fiq));
    }

    #[test]
    fn check_flag_bits_only() {
        let mut psr = Psr::from(0x0000_0013);
        psr.set_flag_bits(0xA000_00FF);
        assert_eq!(u32::from(psr), 0xA000_0013);
    }

    #[test]
    fn check_interrupt_disables() {
        let mut psr = Psr::default();
        psr.set_irq_disable(true);
        assert!(psr.irq_disable());
        assert!(!psr.fiq_disable());
        psr.set_fiq_disable(true);
        assert_eq!(u32::from(psr), 0xC0);
    }

    #[test]
    fn check_invalid_mode_reported() {
        assert_eq!(Psr::from(0x1F).mode(), None);
    }
}
