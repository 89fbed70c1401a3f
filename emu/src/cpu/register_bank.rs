//! # Banked Registers for Exception Modes
//!
//! Storage for registers that are swapped out when the CPU changes mode.
//!
//! - FIQ banks R8-R14.
//! - IRQ, Supervisor, Abort and Undefined bank R13-R14.
//! - Every mode except User owns one SPSR.
//!
//! The live copy of a register is always in [`Registers`]. The bank keeps the
//! copies that are not currently visible, including User's R8-R14 whenever a
//! privileged mode has replaced them.

use crate::cpu::cpu_modes::Mode;
use crate::cpu::psr::Psr;
use crate::cpu::registers::{REG_LR, REG_SP, Registers};

/// Number of registers FIQ banks (R8-R14).
pub const FIQ_BANKED: usize = 7;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RegisterBank {
    /// User R8-R14 while another mode's copies are live.
    pub user: [u32; FIQ_BANKED],

    /// FIQ R8-R14 while FIQ is not the current mode.
    pub fiq: [u32; FIQ_BANKED],

    /// R13-R14 of IRQ mode.
    pub irq: [u32; 2],

    /// R13-R14 of Supervisor mode.
    pub svc: [u32; 2],

    /// R13-R14 of Abort mode.
    pub abt: [u32; 2],

    /// R13-R14 of Undefined mode.
    pub und: [u32; 2],

    /// Indexed by [`Mode::spsr_index`].
    pub spsr: [Psr; 5],
}

impl RegisterBank {
    const fn sp_lr(&mut self, mode: Mode) -> Option<&mut [u32; 2]> {
        match mode {
            Mode::User | Mode::Fiq => None,
            Mode::Irq => Some(&mut self.irq),
            Mode::Supervisor => Some(&mut self.svc),
            Mode::Abort => Some(&mut self.abt),
            Mode::Undefined => Some(&mut self.und),
        }
    }

    /// Moves the live registers of `from` into storage and makes `to`'s
    /// copies live. Switching to the same mode is a no-op.
    pub fn switch(&mut self, live: &mut Registers, from: Mode, to: Mode) {
        if from == to {
            return;
        }
        self.stash(live, from);
        self.load(live, to);
    }

    fn stash(&mut self, live: &mut Registers, mode: Mode) {
        let regs = live.as_mut_array();
        match mode {
            Mode::User => self.user.copy_from_slice(&regs[8..=14]),
            Mode::Fiq => self.fiq.copy_from_slice(&regs[8..=14]),
            Mode::Irq | Mode::Supervisor | Mode::Abort | Mode::Undefined => {
                // R8-R12 are shared with User in these modes.
                self.user[..5].copy_from_slice(&regs[8..=12]);
                if let Some(bank) = self.sp_lr(mode) {
                    bank.copy_from_slice(&regs[REG_SP..=REG_LR]);
                }
            }
        }
    }

    fn load(&mut self, live: &mut Registers, mode: Mode) {
        let regs = live.as_mut_array();
        match mode {
            Mode::User => regs[8..=14].copy_from_slice(&self.user),
            Mode::Fiq => regs[8..=14].copy_from_slice(&self.fiq),
            Mode::Irq | Mode::Supervisor | Mode::Abort | Mode::Undefined => {
                regs[8..=12].copy_from_slice(&self.user[..5]);
                if let Some(bank) = self.sp_lr(mode) {
                    regs[REG_SP..=REG_LR].copy_from_slice(bank);
                }
            }
        }
    }

    /// Reads User's copy of `reg` while `current` is the live mode.
    #[must_use]
    pub fn read_user(&self, live: &Registers, current: Mode, reg: usize) -> u32 {
        match user_slot(current, reg) {
            Some(slot) => self.user[slot],
            None => live.register_at(reg),
        }
    }

    /// Writes User's copy of `reg` while `current` is the live mode.
    pub fn write_user(&mut self, live: &mut Registers, current: Mode, reg: usize, value: u32) {
        match user_slot(current, reg) {
            Some(slot) => self.user[slot] = value,
            None => live.set_register_at(reg, value),
        }
    }

    #[must_use]
    pub const fn spsr(&self, mode: Mode) -> Option<Psr> {
        match mode.spsr_index() {
            Some(index) => Some(self.spsr[index]),
            None => None,
        }
    }

    /// Returns `false` (and stores nothing) for User mode.
    pub const fn set_spsr(&mut self, mode: Mode, value: Psr) -> bool {
        match mode.spsr_index() {
            Some(index) => {
                self.spsr[index] = value;
                true
            }
            None => false,
        }
    }
}

/// Where User's copy of `reg` lives when `current` is active: `Some(slot)`
/// in the stashed User bank, or `None` when the live register is User's.
const fn user_slot(current: Mode, reg: usize) -> Option<usize> {
    match (current, reg) {
        (Mode::Fiq, 8..=14) => Some(reg - 8),
        (Mode::Irq | Mode::Supervisor | Mode::Abort | Mode::Undefined, 13..=14) => Some(reg - 8),
        _ => None,
    }
}
