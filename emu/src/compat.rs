//! ROM-specific program counter patches.
//!
//! Some boot ROM builds spin on timing the core does not model. Each patch
//! names the PC and the R0/R1 values seen at the stuck spot, and the address
//! to continue at instead. Patches fire once.

use tracing::info;

use crate::cpu::registers::Registers;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PcPatch {
    pub pc: u32,
    pub r0: u32,
    pub r1: u32,
    pub target: u32,
}

/// Patches for known ROM revisions.
pub const KNOWN_PATCHES: &[PcPatch] = &[PcPatch {
    pc: 0x0009_4D60,
    r0: 0x0011_3000,
    r1: 0x0011_3000,
    target: 0x0009_E9CC,
}];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompatShim {
    patches: Vec<(PcPatch, bool)>,
}

impl Default for CompatShim {
    fn default() -> Self {
        Self::new(KNOWN_PATCHES)
    }
}

impl CompatShim {
    #[must_use]
    pub fn new(patches: &[PcPatch]) -> Self {
        Self {
            patches: patches.iter().map(|patch| (*patch, false)).collect(),
        }
    }

    /// Redirects the PC when an unfired patch matches. Called before fetch.
    pub fn apply(&mut self, registers: &mut Registers) -> bool {
        let pc = registers.program_counter();
        let (r0, r1) = (registers.register_at(0), registers.register_at(1));
        for (patch, fired) in &mut self.patches {
            if !*fired && patch.pc == pc && patch.r0 == r0 && patch.r1 == r1 {
                *fired = true;
                info!(pc, target = patch.target, "compatibility patch applied");
                registers.set_program_counter(patch.target);
                return true;
            }
        }
        false
    }

    /// Re-arms every patch.
    pub fn reset(&mut self) {
        for (_, fired) in &mut self.patches {
            *fired = false;
        }
    }
}
