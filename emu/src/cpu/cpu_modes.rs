//! # Processor Modes
//!
//! The ARM60 runs in one of six modes, selected by CPSR bits 0-4.
//!
//! | Mode       | Bits    | Banked registers | SPSR |
//! |------------|---------|------------------|------|
//! | User       | `10000` | none             | no   |
//! | FIQ        | `10001` | R8-R14           | yes  |
//! | IRQ        | `10010` | R13-R14          | yes  |
//! | Supervisor | `10011` | R13-R14          | yes  |
//! | Abort      | `10111` | R13-R14          | yes  |
//! | Undefined  | `11011` | R13-R14          | yes  |
//!
//! There is no System mode on this core. Any other bit pattern is rejected
//! by [`Mode::try_from`], so a live [`Mode`] is always one of the six.

use std::fmt::Display;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Mode {
    User = 0b10000,
    Fiq = 0b10001,
    Irq = 0b10010,
    Supervisor = 0b10011,
    Abort = 0b10111,
    Undefined = 0b11011,
}

impl Mode {
    pub const ALL: [Self; 6] = [
        Self::User,
        Self::Fiq,
        Self::Irq,
        Self::Supervisor,
        Self::Abort,
        Self::Undefined,
    ];

    #[must_use]
    pub const fn is_privileged(self) -> bool {
        !matches!(self, Self::User)
    }

    /// Slot of this mode's SPSR, `None` for User which has no SPSR.
    #[must_use]
    pub const fn spsr_index(self) -> Option<usize> {
        match self {
            Self::User => None,
            Self::Fiq => Some(0),
            Self::Irq => Some(1),
            Self::Supervisor => Some(2),
            Self::Abort => Some(3),
            Self::Undefined => Some(4),
        }
    }
}

impl TryFrom<u32> for Mode {
    type Error = String;

    fn try_from(bits: u32) -> Result<Self, Self::Error> {
        match bits & 0b11111 {
            0b10000 => Ok(Self::User),
            0b10001 => Ok(Self::Fiq),
            0b10010 => Ok(Self::Irq),
            0b10011 => Ok(Self::Supervisor),
            0b10111 => Ok(Self::Abort),
            0b11011 => Ok(Self::Undefined),
            other => Err(format!("invalid mode bits {other:#07b}")),
        }
    }
}

impl Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::User => "USR",
            Self::Fiq => "FIQ",
            Self::Irq => "IRQ",
            Self::Supervisor => "SVC",
            Self::Abort => "ABT",
            Self::Undefined => "UND",
        })
    }
}
