//! # Condition Codes
//!
//! Every ARM instruction carries a 4-bit condition in bits 28-31. The
//! instruction only executes when the condition holds for the current
//! N, Z, C, V flags.
//!
//! Evaluation is a single table lookup: row `c` of [`CONDITION_TABLE`] has bit
//! `f` set when condition `c` passes for the flag nibble `f = NZCV`
//! (N is bit 3, V is bit 0).
//!
//! | Code | Suffix | Passes when       |
//! |------|--------|-------------------|
//! | 0x0  | EQ     | Z=1               |
//! | 0x1  | NE     | Z=0               |
//! | 0x2  | CS     | C=1               |
//! | 0x3  | CC     | C=0               |
//! | 0x4  | MI     | N=1               |
//! | 0x5  | PL     | N=0               |
//! | 0x6  | VS     | V=1               |
//! | 0x7  | VC     | V=0               |
//! | 0x8  | HI     | C=1 and Z=0       |
//! | 0x9  | LS     | C=0 or Z=1        |
//! | 0xA  | GE     | N=V               |
//! | 0xB  | LT     | N!=V              |
//! | 0xC  | GT     | Z=0 and N=V       |
//! | 0xD  | LE     | Z=1 or N!=V       |
//! | 0xE  | AL     | always            |
//! | 0xF  | NV     | never             |

use std::fmt::Display;

/// Row `c`, bit `f`: condition `c` passes for flag nibble `f`.
pub const CONDITION_TABLE: [u16; 16] = [
    0xF0F0, // EQ
    0x0F0F, // NE
    0xCCCC, // CS
    0x3333, // CC
    0xFF00, // MI
    0x00FF, // PL
    0xAAAA, // VS
    0x5555, // VC
    0x0C0C, // HI
    0xF3F3, // LS
    0xAA55, // GE
    0x55AA, // LT
    0x0A05, // GT
    0xF5FA, // LE
    0xFFFF, // AL
    0x0000, // NV
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Condition {
    EQ = 0x0,
    NE = 0x1,
    CS = 0x2,
    CC = 0x3,
    MI = 0x4,
    PL = 0x5,
    VS = 0x6,
    VC = 0x7,
    HI = 0x8,
    LS = 0x9,
    GE = 0xA,
    LT = 0xB,
    GT = 0xC,
    LE = 0xD,
    AL = 0xE,
    NV = 0xF,
}

impl Condition {
    /// `flags` is the CPSR shifted right by 28.
    #[must_use]
    pub const fn passes(self, flags: u32) -> bool {
        (CONDITION_TABLE[self as usize] >> (flags & 0xF)) & 1 == 1
    }
}

impl From<u8> for Condition {
    fn from(value: u8) -> Self {
        match value & 0xF {
            0x0 => Self::EQ,
            0x1 => Self::NE,
            0x2 => Self::CS,
            0x3 => Self::CC,
            0x4 => Self::MI,
            0x5 => Self::PL,
            0x6 => Self::VS,
            0x7 => Self::VC,
            0x8 => Self::HI,
            0x9 => Self::LS,
            0xA => Self::GE,
            0xB => Self::LT,
            0xC => Self::GT,
            0xD => Self::LE,
            0xE => Self::AL,
            _ => Self::NV,
        }
    }
}

impl Display for Condition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EQ => f.write_str("EQ"),
            Self::NE => f.write_str("NE"),
            Self::CS => f.write_str("CS"),
            Self::CC => f.write_str("CC"),
            Self::MI => f.write_str("MI"),
            Self::PL => f.write_str("PL"),
            Self::VS => f.write_str("VS"),
            Self::VC => f.write_str("VC"),
            Self::HI => f.write_str("HI"),
            Self::LS => f.write_str("LS"),
            Self::GE => f.write_str("GE"),
            Self::LT => f.write_str("LT"),
            Self::GT => f.write_str("GT"),
            Self::LE => f.write_str("LE"),
            // AL is the default and is omitted from the mnemonic.
            Self::AL => Ok(()),
            Self::NV => f.write_str("NV"),
        }
    }
}
