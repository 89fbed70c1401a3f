//! # ARM Instruction Set
//!
//! Every instruction is 32 bits wide and carries a condition in its top
//! nibble. The ARM60 has no Thumb state, no halfword transfers and no long
//! multiplies.
//!
//! ```text
//! 31-28   27-25   24-0
//! [Cond] [Class] [Instruction-specific]
//! ```
//!
//! | Bits 27-24 | Class                           | Examples             |
//! |------------|---------------------------------|----------------------|
//! | 00xx       | Data Processing / PSR transfer  | ADD, CMP, MRS, MSR   |
//! | 0000       | Multiply                        | MUL, MLA             |
//! | 0001       | Single Data Swap                | SWP, SWPB            |
//! | 01xx       | Single Data Transfer            | LDR, STRB            |
//! | 100x       | Block Data Transfer             | LDMIA, STMFD         |
//! | 101x       | Branch                          | B, BL                |
//! | 110x, 1110 | Coprocessor (traps as undefined)|                      |
//! | 1111       | Software Interrupt              | SWI                  |
//!
//! - [`instructions`] decodes a word into an [`instructions::ArmModeInstruction`]
//! - [`operations`] executes it on the core
//! - [`alu_instruction`] holds the ALU ops and the barrel shifter
//! - [`mode`] pairs an instruction with its condition

#[allow(clippy::cast_possible_truncation)]
#[allow(clippy::cast_sign_loss)]
#[allow(clippy::cast_possible_wrap)]
#[allow(clippy::cast_lossless)]
pub mod alu_instruction;

#[allow(clippy::cast_possible_truncation)]
#[allow(clippy::similar_names)]
pub mod instructions;

#[allow(clippy::cast_possible_truncation)]
pub mod mode;

#[allow(clippy::cast_possible_truncation)]
#[allow(clippy::cast_sign_loss)]
#[allow(clippy::cast_possible_wrap)]
#[allow(clippy::cast_lossless)]
#[allow(clippy::similar_names)]
pub mod operations;
