//! # ARM Instruction Decoding
//!
//! Bits 27-24 select the instruction class. Several classes share bit
//! patterns, so the decoder tests them in a fixed priority order:
//!
//! ```text
//! 27-24   test                                   class
//! 0000    word & 0x0FC000F0 == 0x00000090         Multiply (MUL/MLA)
//! 0001    word & 0x0FB00FF0 == 0x01000090         Single Data Swap
//! 00xx    opcode 8-11 with S=0                    PSR transfer (MRS/MSR)
//! 00xx    otherwise                               Data Processing
//! 01xx    word & 0x0E000010 == 0x06000010         Undefined
//! 01xx    otherwise                               Single Data Transfer
//! 100x                                            Block Data Transfer
//! 101x                                            Branch / Branch with Link
//! 110x    1110                                    Coprocessor
//! 1111                                            Software Interrupt
//! ```
//!
//! Every 32-bit word decodes to something: patterns no class claims end up
//! as `Undefined` or `Coprocessor`, both of which trap.

use std::fmt::Write;

use crate::bitwise::Bits;
use crate::cpu::arm::alu_instruction::{
    AluSecondOperandInfo, ArmModeAluInstruction, PsrKind, PsrOpKind,
};
use crate::cpu::condition::Condition;
use crate::cpu::flags::{Indexing, LoadStoreKind, Offsetting, ReadWriteKind, ShiftKind};

const MUL_MASK: u32 = 0x0FC0_00F0;
const MUL_SIGN: u32 = 0x0000_0090;
const SDS_MASK: u32 = 0x0FB0_0FF0;
const SDS_SIGN: u32 = 0x0100_0090;
const UND_MASK: u32 = 0x0E00_0010;
const UND_SIGN: u32 = 0x0600_0010;

/// Offset field of LDR/STR.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SingleDataTransferOffsetInfo {
    Immediate {
        offset: u32,
    },
    RegisterImmediate {
        shift_amount: u32,
        shift_kind: ShiftKind,
        reg_offset: u32,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArmModeInstruction {
    Multiply {
        accumulate: bool,
        set_conditions: bool,
        destination: u32,
        accumulator: u32,
        rs: u32,
        rm: u32,
    },
    SingleDataSwap {
        quantity: ReadWriteKind,
        base_register: u32,
        destination: u32,
        source: u32,
    },
    DataProcessing {
        alu_instruction: ArmModeAluInstruction,
        set_conditions: bool,
        rn: u32,
        destination: u32,
        op2: AluSecondOperandInfo,
    },
    PsrTransfer {
        psr_kind: PsrKind,
        op_kind: PsrOpKind,
    },
    SingleDataTransfer {
        kind: LoadStoreKind,
        quantity: ReadWriteKind,
        write_back: bool,
        indexing: Indexing,
        offsetting: Offsetting,
        rd: u32,
        base_register: u32,
        offset_info: SingleDataTransferOffsetInfo,
    },
    BlockDataTransfer {
        indexing: Indexing,
        offsetting: Offsetting,
        load_psr: bool,
        write_back: bool,
        kind: LoadStoreKind,
        base_register: u32,
        register_list: u16,
    },
    Branch {
        link: bool,
        /// Byte offset, already sign-extended and shifted.
        offset: i32,
    },
    SoftwareInterrupt {
        comment: u32,
    },
    Coprocessor,
    Undefined,
}

impl From<u32> for ArmModeInstruction {
    fn from(op_code: u32) -> Self {
        match op_code.get_bits(24..=27) {
            0x0 if op_code & MUL_MASK == MUL_SIGN => Self::decode_multiply(op_code),
            0x1 if op_code & SDS_MASK == SDS_SIGN => Self::SingleDataSwap {
                quantity: op_code.get_bit(22).into(),
                base_register: op_code.get_bits(16..=19),
                destination: op_code.get_bits(12..=15),
                source: op_code.get_bits(0..=3),
            },
            0x0..=0x3 => Self::decode_data_processing(op_code),
            0x4..=0x7 if op_code & UND_MASK == UND_SIGN => Self::Undefined,
            0x4..=0x7 => Self::decode_single_data_transfer(op_code),
            0x8 | 0x9 => Self::BlockDataTransfer {
                indexing: op_code.get_bit(24).into(),
                offsetting: op_code.get_bit(23).into(),
                load_psr: op_code.get_bit(22),
                write_back: op_code.get_bit(21),
                kind: op_code.get_bit(20).into(),
                base_register: op_code.get_bits(16..=19),
                register_list: op_code.get_bits(0..=15) as u16,
            },
            0xA | 0xB => Self::Branch {
                link: op_code.get_bit(24),
                offset: (op_code.get_bits(0..=23).sign_extended(24) << 2) as i32,
            },
            0xF => Self::SoftwareInterrupt {
                comment: op_code.get_bits(0..=23),
            },
            _ => Self::Coprocessor,
        }
    }
}

impl ArmModeInstruction {
    fn decode_multiply(op_code: u32) -> Self {
        Self::Multiply {
            accumulate: op_code.get_bit(21),
            set_conditions: op_code.get_bit(20),
            destination: op_code.get_bits(16..=19),
            accumulator: op_code.get_bits(12..=15),
            rs: op_code.get_bits(8..=11),
            rm: op_code.get_bits(0..=3),
        }
    }

    fn decode_data_processing(op_code: u32) -> Self {
        // Opcode and S bit together: TST/TEQ/CMP/CMN without S are the PSR
        // transfers (16, 18, 20, 22).
        match op_code.get_bits(20..=24) {
            16 => Self::PsrTransfer {
                psr_kind: PsrKind::Cpsr,
                op_kind: PsrOpKind::Mrs {
                    destination_register: op_code.get_bits(12..=15),
                },
            },
            20 => Self::PsrTransfer {
                psr_kind: PsrKind::Spsr,
                op_kind: PsrOpKind::Mrs {
                    destination_register: op_code.get_bits(12..=15),
                },
            },
            18 | 22 => Self::PsrTransfer {
                psr_kind: if op_code.get_bit(22) {
                    PsrKind::Spsr
                } else {
                    PsrKind::Cpsr
                },
                op_kind: PsrOpKind::Msr {
                    all_fields: op_code.get_bit(16),
                    source: AluSecondOperandInfo::from(op_code),
                },
            },
            _ => Self::DataProcessing {
                alu_instruction: ArmModeAluInstruction::from(op_code.get_bits(21..=24)),
                set_conditions: op_code.get_bit(20),
                rn: op_code.get_bits(16..=19),
                destination: op_code.get_bits(12..=15),
                op2: AluSecondOperandInfo::from(op_code),
            },
        }
    }

    fn decode_single_data_transfer(op_code: u32) -> Self {
        let offset_info = if op_code.get_bit(25) {
            SingleDataTransferOffsetInfo::RegisterImmediate {
                shift_amount: op_code.get_bits(7..=11),
                shift_kind: ShiftKind::from(op_code.get_bits(5..=6)),
                reg_offset: op_code.get_bits(0..=3),
            }
        } else {
            SingleDataTransferOffsetInfo::Immediate {
                offset: op_code.get_bits(0..=11),
            }
        };

        Self::SingleDataTransfer {
            kind: op_code.get_bit(20).into(),
            quantity: op_code.get_bit(22).into(),
            write_back: op_code.get_bit(21),
            indexing: op_code.get_bit(24).into(),
            offsetting: op_code.get_bit(23).into(),
            rd: op_code.get_bits(12..=15),
            base_register: op_code.get_bits(16..=19),
            offset_info,
        }
    }

    /// Assembler syntax, `condition` goes right after the base mnemonic.
    #[must_use]
    pub fn disassembler(&self, condition: Condition) -> String {
        match *self {
            Self::Multiply {
                accumulate,
                set_conditions,
                destination,
                accumulator,
                rs,
                rm,
            } => {
                let s = if set_conditions { "S" } else { "" };
                if accumulate {
                    format!("MLA{condition}{s} R{destination}, R{rm}, R{rs}, R{accumulator}")
                } else {
                    format!("MUL{condition}{s} R{destination}, R{rm}, R{rs}")
                }
            }
            Self::SingleDataSwap {
                quantity,
                base_register,
                destination,
                source,
            } => {
                let b = if quantity == ReadWriteKind::Byte { "B" } else { "" };
                format!("SWP{condition}{b} R{destination}, R{source}, [R{base_register}]")
            }
            Self::DataProcessing {
                alu_instruction,
                set_conditions,
                rn,
                destination,
                op2,
            } => {
                let s = if set_conditions && alu_instruction.writes_result() {
                    "S"
                } else if set_conditions && destination == 15 {
                    "P"
                } else {
                    ""
                };
                if !alu_instruction.writes_result() {
                    format!("{alu_instruction}{condition}{s} R{rn}, {op2}")
                } else if alu_instruction.uses_rn() {
                    format!("{alu_instruction}{condition}{s} R{destination}, R{rn}, {op2}")
                } else {
                    format!("{alu_instruction}{condition}{s} R{destination}, {op2}")
                }
            }
            Self::PsrTransfer { psr_kind, op_kind } => match op_kind {
                PsrOpKind::Mrs {
                    destination_register,
                } => format!("MRS{condition} R{destination_register}, {psr_kind}"),
                PsrOpKind::Msr { all_fields, source } => {
                    let field = if all_fields { "all" } else { "flg" };
                    format!("MSR{condition} {psr_kind}_{field}, {source}")
                }
            },
            Self::SingleDataTransfer {
                kind,
                quantity,
                write_back,
                indexing,
                offsetting,
                rd,
                base_register,
                offset_info,
            } => {
                let op = if kind == LoadStoreKind::Load { "LDR" } else { "STR" };
                let b = if quantity == ReadWriteKind::Byte { "B" } else { "" };
                let t = if indexing == Indexing::Post && write_back { "T" } else { "" };
                let sign = if offsetting == Offsetting::Up { "" } else { "-" };
                let offset = match offset_info {
                    SingleDataTransferOffsetInfo::Immediate { offset } => format!("#{sign}{offset}"),
                    SingleDataTransferOffsetInfo::RegisterImmediate {
                        shift_amount: 0,
                        shift_kind: ShiftKind::Lsl,
                        reg_offset,
                    } => format!("{sign}R{reg_offset}"),
                    SingleDataTransferOffsetInfo::RegisterImmediate {
                        shift_amount,
                        shift_kind,
                        reg_offset,
                    } => format!("{sign}R{reg_offset}, {shift_kind} #{shift_amount}"),
                };
                match indexing {
                    Indexing::Pre => {
                        let wb = if write_back { "!" } else { "" };
                        format!("{op}{condition}{b} R{rd}, [R{base_register}, {offset}]{wb}")
                    }
                    Indexing::Post => {
                        format!("{op}{condition}{b}{t} R{rd}, [R{base_register}], {offset}")
                    }
                }
            }
            Self::BlockDataTransfer {
                indexing,
                offsetting,
                load_psr,
                write_back,
                kind,
                base_register,
                register_list,
            } => {
                let op = if kind == LoadStoreKind::Load { "LDM" } else { "STM" };
                let direction = if offsetting == Offsetting::Up { "I" } else { "D" };
                let when = if indexing == Indexing::Pre { "B" } else { "A" };
                let wb = if write_back { "!" } else { "" };
                let caret = if load_psr { "^" } else { "" };
                let mut list = String::new();
                for reg in (0..16).filter(|r| register_list.get_bit(*r)) {
                    if !list.is_empty() {
                        list.push_str(", ");
                    }
                    let _ = write!(list, "R{reg}");
                }
                format!("{op}{condition}{direction}{when} R{base_register}{wb}, {{{list}}}{caret}")
            }
            Self::Branch { link, offset } => {
                let l = if link { "L" } else { "" };
                format!("B{l}{condition} {offset:+}")
            }
            Self::SoftwareInterrupt { comment } => format!("SWI{condition} #{comment:#X}"),
            Self::Coprocessor => format!("CDP{condition}"),
            Self::Undefined => "UND".to_string(),
        }
    }
}
