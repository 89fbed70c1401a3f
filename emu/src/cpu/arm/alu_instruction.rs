use std::fmt::Display;

use crate::cpu::flags::ShiftKind;

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum ArmModeAluInstruction {
    And = 0x0,
    Eor = 0x1,
    Sub = 0x2,
    Rsb = 0x3,
    Add = 0x4,
    Adc = 0x5,
    Sbc = 0x6,
    Rsc = 0x7,
    Tst = 0x8,
    Teq = 0x9,
    Cmp = 0xA,
    Cmn = 0xB,
    Orr = 0xC,
    Mov = 0xD,
    Bic = 0xE,
    Mvn = 0xF,
}

impl Display for ArmModeAluInstruction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::And => f.write_str("AND"),
            Self::Eor => f.write_str("EOR"),
            Self::Sub => f.write_str("SUB"),
            Self::Rsb => f.write_str("RSB"),
            Self::Add => f.write_str("ADD"),
            Self::Adc => f.write_str("ADC"),
            Self::Sbc => f.write_str("SBC"),
            Self::Rsc => f.write_str("RSC"),
            Self::Tst => f.write_str("TST"),
            Self::Teq => f.write_str("TEQ"),
            Self::Cmp => f.write_str("CMP"),
            Self::Cmn => f.write_str("CMN"),
            Self::Orr => f.write_str("ORR"),
            Self::Mov => f.write_str("MOV"),
            Self::Bic => f.write_str("BIC"),
            Self::Mvn => f.write_str("MVN"),
        }
    }
}

#[derive(Eq, PartialEq, Debug)]
pub enum AluInstructionKind {
    Logical,
    Arithmetic,
}

impl ArmModeAluInstruction {
    /// Logical ops take C from the barrel shifter and leave V alone.
    #[must_use]
    pub const fn kind(self) -> AluInstructionKind {
        match self {
            Self::And | Self::Eor | Self::Tst | Self::Teq | Self::Orr | Self::Mov | Self::Bic | Self::Mvn => {
                AluInstructionKind::Logical
            }
            Self::Sub | Self::Rsb | Self::Add | Self::Adc | Self::Sbc | Self::Rsc | Self::Cmp | Self::Cmn => {
                AluInstructionKind::Arithmetic
            }
        }
    }

    /// TST, TEQ, CMP and CMN only update flags.
    #[must_use]
    pub const fn writes_result(self) -> bool {
        !matches!(self, Self::Tst | Self::Teq | Self::Cmp | Self::Cmn)
    }

    /// MOV and MVN ignore Rn.
    #[must_use]
    pub const fn uses_rn(self) -> bool {
        !matches!(self, Self::Mov | Self::Mvn)
    }
}

impl From<u32> for ArmModeAluInstruction {
    fn from(alu_op_code: u32) -> Self {
        match alu_op_code & 0xF {
            0x0 => Self::And,
            0x1 => Self::Eor,
            0x2 => Self::Sub,
            0x3 => Self::Rsb,
            0x4 => Self::Add,
            0x5 => Self::Adc,
            0x6 => Self::Sbc,
            0x7 => Self::Rsc,
            0x8 => Self::Tst,
            0x9 => Self::Teq,
            0xA => Self::Cmp,
            0xB => Self::Cmn,
            0xC => Self::Orr,
            0xD => Self::Mov,
            0xE => Self::Bic,
            _ => Self::Mvn,
        }
    }
}

/// How the shift amount of a register operand is supplied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShiftOperator {
    /// 5-bit amount encoded in the instruction.
    Immediate(u32),

    /// Bottom byte of the given register.
    Register(u32),
}

/// Second operand of a data processing instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AluSecondOperandInfo {
    /// 8-bit `base` rotated right by `shift` (already doubled).
    Immediate { base: u32, shift: u32 },
    Register {
        shift_op: ShiftOperator,
        shift_kind: ShiftKind,
        register: u32,
    },
}

impl From<u32> for AluSecondOperandInfo {
    /// Decodes bits 0-11, `op_code` bit 25 selects the immediate form.
    fn from(op_code: u32) -> Self {
        if op_code & (1 << 25) != 0 {
            Self::Immediate {
                base: op_code & 0xFF,
                shift: ((op_code >> 8) & 0xF) * 2,
            }
        } else {
            let shift_op = if op_code & (1 << 4) != 0 {
                ShiftOperator::Register((op_code >> 8) & 0xF)
            } else {
                ShiftOperator::Immediate((op_code >> 7) & 0x1F)
            };
            Self::Register {
                shift_op,
                shift_kind: ShiftKind::from((op_code >> 5) & 0b11),
                register: op_code & 0xF,
            }
        }
    }
}

impl Display for AluSecondOperandInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match *self {
            Self::Immediate { base, shift } => write!(f, "#{}", base.rotate_right(shift)),
            Self::Register {
                shift_op: ShiftOperator::Immediate(0),
                shift_kind: ShiftKind::Lsl,
                register,
            } => write!(f, "R{register}"),
            Self::Register {
                shift_op: ShiftOperator::Immediate(0),
                shift_kind: ShiftKind::Ror,
                register,
            } => write!(f, "R{register}, RRX"),
            Self::Register {
                shift_op: ShiftOperator::Immediate(amount),
                shift_kind,
                register,
            } => {
                let amount = if amount == 0 { 32 } else { amount };
                write!(f, "R{register}, {shift_kind} #{amount}")
            }
            Self::Register {
                shift_op: ShiftOperator::Register(rs),
                shift_kind,
                register,
            } => write!(f, "R{register}, {shift_kind} R{rs}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PsrKind {
    Cpsr,
    Spsr,
}

impl Display for PsrKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cpsr => f.write_str("CPSR"),
            Self::Spsr => f.write_str("SPSR"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PsrOpKind {
    Mrs {
        destination_register: u32,
    },
    Msr {
        /// Bit 16: write control bits too, otherwise flags only.
        all_fields: bool,
        source: AluSecondOperandInfo,
    },
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ArithmeticOpResult {
    pub result: u32,
    pub carry: bool,
    pub overflow: bool,
    pub sign: bool,
    pub zero: bool,
}

impl ArithmeticOpResult {
    /// Result of a logical op, `carry` is the shifter carry-out.
    #[must_use]
    pub const fn logical(result: u32, carry: bool) -> Self {
        Self {
            result,
            carry,
            overflow: false,
            sign: result >> 31 == 1,
            zero: result == 0,
        }
    }
}

/// `a + b + carry_in` with ARM carry and overflow semantics. Subtraction is
/// `add_with_carry(a, !b, true)`, which yields C=1 when no borrow occurs.
#[must_use]
pub const fn add_with_carry(a: u32, b: u32, carry_in: bool) -> ArithmeticOpResult {
    let wide = a as u64 + b as u64 + carry_in as u64;
    let result = wide as u32;
    ArithmeticOpResult {
        result,
        carry: wide > u32::MAX as u64,
        overflow: ((a ^ result) & (b ^ result)) >> 31 == 1,
        sign: result >> 31 == 1,
        zero: result == 0,
    }
}

/// Output of the barrel shifter.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ShiftResult {
    pub value: u32,
    pub carry: bool,
}

/// Shift with the amount taken from the 5-bit instruction field, where an
/// amount of 0 encodes LSR #32, ASR #32 and RRX.
#[must_use]
pub const fn shift_immediate(kind: ShiftKind, amount: u32, rm: u32, carry: bool) -> ShiftResult {
    match (kind, amount) {
        (ShiftKind::Lsl, 0) => ShiftResult { value: rm, carry },
        (ShiftKind::Lsr | ShiftKind::Asr, 0) => shift(kind, 32, rm, carry),
        (ShiftKind::Ror, 0) => ShiftResult {
            value: ((carry as u32) << 31) | (rm >> 1),
            carry: rm & 1 == 1,
        },
        _ => shift(kind, amount, rm, carry),
    }
}

/// Shift by an arbitrary amount, as used for register-specified shifts.
/// An amount of 0 passes `rm` and `carry` through unchanged.
#[must_use]
pub const fn shift(kind: ShiftKind, amount: u32, rm: u32, carry: bool) -> ShiftResult {
    if amount == 0 {
        return ShiftResult { value: rm, carry };
    }
    match kind {
        ShiftKind::Lsl => match amount {
            1..=31 => ShiftResult {
                value: rm << amount,
                carry: (rm >> (32 - amount)) & 1 == 1,
            },
            32 => ShiftResult {
                value: 0,
                carry: rm & 1 == 1,
            },
            _ => ShiftResult {
                value: 0,
                carry: false,
            },
        },
        ShiftKind::Lsr => match amount {
            1..=31 => ShiftResult {
                value: rm >> amount,
                carry: (rm >> (amount - 1)) & 1 == 1,
            },
            32 => ShiftResult {
                value: 0,
                carry: rm >> 31 == 1,
            },
            _ => ShiftResult {
                value: 0,
                carry: false,
            },
        },
        ShiftKind::Asr => match amount {
            1..=31 => ShiftResult {
                value: ((rm as i32) >> amount) as u32,
                carry: (rm >> (amount - 1)) & 1 == 1,
            },
            _ => ShiftResult {
                value: ((rm as i32) >> 31) as u32,
                carry: rm >> 31 == 1,
            },
        },
        ShiftKind::Ror => {
            let amount = amount & 31;
            if amount == 0 {
                ShiftResult {
                    value: rm,
                    carry: rm >> 31 == 1,
                }
            } else {
                ShiftResult {
                    value: rm.rotate_right(amount),
                    carry: (rm >> (amount - 1)) & 1 == 1,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_logical_instruction() {
        let instruction_kind = ArmModeAluInstruction::from(9).kind();
        assert_eq!(instruction_kind, AluInstructionKind::Logical);
    }

    #[test]
    fn test_arithmetic_instruction() {
        let instruction_kind = ArmModeAluInstruction::from(2).kind();
        assert_eq!(instruction_kind, AluInstructionKind::Arithmetic);
    }

    #[test]
    fn check_add_overflow_into_sign() {
        let r = add_with_carry(0x7FFF_FFFF, 1, false);
        assert_eq!(r.result, 0x8000_0000);
        assert!(r.overflow);
        assert!(r.sign);
        assert!(!r.zero);
        assert!(!r.carry);
    }

    #[test]
    fn check_sub_without_borrow_sets_carry() {
        let r = add_with_carry(5, !3, true);
        assert_eq!(r.result, 2);
        assert!(r.carry);
        assert!(!r.overflow);

        let r = add_with_carry(3, !5, true);
        assert_eq!(r.result, (-2_i32) as u32);
        assert!(!r.carry);
        assert!(r.sign);
    }

    #[test]
    fn check_lsl_by_32() {
        let r = shift(ShiftKind::Lsl, 32, 0x8000_0001, false);
        assert_eq!(r, ShiftResult { value: 0, carry: true });
        let r = shift(ShiftKind::Lsl, 33, 0xFFFF_FFFF, true);
        assert_eq!(r, ShiftResult { value: 0, carry: false });
    }

    #[test]
    fn check_rrx() {
        let r = shift_immediate(ShiftKind::Ror, 0, 0b101, true);
        assert_eq!(r.value, 0x8000_0002);
        assert!(r.carry);

        let r = shift_immediate(ShiftKind::Ror, 0, 0b100, false);
        assert_eq!(r.value, 0b10);
        assert!(!r.carry);
    }

    #[test]
    fn check_immediate_zero_encodings() {
        assert_eq!(
            shift_immediate(ShiftKind::Lsr, 0, 0x8000_0000, false),
            ShiftResult { value: 0, carry: true }
        );
        assert_eq!(
            shift_immediate(ShiftKind::Asr, 0, 0x8000_0000, false),
            ShiftResult {
                value: 0xFFFF_FFFF,
                carry: true
            }
        );
        assert_eq!(
            shift_immediate(ShiftKind::Lsl, 0, 0x1234, true),
            ShiftResult { value: 0x1234, carry: true }
        );
    }

    #[test]
    fn check_register_shift_by_zero_keeps_carry() {
        for kind in [ShiftKind::Lsl, ShiftKind::Lsr, ShiftKind::Asr, ShiftKind::Ror] {
            assert_eq!(
                shift(kind, 0, 0xF0, true),
                ShiftResult { value: 0xF0, carry: true }
            );
        }
    }

    #[test]
    fn check_ror() {
        let r = shift(ShiftKind::Ror, 4, 0x0000_00F1, false);
        assert_eq!(r.value, 0x1000_000F);
        assert!(!r.carry);
        let r = shift(ShiftKind::Ror, 32, 0x8000_0000, false);
        assert_eq!(r, ShiftResult { value: 0x8000_0000, carry: true });
    }

    #[test]
    fn check_operand_display() {
        assert_eq!(
            AluSecondOperandInfo::Immediate { base: 0xFF, shift: 8 }.to_string(),
            "#4278190080"
        );
        assert_eq!(
            AluSecondOperandInfo::from(0x0000_0211).to_string(),
            "R1, LSL R2"
        );
    }
}
