use tracing::debug;

use crate::bitwise::Bits;
use crate::cpu::arm::alu_instruction::{
    AluInstructionKind, AluSecondOperandInfo, ArithmeticOpResult, ArmModeAluInstruction, PsrKind,
    PsrOpKind, ShiftOperator, ShiftResult, add_with_carry, shift, shift_immediate,
};
use crate::cpu::arm::instructions::{ArmModeInstruction, SingleDataTransferOffsetInfo};
use crate::cpu::arm::mode::ArmModeOpcode;
use crate::cpu::arm60::{Arm60, ICYCLE, NCYCLE, SCYCLE, SWI_VECTOR, UNDEFINED_VECTOR};
use crate::cpu::cpu_modes::Mode;
use crate::cpu::flags::{Indexing, LoadStoreKind, Offsetting, ReadWriteKind};
use crate::cpu::hardware::Peripherals;
use crate::cpu::psr::Psr;
use crate::cpu::registers::{REG_LR, REG_PROGRAM_COUNTER};

/// How far past the advanced PC an `R15` operand reads.
const PC_AHEAD: u32 = 4;

/// Same, when the operand is shifted by a register.
const PC_AHEAD_SHIFTED: u32 = 8;

fn listed(register_list: u16) -> impl Iterator<Item = u32> {
    (0..16).filter(move |reg| register_list & (1 << reg) != 0)
}

impl Arm60 {
    pub(crate) fn execute(&mut self, io: &mut Peripherals, op_code: ArmModeOpcode) {
        match op_code.instruction {
            ArmModeInstruction::DataProcessing {
                alu_instruction,
                set_conditions,
                rn,
                destination,
                op2,
            } => self.data_processing(alu_instruction, set_conditions, rn, destination, op2),
            ArmModeInstruction::PsrTransfer { psr_kind, op_kind } => {
                self.psr_transfer(psr_kind, op_kind);
            }
            ArmModeInstruction::Multiply {
                accumulate,
                set_conditions,
                destination,
                accumulator,
                rs,
                rm,
            } => self.multiply(accumulate, set_conditions, destination, accumulator, rs, rm),
            ArmModeInstruction::SingleDataSwap {
                quantity,
                base_register,
                destination,
                source,
            } => self.single_data_swap(io, quantity, base_register, destination, source),
            ArmModeInstruction::SingleDataTransfer {
                kind,
                quantity,
                write_back,
                indexing,
                offsetting,
                rd,
                base_register,
                offset_info,
            } => self.single_data_transfer(
                io,
                kind,
                quantity,
                write_back,
                indexing,
                offsetting,
                rd,
                base_register,
                offset_info,
            ),
            ArmModeInstruction::BlockDataTransfer {
                indexing,
                offsetting,
                load_psr,
                write_back,
                kind,
                base_register,
                register_list,
            } => self.block_data_transfer(
                io,
                indexing,
                offsetting,
                load_psr,
                write_back,
                kind,
                base_register,
                register_list,
            ),
            ArmModeInstruction::Branch { link, offset } => self.branch(link, offset),
            ArmModeInstruction::SoftwareInterrupt { comment } => self.software_interrupt(comment),
            ArmModeInstruction::Coprocessor | ArmModeInstruction::Undefined => {
                self.undefined(*op_code);
            }
        }
    }

    /// Value of `reg` as an operand. `R15` reads `pc_ahead` bytes past the
    /// advanced PC.
    fn operand(&self, reg: u32, pc_ahead: u32) -> u32 {
        if reg as usize == REG_PROGRAM_COUNTER {
            self.registers.program_counter().wrapping_add(pc_ahead)
        } else {
            self.registers.register_at(reg as usize)
        }
    }

    /// Writing the PC costs a pipeline refill.
    fn set_register(&mut self, reg: u32, value: u32) {
        if reg as usize == REG_PROGRAM_COUNTER {
            self.registers.set_program_counter(value);
            self.cycles += SCYCLE + NCYCLE;
        } else {
            self.registers.set_register_at(reg as usize, value);
        }
    }

    fn second_operand(&mut self, op2: AluSecondOperandInfo) -> (ShiftResult, u32) {
        let carry = self.cpsr.carry_flag();
        match op2 {
            AluSecondOperandInfo::Immediate { base, shift } => {
                let value = base.rotate_right(shift);
                let carry = if shift == 0 { carry } else { value.get_bit(31) };
                (ShiftResult { value, carry }, PC_AHEAD)
            }
            AluSecondOperandInfo::Register {
                shift_op: ShiftOperator::Immediate(amount),
                shift_kind,
                register,
            } => {
                let rm = self.operand(register, PC_AHEAD);
                (shift_immediate(shift_kind, amount, rm, carry), PC_AHEAD)
            }
            AluSecondOperandInfo::Register {
                shift_op: ShiftOperator::Register(rs),
                shift_kind,
                register,
            } => {
                self.cycles += ICYCLE;
                let amount = self.operand(rs, PC_AHEAD_SHIFTED) & 0xFF;
                let rm = self.operand(register, PC_AHEAD_SHIFTED);
                (shift(shift_kind, amount, rm, carry), PC_AHEAD_SHIFTED)
            }
        }
    }

    pub fn data_processing(
        &mut self,
        alu_instruction: ArmModeAluInstruction,
        set_conditions: bool,
        rn: u32,
        destination: u32,
        op2: AluSecondOperandInfo,
    ) {
        use ArmModeAluInstruction::{
            Adc, Add, And, Bic, Cmn, Cmp, Eor, Mov, Mvn, Orr, Rsb, Rsc, Sbc, Sub, Teq, Tst,
        };

        let carry = self.cpsr.carry_flag();
        let (shifted, pc_ahead) = self.second_operand(op2);
        let op1 = self.operand(rn, pc_ahead);
        let op2 = shifted.value;

        let result = match alu_instruction {
            And | Tst => ArithmeticOpResult::logical(op1 & op2, shifted.carry),
            Eor | Teq => ArithmeticOpResult::logical(op1 ^ op2, shifted.carry),
            Orr => ArithmeticOpResult::logical(op1 | op2, shifted.carry),
            Bic => ArithmeticOpResult::logical(op1 & !op2, shifted.carry),
            Mov => ArithmeticOpResult::logical(op2, shifted.carry),
            Mvn => ArithmeticOpResult::logical(!op2, shifted.carry),
            Sub | Cmp => add_with_carry(op1, !op2, true),
            Rsb => add_with_carry(op2, !op1, true),
            Add | Cmn => add_with_carry(op1, op2, false),
            Adc => add_with_carry(op1, op2, carry),
            Sbc => add_with_carry(op1, !op2, carry),
            Rsc => add_with_carry(op2, !op1, carry),
        };

        if alu_instruction.writes_result() {
            self.set_register(destination, result.result);
        }

        if set_conditions {
            if destination as usize == REG_PROGRAM_COUNTER {
                self.restore_cpsr_from_spsr();
            } else if alu_instruction.kind() == AluInstructionKind::Logical {
                self.cpsr.set_logical_flags(&result);
            } else {
                self.cpsr.set_flags(&result);
            }
        }
    }

    pub fn psr_transfer(&mut self, psr_kind: PsrKind, op_kind: PsrOpKind) {
        match op_kind {
            PsrOpKind::Mrs {
                destination_register,
            } => {
                // User mode has no SPSR, reading one yields the CPSR.
                let psr = match psr_kind {
                    PsrKind::Cpsr => self.cpsr,
                    PsrKind::Spsr => self.spsr().unwrap_or(self.cpsr),
                };
                self.set_register(destination_register, psr.into());
            }
            PsrOpKind::Msr { all_fields, source } => {
                let value = match source {
                    AluSecondOperandInfo::Immediate { base, shift } => base.rotate_right(shift),
                    AluSecondOperandInfo::Register { register, .. } => {
                        self.operand(register, PC_AHEAD)
                    }
                };

                match psr_kind {
                    PsrKind::Cpsr if all_fields && self.mode.is_privileged() => {
                        self.set_cpsr(value);
                    }
                    PsrKind::Cpsr => self.cpsr.set_flag_bits(value),
                    PsrKind::Spsr => {
                        let Some(mut spsr) = self.spsr() else {
                            debug!(value, "MSR to SPSR in User mode ignored");
                            return;
                        };
                        if all_fields {
                            spsr = Psr::from(value);
                        } else {
                            spsr.set_flag_bits(value);
                        }
                        self.register_bank.set_spsr(self.mode, spsr);
                    }
                }
            }
        }
    }

    pub fn multiply(
        &mut self,
        accumulate: bool,
        set_conditions: bool,
        destination: u32,
        accumulator: u32,
        rs: u32,
        rm: u32,
    ) {
        let multiplier = self.operand(rs, PC_AHEAD);

        // Rd == Rm zeroes the product on this core.
        let product = if destination == rm {
            0
        } else {
            self.operand(rm, PC_AHEAD).wrapping_mul(multiplier)
        };
        let result = if accumulate {
            product.wrapping_add(self.operand(accumulator, PC_AHEAD))
        } else {
            product
        };

        self.set_register(destination, result);
        if set_conditions {
            self.cpsr.set_sign_flag(result.get_bit(31));
            self.cpsr.set_zero_flag(result == 0);
        }

        let steps = ((multiplier.count_ones() + 5) >> 1) - 1;
        self.cycles += ICYCLE * steps.min(16);
    }

    pub fn single_data_swap(
        &mut self,
        io: &mut Peripherals,
        quantity: ReadWriteKind,
        base_register: u32,
        destination: u32,
        source: u32,
    ) {
        let address = self.operand(base_register, PC_AHEAD);
        let value = self.operand(source, PC_AHEAD);

        let old = match quantity {
            ReadWriteKind::Byte => {
                let old = self.read_byte(io, address);
                self.write_byte(io, address, value as u8);
                u32::from(old)
            }
            ReadWriteKind::Word => {
                let old = self.read_word(io, address & !3);
                self.write_word(io, address & !3, value);
                old.rotate_right((address & 3) * 8)
            }
        };

        self.set_register(destination, old);
        self.cycles += 2 * NCYCLE + ICYCLE;
    }

    #[allow(clippy::too_many_arguments)]
    pub fn single_data_transfer(
        &mut self,
        io: &mut Peripherals,
        kind: LoadStoreKind,
        quantity: ReadWriteKind,
        write_back: bool,
        indexing: Indexing,
        offsetting: Offsetting,
        rd: u32,
        base_register: u32,
        offset_info: SingleDataTransferOffsetInfo,
    ) {
        let offset = match offset_info {
            SingleDataTransferOffsetInfo::Immediate { offset } => offset,
            SingleDataTransferOffsetInfo::RegisterImmediate {
                shift_amount,
                shift_kind,
                reg_offset,
            } => {
                let rm = self.operand(reg_offset, PC_AHEAD);
                shift_immediate(shift_kind, shift_amount, rm, self.cpsr.carry_flag()).value
            }
        };

        let base = self.operand(base_register, PC_AHEAD);
        let offset_base = offsetting.apply(base, offset);
        let address = match indexing {
            Indexing::Pre => offset_base,
            Indexing::Post => base,
        };
        let writes_back = write_back || indexing == Indexing::Post;

        // Post-indexed with W set is the translated (user bank) form.
        let user_bank = write_back && indexing == Indexing::Post;

        match kind {
            LoadStoreKind::Load => {
                let value = match quantity {
                    ReadWriteKind::Byte => u32::from(self.read_byte(io, address)),
                    ReadWriteKind::Word => self
                        .read_word(io, address & !3)
                        .rotate_right((address & 3) * 8),
                };

                // A loaded base wins over the write-back.
                if writes_back {
                    self.set_register(base_register, offset_base);
                }
                if user_bank {
                    self.register_bank
                        .write_user(&mut self.registers, self.mode, rd as usize, value);
                } else {
                    self.set_register(rd, value);
                }
                self.cycles += NCYCLE + ICYCLE;
            }
            LoadStoreKind::Store => {
                let value = if rd as usize == REG_PROGRAM_COUNTER {
                    self.operand(rd, PC_AHEAD_SHIFTED)
                } else if user_bank {
                    self.register_bank
                        .read_user(&self.registers, self.mode, rd as usize)
                } else {
                    self.registers.register_at(rd as usize)
                };

                match quantity {
                    ReadWriteKind::Byte => self.write_byte(io, address, value as u8),
                    ReadWriteKind::Word => self.write_word(io, address & !3, value),
                }

                if writes_back {
                    self.set_register(base_register, offset_base);
                }
                self.cycles += NCYCLE;
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub fn block_data_transfer(
        &mut self,
        io: &mut Peripherals,
        indexing: Indexing,
        offsetting: Offsetting,
        load_psr: bool,
        write_back: bool,
        kind: LoadStoreKind,
        base_register: u32,
        register_list: u16,
    ) {
        let count = register_list.count_ones();
        let span = count * 4;
        let base = self.operand(base_register, PC_AHEAD);

        // Transfers always run upwards from the lowest address.
        let (start, final_base) = match (offsetting, indexing) {
            (Offsetting::Up, Indexing::Post) => (base, base.wrapping_add(span)),
            (Offsetting::Up, Indexing::Pre) => (base.wrapping_add(4), base.wrapping_add(span)),
            (Offsetting::Down, Indexing::Post) => {
                (base.wrapping_sub(span).wrapping_add(4), base.wrapping_sub(span))
            }
            (Offsetting::Down, Indexing::Pre) => (base.wrapping_sub(span), base.wrapping_sub(span)),
        };

        // With R15 in the list, S means a CPSR restore (loads) and the
        // registers come from the current bank.
        let pc_in_list = register_list.get_bit(15);
        let user_bank = load_psr && !pc_in_list;

        match kind {
            LoadStoreKind::Load => {
                if write_back {
                    self.set_register(base_register, final_base);
                }

                let mut address = start;
                for reg in listed(register_list) {
                    let value = self.read_word(io, address & !3);
                    if user_bank {
                        self.register_bank
                            .write_user(&mut self.registers, self.mode, reg as usize, value);
                    } else {
                        self.set_register(reg, value);
                    }
                    address = address.wrapping_add(4);
                }

                if load_psr && pc_in_list {
                    self.restore_cpsr_from_spsr();
                }
                self.cycles += count * SCYCLE + NCYCLE + ICYCLE;
            }
            LoadStoreKind::Store => {
                let mut values = [0; 16];
                for reg in listed(register_list) {
                    values[reg as usize] = if reg as usize == REG_PROGRAM_COUNTER {
                        self.operand(reg, PC_AHEAD_SHIFTED)
                    } else if user_bank {
                        self.register_bank
                            .read_user(&self.registers, self.mode, reg as usize)
                    } else {
                        self.registers.register_at(reg as usize)
                    };
                }

                let mut address = start;
                for reg in listed(register_list) {
                    self.write_word(io, address & !3, values[reg as usize]);
                    address = address.wrapping_add(4);
                }

                if write_back {
                    self.set_register(base_register, final_base);
                }
                self.cycles += count.saturating_sub(1) * SCYCLE + 2 * NCYCLE;
            }
        }
    }

    pub fn branch(&mut self, link: bool, offset: i32) {
        let pc = self.registers.program_counter();
        if link {
            self.registers.set_register_at(REG_LR, pc);
        }
        self.registers
            .set_program_counter(pc.wrapping_add(PC_AHEAD).wrapping_add_signed(offset));
        self.cycles += SCYCLE + NCYCLE;
    }

    pub fn software_interrupt(&mut self, comment: u32) {
        if self.try_hle(comment) {
            return;
        }
        let return_address = self.registers.program_counter();
        self.enter_exception(Mode::Supervisor, SWI_VECTOR, return_address, false);
        self.cycles += SCYCLE + NCYCLE;
    }

    fn undefined(&mut self, raw: u32) {
        let return_address = self.registers.program_counter();
        debug!(raw, return_address, "undefined instruction trap");
        self.enter_exception(Mode::Undefined, UNDEFINED_VECTOR, return_address, false);
        self.cycles += SCYCLE + NCYCLE + ICYCLE;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const PROGRAM: u32 = 0x1000;

    /// Runs `program` from 0x1000 and returns the cycles it took.
    fn run(cpu: &mut Arm60, io: &mut Peripherals, program: &[u32]) -> u32 {
        for (i, word) in (0u32..).zip(program) {
            cpu.memory.write_ram_word(PROGRAM + i * 4, *word);
        }
        cpu.registers.set_program_counter(PROGRAM);
        program.iter().map(|_| cpu.step(io)).sum()
    }

    fn setup() -> (Arm60, Peripherals) {
        (Arm60::default(), Peripherals::default())
    }

    #[test]
    fn check_add_overflow() {
        let (mut cpu, mut io) = setup();
        cpu.registers.set_register_at(0, 0x7FFF_FFFF);
        cpu.registers.set_register_at(1, 1);

        // ADDS R2, R0, R1
        run(&mut cpu, &mut io, &[0xE090_2001]);
        assert_eq!(cpu.registers.register_at(2), 0x8000_0000);
        assert!(cpu.cpsr.sign_flag());
        assert!(cpu.cpsr.overflow_flag());
        assert!(!cpu.cpsr.carry_flag());
        assert!(!cpu.cpsr.zero_flag());
    }

    #[test]
    fn check_sub_carry_means_no_borrow() {
        let (mut cpu, mut io) = setup();
        cpu.registers.set_register_at(0, 5);
        cpu.registers.set_register_at(1, 5);

        // SUBS R2, R0, R1
        run(&mut cpu, &mut io, &[0xE050_2001]);
        assert_eq!(cpu.registers.register_at(2), 0);
        assert!(cpu.cpsr.zero_flag());
        assert!(cpu.cpsr.carry_flag());

        cpu.registers.set_register_at(0, 3);
        run(&mut cpu, &mut io, &[0xE050_2001]);
        assert_eq!(cpu.registers.register_at(2), 0xFFFF_FFFE);
        assert!(cpu.cpsr.sign_flag());
        assert!(!cpu.cpsr.carry_flag());
    }

    #[test]
    fn check_pc_operand_offsets() {
        let (mut cpu, mut io) = setup();

        // ADD R0, R15, #0
        let cycles = run(&mut cpu, &mut io, &[0xE28F_0000]);
        assert_eq!(cpu.registers.register_at(0), PROGRAM + 8);
        assert_eq!(cycles, SCYCLE);

        // ADD R0, R15, R1, LSL R2
        let cycles = run(&mut cpu, &mut io, &[0xE08F_0211]);
        assert_eq!(cpu.registers.register_at(0), PROGRAM + 12);
        assert_eq!(cycles, SCYCLE + ICYCLE);
    }

    #[test]
    fn check_logical_flags_take_shifter_carry() {
        let (mut cpu, mut io) = setup();
        cpu.registers.set_register_at(1, 3);
        cpu.cpsr.set_overflow_flag(true);

        // MOVS R0, R1, LSR #1
        run(&mut cpu, &mut io, &[0xE1B0_00A1]);
        assert_eq!(cpu.registers.register_at(0), 1);
        assert!(cpu.cpsr.carry_flag());
        assert!(cpu.cpsr.overflow_flag());
    }

    #[test]
    fn check_movs_pc_restores_cpsr() {
        let (mut cpu, mut io) = setup();
        cpu.register_bank
            .set_spsr(Mode::Supervisor, Psr::from(0x6000_0010));
        cpu.registers.set_register_at(REG_LR, 0x2000);

        // MOVS PC, LR
        let cycles = run(&mut cpu, &mut io, &[0xE1B0_F00E]);
        assert_eq!(cpu.registers.program_counter(), 0x2000);
        assert_eq!(cpu.mode, Mode::User);
        assert_eq!(u32::from(cpu.cpsr), 0x6000_0010);
        assert_eq!(cycles, 2 * SCYCLE + NCYCLE);
    }

    #[test]
    fn check_multiply() {
        let (mut cpu, mut io) = setup();
        cpu.registers.set_register_at(1, 3);
        cpu.registers.set_register_at(2, 7);

        // MUL R0, R1, R2
        let cycles = run(&mut cpu, &mut io, &[0xE000_0291]);
        assert_eq!(cpu.registers.register_at(0), 21);
        assert_eq!(cycles, SCYCLE + 3 * ICYCLE);

        cpu.registers.set_register_at(2, 0xFFFF_FFFF);
        let cycles = run(&mut cpu, &mut io, &[0xE000_0291]);
        assert_eq!(cycles, SCYCLE + 16 * ICYCLE);
    }

    #[test]
    fn check_multiply_destination_equals_rm() {
        let (mut cpu, mut io) = setup();
        cpu.registers.set_register_at(1, 3);
        cpu.registers.set_register_at(2, 7);

        // MUL R1, R1, R2
        run(&mut cpu, &mut io, &[0xE001_0291]);
        assert_eq!(cpu.registers.register_at(1), 0);

        // MLAS R1, R1, R2, R3
        cpu.registers.set_register_at(1, 3);
        cpu.registers.set_register_at(3, 0);
        run(&mut cpu, &mut io, &[0xE031_3291]);
        assert_eq!(cpu.registers.register_at(1), 0);
        assert!(cpu.cpsr.zero_flag());

        cpu.registers.set_register_at(3, 0x8000_0000);
        run(&mut cpu, &mut io, &[0xE031_3291]);
        assert_eq!(cpu.registers.register_at(1), 0x8000_0000);
        assert!(cpu.cpsr.sign_flag());
    }

    #[test]
    fn check_swap() {
        let (mut cpu, mut io) = setup();
        cpu.memory.write_ram_word(0x200, 0x1111_1111);
        cpu.registers.set_register_at(1, 0x2222_2222);
        cpu.registers.set_register_at(2, 0x200);

        // SWP R0, R1, [R2]
        let cycles = run(&mut cpu, &mut io, &[0xE102_0091]);
        assert_eq!(cpu.registers.register_at(0), 0x1111_1111);
        assert_eq!(cpu.memory.read_ram_word(0x200), 0x2222_2222);
        assert_eq!(cycles, SCYCLE + 2 * NCYCLE + ICYCLE);

        // SWPB R0, R1, [R2]
        cpu.registers.set_register_at(2, 0x203);
        run(&mut cpu, &mut io, &[0xE142_0091]);
        assert_eq!(cpu.registers.register_at(0), 0x22);
        assert_eq!(cpu.memory.read_ram_word(0x200), 0x2222_2222);
    }

    #[test]
    fn check_ldr_misaligned_rotates() {
        let (mut cpu, mut io) = setup();
        cpu.memory.write_ram_word(0x200, 0x1122_3344);
        cpu.registers.set_register_at(1, 0x201);

        // LDR R0, [R1]
        let cycles = run(&mut cpu, &mut io, &[0xE591_0000]);
        assert_eq!(cpu.registers.register_at(0), 0x4411_2233);
        assert_eq!(cycles, SCYCLE + NCYCLE + ICYCLE);
    }

    #[test]
    fn check_ldr_write_back() {
        let (mut cpu, mut io) = setup();
        cpu.memory.write_ram_word(0x200, 0xAB);
        cpu.memory.write_ram_word(0x204, 0x77);
        cpu.registers.set_register_at(1, 0x200);

        // LDR R0, [R1], #4
        run(&mut cpu, &mut io, &[0xE491_0004]);
        assert_eq!(cpu.registers.register_at(0), 0xAB);
        assert_eq!(cpu.registers.register_at(1), 0x204);

        // LDR R1, [R1, #4]!
        cpu.registers.set_register_at(1, 0x200);
        run(&mut cpu, &mut io, &[0xE5B1_1004]);
        assert_eq!(cpu.registers.register_at(1), 0x77);
    }

    #[test]
    fn check_post_indexed_store_uses_user_bank() {
        let (mut cpu, mut io) = setup();
        cpu.set_cpsr(0xD1);
        cpu.register_bank.user[0] = 0xAAAA;
        cpu.registers.set_register_at(8, 0xBBBB);
        cpu.registers.set_register_at(1, 0x200);

        // STRT R8, [R1], #4
        run(&mut cpu, &mut io, &[0xE4A1_8004]);
        assert_eq!(cpu.memory.read_ram_word(0x200), 0xAAAA);
        assert_eq!(cpu.registers.register_at(1), 0x204);
    }

    #[test]
    fn check_str_pc_stores_plus_twelve() {
        let (mut cpu, mut io) = setup();
        cpu.registers.set_register_at(1, 0x200);

        // STR PC, [R1]
        let cycles = run(&mut cpu, &mut io, &[0xE581_F000]);
        assert_eq!(cpu.memory.read_ram_word(0x200), PROGRAM + 12);
        assert_eq!(cycles, SCYCLE + NCYCLE);
    }

    #[test]
    fn check_stm_addressing_modes() {
        // (opcode, first address, final base)
        let cases = [
            (0xE8A0_0006, 0x200, 0x208), // STMIA R0!, {R1, R2}
            (0xE9A0_0006, 0x204, 0x208), // STMIB R0!, {R1, R2}
            (0xE820_0006, 0x1FC, 0x1F8), // STMDA R0!, {R1, R2}
            (0xE920_0006, 0x1F8, 0x1F8), // STMDB R0!, {R1, R2}
        ];

        for (op_code, first, final_base) in cases {
            let (mut cpu, mut io) = setup();
            cpu.registers.set_register_at(0, 0x200);
            cpu.registers.set_register_at(1, 0x11);
            cpu.registers.set_register_at(2, 0x22);

            let cycles = run(&mut cpu, &mut io, &[op_code]);
            assert_eq!(cpu.memory.read_ram_word(first), 0x11, "{op_code:#x}");
            assert_eq!(cpu.memory.read_ram_word(first + 4), 0x22, "{op_code:#x}");
            assert_eq!(cpu.registers.register_at(0), final_base, "{op_code:#x}");
            assert_eq!(cycles, 2 * SCYCLE + 2 * NCYCLE);
        }
    }

    #[test]
    fn check_ldm_write_back() {
        let (mut cpu, mut io) = setup();
        cpu.memory.write_ram_word(0x200, 0x11);
        cpu.memory.write_ram_word(0x204, 0x22);
        cpu.registers.set_register_at(0, 0x200);

        // LDMIA R0!, {R1, R2}
        let cycles = run(&mut cpu, &mut io, &[0xE8B0_0006]);
        assert_eq!(cpu.registers.register_at(1), 0x11);
        assert_eq!(cpu.registers.register_at(2), 0x22);
        assert_eq!(cpu.registers.register_at(0), 0x208);
        assert_eq!(cycles, 3 * SCYCLE + NCYCLE + ICYCLE);
    }

    #[test]
    fn check_stm_user_bank_from_fiq() {
        let (mut cpu, mut io) = setup();
        cpu.set_cpsr(0xD1);
        cpu.register_bank.user[0] = 0xAAAA;
        cpu.registers.set_register_at(8, 0xBBBB);
        cpu.registers.set_register_at(0, 0x200);

        // STMIA R0, {R8}^
        run(&mut cpu, &mut io, &[0xE8C0_0100]);
        assert_eq!(cpu.memory.read_ram_word(0x200), 0xAAAA);
        assert_eq!(cpu.registers.register_at(0), 0x200);
    }

    #[test]
    fn check_stm_with_pc_uses_current_bank() {
        let (mut cpu, mut io) = setup();
        cpu.set_cpsr(0xD1);
        cpu.register_bank.user[0] = 0xAAAA;
        cpu.registers.set_register_at(8, 0xBBBB);
        cpu.registers.set_register_at(0, 0x200);

        // STMIA R0, {R8, PC}^
        run(&mut cpu, &mut io, &[0xE8C0_8100]);
        assert_eq!(cpu.memory.read_ram_word(0x200), 0xBBBB);
        assert_eq!(cpu.memory.read_ram_word(0x204), PROGRAM + 12);
        assert_eq!(cpu.mode, Mode::Fiq);
    }

    #[test]
    fn check_ldm_user_bank_from_fiq() {
        let (mut cpu, mut io) = setup();
        cpu.set_cpsr(0xD1);
        cpu.registers.set_register_at(8, 0xBBBB);
        cpu.registers.set_register_at(0, 0x200);
        cpu.memory.write_ram_word(0x200, 0x1234);

        // LDMIA R0, {R8}^
        run(&mut cpu, &mut io, &[0xE8D0_0100]);
        assert_eq!(cpu.registers.register_at(8), 0xBBBB);
        assert_eq!(cpu.register_bank.user[0], 0x1234);
        assert_eq!(cpu.mode, Mode::Fiq);
    }

    #[test]
    fn check_ldm_with_pc_restores_cpsr() {
        let (mut cpu, mut io) = setup();
        cpu.register_bank
            .set_spsr(Mode::Supervisor, Psr::from(0x0000_0010));
        cpu.memory.write_ram_word(0x200, 0x2000);
        cpu.registers.set_register_at(0, 0x200);

        // LDMIA R0, {PC}^
        let cycles = run(&mut cpu, &mut io, &[0xE8D0_8000]);
        assert_eq!(cpu.registers.program_counter(), 0x2000);
        assert_eq!(cpu.mode, Mode::User);
        assert_eq!(cycles, 3 * SCYCLE + 2 * NCYCLE + ICYCLE);
    }

    #[test]
    fn check_branch_and_link() {
        let (mut cpu, mut io) = setup();

        // B #+8
        let cycles = run(&mut cpu, &mut io, &[0xEA00_0002]);
        assert_eq!(cpu.registers.program_counter(), PROGRAM + 16);
        assert_eq!(cycles, 2 * SCYCLE + NCYCLE);

        // BL #-8
        run(&mut cpu, &mut io, &[0xEBFF_FFFE]);
        assert_eq!(cpu.registers.program_counter(), PROGRAM);
        assert_eq!(cpu.registers.register_at(REG_LR), PROGRAM + 4);
    }

    #[test]
    fn check_psr_transfer() {
        let (mut cpu, mut io) = setup();

        // MRS R0, CPSR
        run(&mut cpu, &mut io, &[0xE10F_0000]);
        assert_eq!(cpu.registers.register_at(0), 0xD3);

        // MSR CPSR_f, #0xF0000000
        run(&mut cpu, &mut io, &[0xE328_F4F0]);
        assert_eq!(u32::from(cpu.cpsr), 0xF000_00D3);

        // MSR CPSR_fc, R1 drops to User mode
        cpu.registers.set_register_at(1, 0x0000_0010);
        run(&mut cpu, &mut io, &[0xE129_F001]);
        assert_eq!(cpu.mode, Mode::User);

        // In User mode only the flags can change
        cpu.registers.set_register_at(1, 0x8000_001F);
        run(&mut cpu, &mut io, &[0xE129_F001]);
        assert_eq!(u32::from(cpu.cpsr), 0x8000_0010);
    }

    #[test]
    fn check_spsr_access_in_user_mode() {
        let (mut cpu, mut io) = setup();
        cpu.set_cpsr(0x2000_0010);
        cpu.registers.set_register_at(1, 0xF000_0013);

        // MSR SPSR_fc, R1 is ignored
        run(&mut cpu, &mut io, &[0xE169_F001]);
        assert_eq!(cpu.spsr(), None);

        // MRS R0, SPSR reads the CPSR
        run(&mut cpu, &mut io, &[0xE14F_0000]);
        assert_eq!(cpu.registers.register_at(0), 0x2000_0010);
    }

    #[test]
    fn check_msr_spsr_flags_only() {
        let (mut cpu, mut io) = setup();
        cpu.register_bank
            .set_spsr(Mode::Supervisor, Psr::from(0x0000_0010));
        cpu.registers.set_register_at(1, 0x4000_0013);

        // MSR SPSR_f, R1
        run(&mut cpu, &mut io, &[0xE168_F001]);
        assert_eq!(cpu.spsr().map(u32::from), Some(0x4000_0010));
    }
}
