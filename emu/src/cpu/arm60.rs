//! # ARM60 Core
//!
//! A 32-bit ARM core with no Thumb state and no System mode. One call to
//! [`Arm60::step`] fetches, decodes and conditionally executes a single
//! instruction, then samples the FIQ line.
//!
//! ## Program counter
//!
//! The PC is advanced past the instruction before it executes, so while an
//! instruction runs `R15` holds its address plus 4. Operand reads of `R15`
//! add another 4 (8 with a register-specified shift) to match the pipeline.
//!
//! ## Timing
//!
//! Costs are counted in three units: `N` (non-sequential), `S` (sequential)
//! and `I` (internal). Every instruction costs one `S` for its fetch. Each
//! operation adds its own cycles on top of that.

use serde::Serialize;
use tracing::{debug, info, trace, warn};

use crate::bus::Bus;
use crate::compat::CompatShim;
use crate::cpu::arm::mode::ArmModeOpcode;
use crate::cpu::cpu_modes::Mode;
use crate::cpu::hardware::Peripherals;
use crate::cpu::memory::{Memory, NVRAM_SIZE, RAM_END, ROM_SIZE};
use crate::cpu::psr::{MODE_MASK, Psr};
use crate::cpu::register_bank::{FIQ_BANKED, RegisterBank};
use crate::cpu::registers::{REG_LR, Registers};
use crate::cpu::swi::SwiTable;
use crate::state::{StateError, StateReader, StateWriter};

pub const NCYCLE: u32 = 4;
pub const SCYCLE: u32 = 1;
pub const ICYCLE: u32 = 1;

pub const RESET_VECTOR: u32 = 0x0300_0000;
pub const UNDEFINED_VECTOR: u32 = 0x04;
pub const SWI_VECTOR: u32 = 0x08;
pub const FIQ_VECTOR: u32 = 0x1C;

const STATE_MAGIC: &[u8; 4] = b"A60C";
const STATE_VERSION: u8 = 1;

pub struct Arm60 {
    pub registers: Registers,
    pub(crate) cpsr: Psr,

    /// Always equal to the mode bits of `cpsr`.
    pub(crate) mode: Mode,
    pub register_bank: RegisterBank,

    /// Latched FIQ request, consumed when the exception is taken.
    pub fiq_line: bool,
    pub memory_abort: bool,
    pub memory: Memory,

    hle: Option<SwiTable>,
    compat: Option<CompatShim>,

    /// Set when a write stalled the bus during the current instruction.
    bus_wait: bool,
    pub(crate) cycles: u32,
}

impl Default for Arm60 {
    fn default() -> Self {
        let mut cpu = Self {
            registers: Registers::default(),
            cpsr: Psr::from(Mode::Supervisor),
            mode: Mode::Supervisor,
            register_bank: RegisterBank::default(),
            fiq_line: false,
            memory_abort: false,
            memory: Memory::default(),
            hle: None,
            compat: None,
            bus_wait: false,
            cycles: 0,
        };
        cpu.reset();
        cpu
    }
}

/// Register view for dumps and debugging.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegisterDump {
    pub registers: Registers,
    pub cpsr: u32,
    pub mode: Mode,
    pub spsr: Option<u32>,
}

/// A CPU snapshot that passed validation but has not been applied yet.
pub struct CpuState<'a> {
    registers: [u32; 16],
    bank: RegisterBank,
    cpsr: Psr,
    mode: Mode,
    fiq_line: bool,
    memory_abort: bool,
    rom_bank: usize,
    high_resolution: bool,
    ram: &'a [u8],
    roms: [&'a [u8]; 2],
    nvram: &'a [u8],
}

impl Arm60 {
    /// Clears registers and banks and enters Supervisor mode at the ROM
    /// entry point with both interrupt kinds masked. Memory is untouched.
    pub fn reset(&mut self) {
        self.registers = Registers::default();
        self.register_bank = RegisterBank::default();
        self.mode = Mode::Supervisor;
        self.cpsr = Psr::from(Mode::Supervisor);
        self.cpsr.set_irq_disable(true);
        self.cpsr.set_fiq_disable(true);
        self.registers.set_program_counter(RESET_VECTOR);
        self.fiq_line = false;
        self.memory_abort = false;
        self.bus_wait = false;
        if let Some(compat) = &mut self.compat {
            compat.reset();
        }
        info!("ARM60 reset");
    }

    pub fn set_hle(&mut self, table: Option<SwiTable>) {
        self.hle = table;
    }

    pub fn set_compat(&mut self, shim: Option<CompatShim>) {
        self.compat = shim;
    }

    #[must_use]
    pub const fn cpsr(&self) -> Psr {
        self.cpsr
    }

    #[must_use]
    pub const fn mode(&self) -> Mode {
        self.mode
    }

    #[must_use]
    pub const fn spsr(&self) -> Option<Psr> {
        self.register_bank.spsr(self.mode)
    }

    /// Raises the FIQ request line. It stays latched until the core takes
    /// the exception.
    pub const fn request_fiq(&mut self) {
        self.fiq_line = true;
    }

    #[must_use]
    pub fn dump(&self) -> RegisterDump {
        RegisterDump {
            registers: self.registers.clone(),
            cpsr: self.cpsr.into(),
            mode: self.mode,
            spsr: self.spsr().map(u32::from),
        }
    }

    /// Executes one instruction and returns the cycles it took.
    pub fn step(&mut self, io: &mut Peripherals) -> u32 {
        self.cycles = SCYCLE;
        self.bus_wait = false;

        if let Some(compat) = &mut self.compat {
            compat.apply(&mut self.registers);
        }

        let pc = self.registers.program_counter() & !3;
        let raw = self.read_word(io, pc);
        self.registers.set_program_counter(pc.wrapping_add(4));

        let op_code = ArmModeOpcode::from(raw);
        trace!(pc, raw, "{}", op_code.disassemble());
        if op_code.condition.passes(self.cpsr.flags()) {
            self.execute(io, op_code);
        }

        if self.bus_wait {
            self.registers.advance_program_counter(4);
        }

        self.sample_fiq(io);
        self.cycles
    }

    fn sample_fiq(&mut self, io: &Peripherals) {
        if self.cpsr.fiq_disable() {
            return;
        }
        if self.fiq_line || io.clio.fiq_needed() {
            self.fiq_line = false;
            let return_address = self.registers.program_counter().wrapping_add(4);
            debug!(return_address, "taking FIQ");
            self.enter_exception(Mode::Fiq, FIQ_VECTOR, return_address, true);
        }
    }

    /// Switches to `mode`, saving the old CPSR in its SPSR, masks IRQ (and
    /// FIQ when asked), sets R14 and jumps to `vector`.
    pub(crate) fn enter_exception(
        &mut self,
        mode: Mode,
        vector: u32,
        return_address: u32,
        disable_fiq: bool,
    ) {
        let saved = self.cpsr;
        self.switch_mode(mode);
        self.register_bank.set_spsr(mode, saved);
        self.cpsr.set_irq_disable(true);
        if disable_fiq {
            self.cpsr.set_fiq_disable(true);
        }
        self.registers.set_register_at(REG_LR, return_address);
        self.registers.set_program_counter(vector);
    }

    fn switch_mode(&mut self, to: Mode) {
        self.register_bank
            .switch(&mut self.registers, self.mode, to);
        self.mode = to;
        self.cpsr.set_mode(to);
    }

    /// Writes the whole CPSR. Invalid mode bits are rejected: the previous
    /// mode stays and only the other bits change.
    pub(crate) fn set_cpsr(&mut self, value: u32) {
        match Mode::try_from(value) {
            Ok(mode) => {
                self.switch_mode(mode);
                self.cpsr = Psr::from(value);
            }
            Err(reason) => {
                warn!(value, %reason, "CPSR write with invalid mode ignored");
                self.cpsr = Psr::from((value & !MODE_MASK) | self.mode as u32);
            }
        }
    }

    /// Copies the current SPSR into the CPSR. No-op in User mode.
    pub(crate) fn restore_cpsr_from_spsr(&mut self) {
        if let Some(spsr) = self.spsr() {
            self.set_cpsr(spsr.into());
        }
    }

    pub(crate) fn read_word(&mut self, io: &mut Peripherals, address: u32) -> u32 {
        Bus::new(&mut self.memory, io).read_word(address)
    }

    pub(crate) fn read_byte(&mut self, io: &mut Peripherals, address: u32) -> u8 {
        Bus::new(&mut self.memory, io).read_byte(address)
    }

    pub(crate) fn write_word(&mut self, io: &mut Peripherals, address: u32, value: u32) {
        self.bus_wait |= Bus::new(&mut self.memory, io).write_word(address, value);
    }

    pub(crate) fn write_byte(&mut self, io: &mut Peripherals, address: u32, value: u8) {
        self.bus_wait |= Bus::new(&mut self.memory, io).write_byte(address, value);
    }

    /// Runs a native SWI handler if one is installed for `comment`.
    pub(crate) fn try_hle(&mut self, comment: u32) -> bool {
        let Some(handler) = self.hle.as_ref().and_then(|table| table.lookup(comment)) else {
            return false;
        };
        let args = [0, 1, 2, 3].map(|reg| self.registers.register_at(reg));
        if let Some(result) = handler(&mut self.memory, args) {
            self.registers.set_register_at(0, result);
        }
        true
    }

    #[must_use]
    pub fn save_state(&self) -> Vec<u8> {
        let mut writer = StateWriter::new(STATE_MAGIC, STATE_VERSION);
        writer.u32s(self.registers.as_array());

        let bank = &self.register_bank;
        writer.u32s(&bank.user);
        writer.u32s(&bank.fiq);
        for pair in [&bank.irq, &bank.svc, &bank.abt, &bank.und] {
            writer.u32s(pair);
        }
        writer.u32(self.cpsr.into());
        for spsr in bank.spsr {
            writer.u32(spsr.into());
        }

        writer.bool(self.fiq_line);
        writer.bool(self.memory_abort);
        writer.u8(self.memory.rom_bank() as u8);
        writer.bool(self.memory.high_resolution());

        writer.chunk(self.memory.ram());
        for bank in 0..2 {
            writer.chunk(self.memory.rom(bank).unwrap_or_default());
        }
        writer.chunk(self.memory.nvram());
        writer.finish()
    }

    /// Parses and validates a snapshot without touching the core.
    pub fn decode_state(blob: &[u8]) -> Result<CpuState<'_>, StateError> {
        let mut reader = StateReader::new("ARM60", blob, STATE_MAGIC, STATE_VERSION)?;
        let registers = reader.u32s::<16>()?;

        let mut bank = RegisterBank {
            user: reader.u32s::<FIQ_BANKED>()?,
            fiq: reader.u32s::<FIQ_BANKED>()?,
            irq: reader.u32s::<2>()?,
            svc: reader.u32s::<2>()?,
            abt: reader.u32s::<2>()?,
            und: reader.u32s::<2>()?,
            ..RegisterBank::default()
        };

        let cpsr = Psr::from(reader.u32()?);
        let mode = cpsr
            .mode()
            .ok_or_else(|| reader.corrupt(format!("CPSR {:#010x} has no valid mode", u32::from(cpsr))))?;
        for spsr in &mut bank.spsr {
            *spsr = Psr::from(reader.u32()?);
        }

        let fiq_line = reader.bool()?;
        let memory_abort = reader.bool()?;
        let rom_bank = usize::from(reader.u8()?);
        if rom_bank > 1 {
            return Err(reader.corrupt(format!("ROM bank {rom_bank}")));
        }
        let high_resolution = reader.bool()?;

        let ram = reader.sized_chunk(RAM_END as usize)?;
        let roms = [reader.sized_chunk(ROM_SIZE)?, reader.sized_chunk(ROM_SIZE)?];
        let nvram = reader.sized_chunk(NVRAM_SIZE)?;
        reader.finish()?;

        Ok(CpuState {
            registers,
            bank,
            cpsr,
            mode,
            fiq_line,
            memory_abort,
            rom_bank,
            high_resolution,
            ram,
            roms,
            nvram,
        })
    }

    pub fn apply_state(&mut self, state: CpuState<'_>) {
        self.registers.as_mut_array().copy_from_slice(&state.registers);
        self.register_bank = state.bank;
        self.cpsr = state.cpsr;
        self.mode = state.mode;
        self.fiq_line = state.fiq_line;
        self.memory_abort = state.memory_abort;
        self.memory.restore_images(
            state.ram,
            state.roms,
            state.nvram,
            state.rom_bank,
            state.high_resolution,
        );
        self.bus_wait = false;
        info!(pc = self.registers.program_counter(), mode = %self.mode, "ARM60 state restored");
    }

    /// Restores a snapshot. On error the core is left unchanged.
    pub fn restore_state(&mut self, blob: &[u8]) -> Result<(), StateError> {
        let state = Self::decode_state(blob)?;
        self.apply_state(state);
        Ok(())
    }
}
