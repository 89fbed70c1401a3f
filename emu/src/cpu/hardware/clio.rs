//! # CLIO System Controller
//!
//! Interrupts, timers, the XBUS DMA engine, the serial FIFOs and the CPU's
//! window onto DSP memory all live behind one 64KB register window at
//! 0x0340_0000. Offsets below are relative to that base.
//!
//! | Offset          | Register                                        |
//! |-----------------|-------------------------------------------------|
//! | 0x0000          | revision                                        |
//! | 0x0008 / 0x000C | VINT0 / VINT1 line compare                      |
//! | 0x0034          | line counter, `(field << 11) \| line`           |
//! | 0x0040 / 0x0044 | primary pending set / clear                     |
//! | 0x0048 / 0x004C | primary enable set / clear                      |
//! | 0x0060 / 0x0064 | secondary pending set / clear                   |
//! | 0x0068 / 0x006C | secondary enable set / clear                    |
//! | 0x0100 + 8t     | timer t counter, +4 backup                      |
//! | 0x0200 / 0x0204 | timer 0-7 control set / clear                   |
//! | 0x0208 / 0x020C | timer 8-15 control set / clear                  |
//! | 0x0220          | timer slack                                     |
//! | 0x0304 / 0x0308 | DMA enable set / clear                          |
//! | 0x0400 + 16c    | input FIFO c                                    |
//! | 0x0500 + 16c    | output FIFO c                                   |
//! | 0x0580 - 0x05BF | XBUS windows                                    |
//! | 0x05C0          | XBUS DMA control                                |
//! | 0x17D0          | DSP semaphore                                   |
//! | 0x17E8          | DSP reset                                       |
//! | 0x17FC          | DSP run                                         |
//! | 0x1800 - 0x1FFF | DSP instruction memory, two words per access    |
//! | 0x2000 - 0x2FFF | DSP instruction memory, one word per access     |
//! | 0x3000 - 0x33FF | DSP data memory, two words per access           |
//! | 0x3400 - 0x37FF | DSP data memory, one word per access            |
//!
//! Registers without a dedicated handler read back what was last written.

use tracing::{debug, info, trace};

use crate::cpu::hardware::ClioPorts;
use crate::cpu::hardware::dma::XBUS_DMA_ENABLE;
use crate::cpu::hardware::fifo::{FifoChannel, INPUT_CHANNELS, OUTPUT_CHANNELS};
use crate::cpu::hardware::interrupt_control::{InterruptControl, primary};
use crate::cpu::hardware::timers::{TIMER_COUNT, Timers};
use crate::cpu::hardware::xbus::Xbus;
use crate::cpu::memory::Memory;
use crate::state::{StateError, StateReader, StateWriter};

pub const CLIO_REVISION: u32 = 0x0202_0000;

pub const REGISTER_FILE_WORDS: usize = 0x1_0000;

pub const VINT0: u32 = 0x08;
pub const VINT1: u32 = 0x0C;
pub const LINE_COUNTER: u32 = 0x34;
pub const DMA_ENABLE_SET: u32 = 0x304;
pub const DMA_ENABLE_CLEAR: u32 = 0x308;
pub const XBUS_DMA_CONTROL: u32 = 0x5C0;
pub const DSP_SEMAPHORE: u32 = 0x17D0;
pub const DSP_RESET: u32 = 0x17E8;
pub const DSP_RUN: u32 = 0x17FC;

const STATE_MAGIC: &[u8; 4] = b"CLIO";
const STATE_VERSION: u8 = 1;

/// Which DSP memory window an offset falls in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DspWindow {
    Instructions32,
    Instructions16,
    Data32,
    Data16,
}

impl DspWindow {
    const fn locate(offset: u32) -> Option<(Self, u16)> {
        let (window, base) = match offset {
            0x1800..=0x1FFF => (Self::Instructions32, 0x1800),
            0x2000..=0x2FFF => (Self::Instructions16, 0x2000),
            0x3000..=0x33FF => (Self::Data32, 0x3000),
            0x3400..=0x37FF => (Self::Data16, 0x3400),
            _ => return None,
        };
        Some((window, ((offset - base) >> 2) as u16))
    }
}

pub struct Clio {
    registers: Vec<u32>,
    pub interrupts: InterruptControl,
    pub timers: Timers,
    pub input_fifos: [FifoChannel; INPUT_CHANNELS],
    pub output_fifos: [FifoChannel; OUTPUT_CHANNELS],

    /// Last value written to each DSP window.
    pub dsp_shadow: [u32; 4],
}

impl Default for Clio {
    fn default() -> Self {
        Self {
            registers: vec![0; REGISTER_FILE_WORDS],
            interrupts: InterruptControl::default(),
            timers: Timers::default(),
            input_fifos: [FifoChannel::default(); INPUT_CHANNELS],
            output_fifos: [FifoChannel::default(); OUTPUT_CHANNELS],
            dsp_shadow: [0; 4],
        }
    }
}

const fn slot(offset: u32) -> usize {
    (offset as usize >> 2) & (REGISTER_FILE_WORDS - 1)
}

impl Clio {
    pub fn reset(&mut self) {
        *self = Self::default();
        info!("CLIO reset");
    }

    /// Raw register file contents at `offset`.
    #[must_use]
    pub fn register(&self, offset: u32) -> u32 {
        self.registers[slot(offset)]
    }

    pub fn set_register(&mut self, offset: u32, value: u32) {
        self.registers[slot(offset)] = value;
    }

    #[must_use]
    pub const fn fiq_needed(&self) -> bool {
        self.interrupts.fiq_needed()
    }

    pub const fn generate_fiq(&mut self, primary: u32, secondary: u32) {
        self.interrupts.generate_fiq(primary, secondary);
    }

    /// Register read, `offset` is relative to the controller base.
    pub fn peek(&mut self, offset: u32, ports: &mut ClioPorts<'_>) -> u32 {
        let offset = offset & 0xFFFC;
        if let Some((window, index)) = DspWindow::locate(offset) {
            return match window {
                DspWindow::Instructions32 => {
                    let hi = ports.dsp.imem_read(index * 2);
                    let lo = ports.dsp.imem_read(index * 2 + 1);
                    (u32::from(hi) << 16) | u32::from(lo)
                }
                DspWindow::Instructions16 => ports.dsp.imem_read(index).into(),
                DspWindow::Data32 => {
                    let hi = ports.dsp.mem_read(index * 2);
                    let lo = ports.dsp.mem_read(index * 2 + 1);
                    (u32::from(hi) << 16) | u32::from(lo)
                }
                DspWindow::Data16 => ports.dsp.mem_read(index).into(),
            };
        }

        match offset {
            0x0000 => CLIO_REVISION,
            0x0040 | 0x0044 => self.interrupts.primary_pending,
            0x0048 | 0x004C => self.interrupts.primary_enable,
            0x0060 | 0x0064 => self.interrupts.secondary_pending,
            0x0068 | 0x006C => self.interrupts.secondary_enable,
            0x0100..=0x017F => {
                let timer = ((offset - 0x100) >> 3) as usize;
                if offset & 4 == 0 {
                    self.timers.counter[timer].into()
                } else {
                    self.timers.backup[timer].into()
                }
            }
            0x0200 | 0x0204 => self.timers.control_word(false),
            0x0208 | 0x020C => self.timers.control_word(true),
            DMA_ENABLE_CLEAR => self.register(DMA_ENABLE_SET),
            0x0400..=0x04CF => self.input_fifos[((offset - 0x400) >> 4) as usize].read_register(offset),
            0x0500..=0x053F => self.output_fifos[((offset - 0x500) >> 4) as usize].read_register(offset),
            0x0580..=0x05BF => ports.xbus.read(offset),
            DSP_SEMAPHORE => ports.dsp.semaphore_read(),
            _ => self.register(offset),
        }
    }

    /// Register write. Returns `true` when the write stalls the bus and the
    /// CPU must skip an extra instruction slot.
    pub fn poke(&mut self, offset: u32, value: u32, ports: &mut ClioPorts<'_>) -> bool {
        let offset = offset & 0xFFFC;
        if let Some((window, index)) = DspWindow::locate(offset) {
            self.dsp_shadow[window as usize] = value;
            match window {
                DspWindow::Instructions32 => {
                    ports.dsp.imem_write(index * 2, (value >> 16) as u16);
                    ports.dsp.imem_write(index * 2 + 1, value as u16);
                }
                DspWindow::Instructions16 => ports.dsp.imem_write(index, value as u16),
                DspWindow::Data32 => {
                    ports.dsp.mem_write(index * 2, (value >> 16) as u16);
                    ports.dsp.mem_write(index * 2 + 1, value as u16);
                }
                DspWindow::Data16 => ports.dsp.mem_write(index, value as u16),
            }
            return false;
        }

        match offset {
            0x0000 => debug!(value, "write to CLIO revision ignored"),
            0x0040 => self.interrupts.set_primary_pending(value),
            0x0044 => self.interrupts.clear_primary_pending(value),
            0x0048 => self.interrupts.set_primary_enable(value),
            0x004C => self.interrupts.clear_primary_enable(value),
            0x0060 => self.interrupts.set_secondary_pending(value),
            0x0064 => self.interrupts.clear_secondary_pending(value),
            0x0068 => self.interrupts.set_secondary_enable(value),
            0x006C => self.interrupts.clear_secondary_enable(value),
            0x0100..=0x017F => {
                let timer = ((offset - 0x100) >> 3) as usize;
                if offset & 4 == 0 {
                    self.timers.counter[timer] = value as u16;
                } else {
                    self.timers.backup[timer] = value as u16;
                }
            }
            0x0200 => self.timers.set_control(false, value),
            0x0204 => self.timers.clear_control(false, value),
            0x0208 => self.timers.set_control(true, value),
            0x020C => self.timers.clear_control(true, value),
            DMA_ENABLE_SET => {
                let enabled = self.register(DMA_ENABLE_SET) | value;
                self.set_register(DMA_ENABLE_SET, enabled);
                if value & XBUS_DMA_ENABLE != 0 {
                    self.run_xbus_dma(ports);
                    return true;
                }
            }
            DMA_ENABLE_CLEAR => {
                let enabled = self.register(DMA_ENABLE_SET) & !value;
                self.set_register(DMA_ENABLE_SET, enabled);
            }
            0x0400..=0x04CF => {
                self.input_fifos[((offset - 0x400) >> 4) as usize].write_register(offset, value);
            }
            0x0500..=0x053F => {
                self.output_fifos[((offset - 0x500) >> 4) as usize].write_register(offset, value);
            }
            0x0580..=0x05BF => ports.xbus.write(offset, value),
            DSP_SEMAPHORE => ports.dsp.semaphore_write(value),
            DSP_RESET => ports.dsp.reset(),
            DSP_RUN => {
                self.set_register(DSP_RUN, value & 1);
                ports.dsp.set_running(value & 1 != 0);
            }
            _ => {
                trace!(offset, value, "CLIO register write");
                self.set_register(offset, value);
            }
        }
        false
    }

    /// Pulls one element from input FIFO `channel`.
    pub fn read_input_fifo(&mut self, channel: usize, memory: &Memory) -> u16 {
        let (value, event) = self.input_fifos[channel].read(memory);
        if event.exhausted {
            self.interrupts.generate_fiq(primary::input_fifo(channel), 0);
        }
        value
    }

    /// Pushes one element into output FIFO `channel`.
    pub fn write_output_fifo(&mut self, channel: usize, value: u16, memory: &mut Memory) {
        let event = self.output_fifos[channel].write(value, memory);
        if event.exhausted {
            self.interrupts.generate_fiq(primary::output_fifo(channel), 0);
        }
    }

    /// Publishes the beam position and raises VINT0/VINT1 on a compare hit.
    pub fn update_line_counter(&mut self, line: u32, field: u32) {
        self.set_register(LINE_COUNTER, (field << 11) | (line & 0x7FF));
        if line == self.register(VINT0) & 0x7FF {
            self.interrupts.generate_fiq(primary::VINT0, 0);
        }
        if line == self.register(VINT1) & 0x7FF {
            self.interrupts.generate_fiq(primary::VINT1, 0);
        }
    }

    /// `(line, field)` as last published.
    #[must_use]
    pub fn line_counter(&self) -> (u32, u32) {
        let value = self.register(LINE_COUNTER);
        (value & 0x7FF, value >> 11)
    }

    pub fn tick_timers(&mut self) {
        let raised = self.timers.tick();
        if raised != 0 {
            self.interrupts.generate_fiq(raised, 0);
        }
    }

    pub fn check_xbus_poll(&mut self, xbus: &mut Xbus) {
        if xbus.external_interrupt_pending() {
            self.interrupts.generate_fiq(primary::EXINT, 0);
        }
    }

    /// Rebuilds derived state after a restore.
    pub const fn resync(&mut self) {
        self.interrupts.sync_aggregate();
    }

    #[must_use]
    pub fn save_state(&self) -> Vec<u8> {
        let mut writer = StateWriter::new(STATE_MAGIC, STATE_VERSION);
        writer.u32(REGISTER_FILE_WORDS as u32);
        writer.u32s(&self.registers);

        writer.u32(self.interrupts.primary_pending);
        writer.u32(self.interrupts.primary_enable);
        writer.u32(self.interrupts.secondary_pending);
        writer.u32(self.interrupts.secondary_enable);

        for timer in 0..TIMER_COUNT {
            writer.u16(self.timers.counter[timer]);
            writer.u16(self.timers.backup[timer]);
        }
        writer.u32(self.timers.control_word(false));
        writer.u32(self.timers.control_word(true));

        for channel in self.input_fifos.iter().chain(&self.output_fifos) {
            writer.u32s(&[
                channel.start_address,
                channel.start_length,
                channel.index,
                channel.next_address,
                channel.next_length,
            ]);
        }
        writer.u32s(&self.dsp_shadow);
        writer.finish()
    }

    /// Decodes a blob into a fresh controller, leaving `self` untouched.
    pub fn decode_state(blob: &[u8]) -> Result<Self, StateError> {
        let mut reader = StateReader::new("CLIO", blob, STATE_MAGIC, STATE_VERSION)?;
        let words = reader.u32()? as usize;
        if words != REGISTER_FILE_WORDS {
            return Err(StateError::SizeMismatch {
                subsystem: "CLIO",
                expected: REGISTER_FILE_WORDS,
                found: words,
            });
        }

        let mut clio = Self::default();
        for register in &mut clio.registers {
            *register = reader.u32()?;
        }

        // Bit 31 of primary pending is rebuilt by `resync`.
        clio.interrupts = InterruptControl {
            primary_pending: reader.u32()?,
            primary_enable: reader.u32()?,
            secondary_pending: reader.u32()?,
            secondary_enable: reader.u32()?,
        };

        for timer in 0..TIMER_COUNT {
            clio.timers.counter[timer] = reader.u16()?;
            clio.timers.backup[timer] = reader.u16()?;
        }
        clio.timers.set_control(false, reader.u32()?);
        clio.timers.set_control(true, reader.u32()?);

        for channel in clio.input_fifos.iter_mut().chain(clio.output_fifos.iter_mut()) {
            let [start_address, start_length, index, next_address, next_length] = reader.u32s()?;
            *channel = FifoChannel {
                start_address,
                start_length,
                index,
                next_address,
                next_length,
            };
        }
        clio.dsp_shadow = reader.u32s()?;
        reader.finish()?;

        clio.resync();
        Ok(clio)
    }

    pub fn restore_state(&mut self, blob: &[u8]) -> Result<(), StateError> {
        *self = Self::decode_state(blob)?;
        info!("CLIO state restored");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::hardware::Peripherals;
    use crate::cpu::hardware::interrupt_control::SECONDARY_AGGREGATE;
    use pretty_assertions::assert_eq;

    fn poke(io: &mut Peripherals, memory: &mut Memory, offset: u32, value: u32) -> bool {
        let (clio, mut ports) = io.clio_ports(memory);
        clio.poke(offset, value, &mut ports)
    }

    fn peek(io: &mut Peripherals, memory: &mut Memory, offset: u32) -> u32 {
        let (clio, mut ports) = io.clio_ports(memory);
        clio.peek(offset, &mut ports)
    }

    #[test]
    fn check_revision_and_plain_registers() {
        let mut io = Peripherals::default();
        let mut memory = Memory::default();
        assert_eq!(peek(&mut io, &mut memory, 0), CLIO_REVISION);
        poke(&mut io, &mut memory, 0, 0xFFFF_FFFF);
        assert_eq!(peek(&mut io, &mut memory, 0), CLIO_REVISION);

        poke(&mut io, &mut memory, 0x220, 0x155);
        assert_eq!(peek(&mut io, &mut memory, 0x220), 0x155);
    }

    #[test]
    fn check_pending_set_clear() {
        let mut io = Peripherals::default();
        let mut memory = Memory::default();
        poke(&mut io, &mut memory, 0x40, 0b1010);
        poke(&mut io, &mut memory, 0x44, 0b0010);
        assert_eq!(peek(&mut io, &mut memory, 0x40), 0b1000);

        poke(&mut io, &mut memory, 0x60, 1);
        assert_eq!(peek(&mut io, &mut memory, 0x40), 0b1000 | SECONDARY_AGGREGATE);
        poke(&mut io, &mut memory, 0x64, 1);
        assert_eq!(peek(&mut io, &mut memory, 0x44), 0b1000);
    }

    #[test]
    fn check_timer_registers() {
        let mut io = Peripherals::default();
        let mut memory = Memory::default();
        poke(&mut io, &mut memory, 0x108, 2);
        poke(&mut io, &mut memory, 0x10C, 0x1_0007);
        poke(&mut io, &mut memory, 0x200, 0x30);
        assert_eq!(io.clio.timers.backup[1], 7);

        io.clio.tick_timers();
        io.clio.tick_timers();
        assert_eq!(io.clio.interrupts.primary_pending, 0);
        io.clio.tick_timers();
        assert_eq!(io.clio.interrupts.primary_pending, primary::timer(1));
        assert_eq!(peek(&mut io, &mut memory, 0x108), 7);
    }

    #[test]
    fn check_dsp_windows_split_and_combine() {
        let mut io = Peripherals::default();
        let mut memory = Memory::default();
        poke(&mut io, &mut memory, 0x1804, 0xAAAA_BBBB);
        assert_eq!(peek(&mut io, &mut memory, 0x2008), 0xAAAA);
        assert_eq!(peek(&mut io, &mut memory, 0x200C), 0xBBBB);
        assert_eq!(peek(&mut io, &mut memory, 0x1804), 0xAAAA_BBBB);

        poke(&mut io, &mut memory, 0x3400, 0x1234);
        poke(&mut io, &mut memory, 0x3404, 0x5678);
        assert_eq!(peek(&mut io, &mut memory, 0x3000), 0x1234_5678);
        assert_eq!(io.clio.dsp_shadow, [0xAAAA_BBBB, 0, 0, 0x5678]);
    }

    #[test]
    fn check_dsp_controls() {
        let mut io = Peripherals::default();
        let mut memory = Memory::default();
        poke(&mut io, &mut memory, DSP_SEMAPHORE, 0x77);
        assert_eq!(peek(&mut io, &mut memory, DSP_SEMAPHORE), 0x77);
        poke(&mut io, &mut memory, DSP_RUN, 3);
        assert_eq!(peek(&mut io, &mut memory, DSP_RUN), 1);
    }

    #[test]
    fn check_fifo_interrupts() {
        let mut io = Peripherals::default();
        let mut memory = Memory::default();
        memory.write_ram_word(0x1000, 0x1111_2222);
        memory.write_ram_word(0x2000, 0x3333_4444);

        let base = 0x400 + 16 * 2;
        poke(&mut io, &mut memory, base, 0x1000);
        poke(&mut io, &mut memory, base + 4, 4);
        poke(&mut io, &mut memory, base + 8, 0x2000);
        poke(&mut io, &mut memory, base + 12, 4);

        assert_eq!(io.clio.read_input_fifo(2, &memory), 0x1111);
        assert_eq!(io.clio.read_input_fifo(2, &memory), 0x2222);
        assert_eq!(io.clio.interrupts.primary_pending, 0);
        assert_eq!(io.clio.read_input_fifo(2, &memory), 0x3333);
        assert_eq!(io.clio.interrupts.primary_pending, primary::input_fifo(2));
        assert_eq!(peek(&mut io, &mut memory, base), 0x2002);

        io.clio.write_output_fifo(1, 0xABCD, &mut memory);
        assert_eq!(io.clio.interrupts.primary_pending, primary::input_fifo(2));
    }

    #[test]
    fn check_vertical_interrupts() {
        let mut clio = Clio::default();
        clio.set_register(VINT0, 5);
        clio.set_register(VINT1, 200);
        clio.update_line_counter(4, 1);
        assert_eq!(clio.interrupts.primary_pending, 0);
        clio.update_line_counter(5, 1);
        assert_eq!(clio.interrupts.primary_pending, primary::VINT0);
        assert_eq!(clio.register(LINE_COUNTER), (1 << 11) | 5);
        assert_eq!(clio.line_counter(), (5, 1));
        clio.update_line_counter(200, 1);
        assert_eq!(clio.interrupts.primary_pending, primary::VINT0 | primary::VINT1);
    }

    #[test]
    fn check_state_round_trip_rebuilds_aggregate() {
        let mut clio = Clio::default();
        clio.set_register(0x220, 0x42);
        clio.interrupts.set_secondary_pending(0x8);
        clio.timers.counter[5] = 0x1234;
        clio.timers.set_control(true, 0x0000_0010);
        clio.output_fifos[3].write_register(0x0, 0x4000);
        clio.dsp_shadow[2] = 9;

        // Tamper with the stored aggregate bit: it has to be derived again.
        clio.interrupts.primary_pending &= !SECONDARY_AGGREGATE;
        let blob = clio.save_state();

        let restored = Clio::decode_state(&blob).unwrap();
        assert_eq!(restored.register(0x220), 0x42);
        assert_eq!(restored.interrupts.primary_pending, SECONDARY_AGGREGATE);
        assert_eq!(restored.timers, {
            let mut timers = Timers::default();
            timers.counter[5] = 0x1234;
            timers.set_control(true, 0x10);
            timers
        });
        assert_eq!(restored.output_fifos[3].start_address, 0x4000);
        assert_eq!(restored.dsp_shadow, [0, 0, 9, 0]);

        let mut truncated = blob.clone();
        truncated.pop();
        assert!(matches!(
            Clio::decode_state(&truncated),
            Err(StateError::Truncated { .. })
        ));
    }
}
