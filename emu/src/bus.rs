//! # Address Decoding
//!
//! Every CPU access is routed by [`decode`], testing windows in this order:
//!
//! | Window                      | Target                                 |
//! |-----------------------------|----------------------------------------|
//! | 0x0000_0000 - 0x002F_FFFF   | DRAM + VRAM                            |
//! | 0x0330_0000 - 0x0330_07FF   | MADAM registers                        |
//! | 0x0340_0000 - 0x0340_FFFF   | CLIO registers                         |
//! | 0x0320_0000 - 0x032F_FFFF   | VRAM serial port                       |
//! | 0x0318_0000 - 0x031F_FFFF   | diagnostic port                        |
//! | 0x0314_0000 - 0x0317_FFFF   | NVRAM                                  |
//! | 0x0300_0000 - 0x030F_FFFF   | ROM (selected bank)                    |
//!
//! Anything else reads as [`SENTINEL`] and swallows writes. The rest of the
//! 0x0310_0000 block behaves the same way.
//!
//! Memory is big-endian. Byte and halfword reads from a register window
//! read the whole word and pick the addressed lane; narrow writes are widened
//! to a zero-extended word.

use tracing::debug;

use crate::cpu::hardware::Peripherals;
use crate::cpu::memory::{Memory, RAM_END};

/// Value returned by reads that hit nothing.
pub const SENTINEL: u32 = 0xBADA_CCE5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Region {
    Ram,
    Madam,
    Clio,
    Sport,
    Diagnostic,
    Nvram,
    Rom,
    Unmapped,
}

#[must_use]
pub const fn decode(address: u32) -> Region {
    if address < RAM_END {
        Region::Ram
    } else if (address ^ 0x0330_0000) & !0x7FF == 0 {
        Region::Madam
    } else if (address ^ 0x0340_0000) & !0xFFFF == 0 {
        Region::Clio
    } else if (address ^ 0x0320_0000) & !0xF_FFFF == 0 {
        Region::Sport
    } else if (address ^ 0x0310_0000) & !0xF_FFFF == 0 {
        if address & 0x8_0000 != 0 {
            Region::Diagnostic
        } else if address & 0x4_0000 != 0 {
            Region::Nvram
        } else {
            Region::Unmapped
        }
    } else if (address ^ 0x0300_0000) & !0xF_FFFF == 0 {
        Region::Rom
    } else {
        Region::Unmapped
    }
}

/// A view of the whole address space for the duration of one access.
pub struct Bus<'a> {
    pub memory: &'a mut Memory,
    pub io: &'a mut Peripherals,
}

impl<'a> Bus<'a> {
    pub fn new(memory: &'a mut Memory, io: &'a mut Peripherals) -> Self {
        Self { memory, io }
    }

    pub fn read_word(&mut self, address: u32) -> u32 {
        match decode(address) {
            Region::Ram => self.memory.read_ram_word(address),
            Region::Madam => self.io.madam.peek(address & 0x7FF),
            Region::Clio => {
                let (clio, mut ports) = self.io.clio_ports(self.memory);
                clio.peek(address & 0xFFFF, &mut ports)
            }
            Region::Sport => {
                self.io.sport.set_source(address & 0xF_FFFF);
                SENTINEL
            }
            Region::Diagnostic => self.io.diagnostic.read(),
            Region::Nvram => self.memory.read_nvram(address & 0xF_FFFF).into(),
            Region::Rom => self.memory.read_rom_word(address & 0xF_FFFF),
            Region::Unmapped => {
                debug!(address, "read from unmapped address");
                SENTINEL
            }
        }
    }

    pub fn read_half_word(&mut self, address: u32) -> u16 {
        if decode(address) == Region::Ram {
            return self.memory.read_ram_half_word(address);
        }
        let lane = 16 - (address & 2) * 8;
        (self.read_word(address) >> lane) as u16
    }

    pub fn read_byte(&mut self, address: u32) -> u8 {
        match decode(address) {
            Region::Ram => self.memory.read_ram_byte(address),
            Region::Nvram => self.memory.read_nvram(address & 0xF_FFFF),
            _ => {
                let lane = 24 - (address & 3) * 8;
                (self.read_word(address) >> lane) as u8
            }
        }
    }

    /// Returns `true` when the write stalled the bus.
    pub fn write_word(&mut self, address: u32, value: u32) -> bool {
        match decode(address) {
            Region::Ram => self.memory.write_ram_word(address, value),
            Region::Madam => self.io.madam.poke(address & 0x7FF, value),
            Region::Clio => {
                let (clio, mut ports) = self.io.clio_ports(self.memory);
                return clio.poke(address & 0xFFFF, value, &mut ports);
            }
            Region::Sport => {
                self.io
                    .sport
                    .write_access(self.memory.vram_mut(), address & 0xF_FFFF, value);
            }
            Region::Diagnostic => self.io.diagnostic.write(value),
            Region::Nvram => self.memory.write_nvram(address & 0xF_FFFF, value as u8),
            Region::Rom | Region::Unmapped => {
                debug!(address, value, "write to read-only or unmapped address");
            }
        }
        false
    }

    /// Outside RAM the halfword is driven on both halves of the data bus.
    pub fn write_half_word(&mut self, address: u32, value: u16) -> bool {
        if decode(address) == Region::Ram {
            self.memory.write_ram_half_word(address, value);
            return false;
        }
        self.write_word(address, u32::from(value) * 0x0001_0001)
    }

    /// Outside RAM the byte is driven on all four lanes of the data bus.
    pub fn write_byte(&mut self, address: u32, value: u8) -> bool {
        if decode(address) == Region::Ram {
            self.memory.write_ram_byte(address, value);
            return false;
        }
        self.write_word(address, u32::from(value) * 0x0101_0101)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::hardware::dma::XBUS_DMA_ENABLE;
    use crate::cpu::memory::VRAM_START;
    use pretty_assertions::assert_eq;

    #[test]
    fn check_decode_priority() {
        assert_eq!(decode(0x0000_0000), Region::Ram);
        assert_eq!(decode(0x002F_FFFF), Region::Ram);
        assert_eq!(decode(0x0030_0000), Region::Unmapped);
        assert_eq!(decode(0x0330_07FC), Region::Madam);
        assert_eq!(decode(0x0330_0800), Region::Unmapped);
        assert_eq!(decode(0x0340_0040), Region::Clio);
        assert_eq!(decode(0x0341_0000), Region::Unmapped);
        assert_eq!(decode(0x0320_1234), Region::Sport);
        assert_eq!(decode(0x0318_0000), Region::Diagnostic);
        assert_eq!(decode(0x031C_0000), Region::Diagnostic);
        assert_eq!(decode(0x0314_0000), Region::Nvram);
        assert_eq!(decode(0x0310_0000), Region::Unmapped);
        assert_eq!(decode(0x0300_0000), Region::Rom);
        assert_eq!(decode(0x030F_FFFC), Region::Rom);
        assert_eq!(decode(0xFFFF_FFFC), Region::Unmapped);
    }

    #[test]
    fn check_sentinel() {
        let mut memory = Memory::default();
        let mut io = Peripherals::default();
        let mut bus = Bus::new(&mut memory, &mut io);
        assert_eq!(bus.read_word(0x0500_0000), SENTINEL);
        assert_eq!(bus.read_byte(0x0500_0000), 0xBA);
        assert_eq!(bus.read_half_word(0x0500_0002), 0xCCE5);
        assert!(!bus.write_word(0x0500_0000, 1));
    }

    #[test]
    fn check_rom_lanes_and_bank_switch() {
        let mut memory = Memory::default();
        memory.load_rom(0, &[0x11, 0x22, 0x33, 0x44]).unwrap();
        memory.load_rom(1, &[0xAA, 0xBB, 0xCC, 0xDD]).unwrap();
        let mut io = Peripherals::default();

        let mut bus = Bus::new(&mut memory, &mut io);
        assert_eq!(bus.read_word(0x0300_0000), 0x1122_3344);
        assert_eq!(bus.read_byte(0x0300_0001), 0x22);
        assert_eq!(bus.read_half_word(0x0300_0002), 0x3344);
        bus.write_word(0x0300_0000, 0);
        assert_eq!(bus.read_word(0x0300_0000), 0x1122_3344);

        memory.select_rom(1).unwrap();
        let mut bus = Bus::new(&mut memory, &mut io);
        assert_eq!(bus.read_word(0x0300_0000), 0xAABB_CCDD);
    }

    #[test]
    fn check_hires_mirrors_through_bus() {
        let mut memory = Memory::default();
        memory.set_high_resolution(true);
        let mut io = Peripherals::default();
        let mut bus = Bus::new(&mut memory, &mut io);
        bus.write_half_word(VRAM_START + 2, 0xBEEF);
        bus.write_byte(VRAM_START + 5, 0x7A);
        for page in 0..3 {
            let shadow = memory.hires_page(page).unwrap();
            assert_eq!(&shadow[2..4], &[0xBE, 0xEF]);
            assert_eq!(shadow[5], 0x7A);
        }
    }

    #[test]
    fn check_nvram_and_diagnostic() {
        let mut memory = Memory::default();
        let mut io = Peripherals::default();
        io.diagnostic.input.push_back(0x55);

        let mut bus = Bus::new(&mut memory, &mut io);
        bus.write_word(0x0314_0008, 0x1234_56AB);
        assert_eq!(bus.read_word(0x0314_0008), 0xAB);
        assert_eq!(bus.read_byte(0x0314_000B), 0xAB);

        bus.write_word(0x0318_0000, 0x42);
        assert_eq!(bus.read_word(0x0318_0000), 0x55);
        assert_eq!(bus.read_word(0x0318_0000), 0);
        assert_eq!(io.diagnostic.output, vec![0x42]);
    }

    #[test]
    fn check_peripheral_windows() {
        let mut memory = Memory::default();
        let mut io = Peripherals::default();
        let mut bus = Bus::new(&mut memory, &mut io);

        bus.write_word(0x0330_0100, 0xCAFE_F00D);
        assert_eq!(bus.read_half_word(0x0330_0100), 0xCAFE);
        assert_eq!(bus.read_byte(0x0330_0103), 0x0D);

        bus.write_word(0x0340_0048, 0x81);
        assert_eq!(bus.read_word(0x0340_0048), 0x81);

        assert_eq!(bus.read_word(0x0320_0010), SENTINEL);
        assert!(!bus.write_word(0x0320_0010, 0));
        assert_eq!(io.madam.peek(0x100), 0xCAFE_F00D);
    }

    #[test]
    fn check_narrow_writes_fill_every_lane() {
        let mut memory = Memory::default();
        let mut io = Peripherals::default();
        let mut bus = Bus::new(&mut memory, &mut io);

        bus.write_byte(0x0330_0101, 0x5A);
        assert_eq!(bus.read_word(0x0330_0100), 0x5A5A_5A5A);
        assert_eq!(bus.read_byte(0x0330_0101), 0x5A);

        bus.write_half_word(0x0330_0202, 0xBEEF);
        assert_eq!(bus.read_word(0x0330_0200), 0xBEEF_BEEF);
        assert_eq!(bus.read_half_word(0x0330_0202), 0xBEEF);

        // NVRAM keeps the low lane, whichever byte of the slot is addressed.
        bus.write_byte(0x0314_0010, 0xC3);
        assert_eq!(bus.read_byte(0x0314_0013), 0xC3);

        bus.write_byte(0x0318_0000, 0x42);
        assert_eq!(io.diagnostic.output, vec![0x4242_4242]);
    }

    #[test]
    fn check_dma_kick_stalls_bus() {
        let mut memory = Memory::default();
        let mut io = Peripherals::default();
        io.madam.poke(0x544, (-4_i32) as u32);
        let mut bus = Bus::new(&mut memory, &mut io);
        assert!(bus.write_word(0x0340_0304, XBUS_DMA_ENABLE));
        assert!(!bus.write_word(0x0340_0304, 1));
    }
}
