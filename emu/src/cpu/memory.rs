//! Backing stores owned by the CPU: working RAM, two ROM banks and NVRAM.
//!
//! Guest memory is big-endian: the byte at the lowest address of a word is
//! its most significant byte.

use thiserror::Error;
use tracing::info;

/// From 0x00000000 to 0x001FFFFF.
pub const DRAM_SIZE: usize = 2 * 1024 * 1024;

/// From 0x00200000 to 0x002FFFFF.
pub const VRAM_SIZE: usize = 1024 * 1024;

pub const VRAM_START: u32 = DRAM_SIZE as u32;

/// End of the CPU-visible RAM window.
pub const RAM_END: u32 = (DRAM_SIZE + VRAM_SIZE) as u32;

/// High-resolution mode keeps this many extra copies of VRAM, each 1MB past
/// the previous one, starting right after `RAM_END`.
pub const HIRES_SHADOW_PAGES: usize = 3;

pub const ROM_SIZE: usize = 1024 * 1024;

pub const NVRAM_SIZE: usize = 32 * 1024;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RomError {
    #[error("ROM image is {len} bytes, bank holds at most {ROM_SIZE}")]
    TooLarge { len: usize },

    #[error("no ROM bank {0}, only 0 and 1 exist")]
    NoSuchBank(usize),
}

pub struct Memory {
    /// DRAM, VRAM and the high-resolution VRAM shadows, in that order.
    ram: Vec<u8>,
    roms: [Vec<u8>; 2],
    rom_bank: usize,

    /// One byte per 32-bit slot of the NVRAM window.
    nvram: Vec<u8>,
    high_resolution: bool,
}

impl Default for Memory {
    fn default() -> Self {
        Self {
            ram: vec![0; RAM_END as usize + HIRES_SHADOW_PAGES * VRAM_SIZE],
            roms: [vec![0; ROM_SIZE], vec![0; ROM_SIZE]],
            rom_bank: 0,
            nvram: vec![0; NVRAM_SIZE],
            high_resolution: false,
        }
    }
}

impl Memory {
    /// Copies `image` to the start of `bank`, the remainder is zero filled.
    pub fn load_rom(&mut self, bank: usize, image: &[u8]) -> Result<(), RomError> {
        if image.len() > ROM_SIZE {
            return Err(RomError::TooLarge { len: image.len() });
        }
        let rom = self.roms.get_mut(bank).ok_or(RomError::NoSuchBank(bank))?;
        rom.fill(0);
        rom[..image.len()].copy_from_slice(image);
        info!(bank, len = image.len(), "ROM loaded");
        Ok(())
    }

    pub fn select_rom(&mut self, bank: usize) -> Result<(), RomError> {
        if bank >= self.roms.len() {
            return Err(RomError::NoSuchBank(bank));
        }
        self.rom_bank = bank;
        Ok(())
    }

    #[must_use]
    pub const fn rom_bank(&self) -> usize {
        self.rom_bank
    }

    pub fn set_high_resolution(&mut self, enabled: bool) {
        self.high_resolution = enabled;
        if enabled {
            self.rederive_mirrors();
        }
    }

    #[must_use]
    pub const fn high_resolution(&self) -> bool {
        self.high_resolution
    }

    /// Rebuilds every high-resolution shadow page from the base VRAM copy.
    pub fn rederive_mirrors(&mut self) {
        let (visible, shadows) = self.ram.split_at_mut(RAM_END as usize);
        let vram = &visible[VRAM_START as usize..];
        if self.high_resolution {
            for page in shadows.chunks_exact_mut(VRAM_SIZE) {
                page.copy_from_slice(vram);
            }
        } else {
            shadows.fill(0);
        }
    }

    /// Replaces RAM, both ROM banks and NVRAM from a snapshot, then rebuilds
    /// the shadows. Slice lengths must already match the fixed sizes.
    pub(crate) fn restore_images(
        &mut self,
        ram: &[u8],
        roms: [&[u8]; 2],
        nvram: &[u8],
        rom_bank: usize,
        high_resolution: bool,
    ) {
        self.ram[..RAM_END as usize].copy_from_slice(ram);
        for (rom, image) in self.roms.iter_mut().zip(roms) {
            rom.copy_from_slice(image);
        }
        self.nvram.copy_from_slice(nvram);
        self.rom_bank = rom_bank;
        self.high_resolution = high_resolution;
        self.rederive_mirrors();
    }

    /// The CPU-visible RAM, DRAM followed by VRAM.
    #[must_use]
    pub fn ram(&self) -> &[u8] {
        &self.ram[..RAM_END as usize]
    }

    pub fn vram_mut(&mut self) -> &mut [u8] {
        &mut self.ram[VRAM_START as usize..RAM_END as usize]
    }

    /// High-resolution shadow `page` (0..3) of VRAM.
    #[must_use]
    pub fn hires_page(&self, page: usize) -> Option<&[u8]> {
        let start = RAM_END as usize + page * VRAM_SIZE;
        self.ram.get(start..start + VRAM_SIZE)
    }

    #[must_use]
    pub fn rom(&self, bank: usize) -> Option<&[u8]> {
        self.roms.get(bank).map(Vec::as_slice)
    }

    #[must_use]
    pub fn nvram(&self) -> &[u8] {
        &self.nvram
    }

    pub fn nvram_mut(&mut self) -> &mut [u8] {
        &mut self.nvram
    }

    #[must_use]
    pub fn read_ram_word(&self, address: u32) -> u32 {
        let a = (address & !3) as usize;
        u32::from_be_bytes([self.ram[a], self.ram[a + 1], self.ram[a + 2], self.ram[a + 3]])
    }

    #[must_use]
    pub fn read_ram_half_word(&self, address: u32) -> u16 {
        let a = (address & !1) as usize;
        u16::from_be_bytes([self.ram[a], self.ram[a + 1]])
    }

    #[must_use]
    pub fn read_ram_byte(&self, address: u32) -> u8 {
        self.ram[address as usize]
    }

    pub fn write_ram_word(&mut self, address: u32, value: u32) {
        self.write_ram(address & !3, &value.to_be_bytes());
    }

    pub fn write_ram_half_word(&mut self, address: u32, value: u16) {
        self.write_ram(address & !1, &value.to_be_bytes());
    }

    pub fn write_ram_byte(&mut self, address: u32, value: u8) {
        self.write_ram(address, &[value]);
    }

    fn write_ram(&mut self, address: u32, bytes: &[u8]) {
        let start = address as usize;
        self.ram[start..start + bytes.len()].copy_from_slice(bytes);
        if self.high_resolution && address >= VRAM_START {
            for page in 1..=HIRES_SHADOW_PAGES {
                let mirror = start + page * VRAM_SIZE;
                self.ram[mirror..mirror + bytes.len()].copy_from_slice(bytes);
            }
        }
    }

    /// Reads from the selected ROM bank, `index` is the offset in the window.
    #[must_use]
    pub fn read_rom_word(&self, index: u32) -> u32 {
        let rom = &self.roms[self.rom_bank];
        let a = (index & !3) as usize;
        u32::from_be_bytes([rom[a], rom[a + 1], rom[a + 2], rom[a + 3]])
    }

    #[must_use]
    pub fn read_nvram(&self, index: u32) -> u8 {
        self.nvram[nvram_slot(index)]
    }

    pub fn write_nvram(&mut self, index: u32, value: u8) {
        self.nvram[nvram_slot(index)] = value;
    }
}

const fn nvram_slot(index: u32) -> usize {
    ((index >> 2) as usize) & (NVRAM_SIZE - 1)
}
