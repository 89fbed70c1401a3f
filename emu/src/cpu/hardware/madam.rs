use tracing::trace;

/// Register offset holding the XBUS DMA destination address.
pub const XBUS_DMA_ADDRESS: u32 = 0x540;

/// Register offset holding the XBUS DMA byte count.
pub const XBUS_DMA_LENGTH: u32 = 0x544;

/// Register window of the graphics controller.
pub trait Madam {
    fn peek(&mut self, index: u32) -> u32;
    fn poke(&mut self, index: u32, value: u32);
}

/// Register file without any behaviour behind it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MadamRegisters {
    registers: Vec<u32>,
}

impl Default for MadamRegisters {
    fn default() -> Self {
        Self {
            registers: vec![0; 0x800 / 4],
        }
    }
}

impl Madam for MadamRegisters {
    fn peek(&mut self, index: u32) -> u32 {
        self.registers[(index as usize & 0x7FF) >> 2]
    }

    fn poke(&mut self, index: u32, value: u32) {
        trace!(index, value, "MADAM poke");
        self.registers[(index as usize & 0x7FF) >> 2] = value;
    }
}
