//! XBUS to RAM DMA.
//!
//! Kicked by writing [`XBUS_DMA_ENABLE`] to the DMA enable register. The
//! destination and byte count come from MADAM, the bytes from the selected
//! XBUS device. The whole transfer completes inside the triggering write.

use tracing::{debug, info};

use crate::cpu::hardware::ClioPorts;
use crate::cpu::hardware::clio::{Clio, DMA_ENABLE_SET, XBUS_DMA_CONTROL};
use crate::cpu::hardware::interrupt_control::primary;
use crate::cpu::hardware::madam::{XBUS_DMA_ADDRESS, XBUS_DMA_LENGTH};
use crate::cpu::memory::RAM_END;

/// DMA enable bit for the XBUS channel.
pub const XBUS_DMA_ENABLE: u32 = 0x0010_0000;

/// XBUS DMA control: store each word with its bytes reversed.
pub const XBUS_DMA_SWAP: u32 = 1;

/// XBUS DMA control: transfer finished.
pub const XBUS_DMA_READY: u32 = 1 << 31;

impl Clio {
    pub(super) fn run_xbus_dma(&mut self, ports: &mut ClioPorts<'_>) {
        let control = self.register(XBUS_DMA_CONTROL);
        let swap = control & XBUS_DMA_SWAP != 0;
        let mut destination = ports.madam.peek(XBUS_DMA_ADDRESS);
        // The count is "bytes minus four": the loop runs while it stays >= 0.
        let mut length = ports.madam.peek(XBUS_DMA_LENGTH) as i32;
        info!(destination, length, swap, "XBUS DMA");

        while length >= 0 {
            let mut word = [0; 4];
            for byte in &mut word {
                *byte = ports.xbus.data();
            }
            if swap {
                word.reverse();
            }
            for (offset, byte) in (0..).zip(word) {
                let address = destination.wrapping_add(offset);
                if address < RAM_END {
                    ports.memory.write_ram_byte(address, byte);
                } else {
                    debug!(address, "XBUS DMA outside RAM");
                }
            }
            destination = destination.wrapping_add(4);
            length -= 4;
        }

        let enabled = self.register(DMA_ENABLE_SET) & !XBUS_DMA_ENABLE;
        self.set_register(DMA_ENABLE_SET, enabled);
        self.set_register(XBUS_DMA_CONTROL, control | XBUS_DMA_READY);
        ports.madam.poke(XBUS_DMA_ADDRESS, destination);
        ports.madam.poke(XBUS_DMA_LENGTH, length as u32);
        self.interrupts.generate_fiq(primary::XBUS_DMA_DONE, 0);
    }
}
