use tracing::trace;

/// VRAM serial port engine.
pub trait Sport {
    /// A write into the serial port window, `index` is the window offset.
    fn write_access(&mut self, vram: &mut [u8], index: u32, mask: u32);

    /// A read of the window latches `index` as the next copy source.
    fn set_source(&mut self, index: u32);
}

/// Records the last source latch and otherwise ignores traffic.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DetachedSport {
    pub source: Option<u32>,
}

impl Sport for DetachedSport {
    fn write_access(&mut self, _vram: &mut [u8], index: u32, mask: u32) {
        trace!(index, mask, "SPORT write ignored");
    }

    fn set_source(&mut self, index: u32) {
        self.source = Some(index);
    }
}
