use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoStandard {
    #[default]
    Ntsc,
    Pal,
}

impl VideoStandard {
    #[must_use]
    pub const fn lines_per_field(self) -> u32 {
        match self {
            Self::Ntsc => 263,
            Self::Pal => 312,
        }
    }

    #[must_use]
    pub const fn fields_per_second(self) -> u32 {
        match self {
            Self::Ntsc => 60,
            Self::Pal => 50,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleConfig {
    pub video: VideoStandard,
    pub cpu_clock_hz: u32,

    /// Mirror VRAM writes into the high-resolution shadow pages.
    pub high_resolution: bool,

    /// Run known SWI numbers natively.
    pub hle_swi: bool,

    /// Apply the ROM-specific PC patches.
    pub compat_patches: bool,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            video: VideoStandard::default(),
            cpu_clock_hz: 12_500_000,
            high_resolution: false,
            hle_swi: false,
            compat_patches: false,
        }
    }
}

impl ConsoleConfig {
    /// CPU cycles available per scanline.
    #[must_use]
    pub const fn cycles_per_line(&self) -> u32 {
        let lines_per_second = self.video.fields_per_second() * self.video.lines_per_field();
        self.cpu_clock_hz / lines_per_second
    }
}
