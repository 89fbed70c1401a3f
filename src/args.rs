use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use clap::Parser;
use emu::config::ConsoleConfig;
use emu::cpu::memory::RomError;
use thiserror::Error;

#[derive(Parser, Debug, Clone)]
#[command(version, about = "Runs an ARM60 console ROM headless.")]
pub struct Args {
    /// Boot ROM image, mapped at 0x0300_0000.
    pub rom: PathBuf,

    /// Image for the secondary ROM bank.
    #[arg(long)]
    pub rom2: Option<PathBuf>,

    /// Number of video fields to run.
    #[arg(long, default_value_t = 60)]
    pub fields: u32,

    /// JSON console configuration. The flags below are applied on top.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Run known SWI calls natively.
    #[arg(long)]
    pub hle: bool,

    /// Mirror VRAM writes into the high-resolution pages.
    #[arg(long)]
    pub hires: bool,

    /// Apply the ROM-specific PC patches.
    #[arg(long)]
    pub compat: bool,

    /// Write logs to this file instead of stderr.
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Print the final registers as JSON on stdout.
    #[arg(long)]
    pub dump_registers: bool,
}

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("ROM {} not found", path.display())]
    MissingRom { path: PathBuf },

    #[error("cannot access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid config {}: {source}", path.display())]
    Config {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Rom(#[from] RomError),

    #[error("cannot encode register dump: {0}")]
    Dump(#[from] serde_json::Error),
}

impl RunnerError {
    /// 1 for a missing ROM, 2 for everything else.
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::MissingRom { .. } => 1,
            _ => 2,
        }
    }
}

impl Args {
    /// The config file (or the defaults) with the command-line flags applied.
    pub fn console_config(&self) -> Result<ConsoleConfig, RunnerError> {
        let mut config = match &self.config {
            Some(path) => {
                let text = fs::read_to_string(path).map_err(|source| RunnerError::Io {
                    path: path.clone(),
                    source,
                })?;
                serde_json::from_str(&text).map_err(|source| RunnerError::Config {
                    path: path.clone(),
                    source,
                })?
            }
            None => ConsoleConfig::default(),
        };

        config.hle_swi |= self.hle;
        config.high_resolution |= self.hires;
        config.compat_patches |= self.compat;
        Ok(config)
    }
}

pub fn read_rom(path: &Path) -> Result<Vec<u8>, RunnerError> {
    fs::read(path).map_err(|source| {
        if source.kind() == io::ErrorKind::NotFound {
            RunnerError::MissingRom {
                path: path.to_path_buf(),
            }
        } else {
            RunnerError::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use emu::config::VideoStandard;
    use pretty_assertions::assert_eq;

    #[test]
    fn check_flags_parse() {
        let args = Args::try_parse_from(["opal", "boot.rom", "--fields", "3", "--hle"]).unwrap();
        assert_eq!(args.rom, PathBuf::from("boot.rom"));
        assert_eq!(args.fields, 3);
        assert!(args.hle);
        assert!(!args.dump_registers);
        assert_eq!(args.rom2, None);
    }

    #[test]
    fn check_flags_overlay_config_file() {
        let path = std::env::temp_dir().join(format!("opal-config-{}.json", std::process::id()));
        fs::write(&path, r#"{ "video": "pal", "cpu_clock_hz": 1000000 }"#).unwrap();

        let args = Args::try_parse_from([
            "opal".as_ref(),
            "boot.rom".as_ref(),
            "--config".as_ref(),
            path.as_os_str(),
            "--hires".as_ref(),
        ])
        .unwrap();
        let config = args.console_config().unwrap();
        fs::remove_file(&path).unwrap();

        assert_eq!(
            config,
            ConsoleConfig {
                video: VideoStandard::Pal,
                cpu_clock_hz: 1_000_000,
                high_resolution: true,
                ..ConsoleConfig::default()
            }
        );
    }

    #[test]
    fn check_missing_rom_exit_code() {
        let err = read_rom(Path::new("/nonexistent/opal/boot.rom")).unwrap_err();
        assert!(matches!(err, RunnerError::MissingRom { .. }));
        assert_eq!(err.exit_code(), 1);

        let err = RunnerError::Rom(RomError::NoSuchBank(2));
        assert_eq!(err.exit_code(), 2);
    }
}
