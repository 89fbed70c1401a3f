//! The whole machine driven one scanline at a time.
//!
//! A scanline runs the CPU until the line's cycle budget is spent, with any
//! overshoot carried into the next line. Then the timers tick, the XBUS poll
//! is checked and CLIO publishes the new line counter, which may raise the
//! vertical-line interrupts.

use serde::Serialize;
use tracing::info;

use crate::compat::CompatShim;
use crate::config::ConsoleConfig;
use crate::cpu::arm60::Arm60;
use crate::cpu::hardware::Peripherals;
use crate::cpu::hardware::clio::Clio;
use crate::cpu::memory::RomError;
use crate::cpu::swi::SwiTable;
use crate::state::StateError;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LineCounters {
    pub line: u32,
    pub field: u32,
}

/// One blob per subsystem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveState {
    pub cpu: Vec<u8>,
    pub clio: Vec<u8>,
    pub xbus: Vec<u8>,
}

pub struct Console {
    pub cpu: Arm60,
    pub io: Peripherals,
    config: ConsoleConfig,
    counters: LineCounters,

    /// Cycles already spent past the previous line's budget.
    carry: u32,
    cycles: u64,
}

impl Console {
    #[must_use]
    pub fn new(config: ConsoleConfig) -> Self {
        let mut cpu = Arm60::default();
        cpu.memory.set_high_resolution(config.high_resolution);
        cpu.set_hle(config.hle_swi.then(SwiTable::default));
        cpu.set_compat(config.compat_patches.then(CompatShim::default));
        info!(
            video = ?config.video,
            cycles_per_line = config.cycles_per_line(),
            "console created"
        );

        Self {
            cpu,
            io: Peripherals::default(),
            config,
            counters: LineCounters::default(),
            carry: 0,
            cycles: 0,
        }
    }

    #[must_use]
    pub const fn config(&self) -> &ConsoleConfig {
        &self.config
    }

    #[must_use]
    pub const fn counters(&self) -> LineCounters {
        self.counters
    }

    /// Total CPU cycles executed since creation or the last reset.
    #[must_use]
    pub const fn cycles(&self) -> u64 {
        self.cycles
    }

    pub fn load_rom(&mut self, bank: usize, image: &[u8]) -> Result<(), RomError> {
        self.cpu.memory.load_rom(bank, image)
    }

    /// Resets the CPU and peripherals. RAM, ROM and NVRAM keep their contents.
    pub fn reset(&mut self) {
        self.cpu.reset();
        self.io.reset();
        self.counters = LineCounters::default();
        self.carry = 0;
        self.cycles = 0;
    }

    pub fn step(&mut self) -> u32 {
        let cycles = self.cpu.step(&mut self.io);
        self.cycles += u64::from(cycles);
        cycles
    }

    pub fn run_line(&mut self) -> LineCounters {
        let budget = self.config.cycles_per_line();
        let mut spent = self.carry;
        while spent < budget {
            spent += self.step();
        }
        self.carry = spent - budget;

        self.io.tick_line();

        let lines = self.config.video.lines_per_field();
        self.counters.line += 1;
        if self.counters.line >= lines {
            self.counters.line = 0;
            self.counters.field ^= 1;
        }
        self.io
            .clio
            .update_line_counter(self.counters.line, self.counters.field);
        self.counters
    }

    pub fn run_field(&mut self) -> LineCounters {
        for _ in 0..self.config.video.lines_per_field() {
            self.run_line();
        }
        self.counters
    }

    #[must_use]
    pub fn save_state(&self) -> SaveState {
        SaveState {
            cpu: self.cpu.save_state(),
            clio: self.io.clio.save_state(),
            xbus: self.io.xbus.save_state(),
        }
    }

    /// Restores all subsystems. Every blob is validated before anything is
    /// applied, so a bad snapshot leaves the machine as it was.
    pub fn load_state(&mut self, state: &SaveState) -> Result<(), StateError> {
        let cpu = Arm60::decode_state(&state.cpu)?;
        let clio = Clio::decode_state(&state.clio)?;
        let xbus = self.io.xbus.decode_state(&state.xbus)?;

        self.io.xbus.apply_state(xbus)?;
        self.io.clio = clio;
        self.cpu.apply_state(cpu);

        let (line, field) = self.io.clio.line_counter();
        self.counters = LineCounters {
            line,
            field: field & 1,
        };
        self.carry = 0;
        info!(line, field, "console state restored");
        Ok(())
    }
}
