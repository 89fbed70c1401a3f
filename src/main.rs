mod args;

use std::fs::File;
use std::path::Path;
use std::process::ExitCode;
use std::time::Instant;

use clap::Parser;
use emu::console::{Console, LineCounters};
use emu::cpu::arm60::RegisterDump;
use serde::Serialize;
use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use crate::args::{Args, RunnerError, read_rom};

#[derive(Serialize)]
struct Report {
    counters: LineCounters,
    cycles: u64,
    cpu: RegisterDump,
}

fn main() -> ExitCode {
    let args = Args::parse();

    // The guard flushes the file writer when dropped, keep it for all of main.
    let _guard = match init_logging(args.log_file.as_deref()) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::from(e.exit_code());
        }
    };

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            eprintln!("error: {e}");
            ExitCode::from(e.exit_code())
        }
    }
}

fn init_logging(log_file: Option<&Path>) -> Result<Option<WorkerGuard>, RunnerError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let Some(path) = log_file else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
        return Ok(None);
    };

    let file = File::create(path).map_err(|source| RunnerError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let (writer, guard) = tracing_appender::non_blocking(file);
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_writer(writer)
        .init();
    Ok(Some(guard))
}

fn run(args: &Args) -> Result<(), RunnerError> {
    let config = args.console_config()?;
    let mut console = Console::new(config);

    console.load_rom(0, &read_rom(&args.rom)?)?;
    if let Some(path) = &args.rom2 {
        console.load_rom(1, &read_rom(path)?)?;
    }

    info!(fields = args.fields, rom = %args.rom.display(), "running");
    let started = Instant::now();
    for _ in 0..args.fields {
        console.run_field();
    }
    info!(
        cycles = console.cycles(),
        pc = console.cpu.registers.program_counter(),
        elapsed = ?started.elapsed(),
        "finished"
    );

    let diagnostic = &console.io.diagnostic.output;
    if !diagnostic.is_empty() {
        info!(words = diagnostic.len(), "diagnostic port output: {diagnostic:08X?}");
    }

    if args.dump_registers {
        let report = Report {
            counters: console.counters(),
            cycles: console.cycles(),
            cpu: console.cpu.dump(),
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    }
    Ok(())
}
