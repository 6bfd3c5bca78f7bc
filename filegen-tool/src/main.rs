//! filegen CLI binary.
//!
//! Entry point for the `filegen` command-line tool.

use std::io;
use std::process::ExitCode;

use clap::Parser;
use filegen::{CurrentProcess, FileGenContext, Level, Logger, StderrLogger};
use filegen_clock::{SystemClock, UptimeClock};
use filegen_fs::RealFilesystem;
use filegen_tool::exit::{codes, exit_code};
use filegen_tool::{execute_names, execute_tee, Cli, Command, CommandError, NamesArgs, TeeArgs};

fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Names(args) => run_names(args),
        Command::Tee(args) => run_tee(args),
    };

    match result {
        Ok(()) => ExitCode::from(codes::SUCCESS as u8),
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::from(exit_code(&e) as u8)
        }
    }
}

/// Run the names command.
fn run_names(args: NamesArgs) -> Result<(), CommandError> {
    let ctx = FileGenContext::new(
        RealFilesystem,
        SystemClock,
        UptimeClock::start(),
        CurrentProcess,
        StderrLogger::normal(),
    )
    .with_separator(args.stream.separator);

    let result = execute_names(&args, &ctx)?;

    println!("type:       {}", result.kind);
    println!("stable:     {}", result.stable);
    println!("generation: {}", result.generation);
    println!("window:     [{}, {})", result.window.low, result.window.high);
    if result.truncated {
        println!("(names truncated)");
    }

    Ok(())
}

/// Run the tee command.
fn run_tee(args: TeeArgs) -> Result<(), CommandError> {
    let mut ctx = FileGenContext::new(
        RealFilesystem,
        SystemClock,
        UptimeClock::start(),
        CurrentProcess,
        StderrLogger::new(Level::from_count(args.verbose)),
    )
    .with_separator(args.stream.separator);

    let stdin = io::stdin();
    let result = execute_tee(&args, stdin.lock(), &mut ctx)?;

    ctx.logger().verbose(&format!(
        "{} lines written, {} dropped, {} generations opened",
        result.lines, result.dropped, result.rotations
    ));

    Ok(())
}
