//! Tee command: feed stdin through a rotating file generation.
//!
//! Every line is preceded by a setup call, the way a daemon checks its
//! statistics file before each record.

use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

use filegen::{
    FileGen, FileGenContext, FileGenFlags, GenerationType, Logger, ProcessInfo, RotationOutcome,
};
use filegen_clock::Clock;
use filegen_fs::Filesystem;

use crate::cli::TeeArgs;

use super::{CommandError, CommandResult};

/// Result of tee command execution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TeeResult {
    /// Lines written to a generation file.
    pub lines: u64,
    /// Lines read while no file could be opened.
    pub dropped: u64,
    /// Generation files opened.
    pub rotations: u64,
    /// Generation file in use when input ended.
    pub last_path: Option<PathBuf>,
}

/// Execute the tee command.
pub fn execute_tee<R, F, C, U, P, L>(
    args: &TeeArgs,
    input: R,
    ctx: &mut FileGenContext<F, C, U, P, L>,
) -> CommandResult<TeeResult>
where
    R: BufRead,
    F: Filesystem,
    C: Clock,
    U: Clock,
    P: ProcessInfo,
    L: Logger,
{
    args.stream.validate()?;

    let directory = args.stream.directory();
    let kind = GenerationType::parse_lenient(&args.stream.kind, ctx.logger());
    let mut flags = FileGenFlags::ENABLED;
    if !args.no_link {
        flags |= FileGenFlags::LINK;
    }

    let mut gen = FileGen::new(&directory, &args.stream.file);
    ctx.configure(&mut gen, &directory, &args.stream.file, kind, flags)?;
    if args.mkdir {
        ctx.fs().create_dir_all(Path::new(&directory))?;
    }

    let mut result = TeeResult::default();
    for line in input.lines() {
        let line = line.map_err(CommandError::Read)?;

        if let Some(RotationOutcome::Opened { path, .. }) = ctx.setup_now(&mut gen) {
            ctx.logger()
                .verbose(&format!("writing to {}", path.display()));
            result.rotations += 1;
        }

        match gen.handle_mut() {
            Some(file) => {
                writeln!(file, "{}", line)
                    .and_then(|()| file.flush())
                    .map_err(CommandError::Write)?;
                result.lines += 1;
            }
            None => result.dropped += 1,
        }
    }

    result.last_path = gen.current_path().map(Path::to_path_buf);
    gen.close();
    Ok(result)
}
