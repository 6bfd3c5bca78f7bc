//! Names command: show what a stream would be called at a given moment.

use filegen::{
    FileGenContext, GenerationNames, GenerationType, Logger, ProcessInfo, Window,
};
use filegen_clock::Clock;
use filegen_fs::Filesystem;

use crate::cli::NamesArgs;

use super::CommandResult;

/// Result of names command execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamesResult {
    /// Type actually used after lenient parsing.
    pub kind: GenerationType,
    /// Timestamp the names were resolved for.
    pub stamp: u64,
    pub stable: String,
    pub generation: String,
    pub window: Window,
    pub truncated: bool,
}

/// Execute the names command.
///
/// Nothing on the filesystem is touched.
pub fn execute_names<F, C, U, P, L>(
    args: &NamesArgs,
    ctx: &FileGenContext<F, C, U, P, L>,
) -> CommandResult<NamesResult>
where
    F: Filesystem,
    C: Clock,
    U: Clock,
    P: ProcessInfo,
    L: Logger,
{
    args.stream.validate()?;

    let kind = GenerationType::parse_lenient(&args.stream.kind, ctx.logger());
    let stamp = args.at.unwrap_or_else(|| ctx.now());
    let generation = kind.generation(ctx.separator(), &ctx.moment(stamp));
    let names = GenerationNames::build(&args.stream.directory(), &args.stream.file, &generation.suffix);

    Ok(NamesResult {
        kind,
        stamp,
        stable: names.stable,
        generation: names.generation,
        window: generation.window,
        truncated: names.truncated,
    })
}
