//! Command orchestration for CLI subcommands.
//!
//! Provides execute functions for:
//! - `names` - Resolve the file names for a moment
//! - `tee` - Copy input lines into a rotating generation file

pub mod names;
pub mod tee;

pub use names::{execute_names, NamesResult};
pub use tee::{execute_tee, TeeResult};

use crate::cli::CliError;
use filegen::ConfigError;
use filegen_fs::FsError;
use thiserror::Error;

/// Errors from command execution.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("invalid argument: {0}")]
    InvalidArgument(#[from] CliError),

    #[error("configuration rejected: {0}")]
    Config(#[from] ConfigError),

    #[error("filesystem error: {0}")]
    Filesystem(#[from] FsError),

    #[error("read error: {0}")]
    Read(#[source] std::io::Error),

    #[error("write error: {0}")]
    Write(#[source] std::io::Error),
}

/// Result of command execution.
pub type CommandResult<T> = Result<T, CommandError>;
