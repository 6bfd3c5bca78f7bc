//! Exit codes for the filegen CLI.
//!
//! Following Unix conventions for exit codes.

use crate::commands::CommandError;

/// Exit code constants.
pub mod codes {
    /// Successful execution.
    pub const SUCCESS: i32 = 0;
    /// Invalid arguments.
    pub const INVALID_ARGS: i32 = 1;
    /// IO error on input or output.
    pub const IO_ERROR: i32 = 2;
    /// Stream settings rejected.
    pub const CONFIG_ERROR: i32 = 3;
}

/// Map a CommandError to an exit code.
pub fn exit_code(error: &CommandError) -> i32 {
    match error {
        CommandError::InvalidArgument(_) => codes::INVALID_ARGS,
        CommandError::Config(_) => codes::CONFIG_ERROR,
        CommandError::Filesystem(_) | CommandError::Read(_) | CommandError::Write(_) => {
            codes::IO_ERROR
        }
    }
}
