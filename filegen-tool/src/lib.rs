//! Command-line driver for file generations.
//!
//! This crate provides:
//! - CLI argument parsing (clap)
//! - `names` and `tee` command orchestration
//! - Exit code mapping

pub mod cli;
pub mod commands;
pub mod exit;

pub use cli::{directory_prefix, parse_from, Cli, CliError, Command, NamesArgs, StreamArgs, TeeArgs};
pub use commands::{execute_names, execute_tee, CommandError, CommandResult, NamesResult, TeeResult};
