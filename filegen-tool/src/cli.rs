//! CLI argument parsing for the filegen tool.
//!
//! Two subcommands:
//! - `names` prints the stable and generation names for a timestamp
//! - `tee` copies stdin lines into a rotating generation file

use clap::{Args, Parser, Subcommand};
use filegen::DEFAULT_SEPARATOR;
use thiserror::Error;

/// Default generation type name.
pub const DEFAULT_TYPE: &str = "day";

/// Errors from CLI argument validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CliError {
    #[error("file name must not be empty")]
    EmptyFile,

    #[error("file name must not contain '/', got {0:?}")]
    FileWithSlash(String),

    #[error("separator must not be '/'")]
    SlashSeparator,
}

/// File generation driver.
#[derive(Parser, Debug, Clone, PartialEq)]
#[command(name = "filegen")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Print stable and generation names for a moment.
    Names(NamesArgs),
    /// Copy stdin into a rotating generation file.
    Tee(TeeArgs),
}

/// Where a stream lives and how it rotates.
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct StreamArgs {
    /// Directory prefix for the stream. A trailing '/' is added if missing.
    #[arg(short, long, default_value = "./")]
    pub dir: String,

    /// Base file name (e.g. peerstats).
    #[arg(short, long)]
    pub file: String,

    /// Generation type: none, pid, day, week, month, year, age.
    /// Unknown names fall back to none.
    #[arg(short = 't', long = "type", default_value = DEFAULT_TYPE)]
    pub kind: String,

    /// Character between the stable name and the suffix.
    #[arg(long, default_value_t = DEFAULT_SEPARATOR)]
    pub separator: char,
}

impl StreamArgs {
    /// Validate the arguments.
    pub fn validate(&self) -> Result<(), CliError> {
        if self.file.is_empty() {
            return Err(CliError::EmptyFile);
        }
        if self.file.contains('/') {
            return Err(CliError::FileWithSlash(self.file.clone()));
        }
        if self.separator == '/' {
            return Err(CliError::SlashSeparator);
        }
        Ok(())
    }

    /// Directory with exactly the trailing '/' the naming expects.
    pub fn directory(&self) -> String {
        directory_prefix(&self.dir)
    }
}

/// Arguments for the names command.
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct NamesArgs {
    #[command(flatten)]
    pub stream: StreamArgs,

    /// Unix timestamp to resolve (defaults to now).
    #[arg(long)]
    pub at: Option<u64>,
}

/// Arguments for the tee command.
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct TeeArgs {
    #[command(flatten)]
    pub stream: StreamArgs,

    /// Do not maintain the stable name as a hard link.
    #[arg(long)]
    pub no_link: bool,

    /// Create the directory (and parents) before writing.
    #[arg(long)]
    pub mkdir: bool,

    /// Increase log detail (-v verbose, -vv debug).
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// Parse CLI arguments from an iterator of strings.
/// Useful for testing.
pub fn parse_from<I, T>(iter: I) -> Result<Cli, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    Cli::try_parse_from(iter)
}

/// Normalise a directory argument into a name prefix.
pub fn directory_prefix(dir: &str) -> String {
    if dir.is_empty() {
        "./".to_string()
    } else if dir.ends_with('/') {
        dir.to_string()
    } else {
        format!("{}/", dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_requires_file() {
        let result = parse_from(["filegen", "names"]);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("--file"));
    }

    #[test]
    fn test_names_defaults() {
        let cli = parse_from(["filegen", "names", "--file", "peerstats"]).expect("parse");
        match cli.command {
            Command::Names(args) => {
                assert_eq!(args.stream.dir, "./");
                assert_eq!(args.stream.kind, "day");
                assert_eq!(args.stream.separator, '.');
                assert!(args.at.is_none());
            }
            _ => panic!("expected Names"),
        }
    }

    #[test]
    fn test_names_with_timestamp() {
        let cli = parse_from([
            "filegen", "names", "-d", "/var/log/ntpstats", "-f", "loopstats", "-t", "week",
            "--at", "1704067200",
        ])
        .expect("parse");
        match cli.command {
            Command::Names(args) => {
                assert_eq!(args.stream.directory(), "/var/log/ntpstats/");
                assert_eq!(args.stream.file, "loopstats");
                assert_eq!(args.stream.kind, "week");
                assert_eq!(args.at, Some(1704067200));
            }
            _ => panic!("expected Names"),
        }
    }

    #[test]
    fn test_names_rejects_non_numeric_timestamp() {
        let result = parse_from(["filegen", "names", "-f", "x", "--at", "yesterday"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_unknown_type_is_accepted_by_parser() {
        // Falls back to none at execution time, not here
        let cli = parse_from(["filegen", "names", "-f", "x", "-t", "fortnight"]).expect("parse");
        match cli.command {
            Command::Names(args) => assert_eq!(args.stream.kind, "fortnight"),
            _ => panic!("expected Names"),
        }
    }

    #[test]
    fn test_tee_flags() {
        let cli = parse_from(["filegen", "tee", "-f", "peerstats", "--no-link", "--mkdir", "-vv"])
            .expect("parse");
        match cli.command {
            Command::Tee(args) => {
                assert!(args.no_link);
                assert!(args.mkdir);
                assert_eq!(args.verbose, 2);
            }
            _ => panic!("expected Tee"),
        }
    }

    #[test]
    fn test_tee_defaults() {
        let cli = parse_from(["filegen", "tee", "-f", "peerstats"]).expect("parse");
        match cli.command {
            Command::Tee(args) => {
                assert!(!args.no_link);
                assert!(!args.mkdir);
                assert_eq!(args.verbose, 0);
            }
            _ => panic!("expected Tee"),
        }
    }

    #[test]
    fn test_validate_empty_file() {
        let cli = parse_from(["filegen", "names", "-f", ""]).expect("parse");
        match cli.command {
            Command::Names(args) => assert_eq!(args.stream.validate(), Err(CliError::EmptyFile)),
            _ => panic!("expected Names"),
        }
    }

    #[test]
    fn test_validate_file_with_slash() {
        let cli = parse_from(["filegen", "names", "-f", "a/b"]).expect("parse");
        match cli.command {
            Command::Names(args) => assert_eq!(
                args.stream.validate(),
                Err(CliError::FileWithSlash("a/b".to_string()))
            ),
            _ => panic!("expected Names"),
        }
    }

    #[test]
    fn test_validate_slash_separator() {
        let cli = parse_from(["filegen", "names", "-f", "x", "--separator", "/"]).expect("parse");
        match cli.command {
            Command::Names(args) => {
                assert_eq!(args.stream.validate(), Err(CliError::SlashSeparator))
            }
            _ => panic!("expected Names"),
        }
    }

    #[test]
    fn test_directory_prefix() {
        assert_eq!(directory_prefix(""), "./");
        assert_eq!(directory_prefix("/var/log"), "/var/log/");
        assert_eq!(directory_prefix("/var/log/"), "/var/log/");
        assert_eq!(directory_prefix("stats"), "stats/");
    }
}
