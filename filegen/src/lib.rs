//! File generations for long-running daemons.
//!
//! A daemon writes to a logically "current" output file whose physical name
//! changes by calendar day, week, month, year, process id, or uptime age.
//! This crate provides:
//! - Generation policies (suffix and validity window per type)
//! - Collision-safe rotation that never leaves a stream without a target
//! - A config mutator with path validation
//! - A name-keyed registry for bulk reconfiguration
//!
//! All process-wide state (collision counter, uptime clock, process id) is
//! held by an explicit [`FileGenContext`].

pub mod config;
pub mod context;
pub mod generation;
pub mod logger;
pub mod naming;
pub mod policy;
pub mod registry;

pub use config::{validate_fileref, ConfigError, ConfigOutcome, FileGenFlags, FileGenSettings};
pub use context::{CurrentProcess, FileGenContext, MockProcess, ProcessInfo};
pub use generation::FileGen;
pub use logger::{Level, LogEntry, Logger, MockLogger, NullLogger, StderrLogger};
pub use naming::{GenerationNames, RotationOutcome, NAME_MARGIN};
pub use policy::{
    Generation, GenerationType, Moment, ParseGenerationTypeError, Window, DEFAULT_SEPARATOR,
    SECS_PER_DAY,
};
pub use registry::{FileGenArena, FileGenId, Registry, RegistryError};
