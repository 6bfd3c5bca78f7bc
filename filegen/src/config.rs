//! Generation configuration: flags, settings, validation, and the config
//! mutator that applies new settings to a live descriptor.

use std::path::MAIN_SEPARATOR;

use bitflags::bitflags;
use filegen_clock::Clock;
use filegen_fs::Filesystem;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::context::{FileGenContext, ProcessInfo};
use crate::generation::FileGen;
use crate::logger::Logger;
use crate::policy::GenerationType;

bitflags! {
    /// Per-stream switches.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct FileGenFlags: u8 {
        /// Files are only opened for enabled streams.
        const ENABLED = 1 << 0;
        /// Keep a hard link from the stable name to the current generation.
        const LINK = 1 << 1;
    }
}

/// Rejected configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("empty directory for file generation \"{0}\"")]
    EmptyDirectory(String),

    #[error("file generation name \"{0}\" refers to a parent directory")]
    ParentReference(String),
}

/// Result of [`FileGenContext::configure`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigOutcome {
    /// Nothing differed; nothing was touched.
    Unchanged,
    /// New settings are in place. `reopened` streams had a file open and
    /// were reopened at once.
    Applied { reopened: bool },
}

fn default_link() -> bool {
    true
}

/// Configurable fields of a file generation, as a host config loader
/// would hand them over.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileGenSettings {
    /// Directory prefix, used verbatim (should end with a separator).
    pub directory: String,

    #[serde(rename = "file")]
    pub base_name: String,

    #[serde(rename = "type", default)]
    pub kind: GenerationType,

    #[serde(default)]
    pub enable: bool,

    #[serde(default = "default_link")]
    pub link: bool,
}

impl FileGenSettings {
    /// Settings with the registration defaults: daily, linked, disabled.
    pub fn new(directory: &str, base_name: &str) -> Self {
        Self::from_parts(directory, base_name, GenerationType::Day, FileGenFlags::LINK)
    }

    pub fn from_parts(
        directory: &str,
        base_name: &str,
        kind: GenerationType,
        flags: FileGenFlags,
    ) -> Self {
        Self {
            directory: directory.to_string(),
            base_name: base_name.to_string(),
            kind,
            enable: flags.contains(FileGenFlags::ENABLED),
            link: flags.contains(FileGenFlags::LINK),
        }
    }

    pub fn with_directory(mut self, directory: &str) -> Self {
        self.directory = directory.to_string();
        self
    }

    pub fn with_kind(mut self, kind: GenerationType) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_enabled(mut self, enable: bool) -> Self {
        self.enable = enable;
        self
    }

    pub fn with_link(mut self, link: bool) -> Self {
        self.link = link;
        self
    }

    pub fn flags(&self) -> FileGenFlags {
        let mut flags = FileGenFlags::empty();
        flags.set(FileGenFlags::ENABLED, self.enable);
        flags.set(FileGenFlags::LINK, self.link);
        flags
    }
}

/// Check that `directory + base_name` stays inside `directory`.
///
/// The directory itself is trusted; only the base name is inspected for a
/// `..` component.
pub fn validate_fileref(directory: &str, base_name: &str) -> Result<(), ConfigError> {
    if directory.is_empty() {
        return Err(ConfigError::EmptyDirectory(base_name.to_string()));
    }

    let escapes = base_name
        .split(|c: char| c == '/' || c == MAIN_SEPARATOR)
        .any(|segment| segment == "..");
    if escapes {
        return Err(ConfigError::ParentReference(base_name.to_string()));
    }

    Ok(())
}

impl<F, C, U, P, L> FileGenContext<F, C, U, P, L>
where
    F: Filesystem,
    C: Clock,
    U: Clock,
    P: ProcessInfo,
    L: Logger,
{
    /// Change the settings of `gen`.
    ///
    /// Identical settings are a no-op. Invalid ones are logged and
    /// rejected without touching `gen`. Otherwise an open stream is closed,
    /// the settings replaced, and the stream reopened right away at the
    /// current wall-clock time so output continues without a gap.
    pub fn configure(
        &mut self,
        gen: &mut FileGen<F::File>,
        directory: &str,
        base_name: &str,
        kind: GenerationType,
        flags: FileGenFlags,
    ) -> Result<ConfigOutcome, ConfigError> {
        if gen.matches(directory, base_name, kind, flags) {
            return Ok(ConfigOutcome::Unchanged);
        }

        if let Err(e) = validate_fileref(directory, base_name) {
            self.logger
                .error(&format!("rejected file generation settings: {}", e));
            return Err(e);
        }

        let was_open = gen.close();

        self.logger.debug(&format!(
            "configuring filegen: dir {} -> {}, fname {} -> {}, type {} -> {}, flag {:?} -> {:?}",
            gen.directory(),
            directory,
            gen.base_name(),
            base_name,
            gen.kind(),
            kind,
            gen.flags(),
            flags
        ));

        gen.update(directory, base_name, kind, flags);

        // Closed streams pick up the new settings on their next setup
        if was_open {
            self.setup_now(gen);
        }

        Ok(ConfigOutcome::Applied { reopened: was_open })
    }

    /// [`FileGenContext::configure`] from a settings value.
    pub fn apply(
        &mut self,
        gen: &mut FileGen<F::File>,
        settings: &FileGenSettings,
    ) -> Result<ConfigOutcome, ConfigError> {
        self.configure(
            gen,
            &settings.directory,
            &settings.base_name,
            settings.kind,
            settings.flags(),
        )
    }
}
