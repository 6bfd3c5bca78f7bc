//! File generation descriptors and the generation controller.

use std::fmt;
use std::path::{Path, PathBuf};

use filegen_clock::Clock;
use filegen_fs::Filesystem;

use crate::config::{FileGenFlags, FileGenSettings};
use crate::context::{FileGenContext, ProcessInfo};
use crate::logger::Logger;
use crate::naming::RotationOutcome;
use crate::policy::{GenerationType, Window};

/// One output stream whose physical file changes per generation.
///
/// `H` is the file handle type of the filesystem in use. Writers fetch it
/// through [`FileGen::handle_mut`] after each call to
/// [`FileGenContext::setup`], since a setup may swap it.
pub struct FileGen<H> {
    directory: String,
    base_name: String,
    kind: GenerationType,
    flags: FileGenFlags,
    window: Window,
    handle: Option<H>,
    current_path: Option<PathBuf>,
    failed_open: Option<String>,
}

impl<H> FileGen<H> {
    /// New descriptor: daily generations, stable-name link on, not enabled.
    pub fn new(directory: &str, base_name: &str) -> Self {
        Self {
            directory: directory.to_string(),
            base_name: base_name.to_string(),
            kind: GenerationType::Day,
            flags: FileGenFlags::LINK,
            window: Window::default(),
            handle: None,
            current_path: None,
            failed_open: None,
        }
    }

    /// Reinitialise in place, closing any open handle.
    pub fn reset(&mut self, directory: &str, base_name: &str) {
        *self = Self::new(directory, base_name);
    }

    pub fn directory(&self) -> &str {
        &self.directory
    }

    pub fn base_name(&self) -> &str {
        &self.base_name
    }

    pub fn kind(&self) -> GenerationType {
        self.kind
    }

    pub fn flags(&self) -> FileGenFlags {
        self.flags
    }

    /// Validity window of the generation the handle was opened for.
    pub fn window(&self) -> Window {
        self.window
    }

    pub fn is_enabled(&self) -> bool {
        self.flags.contains(FileGenFlags::ENABLED)
    }

    pub fn is_open(&self) -> bool {
        self.handle.is_some()
    }

    /// Path of the generation file the handle writes to.
    pub fn current_path(&self) -> Option<&Path> {
        self.current_path.as_deref()
    }

    /// Current output target, if any.
    pub fn handle_mut(&mut self) -> Option<&mut H> {
        self.handle.as_mut()
    }

    /// Close the handle. Returns whether one was open.
    pub fn close(&mut self) -> bool {
        self.current_path = None;
        self.handle.take().is_some()
    }

    /// Snapshot of the configurable fields.
    pub fn settings(&self) -> FileGenSettings {
        FileGenSettings::from_parts(&self.directory, &self.base_name, self.kind, self.flags)
    }

    pub(crate) fn matches(
        &self,
        directory: &str,
        base_name: &str,
        kind: GenerationType,
        flags: FileGenFlags,
    ) -> bool {
        self.directory == directory
            && self.base_name == base_name
            && self.kind == kind
            && self.flags == flags
    }

    /// Replace configuration, reallocating only the strings that differ.
    pub(crate) fn update(
        &mut self,
        directory: &str,
        base_name: &str,
        kind: GenerationType,
        flags: FileGenFlags,
    ) {
        if self.directory != directory {
            self.directory = directory.to_string();
        }
        self.failed_open = None;
        if self.base_name != base_name {
            self.base_name = base_name.to_string();
        }
        self.kind = kind;
        self.flags = flags;
    }

    /// Swap in a freshly opened handle. The previous one is closed here,
    /// after the new file is known to be open.
    pub(crate) fn install(&mut self, handle: H, window: Window, path: PathBuf) {
        drop(self.handle.replace(handle));
        self.window = window;
        self.current_path = Some(path);
        self.failed_open = None;
    }

    /// Record a failed open of `name`. Returns false when the previous
    /// attempt failed on the same name.
    pub(crate) fn note_failed_open(&mut self, name: &str) -> bool {
        if self.failed_open.as_deref() == Some(name) {
            return false;
        }
        self.failed_open = Some(name.to_string());
        true
    }
}

impl<H> fmt::Debug for FileGen<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileGen")
            .field("directory", &self.directory)
            .field("base_name", &self.base_name)
            .field("kind", &self.kind)
            .field("flags", &self.flags)
            .field("window", &self.window)
            .field("open", &self.handle.is_some())
            .field("current_path", &self.current_path)
            .finish()
    }
}

impl<F, C, U, P, L> FileGenContext<F, C, U, P, L>
where
    F: Filesystem,
    C: Clock,
    U: Clock,
    P: ProcessInfo,
    L: Logger,
{
    /// Make sure `gen` writes to the right generation for `now`.
    ///
    /// Disabled streams are closed. An open, current stream is left alone
    /// without touching the filesystem. Otherwise the generation is
    /// (re)opened; `None` is returned when nothing had to be done.
    pub fn setup(&mut self, gen: &mut FileGen<F::File>, now: u64) -> Option<RotationOutcome> {
        if !gen.is_enabled() {
            if gen.close() {
                self.logger
                    .debug(&format!("filegen {} disabled, closed", gen.base_name()));
            }
            return None;
        }

        let moment = self.moment(now);
        if gen.is_open() && gen.kind().is_current(gen.window(), &moment) {
            return None;
        }

        self.logger
            .debug(&format!("filegen {} {} {}", gen.base_name(), gen.kind(), now));
        Some(self.rotate(gen, &moment))
    }

    /// [`FileGenContext::setup`] at the current wall-clock time.
    pub fn setup_now(&mut self, gen: &mut FileGen<F::File>) -> Option<RotationOutcome> {
        let now = self.now();
        self.setup(gen, now)
    }
}
