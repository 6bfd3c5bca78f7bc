//! Generation file naming and the rotation itself.
//!
//! Rotation clears whatever occupies the stable name, opens the new
//! generation for append, and only then swaps the descriptor's handle and
//! relinks the stable name. Any failure leaves the previous handle in place.

use std::path::{Path, PathBuf};

use filegen_clock::Clock;
use filegen_fs::Filesystem;

use crate::config::FileGenFlags;
use crate::context::{FileGenContext, ProcessInfo};
use crate::generation::FileGen;
use crate::logger::Logger;
use crate::policy::{GenerationType, Moment};

/// Bytes reserved past `directory + base_name` for suffixes and collision
/// names. One byte of the budget is kept as terminator, as in a C buffer.
pub const NAME_MARGIN: usize = 65;

/// Stable and generation-qualified names for one rotation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationNames {
    /// `directory + base_name`
    pub stable: String,

    /// `stable + suffix`
    pub generation: String,

    /// Set when a name had to be cut to fit the budget.
    pub truncated: bool,

    budget: usize,
}

impl GenerationNames {
    pub fn build(directory: &str, base_name: &str, suffix: &str) -> Self {
        Self::with_margin(directory, base_name, suffix, NAME_MARGIN)
    }

    /// Like [`GenerationNames::build`] with an explicit margin.
    pub fn with_margin(directory: &str, base_name: &str, suffix: &str, margin: usize) -> Self {
        let budget = directory.len() + base_name.len() + margin;
        let (stable, stable_cut) = bounded(format!("{}{}", directory, base_name), budget);
        let (generation, generation_cut) = bounded(format!("{}{}", stable, suffix), budget);

        Self {
            stable,
            generation,
            truncated: stable_cut || generation_cut,
            budget,
        }
    }

    pub fn stable_path(&self) -> &Path {
        Path::new(&self.stable)
    }

    pub fn generation_path(&self) -> &Path {
        Path::new(&self.generation)
    }

    /// Name a colliding stable file is moved to: `stable<sep><pid>C<counter>`.
    /// The flag reports truncation.
    pub fn archive(&self, separator: char, pid: u32, counter: u64) -> (String, bool) {
        bounded(
            format!("{}{}{}C{}", self.stable, separator, pid, counter),
            self.budget,
        )
    }
}

/// Cut `name` to at most `budget - 1` bytes on a char boundary.
fn bounded(mut name: String, budget: usize) -> (String, bool) {
    let limit = budget.saturating_sub(1);
    if name.len() <= limit {
        return (name, false);
    }
    let mut end = limit;
    while !name.is_char_boundary(end) {
        end -= 1;
    }
    name.truncate(end);
    (name, true)
}

/// What a rotation attempt did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RotationOutcome {
    /// A new generation file was opened and installed.
    Opened { path: PathBuf, linked: bool },
    /// Opening failed; the descriptor kept its previous handle (if any).
    Retained,
}

impl<F, C, U, P, L> FileGenContext<F, C, U, P, L>
where
    F: Filesystem,
    C: Clock,
    U: Clock,
    P: ProcessInfo,
    L: Logger,
{
    /// Open the generation of `gen` that is current at `stamp`.
    ///
    /// Called by [`FileGenContext::setup`] when the open generation is
    /// missing or stale; callable directly to force a reopen.
    pub fn open_generation(&mut self, gen: &mut FileGen<F::File>, stamp: u64) -> RotationOutcome {
        let moment = self.moment(stamp);
        self.rotate(gen, &moment)
    }

    pub(crate) fn rotate(&mut self, gen: &mut FileGen<F::File>, moment: &Moment) -> RotationOutcome {
        let kind = gen.kind();
        let generation = kind.generation(self.separator, moment);
        let names = GenerationNames::build(gen.directory(), gen.base_name(), &generation.suffix);

        if names.truncated {
            self.logger
                .error(&format!("logfile name truncated: \"{}\"", names.generation));
        }

        if kind != GenerationType::None {
            self.clear_stable_name(&names, moment.pid);
        }

        self.logger.debug(&format!(
            "opening filegen (type={}/stamp={}) \"{}\"",
            kind, moment.stamp, names.generation
        ));

        let file = match self.fs.open_append(names.generation_path()) {
            Ok(file) => file,
            Err(e) => {
                // Missing directories are expected until the host creates them
                if e.is_not_found() {
                    return RotationOutcome::Retained;
                }
                let message = format!("can't open {}: {}", names.generation, e);
                // Reported once per generation name; retries log at debug
                if gen.note_failed_open(&names.generation) {
                    self.logger.error(&message);
                } else {
                    self.logger.debug(&message);
                }
                return RotationOutcome::Retained;
            }
        };

        let path = names.generation_path().to_path_buf();
        gen.install(file, generation.window, path.clone());

        let linked = kind != GenerationType::None
            && gen.flags().contains(FileGenFlags::LINK)
            && self.link_stable_name(&names);

        RotationOutcome::Opened { path, linked }
    }

    /// Move or remove a file occupying the stable name.
    ///
    /// A lone file is archived under a collision name; a file with other
    /// links (normally an older generation) just loses the stable link.
    fn clear_stable_name(&mut self, names: &GenerationNames, pid: u32) {
        let stat = match self.fs.stat(names.stable_path()) {
            Ok(stat) => stat,
            Err(e) => {
                if !e.is_not_found() {
                    self.logger
                        .error(&format!("stat({}) failed: {}", names.stable, e));
                }
                return;
            }
        };

        if !stat.is_regular() {
            self.logger.error(&format!(
                "expected regular file for {} (found mode 0{:o})",
                names.stable, stat.mode
            ));
            return;
        }

        if stat.links <= 1 {
            let counter = self.next_conflict();
            let (archive, truncated) = names.archive(self.separator, pid, counter);
            if truncated {
                self.logger
                    .error(&format!("logfile name truncated: \"{}\"", archive));
            }
            match self.fs.rename(names.stable_path(), Path::new(&archive)) {
                Ok(()) => self
                    .logger
                    .verbose(&format!("saved {} as {}", names.stable, archive)),
                Err(e) => self
                    .logger
                    .error(&format!("couldn't save {}: {}", names.stable, e)),
            }
        } else if let Err(e) = self.fs.remove(names.stable_path()) {
            self.logger
                .error(&format!("couldn't unlink {}: {}", names.stable, e));
        }
    }

    fn link_stable_name(&self, names: &GenerationNames) -> bool {
        match self
            .fs
            .hard_link(names.generation_path(), names.stable_path())
        {
            Ok(()) => true,
            Err(e) if e.is_already_exists() => false,
            Err(e) => {
                self.logger.error(&format!(
                    "can't link({}, {}): {}",
                    names.generation, names.stable, e
                ));
                false
            }
        }
    }
}
