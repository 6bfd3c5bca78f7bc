//! Process-wide state shared by all file generations.
//!
//! The collision counter, the uptime clock, and the process id are owned
//! by an explicitly constructed [`FileGenContext`] rather than globals, so
//! every rotation is reproducible under test.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use filegen_clock::Clock;
use filegen_fs::Filesystem;

use crate::logger::Logger;
use crate::policy::{Moment, DEFAULT_SEPARATOR};

/// Source of the live process id.
pub trait ProcessInfo: Send + Sync {
    fn pid(&self) -> u32;
}

impl<P: ProcessInfo + ?Sized> ProcessInfo for &P {
    fn pid(&self) -> u32 {
        (**self).pid()
    }
}

impl<P: ProcessInfo + ?Sized> ProcessInfo for Arc<P> {
    fn pid(&self) -> u32 {
        (**self).pid()
    }
}

/// The running process.
#[derive(Debug, Default, Clone, Copy)]
pub struct CurrentProcess;

impl ProcessInfo for CurrentProcess {
    fn pid(&self) -> u32 {
        std::process::id()
    }
}

/// Process id that tests can change to simulate a fork or restart.
#[derive(Debug, Default)]
pub struct MockProcess {
    pid: AtomicU32,
}

impl MockProcess {
    pub fn new(pid: u32) -> Self {
        Self {
            pid: AtomicU32::new(pid),
        }
    }

    pub fn set_pid(&self, pid: u32) {
        self.pid.store(pid, Ordering::SeqCst);
    }
}

impl ProcessInfo for MockProcess {
    fn pid(&self) -> u32 {
        self.pid.load(Ordering::SeqCst)
    }
}

/// Collaborators and process-wide counters for file generation handling.
///
/// - `fs`: filesystem the generations live on
/// - `clock`: wall clock, read when a reconfiguration reopens a stream
/// - `uptime`: process-wide elapsed seconds, read by the age policy
/// - `process`: live process id, read by the pid policy and collision archives
/// - `logger`: receives every failure; none of them are returned
pub struct FileGenContext<F, C, U, P, L> {
    pub(crate) fs: F,
    pub(crate) clock: C,
    pub(crate) uptime: U,
    pub(crate) process: P,
    pub(crate) logger: L,
    pub(crate) separator: char,
    conflicts: u64,
}

impl<F, C, U, P, L> FileGenContext<F, C, U, P, L>
where
    F: Filesystem,
    C: Clock,
    U: Clock,
    P: ProcessInfo,
    L: Logger,
{
    pub fn new(fs: F, clock: C, uptime: U, process: P, logger: L) -> Self {
        Self {
            fs,
            clock,
            uptime,
            process,
            logger,
            separator: DEFAULT_SEPARATOR,
            conflicts: 0,
        }
    }

    /// Builder: character placed between stable name and suffix.
    pub fn with_separator(mut self, separator: char) -> Self {
        self.separator = separator;
        self
    }

    /// Builder: first value used for collision archive names.
    pub fn with_conflict_counter(mut self, start: u64) -> Self {
        self.conflicts = start;
        self
    }

    pub fn separator(&self) -> char {
        self.separator
    }

    /// Next value the collision counter will hand out.
    pub fn conflicts(&self) -> u64 {
        self.conflicts
    }

    pub fn fs(&self) -> &F {
        &self.fs
    }

    pub fn logger(&self) -> &L {
        &self.logger
    }

    /// Current wall-clock time.
    pub fn now(&self) -> u64 {
        self.clock.now_unix_sec()
    }

    /// Snapshot of everything the policies read, for the caller's `stamp`.
    pub fn moment(&self, stamp: u64) -> Moment {
        Moment {
            stamp,
            uptime: self.uptime.now_unix_sec(),
            pid: self.process.pid(),
        }
    }

    pub(crate) fn next_conflict(&mut self) -> u64 {
        let value = self.conflicts;
        self.conflicts = self.conflicts.wrapping_add(1);
        value
    }
}
