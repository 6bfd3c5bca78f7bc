//! Clock abstractions for filegen.
//!
//! Two notions of time drive file generations: the wall clock (calendar
//! policies) and the process uptime counter (age policy). Both are read
//! through the same [`Clock`] trait so hosts and tests can inject them.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

/// Trait for reading a time value in whole seconds.
pub trait Clock: Send + Sync {
    /// Returns the current time in seconds.
    ///
    /// For wall clocks this is Unix seconds since epoch, for uptime
    /// clocks it is seconds elapsed since the clock was started.
    fn now_unix_sec(&self) -> u64;
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now_unix_sec(&self) -> u64 {
        (**self).now_unix_sec()
    }
}

impl<C: Clock + ?Sized> Clock for Arc<C> {
    fn now_unix_sec(&self) -> u64 {
        (**self).now_unix_sec()
    }
}

impl<C: Clock + ?Sized> Clock for Box<C> {
    fn now_unix_sec(&self) -> u64 {
        (**self).now_unix_sec()
    }
}

/// Real system clock implementation.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_unix_sec(&self) -> u64 {
        // A clock set before 1970 reads as the epoch.
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0)
    }
}

/// Process uptime counter: seconds elapsed since construction.
///
/// A daemon creates one of these at startup and shares it with every
/// consumer that needs the process-wide elapsed time.
#[derive(Debug, Clone, Copy)]
pub struct UptimeClock {
    started: Instant,
}

impl UptimeClock {
    /// Start counting from now.
    pub fn start() -> Self {
        Self {
            started: Instant::now(),
        }
    }
}

impl Default for UptimeClock {
    fn default() -> Self {
        Self::start()
    }
}

impl Clock for UptimeClock {
    fn now_unix_sec(&self) -> u64 {
        self.started.elapsed().as_secs()
    }
}

/// Mock clock for testing with a settable timestamp.
#[derive(Debug, Default)]
pub struct MockClock {
    timestamp: AtomicU64,
}

impl MockClock {
    /// Create a mock clock with a fixed timestamp.
    pub fn new(timestamp: u64) -> Self {
        Self {
            timestamp: AtomicU64::new(timestamp),
        }
    }

    /// Move the clock to `timestamp`.
    pub fn set(&self, timestamp: u64) {
        self.timestamp.store(timestamp, Ordering::SeqCst);
    }

    /// Move the clock forward by `secs`.
    pub fn advance(&self, secs: u64) {
        self.timestamp.fetch_add(secs, Ordering::SeqCst);
    }
}

impl Clock for MockClock {
    fn now_unix_sec(&self) -> u64 {
        self.timestamp.load(Ordering::SeqCst)
    }
}

/// Mock clock that auto-advances time on each call.
///
/// Useful for testing loops where the clock needs to progress.
#[derive(Debug)]
pub struct AdvancingClock {
    timestamp: AtomicU64,
    increment: u64,
}

impl AdvancingClock {
    /// Create an advancing clock starting at `timestamp` and incrementing by `increment` each call.
    pub fn new(timestamp: u64, increment: u64) -> Self {
        Self {
            timestamp: AtomicU64::new(timestamp),
            increment,
        }
    }
}

impl Clock for AdvancingClock {
    fn now_unix_sec(&self) -> u64 {
        self.timestamp.fetch_add(self.increment, Ordering::SeqCst)
    }
}
