//! Logging abstraction for testable output.
//!
//! Rotation never fails loudly: every problem is reported through a
//! [`Logger`] and the previous output target is kept. Injecting the logger
//! lets tests assert on exactly what would have been reported.

use std::io::Write;
use std::sync::{Arc, RwLock};

/// Severity of a log message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    /// Failures (always shown)
    Error,
    /// Normal output
    Normal,
    /// Verbose output (-v flag)
    Verbose,
    /// Debug traces (-vv flag)
    Debug,
}

impl Level {
    /// Create a threshold from a CLI flag count.
    pub fn from_count(count: u8) -> Self {
        match count {
            0 => Level::Normal,
            1 => Level::Verbose,
            _ => Level::Debug,
        }
    }
}

/// Trait for logging output.
pub trait Logger: Send + Sync {
    /// Log a message at the given level.
    fn log(&self, level: Level, message: &str);

    fn error(&self, message: &str) {
        self.log(Level::Error, message);
    }

    fn info(&self, message: &str) {
        self.log(Level::Normal, message);
    }

    fn verbose(&self, message: &str) {
        self.log(Level::Verbose, message);
    }

    fn debug(&self, message: &str) {
        self.log(Level::Debug, message);
    }
}

impl<L: Logger + ?Sized> Logger for &L {
    fn log(&self, level: Level, message: &str) {
        (**self).log(level, message);
    }
}

impl<L: Logger + ?Sized> Logger for Arc<L> {
    fn log(&self, level: Level, message: &str) {
        (**self).log(level, message);
    }
}

/// Logger that writes to stderr.
#[derive(Debug)]
pub struct StderrLogger {
    level: Level,
}

impl StderrLogger {
    /// Create a new stderr logger showing messages up to `level`.
    pub fn new(level: Level) -> Self {
        Self { level }
    }

    pub fn normal() -> Self {
        Self::new(Level::Normal)
    }
}

impl Logger for StderrLogger {
    fn log(&self, level: Level, message: &str) {
        if level > self.level {
            return;
        }
        let mut stderr = std::io::stderr();
        let _ = match level {
            Level::Error => writeln!(stderr, "error: {}", message),
            _ => writeln!(stderr, "{}", message),
        };
    }
}

/// A captured log entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub level: Level,
    pub message: String,
}

/// Mock logger for testing that captures all messages.
#[derive(Debug, Clone, Default)]
pub struct MockLogger {
    messages: Arc<RwLock<Vec<LogEntry>>>,
}

impl MockLogger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all captured log entries.
    pub fn entries(&self) -> Vec<LogEntry> {
        self.messages.read().unwrap().clone()
    }

    /// Get all captured messages (just the text).
    pub fn messages(&self) -> Vec<String> {
        self.entries().into_iter().map(|e| e.message).collect()
    }

    /// Get messages at a specific level.
    pub fn messages_at_level(&self, level: Level) -> Vec<String> {
        self.entries()
            .into_iter()
            .filter(|e| e.level == level)
            .map(|e| e.message)
            .collect()
    }

    /// Error-level messages.
    pub fn errors(&self) -> Vec<String> {
        self.messages_at_level(Level::Error)
    }

    /// Check if any message contains the given substring.
    pub fn contains(&self, substring: &str) -> bool {
        self.messages().iter().any(|m| m.contains(substring))
    }

    pub fn clear(&self) {
        self.messages.write().unwrap().clear();
    }

    pub fn count(&self) -> usize {
        self.messages.read().unwrap().len()
    }
}

impl Logger for MockLogger {
    fn log(&self, level: Level, message: &str) {
        // Capture regardless of level so tests see what would be logged
        self.messages.write().unwrap().push(LogEntry {
            level,
            message: message.to_string(),
        });
    }
}

/// A no-op logger that discards all messages.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullLogger;

impl Logger for NullLogger {
    fn log(&self, _level: Level, _message: &str) {}
}
