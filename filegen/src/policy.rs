//! Generation policies.
//!
//! Pure mapping from (policy, moment) to a filename suffix and the window
//! during which that generation stays current. No I/O happens here.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::logger::Logger;

/// Seconds in a calendar day.
pub const SECS_PER_DAY: u64 = 86400;

/// Default character between the stable name and a generation suffix.
pub const DEFAULT_SEPARATOR: char = '.';

/// How an output stream is split into generations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationType {
    /// A single file, never rotated.
    None,
    /// One file per process id.
    Pid,
    /// One file per UTC day.
    #[default]
    Day,
    /// Seven rotating files per year, keyed by day-of-year mod 7.
    Week,
    /// One file per UTC month.
    Month,
    /// One file per UTC year.
    Year,
    /// One file per day of process uptime.
    Age,
}

/// Error from parsing a generation type name or code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseGenerationTypeError {
    #[error("unknown file generation type \"{0}\"")]
    UnknownName(String),

    #[error("unknown file generation type code {0}")]
    UnknownCode(u8),
}

impl GenerationType {
    pub const ALL: [GenerationType; 7] = [
        GenerationType::None,
        GenerationType::Pid,
        GenerationType::Day,
        GenerationType::Week,
        GenerationType::Month,
        GenerationType::Year,
        GenerationType::Age,
    ];

    /// Keyword used in configuration.
    pub fn name(self) -> &'static str {
        match self {
            GenerationType::None => "none",
            GenerationType::Pid => "pid",
            GenerationType::Day => "day",
            GenerationType::Week => "week",
            GenerationType::Month => "month",
            GenerationType::Year => "year",
            GenerationType::Age => "age",
        }
    }

    /// Numeric code, in declaration order.
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Parse a type name, logging and falling back to [`GenerationType::None`]
    /// when the name is not recognised.
    pub fn parse_lenient<L: Logger>(name: &str, logger: &L) -> Self {
        match name.parse() {
            Ok(kind) => kind,
            Err(e) => {
                logger.error(&format!("{} - reverting to none", e));
                GenerationType::None
            }
        }
    }

    /// Compute the suffix and validity window for `moment`.
    pub fn generation(self, separator: char, moment: &Moment) -> Generation {
        match self {
            GenerationType::None => Generation {
                suffix: String::new(),
                window: Window::default(),
            },
            GenerationType::Pid => Generation {
                suffix: format!("{}#{}", separator, moment.pid),
                window: Window {
                    low: u64::from(moment.pid),
                    high: 0,
                },
            },
            GenerationType::Age => {
                let window = Window::day_of(moment.uptime);
                Generation {
                    suffix: format!("{}a{:08}", separator, window.low),
                    window,
                }
            }
            GenerationType::Day | GenerationType::Week | GenerationType::Month | GenerationType::Year => {
                // Month and year windows are re-evaluated daily instead of
                // bracketing the whole period.
                let window = Window::day_of(moment.stamp);
                let suffix = match utc(moment.stamp) {
                    Some(dt) => self.calendar_suffix(separator, &dt),
                    None => format!("{}{}", separator, moment.stamp),
                };
                Generation { suffix, window }
            }
        }
    }

    fn calendar_suffix(self, separator: char, dt: &DateTime<Utc>) -> String {
        match self {
            GenerationType::Day => format!(
                "{}{:04}{:02}{:02}",
                separator,
                dt.year(),
                dt.month(),
                dt.day()
            ),
            // Day-of-year mod 7, not an ISO week number.
            GenerationType::Week => {
                format!("{}{:04}w{:02}", separator, dt.year(), dt.ordinal0() % 7)
            }
            GenerationType::Month => format!("{}{:04}{:02}", separator, dt.year(), dt.month()),
            GenerationType::Year => format!("{}{:04}", separator, dt.year()),
            GenerationType::None | GenerationType::Pid | GenerationType::Age => String::new(),
        }
    }

    /// Whether a generation opened for `window` is still the right one at `moment`.
    ///
    /// Age generations are judged against the uptime counter, not the
    /// caller's timestamp.
    pub fn is_current(self, window: Window, moment: &Moment) -> bool {
        match self {
            GenerationType::None => true,
            GenerationType::Pid => window.low == u64::from(moment.pid),
            GenerationType::Age => window.contains(moment.uptime),
            GenerationType::Day | GenerationType::Week | GenerationType::Month | GenerationType::Year => {
                window.contains(moment.stamp)
            }
        }
    }
}

fn utc(stamp: u64) -> Option<DateTime<Utc>> {
    i64::try_from(stamp)
        .ok()
        .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
}

impl fmt::Display for GenerationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for GenerationType {
    type Err = ParseGenerationTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        GenerationType::ALL
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ParseGenerationTypeError::UnknownName(s.to_string()))
    }
}

impl TryFrom<u8> for GenerationType {
    type Error = ParseGenerationTypeError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        GenerationType::ALL
            .get(usize::from(code))
            .copied()
            .ok_or(ParseGenerationTypeError::UnknownCode(code))
    }
}

/// Half-open validity interval `[low, high)` of a generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Window {
    pub low: u64,
    pub high: u64,
}

impl Window {
    /// The UTC day (or uptime day) containing `t`.
    ///
    /// The last, partial day of the `u64` range ends at `u64::MAX`, which
    /// [`Window::contains`] treats as open-ended.
    pub fn day_of(t: u64) -> Self {
        let low = t - t % SECS_PER_DAY;
        Self {
            low,
            high: low.saturating_add(SECS_PER_DAY),
        }
    }

    pub fn contains(self, t: u64) -> bool {
        self.low <= t && (t < self.high || self.high == u64::MAX)
    }
}

/// Everything a policy reads about "now".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Moment {
    /// Wall-clock Unix seconds supplied by the caller.
    pub stamp: u64,

    /// Process-wide elapsed seconds.
    pub uptime: u64,

    /// Live process id.
    pub pid: u32,
}

/// Suffix and window of one generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generation {
    pub suffix: String,
    pub window: Window,
}
