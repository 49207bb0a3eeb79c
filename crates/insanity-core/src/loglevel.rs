//! Per-category verbosity for messages logged by test code.
//!
//! Thresholds come from the `log-level` setup argument, written either as a
//! single level (`"2"`, `"debug"`) or as comma-separated `category:level`
//! entries where `default:<level>` sets the fallback.

use std::collections::BTreeMap;
use std::fmt;

/// Verbosity of one message, or the cut-off of one category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum LogLevel {
    None = 0,
    #[default]
    Info = 1,
    Debug = 2,
    Spam = 3,
}

impl LogLevel {
    /// Accepts `0..=3` or a level name, case-insensitively.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "0" | "none" => Some(Self::None),
            "1" | "info" => Some(Self::Info),
            "2" | "debug" => Some(Self::Debug),
            "3" | "spam" => Some(Self::Spam),
            _ => None,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::None => "none",
            Self::Info => "info",
            Self::Debug => "debug",
            Self::Spam => "spam",
        };
        f.write_str(s)
    }
}

/// Threshold table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogLevels {
    pub default: LogLevel,
    pub per_category: BTreeMap<String, LogLevel>,
}

impl LogLevels {
    /// Parse a `log-level` setting. Bad entries are logged and skipped.
    pub fn parse(spec: &str) -> Self {
        let mut levels = Self::default();
        for entry in spec.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let (category, raw) = match entry.split_once(':') {
                Some((c, r)) => (Some(c.trim()), r),
                None => (None, entry),
            };
            let Some(level) = LogLevel::parse(raw) else {
                tracing::warn!(entry, "ignoring unparsable log-level entry");
                continue;
            };
            match category {
                None | Some("default") => levels.default = level,
                Some(c) if !c.is_empty() => {
                    levels.per_category.insert(c.to_string(), level);
                }
                Some(_) => tracing::warn!(entry, "ignoring log-level entry with empty category"),
            }
        }
        levels
    }

    pub fn threshold(&self, category: &str) -> LogLevel {
        self.per_category.get(category).copied().unwrap_or(self.default)
    }

    /// Whether a message at `level` in `category` should be emitted.
    pub fn accepts(&self, category: &str, level: LogLevel) -> bool {
        level != LogLevel::None && level <= self.threshold(category)
    }
}
