//! Harness configuration types.
//!
//! [`HarnessConfig`] is what a test process runs with. Every field has a
//! default, so an empty or absent config file yields a working setup.
//!
//! # Example config file
//!
//! ```toml
//! timeout_secs = 30
//! output_directory = "/var/tmp/insanity"
//! keep_unnamed_output_files = true
//! poll_interval_ms = 20
//! ```

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

fn default_timeout_secs() -> i64 {
    15
}

fn default_poll_interval_ms() -> u64 {
    10
}

/// Errors loading configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file {path}: {source}")]
    TomlParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Runtime settings for one test process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HarnessConfig {
    /// Watchdog period in seconds; `<= 0` disables it
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: i64,

    /// Parent of the per-instance temporary directory
    #[serde(default)]
    pub output_directory: Option<PathBuf>,

    /// Keep synthesized output files after teardown
    #[serde(default)]
    pub keep_unnamed_output_files: bool,

    /// Control-loop poll interval
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            output_directory: None,
            keep_unnamed_output_files: false,
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

impl HarnessConfig {
    /// The watchdog period, or `None` when disabled.
    pub fn watchdog_period(&self) -> Option<Duration> {
        u64::try_from(self.timeout_secs)
            .ok()
            .filter(|&s| s > 0)
            .map(Duration::from_secs)
    }

    /// Poll interval clamped to 1..=100 ms.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.clamp(1, 100))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cfg = HarnessConfig::default();
        assert_eq!(cfg.timeout_secs, 15);
        assert_eq!(cfg.watchdog_period(), Some(Duration::from_secs(15)));
        assert!(cfg.output_directory.is_none());
        assert!(!cfg.keep_unnamed_output_files);
        assert_eq!(cfg.poll_interval(), Duration::from_millis(10));
    }

    #[test]
    fn non_positive_timeout_disables_watchdog() {
        for secs in [0, -1, -100] {
            let cfg = HarnessConfig {
                timeout_secs: secs,
                ..HarnessConfig::default()
            };
            assert!(cfg.watchdog_period().is_none());
        }
    }

    #[test]
    fn poll_interval_is_clamped() {
        let mut cfg = HarnessConfig {
            poll_interval_ms: 0,
            ..HarnessConfig::default()
        };
        assert_eq!(cfg.poll_interval(), Duration::from_millis(1));
        cfg.poll_interval_ms = 5000;
        assert_eq!(cfg.poll_interval(), Duration::from_millis(100));
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let cfg: HarnessConfig = toml::from_str("keep_unnamed_output_files = true\n").unwrap();
        assert!(cfg.keep_unnamed_output_files);
        assert_eq!(cfg.timeout_secs, 15);
        assert_eq!(cfg.poll_interval_ms, 10);
    }

    #[test]
    fn full_toml() {
        let cfg: HarnessConfig = toml::from_str(
            r#"
timeout_secs = -1
output_directory = "/var/tmp/x"
keep_unnamed_output_files = false
poll_interval_ms = 50
"#,
        )
        .unwrap();
        assert_eq!(cfg.timeout_secs, -1);
        assert_eq!(cfg.output_directory, Some(PathBuf::from("/var/tmp/x")));
        assert_eq!(cfg.poll_interval_ms, 50);
    }
}
