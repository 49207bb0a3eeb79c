//! Diagnostics for test and controller processes.
//!
//! A test binary's stdout belongs to its caller: the metadata document, the
//! `step:` lines and the final report are read by people and scripts alike.
//! Harness diagnostics therefore go to stderr, filtered by `INSANITY_LOG`
//! (`error`, `warn`, `info`, `debug`, `trace`; `warn` when unset or unknown).
//! Messages a test logs through [`crate::Test::log`] pass their own
//! per-category threshold first and then land here too.

use std::sync::OnceLock;

use tracing::Level;

/// Environment variable selecting the diagnostic level.
pub const LOG_ENV: &str = "INSANITY_LOG";

static INIT: OnceLock<()> = OnceLock::new();

fn level_from(raw: Option<&str>) -> Level {
    let Some(raw) = raw else {
        return Level::WARN;
    };
    match raw.trim().to_ascii_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "error" => Level::ERROR,
        _ => Level::WARN,
    }
}

/// Install the stderr subscriber. Later calls, and calls after another
/// subscriber was installed, do nothing.
pub fn init() {
    INIT.get_or_init(|| {
        let level = level_from(std::env::var(LOG_ENV).ok().as_deref());
        let _ = tracing_subscriber::fmt()
            .with_max_level(level)
            .with_writer(std::io::stderr)
            .try_init();
    });
}
