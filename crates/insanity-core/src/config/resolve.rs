//! Config resolution.
//!
//! Resolves [`HarnessConfig`] from, highest priority first:
//!
//! 1. Command-line overrides ([`ConfigOverrides`])
//! 2. Environment variables (`INSANITY_*`)
//! 3. A TOML file named by `--config` or `INSANITY_CONFIG`
//! 4. Compiled-in defaults

use std::path::{Path, PathBuf};

use super::types::{ConfigError, HarnessConfig};

pub const ENV_CONFIG: &str = "INSANITY_CONFIG";
pub const ENV_TIMEOUT: &str = "INSANITY_TIMEOUT";
pub const ENV_OUTPUT_DIRECTORY: &str = "INSANITY_OUTPUT_DIRECTORY";
pub const ENV_KEEP_UNNAMED: &str = "INSANITY_KEEP_UNNAMED_OUTPUT_FILES";
pub const ENV_POLL_INTERVAL_MS: &str = "INSANITY_POLL_INTERVAL_MS";

/// Command-line overrides.
#[derive(Debug, Default, Clone)]
pub struct ConfigOverrides {
    pub config_path: Option<PathBuf>,
    pub timeout_secs: Option<i64>,
    pub output_directory: Option<PathBuf>,
    /// Only ever turns keeping on
    pub keep_unnamed_output_files: bool,
}

/// Resolve the configuration for this process.
///
/// # Errors
///
/// Returns an error if an explicitly named config file cannot be read or
/// parsed.
pub fn resolve_config(overrides: &ConfigOverrides) -> Result<HarnessConfig, ConfigError> {
    let path = overrides.config_path.clone().or_else(|| env_nonempty(ENV_CONFIG).map(PathBuf::from));
    let mut cfg = match path {
        Some(path) => load_file(&path)?,
        None => HarnessConfig::default(),
    };
    apply_env_overrides(&mut cfg);
    apply_cli_overrides(&mut cfg, overrides);
    Ok(cfg)
}

fn load_file(path: &Path) -> Result<HarnessConfig, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&text).map_err(|source| ConfigError::TomlParse {
        path: path.to_path_buf(),
        source,
    })
}

fn env_nonempty(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

fn env_parsed<T: std::str::FromStr>(key: &str) -> Option<T> {
    let raw = env_nonempty(key)?;
    match raw.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!(var = key, value = %raw, "ignoring unparsable environment override");
            None
        }
    }
}

fn env_flag(key: &str) -> Option<bool> {
    let raw = env_nonempty(key)?;
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => {
            tracing::warn!(var = key, value = %raw, "ignoring unparsable environment override");
            None
        }
    }
}

/// Apply `INSANITY_*` environment overrides to `cfg`. Empty values are
/// treated as unset.
fn apply_env_overrides(cfg: &mut HarnessConfig) {
    if let Some(secs) = env_parsed(ENV_TIMEOUT) {
        cfg.timeout_secs = secs;
    }
    if let Some(dir) = env_nonempty(ENV_OUTPUT_DIRECTORY) {
        cfg.output_directory = Some(PathBuf::from(dir));
    }
    if let Some(keep) = env_flag(ENV_KEEP_UNNAMED) {
        cfg.keep_unnamed_output_files = keep;
    }
    if let Some(ms) = env_parsed(ENV_POLL_INTERVAL_MS) {
        cfg.poll_interval_ms = ms;
    }
}

fn apply_cli_overrides(cfg: &mut HarnessConfig, overrides: &ConfigOverrides) {
    if let Some(secs) = overrides.timeout_secs {
        cfg.timeout_secs = secs;
    }
    if let Some(dir) = &overrides.output_directory {
        cfg.output_directory = Some(dir.clone());
    }
    if overrides.keep_unnamed_output_files {
        cfg.keep_unnamed_output_files = true;
    }
}
