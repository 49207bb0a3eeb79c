//! Configuration for test processes.
//!
//! The entry point is [`resolve_config`]. See [`resolve`] for the priority
//! chain and [`types`] for the settings themselves.

mod resolve;
mod types;

pub use resolve::{
    ConfigOverrides, ENV_CONFIG, ENV_KEEP_UNNAMED, ENV_OUTPUT_DIRECTORY, ENV_POLL_INTERVAL_MS,
    ENV_TIMEOUT, resolve_config,
};
pub use types::{ConfigError, HarnessConfig};
