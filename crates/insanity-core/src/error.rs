//! Top-level failures of a test process.

use thiserror::Error;

use crate::arguments::ArgumentError;
use crate::channel::ChannelError;
use crate::config::ConfigError;

#[derive(Error, Debug)]
pub enum HarnessError {
    /// Remote mode was requested but the bus address variable is unset
    #[error("remote mode requires the bus address in PRIVATE_DBUS_ADDRESS")]
    MissingBusAddress,

    #[error("{0}")]
    Usage(String),

    #[error(transparent)]
    Argument(#[from] ArgumentError),

    #[error(transparent)]
    Channel(#[from] ChannelError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}
