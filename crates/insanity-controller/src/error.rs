use std::io;
use std::path::PathBuf;
use std::process::ExitStatus;
use std::time::Duration;

use thiserror::Error;

/// Failures while driving a test process.
#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("failed to start {}: {source}", program.display())]
    Spawn {
        program: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("test exited before connecting to the bus ({0})")]
    ExitedEarly(ExitStatus),

    #[error("test did not connect within {0:?}")]
    ConnectTimeout(Duration),

    /// The first frame was not the expected `hello`
    #[error("unexpected handshake: {0}")]
    Handshake(String),

    #[error("{method} got no reply within {after:?}")]
    CallTimeout { method: String, after: Duration },

    /// Error frame sent back by the test
    #[error("{name}: {message}")]
    Remote { name: String, message: String },

    /// `remoteSetUp` or `remoteStart` answered `false`
    #[error("test refused {method}")]
    Refused { method: &'static str },

    #[error("malformed reply to {method}")]
    MalformedReply { method: String },

    #[error("bus connection closed")]
    Closed,

    #[error("{} --insanity-metadata exited with {status}", program.display())]
    MetadataFailed { program: PathBuf, status: ExitStatus },

    #[error("bus I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("invalid metadata document: {0}")]
    Json(#[from] serde_json::Error),
}
