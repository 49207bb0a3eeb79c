//! The bus connection between a test and its controller.
//!
//! [`Channel`] is the only thing the protocol adapter knows about the
//! transport. [`SocketChannel`] speaks newline-delimited [`Frame`]s over a
//! Unix socket; [`MemoryChannel`] does the same in-process for tests.

mod memory;
#[cfg(unix)]
mod socket;

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::value::Value;
use crate::wire::{Frame, Reply, TEST_INTERFACE, WireArgs};

pub use memory::{MemoryChannel, MemoryPeer};
#[cfg(unix)]
pub use socket::SocketChannel;

/// Environment variable carrying the private bus address in remote mode.
pub const BUS_ADDRESS_ENV: &str = "PRIVATE_DBUS_ADDRESS";

#[derive(Error, Debug)]
pub enum ChannelError {
    #[error("invalid bus address {address:?}: expected unix:path=<socket> or an absolute path")]
    InvalidAddress { address: String },

    #[error("bus I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed frame: {0}")]
    Json(#[from] serde_json::Error),

    #[error("bus connection closed")]
    Closed,
}

/// A method call waiting for its reply.
#[derive(Debug, Clone, PartialEq)]
pub struct InboundCall {
    pub serial: u64,
    pub interface: String,
    pub method: String,
    pub args: WireArgs,
}

/// Transport seam used by the protocol adapter.
pub trait Channel: Send + Sync {
    /// Write one frame.
    fn send_frame(&self, frame: &Frame) -> Result<(), ChannelError>;

    /// Wait up to `timeout` for the next method call.
    ///
    /// Returns `Ok(None)` when nothing arrived in time and
    /// [`ChannelError::Closed`] once the peer is gone.
    fn poll(&self, timeout: Duration) -> Result<Option<InboundCall>, ChannelError>;

    /// Emit a signal on the test interface. Fire-and-forget.
    fn send_signal(&self, path: &str, name: &str, args: Vec<Value>) -> Result<(), ChannelError> {
        self.send_frame(&Frame::Signal {
            path: path.to_string(),
            interface: TEST_INTERFACE.to_string(),
            name: name.to_string(),
            args,
        })
    }

    /// Answer call `serial`.
    fn reply(&self, serial: u64, reply: Reply) -> Result<(), ChannelError> {
        self.send_frame(&reply.into_frame(serial))
    }
}

/// Turn an inbound frame into a call, dropping anything else.
pub(crate) fn frame_to_call(frame: Frame) -> Option<InboundCall> {
    match frame {
        Frame::Call {
            serial,
            interface,
            method,
            args,
        } => Some(InboundCall {
            serial,
            interface,
            method,
            args,
        }),
        other => {
            tracing::debug!(?other, "ignoring non-call frame from controller");
            None
        }
    }
}

/// Extract the socket path from a bus address.
///
/// Accepts `unix:path=<p>` (further `,key=value` pairs are ignored) or a bare
/// absolute path.
pub fn parse_address(address: &str) -> Result<PathBuf, ChannelError> {
    let invalid = || ChannelError::InvalidAddress {
        address: address.to_string(),
    };
    if let Some(rest) = address.strip_prefix("unix:") {
        let path = rest
            .split(',')
            .find_map(|kv| kv.strip_prefix("path="))
            .filter(|p| !p.is_empty())
            .ok_or_else(invalid)?;
        return Ok(PathBuf::from(path));
    }
    let path = PathBuf::from(address);
    if path.is_absolute() {
        Ok(path)
    } else {
        Err(invalid())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_dbus_style_address() {
        assert_eq!(
            parse_address("unix:path=/tmp/bus.sock").unwrap(),
            PathBuf::from("/tmp/bus.sock")
        );
        assert_eq!(
            parse_address("unix:guid=abc,path=/tmp/x").unwrap(),
            PathBuf::from("/tmp/x")
        );
    }

    #[test]
    fn bare_absolute_path_is_accepted() {
        assert_eq!(parse_address("/run/bus").unwrap(), PathBuf::from("/run/bus"));
    }

    #[test]
    fn rejects_other_addresses() {
        for bad in ["", "tcp:host=localhost", "unix:abstract=foo", "relative/path", "unix:path="] {
            assert!(
                matches!(parse_address(bad), Err(ChannelError::InvalidAddress { .. })),
                "{bad:?} should be rejected"
            );
        }
    }
}
