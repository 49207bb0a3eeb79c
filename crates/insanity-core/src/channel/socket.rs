//! Unix-socket channel: one JSON frame per line.

use std::io::{BufRead, BufReader, ErrorKind, Write};
use std::os::unix::net::UnixStream;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use super::{Channel, ChannelError, InboundCall, frame_to_call, parse_address};
use crate::wire::Frame;

struct ReadHalf {
    reader: BufReader<UnixStream>,
    // Bytes of a line whose end has not arrived yet.
    partial: Vec<u8>,
}

/// Connected client end of the private bus.
pub struct SocketChannel {
    writer: Mutex<UnixStream>,
    read: Mutex<ReadHalf>,
}

impl std::fmt::Debug for SocketChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SocketChannel").finish_non_exhaustive()
    }
}

impl SocketChannel {
    /// Connect to `address` (see [`parse_address`]).
    ///
    /// # Errors
    ///
    /// [`ChannelError::InvalidAddress`] or the connect I/O error.
    pub fn connect(address: &str) -> Result<Self, ChannelError> {
        let path = parse_address(address)?;
        let stream = UnixStream::connect(&path)?;
        tracing::debug!(path = %path.display(), "connected to bus");
        Self::from_stream(stream)
    }

    pub fn from_stream(stream: UnixStream) -> Result<Self, ChannelError> {
        let reader = stream.try_clone()?;
        Ok(Self {
            writer: Mutex::new(stream),
            read: Mutex::new(ReadHalf {
                reader: BufReader::new(reader),
                partial: Vec::new(),
            }),
        })
    }
}

impl Channel for SocketChannel {
    fn send_frame(&self, frame: &Frame) -> Result<(), ChannelError> {
        let mut line = serde_json::to_vec(frame)?;
        line.push(b'\n');
        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        match writer.write_all(&line).and_then(|()| writer.flush()) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::BrokenPipe => Err(ChannelError::Closed),
            Err(e) => Err(e.into()),
        }
    }

    fn poll(&self, timeout: Duration) -> Result<Option<InboundCall>, ChannelError> {
        let mut read = self.read.lock().unwrap_or_else(PoisonError::into_inner);
        // A zero timeout means "block forever" to the socket API.
        let timeout = timeout.max(Duration::from_millis(1));
        read.reader.get_ref().set_read_timeout(Some(timeout))?;

        let ReadHalf { reader, partial } = &mut *read;
        match reader.read_until(b'\n', partial) {
            Ok(0) => Err(ChannelError::Closed),
            Ok(_) if partial.last() != Some(&b'\n') => Err(ChannelError::Closed),
            Ok(_) => {
                let line = std::mem::take(partial);
                let text = String::from_utf8_lossy(&line);
                let text = text.trim();
                if text.is_empty() {
                    return Ok(None);
                }
                let frame: Frame = serde_json::from_str(text)?;
                Ok(frame_to_call(frame))
            }
            Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => Ok(None),
            Err(e) if e.kind() == ErrorKind::Interrupted => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
