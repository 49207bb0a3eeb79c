//! Newline-delimited frame I/O for the controller end of the bus.
//!
//! One JSON [`Frame`] per `\n`-terminated line, the same framing the test
//! side writes with its blocking socket channel.

use std::io;

use insanity_core::wire::Frame;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};

/// Reads frames from an async reader.
pub struct FrameReader<R> {
    reader: BufReader<R>,
    buf: String,
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader: BufReader::new(reader),
            buf: String::new(),
        }
    }

    /// Read the next frame, returning `None` on EOF.
    ///
    /// Blank lines are skipped.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if reading fails, or `InvalidData` when a line is
    /// not a valid frame.
    pub async fn next_frame(&mut self) -> io::Result<Option<Frame>> {
        loop {
            self.buf.clear();
            let n = self.reader.read_line(&mut self.buf).await?;
            if n == 0 {
                return Ok(None);
            }
            let trimmed = self.buf.trim();
            if trimmed.is_empty() {
                continue;
            }
            let frame = serde_json::from_str(trimmed)
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
            return Ok(Some(frame));
        }
    }
}

/// Write one frame followed by `\n`, then flush.
///
/// # Errors
///
/// Returns an I/O error if serializing, writing or flushing fails.
pub async fn write_frame<W: AsyncWrite + Unpin>(writer: &mut W, frame: &Frame) -> io::Result<()> {
    let json = serde_json::to_string(frame).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    writer.write_all(json.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use insanity_core::Value;

    #[tokio::test]
    async fn reads_frames_and_skips_blank_lines() {
        let input = concat!(
            "{\"frame\":\"hello\",\"name\":\"n\",\"path\":\"/p\"}\n",
            "\n",
            "{\"frame\":\"reply\",\"serial\":3,\"values\":[{\"type\":\"boolean\",\"value\":true}]}\n",
        );
        let mut reader = FrameReader::new(input.as_bytes());
        assert_eq!(
            reader.next_frame().await.unwrap(),
            Some(Frame::Hello {
                name: "n".into(),
                path: "/p".into()
            })
        );
        assert_eq!(
            reader.next_frame().await.unwrap(),
            Some(Frame::Reply {
                serial: 3,
                values: vec![Value::Bool(true)]
            })
        );
        assert_eq!(reader.next_frame().await.unwrap(), None);
    }

    #[tokio::test]
    async fn garbage_is_invalid_data() {
        let mut reader = FrameReader::new(&b"not json\n"[..]);
        let err = reader.next_frame().await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[tokio::test]
    async fn written_frame_reads_back() {
        let mut out = Vec::new();
        let frame = Frame::Error {
            serial: 9,
            name: "x.Error".into(),
            message: "nope".into(),
        };
        write_frame(&mut out, &frame).await.unwrap();
        assert_eq!(out.last(), Some(&b'\n'));
        let mut reader = FrameReader::new(&out[..]);
        assert_eq!(reader.next_frame().await.unwrap(), Some(frame));
    }
}
