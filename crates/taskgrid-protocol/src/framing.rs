//! Length-prefixed message framing.
//!
//! Frames are a 4-byte little-endian length prefix followed by that many
//! payload bytes:
//!
//! ```text
//! +----------------+------------------+
//! | length (4 LE)  |  CBOR payload    |
//! +----------------+------------------+
//! ```
//!
//! [`encode_frame`] produces a complete frame ready for transmission.
//! [`FrameBuffer`] reassembles frames from a stream delivered in arbitrary
//! chunks, keeping residual bytes for the next frame.

use std::io::{self, Read};

use crate::MAX_MESSAGE_SIZE;
use crate::error::{ProtocolError, ProtocolResult};

/// How many bytes [`FrameBuffer::read_from`] asks the stream for at once.
const READ_CHUNK: usize = 128 * 1024;

/// Encodes one frame: the little-endian length prefix plus the payload.
pub fn encode_frame(payload: &[u8]) -> ProtocolResult<Vec<u8>> {
    if payload.len() > MAX_MESSAGE_SIZE {
        return Err(ProtocolError::MessageTooLarge {
            size: payload.len(),
            max: MAX_MESSAGE_SIZE,
        });
    }
    let mut frame = Vec::with_capacity(4 + payload.len());
    frame.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    frame.extend_from_slice(payload);
    Ok(frame)
}

/// Reassembles length-prefixed frames from a byte stream.
///
/// Bytes arrive via [`extend`](Self::extend) or
/// [`read_from`](Self::read_from) in whatever chunks the transport
/// delivers; [`next_frame`](Self::next_frame) splices complete payloads
/// back out.
#[derive(Debug, Default)]
pub struct FrameBuffer {
    buf: Vec<u8>,
}

impl FrameBuffer {
    /// Creates an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends raw bytes received from the peer.
    pub fn extend(&mut self, chunk: &[u8]) {
        self.buf.extend_from_slice(chunk);
    }

    /// Reads one chunk from `reader` into the buffer.
    ///
    /// Returns the number of bytes read; zero means the peer closed the
    /// stream. Interrupted reads are retried.
    pub fn read_from<R: Read>(&mut self, reader: &mut R) -> io::Result<usize> {
        let start = self.buf.len();
        self.buf.resize(start + READ_CHUNK, 0);
        loop {
            match reader.read(&mut self.buf[start..]) {
                Ok(n) => {
                    self.buf.truncate(start + n);
                    return Ok(n);
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    self.buf.truncate(start);
                    return Err(e);
                }
            }
        }
    }

    /// Splices the next complete frame payload out of the buffer.
    ///
    /// Returns `Ok(None)` while the buffer holds less than one full frame.
    /// Residual bytes beyond the returned frame stay buffered for the next
    /// call.
    pub fn next_frame(&mut self) -> ProtocolResult<Option<Vec<u8>>> {
        if self.buf.len() < 4 {
            return Ok(None);
        }
        let len = u32::from_le_bytes([self.buf[0], self.buf[1], self.buf[2], self.buf[3]]) as usize;
        if len > MAX_MESSAGE_SIZE {
            return Err(ProtocolError::MessageTooLarge {
                size: len,
                max: MAX_MESSAGE_SIZE,
            });
        }
        if self.buf.len() < 4 + len {
            return Ok(None);
        }
        let payload = self.buf[4..4 + len].to_vec();
        self.buf.drain(..4 + len);
        Ok(Some(payload))
    }
}
