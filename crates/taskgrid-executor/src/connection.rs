//! Blocking framed connection to the governor.
//!
//! The executor is synchronous at the protocol layer: one frame is
//! received, dispatched and answered before the next one is read. The
//! connection therefore wraps a plain blocking stream.

use std::io::{Read, Write};
use std::os::unix::net::UnixStream;
use std::path::Path;

use taskgrid_protocol::{FrameBuffer, encode_frame};
use tracing::debug;

use crate::error::{ExecutorError, ExecutorResult};

/// A framed stream connection to the governor.
///
/// Generic over the stream so tests can substitute an in-memory peer; the
/// runtime uses a [`UnixStream`].
pub(crate) struct Connection<S> {
    stream: S,
    incoming: FrameBuffer,
}

impl Connection<UnixStream> {
    /// Opens a stream socket to the governor at `path`.
    pub(crate) fn connect(path: &Path) -> ExecutorResult<Self> {
        let stream = UnixStream::connect(path)
            .map_err(|source| ExecutorError::connect_failed(path, source))?;
        debug!(socket = %path.display(), "connected to governor");
        Ok(Self::new(stream))
    }
}

impl<S: Read + Write> Connection<S> {
    pub(crate) fn new(stream: S) -> Self {
        Self {
            stream,
            incoming: FrameBuffer::new(),
        }
    }

    /// Sends one frame, writing until the payload is fully accepted.
    pub(crate) fn send(&mut self, payload: &[u8]) -> ExecutorResult<()> {
        let frame = encode_frame(payload)?;
        self.stream.write_all(&frame)?;
        self.stream.flush()?;
        Ok(())
    }

    /// Returns the next frame payload, reading more bytes as needed.
    ///
    /// Residual bytes beyond one frame stay buffered for the next call.
    /// EOF is fatal: the governor never closes a healthy connection.
    pub(crate) fn receive(&mut self) -> ExecutorResult<Vec<u8>> {
        loop {
            if let Some(payload) = self.incoming.next_frame()? {
                return Ok(payload);
            }
            if self.incoming.read_from(&mut self.stream)? == 0 {
                return Err(ExecutorError::PeerClosed);
            }
        }
    }
}
