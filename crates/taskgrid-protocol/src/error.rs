//! Protocol error types.

use thiserror::Error;

/// Result type for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Errors that can occur while encoding, decoding or framing messages.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Frame payload exceeds the maximum allowed size.
    #[error("message too large: {size} bytes (max: {max})")]
    MessageTooLarge { size: usize, max: usize },

    /// The bytes on the wire do not decode to the expected message shape.
    #[error("malformed wire data: {0}")]
    MalformedWire(String),

    /// Failed to encode a message.
    #[error("failed to encode message: {0}")]
    Encode(String),
}
