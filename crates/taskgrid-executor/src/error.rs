//! Runtime error types.

use std::io;
use std::path::{Path, PathBuf};

use taskgrid_protocol::ProtocolError;
use thiserror::Error;

/// Result type for runtime operations.
pub type ExecutorResult<T> = Result<T, ExecutorError>;

/// Fatal runtime errors.
///
/// Anything that compromises the protocol stream or the process
/// environment ends up here and terminates the executor so the governor
/// can re-spawn it. Per-task failures never appear as `ExecutorError`;
/// they travel back to the governor as error results.
#[derive(Debug, Error)]
pub enum ExecutorError {
    /// A required environment variable is not set.
    #[error("environment variable {0} is not set")]
    MissingEnv(&'static str),

    /// An environment variable holds an unusable value.
    #[error("cannot parse {name}={value:?} as an unsigned integer")]
    InvalidEnv { name: &'static str, value: String },

    /// Could not open the governor socket.
    #[error("cannot connect to governor socket {}: {source}", path.display())]
    ConnectFailed { path: PathBuf, source: io::Error },

    /// The governor closed the connection.
    #[error("connection closed by governor")]
    PeerClosed,

    /// A well-formed message arrived that the executor does not serve.
    #[error("unexpected message kind {0:?}")]
    UnexpectedMessage(String),

    /// Could not stat a file-backed data object.
    #[error("cannot stat data object file {}: {source}", path.display())]
    StatFailed { path: PathBuf, source: io::Error },

    /// Could not open or map a file-backed data object.
    #[error("cannot map data object file {}: {source}", path.display())]
    MapFailed { path: PathBuf, source: io::Error },

    /// Wire-level failure: malformed bytes, bad envelope, codec error.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// IO error on the connection.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl ExecutorError {
    /// Creates a connect failure for `path`.
    pub(crate) fn connect_failed(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::ConnectFailed {
            path: path.into(),
            source,
        }
    }

    /// Creates a stat failure for `path`.
    pub(crate) fn stat_failed(path: &Path, source: io::Error) -> Self {
        Self::StatFailed {
            path: path.into(),
            source,
        }
    }

    /// Creates an open/map failure for `path`.
    pub(crate) fn map_failed(path: &Path, source: io::Error) -> Self {
        Self::MapFailed {
            path: path.into(),
            source,
        }
    }
}
