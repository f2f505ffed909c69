//! Tracing setup for executor processes.
//!
//! The runtime logs through the `tracing` macros; this module installs a
//! process-wide subscriber for binaries that embed the executor.

use thiserror::Error;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Errors that can occur during logging initialization.
#[derive(Debug, Error)]
pub enum LoggingError {
    /// The global subscriber was already installed.
    #[error("failed to set global tracing subscriber: {0}")]
    SetGlobalSubscriber(#[from] tracing::subscriber::SetGlobalDefaultError),
}

/// Installs the diagnostic sink for an executor process.
///
/// The default level is `info`; `RUST_LOG` overrides it. Call once,
/// before [`Executor::start`](crate::Executor::start).
pub fn init_logging() -> Result<(), LoggingError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact());
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}
