//! Transport error types.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

/// Failures while fetching package bytes.
///
/// All of these end the current run; retrying is up to the user.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Could not reach the package source.
    #[error("failed to connect to {source_url}: {reason}")]
    Connect { source_url: String, reason: String },

    /// The server answered with a non-success status.
    #[error("{source_url} returned status {status}")]
    Status { source_url: String, status: u16 },

    /// Reading from an open stream failed.
    #[error("read from {source_url} failed: {reason}")]
    Read { source_url: String, reason: String },

    /// The stream ended before the expected number of bytes arrived.
    #[error("download of {source_url} truncated: received {received} of {expected} bytes")]
    Truncated {
        source_url: String,
        received: u64,
        expected: u64,
    },

    /// Local package file could not be opened.
    #[error("failed to open {path}: {source}")]
    Open { path: PathBuf, source: io::Error },

    /// Transport could not be constructed.
    #[error("transport setup failed: {0}")]
    Setup(String),
}
