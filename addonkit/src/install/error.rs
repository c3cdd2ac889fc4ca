//! Install error types.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::catalog::CatalogError;
use crate::transport::TransportError;

/// Result type for install operations.
pub type InstallResult<T> = Result<T, InstallError>;

/// Errors raised while validating or placing a downloaded package.
#[derive(Debug, Error)]
pub enum InstallError {
    /// The payload failed validation after a complete download.
    #[error("corrupt package {addon}: {reason}")]
    CorruptPackage { addon: String, reason: String },

    /// Failed to read a file or directory.
    #[error("failed to read {}: {source}", path.display())]
    ReadFailed { path: PathBuf, source: io::Error },

    /// Failed to write a file or directory.
    #[error("failed to write {}: {source}", path.display())]
    WriteFailed { path: PathBuf, source: io::Error },

    /// Failed to create a directory.
    #[error("failed to create directory {}: {source}", path.display())]
    CreateDirFailed { path: PathBuf, source: io::Error },

    /// Archive could not be unpacked into the staging area.
    #[error("failed to extract {addon}: {reason}")]
    ExtractionFailed { addon: String, reason: String },

    /// Staged files could not be moved into place.
    #[error("failed to commit {} to {}: {reason}", staged.display(), destination.display())]
    CommitFailed {
        staged: PathBuf,
        destination: PathBuf,
        reason: String,
    },

    /// Destination escapes the install root.
    #[error("invalid destination: {0}")]
    InvalidDestination(String),

    /// The catalog refused the registration.
    #[error("catalog registration failed: {0}")]
    Catalog(#[from] CatalogError),
}

/// Why a run ended without installing.
#[derive(Debug, Error)]
pub enum RunError {
    /// Fetching the package failed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Installing the package failed.
    #[error(transparent)]
    Install(#[from] InstallError),
}

/// Errors returned to the foreground caller of the controller.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ControllerError {
    /// `start()` while a run is still in flight.
    #[error("an install is already in progress for {0}")]
    AlreadyRunning(String),

    /// The worker thread could not be spawned.
    #[error("failed to spawn install worker: {0}")]
    Spawn(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_corrupt_package_display() {
        let err = InstallError::CorruptPackage {
            addon: "snow-track".to_string(),
            reason: "size mismatch: expected 10 bytes, got 8".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "corrupt package snow-track: size mismatch: expected 10 bytes, got 8"
        );
    }

    #[test]
    fn test_write_failed_display_includes_path() {
        let err = InstallError::WriteFailed {
            path: PathBuf::from("/addons/a"),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        };
        assert!(err.to_string().contains("/addons/a"));
        assert!(err.to_string().contains("denied"));
    }

    #[test]
    fn test_run_error_is_transparent() {
        let err: RunError = TransportError::Status {
            source_url: "u".to_string(),
            status: 500,
        }
        .into();
        assert_eq!(err.to_string(), "u returned status 500");
    }
}
