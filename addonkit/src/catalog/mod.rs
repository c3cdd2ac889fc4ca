//! Installed add-on catalog.
//!
//! The installer only ever talks to the [`AddonCatalog`] trait; it registers
//! an add-on after its files are committed and never before.

mod json;

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

pub use json::{InstalledRecord, JsonCatalog};

/// Result type for catalog operations.
pub type CatalogResult<T> = Result<T, CatalogError>;

/// Catalog failures.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Catalog file could not be read.
    #[error("failed to read catalog {}: {source}", path.display())]
    Read { path: PathBuf, source: io::Error },

    /// Catalog file could not be written.
    #[error("failed to write catalog {}: {source}", path.display())]
    Write { path: PathBuf, source: io::Error },

    /// Catalog file is not valid JSON.
    #[error("failed to parse catalog {}: {reason}", path.display())]
    Parse { path: PathBuf, reason: String },

    /// Catalog implementation rejected the entry.
    #[error("{0}")]
    Rejected(String),
}

/// Record of which add-ons are installed and where.
pub trait AddonCatalog: Send + Sync {
    /// Mark an add-on as installed at `destination`.
    fn register_installed(&self, addon_id: &str, destination: &Path) -> CatalogResult<()>;

    /// Whether the add-on is currently registered.
    fn is_installed(&self, addon_id: &str) -> bool;

    /// Where a registered add-on lives.
    fn installed_path(&self, addon_id: &str) -> Option<PathBuf>;
}
