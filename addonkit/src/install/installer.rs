//! Package validation, placement and registration.
//!
//! Runs on the worker thread right after the download. The installer:
//! 1. Validates the payload (non-empty, declared size, SHA-256)
//! 2. Stages it through the [`PackagePlacement`] collaborator
//! 3. Commits the staged files, rolling back on failure
//! 4. Registers the add-on with the [`AddonCatalog`]
//! 5. Finalizes the commit, or reverts it if registration failed
//!
//! The catalog only ever learns about fully committed installs, and a
//! refused registration puts any previous install back.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{info, warn};

use super::error::{InstallError, InstallResult};
use super::state::SharedInstallState;
use crate::addon::Package;
use crate::catalog::AddonCatalog;
use crate::checksum::verify_sha256;
use crate::placement::PackagePlacement;

/// Result of a successful install.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledAddon {
    /// Add-on identifier.
    pub addon_id: String,
    /// Where the add-on now lives.
    pub path: PathBuf,
    /// Payload size in bytes.
    pub bytes: u64,
    /// Files written by placement.
    pub files: usize,
}

/// Validates and places downloaded packages.
pub struct Installer {
    placement: Arc<dyn PackagePlacement>,
    catalog: Arc<dyn AddonCatalog>,
    verify_checksums: bool,
}

impl Installer {
    /// Create an installer with checksum verification enabled.
    pub fn new(placement: Arc<dyn PackagePlacement>, catalog: Arc<dyn AddonCatalog>) -> Self {
        Self {
            placement,
            catalog,
            verify_checksums: true,
        }
    }

    /// Enable or disable SHA-256 verification.
    pub fn with_verify_checksums(mut self, verify: bool) -> Self {
        self.verify_checksums = verify;
        self
    }

    /// Install `package` and record the outcome in `state`.
    ///
    /// Takes ownership of the package; the payload is released as soon as
    /// it has been staged.
    pub fn install(
        &self,
        package: Package,
        state: &SharedInstallState,
    ) -> InstallResult<InstalledAddon> {
        let addon_id = package.addon().id.clone();

        match self.place(package) {
            Ok(installed) => {
                state.set_done();
                info!(
                    addon = %installed.addon_id,
                    path = %installed.path.display(),
                    files = installed.files,
                    "Add-on installed"
                );
                Ok(installed)
            }
            Err(e) => {
                warn!(addon = %addon_id, error = %e, "Install failed");
                state.set_failed(e.to_string());
                Err(e)
            }
        }
    }

    /// Check the payload against what the catalog declared.
    pub fn validate(&self, package: &Package) -> InstallResult<()> {
        let addon = package.addon();
        let corrupt = |reason: String| InstallError::CorruptPackage {
            addon: addon.id.clone(),
            reason,
        };

        if package.is_empty() {
            return Err(corrupt("payload is empty".to_string()));
        }

        if let Some(expected) = addon.expected_size {
            if package.len() != expected {
                return Err(corrupt(format!(
                    "size mismatch: expected {} bytes, got {}",
                    expected,
                    package.len()
                )));
            }
        }

        if self.verify_checksums {
            if let Some(expected) = addon.sha256.as_deref() {
                verify_sha256(package.data(), expected).map_err(|actual| {
                    corrupt(format!(
                        "checksum mismatch: expected {}, got {}",
                        expected, actual
                    ))
                })?;
            }
        }

        Ok(())
    }

    fn place(&self, package: Package) -> InstallResult<InstalledAddon> {
        self.validate(&package)?;

        let staged = self.placement.stage(&package)?;
        let addon_id = package.addon().id.clone();
        let bytes = package.len();
        drop(package);

        let path = match self.placement.commit(&staged) {
            Ok(path) => path,
            Err(e) => {
                self.placement.rollback(staged);
                return Err(e);
            }
        };

        if let Err(e) = self.catalog.register_installed(&addon_id, &path) {
            if let Err(revert_err) = self.placement.revert(&path) {
                warn!(
                    addon = %addon_id,
                    path = %path.display(),
                    error = %revert_err,
                    "Failed to revert unregistered install"
                );
            }
            return Err(e.into());
        }
        self.placement.finalize(&path);

        Ok(InstalledAddon {
            addon_id,
            path,
            bytes,
            files: staged.files,
        })
    }
}
