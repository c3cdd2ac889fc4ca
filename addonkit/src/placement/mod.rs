//! Filesystem placement of downloaded packages.
//!
//! Placement is split into stage, commit and rollback so the installer can
//! guarantee that nothing half-written ever becomes visible at the
//! destination. A commit stays reversible until the catalog has accepted it:
//!
//! ```text
//! stage(package) ──► staging/<id>.partial ──commit──► install_dir/<destination>
//!                              │                              │
//!                              └──rollback──► (removed)       ├──finalize──► previous install dropped
//!                                                             └──revert────► previous install restored
//! ```

mod directory;

use std::path::{Path, PathBuf};

pub use directory::DirectoryPlacement;

use crate::addon::Package;
use crate::install::InstallResult;

/// A package unpacked into the staging area, not yet visible.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedPackage {
    /// Add-on the files belong to.
    pub addon_id: String,
    /// Staging directory holding the unpacked files.
    pub staging_path: PathBuf,
    /// Final location the commit will move them to.
    pub destination: PathBuf,
    /// Number of files written while staging.
    pub files: usize,
}

/// Stage/commit/rollback primitives used by the installer.
pub trait PackagePlacement: Send + Sync {
    /// Unpack the package into a private staging location.
    fn stage(&self, package: &Package) -> InstallResult<StagedPackage>;

    /// Move staged files to their destination, replacing any previous install.
    ///
    /// Returns the final install path. The replaced install is kept until
    /// [`finalize`](Self::finalize) or [`revert`](Self::revert).
    fn commit(&self, staged: &StagedPackage) -> InstallResult<PathBuf>;

    /// Make a commit permanent by dropping whatever it replaced.
    fn finalize(&self, _installed: &Path) {}

    /// Undo a commit: remove the new files and restore what they replaced.
    fn revert(&self, installed: &Path) -> InstallResult<()> {
        self.remove(installed)
    }

    /// Discard a staged package.
    fn rollback(&self, staged: StagedPackage);

    /// Remove a committed install.
    fn remove(&self, installed: &Path) -> InstallResult<()>;
}
