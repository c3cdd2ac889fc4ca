//! Directory-based placement with staging and atomic rename.
//!
//! Packages are unpacked below the staging directory and then renamed into
//! the install directory. When staging and install live on the same
//! filesystem the commit is a single rename; otherwise it falls back to a
//! recursive copy, which is best effort (a crash mid-copy can leave a
//! partial directory, but the catalog is never told about it).

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Component, Path, PathBuf};

use flate2::read::GzDecoder;
use tracing::{debug, warn};

use super::{PackagePlacement, StagedPackage};
use crate::addon::{AddonRef, Package};
use crate::install::{InstallError, InstallResult};

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];
const TAR_MAGIC_OFFSET: usize = 257;
const TAR_MAGIC: &[u8; 5] = b"ustar";

/// On-disk format of a payload, detected from its leading bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PayloadFormat {
    TarGz,
    Tar,
    Raw,
}

impl PayloadFormat {
    fn detect(data: &[u8]) -> Self {
        if data.starts_with(&GZIP_MAGIC) {
            Self::TarGz
        } else if data.len() > TAR_MAGIC_OFFSET + TAR_MAGIC.len()
            && &data[TAR_MAGIC_OFFSET..TAR_MAGIC_OFFSET + TAR_MAGIC.len()] == TAR_MAGIC
        {
            Self::Tar
        } else {
            Self::Raw
        }
    }
}

/// Places packages into `install_dir/<destination>` via `staging_dir`.
#[derive(Debug, Clone)]
pub struct DirectoryPlacement {
    install_dir: PathBuf,
    staging_dir: PathBuf,
}

impl DirectoryPlacement {
    /// Create a placement rooted at `install_dir`, staging in `staging_dir`.
    pub fn new(install_dir: impl Into<PathBuf>, staging_dir: impl Into<PathBuf>) -> Self {
        Self {
            install_dir: install_dir.into(),
            staging_dir: staging_dir.into(),
        }
    }

    /// Root all add-ons are installed below.
    pub fn install_dir(&self) -> &Path {
        &self.install_dir
    }

    /// Final path for an add-on.
    ///
    /// The destination must be a relative path without `..` so it cannot
    /// escape the install root.
    pub fn destination_for(&self, addon: &AddonRef) -> InstallResult<PathBuf> {
        let relative = Path::new(&addon.destination);
        let valid = !addon.destination.trim().is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));

        if !valid {
            return Err(InstallError::InvalidDestination(addon.destination.clone()));
        }
        Ok(self.install_dir.join(relative))
    }

    fn staging_path_for(&self, addon_id: &str) -> PathBuf {
        let safe: String = addon_id
            .chars()
            .map(|c| if c == '/' || c == '\\' { '_' } else { c })
            .collect();
        self.staging_dir.join(format!("{}.partial", safe))
    }

    fn unpack(&self, package: &Package, staging: &Path) -> InstallResult<()> {
        let addon = package.addon();
        let extract_err = |e: io::Error| InstallError::ExtractionFailed {
            addon: addon.id.clone(),
            reason: e.to_string(),
        };

        match PayloadFormat::detect(package.data()) {
            PayloadFormat::TarGz => {
                debug!(addon = %addon.id, "Unpacking gzip tarball");
                tar::Archive::new(GzDecoder::new(package.data()))
                    .unpack(staging)
                    .map_err(extract_err)
            }
            PayloadFormat::Tar => {
                debug!(addon = %addon.id, "Unpacking tarball");
                tar::Archive::new(package.data())
                    .unpack(staging)
                    .map_err(extract_err)
            }
            PayloadFormat::Raw => {
                let mut name = addon.file_name();
                if matches!(name.as_str(), "." | "..") {
                    name = addon.id.clone();
                }
                let target = staging.join(name);
                debug!(addon = %addon.id, file = %target.display(), "Writing raw payload");

                let mut file = File::create(&target).map_err(|e| InstallError::WriteFailed {
                    path: target.clone(),
                    source: e,
                })?;
                file.write_all(package.data())
                    .and_then(|_| file.sync_all())
                    .map_err(|e| InstallError::WriteFailed {
                        path: target,
                        source: e,
                    })
            }
        }
    }

    /// Remove an existing path, whether file or directory.
    fn remove_path(path: &Path) -> io::Result<()> {
        if path.is_dir() {
            fs::remove_dir_all(path)
        } else {
            fs::remove_file(path)
        }
    }
}

impl PackagePlacement for DirectoryPlacement {
    fn stage(&self, package: &Package) -> InstallResult<StagedPackage> {
        let addon = package.addon();
        let destination = self.destination_for(addon)?;
        let staging_path = self.staging_path_for(&addon.id);

        if staging_path.exists() {
            debug!(path = %staging_path.display(), "Removing stale staging directory");
            Self::remove_path(&staging_path).map_err(|e| InstallError::WriteFailed {
                path: staging_path.clone(),
                source: e,
            })?;
        }

        fs::create_dir_all(&staging_path).map_err(|e| InstallError::CreateDirFailed {
            path: staging_path.clone(),
            source: e,
        })?;

        let files = match self
            .unpack(package, &staging_path)
            .and_then(|_| count_files_recursive(&staging_path))
        {
            Ok(files) => files,
            Err(e) => {
                fs::remove_dir_all(&staging_path).ok();
                return Err(e);
            }
        };
        debug!(addon = %addon.id, files, path = %staging_path.display(), "Package staged");

        Ok(StagedPackage {
            addon_id: addon.id.clone(),
            staging_path,
            destination,
            files,
        })
    }

    fn commit(&self, staged: &StagedPackage) -> InstallResult<PathBuf> {
        let destination = &staged.destination;
        let source = promoted_root(&staged.staging_path)?;

        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent).map_err(|e| InstallError::CreateDirFailed {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        // Keep the previous install until the new one is in place.
        let backup = backup_path(destination);
        let had_previous = destination.exists();
        if had_previous {
            if backup.exists() {
                Self::remove_path(&backup).ok();
            }
            fs::rename(destination, &backup).map_err(|e| InstallError::CommitFailed {
                staged: staged.staging_path.clone(),
                destination: destination.clone(),
                reason: format!("could not move previous install aside: {}", e),
            })?;
        }

        let placed = fs::rename(&source, destination).or_else(|rename_err| {
            debug!(error = %rename_err, "Rename failed, falling back to copy");
            copy_dir_recursive(&source, destination).map_err(|e| {
                Self::remove_path(destination).ok();
                e.to_string()
            })
        });

        if let Err(reason) = placed {
            if had_previous {
                if let Err(e) = fs::rename(&backup, destination) {
                    warn!(
                        path = %destination.display(),
                        error = %e,
                        "Failed to restore previous install"
                    );
                }
            }
            return Err(InstallError::CommitFailed {
                staged: staged.staging_path.clone(),
                destination: destination.clone(),
                reason,
            });
        }

        if staged.staging_path.exists() {
            fs::remove_dir_all(&staged.staging_path).ok();
        }

        debug!(addon = %staged.addon_id, path = %destination.display(), "Package committed");
        Ok(destination.clone())
    }

    fn finalize(&self, installed: &Path) {
        let backup = backup_path(installed);
        if !backup.exists() {
            return;
        }
        match Self::remove_path(&backup) {
            Ok(()) => debug!(path = %backup.display(), "Previous install removed"),
            Err(e) => warn!(path = %backup.display(), error = %e, "Failed to remove previous install"),
        }
    }

    fn revert(&self, installed: &Path) -> InstallResult<()> {
        self.remove(installed)?;

        let backup = backup_path(installed);
        if backup.exists() {
            fs::rename(&backup, installed).map_err(|e| InstallError::WriteFailed {
                path: installed.to_path_buf(),
                source: e,
            })?;
            debug!(path = %installed.display(), "Previous install restored");
        }
        Ok(())
    }

    fn rollback(&self, staged: StagedPackage) {
        match fs::remove_dir_all(&staged.staging_path) {
            Ok(()) => debug!(addon = %staged.addon_id, "Staging directory removed"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!(
                addon = %staged.addon_id,
                path = %staged.staging_path.display(),
                error = %e,
                "Failed to remove staging directory"
            ),
        }
    }

    fn remove(&self, installed: &Path) -> InstallResult<()> {
        if !installed.starts_with(&self.install_dir) || installed == self.install_dir {
            return Err(InstallError::InvalidDestination(
                installed.display().to_string(),
            ));
        }

        Self::remove_path(installed).map_err(|e| InstallError::WriteFailed {
            path: installed.to_path_buf(),
            source: e,
        })
    }
}

/// The directory whose contents become the install.
///
/// Archives that wrap everything in a single top-level directory have that
/// directory promoted, so `pack.tar.gz/pack/...` installs as `<dest>/...`.
fn promoted_root(staging: &Path) -> InstallResult<PathBuf> {
    let entries: Vec<_> = fs::read_dir(staging)
        .map_err(|e| InstallError::ReadFailed {
            path: staging.to_path_buf(),
            source: e,
        })?
        .filter_map(|e| e.ok())
        .collect();

    if entries.len() == 1 && entries[0].path().is_dir() {
        Ok(entries[0].path())
    } else {
        Ok(staging.to_path_buf())
    }
}

fn backup_path(destination: &Path) -> PathBuf {
    let mut name = destination
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".previous");
    destination.with_file_name(name)
}

/// Recursively copy a directory.
fn copy_dir_recursive(source: &Path, dest: &Path) -> InstallResult<()> {
    fs::create_dir_all(dest).map_err(|e| InstallError::CreateDirFailed {
        path: dest.to_path_buf(),
        source: e,
    })?;

    for entry in fs::read_dir(source).map_err(|e| InstallError::ReadFailed {
        path: source.to_path_buf(),
        source: e,
    })? {
        let entry = entry.map_err(|e| InstallError::ReadFailed {
            path: source.to_path_buf(),
            source: e,
        })?;

        let source_path = entry.path();
        let dest_path = dest.join(entry.file_name());

        if source_path.is_dir() {
            copy_dir_recursive(&source_path, &dest_path)?;
        } else {
            fs::copy(&source_path, &dest_path).map_err(|e| InstallError::WriteFailed {
                path: dest_path,
                source: e,
            })?;
        }
    }

    Ok(())
}

/// Count files recursively in a directory.
fn count_files_recursive(dir: &Path) -> InstallResult<usize> {
    let mut count = 0;

    if !dir.exists() {
        return Ok(0);
    }

    let entries = fs::read_dir(dir).map_err(|e| InstallError::ReadFailed {
        path: dir.to_path_buf(),
        source: e,
    })?;

    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_file() {
            count += 1;
        } else if path.is_dir() {
            count += count_files_recursive(&path)?;
        }
    }

    Ok(count)
}
