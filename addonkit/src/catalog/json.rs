//! JSON-file backed catalog.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{AddonCatalog, CatalogError, CatalogResult};

/// One installed add-on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstalledRecord {
    /// Add-on identifier.
    pub id: String,
    /// Install location.
    pub path: PathBuf,
    /// RFC 3339 timestamp of the install.
    pub installed_at: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    addons: Vec<InstalledRecord>,
}

/// Catalog persisted as `installed.json`.
///
/// Every mutation rewrites the file through a temporary sibling and a rename,
/// so a crash mid-write leaves the previous catalog intact.
#[derive(Debug)]
pub struct JsonCatalog {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, InstalledRecord>>,
}

impl JsonCatalog {
    /// Open the catalog at `path`, starting empty if the file does not exist.
    pub fn open(path: impl Into<PathBuf>) -> CatalogResult<Self> {
        let path = path.into();
        let entries = if path.exists() {
            let text = fs::read_to_string(&path).map_err(|e| CatalogError::Read {
                path: path.clone(),
                source: e,
            })?;
            let file: CatalogFile =
                serde_json::from_str(&text).map_err(|e| CatalogError::Parse {
                    path: path.clone(),
                    reason: e.to_string(),
                })?;
            file.addons
                .into_iter()
                .map(|record| (record.id.clone(), record))
                .collect()
        } else {
            BTreeMap::new()
        };

        debug!(path = %path.display(), entries = entries.len(), "Catalog opened");
        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    /// Location of the catalog file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All records, ordered by id.
    pub fn records(&self) -> Vec<InstalledRecord> {
        self.entries.lock().values().cloned().collect()
    }

    /// Drop an add-on from the catalog. Returns whether it was present.
    pub fn unregister(&self, addon_id: &str) -> CatalogResult<bool> {
        let mut entries = self.entries.lock();
        let Some(previous) = entries.remove(addon_id) else {
            return Ok(false);
        };

        if let Err(e) = self.persist(&entries) {
            entries.insert(addon_id.to_string(), previous);
            return Err(e);
        }
        Ok(true)
    }

    fn persist(&self, entries: &BTreeMap<String, InstalledRecord>) -> CatalogResult<()> {
        let write_err = |path: &Path, source| CatalogError::Write {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| write_err(parent, e))?;
        }

        let file = CatalogFile {
            addons: entries.values().cloned().collect(),
        };
        let json = serde_json::to_string_pretty(&file)
            .map_err(|e| CatalogError::Rejected(e.to_string()))?;

        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).map_err(|e| write_err(&tmp, e))?;
        fs::rename(&tmp, &self.path).map_err(|e| write_err(&self.path, e))?;
        Ok(())
    }
}

impl AddonCatalog for JsonCatalog {
    fn register_installed(&self, addon_id: &str, destination: &Path) -> CatalogResult<()> {
        let record = InstalledRecord {
            id: addon_id.to_string(),
            path: destination.to_path_buf(),
            installed_at: chrono::Utc::now().to_rfc3339(),
        };

        let mut entries = self.entries.lock();
        let previous = entries.insert(addon_id.to_string(), record);

        if let Err(e) = self.persist(&entries) {
            match previous {
                Some(previous) => entries.insert(addon_id.to_string(), previous),
                None => entries.remove(addon_id),
            };
            return Err(e);
        }

        info!(addon = %addon_id, path = %destination.display(), "Add-on registered");
        Ok(())
    }

    fn is_installed(&self, addon_id: &str) -> bool {
        self.entries.lock().contains_key(addon_id)
    }

    fn installed_path(&self, addon_id: &str) -> Option<PathBuf> {
        self.entries.lock().get(addon_id).map(|r| r.path.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_open_missing_file_is_empty() {
        let temp = TempDir::new().unwrap();
        let catalog = JsonCatalog::open(temp.path().join("installed.json")).unwrap();
        assert!(catalog.records().is_empty());
        assert!(!catalog.is_installed("a"));
    }

    #[test]
    fn test_register_persists_across_reopen() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("state").join("installed.json");

        let catalog = JsonCatalog::open(&path).unwrap();
        catalog
            .register_installed("snow-track", Path::new("/addons/snow-track"))
            .unwrap();
        assert!(catalog.is_installed("snow-track"));

        let reopened = JsonCatalog::open(&path).unwrap();
        assert!(reopened.is_installed("snow-track"));
        assert_eq!(
            reopened.installed_path("snow-track"),
            Some(PathBuf::from("/addons/snow-track"))
        );
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn test_register_replaces_existing_record() {
        let temp = TempDir::new().unwrap();
        let catalog = JsonCatalog::open(temp.path().join("installed.json")).unwrap();

        catalog.register_installed("a", Path::new("/one")).unwrap();
        catalog.register_installed("a", Path::new("/two")).unwrap();

        assert_eq!(catalog.records().len(), 1);
        assert_eq!(catalog.installed_path("a"), Some(PathBuf::from("/two")));
    }

    #[test]
    fn test_unregister() {
        let temp = TempDir::new().unwrap();
        let catalog = JsonCatalog::open(temp.path().join("installed.json")).unwrap();
        catalog.register_installed("a", Path::new("/a")).unwrap();

        assert!(catalog.unregister("a").unwrap());
        assert!(!catalog.unregister("a").unwrap());
        assert!(!catalog.is_installed("a"));
    }

    #[test]
    fn test_open_corrupt_file_fails() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("installed.json");
        fs::write(&path, "{ not json").unwrap();

        let err = JsonCatalog::open(&path).unwrap_err();
        assert!(matches!(err, CatalogError::Parse { .. }));
    }

    #[test]
    fn test_failed_write_rolls_back_entry() {
        let temp = TempDir::new().unwrap();
        // A directory where the catalog file should be makes the rename fail.
        let path = temp.path().join("installed.json");
        fs::create_dir(&path).unwrap();
        fs::write(path.join("blocker"), "x").unwrap();

        let catalog = JsonCatalog {
            path: path.clone(),
            entries: Mutex::new(BTreeMap::new()),
        };

        assert!(catalog.register_installed("a", Path::new("/a")).is_err());
        assert!(!catalog.is_installed("a"));
    }
}
