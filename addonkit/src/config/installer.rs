//! Runtime configuration for install controllers.

use std::path::PathBuf;
use std::time::Duration;

use crate::install::DEFAULT_CHUNK_SIZE;

/// File name of the catalog inside the install directory.
pub const DEFAULT_CATALOG_FILE: &str = "installed.json";

/// Configuration shared by every controller in a session.
#[derive(Debug, Clone, PartialEq)]
pub struct InstallerConfig {
    /// Root directory add-ons are installed under.
    pub install_dir: PathBuf,

    /// Directory for unpacking before commit.
    ///
    /// Should be on the same filesystem as `install_dir` so commits are a
    /// rename rather than a copy.
    pub staging_dir: PathBuf,

    /// Catalog location. Relative paths resolve against `install_dir`.
    pub catalog_file: PathBuf,

    /// Bytes requested per transport read.
    pub chunk_size: usize,

    /// Per-request transport timeout.
    pub request_timeout: Duration,

    /// How long teardown waits for a running worker.
    pub teardown_timeout: Duration,

    /// Whether to verify declared SHA-256 digests.
    pub verify_checksums: bool,
}

impl Default for InstallerConfig {
    fn default() -> Self {
        Self {
            install_dir: PathBuf::from("."),
            staging_dir: std::env::temp_dir().join("addonkit-staging"),
            catalog_file: PathBuf::from(DEFAULT_CATALOG_FILE),
            chunk_size: DEFAULT_CHUNK_SIZE,
            request_timeout: Duration::from_secs(30),
            teardown_timeout: Duration::from_secs(5),
            verify_checksums: true,
        }
    }
}

impl InstallerConfig {
    /// Create a configuration installing into `install_dir`.
    pub fn new(install_dir: PathBuf) -> Self {
        Self {
            install_dir,
            ..Default::default()
        }
    }

    /// Set the staging directory.
    pub fn with_staging_dir(mut self, path: PathBuf) -> Self {
        self.staging_dir = path;
        self
    }

    /// Set the catalog file.
    pub fn with_catalog_file(mut self, path: PathBuf) -> Self {
        self.catalog_file = path;
        self
    }

    /// Set the read chunk size. Zero is raised to one byte.
    pub fn with_chunk_size(mut self, bytes: usize) -> Self {
        self.chunk_size = bytes.max(1);
        self
    }

    /// Set the transport timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Set the teardown wait.
    pub fn with_teardown_timeout(mut self, timeout: Duration) -> Self {
        self.teardown_timeout = timeout;
        self
    }

    /// Enable or disable checksum verification.
    pub fn with_verify_checksums(mut self, verify: bool) -> Self {
        self.verify_checksums = verify;
        self
    }

    /// Absolute catalog path.
    pub fn catalog_path(&self) -> PathBuf {
        if self.catalog_file.is_absolute() {
            self.catalog_file.clone()
        } else {
            self.install_dir.join(&self.catalog_file)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = InstallerConfig::default();
        assert_eq!(config.chunk_size, 64 * 1024);
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert_eq!(config.teardown_timeout, Duration::from_secs(5));
        assert!(config.verify_checksums);
        assert!(config.staging_dir.ends_with("addonkit-staging"));
    }

    #[test]
    fn test_builder_pattern() {
        let config = InstallerConfig::new(PathBuf::from("/games/kart/addons"))
            .with_staging_dir(PathBuf::from("/games/kart/.staging"))
            .with_chunk_size(0)
            .with_request_timeout(Duration::from_secs(5))
            .with_teardown_timeout(Duration::from_millis(250))
            .with_verify_checksums(false);

        assert_eq!(config.install_dir, PathBuf::from("/games/kart/addons"));
        assert_eq!(config.staging_dir, PathBuf::from("/games/kart/.staging"));
        assert_eq!(config.chunk_size, 1);
        assert_eq!(config.teardown_timeout, Duration::from_millis(250));
        assert!(!config.verify_checksums);
    }

    #[test]
    fn test_catalog_path_resolution() {
        let config = InstallerConfig::new(PathBuf::from("/addons"));
        assert_eq!(config.catalog_path(), PathBuf::from("/addons/installed.json"));

        let config = config.with_catalog_file(PathBuf::from("/var/lib/addonkit/catalog.json"));
        assert_eq!(
            config.catalog_path(),
            PathBuf::from("/var/lib/addonkit/catalog.json")
        );
    }
}
