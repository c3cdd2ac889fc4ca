//! INI configuration file.
//!
//! Lives at `<config dir>/addonkit/config.ini`:
//!
//! ```ini
//! [paths]
//! install_dir = /home/me/.local/share/addonkit/addons
//! staging_dir = /tmp/addonkit-staging
//! catalog_file = installed.json
//!
//! [download]
//! chunk_size = 65536
//! timeout_secs = 30
//!
//! [install]
//! verify_checksums = true
//! teardown_timeout_ms = 5000
//!
//! [logging]
//! level = info
//! directory = /home/me/.local/share/addonkit/logs
//! ```
//!
//! Missing keys keep their defaults.

use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use ini::{Ini, Properties};

use super::error::{ConfigError, ConfigResult};
use super::installer::{InstallerConfig, DEFAULT_CATALOG_FILE};
use crate::install::DEFAULT_CHUNK_SIZE;

const APP_DIR: &str = "addonkit";
const CONFIG_FILE: &str = "config.ini";

const SECTION_PATHS: &str = "paths";
const SECTION_DOWNLOAD: &str = "download";
const SECTION_INSTALL: &str = "install";
const SECTION_LOGGING: &str = "logging";

/// `[paths]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathSettings {
    pub install_dir: PathBuf,
    pub staging_dir: PathBuf,
    pub catalog_file: PathBuf,
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            install_dir: data_dir().join("addons"),
            staging_dir: std::env::temp_dir().join("addonkit-staging"),
            catalog_file: PathBuf::from(DEFAULT_CATALOG_FILE),
        }
    }
}

/// `[download]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadSettings {
    pub chunk_size: usize,
    pub timeout_secs: u64,
}

impl Default for DownloadSettings {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            timeout_secs: 30,
        }
    }
}

/// `[install]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallSettings {
    pub verify_checksums: bool,
    pub teardown_timeout_ms: u64,
}

impl Default for InstallSettings {
    fn default() -> Self {
        Self {
            verify_checksums: true,
            teardown_timeout_ms: 5000,
        }
    }
}

/// `[logging]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    /// Default filter directive, overridden by `RUST_LOG`.
    pub level: String,
    /// Directory for rolling log files.
    pub directory: PathBuf,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            directory: data_dir().join("logs"),
        }
    }
}

/// Parsed configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigFile {
    pub paths: PathSettings,
    pub download: DownloadSettings,
    pub install: InstallSettings,
    pub logging: LoggingConfig,
}

impl ConfigFile {
    /// Platform location of the configuration file.
    pub fn default_path() -> ConfigResult<PathBuf> {
        dirs::config_dir()
            .map(|dir| dir.join(APP_DIR).join(CONFIG_FILE))
            .ok_or(ConfigError::NoConfigDir)
    }

    /// Load from the platform location, or defaults if there is no file.
    pub fn load() -> ConfigResult<Self> {
        Self::load_from(&Self::default_path()?)
    }

    /// Load from `path`, or defaults if it does not exist.
    pub fn load_from(path: &Path) -> ConfigResult<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let ini = Ini::load_from_file(path).map_err(|e| match e {
            ini::Error::Io(source) => ConfigError::Read {
                path: path.to_path_buf(),
                source,
            },
            ini::Error::Parse(e) => ConfigError::Parse {
                path: path.to_path_buf(),
                reason: e.to_string(),
            },
        })?;

        Self::from_ini(&ini)
    }

    /// Write the file, creating its directory if needed.
    pub fn save(&self, path: &Path) -> ConfigResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| ConfigError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        self.to_ini()
            .write_to_file(path)
            .map_err(|source| ConfigError::Write {
                path: path.to_path_buf(),
                source,
            })
    }

    /// Build the runtime configuration.
    pub fn to_installer_config(&self) -> InstallerConfig {
        InstallerConfig::new(self.paths.install_dir.clone())
            .with_staging_dir(self.paths.staging_dir.clone())
            .with_catalog_file(self.paths.catalog_file.clone())
            .with_chunk_size(self.download.chunk_size)
            .with_request_timeout(Duration::from_secs(self.download.timeout_secs))
            .with_teardown_timeout(Duration::from_millis(self.install.teardown_timeout_ms))
            .with_verify_checksums(self.install.verify_checksums)
    }

    fn from_ini(ini: &Ini) -> ConfigResult<Self> {
        let mut config = Self::default();

        if let Some(section) = ini.section(Some(SECTION_PATHS)) {
            if let Some(v) = section.get("install_dir") {
                config.paths.install_dir = PathBuf::from(v);
            }
            if let Some(v) = section.get("staging_dir") {
                config.paths.staging_dir = PathBuf::from(v);
            }
            if let Some(v) = section.get("catalog_file") {
                config.paths.catalog_file = PathBuf::from(v);
            }
        }

        if let Some(section) = ini.section(Some(SECTION_DOWNLOAD)) {
            if let Some(v) = parse(section, SECTION_DOWNLOAD, "chunk_size")? {
                config.download.chunk_size = v;
            }
            if let Some(v) = parse(section, SECTION_DOWNLOAD, "timeout_secs")? {
                config.download.timeout_secs = v;
            }
        }

        if let Some(section) = ini.section(Some(SECTION_INSTALL)) {
            if let Some(v) = section.get("verify_checksums") {
                config.install.verify_checksums = parse_bool(SECTION_INSTALL, "verify_checksums", v)?;
            }
            if let Some(v) = parse(section, SECTION_INSTALL, "teardown_timeout_ms")? {
                config.install.teardown_timeout_ms = v;
            }
        }

        if let Some(section) = ini.section(Some(SECTION_LOGGING)) {
            if let Some(v) = section.get("level") {
                config.logging.level = v.to_string();
            }
            if let Some(v) = section.get("directory") {
                config.logging.directory = PathBuf::from(v);
            }
        }

        Ok(config)
    }

    fn to_ini(&self) -> Ini {
        let mut ini = Ini::new();
        ini.with_section(Some(SECTION_PATHS))
            .set("install_dir", self.paths.install_dir.display().to_string())
            .set("staging_dir", self.paths.staging_dir.display().to_string())
            .set("catalog_file", self.paths.catalog_file.display().to_string());
        ini.with_section(Some(SECTION_DOWNLOAD))
            .set("chunk_size", self.download.chunk_size.to_string())
            .set("timeout_secs", self.download.timeout_secs.to_string());
        ini.with_section(Some(SECTION_INSTALL))
            .set("verify_checksums", self.install.verify_checksums.to_string())
            .set(
                "teardown_timeout_ms",
                self.install.teardown_timeout_ms.to_string(),
            );
        ini.with_section(Some(SECTION_LOGGING))
            .set("level", self.logging.level.as_str())
            .set("directory", self.logging.directory.display().to_string());
        ini
    }
}

fn data_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|dir| dir.join(APP_DIR))
        .unwrap_or_else(|| PathBuf::from(APP_DIR))
}

fn parse<T>(section: &Properties, name: &str, key: &str) -> ConfigResult<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    section
        .get(key)
        .map(|raw| {
            raw.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
                section: name.to_string(),
                key: key.to_string(),
                value: raw.to_string(),
                reason: e.to_string(),
            })
        })
        .transpose()
}

fn parse_bool(section: &str, key: &str, raw: &str) -> ConfigResult<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            section: section.to_string(),
            key: key.to_string(),
            value: raw.to_string(),
            reason: "expected true or false".to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_yields_defaults() {
        let temp = TempDir::new().unwrap();
        let config = ConfigFile::load_from(&temp.path().join("config.ini")).unwrap();
        assert_eq!(config, ConfigFile::default());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.ini");
        fs::write(
            &path,
            "[paths]\ninstall_dir = /games/kart/addons\n\n[install]\nverify_checksums = no\n",
        )
        .unwrap();

        let config = ConfigFile::load_from(&path).unwrap();

        assert_eq!(config.paths.install_dir, PathBuf::from("/games/kart/addons"));
        assert!(!config.install.verify_checksums);
        assert_eq!(config.download, DownloadSettings::default());
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_invalid_number_is_rejected() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.ini");
        fs::write(&path, "[download]\nchunk_size = lots\n").unwrap();

        let err = ConfigFile::load_from(&path).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue { ref key, .. } if key == "chunk_size"
        ));
    }

    #[test]
    fn test_invalid_bool_is_rejected() {
        assert!(parse_bool("install", "verify_checksums", "maybe").is_err());
        assert!(parse_bool("install", "verify_checksums", " YES ").unwrap());
    }

    #[test]
    fn test_save_then_load() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("config.ini");

        let mut config = ConfigFile::default();
        config.paths.install_dir = temp.path().join("addons");
        config.download.timeout_secs = 12;
        config.logging.level = "debug".to_string();
        config.save(&path).unwrap();

        assert_eq!(ConfigFile::load_from(&path).unwrap(), config);
    }

    #[test]
    fn test_to_installer_config() {
        let mut config = ConfigFile::default();
        config.paths.install_dir = PathBuf::from("/addons");
        config.download.chunk_size = 4096;
        config.install.teardown_timeout_ms = 750;

        let runtime = config.to_installer_config();

        assert_eq!(runtime.install_dir, PathBuf::from("/addons"));
        assert_eq!(runtime.chunk_size, 4096);
        assert_eq!(runtime.request_timeout, Duration::from_secs(30));
        assert_eq!(runtime.teardown_timeout, Duration::from_millis(750));
        assert_eq!(runtime.catalog_path(), PathBuf::from("/addons/installed.json"));
    }
}
