//! Configuration: runtime settings and the on-disk INI file.

mod error;
mod file;
mod installer;

pub use error::{ConfigError, ConfigResult};
pub use file::{ConfigFile, DownloadSettings, InstallSettings, LoggingConfig, PathSettings};
pub use installer::{InstallerConfig, DEFAULT_CATALOG_FILE};
