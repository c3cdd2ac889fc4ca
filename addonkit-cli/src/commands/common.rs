//! Helpers shared across CLI commands.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use addonkit::addon::AddonRef;
use addonkit::catalog::JsonCatalog;
use addonkit::config::{ConfigFile, InstallerConfig};
use addonkit::install::Collaborators;
use addonkit::placement::DirectoryPlacement;
use addonkit::transport::transport_for;

use crate::error::CliError;

/// Load the config file from `explicit` or the platform location.
///
/// Returns the parsed file and the path it was (or would be) read from.
pub fn load_config(explicit: Option<&Path>) -> Result<(ConfigFile, PathBuf), CliError> {
    let path = match explicit {
        Some(path) => expand_home(path),
        None => ConfigFile::default_path()?,
    };
    let config = ConfigFile::load_from(&path)?;
    Ok((config, path))
}

/// Runtime config with an optional install directory override.
pub fn installer_config(config: &ConfigFile, install_dir: Option<PathBuf>) -> InstallerConfig {
    let mut runtime = config.to_installer_config();
    if let Some(dir) = install_dir {
        runtime.install_dir = expand_home(&dir);
    }
    runtime
}

/// Wire the concrete transport, catalog and placement for `addon`.
pub fn collaborators(addon: &AddonRef, config: &InstallerConfig) -> Result<Collaborators, CliError> {
    Ok(Collaborators {
        transport: transport_for(&addon.source, config.request_timeout)?,
        catalog: Arc::new(JsonCatalog::open(config.catalog_path())?),
        placement: Arc::new(DirectoryPlacement::new(
            config.install_dir.clone(),
            config.staging_dir.clone(),
        )),
    })
}

/// Expand a leading `~/` to the home directory.
pub fn expand_home(path: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => dirs::home_dir()
            .map(|home| home.join(rest))
            .unwrap_or_else(|| path.to_path_buf()),
        Err(_) => path.to_path_buf(),
    }
}

/// Human-readable byte count.
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_config_missing_file_uses_defaults() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.ini");

        let (config, loaded_from) = load_config(Some(&path)).unwrap();

        assert_eq!(loaded_from, path);
        assert_eq!(config, ConfigFile::default());
    }

    #[test]
    fn test_install_dir_override() {
        let config = ConfigFile::default();
        let runtime = installer_config(&config, Some(PathBuf::from("/games/kart/addons")));
        assert_eq!(runtime.install_dir, PathBuf::from("/games/kart/addons"));
        assert_eq!(
            runtime.catalog_path(),
            PathBuf::from("/games/kart/addons/installed.json")
        );
    }

    #[test]
    fn test_expand_home() {
        assert_eq!(
            expand_home(Path::new("/abs/path")),
            PathBuf::from("/abs/path")
        );
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_home(Path::new("~/addons")), home.join("addons"));
        }
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512 bytes");
        assert_eq!(format_size(2048), "2.00 KB");
        assert_eq!(format_size(5 * 1024 * 1024), "5.00 MB");
    }
}
