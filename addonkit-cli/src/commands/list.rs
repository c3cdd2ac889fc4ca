//! `addonkit list`: show installed add-ons.

use std::path::PathBuf;

use console::style;

use addonkit::catalog::{InstalledRecord, JsonCatalog};
use addonkit::config::ConfigFile;

use super::common::installer_config;
use crate::error::CliError;

/// Run the list command.
pub fn run(config: &ConfigFile, install_dir: Option<PathBuf>) -> Result<(), CliError> {
    let runtime = installer_config(config, install_dir);
    let catalog = JsonCatalog::open(runtime.catalog_path())?;
    let records = catalog.records();

    if records.is_empty() {
        println!("No add-ons installed in {}", runtime.install_dir.display());
        return Ok(());
    }

    println!("{} ({})", style("Installed add-ons").bold(), records.len());
    println!();
    for line in format_records(&records) {
        println!("{}", line);
    }

    Ok(())
}

/// One aligned line per record.
fn format_records(records: &[InstalledRecord]) -> Vec<String> {
    let width = records.iter().map(|r| r.id.len()).max().unwrap_or(0);
    records
        .iter()
        .map(|r| {
            format!(
                "  {:<width$}  {}  {}",
                r.id,
                r.installed_at,
                r.path.display(),
                width = width
            )
        })
        .collect()
}
