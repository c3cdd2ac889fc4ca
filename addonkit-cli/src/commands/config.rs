//! Configuration CLI commands.
//!
//! Provides `config path`, `config show` and `config init`.

use std::path::Path;

use clap::Subcommand;

use addonkit::config::ConfigFile;

use crate::error::CliError;

/// Config subcommands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Show the configuration file path
    Path,

    /// Print the effective configuration
    Show,

    /// Write a configuration file with default values
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

/// Run a config subcommand.
pub fn run(command: ConfigCommands, config: &ConfigFile, path: &Path) -> Result<(), CliError> {
    match command {
        ConfigCommands::Path => {
            println!("{}", path.display());
            Ok(())
        }
        ConfigCommands::Show => {
            for line in render(config) {
                println!("{}", line);
            }
            Ok(())
        }
        ConfigCommands::Init { force } => run_init(path, force),
    }
}

fn run_init(path: &Path, force: bool) -> Result<(), CliError> {
    if path.exists() && !force {
        return Err(CliError::Config(format!(
            "{} already exists. Use --force to overwrite it.",
            path.display()
        )));
    }

    ConfigFile::default().save(path)?;
    println!("Wrote {}", path.display());
    Ok(())
}

/// The configuration as INI-style lines.
fn render(config: &ConfigFile) -> Vec<String> {
    vec![
        "[paths]".to_string(),
        format!("  install_dir = {}", config.paths.install_dir.display()),
        format!("  staging_dir = {}", config.paths.staging_dir.display()),
        format!("  catalog_file = {}", config.paths.catalog_file.display()),
        String::new(),
        "[download]".to_string(),
        format!("  chunk_size = {}", config.download.chunk_size),
        format!("  timeout_secs = {}", config.download.timeout_secs),
        String::new(),
        "[install]".to_string(),
        format!("  verify_checksums = {}", config.install.verify_checksums),
        format!("  teardown_timeout_ms = {}", config.install.teardown_timeout_ms),
        String::new(),
        "[logging]".to_string(),
        format!("  level = {}", config.logging.level),
        format!("  directory = {}", config.logging.directory.display()),
    ]
}
