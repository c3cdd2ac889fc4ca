//! addonkit CLI - install add-ons from the terminal
//!
//! Drives the addonkit install controller from a fixed-rate frame loop and
//! renders each frame's snapshot as a progress bar.

mod commands;
mod error;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use console::style;

use addonkit::logging::init_logging;

use commands::common::load_config;
use commands::config::ConfigCommands;
use commands::install::InstallArgs;
use error::CliError;

#[derive(Debug, Parser)]
#[command(name = "addonkit", version, about = "Download and install add-on packages")]
struct Cli {
    /// Also log to the console
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file (defaults to the platform config directory)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Download and install one add-on
    Install(InstallArgs),

    /// List installed add-ons
    List {
        /// Install directory (overrides the config file)
        #[arg(long, value_name = "DIR")]
        install_dir: Option<PathBuf>,
    },

    /// Inspect or create the configuration file
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("{} {}", style("Error:").red().bold(), e);
        process::exit(e.exit_code());
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let (config, config_path) = load_config(cli.config.as_deref())?;

    // The guard flushes the log writer on exit.
    let _log_guard = match init_logging(&config.logging, cli.verbose) {
        Ok(guard) => Some(guard),
        Err(e) => {
            eprintln!("{} {}", style("Warning:").yellow(), e);
            None
        }
    };

    match cli.command {
        Commands::Install(args) => commands::install::run(args, &config),
        Commands::List { install_dir } => commands::list::run(&config, install_dir),
        Commands::Config { command } => commands::config::run(command, &config, &config_path),
    }
}
