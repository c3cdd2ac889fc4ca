//! `addonkit install`: the frame loop.
//!
//! Starts the controller, then polls it at a fixed rate and draws each
//! snapshot. Ctrl+C asks the controller to cancel; it is ignored once the
//! package is being installed.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use semver::Version;
use tracing::debug;

use addonkit::addon::AddonRef;
use addonkit::config::ConfigFile;
use addonkit::install::{InstallController, Phase, Progress, UiSnapshot};

use super::common::{collaborators, format_size, installer_config};
use crate::error::CliError;

/// Positions on the bar; fractions are mapped onto this range.
const BAR_LENGTH: u64 = 1000;

/// Arguments for `addonkit install`.
#[derive(Debug, Args)]
pub struct InstallArgs {
    /// Add-on identifier
    pub id: String,

    /// Package URL or local path
    #[arg(long, value_name = "URL|PATH")]
    pub source: String,

    /// Display name (defaults to the identifier)
    #[arg(long)]
    pub name: Option<String>,

    /// Expected SHA-256 of the package
    #[arg(long, value_name = "HEX")]
    pub sha256: Option<String>,

    /// Expected package size in bytes
    #[arg(long, value_name = "BYTES")]
    pub size: Option<u64>,

    /// Directory name below the install root (defaults to the identifier)
    #[arg(long, value_name = "NAME")]
    pub dest: Option<String>,

    /// Package revision
    #[arg(long, value_name = "VERSION")]
    pub revision: Option<Version>,

    /// Install directory (overrides the config file)
    #[arg(long, value_name = "DIR")]
    pub install_dir: Option<PathBuf>,

    /// Frames per second for the progress display
    #[arg(long, default_value_t = 30, value_parser = clap::value_parser!(u32).range(1..=240))]
    pub fps: u32,
}

impl InstallArgs {
    /// Build the add-on descriptor.
    pub fn to_addon(&self) -> AddonRef {
        let mut addon = AddonRef::new(self.id.clone(), self.source.clone());
        if let Some(name) = &self.name {
            addon = addon.with_name(name.clone());
        }
        if let Some(sha256) = &self.sha256 {
            addon = addon.with_sha256(sha256.clone());
        }
        if let Some(size) = self.size {
            addon = addon.with_expected_size(size);
        }
        if let Some(dest) = &self.dest {
            addon = addon.with_destination(dest.clone());
        }
        if let Some(revision) = &self.revision {
            addon = addon.with_revision(revision.clone());
        }
        addon
    }
}

/// Run the install command.
pub fn run(args: InstallArgs, config: &ConfigFile) -> Result<(), CliError> {
    let runtime = installer_config(config, args.install_dir.clone());
    let addon = args.to_addon();
    let collaborators = collaborators(&addon, &runtime)?;

    println!(
        "Installing {} into {}",
        style(&addon).bold(),
        runtime.install_dir.display()
    );
    if let Some(size) = addon.expected_size {
        println!("  Package size: {}", format_size(size));
    }

    let interrupted = Arc::new(AtomicBool::new(false));
    let interrupted_clone = Arc::clone(&interrupted);
    ctrlc::set_handler(move || {
        interrupted_clone.store(true, Ordering::SeqCst);
    })?;

    let mut controller = InstallController::new(addon, collaborators, &runtime);
    controller.start()?;

    let frame = frame_interval(args.fps);
    let mut view = ProgressView::new();
    let last = loop {
        if interrupted.swap(false, Ordering::SeqCst) && !controller.cancel() {
            view.note("Install in progress, it cannot be interrupted now");
        }

        let ui = controller.poll();
        view.draw(&ui);
        if ui.is_finished() {
            break ui;
        }
        thread::sleep(frame);
    };

    let teardown = controller.shutdown();
    debug!(?teardown, "Controller shut down");
    view.finish(&last);

    match last.phase {
        Phase::Done => Ok(()),
        Phase::Cancelled => Err(CliError::Cancelled),
        _ => Err(CliError::Install(
            last.error_message
                .unwrap_or_else(|| last.status_text.clone()),
        )),
    }
}

/// Sleep between frames for the requested rate.
pub fn frame_interval(fps: u32) -> Duration {
    Duration::from_secs(1) / fps.max(1)
}

/// Bar position for a progress value, or `None` for a spinner.
pub fn bar_position(progress: Progress) -> Option<u64> {
    progress
        .fraction()
        .map(|f| (f.clamp(0.0, 1.0) as f64 * BAR_LENGTH as f64).round() as u64)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BarMode {
    Bar,
    Spinner,
}

/// Terminal rendering of successive snapshots.
struct ProgressView {
    bar: ProgressBar,
    mode: Option<BarMode>,
}

impl ProgressView {
    fn new() -> Self {
        Self {
            bar: ProgressBar::new(BAR_LENGTH),
            mode: None,
        }
    }

    fn draw(&mut self, ui: &UiSnapshot) {
        match bar_position(ui.progress) {
            Some(position) => {
                self.set_mode(BarMode::Bar);
                self.bar.set_position(position);
            }
            None => {
                self.set_mode(BarMode::Spinner);
                self.bar.tick();
            }
        }
        self.bar.set_message(ui.status_text.clone());
    }

    fn set_mode(&mut self, mode: BarMode) {
        if self.mode == Some(mode) {
            return;
        }

        let style = match mode {
            BarMode::Bar => ProgressStyle::default_bar()
                .template("[{elapsed_precise}] [{bar:40.cyan/blue}] {percent:>3}% {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=>-"),
            BarMode::Spinner => ProgressStyle::default_spinner()
                .template("{spinner:.green} [{elapsed_precise}] {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        };
        self.bar.set_style(style);
        self.mode = Some(mode);
    }

    fn note(&self, message: &str) {
        self.bar.println(format!("{}", style(message).yellow()));
    }

    fn finish(&self, ui: &UiSnapshot) {
        let line = match ui.phase {
            Phase::Done => format!("{}", style(&ui.status_text).green()),
            Phase::Cancelled => format!("{}", style(&ui.status_text).yellow()),
            _ => format!("{}", style(&ui.status_text).red()),
        };
        self.bar.finish_and_clear();
        println!("{}", line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> InstallArgs {
        InstallArgs {
            id: "snow-track".to_string(),
            source: "https://mirror.example/snow-track.tar.gz".to_string(),
            name: Some("Snow Track".to_string()),
            sha256: None,
            size: Some(4096),
            dest: Some("tracks/snow".to_string()),
            revision: Some(Version::new(1, 2, 0)),
            install_dir: None,
            fps: 30,
        }
    }

    #[test]
    fn test_to_addon() {
        let addon = args().to_addon();
        assert_eq!(addon.id, "snow-track");
        assert_eq!(addon.name, "Snow Track");
        assert_eq!(addon.expected_size, Some(4096));
        assert_eq!(addon.destination, "tracks/snow");
        assert_eq!(addon.revision, Some(Version::new(1, 2, 0)));
        assert!(addon.sha256.is_none());
    }

    #[test]
    fn test_frame_interval() {
        assert_eq!(frame_interval(10), Duration::from_millis(100));
        assert_eq!(frame_interval(0), Duration::from_secs(1));
    }

    #[test]
    fn test_bar_position() {
        assert_eq!(bar_position(Progress::Fraction(0.0)), Some(0));
        assert_eq!(bar_position(Progress::Fraction(0.5)), Some(500));
        assert_eq!(bar_position(Progress::Fraction(1.0)), Some(BAR_LENGTH));
        assert_eq!(bar_position(Progress::Indeterminate), None);
    }
}
