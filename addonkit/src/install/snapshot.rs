//! UI-facing view of the install state.

use super::phase::Phase;
use super::state::{InstallSnapshot, Progress};
use crate::addon::AddonRef;

/// Everything the dialog needs to draw one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct UiSnapshot {
    /// Phase the run is in.
    pub phase: Phase,
    /// Progress bar value; always 0.0 while idle.
    pub progress: Progress,
    /// One-line status for the dialog.
    pub status_text: String,
    /// Whether the install button is enabled.
    pub can_install: bool,
    /// Whether a cancel would be accepted.
    pub can_cancel: bool,
    /// Whether the dialog may be left; false while installing.
    pub can_go_back: bool,
    /// Install button text: "Install", "Reinstall" or "Retry".
    pub install_label: &'static str,
    /// Failure text, only in `Failed`.
    pub error_message: Option<String>,
}

impl UiSnapshot {
    /// Derive the UI values from a state snapshot.
    ///
    /// `already_installed` reflects the catalog as of the last completed run
    /// and only affects idle wording and the button label.
    pub fn from_state(addon: &AddonRef, state: &InstallSnapshot, already_installed: bool) -> Self {
        let phase = state.phase;
        let name = addon.name.as_str();

        let progress = match phase {
            Phase::Idle => Progress::Fraction(0.0),
            _ => state.progress,
        };

        Self {
            phase,
            progress,
            status_text: status_text(name, state, already_installed),
            can_install: phase.can_start(),
            can_cancel: phase == Phase::Downloading && !state.cancel_requested,
            can_go_back: phase != Phase::Installing,
            install_label: install_label(phase, already_installed),
            error_message: state.error.clone(),
        }
    }

    /// Whether the run has ended.
    pub fn is_finished(&self) -> bool {
        self.phase.is_terminal()
    }
}

fn status_text(name: &str, state: &InstallSnapshot, already_installed: bool) -> String {
    match state.phase {
        Phase::Idle if already_installed => format!("{} is installed", name),
        Phase::Idle => format!("Ready to install {}", name),
        Phase::Downloading if state.cancel_requested => {
            format!("Cancelling download of {}...", name)
        }
        Phase::Downloading => match state.progress {
            Progress::Fraction(f) => format!("Downloading {}: {:.0}%", name, f * 100.0),
            Progress::Indeterminate => format!("Downloading {}...", name),
        },
        Phase::Installing => format!("Installing {}...", name),
        Phase::Done => format!("{} installed", name),
        Phase::Failed => format!(
            "Failed to install {}: {}",
            name,
            state.error.as_deref().unwrap_or("unknown error")
        ),
        Phase::Cancelled => format!("Installation of {} cancelled", name),
    }
}

fn install_label(phase: Phase, already_installed: bool) -> &'static str {
    match phase {
        Phase::Failed | Phase::Cancelled => "Retry",
        Phase::Done => "Reinstall",
        Phase::Idle if already_installed => "Reinstall",
        _ => "Install",
    }
}
