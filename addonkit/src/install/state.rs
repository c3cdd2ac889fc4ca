//! Thread-safe install state shared between the worker and the poller.
//!
//! [`SharedInstallState`] is the only thing the background worker and the
//! foreground loop both touch. Every field lives behind one mutex and every
//! transition is checked against the phase graph under that lock, so a
//! cancel request and the end of a download can never interleave into an
//! inconsistent state.
//!
//! ```text
//! worker ── set_downloading / set_installing / set_done / set_failed ──┐
//!                                                                       ▼
//!                                                        Mutex<StateInner>
//!                                                                       ▲
//! controller ── request_cancel / snapshot / reset ─────────────────────┘
//! ```

use parking_lot::Mutex;
use tracing::debug;

use super::phase::Phase;

/// Message stored when a failure arrives without any text.
const UNKNOWN_FAILURE: &str = "unknown error";

/// Download progress as seen by the UI.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Progress {
    /// Fraction complete in `[0.0, 1.0]`.
    Fraction(f32),
    /// Total size unknown; show a spinner.
    Indeterminate,
}

impl Progress {
    /// The fraction, or `None` when indeterminate.
    pub fn fraction(self) -> Option<f32> {
        match self {
            Self::Fraction(f) => Some(f),
            Self::Indeterminate => None,
        }
    }

    /// Build a progress value from byte counts.
    ///
    /// Unknown or zero totals are indeterminate.
    pub fn from_bytes(received: u64, total: Option<u64>) -> Self {
        match total {
            Some(total) if total > 0 => {
                Self::Fraction((received as f64 / total as f64).min(1.0) as f32)
            }
            _ => Self::Indeterminate,
        }
    }
}

/// Point-in-time copy of the shared state.
#[derive(Debug, Clone, PartialEq)]
pub struct InstallSnapshot {
    /// Current phase.
    pub phase: Phase,
    /// Current progress.
    pub progress: Progress,
    /// Failure text, present iff `phase == Failed`.
    pub error: Option<String>,
    /// Whether a cancel has been requested for this run.
    pub cancel_requested: bool,
}

#[derive(Debug, Default)]
struct StateInner {
    phase: Phase,
    progress: f32,
    indeterminate: bool,
    error: Option<String>,
    cancel_requested: bool,
}

/// Mutex-guarded phase, progress and error for one install run.
#[derive(Debug, Default)]
pub struct SharedInstallState {
    inner: Mutex<StateInner>,
}

impl SharedInstallState {
    /// Create a state in `Idle` with no progress.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record download progress.
    ///
    /// Valid from `Idle` or `Downloading`; moves to `Downloading`. A fraction
    /// lower than the one already recorded is ignored so the progress bar
    /// never runs backwards. Returns `false` if the phase did not allow it.
    pub fn set_downloading(&self, progress: Progress) -> bool {
        let mut inner = self.inner.lock();
        if !matches!(inner.phase, Phase::Idle | Phase::Downloading) {
            debug!(phase = %inner.phase, "Ignoring download progress");
            return false;
        }

        inner.phase = Phase::Downloading;
        match progress {
            Progress::Fraction(f) => {
                inner.indeterminate = false;
                if !f.is_nan() {
                    let f = f.clamp(0.0, 1.0);
                    if f > inner.progress {
                        inner.progress = f;
                    }
                }
            }
            Progress::Indeterminate => inner.indeterminate = true,
        }
        true
    }

    /// Move from `Downloading` to `Installing`.
    ///
    /// Refused when a cancel is pending: the worker must then record
    /// `Cancelled` instead of starting the install.
    pub fn set_installing(&self) -> bool {
        let mut inner = self.inner.lock();
        if inner.phase != Phase::Downloading || inner.cancel_requested {
            return false;
        }

        inner.phase = Phase::Installing;
        inner.progress = 1.0;
        inner.indeterminate = false;
        true
    }

    /// Move from `Installing` to `Done`.
    pub fn set_done(&self) -> bool {
        let mut inner = self.inner.lock();
        if inner.phase != Phase::Installing {
            return false;
        }

        inner.phase = Phase::Done;
        inner.progress = 1.0;
        true
    }

    /// Move from `Downloading` or `Installing` to `Failed`.
    pub fn set_failed(&self, message: impl Into<String>) -> bool {
        let mut inner = self.inner.lock();
        if !inner.phase.is_active() {
            return false;
        }

        let message = message.into();
        inner.phase = Phase::Failed;
        inner.error = Some(if message.trim().is_empty() {
            UNKNOWN_FAILURE.to_string()
        } else {
            message
        });
        true
    }

    /// Move from `Idle` or `Downloading` to `Cancelled`.
    pub fn set_cancelled(&self) -> bool {
        let mut inner = self.inner.lock();
        if !matches!(inner.phase, Phase::Idle | Phase::Downloading) {
            return false;
        }

        inner.phase = Phase::Cancelled;
        true
    }

    /// Ask the worker to stop at its next checkpoint.
    ///
    /// Only accepted while `Idle` or `Downloading`; installation is not
    /// interruptible. Does not change the phase.
    pub fn request_cancel(&self) -> bool {
        let mut inner = self.inner.lock();
        if !matches!(inner.phase, Phase::Idle | Phase::Downloading) {
            return false;
        }

        inner.cancel_requested = true;
        true
    }

    /// Whether a cancel is pending.
    pub fn is_cancel_requested(&self) -> bool {
        self.inner.lock().cancel_requested
    }

    /// Current phase.
    pub fn phase(&self) -> Phase {
        self.inner.lock().phase
    }

    /// Copy the current state.
    pub fn snapshot(&self) -> InstallSnapshot {
        let inner = self.inner.lock();
        InstallSnapshot {
            phase: inner.phase,
            progress: if inner.indeterminate {
                Progress::Indeterminate
            } else {
                Progress::Fraction(inner.progress)
            },
            error: inner.error.clone(),
            cancel_requested: inner.cancel_requested,
        }
    }

    /// Return to `Idle` for a fresh run.
    ///
    /// Only the controller calls this, and only once no worker is attached.
    pub(crate) fn reset(&self) {
        *self.inner.lock() = StateInner::default();
    }
}
