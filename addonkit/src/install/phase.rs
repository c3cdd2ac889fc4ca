//! Install lifecycle phases.

use std::fmt;

/// Stage of a single add-on install run.
///
/// ```text
/// Idle ──► Downloading ──► Installing ──► Done
///   │           │               │
///   │           ├──► Failed ◄───┘
///   └───────────┴──► Cancelled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Phase {
    /// Nothing started yet.
    #[default]
    Idle,
    /// Package bytes are being fetched.
    Downloading,
    /// Package is being validated and placed.
    Installing,
    /// Add-on installed and registered.
    Done,
    /// Run ended with an error.
    Failed,
    /// Run stopped at the user's request.
    Cancelled,
}

impl Phase {
    /// True for phases that end a run.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed | Self::Cancelled)
    }

    /// True while a worker may still be mutating state.
    pub fn is_active(self) -> bool {
        matches!(self, Self::Downloading | Self::Installing)
    }

    /// Whether a new run may be started from this phase.
    pub fn can_start(self) -> bool {
        self == Self::Idle || self.is_terminal()
    }

    /// Human-readable name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::Downloading => "Downloading",
            Self::Installing => "Installing",
            Self::Done => "Done",
            Self::Failed => "Failed",
            Self::Cancelled => "Cancelled",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_idle() {
        assert_eq!(Phase::default(), Phase::Idle);
    }

    #[test]
    fn test_terminal_phases() {
        assert!(Phase::Done.is_terminal());
        assert!(Phase::Failed.is_terminal());
        assert!(Phase::Cancelled.is_terminal());
        assert!(!Phase::Idle.is_terminal());
        assert!(!Phase::Downloading.is_terminal());
        assert!(!Phase::Installing.is_terminal());
    }

    #[test]
    fn test_can_start() {
        assert!(Phase::Idle.can_start());
        assert!(Phase::Done.can_start());
        assert!(Phase::Failed.can_start());
        assert!(Phase::Cancelled.can_start());
        assert!(!Phase::Downloading.can_start());
        assert!(!Phase::Installing.can_start());
    }

    #[test]
    fn test_display() {
        assert_eq!(Phase::Installing.to_string(), "Installing");
    }
}
