//! Add-on install lifecycle.
//!
//! One [`InstallController`] per add-on dialog. The controller spawns a
//! worker that runs the [`Downloader`] and then the [`Installer`]; both
//! report only through [`SharedInstallState`], which the foreground loop
//! reads once per frame via [`InstallController::poll`].

mod controller;
mod downloader;
mod error;
mod installer;
mod phase;
mod snapshot;
mod state;

#[cfg(test)]
pub(crate) mod testing;

pub use controller::{Collaborators, InstallController, Teardown};
pub use downloader::{Downloader, RunOutcome, DEFAULT_CHUNK_SIZE};
pub use error::{ControllerError, InstallError, InstallResult, RunError};
pub use installer::{InstalledAddon, Installer};
pub use phase::Phase;
pub use snapshot::UiSnapshot;
pub use state::{InstallSnapshot, Progress, SharedInstallState};
