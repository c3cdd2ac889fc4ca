//! Per-dialog install coordinator.
//!
//! The controller owns at most one background worker. The foreground loop
//! drives it with [`InstallController::start`], [`InstallController::poll`]
//! once per frame, and [`InstallController::cancel`]. None of these block on
//! the worker.
//!
//! ```text
//! foreground                          worker thread
//! ──────────                          ─────────────
//! start() ── spawn ─────────────────► Downloader::run
//! poll()  ◄── snapshot ── SharedInstallState ◄── set_* calls
//! cancel() ── request_cancel ───────► observed between chunks
//! shutdown() ◄── finish signal ────── (on return or unwind)
//! ```
//!
//! Teardown waits at most `teardown_timeout` for the worker. A worker that
//! does not finish in time is detached; it holds its own `Arc`s, so the
//! state it writes outlives the controller.

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, info, warn};

use super::downloader::Downloader;
use super::error::ControllerError;
use super::installer::Installer;
use super::phase::Phase;
use super::snapshot::UiSnapshot;
use super::state::{Progress, SharedInstallState};
use crate::addon::AddonRef;
use crate::catalog::AddonCatalog;
use crate::config::InstallerConfig;
use crate::placement::PackagePlacement;
use crate::transport::Transport;

/// Failure text recorded when the worker unwinds.
const WORKER_PANICKED: &str = "install worker panicked";

/// External services a controller works through.
#[derive(Clone)]
pub struct Collaborators {
    pub transport: Arc<dyn Transport>,
    pub catalog: Arc<dyn AddonCatalog>,
    pub placement: Arc<dyn PackagePlacement>,
}

/// How [`InstallController::shutdown`] left the worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Teardown {
    /// No worker was attached.
    Idle,
    /// The worker finished and was joined.
    Joined,
    /// The worker did not finish in time and was left running.
    Detached,
}

/// Sends on drop, so the controller hears about both normal returns and
/// panics.
struct FinishSignal(Sender<()>);

impl Drop for FinishSignal {
    fn drop(&mut self) {
        let _ = self.0.send(());
    }
}

struct Worker {
    handle: JoinHandle<()>,
    finished: Receiver<()>,
}

/// Drives one add-on through download and install.
pub struct InstallController {
    addon: AddonRef,
    state: Arc<SharedInstallState>,
    downloader: Arc<Downloader>,
    already_installed: bool,
    worker: Option<Worker>,
    teardown_timeout: Duration,
}

impl InstallController {
    /// Create a controller for `addon`. Nothing starts until [`start`].
    ///
    /// [`start`]: Self::start
    pub fn new(addon: AddonRef, collaborators: Collaborators, config: &InstallerConfig) -> Self {
        let already_installed = collaborators.catalog.is_installed(&addon.id);
        let installer = Installer::new(collaborators.placement, collaborators.catalog)
            .with_verify_checksums(config.verify_checksums);
        let downloader = Downloader::new(collaborators.transport, installer, config.chunk_size);

        Self {
            addon,
            state: Arc::new(SharedInstallState::new()),
            downloader: Arc::new(downloader),
            already_installed,
            worker: None,
            teardown_timeout: config.teardown_timeout,
        }
    }

    /// The add-on this controller installs.
    pub fn addon(&self) -> &AddonRef {
        &self.addon
    }

    /// Shared state, for observers outside the frame loop.
    pub fn state(&self) -> Arc<SharedInstallState> {
        Arc::clone(&self.state)
    }

    /// Whether a worker is attached.
    pub fn is_running(&self) -> bool {
        self.worker.is_some()
    }

    /// Begin a fresh download and install on a background thread.
    ///
    /// Valid from `Idle` or any terminal phase.
    pub fn start(&mut self) -> Result<(), ControllerError> {
        self.reap_finished();

        if !self.state.phase().can_start() {
            return Err(ControllerError::AlreadyRunning(self.addon.id.clone()));
        }

        // Terminal phase reached; the previous worker is only returning.
        if let Some(worker) = self.worker.take() {
            self.join(worker);
        }

        self.state.reset();
        self.state.set_downloading(Progress::Fraction(0.0));

        let state = Arc::clone(&self.state);
        let downloader = Arc::clone(&self.downloader);
        let addon = self.addon.clone();
        let (tx, rx) = mpsc::channel();

        let spawned = thread::Builder::new()
            .name(format!("addonkit-install-{}", self.addon.id))
            .spawn(move || {
                let _signal = FinishSignal(tx);
                let outcome = downloader.run(&addon, &state);
                debug!(addon = %addon.id, ?outcome, "Install worker finished");
            });

        match spawned {
            Ok(handle) => {
                info!(addon = %self.addon.id, "Install started");
                self.worker = Some(Worker {
                    handle,
                    finished: rx,
                });
                Ok(())
            }
            Err(e) => {
                let err = ControllerError::Spawn(e.to_string());
                self.state.set_failed(err.to_string());
                Err(err)
            }
        }
    }

    /// Read the state for this frame. Never blocks on the worker.
    pub fn poll(&mut self) -> UiSnapshot {
        self.reap_finished();

        let snapshot = self.state.snapshot();
        if snapshot.phase == Phase::Done {
            self.already_installed = true;
        }
        UiSnapshot::from_state(&self.addon, &snapshot, self.already_installed)
    }

    /// Ask the worker to stop. Only honored while downloading.
    pub fn cancel(&self) -> bool {
        if self.state.phase() != Phase::Downloading {
            return false;
        }

        let accepted = self.state.request_cancel();
        if accepted {
            info!(addon = %self.addon.id, "Cancel requested");
        }
        accepted
    }

    /// Cancel any run and wait a bounded time for the worker.
    pub fn shutdown(&mut self) -> Teardown {
        let Some(worker) = self.worker.take() else {
            return Teardown::Idle;
        };

        self.state.request_cancel();

        match worker.finished.recv_timeout(self.teardown_timeout) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                self.join(worker);
                Teardown::Joined
            }
            Err(RecvTimeoutError::Timeout) => {
                warn!(
                    addon = %self.addon.id,
                    phase = %self.state.phase(),
                    timeout_ms = self.teardown_timeout.as_millis() as u64,
                    "Install worker did not stop in time, detaching"
                );
                Teardown::Detached
            }
        }
    }

    fn reap_finished(&mut self) {
        if self
            .worker
            .as_ref()
            .is_some_and(|worker| worker.handle.is_finished())
        {
            if let Some(worker) = self.worker.take() {
                self.join(worker);
            }
        }
    }

    fn join(&self, worker: Worker) {
        if worker.handle.join().is_err() {
            warn!(addon = %self.addon.id, "Install worker panicked");
            self.state.set_failed(WORKER_PANICKED);
        }
    }
}

impl Drop for InstallController {
    fn drop(&mut self) {
        self.shutdown();
    }
}
