//! Background package download.
//!
//! The downloader runs on the install worker thread. It reads the package in
//! bounded chunks, publishes progress into [`SharedInstallState`] after each
//! chunk, checks the cooperative cancel flag before each read, and hands the
//! finished [`Package`] to the [`Installer`] on the same thread.
//!
//! A cancel request is observed at the next chunk boundary, so the worst-case
//! cancel latency is the time one `read_chunk` call can block (bounded by the
//! transport's request timeout).

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, info, warn};

use super::error::RunError;
use super::installer::Installer;
use super::state::{Progress, SharedInstallState};
use crate::addon::{AddonRef, Package};
use crate::transport::{Transport, TransportError, TransportResult};

/// Default chunk size for reads (64KB).
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// Upper bound on the buffer reserved up front from an announced size.
const MAX_PREALLOC: u64 = 64 * 1024 * 1024;

/// How a worker run ended.
#[derive(Debug)]
pub enum RunOutcome {
    /// Package installed at the given path.
    Installed(PathBuf),
    /// Stopped at the user's request.
    Cancelled,
    /// Download or install failed.
    Failed(RunError),
}

/// Fetches a package and hands it to the installer.
pub struct Downloader {
    transport: Arc<dyn Transport>,
    installer: Installer,
    chunk_size: usize,
}

impl Downloader {
    /// Create a downloader reading `chunk_size` bytes at a time.
    pub fn new(transport: Arc<dyn Transport>, installer: Installer, chunk_size: usize) -> Self {
        Self {
            transport,
            installer,
            chunk_size: chunk_size.max(1),
        }
    }

    /// Bytes requested per read.
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Download and install `addon`, recording every transition in `state`.
    ///
    /// Never panics on expected failures; every path ends in a terminal
    /// phase.
    pub fn run(&self, addon: &AddonRef, state: &SharedInstallState) -> RunOutcome {
        info!(addon = %addon.id, source = %addon.source, "Download started");

        let package = match self.fetch(addon, state) {
            Ok(Some(package)) => package,
            Ok(None) => {
                state.set_cancelled();
                info!(addon = %addon.id, "Download cancelled");
                return RunOutcome::Cancelled;
            }
            Err(e) => {
                warn!(addon = %addon.id, error = %e, "Download failed");
                state.set_failed(e.to_string());
                return RunOutcome::Failed(e.into());
            }
        };

        if !state.set_installing() {
            // Cancel arrived after the last chunk but before the handoff.
            drop(package);
            state.set_cancelled();
            info!(addon = %addon.id, "Download cancelled before install");
            return RunOutcome::Cancelled;
        }

        info!(addon = %addon.id, bytes = package.len(), "Download complete, installing");
        match self.installer.install(package, state) {
            Ok(installed) => RunOutcome::Installed(installed.path),
            Err(e) => RunOutcome::Failed(e.into()),
        }
    }

    /// Read the whole package, or `None` if cancelled.
    ///
    /// The partial buffer is dropped on every early return, so nothing from
    /// a failed or cancelled run outlives this call.
    fn fetch(
        &self,
        addon: &AddonRef,
        state: &SharedInstallState,
    ) -> TransportResult<Option<Package>> {
        if state.is_cancel_requested() {
            return Ok(None);
        }

        // Enter Downloading before opening so an open failure can be recorded.
        state.set_downloading(Progress::Fraction(0.0));
        let mut stream = self.transport.open_stream(addon)?;
        let expected = stream.expected_len().or(addon.expected_size);
        state.set_downloading(Progress::from_bytes(0, expected));

        let capacity = expected.map(|n| n.min(MAX_PREALLOC) as usize).unwrap_or(0);
        let mut data = Vec::with_capacity(capacity);
        let mut buf = vec![0u8; self.chunk_size];
        let mut received = 0u64;

        loop {
            if state.is_cancel_requested() {
                stream.abort();
                debug!(addon = %addon.id, received, "Cancel observed between chunks");
                return Ok(None);
            }

            let read = match stream.read_chunk(&mut buf) {
                Ok(read) => read,
                Err(e) => {
                    stream.abort();
                    return Err(e);
                }
            };
            if read == 0 {
                break;
            }

            data.extend_from_slice(&buf[..read]);
            received += read as u64;
            state.set_downloading(Progress::from_bytes(received, expected));
        }

        check_complete(addon, received, expected)?;
        debug!(addon = %addon.id, received, "Stream finished");

        Ok(Some(Package::new(addon.clone(), data)))
    }
}

/// A stream that ends before its announced length is truncated.
fn check_complete(addon: &AddonRef, received: u64, expected: Option<u64>) -> TransportResult<()> {
    match expected {
        Some(expected) if received < expected => Err(TransportError::Truncated {
            source_url: addon.source.clone(),
            received,
            expected,
        }),
        _ => Ok(()),
    }
}
