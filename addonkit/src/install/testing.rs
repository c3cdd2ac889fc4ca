//! Deterministic collaborators for unit tests.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::addon::{AddonRef, Package};
use crate::catalog::{AddonCatalog, CatalogError, CatalogResult};
use crate::install::{InstallError, InstallResult};
use crate::placement::{PackagePlacement, StagedPackage};
use crate::transport::{ByteStream, Transport, TransportError, TransportResult};

/// One scripted read.
#[derive(Debug, Clone)]
pub enum Step {
    Bytes(Vec<u8>),
    Fail(String),
    /// Sleep before the next step.
    Pause(Duration),
}

/// Transport that replays a fixed script of chunks and errors.
pub struct ScriptedTransport {
    steps: Vec<Step>,
    expected_len: Option<u64>,
    open_error: Option<String>,
    opens: AtomicUsize,
    reads: Arc<AtomicUsize>,
}

impl ScriptedTransport {
    pub fn new(steps: Vec<Step>, expected_len: Option<u64>) -> Self {
        Self {
            steps,
            expected_len,
            open_error: None,
            opens: AtomicUsize::new(0),
            reads: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// `chunks` chunks of `chunk_len` bytes, with the total announced.
    pub fn uniform(chunks: usize, chunk_len: usize) -> Self {
        let steps = (0..chunks).map(|i| Step::Bytes(vec![i as u8; chunk_len])).collect();
        Self::new(steps, Some((chunks * chunk_len) as u64))
    }

    pub fn refusing(reason: &str) -> Self {
        Self {
            open_error: Some(reason.to_string()),
            ..Self::new(Vec::new(), None)
        }
    }

    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    /// Counts `read_chunk` calls as they begin, across every opened stream.
    pub fn read_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.reads)
    }
}

impl Transport for ScriptedTransport {
    fn open_stream(&self, addon: &AddonRef) -> TransportResult<Box<dyn ByteStream>> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        if let Some(reason) = &self.open_error {
            return Err(TransportError::Connect {
                source_url: addon.source.clone(),
                reason: reason.clone(),
            });
        }
        Ok(Box::new(ScriptedStream {
            source: addon.source.clone(),
            steps: self.steps.iter().cloned().collect(),
            expected_len: self.expected_len,
            reads: Arc::clone(&self.reads),
        }))
    }
}

struct ScriptedStream {
    source: String,
    steps: VecDeque<Step>,
    expected_len: Option<u64>,
    reads: Arc<AtomicUsize>,
}

impl ByteStream for ScriptedStream {
    fn expected_len(&self) -> Option<u64> {
        self.expected_len
    }

    fn read_chunk(&mut self, buf: &mut [u8]) -> TransportResult<usize> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        loop {
            match self.steps.pop_front() {
                None => return Ok(0),
                Some(Step::Pause(d)) => std::thread::sleep(d),
                Some(Step::Fail(reason)) => {
                    return Err(TransportError::Read {
                        source_url: self.source.clone(),
                        reason,
                    })
                }
                Some(Step::Bytes(bytes)) => {
                    let n = bytes.len().min(buf.len());
                    buf[..n].copy_from_slice(&bytes[..n]);
                    if n < bytes.len() {
                        self.steps.push_front(Step::Bytes(bytes[n..].to_vec()));
                    }
                    return Ok(n);
                }
            }
        }
    }

    fn abort(&mut self) {
        self.steps.clear();
    }
}

/// Catalog that records registrations in memory.
pub struct RecordingCatalog {
    registered: Mutex<Vec<(String, PathBuf)>>,
    reject: bool,
}

impl RecordingCatalog {
    pub fn new() -> Self {
        Self {
            registered: Mutex::new(Vec::new()),
            reject: false,
        }
    }

    pub fn rejecting() -> Self {
        Self {
            reject: true,
            ..Self::new()
        }
    }

    pub fn registrations(&self) -> Vec<String> {
        self.registered.lock().iter().map(|(id, _)| id.clone()).collect()
    }
}

impl AddonCatalog for RecordingCatalog {
    fn register_installed(&self, addon_id: &str, destination: &Path) -> CatalogResult<()> {
        if self.reject {
            return Err(CatalogError::Rejected("catalog is read-only".to_string()));
        }
        self.registered
            .lock()
            .push((addon_id.to_string(), destination.to_path_buf()));
        Ok(())
    }

    fn is_installed(&self, addon_id: &str) -> bool {
        self.registered.lock().iter().any(|(id, _)| id == addon_id)
    }

    fn installed_path(&self, addon_id: &str) -> Option<PathBuf> {
        self.registered
            .lock()
            .iter()
            .find(|(id, _)| id == addon_id)
            .map(|(_, p)| p.clone())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlacementFailure {
    None,
    Stage,
    Commit,
}

/// Placement that only counts calls.
pub struct FakePlacement {
    failure: PlacementFailure,
    stages: AtomicUsize,
    commits: AtomicUsize,
    finalizations: AtomicUsize,
    rollbacks: AtomicUsize,
    removals: AtomicUsize,
}

impl FakePlacement {
    pub fn new() -> Self {
        Self::failing(PlacementFailure::None)
    }

    pub fn failing(failure: PlacementFailure) -> Self {
        Self {
            failure,
            stages: AtomicUsize::new(0),
            commits: AtomicUsize::new(0),
            finalizations: AtomicUsize::new(0),
            rollbacks: AtomicUsize::new(0),
            removals: AtomicUsize::new(0),
        }
    }

    pub fn stages(&self) -> usize {
        self.stages.load(Ordering::SeqCst)
    }

    pub fn commits(&self) -> usize {
        self.commits.load(Ordering::SeqCst)
    }

    pub fn finalizations(&self) -> usize {
        self.finalizations.load(Ordering::SeqCst)
    }

    pub fn rollbacks(&self) -> usize {
        self.rollbacks.load(Ordering::SeqCst)
    }

    pub fn removals(&self) -> usize {
        self.removals.load(Ordering::SeqCst)
    }
}

impl PackagePlacement for FakePlacement {
    fn stage(&self, package: &Package) -> InstallResult<StagedPackage> {
        self.stages.fetch_add(1, Ordering::SeqCst);
        if self.failure == PlacementFailure::Stage {
            return Err(InstallError::ExtractionFailed {
                addon: package.addon().id.clone(),
                reason: "disk full".to_string(),
            });
        }
        Ok(StagedPackage {
            addon_id: package.addon().id.clone(),
            staging_path: PathBuf::from("/staging").join(&package.addon().id),
            destination: PathBuf::from("/addons").join(&package.addon().destination),
            files: 1,
        })
    }

    fn commit(&self, staged: &StagedPackage) -> InstallResult<PathBuf> {
        self.commits.fetch_add(1, Ordering::SeqCst);
        if self.failure == PlacementFailure::Commit {
            return Err(InstallError::CommitFailed {
                staged: staged.staging_path.clone(),
                destination: staged.destination.clone(),
                reason: "rename refused".to_string(),
            });
        }
        Ok(staged.destination.clone())
    }

    fn finalize(&self, _installed: &Path) {
        self.finalizations.fetch_add(1, Ordering::SeqCst);
    }

    fn rollback(&self, _staged: StagedPackage) {
        self.rollbacks.fetch_add(1, Ordering::SeqCst);
    }

    fn remove(&self, _installed: &Path) -> InstallResult<()> {
        self.removals.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Installer wired to fresh fakes.
pub fn fake_installer() -> (super::Installer, Arc<FakePlacement>, Arc<RecordingCatalog>) {
    let placement = Arc::new(FakePlacement::new());
    let catalog = Arc::new(RecordingCatalog::new());
    let installer = super::Installer::new(placement.clone(), catalog.clone());
    (installer, placement, catalog)
}
