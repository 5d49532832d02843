/// Running an organize operation off the calling thread.
///
/// [`spawn_organize`] starts the run on a named worker thread and returns an
/// [`OrganizeHandle`]. The worker sends exactly one message when it is done,
/// carrying the final [`OrganizeResult`] or the error that prevented the run.
/// There is no progress stream and no cancellation.
///
/// Only one run per directory may be in flight inside the process; a second
/// request for the same directory is refused with
/// [`OrganizeError::AlreadyRunning`].
use crate::category_rules::CategoryRules;
use crate::organizer::{OrganizeEngine, OrganizeError, OrganizeResult};
use crossbeam_channel::{Receiver, RecvTimeoutError, TryRecvError};
use log::{debug, info};
use parking_lot::{Mutex, const_mutex};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

/// Directories with a run in flight, canonicalized.
static IN_FLIGHT: Mutex<BTreeSet<PathBuf>> = const_mutex(BTreeSet::new());

/// Holds a directory's slot in [`IN_FLIGHT`] until dropped.
struct RunGuard {
    directory: PathBuf,
}

impl RunGuard {
    fn acquire(directory: PathBuf) -> Result<Self, OrganizeError> {
        let mut in_flight = IN_FLIGHT.lock();
        if !in_flight.insert(directory.clone()) {
            return Err(OrganizeError::AlreadyRunning(directory));
        }
        Ok(Self { directory })
    }
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        IN_FLIGHT.lock().remove(&self.directory);
    }
}

/// Outcome delivered by the worker.
pub type RunOutcome = Result<OrganizeResult, OrganizeError>;

/// Handle to a running or completed background run.
pub struct OrganizeHandle {
    result_rx: Receiver<RunOutcome>,
    thread: thread::JoinHandle<()>,
}

impl OrganizeHandle {
    /// Blocks until the run completes and the worker thread has exited.
    ///
    /// A worker that panicked is reported as [`OrganizeError::Worker`].
    pub fn wait(self) -> RunOutcome {
        let outcome = self
            .result_rx
            .recv()
            .unwrap_or_else(|_| Err(worker_lost()));
        if self.thread.join().is_err() {
            return Err(OrganizeError::Worker("worker thread panicked".to_string()));
        }
        outcome
    }

    /// Returns the outcome if the run has completed, without blocking.
    ///
    /// The outcome is delivered once; later calls report a lost worker.
    pub fn try_result(&self) -> Option<RunOutcome> {
        match self.result_rx.try_recv() {
            Ok(outcome) => Some(outcome),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Err(worker_lost())),
        }
    }

    /// Waits up to `timeout` for the outcome.
    pub fn wait_timeout(&self, timeout: Duration) -> Option<RunOutcome> {
        match self.result_rx.recv_timeout(timeout) {
            Ok(outcome) => Some(outcome),
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => Some(Err(worker_lost())),
        }
    }
}

fn worker_lost() -> OrganizeError {
    OrganizeError::Worker("stopped without reporting a result".to_string())
}

/// Starts organizing `directory` on a background thread.
///
/// `excluded_paths` are files the run must never move (see
/// [`OrganizeEngine::exclude_path`]).
///
/// # Errors
///
/// Fails immediately, without starting a thread, when the directory does
/// not exist, when a run on the same directory is already in flight, or when
/// the worker thread cannot be spawned.
pub fn spawn_organize(
    directory: &Path,
    rules: CategoryRules,
    excluded_paths: Vec<PathBuf>,
) -> Result<OrganizeHandle, OrganizeError> {
    let canonical = fs::canonicalize(directory).map_err(|e| OrganizeError::InvalidPath {
        path: directory.to_path_buf(),
        reason: e.to_string(),
    })?;

    let guard = RunGuard::acquire(canonical.clone())?;
    let (result_tx, result_rx) = crossbeam_channel::bounded::<RunOutcome>(1);
    let worker_dir = canonical;

    let thread = thread::Builder::new()
        .name("dirsort-organizer".into())
        .spawn(move || {
            info!("Background run started for {}", worker_dir.display());
            let outcome = {
                let _guard = guard;
                let engine = excluded_paths
                    .iter()
                    .fold(OrganizeEngine::new(&rules), |engine, path| {
                        engine.exclude_path(path)
                    });
                engine.organize(&worker_dir)
            };
            // The receiver may already be gone; nothing left to report to.
            if result_tx.send(outcome).is_err() {
                debug!("Result for {} was not collected", worker_dir.display());
            }
        })
        .map_err(|e| OrganizeError::Worker(e.to_string()))?;

    Ok(OrganizeHandle { result_rx, thread })
}
