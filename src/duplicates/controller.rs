//! Background scan controller.
//!
//! [`ScanController`] runs a [`DuplicateFinder`] on its own thread and
//! tracks it with a small state machine:
//!
//! ```text
//! Idle ──start──▶ Running ──▶ Completed
//!   │                │    └──▶ Cancelled   (cancel() was honored)
//!   │                └───────▶ Failed      (root vanished mid-start, thread panic)
//!   └──start(invalid root)──▶ Failed
//! ```
//!
//! Any terminal state can be restarted. The state is updated before the
//! terminal event is sent, so a handler reacting to `Completed` already
//! observes [`ScanState::Completed`].
//!
//! # Example
//!
//! ```no_run
//! use dupsweep::duplicates::{FinderConfig, ScanController};
//! use dupsweep::progress::ScanEvent;
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! let (tx, rx) = crossbeam_channel::unbounded::<ScanEvent>();
//! let mut controller = ScanController::new(FinderConfig::default());
//! controller.start(Path::new("."), Arc::new(tx)).unwrap();
//!
//! for event in rx.iter() {
//!     if let ScanEvent::Completed { groups, .. } = &event {
//!         println!("{} groups", groups.len());
//!     }
//!     if event.is_terminal() {
//!         break;
//!     }
//! }
//! let report = controller.wait();
//! ```

use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;

use serde::Serialize;

use super::finder::{DuplicateFinder, FinderConfig, ScanSummary};
use super::groups::DuplicateGroup;
use crate::progress::{ScanEvent, ScanEventHandler};
use crate::scanner::{ScanError, Walker};

/// Lifecycle of a scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanState {
    /// Nothing started yet
    Idle,
    /// Pipeline thread is working
    Running,
    /// Ran to the end
    Completed,
    /// Stopped early on request
    Cancelled,
    /// Could not run
    Failed,
}

impl ScanState {
    /// Whether the scan has ended.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled | Self::Failed)
    }
}

/// Final result of a background scan.
#[derive(Debug, Clone, Serialize)]
pub struct ScanReport {
    /// Terminal state reached
    pub state: ScanState,
    /// Groups found (complete buckets only when cancelled)
    pub groups: Vec<DuplicateGroup>,
    /// Scan statistics
    pub summary: ScanSummary,
    /// Failure cause when `state` is `Failed`
    pub error: Option<String>,
}

impl ScanReport {
    fn failed(reason: String) -> Self {
        Self {
            state: ScanState::Failed,
            groups: Vec::new(),
            summary: ScanSummary::default(),
            error: Some(reason),
        }
    }
}

/// Errors returned by [`ScanController::start`].
#[derive(thiserror::Error, Debug)]
pub enum ControllerError {
    /// A scan is already running.
    #[error("a scan is already running")]
    AlreadyRunning,

    /// The root cannot be scanned.
    #[error("invalid scan root: {0}")]
    Validation(#[source] ScanError),

    /// The background thread could not be created.
    #[error("failed to spawn scan thread: {0}")]
    Spawn(#[source] io::Error),
}

/// Runs scans on a background thread.
pub struct ScanController {
    config: FinderConfig,
    state: Arc<Mutex<ScanState>>,
    cancel_flag: Arc<AtomicBool>,
    handle: Option<JoinHandle<ScanReport>>,
}

impl ScanController {
    /// Create an idle controller.
    #[must_use]
    pub fn new(config: FinderConfig) -> Self {
        Self {
            config,
            state: Arc::new(Mutex::new(ScanState::Idle)),
            cancel_flag: Arc::new(AtomicBool::new(false)),
            handle: None,
        }
    }

    /// Start scanning `root`, sending events to `handler`.
    ///
    /// # Errors
    ///
    /// - [`ControllerError::AlreadyRunning`] while a scan is running
    /// - [`ControllerError::Validation`] if the root is not a readable
    ///   directory; the state becomes `Failed` and a `Failed` event is sent
    /// - [`ControllerError::Spawn`] if the thread cannot be created
    pub fn start(
        &mut self,
        root: &Path,
        handler: Arc<dyn ScanEventHandler>,
    ) -> Result<(), ControllerError> {
        if self.is_running() {
            return Err(ControllerError::AlreadyRunning);
        }

        // Reap a finished previous run
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }

        if let Err(e) = Walker::validate_root(root) {
            log::error!("Cannot scan {}: {}", root.display(), e);
            set_state(&self.state, ScanState::Failed);
            handler.on_event(ScanEvent::Failed {
                reason: e.to_string(),
            });
            return Err(ControllerError::Validation(e));
        }

        self.cancel_flag = Arc::new(AtomicBool::new(false));
        let config = self
            .config
            .clone()
            .with_shutdown_flag(Arc::clone(&self.cancel_flag));
        let state = Arc::clone(&self.state);
        let cancel_flag = Arc::clone(&self.cancel_flag);
        let root = root.to_path_buf();

        set_state(&self.state, ScanState::Running);

        let spawned = std::thread::Builder::new()
            .name("dupsweep-scan".to_string())
            .spawn(move || run_scan(&root, config, &cancel_flag, &state, handler.as_ref()));

        match spawned {
            Ok(handle) => {
                self.handle = Some(handle);
                Ok(())
            }
            Err(e) => {
                set_state(&self.state, ScanState::Failed);
                Err(ControllerError::Spawn(e))
            }
        }
    }

    /// Request cancellation. Returns immediately; the scan stops at the
    /// next file boundary.
    ///
    /// A cancel that lands while the state is `Running` always ends the
    /// run as `Cancelled`, even past the pipeline's last checkpoint.
    pub fn cancel(&self) {
        // Held across the store so the scan thread's terminal transition
        // sees either the flag or a state that is no longer Running.
        let guard = lock_state(&self.state);
        if *guard == ScanState::Running {
            log::info!("Scan cancellation requested");
        }
        self.cancel_flag.store(true, Ordering::SeqCst);
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> ScanState {
        *lock_state(&self.state)
    }

    /// Whether a scan is in progress.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.state() == ScanState::Running
    }

    /// Block until the running scan ends and return its report.
    ///
    /// Returns `None` if no scan was started since the last `wait`.
    pub fn wait(&mut self) -> Option<ScanReport> {
        let handle = self.handle.take()?;
        match handle.join() {
            Ok(report) => Some(report),
            Err(_) => {
                log::error!("Scan thread panicked");
                set_state(&self.state, ScanState::Failed);
                Some(ScanReport::failed("scan thread panicked".to_string()))
            }
        }
    }
}

impl Drop for ScanController {
    fn drop(&mut self) {
        self.cancel_flag.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl std::fmt::Debug for ScanController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScanController")
            .field("config", &self.config)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

fn lock_state(state: &Mutex<ScanState>) -> MutexGuard<'_, ScanState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

fn set_state(state: &Mutex<ScanState>, next: ScanState) {
    *lock_state(state) = next;
}

/// Settle a finished run as `Cancelled` or `Completed`.
fn finish_state(
    state: &Mutex<ScanState>,
    cancel_flag: &AtomicBool,
    interrupted: bool,
) -> ScanState {
    let mut guard = lock_state(state);
    let next = if interrupted || cancel_flag.load(Ordering::SeqCst) {
        ScanState::Cancelled
    } else {
        ScanState::Completed
    };
    *guard = next;
    next
}

/// Pipeline thread body.
///
/// A panic anywhere in the pipeline, handler callbacks included, ends the
/// run as `Failed` with a `Failed` event rather than unwinding the thread.
fn run_scan(
    root: &Path,
    config: FinderConfig,
    cancel_flag: &AtomicBool,
    state: &Mutex<ScanState>,
    handler: &dyn ScanEventHandler,
) -> ScanReport {
    let finder = DuplicateFinder::new(config);

    let result = panic::catch_unwind(AssertUnwindSafe(|| {
        finder.find_duplicates_with_events(root, handler)
    }));

    match result {
        Ok(Ok((groups, mut summary))) => {
            let next = finish_state(state, cancel_flag, summary.interrupted);
            summary.interrupted = next == ScanState::Cancelled;

            let event = if next == ScanState::Cancelled {
                ScanEvent::Cancelled {
                    groups: groups.clone(),
                    summary: summary.clone(),
                }
            } else {
                ScanEvent::Completed {
                    groups: groups.clone(),
                    summary: summary.clone(),
                }
            };
            if panic::catch_unwind(AssertUnwindSafe(|| handler.on_event(event))).is_err() {
                log::error!("Scan event handler panicked on the terminal event");
            }

            ScanReport {
                state: next,
                groups,
                summary,
                error: None,
            }
        }
        Ok(Err(e)) => {
            let reason = e.to_string();
            log::error!("Scan of {} failed: {}", root.display(), reason);
            fail(state, handler, reason)
        }
        Err(_) => {
            log::error!("Scan of {} panicked", root.display());
            fail(state, handler, "scan thread panicked".to_string())
        }
    }
}

fn fail(state: &Mutex<ScanState>, handler: &dyn ScanEventHandler, reason: String) -> ScanReport {
    set_state(state, ScanState::Failed);
    let event = ScanEvent::Failed {
        reason: reason.clone(),
    };
    if panic::catch_unwind(AssertUnwindSafe(|| handler.on_event(event))).is_err() {
        log::error!("Scan event handler panicked on the failure event");
    }
    ScanReport::failed(reason)
}
