//! Scan events, progress coalescing, and the terminal progress display.
//!
//! The scan pipeline never touches shared UI state. Everything it has to
//! say goes out as a [`ScanEvent`] to a caller-supplied [`ScanEventHandler`].
//! Handlers are implemented here for crossbeam channels (the usual way to
//! hand events from the background scan thread to a UI loop) and for
//! [`Progress`], an indicatif display used by the command-line front end.
//!
//! Progress events are coalesced by [`ProgressThrottle`] so a slow consumer
//! is not flooded. `files_scanned` never decreases across events, and the
//! last progress event before a terminal event always carries final totals.

use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crossbeam_channel::Sender;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;

use crate::duplicates::{DuplicateGroup, ScanSummary};

/// Pipeline stage a progress event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanPhase {
    /// Enumerating the tree and bucketing by size
    Walking,
    /// Hashing same-size candidates
    Hashing,
}

/// Snapshot of scan progress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanProgress {
    /// Current stage
    pub phase: ScanPhase,
    /// Files enumerated so far
    pub files_scanned: usize,
    /// Files that need hashing (known once walking ends)
    pub files_to_hash: usize,
    /// Files hashed so far
    pub files_hashed: usize,
    /// Bytes hashed so far
    pub bytes_hashed: u64,
    /// Most recently visited path
    pub current_path: PathBuf,
}

impl ScanProgress {
    /// Empty progress at the start of the walking phase.
    #[must_use]
    pub fn new() -> Self {
        Self {
            phase: ScanPhase::Walking,
            files_scanned: 0,
            files_to_hash: 0,
            files_hashed: 0,
            bytes_hashed: 0,
            current_path: PathBuf::new(),
        }
    }
}

impl Default for ScanProgress {
    fn default() -> Self {
        Self::new()
    }
}

/// Everything a scan reports to its caller.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ScanEvent {
    /// Coalesced progress update
    Progress(ScanProgress),
    /// A duplicate group was finalized
    GroupFound(DuplicateGroup),
    /// The scan ran to the end
    Completed {
        /// All groups found
        groups: Vec<DuplicateGroup>,
        /// Scan statistics
        summary: ScanSummary,
    },
    /// The scan was cancelled; groups finalized before the cancel point
    Cancelled {
        /// Groups finalized before cancellation
        groups: Vec<DuplicateGroup>,
        /// Scan statistics up to the cancel point
        summary: ScanSummary,
    },
    /// The scan could not run
    Failed {
        /// Human-readable cause
        reason: String,
    },
}

impl ScanEvent {
    /// Whether this event ends a scan.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Completed { .. } | Self::Cancelled { .. } | Self::Failed { .. }
        )
    }
}

/// Receiver of scan events.
///
/// Called from the background scan thread. Implementations should return
/// quickly; anything slow belongs on the consumer's side of a channel.
pub trait ScanEventHandler: Send + Sync {
    /// Handle one event.
    fn on_event(&self, event: ScanEvent);
}

impl ScanEventHandler for Sender<ScanEvent> {
    fn on_event(&self, event: ScanEvent) {
        // A dropped receiver means nobody is listening any more
        let _ = self.send(event);
    }
}

/// Handler that discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopHandler;

impl ScanEventHandler for NoopHandler {
    fn on_event(&self, _event: ScanEvent) {}
}

/// Rate limiter for progress events.
#[derive(Debug, Clone)]
pub struct ProgressThrottle {
    interval: Duration,
    last_emit: Option<Instant>,
}

impl ProgressThrottle {
    /// Allow at most one event per `interval`. A zero interval never throttles.
    #[must_use]
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_emit: None,
        }
    }

    /// Returns `true` (and records the time) if an event may go out now.
    pub fn ready(&mut self) -> bool {
        let now = Instant::now();
        let ready = self
            .last_emit
            .is_none_or(|last| now.duration_since(last) >= self.interval);
        if ready {
            self.last_emit = Some(now);
        }
        ready
    }
}

/// Terminal progress display using indicatif.
///
/// Shows a spinner while walking and a bar while hashing.
pub struct Progress {
    bar: Mutex<Option<ProgressBar>>,
    phase: Mutex<Option<ScanPhase>>,
    quiet: bool,
}

impl Progress {
    /// Create a new progress display. Quiet mode draws nothing.
    ///
    /// # Examples
    ///
    /// ```
    /// use dupsweep::progress::Progress;
    ///
    /// let progress = Progress::new(true);
    /// ```
    #[must_use]
    pub fn new(quiet: bool) -> Self {
        Self {
            bar: Mutex::new(None),
            phase: Mutex::new(None),
            quiet,
        }
    }

    fn walking_bar() -> ProgressBar {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::with_template("{spinner:.green} [{elapsed_precise}] {pos} files {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ "),
        );
        pb.enable_steady_tick(Duration::from_millis(100));
        pb
    }

    fn hashing_bar(total: usize) -> ProgressBar {
        let pb = ProgressBar::new(total as u64);
        pb.set_style(
            ProgressStyle::with_template(
                "[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg} (ETA: {eta})",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█>-"),
        );
        pb
    }

    fn update(&self, progress: &ScanProgress) {
        let (Ok(mut bar), Ok(mut phase)) = (self.bar.lock(), self.phase.lock()) else {
            return;
        };

        if *phase != Some(progress.phase) {
            if let Some(old) = bar.take() {
                old.finish_and_clear();
            }
            *bar = Some(match progress.phase {
                ScanPhase::Walking => Self::walking_bar(),
                ScanPhase::Hashing => Self::hashing_bar(progress.files_to_hash),
            });
            *phase = Some(progress.phase);
        }

        if let Some(pb) = bar.as_ref() {
            let position = match progress.phase {
                ScanPhase::Walking => progress.files_scanned,
                ScanPhase::Hashing => progress.files_hashed,
            };
            pb.set_position(position as u64);
            pb.set_message(truncate_path(&progress.current_path, 40));
        }
    }

    fn finish(&self) {
        if let Ok(mut bar) = self.bar.lock() {
            if let Some(pb) = bar.take() {
                pb.finish_and_clear();
            }
        }
    }
}

impl ScanEventHandler for Progress {
    fn on_event(&self, event: ScanEvent) {
        if self.quiet {
            return;
        }

        match event {
            ScanEvent::Progress(progress) => self.update(&progress),
            ScanEvent::GroupFound(group) => {
                log::debug!(
                    "Duplicate group: {} files of {} bytes",
                    group.len(),
                    group.size
                );
            }
            ScanEvent::Completed { .. } | ScanEvent::Cancelled { .. } | ScanEvent::Failed { .. } => {
                self.finish();
            }
        }
    }
}

/// Truncate a path for display in the progress bar.
fn truncate_path(path: &Path, max_len: usize) -> String {
    let text = path.to_string_lossy();
    if text.chars().count() <= max_len {
        return text.into_owned();
    }

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let count = file_name.chars().count();
    if count + 4 > max_len {
        let tail: String = file_name.chars().skip(count + 3 - max_len).collect();
        return format!("...{}", tail);
    }

    format!(".../{}", file_name)
}
