//! Duplicate finder pipeline.
//!
//! # Overview
//!
//! [`DuplicateFinder`] runs the detection pipeline on the calling thread:
//!
//! 1. **Walk**: stream [`FileRecord`]s from the [`Walker`] into the
//!    [`GroupingIndex`] size buckets. Per-entry failures are counted as
//!    skipped entries.
//! 2. **Size filter**: keep only size buckets with 2+ files.
//! 3. **Hash**: hash every member of each surviving bucket, bucket by
//!    bucket. With `io_threads > 1` a bucket is hashed in batches on a
//!    bounded rayon pool; results are collected in input order and inserted
//!    by this thread alone, so keep selection always follows traversal order.
//! 4. **Group**: once a size bucket is fully hashed, its duplicate groups are
//!    finalized and reported with [`ScanEvent::GroupFound`].
//!
//! Cancellation is cooperative. The stop flag is checked between files and
//! never interrupts a file that is being hashed. A size bucket that was only
//! partly hashed when the flag was seen is discarded, so a cancelled run only
//! ever returns groups that a full run would also contain.
//!
//! Use [`crate::duplicates::ScanController`] to run this pipeline on a
//! background thread with a state machine around it.
//!
//! # Example
//!
//! ```no_run
//! use dupsweep::duplicates::{DuplicateFinder, FinderConfig};
//! use std::path::Path;
//!
//! let finder = DuplicateFinder::new(FinderConfig::default().with_io_threads(4));
//! let (groups, summary) = finder.find_duplicates(Path::new(".")).unwrap();
//!
//! println!("Found {} duplicate groups", groups.len());
//! println!("Reclaimable space: {}", summary.reclaimable_display());
//! ```

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytesize::ByteSize;
use rayon::prelude::*;
use serde::Serialize;

use super::groups::{DuplicateGroup, GroupingIndex, SizeBucket};
use crate::progress::{
    NoopHandler, ProgressThrottle, ScanEvent, ScanEventHandler, ScanPhase, ScanProgress,
};
use crate::scanner::{FileRecord, Hash, HashError, ScanError, Walker, WalkerConfig};
use crate::scanner::{Hasher, DEFAULT_CHUNK_SIZE};

/// Default minimum time between two progress events.
pub const DEFAULT_PROGRESS_INTERVAL: Duration = Duration::from_millis(100);

/// Configuration for the duplicate finder.
#[derive(Clone)]
pub struct FinderConfig {
    /// Walker configuration (hidden files, symlinks, size filters).
    pub walker_config: WalkerConfig,
    /// Number of hashing threads. 1 hashes on the pipeline thread.
    pub io_threads: usize,
    /// Read chunk size for hashing.
    pub chunk_size: usize,
    /// Minimum time between two progress events.
    pub progress_interval: Duration,
    /// Optional cooperative stop flag.
    pub shutdown_flag: Option<Arc<AtomicBool>>,
}

impl std::fmt::Debug for FinderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FinderConfig")
            .field("walker_config", &self.walker_config)
            .field("io_threads", &self.io_threads)
            .field("chunk_size", &self.chunk_size)
            .field("progress_interval", &self.progress_interval)
            .field("shutdown_flag", &self.shutdown_flag.is_some())
            .finish()
    }
}

impl Default for FinderConfig {
    fn default() -> Self {
        Self {
            walker_config: WalkerConfig::default(),
            io_threads: 4,
            chunk_size: DEFAULT_CHUNK_SIZE,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
            shutdown_flag: None,
        }
    }
}

impl FinderConfig {
    /// Set the number of hashing threads (at least 1).
    #[must_use]
    pub fn with_io_threads(mut self, threads: usize) -> Self {
        self.io_threads = threads.max(1);
        self
    }

    /// Set the walker configuration.
    #[must_use]
    pub fn with_walker_config(mut self, config: WalkerConfig) -> Self {
        self.walker_config = config;
        self
    }

    /// Set the hashing chunk size (at least 1 byte).
    #[must_use]
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Set the progress event interval.
    #[must_use]
    pub fn with_progress_interval(mut self, interval: Duration) -> Self {
        self.progress_interval = interval;
        self
    }

    /// Set the cooperative stop flag.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }
}

/// Why a file did not make it into the result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    /// Enumeration could not read the entry
    Skipped,
    /// Hashing failed part way
    HashFailed,
}

/// A non-fatal problem met during a scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanIssue {
    /// Affected path
    pub path: PathBuf,
    /// Skip or read failure
    pub kind: IssueKind,
    /// Error text
    pub message: String,
}

impl ScanIssue {
    fn skipped(error: &ScanError) -> Self {
        Self {
            path: error.path().to_path_buf(),
            kind: IssueKind::Skipped,
            message: error.to_string(),
        }
    }

    fn hash_failed(path: &Path, error: &HashError) -> Self {
        Self {
            path: path.to_path_buf(),
            kind: IssueKind::HashFailed,
            message: error.to_string(),
        }
    }
}

/// Summary statistics from a duplicate scan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScanSummary {
    /// Regular files enumerated
    pub total_files: usize,
    /// Total size of enumerated files in bytes
    pub total_size: u64,
    /// Entries that could not be read during enumeration
    pub skipped_entries: usize,
    /// Files eliminated because their size was unique
    pub eliminated_by_size: usize,
    /// Files successfully hashed
    pub files_hashed: usize,
    /// Bytes hashed
    pub bytes_hashed: u64,
    /// Files excluded because hashing failed
    pub hash_failures: usize,
    /// Number of confirmed duplicate groups
    pub duplicate_groups: usize,
    /// Total number of duplicate files (excluding the kept copy)
    pub duplicate_files: usize,
    /// Space that would be reclaimed by removing all duplicates
    pub reclaimable_space: u64,
    /// Wall-clock duration of the scan
    pub scan_duration: Duration,
    /// Whether the scan stopped early on request
    pub interrupted: bool,
    /// Skipped entries and failed reads, in the order met
    pub issues: Vec<ScanIssue>,
}

impl ScanSummary {
    /// Whether any file was skipped or failed to hash.
    #[must_use]
    pub fn has_issues(&self) -> bool {
        self.skipped_entries > 0 || self.hash_failures > 0
    }

    /// Percentage of scanned bytes that is duplicated.
    #[must_use]
    pub fn wasted_percentage(&self) -> f64 {
        if self.total_size == 0 {
            0.0
        } else {
            (self.reclaimable_space as f64 / self.total_size as f64) * 100.0
        }
    }

    /// Format reclaimable space as human-readable string.
    #[must_use]
    pub fn reclaimable_display(&self) -> String {
        ByteSize::b(self.reclaimable_space).to_string()
    }

    /// Format total size as human-readable string.
    #[must_use]
    pub fn total_size_display(&self) -> String {
        ByteSize::b(self.total_size).to_string()
    }

    fn record_groups(&mut self, groups: &[DuplicateGroup]) {
        self.duplicate_groups = groups.len();
        self.duplicate_files = groups.iter().map(DuplicateGroup::duplicate_count).sum();
        self.reclaimable_space = groups.iter().map(DuplicateGroup::wasted_space).sum();
    }
}

/// Errors that stop a scan before it produces any result.
#[derive(thiserror::Error, Debug)]
pub enum FinderError {
    /// The root cannot be scanned.
    #[error("invalid scan root: {0}")]
    InvalidRoot(#[source] ScanError),
}

/// Outcome of hashing one file in a batch.
enum HashAttempt {
    Hashed(Hash),
    Failed(HashError),
    /// Not attempted because a stop was requested
    Skipped,
}

/// Duplicate finder that runs the detection pipeline.
pub struct DuplicateFinder {
    config: FinderConfig,
    hasher: Hasher,
}

impl DuplicateFinder {
    /// Create a new duplicate finder with the given configuration.
    #[must_use]
    pub fn new(config: FinderConfig) -> Self {
        let hasher = Hasher::with_chunk_size(config.chunk_size);
        Self { config, hasher }
    }

    /// Create a new duplicate finder with default configuration.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(FinderConfig::default())
    }

    /// Configuration in use.
    #[must_use]
    pub fn config(&self) -> &FinderConfig {
        &self.config
    }

    /// Find all duplicate files under `path`, without event reporting.
    ///
    /// # Errors
    ///
    /// Returns [`FinderError::InvalidRoot`] if the root is missing, not a
    /// directory, or unreadable.
    pub fn find_duplicates(
        &self,
        path: &Path,
    ) -> Result<(Vec<DuplicateGroup>, ScanSummary), FinderError> {
        self.find_duplicates_with_events(path, &NoopHandler)
    }

    /// Find all duplicate files under `path`, reporting progress and each
    /// finalized group to `handler`.
    ///
    /// Terminal events are not sent from here; the caller decides between
    /// completed and cancelled from [`ScanSummary::interrupted`].
    ///
    /// # Errors
    ///
    /// Returns [`FinderError::InvalidRoot`] if the root is missing, not a
    /// directory, or unreadable.
    pub fn find_duplicates_with_events(
        &self,
        path: &Path,
        handler: &dyn ScanEventHandler,
    ) -> Result<(Vec<DuplicateGroup>, ScanSummary), FinderError> {
        let start_time = std::time::Instant::now();
        let mut summary = ScanSummary::default();
        let mut progress = ScanProgress::new();
        let mut throttle = ProgressThrottle::new(self.config.progress_interval);

        let mut walker = Walker::new(path, self.config.walker_config.clone());
        if let Some(ref flag) = self.config.shutdown_flag {
            walker = walker.with_shutdown_flag(Arc::clone(flag));
        }

        log::info!("Starting duplicate scan of {}", path.display());

        let mut index = GroupingIndex::new();
        for result in walker.walk().map_err(FinderError::InvalidRoot)? {
            match result {
                Ok(file) => {
                    progress.files_scanned += 1;
                    if throttle.ready() {
                        progress.current_path.clone_from(&file.path);
                        handler.on_event(ScanEvent::Progress(progress.clone()));
                    }
                    index.insert_sized(file);
                }
                Err(e) => {
                    summary.skipped_entries += 1;
                    summary.issues.push(ScanIssue::skipped(&e));
                }
            }
        }

        summary.total_files = index.files_seen();
        summary.total_size = index.stats().total_size;

        log::info!(
            "Found {} files ({}), {} skipped",
            summary.total_files,
            summary.total_size_display(),
            summary.skipped_entries
        );

        let mut groups = Vec::new();

        if self.config.is_shutdown_requested() {
            log::info!("Scan cancelled during enumeration");
            summary.interrupted = true;
        } else {
            let buckets = index.take_size_buckets();
            summary.eliminated_by_size = index.stats().eliminated_unique;

            progress.phase = ScanPhase::Hashing;
            progress.files_to_hash = buckets.iter().map(SizeBucket::len).sum();
            handler.on_event(ScanEvent::Progress(progress.clone()));

            self.hash_buckets(
                buckets,
                &mut index,
                &mut groups,
                &mut summary,
                &mut progress,
                &mut throttle,
                handler,
            );
        }

        // Final totals always go out, whatever the throttle says
        handler.on_event(ScanEvent::Progress(progress));

        // Stop requested after the last checkpoint: groups are complete
        // but the run still counts as interrupted.
        if self.config.is_shutdown_requested() {
            summary.interrupted = true;
        }

        summary.record_groups(&groups);
        summary.scan_duration = start_time.elapsed();

        log::info!(
            "Scan {}: {} duplicate groups, {} duplicate files, {} reclaimable",
            if summary.interrupted {
                "cancelled"
            } else {
                "complete"
            },
            summary.duplicate_groups,
            summary.duplicate_files,
            summary.reclaimable_display()
        );

        Ok((groups, summary))
    }

    /// Hash each candidate bucket and collect its groups.
    #[allow(clippy::too_many_arguments)]
    fn hash_buckets(
        &self,
        buckets: Vec<SizeBucket>,
        index: &mut GroupingIndex,
        groups: &mut Vec<DuplicateGroup>,
        summary: &mut ScanSummary,
        progress: &mut ScanProgress,
        throttle: &mut ProgressThrottle,
        handler: &dyn ScanEventHandler,
    ) {
        let pool = self.build_pool();
        let batch_size = if pool.is_some() {
            self.config.io_threads
        } else {
            1
        };

        log::info!(
            "Hashing {} files in {} size buckets",
            progress.files_to_hash,
            buckets.len()
        );

        'buckets: for bucket in buckets {
            for batch in bucket.files.chunks(batch_size) {
                if self.config.is_shutdown_requested() {
                    summary.interrupted = true;
                    break;
                }

                let attempts = self.hash_batch(batch, pool.as_ref());
                for (file, attempt) in batch.iter().zip(attempts) {
                    match attempt {
                        HashAttempt::Hashed(hash) => {
                            summary.files_hashed += 1;
                            summary.bytes_hashed += file.size;
                            progress.files_hashed += 1;
                            progress.bytes_hashed += file.size;
                            index.insert_hashed(file.clone(), hash);
                        }
                        HashAttempt::Failed(e) => {
                            log::warn!("Failed to hash {}: {}", file.path.display(), e);
                            summary.hash_failures += 1;
                            summary.issues.push(ScanIssue::hash_failed(&file.path, &e));
                        }
                        HashAttempt::Skipped => summary.interrupted = true,
                    }
                    progress.current_path.clone_from(&file.path);
                }

                if throttle.ready() {
                    handler.on_event(ScanEvent::Progress(progress.clone()));
                }
            }

            if summary.interrupted {
                // Partly hashed bucket: its groups could be missing members
                let discarded = index.finalize_groups();
                log::info!(
                    "Scan cancelled; discarding {} incomplete group(s) of size {}",
                    discarded.len(),
                    bucket.size
                );
                break 'buckets;
            }

            for group in index.finalize_groups() {
                log::debug!(
                    "Duplicate group {}: {} files of {} bytes",
                    &group.hash_hex()[..16],
                    group.len(),
                    group.size
                );
                handler.on_event(ScanEvent::GroupFound(group.clone()));
                groups.push(group);
            }
        }
    }

    /// Hash one batch, in input order.
    fn hash_batch(&self, batch: &[FileRecord], pool: Option<&rayon::ThreadPool>) -> Vec<HashAttempt> {
        let attempt = |file: &FileRecord| {
            if self.config.is_shutdown_requested() {
                return HashAttempt::Skipped;
            }
            match self.hasher.full_hash(&file.path) {
                Ok(hash) => HashAttempt::Hashed(hash),
                Err(e) => HashAttempt::Failed(e),
            }
        };

        match pool {
            Some(pool) => pool.install(|| batch.par_iter().map(attempt).collect()),
            None => batch.iter().map(attempt).collect(),
        }
    }

    /// Bounded pool for parallel hashing, or `None` to hash inline.
    fn build_pool(&self) -> Option<rayon::ThreadPool> {
        if self.config.io_threads <= 1 {
            return None;
        }

        match rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.io_threads)
            .thread_name(|i| format!("dupsweep-hash-{}", i))
            .build()
        {
            Ok(pool) => Some(pool),
            Err(e) => {
                log::warn!("Failed to create hashing thread pool, hashing inline: {}", e);
                None
            }
        }
    }
}
