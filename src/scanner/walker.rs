//! Directory walker implementation using jwalk for parallel traversal.
//!
//! # Overview
//!
//! This module provides the [`Walker`] struct for traversing a directory tree
//! and producing a lazy stream of [`FileRecord`]s for duplicate detection.
//! Directory reads run in parallel on jwalk's rayon pool, but children are
//! sorted by name before they are yielded, so the traversal order of a given
//! tree is the same from one run to the next.
//!
//! # Rules
//!
//! - Every subdirectory is descended, including hidden ones.
//! - Files whose own name starts with `.` are skipped (configurable).
//! - Only regular files are yielded; sockets, devices and broken links are not.
//! - Symlinked directories are never followed, which rules out link cycles.
//!   Symlinks to files are skipped unless `follow_symlinks` is set.
//! - An unreadable child is yielded as `Err(ScanError)` and iteration goes on.
//! - Only an unusable root fails the walk as a whole.
//!
//! # Example
//!
//! ```no_run
//! use dupsweep::scanner::{Walker, WalkerConfig};
//! use std::path::Path;
//!
//! let walker = Walker::new(Path::new("/home/user/Downloads"), WalkerConfig::default());
//! let files: Vec<_> = walker
//!     .walk()
//!     .expect("root is readable")
//!     .filter_map(Result::ok)
//!     .collect();
//! println!("Found {} files", files.len());
//! ```

use std::fs::{self, Metadata};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use jwalk::WalkDir;

use super::{FileRecord, ScanError, WalkerConfig};

/// Directory walker for file discovery.
#[derive(Debug)]
pub struct Walker {
    /// Root path to walk
    root: PathBuf,
    /// Walker configuration
    config: WalkerConfig,
    /// Optional stop flag for early termination
    shutdown_flag: Option<Arc<AtomicBool>>,
}

impl Walker {
    /// Create a new walker for the given path.
    ///
    /// # Arguments
    ///
    /// * `path` - Root directory to scan
    /// * `config` - Walker configuration options
    #[must_use]
    pub fn new(path: &Path, config: WalkerConfig) -> Self {
        Self {
            root: path.to_path_buf(),
            config,
            shutdown_flag: None,
        }
    }

    /// Set the stop flag.
    ///
    /// When the flag is set to `true`, the iterator ends before yielding its
    /// next entry.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    /// Root directory of this walk.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Check that `root` exists, is a directory, and can be listed.
    ///
    /// # Errors
    ///
    /// Returns the [`ScanError`] describing why the root is unusable.
    pub fn validate_root(root: &Path) -> Result<(), ScanError> {
        let metadata = fs::metadata(root).map_err(|e| ScanError::from_io(root, e))?;
        if !metadata.is_dir() {
            return Err(ScanError::NotADirectory(root.to_path_buf()));
        }
        fs::read_dir(root).map_err(|e| ScanError::from_io(root, e))?;
        Ok(())
    }

    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }

    fn passes_size_filter(&self, size: u64) -> bool {
        if let Some(min) = self.config.min_size {
            if size < min {
                return false;
            }
        }
        if let Some(max) = self.config.max_size {
            if size > max {
                return false;
            }
        }
        true
    }

    fn is_hidden(path: &Path) -> bool {
        path.file_name()
            .is_some_and(|name| name.to_string_lossy().starts_with('.'))
    }

    /// Walk the directory tree, yielding file records.
    ///
    /// The returned iterator is lazy, finite and single-use; call `walk`
    /// again to start a new traversal.
    ///
    /// # Errors
    ///
    /// Fails immediately only when the root is missing, not a directory, or
    /// cannot be listed. Errors on individual entries are yielded as
    /// `Err` items instead.
    pub fn walk(
        &self,
    ) -> Result<impl Iterator<Item = Result<FileRecord, ScanError>> + '_, ScanError> {
        Self::validate_root(&self.root)?;

        let walk_dir = WalkDir::new(&self.root)
            .follow_links(false)
            .skip_hidden(false)
            .process_read_dir(|_depth, _path, _read_dir_state, children| {
                // Sort children for deterministic output
                children.sort_by(|a, b| match (a, b) {
                    (Ok(a), Ok(b)) => a.file_name().cmp(b.file_name()),
                    (Ok(_), Err(_)) => std::cmp::Ordering::Less,
                    (Err(_), Ok(_)) => std::cmp::Ordering::Greater,
                    (Err(_), Err(_)) => std::cmp::Ordering::Equal,
                });
            });

        let iter = walk_dir
            .into_iter()
            .take_while(move |_| {
                if self.is_shutdown_requested() {
                    log::debug!("Walker: Shutdown requested, stopping iteration");
                    false
                } else {
                    true
                }
            })
            .filter_map(move |entry_result| match entry_result {
                Ok(entry) => {
                    // Skip the root directory itself
                    if entry.depth == 0 {
                        return None;
                    }

                    let path = entry.path();
                    let file_type = entry.file_type();

                    if file_type.is_dir() {
                        return None;
                    }

                    if self.config.skip_hidden && Self::is_hidden(&path) {
                        log::trace!("Skipping hidden file: {}", path.display());
                        return None;
                    }

                    let is_symlink = file_type.is_symlink();
                    if is_symlink && !self.config.follow_symlinks {
                        log::trace!("Skipping symlink: {}", path.display());
                        return None;
                    }

                    let metadata = if is_symlink {
                        match fs::metadata(&path) {
                            Ok(m) => m,
                            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                                log::trace!("Skipping broken symlink: {}", path.display());
                                return None;
                            }
                            Err(e) => return Some(Err(self.handle_io_error(&path, e))),
                        }
                    } else {
                        match fs::symlink_metadata(&path) {
                            Ok(m) => m,
                            Err(e) => return Some(Err(self.handle_io_error(&path, e))),
                        }
                    };

                    self.process_file_entry(path, &metadata)
                }
                Err(e) => Some(Err(self.handle_jwalk_error(e))),
            });

        Ok(iter)
    }

    /// Turn a listed entry into a record if it passes the filters.
    fn process_file_entry(
        &self,
        path: PathBuf,
        metadata: &Metadata,
    ) -> Option<Result<FileRecord, ScanError>> {
        if !metadata.is_file() {
            log::trace!("Skipping non-regular file: {}", path.display());
            return None;
        }

        let size = metadata.len();
        if !self.passes_size_filter(size) {
            log::trace!(
                "Skipping file due to size filter ({}): {}",
                size,
                path.display()
            );
            return None;
        }

        Some(Ok(FileRecord::new(path, size)))
    }

    /// Handle I/O errors during file access.
    fn handle_io_error(&self, path: &Path, error: io::Error) -> ScanError {
        match error.kind() {
            io::ErrorKind::PermissionDenied => {
                log::warn!("Permission denied: {}", path.display());
            }
            io::ErrorKind::NotFound => {
                log::debug!("File not found (may have been deleted): {}", path.display());
            }
            _ => {
                log::warn!("I/O error for {}: {}", path.display(), error);
            }
        }
        ScanError::from_io(path, error)
    }

    /// Handle jwalk errors (typically an unreadable subdirectory).
    fn handle_jwalk_error(&self, error: jwalk::Error) -> ScanError {
        let path = error
            .path()
            .map_or_else(|| self.root.clone(), Path::to_path_buf);
        let kind = error
            .io_error()
            .map_or(io::ErrorKind::Other, io::Error::kind);
        log::warn!("Walker error for {}: {}", path.display(), error);
        ScanError::from_io(&path, io::Error::new(kind, error.to_string()))
    }
}
