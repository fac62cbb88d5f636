//! Reversible file removal.
//!
//! # Overview
//!
//! Removal goes through the [`RecoverableRemover`] trait so that nothing in
//! the action pipeline destroys data directly:
//!
//! - [`SystemTrash`] moves files to the platform trash via the `trash` crate
//! - [`FolderTrash`] moves files into a caller-chosen recovery directory,
//!   renaming on collision and copying across filesystems when needed
//!
//! Failures are classified into [`DeleteError`] variants so callers can tell
//! a vanished file from a locked one.
//!
//! # Example
//!
//! ```no_run
//! use dupsweep::actions::{FolderTrash, RecoverableRemover};
//! use std::path::Path;
//!
//! let remover = FolderTrash::new("/tmp/dupsweep-recovered").unwrap();
//! match remover.move_to_recoverable(Path::new("/data/copy.bin")) {
//!     Ok(()) => println!("Moved"),
//!     Err(e) => eprintln!("Failed: {}", e),
//! }
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Error type for removal operations.
#[derive(Debug, Error)]
pub enum DeleteError {
    /// File was not found (may have been deleted or moved).
    #[error("file not found: {0}")]
    NotFound(PathBuf),

    /// Permission denied when attempting to remove.
    #[error("permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// Another process holds the file open or locked.
    #[error("file in use: {0}")]
    InUse(PathBuf),

    /// Path exists but is not a regular file.
    #[error("not a regular file: {0}")]
    NotAFile(PathBuf),

    /// Trash operation failed.
    #[error("trash operation failed for {path}: {message}")]
    TrashFailed { path: PathBuf, message: String },

    /// Attempted to delete all copies (at least one must be preserved).
    #[error("cannot delete all copies - at least one file must be preserved")]
    AllCopiesWouldBeDeleted,

    /// General I/O error.
    #[error("I/O error for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl DeleteError {
    /// Get the path associated with this error (if any).
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::NotFound(p)
            | Self::PermissionDenied(p)
            | Self::InUse(p)
            | Self::NotAFile(p)
            | Self::TrashFailed { path: p, .. }
            | Self::Io { path: p, .. } => Some(p),
            Self::AllCopiesWouldBeDeleted => None,
        }
    }

    /// Classify an I/O error raised while touching `path`.
    #[must_use]
    pub fn from_io(path: &Path, error: io::Error) -> Self {
        if is_in_use(&error) {
            return Self::InUse(path.to_path_buf());
        }
        match error.kind() {
            io::ErrorKind::NotFound => Self::NotFound(path.to_path_buf()),
            io::ErrorKind::PermissionDenied => Self::PermissionDenied(path.to_path_buf()),
            _ => Self::Io {
                path: path.to_path_buf(),
                source: error,
            },
        }
    }
}

/// Sharing and lock violations on Windows, busy resources elsewhere.
fn is_in_use(error: &io::Error) -> bool {
    const ERROR_SHARING_VIOLATION: i32 = 32;
    const ERROR_LOCK_VIOLATION: i32 = 33;

    if cfg!(windows)
        && matches!(
            error.raw_os_error(),
            Some(ERROR_SHARING_VIOLATION | ERROR_LOCK_VIOLATION)
        )
    {
        return true;
    }

    matches!(
        error.kind(),
        io::ErrorKind::ResourceBusy | io::ErrorKind::ExecutableFileBusy
    )
}

/// Check that `path` still names a regular file (or a link to one).
fn check_removable(path: &Path) -> Result<(), DeleteError> {
    let metadata = fs::symlink_metadata(path).map_err(|e| DeleteError::from_io(path, e))?;
    if metadata.is_file() || metadata.file_type().is_symlink() {
        Ok(())
    } else {
        Err(DeleteError::NotAFile(path.to_path_buf()))
    }
}

/// A capability that moves a file somewhere it can be restored from.
pub trait RecoverableRemover: Send + Sync {
    /// Move `path` out of its directory into recoverable storage.
    ///
    /// # Errors
    ///
    /// Returns a classified [`DeleteError`]; the file is left in place.
    fn move_to_recoverable(&self, path: &Path) -> Result<(), DeleteError>;
}

/// Removal into the operating system trash.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTrash;

impl RecoverableRemover for SystemTrash {
    fn move_to_recoverable(&self, path: &Path) -> Result<(), DeleteError> {
        check_removable(path)?;

        trash::delete(path).map_err(|e| {
            log::error!("Trash operation failed for {}: {}", path.display(), e);

            let io_source = std::error::Error::source(&e)
                .and_then(|source| source.downcast_ref::<io::Error>());
            match io_source {
                Some(io_err) if is_in_use(io_err) => DeleteError::InUse(path.to_path_buf()),
                Some(io_err) if io_err.kind() == io::ErrorKind::PermissionDenied => {
                    DeleteError::PermissionDenied(path.to_path_buf())
                }
                _ => DeleteError::TrashFailed {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                },
            }
        })?;

        log::info!("Moved to trash: {}", path.display());
        Ok(())
    }
}

/// Removal into a recovery directory.
///
/// Files keep their name; a numeric suffix is added when the name is
/// already taken in the recovery directory.
#[derive(Debug, Clone)]
pub struct FolderTrash {
    dir: PathBuf,
}

impl FolderTrash {
    /// Use `dir` as the recovery directory, creating it if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn new(dir: impl Into<PathBuf>) -> io::Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// Recovery directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// First free destination for `path` inside the recovery directory.
    fn destination_for(&self, path: &Path) -> Result<PathBuf, DeleteError> {
        let name = path
            .file_name()
            .ok_or_else(|| DeleteError::NotAFile(path.to_path_buf()))?;

        let candidate = self.dir.join(name);
        if !candidate.exists() {
            return Ok(candidate);
        }

        let stem = Path::new(name)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let extension = Path::new(name)
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default();

        (1u32..)
            .map(|n| self.dir.join(format!("{} ({}){}", stem, n, extension)))
            .find(|p| !p.exists())
            .ok_or_else(|| DeleteError::TrashFailed {
                path: path.to_path_buf(),
                message: "no free name in recovery directory".to_string(),
            })
    }
}

impl RecoverableRemover for FolderTrash {
    fn move_to_recoverable(&self, path: &Path) -> Result<(), DeleteError> {
        check_removable(path)?;
        let destination = self.destination_for(path)?;

        match fs::rename(path, &destination) {
            Ok(()) => {}
            Err(e)
                if matches!(
                    e.kind(),
                    io::ErrorKind::NotFound | io::ErrorKind::PermissionDenied
                ) || is_in_use(&e) =>
            {
                return Err(DeleteError::from_io(path, e));
            }
            Err(e) => {
                // Usually a different filesystem
                log::debug!(
                    "Rename of {} failed ({}), copying instead",
                    path.display(),
                    e
                );
                copy_then_remove(path, &destination)?;
            }
        }

        log::info!(
            "Moved {} to {}",
            path.display(),
            destination.display()
        );
        Ok(())
    }
}

/// Copy `path` to `destination`, then remove the original.
///
/// Any failure leaves `path` in place and no partial copy at `destination`.
fn copy_then_remove(path: &Path, destination: &Path) -> Result<(), DeleteError> {
    if let Err(e) = fs::copy(path, destination) {
        let _ = fs::remove_file(destination);
        return Err(DeleteError::from_io(path, e));
    }
    if let Err(e) = fs::remove_file(path) {
        let _ = fs::remove_file(destination);
        return Err(DeleteError::from_io(path, e));
    }
    Ok(())
}

/// Validate that at least one file in a group is preserved.
///
/// # Arguments
///
/// * `selected_paths` - Paths selected for deletion
/// * `group_paths` - All paths in the duplicate group
///
/// # Errors
///
/// Returns `AllCopiesWouldBeDeleted` if every path would be removed.
pub fn validate_preserves_copy(
    selected_paths: &[PathBuf],
    group_paths: &[PathBuf],
) -> Result<(), DeleteError> {
    use std::collections::HashSet;

    let selected_set: HashSet<&PathBuf> = selected_paths.iter().collect();
    let preserved_count = group_paths
        .iter()
        .filter(|p| !selected_set.contains(p))
        .count();

    if preserved_count == 0 {
        log::error!(
            "Attempted to delete all {} copies of a duplicate group",
            group_paths.len()
        );
        Err(DeleteError::AllCopiesWouldBeDeleted)
    } else {
        log::debug!(
            "Deletion validated: {} files selected, {} preserved",
            selected_paths.len(),
            preserved_count
        );
        Ok(())
    }
}
