//! File actions module.
//!
//! This module provides functionality for:
//! - Keep/delete decisions over duplicate group members
//! - Reversible removal through a [`RecoverableRemover`]
//! - Batch application with one outcome per decision
//!
//! # Removal
//!
//! Deleting never destroys data directly. Files go to the system trash
//! ([`SystemTrash`], the default) or into a recovery folder chosen by the
//! caller ([`FolderTrash`]).
//!
//! ```no_run
//! use dupsweep::actions::{Action, ActionManager, Decision};
//! use std::path::PathBuf;
//!
//! let manager = ActionManager::with_system_trash();
//! let outcomes = manager.apply(&[
//!     Decision::new(PathBuf::from("/photos/a.jpg"), Action::Keep),
//!     Decision::new(PathBuf::from("/photos/copy of a.jpg"), Action::Delete),
//! ]);
//! assert_eq!(outcomes.len(), 2);
//! ```

pub mod delete;
pub mod manager;

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

// Re-export commonly used types
pub use delete::{
    validate_preserves_copy, DeleteError, FolderTrash, RecoverableRemover, SystemTrash,
};
pub use manager::{ActionManager, ActionOutcome, ActionResult, BatchSummary};

/// What to do with one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    /// Leave the file in place
    Keep,
    /// Move the file somewhere recoverable
    Delete,
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Keep => write!(f, "keep"),
            Self::Delete => write!(f, "delete"),
        }
    }
}

/// A keep/delete decision for one path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    /// File the decision applies to
    pub path: PathBuf,
    /// Requested action
    pub action: Action,
}

impl Decision {
    /// Create a decision.
    #[must_use]
    pub fn new(path: PathBuf, action: Action) -> Self {
        Self { path, action }
    }
}
