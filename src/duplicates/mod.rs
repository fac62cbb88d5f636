//! Duplicate detection module.
//!
//! This module provides functionality for:
//! - Size-based file grouping
//! - Full-content hash comparison of same-size candidates
//! - Duplicate group management and keep/delete selection
//! - Running the pipeline in the background with cancellation

pub mod controller;
pub mod finder;
pub mod groups;

pub use controller::{ControllerError, ScanController, ScanReport, ScanState};
pub use finder::{
    DuplicateFinder, FinderConfig, FinderError, IssueKind, ScanIssue, ScanSummary,
    DEFAULT_PROGRESS_INTERVAL,
};
pub use groups::{
    group_by_size, DuplicateGroup, GroupMember, GroupingIndex, GroupingStats, HashBucket,
    SizeBucket,
};
