//! JSON output formatter for scan results and action outcomes.
//!
//! # Scan schema
//!
//! ```json
//! {
//!   "status": "completed",
//!   "duplicates": [
//!     {
//!       "hash": "abc123...",
//!       "size": 1024,
//!       "files": [
//!         { "path": "/path/to/file1.txt", "action": "keep" },
//!         { "path": "/path/to/file2.txt", "action": "delete" }
//!       ]
//!     }
//!   ],
//!   "summary": { "total_files": 100, "duplicate_groups": 5, "...": "..." },
//!   "issues": [ { "path": "/locked", "kind": "hash_failed", "message": "..." } ]
//! }
//! ```
//!
//! The `files` array of each group doubles as a decision list: it can be
//! edited and passed straight to `dupsweep apply` after flattening.

use std::io::Write;

use serde::Serialize;

use crate::actions::{Action, ActionOutcome, BatchSummary, Decision};
use crate::duplicates::{DuplicateGroup, ScanIssue, ScanState, ScanSummary};
use crate::error::ExitCode;

/// A single duplicate group in JSON format.
#[derive(Debug, Clone, Serialize)]
pub struct JsonDuplicateGroup {
    /// BLAKE3 hash as hexadecimal string (64 characters)
    pub hash: String,
    /// File size in bytes
    pub size: u64,
    /// Members with their default action, in traversal order
    pub files: Vec<Decision>,
}

impl JsonDuplicateGroup {
    /// Create a JSON duplicate group from a DuplicateGroup.
    #[must_use]
    pub fn from_duplicate_group(group: &DuplicateGroup) -> Self {
        Self {
            hash: group.hash_hex(),
            size: group.size,
            files: group.decisions(),
        }
    }
}

/// Summary statistics in JSON format.
#[derive(Debug, Clone, Serialize)]
pub struct JsonSummary {
    /// Total number of files scanned
    pub total_files: usize,
    /// Total size of all scanned files in bytes
    pub total_size: u64,
    /// Entries that could not be enumerated
    pub skipped_entries: usize,
    /// Files whose content could not be read
    pub hash_failures: usize,
    /// Files hashed
    pub files_hashed: usize,
    /// Number of confirmed duplicate groups
    pub duplicate_groups: usize,
    /// Total number of duplicate files (excluding kept copies)
    pub duplicate_files: usize,
    /// Total space that can be reclaimed by removing duplicates (bytes)
    pub reclaimable_space: u64,
    /// Duration of the scan in milliseconds
    pub scan_duration_ms: u64,
    /// Whether the scan was interrupted
    pub interrupted: bool,
    /// The exit code number
    pub exit_code: i32,
    /// The machine-readable exit code name (e.g., "DS000")
    pub exit_code_name: String,
}

impl JsonSummary {
    /// Create a JSON summary from a ScanSummary and an exit code.
    #[must_use]
    pub fn from_scan_summary(summary: &ScanSummary, exit_code: ExitCode) -> Self {
        Self {
            total_files: summary.total_files,
            total_size: summary.total_size,
            skipped_entries: summary.skipped_entries,
            hash_failures: summary.hash_failures,
            files_hashed: summary.files_hashed,
            duplicate_groups: summary.duplicate_groups,
            duplicate_files: summary.duplicate_files,
            reclaimable_space: summary.reclaimable_space,
            scan_duration_ms: summary.scan_duration.as_millis() as u64,
            interrupted: summary.interrupted,
            exit_code: exit_code.as_i32(),
            exit_code_name: exit_code.code_prefix().to_string(),
        }
    }
}

/// Complete JSON scan report.
#[derive(Debug, Clone, Serialize)]
pub struct JsonOutput {
    /// Terminal scan state
    pub status: ScanState,
    /// List of duplicate groups
    pub duplicates: Vec<JsonDuplicateGroup>,
    /// Scan summary statistics
    pub summary: JsonSummary,
    /// Skipped entries and read failures
    pub issues: Vec<ScanIssue>,
    /// Outcomes when `--delete` was used
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actions: Option<JsonApplyOutput>,
}

impl JsonOutput {
    /// Build a report from a finished scan.
    ///
    /// # Example
    ///
    /// ```
    /// use dupsweep::duplicates::{ScanState, ScanSummary};
    /// use dupsweep::error::ExitCode;
    /// use dupsweep::output::json::JsonOutput;
    ///
    /// let output = JsonOutput::new(ScanState::Completed, &[], &ScanSummary::default(), ExitCode::NoDuplicates);
    /// assert!(output.duplicates.is_empty());
    /// ```
    #[must_use]
    pub fn new(
        status: ScanState,
        groups: &[DuplicateGroup],
        summary: &ScanSummary,
        exit_code: ExitCode,
    ) -> Self {
        Self {
            status,
            duplicates: groups
                .iter()
                .map(JsonDuplicateGroup::from_duplicate_group)
                .collect(),
            summary: JsonSummary::from_scan_summary(summary, exit_code),
            issues: summary.issues.clone(),
            actions: None,
        }
    }

    /// Attach action outcomes.
    #[must_use]
    pub fn with_actions(mut self, outcomes: &[ActionOutcome]) -> Self {
        self.actions = Some(JsonApplyOutput::new(outcomes));
        self
    }

    /// Write JSON to a writer.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn write_to<W: Write>(&self, writer: &mut W, pretty: bool) -> Result<(), JsonOutputError> {
        write_json(self, writer, pretty)
    }
}

/// JSON report for applied decisions.
#[derive(Debug, Clone, Serialize)]
pub struct JsonApplyOutput {
    /// One entry per decision, in submission order
    pub outcomes: Vec<ActionOutcome>,
    /// Counts
    pub summary: BatchSummary,
}

impl JsonApplyOutput {
    /// Build from outcomes.
    #[must_use]
    pub fn new(outcomes: &[ActionOutcome]) -> Self {
        Self {
            outcomes: outcomes.to_vec(),
            summary: BatchSummary::from_outcomes(outcomes),
        }
    }

    /// Write JSON to a writer.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn write_to<W: Write>(&self, writer: &mut W, pretty: bool) -> Result<(), JsonOutputError> {
        write_json(self, writer, pretty)
    }
}

fn write_json<T: Serialize, W: Write>(
    value: &T,
    writer: &mut W,
    pretty: bool,
) -> Result<(), JsonOutputError> {
    let json = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    writer.write_all(json.as_bytes())?;
    writer.write_all(b"\n")?;
    Ok(())
}

/// Flatten every group's members into one decision list.
#[must_use]
pub fn decisions_for(groups: &[DuplicateGroup]) -> Vec<Decision> {
    groups.iter().flat_map(DuplicateGroup::decisions).collect()
}

/// Paths marked for deletion in a decision list.
#[must_use]
pub fn deletions(decisions: &[Decision]) -> usize {
    decisions.iter().filter(|d| d.action == Action::Delete).count()
}

/// Errors that can occur during JSON output.
#[derive(thiserror::Error, Debug)]
pub enum JsonOutputError {
    /// JSON serialization error
    #[error("JSON serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error during writing
    #[error("I/O error during JSON generation: {0}")]
    Io(#[from] std::io::Error),
}
