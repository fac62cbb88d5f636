//! Human-readable report.
//!
//! Colors come from `yansi` and follow its global switch, so `--no-color`
//! (or `NO_COLOR`) only needs to call `yansi::disable()` once at startup.

use std::io::{self, Write};

use bytesize::ByteSize;
use yansi::Paint;

use crate::actions::{Action, ActionOutcome, ActionResult, BatchSummary};
use crate::duplicates::{DuplicateGroup, IssueKind, ScanState, ScanSummary};

/// Text report over a finished scan.
pub struct TextOutput<'a> {
    state: ScanState,
    groups: &'a [DuplicateGroup],
    summary: &'a ScanSummary,
}

impl<'a> TextOutput<'a> {
    /// Create a report.
    #[must_use]
    pub fn new(state: ScanState, groups: &'a [DuplicateGroup], summary: &'a ScanSummary) -> Self {
        Self {
            state,
            groups,
            summary,
        }
    }

    /// Write groups, issues and the summary block.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    pub fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        for (index, group) in self.groups.iter().enumerate() {
            writeln!(
                w,
                "{} {} files, {} each, hash {}",
                format!("Group {}:", index + 1).bold(),
                group.len(),
                ByteSize::b(group.size),
                &group.hash_hex()[..16],
            )?;
            for member in &group.members {
                let marker = match member.action {
                    Action::Keep => "keep  ".green().to_string(),
                    Action::Delete => "delete".red().to_string(),
                };
                writeln!(w, "  [{}] {}", marker, member.file.path.display())?;
            }
            writeln!(w)?;
        }

        if !self.summary.issues.is_empty() {
            writeln!(w, "{}", "Issues:".yellow().bold())?;
            for issue in &self.summary.issues {
                let kind = match issue.kind {
                    IssueKind::Skipped => "skipped",
                    IssueKind::HashFailed => "unreadable",
                };
                writeln!(w, "  {} {}", kind.yellow(), issue.message)?;
            }
            writeln!(w)?;
        }

        self.write_summary(w)
    }

    fn write_summary<W: Write>(&self, w: &mut W) -> io::Result<()> {
        let s = self.summary;
        let status = match self.state {
            ScanState::Completed => "completed".green().to_string(),
            ScanState::Cancelled => "cancelled (partial results)".yellow().to_string(),
            other => format!("{:?}", other).to_lowercase().red().to_string(),
        };

        writeln!(w, "{} {}", "Scan".bold(), status)?;
        writeln!(
            w,
            "  Files scanned:   {} ({})",
            s.total_files,
            s.total_size_display()
        )?;
        writeln!(w, "  Files hashed:    {}", s.files_hashed)?;
        if s.has_issues() {
            writeln!(
                w,
                "  Skipped:         {} entries, {} unreadable",
                s.skipped_entries, s.hash_failures
            )?;
        }
        writeln!(
            w,
            "  Duplicates:      {} groups, {} redundant files",
            s.duplicate_groups, s.duplicate_files
        )?;
        writeln!(
            w,
            "  Reclaimable:     {} ({:.1}%)",
            s.reclaimable_display().bold(),
            s.wasted_percentage()
        )?;
        writeln!(w, "  Time:            {:.2}s", s.scan_duration.as_secs_f64())
    }
}

/// Write one line per outcome plus a summary line.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn write_outcomes<W: Write>(w: &mut W, outcomes: &[ActionOutcome]) -> io::Result<()> {
    for outcome in outcomes {
        match (outcome.result, outcome.requested_action) {
            (ActionResult::Success, Action::Keep) => {
                writeln!(w, "  {} {}", "kept   ".dim(), outcome.path.display())?;
            }
            (ActionResult::Success, Action::Delete) => {
                writeln!(w, "  {} {}", "removed".green(), outcome.path.display())?;
            }
            (ActionResult::Failed, _) => {
                writeln!(
                    w,
                    "  {} {}: {}",
                    "failed ".red().bold(),
                    outcome.path.display(),
                    outcome.failure_reason.as_deref().unwrap_or("unknown error")
                )?;
            }
        }
    }

    let summary = BatchSummary::from_outcomes(outcomes);
    let line = summary.summary();
    if summary.all_succeeded() {
        writeln!(w, "{}", line.green())
    } else {
        writeln!(w, "{}", line.yellow())
    }
}
