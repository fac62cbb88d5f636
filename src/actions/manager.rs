//! Batch application of keep/delete decisions.
//!
//! [`ActionManager`] walks a decision list in submission order and produces
//! exactly one [`ActionOutcome`] per decision. A failed removal never stops
//! the batch. A stop request is honored between decisions; everything not yet
//! processed is reported as failed with the reason [`STOPPED_REASON`].

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};

use super::delete::{RecoverableRemover, SystemTrash};
use super::{Action, Decision};

/// Failure reason for decisions skipped after a stop request.
pub const STOPPED_REASON: &str = "stopped before processing";

/// Success or failure of one decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionResult {
    /// Action carried out (always the case for `Keep`)
    Success,
    /// Action could not be carried out
    Failed,
}

/// Result of applying one decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionOutcome {
    /// Path from the decision
    pub path: PathBuf,
    /// Action from the decision
    pub requested_action: Action,
    /// Whether it worked
    pub result: ActionResult,
    /// Set when `result` is `Failed`
    pub failure_reason: Option<String>,
}

impl ActionOutcome {
    fn success(decision: &Decision) -> Self {
        Self {
            path: decision.path.clone(),
            requested_action: decision.action,
            result: ActionResult::Success,
            failure_reason: None,
        }
    }

    fn failed(decision: &Decision, reason: impl Into<String>) -> Self {
        Self {
            path: decision.path.clone(),
            requested_action: decision.action,
            result: ActionResult::Failed,
            failure_reason: Some(reason.into()),
        }
    }

    /// Whether the action succeeded.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.result == ActionResult::Success
    }
}

/// Applies decisions through a [`RecoverableRemover`].
pub struct ActionManager {
    remover: Box<dyn RecoverableRemover>,
}

impl ActionManager {
    /// Create a manager that removes files with `remover`.
    #[must_use]
    pub fn new(remover: Box<dyn RecoverableRemover>) -> Self {
        Self { remover }
    }

    /// Create a manager backed by the operating system trash.
    #[must_use]
    pub fn with_system_trash() -> Self {
        Self::new(Box::new(SystemTrash))
    }

    /// Apply every decision in order.
    #[must_use]
    pub fn apply(&self, decisions: &[Decision]) -> Vec<ActionOutcome> {
        let never = AtomicBool::new(false);
        self.apply_with_stop(decisions, &never)
    }

    /// Apply decisions in order, checking `stop` before each one.
    #[must_use]
    pub fn apply_with_stop(&self, decisions: &[Decision], stop: &AtomicBool) -> Vec<ActionOutcome> {
        let mut outcomes = Vec::with_capacity(decisions.len());

        for (index, decision) in decisions.iter().enumerate() {
            if stop.load(Ordering::SeqCst) {
                log::info!(
                    "Stop requested; {} decision(s) left unprocessed",
                    decisions.len() - index
                );
                outcomes.extend(
                    decisions[index..]
                        .iter()
                        .map(|d| ActionOutcome::failed(d, STOPPED_REASON)),
                );
                break;
            }

            outcomes.push(self.apply_one(decision));
        }

        let summary = BatchSummary::from_outcomes(&outcomes);
        log::info!("{}", summary.summary());
        outcomes
    }

    fn apply_one(&self, decision: &Decision) -> ActionOutcome {
        match decision.action {
            Action::Keep => {
                log::trace!("Keeping {}", decision.path.display());
                ActionOutcome::success(decision)
            }
            Action::Delete => match self.remover.move_to_recoverable(&decision.path) {
                Ok(()) => ActionOutcome::success(decision),
                Err(e) => {
                    log::warn!("Failed to remove {}: {}", decision.path.display(), e);
                    ActionOutcome::failed(decision, e.to_string())
                }
            },
        }
    }
}

impl std::fmt::Debug for ActionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionManager").finish_non_exhaustive()
    }
}

/// Counts over a batch of outcomes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    /// Files moved to recoverable storage
    pub removed: usize,
    /// Keep decisions
    pub kept: usize,
    /// Failed decisions
    pub failed: usize,
}

impl BatchSummary {
    /// Tally a list of outcomes.
    #[must_use]
    pub fn from_outcomes(outcomes: &[ActionOutcome]) -> Self {
        outcomes.iter().fold(Self::default(), |mut acc, o| {
            match (o.result, o.requested_action) {
                (ActionResult::Failed, _) => acc.failed += 1,
                (ActionResult::Success, Action::Delete) => acc.removed += 1,
                (ActionResult::Success, Action::Keep) => acc.kept += 1,
            }
            acc
        })
    }

    /// Total number of outcomes.
    #[must_use]
    pub fn total_count(&self) -> usize {
        self.removed + self.kept + self.failed
    }

    /// Check if all decisions succeeded.
    #[must_use]
    pub fn all_succeeded(&self) -> bool {
        self.failed == 0
    }

    /// Human-readable summary of the batch.
    #[must_use]
    pub fn summary(&self) -> String {
        if self.all_succeeded() {
            format!("Removed {} file(s), kept {}", self.removed, self.kept)
        } else {
            format!(
                "Removed {} file(s), kept {}, {} failed",
                self.removed, self.kept, self.failed
            )
        }
    }
}
