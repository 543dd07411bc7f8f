//! Plans, per-item results and run outcomes.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::diff::Diff;
use crate::task::Task;

/// A single field that changes value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldChange {
    pub field: &'static str,
    pub before: String,
    pub after: String,
}

impl FieldChange {
    pub fn new(field: &'static str, before: impl Into<String>, after: impl Into<String>) -> Self {
        Self {
            field,
            before: before.into(),
            after: after.into(),
        }
    }
}

/// A pending edit with the remote record it replaces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedEdit {
    /// Desired task carrying the remote id.
    pub task: Task,

    /// Remote task as it currently is.
    pub before: Task,

    pub changes: Vec<FieldChange>,
}

impl PlannedEdit {
    /// Whether applying this edit needs a full update rather than enable/disable.
    pub fn needs_full_update(&self) -> bool {
        self.task.needs_full_update(&self.before)
    }
}

/// Everything a run would change, in apply order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Plan {
    pub to_create: Vec<Task>,
    pub to_edit: Vec<PlannedEdit>,
    pub to_delete: Vec<Task>,
}

impl Plan {
    /// Build a plan from a diff and the actual tasks it was computed against.
    pub fn from_diff(diff: Diff, actual: &BTreeMap<String, Task>) -> Self {
        let to_edit = diff
            .to_edit
            .into_iter()
            .filter_map(|(label, task)| {
                let before = actual.get(&label)?.clone();
                let changes = task.changes_from(&before);
                Some(PlannedEdit {
                    task,
                    before,
                    changes,
                })
            })
            .collect();

        Self {
            to_create: diff.to_create.into_values().collect(),
            to_edit,
            to_delete: diff.to_delete.into_values().collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.to_create.is_empty() && self.to_edit.is_empty() && self.to_delete.is_empty()
    }
}

/// Remote mutation performed for one item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Create,
    Update,
    Enable,
    Disable,
    Delete,
}

impl Operation {
    /// Past participle used in success messages.
    pub fn done(self) -> &'static str {
        match self {
            Self::Create => "created",
            Self::Update => "updated",
            Self::Enable => "enabled",
            Self::Disable => "disabled",
            Self::Delete => "deleted",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Create => "Create",
            Self::Update | Self::Enable | Self::Disable => "Edit",
            Self::Delete => "Delete",
        };
        f.write_str(name)
    }
}

/// Outcome of one remote mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum ItemOutcome {
    Succeeded,
    Failed { reason: String },
}

/// Result of applying one planned change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemResult {
    pub operation: Operation,
    pub label: String,

    /// Remote id; for creations, the id assigned by the platform.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(flatten)]
    pub outcome: ItemOutcome,
}

impl ItemResult {
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, ItemOutcome::Succeeded)
    }
}

/// Per-item results of an apply phase, in the order they were attempted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ApplyReport {
    pub items: Vec<ItemResult>,
}

impl ApplyReport {
    pub fn push(&mut self, result: ItemResult) {
        self.items.push(result);
    }

    /// Items whose remote call failed.
    pub fn failures(&self) -> impl Iterator<Item = &ItemResult> {
        self.items.iter().filter(|item| !item.is_success())
    }

    /// True only if every item succeeded.
    pub fn is_success(&self) -> bool {
        self.items.iter().all(ItemResult::is_success)
    }
}

/// How a reconciliation run ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ReconcileOutcome {
    /// Nothing to change; the remote API was not mutated.
    UpToDate,

    /// Changes are pending but were not applied (dry run).
    Pending { plan: Plan },

    /// Changes were applied.
    Applied { plan: Plan, report: ApplyReport },
}

impl ReconcileOutcome {
    /// True when the remote tasks are in sync after the run.
    ///
    /// A dry run with pending changes is not a success.
    pub fn is_success(&self) -> bool {
        match self {
            Self::UpToDate => true,
            Self::Pending { .. } => false,
            Self::Applied { report, .. } => report.is_success(),
        }
    }
}

/// Receives progress from a reconciliation run.
///
/// All methods default to doing nothing.
pub trait Reporter {
    /// Called once with the pending changes, before anything is applied.
    fn plan(&mut self, _plan: &Plan) {}

    /// Called after each remote mutation.
    fn item(&mut self, _result: &ItemResult) {}
}

/// A reporter that ignores everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopReporter;

impl Reporter for NoopReporter {}
