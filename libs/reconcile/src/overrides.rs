//! Environment overrides.
//!
//! A task may carry a list of override rules. Rules are evaluated in order and
//! every rule that matches the active environment is merged onto the task.
//! The rule list itself is consumed here and never reaches the diff.

use std::collections::BTreeMap;

use crate::source::{drop_removed, OverrideRule, RawTask, TaskPatch};

/// A configured task with its overrides resolved for one environment.
pub type ResolvedTask = TaskPatch;

/// How a rule's `environments` entries are compared with the active environment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MatchMode {
    /// The environment name must equal the entry.
    #[default]
    Exact,

    /// The environment name must contain the entry.
    Contains,
}

impl MatchMode {
    /// Mode selected by the `overrides-environments-contains` flag.
    pub fn from_contains_flag(contains: bool) -> Self {
        if contains {
            Self::Contains
        } else {
            Self::Exact
        }
    }

    /// Whether `environment` matches the rule entry `candidate`.
    pub fn matches(self, environment: &str, candidate: &str) -> bool {
        match self {
            Self::Exact => environment == candidate,
            Self::Contains => environment.contains(candidate),
        }
    }
}

impl OverrideRule {
    /// Whether this rule applies to `environment`.
    ///
    /// Rules without an `environments` list apply everywhere.
    pub fn applies_to(&self, environment: &str, mode: MatchMode) -> bool {
        match &self.environments {
            None => true,
            Some(environments) => environments
                .iter()
                .any(|candidate| mode.matches(environment, candidate)),
        }
    }
}

/// Resolve the overrides of a single task.
pub fn resolve_task(environment: &str, task: RawTask, mode: MatchMode) -> ResolvedTask {
    let RawTask {
        mut fields,
        overrides,
    } = task;

    for rule in overrides {
        if rule.applies_to(environment, mode) {
            fields.merge(rule.patch);
        }
    }

    fields
}

/// Resolve the overrides of every task for `environment`.
///
/// Tasks an override marks with status `-1` are dropped.
pub fn apply_overrides(
    environment: &str,
    tasks: BTreeMap<String, RawTask>,
    mode: MatchMode,
) -> BTreeMap<String, ResolvedTask> {
    let resolved = tasks
        .into_iter()
        .map(|(key, task)| (key, resolve_task(environment, task, mode)))
        .collect();

    drop_removed(resolved, TaskPatch::is_removed)
}
