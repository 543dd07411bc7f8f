//! Desired vs. actual comparison.

use std::collections::{BTreeMap, BTreeSet};

use crate::task::Task;

/// Changes needed to converge the actual tasks to the desired ones.
///
/// All three maps are keyed by label and pairwise disjoint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diff {
    /// Desired tasks with no remote counterpart.
    pub to_create: BTreeMap<String, Task>,

    /// Desired tasks (carrying the remote id) that differ from their remote counterpart.
    pub to_edit: BTreeMap<String, Task>,

    /// Remote tasks with no desired counterpart.
    pub to_delete: BTreeMap<String, Task>,
}

impl Diff {
    /// Returns true if nothing needs to change.
    pub fn is_empty(&self) -> bool {
        self.to_create.is_empty() && self.to_edit.is_empty() && self.to_delete.is_empty()
    }

    /// Total number of pending changes.
    pub fn len(&self) -> usize {
        self.to_create.len() + self.to_edit.len() + self.to_delete.len()
    }

    /// Drop every pending deletion.
    pub fn without_deletions(self) -> Self {
        Self {
            to_delete: BTreeMap::new(),
            ..self
        }
    }
}

/// Compare `desired` against `actual`.
///
/// Matched desired tasks inherit the remote id before comparison, since ids
/// are never declared in config. Comparison is exact per field.
pub fn diff(actual: &BTreeMap<String, Task>, desired: BTreeMap<String, Task>) -> Diff {
    let mut out = Diff::default();
    let mut matched: BTreeSet<String> = BTreeSet::new();

    for (label, mut task) in desired {
        let Some(current) = actual.get(&label) else {
            out.to_create.insert(label, task);
            continue;
        };

        matched.insert(label.clone());
        task.id = current.id.clone();

        if task != *current {
            out.to_edit.insert(label, task);
        }
    }

    out.to_delete = actual
        .iter()
        .filter(|(key, _)| !matched.contains(key.as_str()))
        .map(|(key, task)| (key.clone(), task.clone()))
        .collect();

    out
}
