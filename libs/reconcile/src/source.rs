//! Layered config sources.
//!
//! Each config document may carry a `crons` section. Task collections from
//! later documents are merged field by field onto earlier ones, keyed by the
//! task's key in the collection.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Status value that removes a task from the desired state entirely.
pub const REMOVAL_STATUS: i64 = -1;

/// One parsed config document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crons: Option<CronSection>,
}

/// The `crons` section of a config document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CronSection {
    /// Task collection keyed by task key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tasks: Option<BTreeMap<String, RawTask>>,

    /// Default server name. Only honored on production environments.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server: Option<String>,

    /// Match override environments by substring instead of equality.
    #[serde(
        default,
        rename = "overrides-environments-contains",
        skip_serializing_if = "Option::is_none"
    )]
    pub overrides_environments_contains: Option<bool>,
}

/// A loosely typed scalar as it appears in YAML.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl Scalar {
    /// Whether this is the `-1` removal sentinel.
    pub fn is_removal(&self) -> bool {
        match self {
            Self::Int(n) => *n == REMOVAL_STATUS,
            Self::Float(f) => *f == REMOVAL_STATUS as f64,
            Self::Text(s) => s.trim() == "-1",
            Self::Bool(_) => false,
        }
    }

    /// Boolean coercion: empty strings, `"0"` and zero are false.
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Bool(b) => *b,
            Self::Int(n) => *n != 0,
            Self::Float(f) => *f != 0.0,
            Self::Text(s) => !(s.is_empty() || s == "0"),
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(n) => write!(f, "{n}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// Task fields that may be set by a config document or an override rule.
///
/// Every field is optional so that a later layer only replaces what it sets.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,

    /// Explicit cron expression. Takes precedence over the split fields.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minute: Option<Scalar>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hour: Option<Scalar>,

    #[serde(
        default,
        alias = "dayMonth",
        skip_serializing_if = "Option::is_none"
    )]
    pub day_month: Option<Scalar>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub month: Option<Scalar>,

    #[serde(
        default,
        alias = "dayWeek",
        skip_serializing_if = "Option::is_none"
    )]
    pub day_week: Option<Scalar>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<Scalar>,

    /// Server name the task is pinned to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server: Option<String>,
}

impl TaskPatch {
    /// Overlay every field set in `later` onto `self`.
    pub fn merge(&mut self, later: TaskPatch) {
        overlay(&mut self.label, later.label);
        overlay(&mut self.command, later.command);
        overlay(&mut self.frequency, later.frequency);
        overlay(&mut self.minute, later.minute);
        overlay(&mut self.hour, later.hour);
        overlay(&mut self.day_month, later.day_month);
        overlay(&mut self.month, later.month);
        overlay(&mut self.day_week, later.day_week);
        overlay(&mut self.status, later.status);
        overlay(&mut self.server, later.server);
    }

    /// Whether the status carries the removal sentinel.
    pub fn is_removed(&self) -> bool {
        self.status.as_ref().is_some_and(Scalar::is_removal)
    }
}

fn overlay<T>(target: &mut Option<T>, value: Option<T>) {
    if value.is_some() {
        *target = value;
    }
}

/// An environment-scoped patch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OverrideRule {
    /// Environments the rule applies to. `None` applies everywhere.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environments: Option<Vec<String>>,

    #[serde(flatten)]
    pub patch: TaskPatch,
}

/// A task as declared in config, before overrides are resolved.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawTask {
    #[serde(flatten)]
    pub fields: TaskPatch,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub overrides: Vec<OverrideRule>,
}

impl RawTask {
    /// Merge a later declaration of the same task onto this one.
    ///
    /// Scalars set by `later` win; override rules are concatenated, earlier
    /// rules first.
    pub fn merge(&mut self, later: RawTask) {
        self.fields.merge(later.fields);
        self.overrides.extend(later.overrides);
    }

    pub fn is_removed(&self) -> bool {
        self.fields.is_removed()
    }
}

/// Merge an incoming task collection onto an accumulator.
pub fn merge_tasks(
    mut acc: BTreeMap<String, RawTask>,
    incoming: BTreeMap<String, RawTask>,
) -> BTreeMap<String, RawTask> {
    if acc.is_empty() {
        return incoming;
    }
    if incoming.is_empty() {
        return acc;
    }

    for (key, task) in incoming {
        match acc.get_mut(&key) {
            Some(existing) => existing.merge(task),
            None => {
                acc.insert(key, task);
            }
        }
    }

    acc
}

/// Merge the task collections of `documents`, in order, and drop removed tasks.
pub fn merge_sources(documents: &[ConfigDocument]) -> BTreeMap<String, RawTask> {
    drop_removed(merge_collections(documents), RawTask::is_removed)
}

/// Merge the task collections of `documents`, in order, keeping removed tasks.
///
/// A task removed at the top level may still be revived by an override.
pub(crate) fn merge_collections(documents: &[ConfigDocument]) -> BTreeMap<String, RawTask> {
    documents
        .iter()
        .filter_map(|doc| doc.crons.as_ref()?.tasks.clone())
        .fold(BTreeMap::new(), merge_tasks)
}

/// Drop every task whose status is the removal sentinel.
pub(crate) fn drop_removed<T, F>(tasks: BTreeMap<String, T>, is_removed: F) -> BTreeMap<String, T>
where
    F: Fn(&T) -> bool,
{
    tasks
        .into_iter()
        .filter(|(key, task)| {
            let removed = is_removed(task);
            if removed {
                tracing::debug!(task = %key, "task removed by status -1");
            }
            !removed
        })
        .collect()
}
