//! Scheduled task reconciliation.
//!
//! This library converges the scheduled tasks (cron jobs) of one
//! application environment on the remote platform to the set declared in
//! layered configuration documents. Key concepts:
//!
//! - **Desired state**: tasks merged from the ordered config sources, with
//!   environment overrides applied.
//! - **Actual state**: tasks currently stored on the remote platform.
//! - **Canonical task**: the comparable record both sides are normalized into.
//!
//! # Invariants
//!
//! - The disabled-marker prefix (`"# "`) never appears in a canonical command
//! - Every desired label ends up in exactly one of create / edit / unchanged
//! - Apply runs create → edit → delete, one item at a time, and a failing
//!   item never stops the items after it

pub mod api;
pub mod diff;
mod error;
pub mod normalize;
pub mod overrides;
pub mod reconciler;
pub mod report;
pub mod settings;
pub mod source;
pub mod task;

pub use api::{ApiError, ConfigSource, IdentityResolver, TaskApi};
pub use diff::{diff, Diff};
pub use error::ReconcileError;
pub use normalize::{normalize_desired, normalize_remote, RemoteFlags, RemoteServer, RemoteTask};
pub use overrides::{apply_overrides, MatchMode, ResolvedTask};
pub use reconciler::{resolve_desired, ReconcileOptions, Reconciler};
pub use report::{
    ApplyReport, FieldChange, ItemOutcome, ItemResult, NoopReporter, Operation, Plan,
    PlannedEdit, ReconcileOutcome, Reporter,
};
pub use settings::{is_production_environment, RunSettings};
pub use source::{
    merge_sources, merge_tasks, ConfigDocument, CronSection, OverrideRule, RawTask, Scalar,
    TaskPatch,
};
pub use task::{decode_command, encode_command, Task, DISABLED_MARKER};
