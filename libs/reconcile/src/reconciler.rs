//! Reconciliation run: resolve → load → diff → report → apply.

use std::collections::BTreeMap;

use tracing::{debug, error, info, warn};

use crate::api::{ApiError, ConfigSource, IdentityResolver, TaskApi};
use crate::diff::diff;
use crate::error::ReconcileError;
use crate::normalize::{normalize_desired, normalize_remote};
use crate::overrides::{apply_overrides, ResolvedTask};
use crate::report::{
    ApplyReport, ItemOutcome, ItemResult, Operation, Plan, PlannedEdit, ReconcileOutcome, Reporter,
};
use crate::settings::RunSettings;
use crate::source::{merge_collections, ConfigDocument};
use crate::task::Task;

/// Options for a single run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileOptions {
    /// Report pending changes without applying them.
    pub dry_run: bool,

    /// Never delete remote tasks, and do not report them as pending deletions.
    pub no_delete: bool,
}

/// Merge `documents` and resolve overrides for `environment`.
///
/// This is the offline half of desired-state computation; server names are
/// not resolved. Removed tasks are dropped only once overrides are applied,
/// so an environment override can bring back a task removed everywhere else.
pub fn resolve_desired(
    documents: &[ConfigDocument],
    environment: &str,
) -> (RunSettings, BTreeMap<String, ResolvedTask>) {
    let settings = RunSettings::from_documents(documents, environment);
    let merged = merge_collections(documents);
    let resolved = apply_overrides(environment, merged, settings.match_mode);
    (settings, resolved)
}

/// Drives one application environment towards its configured tasks.
pub struct Reconciler<'a> {
    api: &'a dyn TaskApi,
    identity: &'a dyn IdentityResolver,
    sources: &'a dyn ConfigSource,
}

impl<'a> Reconciler<'a> {
    pub fn new(
        api: &'a dyn TaskApi,
        identity: &'a dyn IdentityResolver,
        sources: &'a dyn ConfigSource,
    ) -> Self {
        Self {
            api,
            identity,
            sources,
        }
    }

    /// Run a full reconciliation for `application` / `environment`.
    ///
    /// Fatal setup problems are returned as errors before anything is
    /// reported. Per-item apply failures are part of the returned outcome.
    pub async fn reconcile<R: Reporter + ?Sized>(
        &self,
        application: &str,
        environment: &str,
        options: ReconcileOptions,
        reporter: &mut R,
    ) -> Result<ReconcileOutcome, ReconcileError> {
        let (_, environment_id) = self.resolve_target(application, environment).await?;

        if options.dry_run {
            warn!("dry run: scheduled tasks will not be altered");
        }

        let documents = self.sources.load(application)?;
        debug!(documents = documents.len(), "loaded config documents");

        let actual = self.actual_state(&environment_id).await?;
        let desired = self
            .desired_state(&documents, environment, &environment_id)
            .await?;

        let mut changes = diff(&actual, desired);
        if options.no_delete {
            changes = changes.without_deletions();
        }

        if changes.is_empty() {
            info!(application, environment, "all scheduled tasks are up-to-date");
            return Ok(ReconcileOutcome::UpToDate);
        }

        let plan = Plan::from_diff(changes, &actual);
        info!(
            create = plan.to_create.len(),
            edit = plan.to_edit.len(),
            delete = plan.to_delete.len(),
            "scheduled tasks out of sync"
        );
        reporter.plan(&plan);

        if options.dry_run {
            return Ok(ReconcileOutcome::Pending { plan });
        }

        let report = self.apply(&environment_id, &plan, reporter).await;
        if !report.is_success() {
            error!(
                failed = report.failures().count(),
                "at least one operation failed"
            );
        }

        Ok(ReconcileOutcome::Applied { plan, report })
    }

    /// Resolve application and environment names to remote ids.
    pub async fn resolve_target(
        &self,
        application: &str,
        environment: &str,
    ) -> Result<(String, String), ReconcileError> {
        let application_id = self
            .identity
            .resolve_application_id(application)
            .await?
            .ok_or_else(|| ReconcileError::ApplicationNotFound(application.to_string()))?;

        let environment_id = self
            .identity
            .resolve_environment_id(&application_id, environment)
            .await?
            .ok_or_else(|| ReconcileError::EnvironmentNotFound {
                application: application.to_string(),
                application_id: application_id.clone(),
                environment: environment.to_string(),
            })?;

        debug!(%application_id, %environment_id, "resolved target");
        Ok((application_id, environment_id))
    }

    /// Remote tasks of `environment_id` in canonical form.
    pub async fn actual_state(
        &self,
        environment_id: &str,
    ) -> Result<BTreeMap<String, Task>, ReconcileError> {
        let remote = self.api.list_tasks(environment_id).await?;
        debug!(count = remote.len(), "fetched remote tasks");
        Ok(normalize_remote(remote))
    }

    /// Configured tasks for `environment` in canonical form.
    pub async fn desired_state(
        &self,
        documents: &[ConfigDocument],
        environment: &str,
        environment_id: &str,
    ) -> Result<BTreeMap<String, Task>, ReconcileError> {
        let (settings, resolved) = resolve_desired(documents, environment);

        let default_server_id = match &settings.default_server {
            Some(name) => self
                .server_id(environment, environment_id, name)
                .await?
                .unwrap_or_default(),
            None => String::new(),
        };
        let settings = settings.with_default_server_id(default_server_id);

        let mut lookups: BTreeMap<String, Option<String>> = BTreeMap::new();
        for name in resolved.values().filter_map(|task| task.server.as_ref()) {
            if !lookups.contains_key(name) {
                let id = self.server_id(environment, environment_id, name).await?;
                lookups.insert(name.clone(), id);
            }
        }
        let named_servers: BTreeMap<String, String> = lookups
            .into_iter()
            .filter_map(|(name, id)| Some((name, id?)))
            .collect();

        normalize_desired(resolved, &settings.default_server_id, &named_servers)
    }

    async fn server_id(
        &self,
        environment: &str,
        environment_id: &str,
        name: &str,
    ) -> Result<Option<String>, ReconcileError> {
        let id = self
            .identity
            .resolve_server_id(environment_id, name)
            .await?
            .filter(|id| !id.is_empty());

        if id.is_none() {
            warn!(
                server = name,
                environment,
                %environment_id,
                "impossible to find server; tasks will run on any server"
            );
        }
        Ok(id)
    }

    /// Apply `plan`, one item at a time: creations, then edits, then deletions.
    ///
    /// A failing item is recorded and the remaining items are still attempted.
    pub async fn apply<R: Reporter + ?Sized>(
        &self,
        environment_id: &str,
        plan: &Plan,
        reporter: &mut R,
    ) -> ApplyReport {
        let mut report = ApplyReport::default();

        for task in &plan.to_create {
            let result = self.create(environment_id, task).await;
            record(&mut report, reporter, result);
        }

        for edit in &plan.to_edit {
            let result = self.edit(environment_id, edit).await;
            record(&mut report, reporter, result);
        }

        for task in &plan.to_delete {
            let id = task.id.as_deref().unwrap_or_default();
            let outcome = self.api.delete_task(environment_id, id).await;
            let result = item_result(Operation::Delete, task, task.id.clone(), outcome);
            record(&mut report, reporter, result);
        }

        report
    }

    async fn create(&self, environment_id: &str, task: &Task) -> ItemResult {
        let outcome = self
            .api
            .create_task(
                environment_id,
                &task.remote_command(),
                &task.frequency,
                &task.label,
                task.server_id_opt(),
            )
            .await;

        match outcome {
            Ok(id) => item_result(Operation::Create, task, Some(id), Ok(())),
            Err(e) => item_result(Operation::Create, task, None, Err(e)),
        }
    }

    async fn edit(&self, environment_id: &str, edit: &PlannedEdit) -> ItemResult {
        let task = &edit.task;
        let id = task.id.as_deref().unwrap_or_default();

        let (operation, outcome) = if edit.needs_full_update() {
            let outcome = self
                .api
                .update_task(
                    environment_id,
                    id,
                    &task.remote_command(),
                    &task.frequency,
                    &task.label,
                    task.server_id_opt(),
                )
                .await;
            (Operation::Update, outcome)
        } else if task.status {
            (
                Operation::Enable,
                self.api.enable_task(environment_id, id).await,
            )
        } else {
            (
                Operation::Disable,
                self.api.disable_task(environment_id, id).await,
            )
        };

        item_result(operation, task, task.id.clone(), outcome)
    }
}

fn item_result(
    operation: Operation,
    task: &Task,
    id: Option<String>,
    outcome: Result<(), ApiError>,
) -> ItemResult {
    let outcome = match outcome {
        Ok(()) => {
            info!(
                label = %task.label,
                id = id.as_deref().unwrap_or_default(),
                "scheduled task has been {}",
                operation.done()
            );
            ItemOutcome::Succeeded
        }
        Err(e) => {
            error!(
                label = %task.label,
                id = id.as_deref().unwrap_or_default(),
                error = %e,
                "{operation} operation failed"
            );
            ItemOutcome::Failed {
                reason: e.to_string().trim().to_string(),
            }
        }
    };

    ItemResult {
        operation,
        label: task.label.clone(),
        id,
        outcome,
    }
}

fn record<R: Reporter + ?Sized>(report: &mut ApplyReport, reporter: &mut R, result: ItemResult) {
    reporter.item(&result);
    report.push(result);
}
