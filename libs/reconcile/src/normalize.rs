//! Normalization of desired and remote records into canonical [`Task`]s.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::ReconcileError;
use crate::overrides::ResolvedTask;
use crate::source::Scalar;
use crate::task::{decode_command, Task};

/// Number of fields in a cron expression.
const CRON_FIELDS: usize = 5;

/// Wildcard used for cron fields that are not configured.
const CRON_WILDCARD: &str = "*";

/// A scheduled task as returned by the remote API.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteTask {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,

    #[serde(default)]
    pub label: Option<String>,

    #[serde(default)]
    pub command: Option<String>,

    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub minute: Option<String>,

    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub hour: Option<String>,

    #[serde(default, alias = "dayMonth", deserialize_with = "opt_string_or_number")]
    pub day_month: Option<String>,

    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub month: Option<String>,

    #[serde(default, alias = "dayWeek", deserialize_with = "opt_string_or_number")]
    pub day_week: Option<String>,

    #[serde(default)]
    pub flags: RemoteFlags,

    #[serde(default)]
    pub server: Option<RemoteServer>,
}

/// Flags of a remote task.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteFlags {
    #[serde(default)]
    pub enabled: Option<bool>,
}

/// Server a remote task is pinned to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteServer {
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub id: Option<String>,
}

impl RemoteTask {
    /// Key used to match this task against the desired state.
    ///
    /// Unlabeled tasks fall back to their id.
    pub fn key(&self) -> &str {
        match self.label.as_deref() {
            Some(label) if !label.is_empty() => label,
            _ => &self.id,
        }
    }

    /// Convert to canonical form.
    pub fn into_task(self) -> Task {
        let status = self.flags.enabled.unwrap_or(false);
        let command = decode_command(self.command.as_deref().unwrap_or_default(), status);
        let frequency = [
            &self.minute,
            &self.hour,
            &self.day_month,
            &self.month,
            &self.day_week,
        ]
        .into_iter()
        .map(|field| field.as_deref().unwrap_or(CRON_WILDCARD))
        .collect::<Vec<_>>()
        .join(" ");

        Task {
            id: Some(self.id),
            label: self.label.unwrap_or_default(),
            command,
            frequency,
            status,
            server_id: self.server.and_then(|s| s.id).unwrap_or_default(),
        }
    }
}

/// Normalize the remote task list into a map keyed by label (or id).
///
/// When two remote tasks share a label the later one wins.
pub fn normalize_remote(remote: Vec<RemoteTask>) -> BTreeMap<String, Task> {
    let mut tasks = BTreeMap::new();

    for record in remote {
        let key = record.key().to_string();
        let task = record.into_task();
        if let Some(previous) = tasks.insert(key.clone(), task) {
            tracing::warn!(
                label = %key,
                shadowed_id = previous.id.as_deref().unwrap_or_default(),
                "duplicate remote task label; only the last one is reconciled"
            );
        }
    }

    tasks
}

/// Normalize resolved config tasks into canonical tasks keyed by label.
///
/// `named_servers` maps server names used by individual tasks to their ids.
/// Tasks without a server of their own, or whose server could not be
/// resolved, use `default_server_id`.
pub fn normalize_desired(
    raw: BTreeMap<String, ResolvedTask>,
    default_server_id: &str,
    named_servers: &BTreeMap<String, String>,
) -> Result<BTreeMap<String, Task>, ReconcileError> {
    let mut tasks: BTreeMap<String, Task> = BTreeMap::new();
    let mut declared_by: BTreeMap<String, String> = BTreeMap::new();

    for (key, fields) in raw {
        let label = fields.label.clone().unwrap_or_else(|| key.clone());
        if label.trim().is_empty() {
            return Err(ReconcileError::invalid_task(key, "label cannot be empty"));
        }

        let command = match fields.command.as_deref() {
            Some(command) if !command.trim().is_empty() => command.to_string(),
            _ => return Err(ReconcileError::invalid_task(label, "missing command")),
        };

        let frequency = desired_frequency(&fields)
            .map_err(|reason| ReconcileError::invalid_task(&label, reason))?;

        let status = fields.status.as_ref().map_or(true, Scalar::is_truthy);

        let server_id = fields
            .server
            .as_ref()
            .and_then(|name| named_servers.get(name))
            .cloned()
            .unwrap_or_else(|| default_server_id.to_string());

        if let Some(first) = declared_by.insert(label.clone(), key.clone()) {
            return Err(ReconcileError::DuplicateLabel {
                label,
                first,
                second: key,
            });
        }

        tasks.insert(
            label.clone(),
            Task {
                id: None,
                label,
                command,
                frequency,
                status,
                server_id,
            },
        );
    }

    Ok(tasks)
}

/// Canonical frequency of a configured task.
fn desired_frequency(fields: &ResolvedTask) -> Result<String, String> {
    let expression = match &fields.frequency {
        Some(frequency) => frequency.clone(),
        None => {
            let split = [
                &fields.minute,
                &fields.hour,
                &fields.day_month,
                &fields.month,
                &fields.day_week,
            ];
            if split.iter().all(|field| field.is_none()) {
                return Err("missing frequency".to_string());
            }
            split
                .into_iter()
                .map(|field| {
                    field
                        .as_ref()
                        .map_or_else(|| CRON_WILDCARD.to_string(), Scalar::to_string)
                })
                .collect::<Vec<_>>()
                .join(" ")
        }
    };

    let parts: Vec<&str> = expression.split_whitespace().collect();
    if parts.len() != CRON_FIELDS {
        return Err(format!(
            "frequency \"{expression}\" must have {CRON_FIELDS} fields, found {}",
            parts.len()
        ));
    }

    Ok(parts.join(" "))
}

/// Identifiers the API sends either as strings or as numbers.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Text(String),
    Number(i64),
}

impl From<RawId> for String {
    fn from(id: RawId) -> Self {
        match id {
            RawId::Text(s) => s,
            RawId::Number(n) => n.to_string(),
        }
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    RawId::deserialize(deserializer).map(String::from)
}

fn opt_string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<RawId>::deserialize(deserializer)?.map(String::from))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::TaskPatch;
    use crate::task::encode_command;

    fn remote(json: serde_json::Value) -> RemoteTask {
        serde_json::from_value(json).unwrap()
    }

    fn resolved(command: &str, frequency: &str) -> ResolvedTask {
        TaskPatch {
            command: Some(command.to_string()),
            frequency: Some(frequency.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_remote_task_from_api_payload() {
        let task = remote(serde_json::json!({
            "id": 43595,
            "label": "Drupal cron",
            "command": "# drush cron",
            "minute": "*/15",
            "hour": "*",
            "day_month": "*",
            "month": "*",
            "day_week": "1-5",
            "flags": { "enabled": false, "system": false },
            "server": { "id": 7, "name": "web-7" },
            "environment": { "id": "env-1" }
        }))
        .into_task();

        assert_eq!(task.id.as_deref(), Some("43595"));
        assert_eq!(task.label, "Drupal cron");
        assert_eq!(task.command, "drush cron");
        assert_eq!(task.frequency, "*/15 * * * 1-5");
        assert!(!task.status);
        assert_eq!(task.server_id, "7");
    }

    #[test]
    fn test_remote_defaults_when_fields_missing() {
        let task = remote(serde_json::json!({
            "id": "1",
            "command": "# drush cron",
            "server": null
        }))
        .into_task();

        assert!(!task.status);
        assert_eq!(task.command, "drush cron");
        assert_eq!(task.frequency, "* * * * *");
        assert_eq!(task.server_id, "");
        assert_eq!(task.label, "");
    }

    #[test]
    fn test_remote_numeric_cron_fields() {
        let tasks: Vec<RemoteTask> = serde_json::from_value(serde_json::json!([
            {
                "id": 1,
                "label": "nightly",
                "command": "drush nightly",
                "minute": 0,
                "hour": 2,
                "dayMonth": "*",
                "month": "*",
                "dayWeek": 0,
                "flags": { "enabled": true }
            },
            { "id": 2, "label": "cron", "minute": "*/5", "hour": null }
        ]))
        .unwrap();

        let tasks = normalize_remote(tasks);
        assert_eq!(tasks["nightly"].frequency, "0 2 * * 0");
        assert_eq!(tasks["cron"].frequency, "*/5 * * * *");
    }

    #[test]
    fn test_enabled_remote_task_keeps_hash_prefix() {
        let task = remote(serde_json::json!({
            "id": "1",
            "label": "x",
            "command": "# not a marker",
            "flags": { "enabled": true }
        }))
        .into_task();
        assert_eq!(task.command, "# not a marker");
    }

    #[test]
    fn test_normalize_remote_keys_by_label_then_id() {
        let tasks = normalize_remote(vec![
            remote(serde_json::json!({ "id": "1", "label": "cron" })),
            remote(serde_json::json!({ "id": "2" })),
            remote(serde_json::json!({ "id": "3", "label": "" })),
        ]);

        let keys: Vec<_> = tasks.keys().cloned().collect();
        assert_eq!(keys, vec!["2", "3", "cron"]);
    }

    #[test]
    fn test_normalize_remote_duplicate_label_last_wins() {
        let tasks = normalize_remote(vec![
            remote(serde_json::json!({ "id": "1", "label": "cron" })),
            remote(serde_json::json!({ "id": "2", "label": "cron" })),
        ]);
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks["cron"].id.as_deref(), Some("2"));
    }

    #[test]
    fn test_disabled_command_round_trip_through_remote() {
        let desired = Task {
            id: None,
            label: "cron".to_string(),
            command: "drush cron".to_string(),
            frequency: "0 * * * *".to_string(),
            status: false,
            server_id: String::new(),
        };
        let payload = encode_command(&desired.command, desired.status);
        assert_eq!(payload, "# drush cron");

        let back = remote(serde_json::json!({
            "id": "9",
            "label": "cron",
            "command": payload,
            "minute": "0", "hour": "*", "day_month": "*", "month": "*", "day_week": "*",
            "flags": { "enabled": false }
        }))
        .into_task();
        assert!(!back.status);
        assert_eq!(back.command, "drush cron");
    }

    #[test]
    fn test_normalize_desired_defaults() {
        let raw = BTreeMap::from([("cron".to_string(), resolved("drush cron", "0  *  * * *"))]);
        let tasks = normalize_desired(raw, "", &BTreeMap::new()).unwrap();

        let cron = &tasks["cron"];
        assert_eq!(cron.id, None);
        assert_eq!(cron.label, "cron");
        assert!(cron.status);
        assert_eq!(cron.frequency, "0 * * * *");
        assert_eq!(cron.server_id, "");
    }

    #[test]
    fn test_normalize_desired_status_coercion() {
        let mut disabled = resolved("drush cron", "0 * * * *");
        disabled.status = Some(Scalar::Int(0));
        let mut enabled = resolved("drush backup", "0 2 * * *");
        enabled.status = Some(Scalar::Text("1".to_string()));

        let tasks = normalize_desired(
            BTreeMap::from([
                ("cron".to_string(), disabled),
                ("backup".to_string(), enabled),
            ]),
            "",
            &BTreeMap::new(),
        )
        .unwrap();

        assert!(!tasks["cron"].status);
        assert!(tasks["backup"].status);
    }

    #[test]
    fn test_normalize_desired_server_ids() {
        let mut pinned = resolved("drush cron", "0 * * * *");
        pinned.server = Some("web-2".to_string());
        let mut unknown = resolved("drush queue", "0 * * * *");
        unknown.server = Some("web-9".to_string());
        let plain = resolved("drush backup", "0 2 * * *");

        let servers = BTreeMap::from([("web-2".to_string(), "srv-2".to_string())]);
        let tasks = normalize_desired(
            BTreeMap::from([
                ("cron".to_string(), pinned),
                ("queue".to_string(), unknown),
                ("backup".to_string(), plain),
            ]),
            "srv-1",
            &servers,
        )
        .unwrap();

        assert_eq!(tasks["cron"].server_id, "srv-2");
        assert_eq!(tasks["queue"].server_id, "srv-1");
        assert_eq!(tasks["backup"].server_id, "srv-1");
    }

    #[test]
    fn test_normalize_desired_composes_split_frequency() {
        let task = TaskPatch {
            command: Some("drush backup".to_string()),
            minute: Some(Scalar::Int(30)),
            hour: Some(Scalar::Int(2)),
            ..Default::default()
        };
        let tasks =
            normalize_desired(BTreeMap::from([("backup".to_string(), task)]), "", &BTreeMap::new())
                .unwrap();
        assert_eq!(tasks["backup"].frequency, "30 2 * * *");
    }

    #[test]
    fn test_normalize_desired_uses_explicit_label() {
        let mut task = resolved("drush cron", "0 * * * *");
        task.label = Some("Drupal cron".to_string());
        let tasks =
            normalize_desired(BTreeMap::from([("cron".to_string(), task)]), "", &BTreeMap::new())
                .unwrap();
        assert!(tasks.contains_key("Drupal cron"));
    }

    #[test]
    fn test_normalize_desired_rejects_invalid_tasks() {
        let missing_command = TaskPatch {
            frequency: Some("0 * * * *".to_string()),
            ..Default::default()
        };
        let err = normalize_desired(
            BTreeMap::from([("cron".to_string(), missing_command)]),
            "",
            &BTreeMap::new(),
        )
        .unwrap_err();
        assert!(matches!(err, ReconcileError::InvalidTask { .. }));

        let bad_frequency = resolved("drush cron", "0 * *");
        let err = normalize_desired(
            BTreeMap::from([("cron".to_string(), bad_frequency)]),
            "",
            &BTreeMap::new(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("5 fields"));

        let no_frequency = TaskPatch {
            command: Some("drush cron".to_string()),
            ..Default::default()
        };
        let err = normalize_desired(
            BTreeMap::from([("cron".to_string(), no_frequency)]),
            "",
            &BTreeMap::new(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("missing frequency"));
    }

    #[test]
    fn test_normalize_desired_rejects_duplicate_labels() {
        let mut a = resolved("drush cron", "0 * * * *");
        a.label = Some("cron".to_string());
        let b = resolved("drush cron --other", "0 * * * *");

        let err = normalize_desired(
            BTreeMap::from([("a".to_string(), a), ("cron".to_string(), b)]),
            "",
            &BTreeMap::new(),
        )
        .unwrap_err();
        assert!(matches!(err, ReconcileError::DuplicateLabel { .. }));
    }
}
