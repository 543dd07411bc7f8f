//! Canonical task model.
//!
//! Desired tasks (from config) and actual tasks (from the remote API) are both
//! converted into [`Task`] before they are compared.

use serde::{Deserialize, Serialize};

use crate::report::FieldChange;

/// Prefix the remote platform puts in front of the command of a disabled task.
pub const DISABLED_MARKER: &str = "# ";

/// A scheduled task in canonical form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Remote-assigned identifier. `None` until the task exists remotely.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    pub label: String,

    /// Command without the disabled marker.
    pub command: String,

    /// Five space-separated cron fields: minute hour day-of-month month day-of-week.
    pub frequency: String,

    /// Whether the task is enabled.
    pub status: bool,

    /// Server the task is pinned to. Empty means any server.
    #[serde(default)]
    pub server_id: String,
}

impl Task {
    /// Command as the remote platform stores it.
    pub fn remote_command(&self) -> String {
        encode_command(&self.command, self.status)
    }

    /// Server id for mutation calls, `None` when the task may run on any server.
    pub fn server_id_opt(&self) -> Option<&str> {
        if self.server_id.is_empty() {
            None
        } else {
            Some(&self.server_id)
        }
    }

    /// Whether moving from `before` to `self` requires a full update call.
    ///
    /// Only command, frequency, label and server id count; a change limited to
    /// `status` is applied with an enable/disable call instead.
    pub fn needs_full_update(&self, before: &Task) -> bool {
        self.command != before.command
            || self.frequency != before.frequency
            || self.label != before.label
            || self.server_id != before.server_id
    }

    /// Fields whose values differ between `before` and `self`.
    pub fn changes_from(&self, before: &Task) -> Vec<FieldChange> {
        let mut changes = Vec::new();

        if self.label != before.label {
            changes.push(FieldChange::new("label", &before.label, &self.label));
        }
        if self.command != before.command {
            changes.push(FieldChange::new("command", &before.command, &self.command));
        }
        if self.frequency != before.frequency {
            changes.push(FieldChange::new(
                "frequency",
                &before.frequency,
                &self.frequency,
            ));
        }
        if self.status != before.status {
            changes.push(FieldChange::new(
                "status",
                status_label(before.status),
                status_label(self.status),
            ));
        }
        if self.server_id != before.server_id {
            changes.push(FieldChange::new(
                "server_id",
                server_label(&before.server_id),
                server_label(&self.server_id),
            ));
        }

        changes
    }
}

/// Human-readable status.
pub fn status_label(status: bool) -> &'static str {
    if status {
        "Enabled"
    } else {
        "Disabled"
    }
}

/// Human-readable server id.
pub fn server_label(server_id: &str) -> &str {
    if server_id.is_empty() {
        "- Any server -"
    } else {
        server_id
    }
}

/// Encode a canonical command for the remote platform.
///
/// Disabled tasks are sent with the marker prepended so they are created (or
/// updated) directly in the disabled state.
pub fn encode_command(command: &str, enabled: bool) -> String {
    if enabled {
        command.to_string()
    } else {
        format!("{DISABLED_MARKER}{command}")
    }
}

/// Decode a command read from the remote platform.
///
/// The marker is only stripped from disabled tasks; an enabled task whose
/// command happens to start with `"# "` keeps it.
pub fn decode_command(raw: &str, enabled: bool) -> String {
    if enabled {
        return raw.to_string();
    }
    raw.strip_prefix(DISABLED_MARKER).unwrap_or(raw).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(command: &str, status: bool) -> Task {
        Task {
            id: Some("42".to_string()),
            label: "cron".to_string(),
            command: command.to_string(),
            frequency: "*/5 * * * *".to_string(),
            status,
            server_id: String::new(),
        }
    }

    #[test]
    fn test_disabled_command_round_trip() {
        let encoded = encode_command("drush cron", false);
        assert_eq!(encoded, "# drush cron");
        assert_eq!(decode_command(&encoded, false), "drush cron");
    }

    #[test]
    fn test_enabled_command_keeps_leading_hash() {
        assert_eq!(encode_command("drush cron", true), "drush cron");
        assert_eq!(decode_command("# drush cron", true), "# drush cron");
    }

    #[test]
    fn test_decode_without_marker_is_unchanged() {
        assert_eq!(decode_command("#drush cron", false), "#drush cron");
        assert_eq!(decode_command("drush cron", false), "drush cron");
    }

    #[test]
    fn test_status_only_change_is_not_full_update() {
        let before = task("drush cron", true);
        let after = task("drush cron", false);

        assert!(!after.needs_full_update(&before));
        let changes = after.changes_from(&before);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].field, "status");
        assert_eq!(changes[0].before, "Enabled");
        assert_eq!(changes[0].after, "Disabled");
    }

    #[test]
    fn test_server_change_is_full_update() {
        let before = task("drush cron", true);
        let mut after = before.clone();
        after.server_id = "srv-1".to_string();

        assert!(after.needs_full_update(&before));
        assert_eq!(after.server_id_opt(), Some("srv-1"));
        assert_eq!(before.server_id_opt(), None);
        let changes = after.changes_from(&before);
        assert_eq!(changes[0].before, "- Any server -");
    }
}
