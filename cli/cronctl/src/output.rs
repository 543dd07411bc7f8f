//! Output formatting for CLI commands.

use colored::Colorize;
use cronsync_reconcile::{ItemOutcome, ItemResult, Plan, PlannedEdit, Reporter, Task};
use serde::Serialize;
use tabled::{Table, Tabled};

/// Output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable table format.
    #[default]
    Table,
    /// JSON format.
    Json,
}

/// Print data in the specified format.
pub fn print_output<T: Serialize + Tabled>(data: &[T], format: OutputFormat) {
    match format {
        OutputFormat::Table => {
            if data.is_empty() {
                println!("{}", "No items found.".dimmed());
            } else {
                let table = Table::new(data).to_string();
                println!("{}", table);
            }
        }
        OutputFormat::Json => print_single(&data, format),
    }
}

/// Print a single item as JSON.
pub fn print_single<T: Serialize + ?Sized>(data: &T, _format: OutputFormat) {
    let json = serde_json::to_string_pretty(data).unwrap_or_else(|_| "{}".to_string());
    println!("{}", json);
}

/// Print a success message.
pub fn print_success(message: &str) {
    println!("{} {}", "Success:".green().bold(), message);
}

/// Print an info message.
pub fn print_info(message: &str) {
    println!("{} {}", "Info:".blue().bold(), message);
}

/// Print a warning message.
pub fn print_warning(message: &str) {
    println!("{} {}", "Warning:".yellow().bold(), message);
}

/// Print a failure message without aborting.
pub fn print_failure(message: &str) {
    eprintln!("{} {}", "Error:".red().bold(), message);
}

/// A task as shown in tables.
#[derive(Debug, Clone, Serialize, Tabled)]
pub struct TaskRow {
    #[tabled(rename = "ID")]
    pub id: String,
    #[tabled(rename = "LABEL")]
    pub label: String,
    #[tabled(rename = "FREQUENCY")]
    pub frequency: String,
    #[tabled(rename = "COMMAND")]
    pub command: String,
    #[tabled(rename = "STATUS")]
    pub status: String,
    #[tabled(rename = "SERVER")]
    pub server: String,
}

impl From<&Task> for TaskRow {
    fn from(task: &Task) -> Self {
        Self {
            id: task.id.clone().unwrap_or_else(|| "-".to_string()),
            label: task.label.clone(),
            frequency: task.frequency.clone(),
            command: task.command.clone(),
            status: cronsync_reconcile::task::status_label(task.status).to_string(),
            server: cronsync_reconcile::task::server_label(&task.server_id).to_string(),
        }
    }
}

pub fn task_rows<'a>(tasks: impl IntoIterator<Item = &'a Task>) -> Vec<TaskRow> {
    tasks.into_iter().map(TaskRow::from).collect()
}

/// Prints plan sections and per-item results as a run progresses.
///
/// In JSON mode nothing is printed while running; the command prints the
/// final outcome instead.
#[derive(Debug, Clone, Copy)]
pub struct TerminalReporter {
    format: OutputFormat,
}

impl TerminalReporter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }
}

impl Reporter for TerminalReporter {
    fn plan(&mut self, plan: &Plan) {
        if self.format == OutputFormat::Json {
            return;
        }

        if !plan.to_create.is_empty() {
            println!("{}", "Scheduled tasks to create:".bold());
            print_output(&task_rows(&plan.to_create), self.format);
        }

        if !plan.to_edit.is_empty() {
            println!("{}", "Scheduled tasks to edit:".bold());
            for edit in &plan.to_edit {
                print_edit(edit);
            }
        }

        if !plan.to_delete.is_empty() {
            println!("{}", "Scheduled tasks to delete:".bold());
            print_output(&task_rows(&plan.to_delete), self.format);
        }
    }

    fn item(&mut self, result: &ItemResult) {
        if self.format == OutputFormat::Json {
            return;
        }

        let id = result.id.as_deref().unwrap_or("-");
        match &result.outcome {
            ItemOutcome::Succeeded => print_success(&format!(
                "Scheduled task \"{}\" ({}) has been {}.",
                result.label,
                id,
                result.operation.done()
            )),
            ItemOutcome::Failed { reason } => print_failure(&format!(
                "{} operation failed for scheduled task \"{}\" ({}): {}",
                result.operation, result.label, id, reason
            )),
        }
    }
}

fn print_edit(edit: &PlannedEdit) {
    println!(
        "  {} ({})",
        edit.task.label.cyan(),
        edit.task.id.as_deref().unwrap_or("-")
    );
    for change in &edit.changes {
        println!(
            "    {}: {} {}",
            change.field,
            change.after,
            format!("(Previously {})", change.before).dimmed()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_row_labels() {
        let task = Task {
            id: None,
            label: "cron".to_string(),
            command: "drush cron".to_string(),
            frequency: "0 * * * *".to_string(),
            status: false,
            server_id: String::new(),
        };
        let row = TaskRow::from(&task);
        assert_eq!(row.id, "-");
        assert_eq!(row.status, "Disabled");
        assert_eq!(row.server, "- Any server -");
    }
}
