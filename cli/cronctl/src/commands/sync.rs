//! Synchronize remote scheduled tasks with the configuration.

use anyhow::Result;
use clap::Args;
use cronsync_reconcile::{ReconcileOptions, ReconcileOutcome, Reconciler};

use crate::output::{
    print_failure, print_single, print_success, print_warning, OutputFormat, TerminalReporter,
};
use crate::sources::YamlSources;

use super::{CommandContext, ExitStatus, TargetArgs};

/// Synchronize scheduled tasks.
#[derive(Debug, Args)]
pub struct SyncCommand {
    #[command(flatten)]
    target: TargetArgs,

    /// Show what would change without changing anything.
    #[arg(long)]
    dry_run: bool,

    /// Never delete remote scheduled tasks.
    #[arg(long)]
    no_delete: bool,
}

impl SyncCommand {
    pub async fn run(self, ctx: CommandContext) -> Result<ExitStatus> {
        let (application, environment) = self.target.require()?;
        let options = ReconcileOptions {
            dry_run: self.dry_run,
            no_delete: self.no_delete,
        };

        let cloud = ctx.cloud().await?;
        let sources = YamlSources::new(&ctx.config_dir);
        let mut reporter = TerminalReporter::new(ctx.format);

        let outcome = Reconciler::new(&cloud, &cloud, &sources)
            .reconcile(&application, &environment, options, &mut reporter)
            .await?;

        let status = exit_status(&outcome);

        match ctx.format {
            OutputFormat::Json => print_single(&outcome, ctx.format),
            OutputFormat::Table => match &outcome {
                ReconcileOutcome::UpToDate => {
                    print_success("All scheduled tasks are up-to-date.");
                }
                ReconcileOutcome::Pending { .. } => {
                    print_warning("Scheduled tasks are out of sync. Run without --dry-run to apply.");
                }
                ReconcileOutcome::Applied { report, .. } if report.is_success() => {
                    print_success("Scheduled tasks have been synchronized.");
                }
                ReconcileOutcome::Applied { report, .. } => {
                    print_failure(&format!(
                        "At least one operation failed ({} of {}).",
                        report.failures().count(),
                        report.items.len()
                    ));
                }
            },
        }

        Ok(status)
    }
}

fn exit_status(outcome: &ReconcileOutcome) -> ExitStatus {
    match outcome {
        ReconcileOutcome::Pending { .. } => ExitStatus::Pending,
        other if other.is_success() => ExitStatus::Success,
        _ => ExitStatus::Failure,
    }
}
