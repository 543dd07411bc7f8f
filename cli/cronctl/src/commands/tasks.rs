//! Remote task commands.

use anyhow::Result;
use clap::{Args, Subcommand};
use cronsync_reconcile::{ConfigDocument, Reconciler};

use crate::output::{print_output, task_rows};

use super::{CommandContext, TargetArgs};

/// Remote task commands.
#[derive(Debug, Args)]
pub struct TasksCommand {
    #[command(subcommand)]
    command: TasksSubcommand,
}

#[derive(Debug, Subcommand)]
enum TasksSubcommand {
    /// List the scheduled tasks of an environment in canonical form.
    List(ListTasksArgs),
}

#[derive(Debug, Args)]
struct ListTasksArgs {
    #[command(flatten)]
    target: TargetArgs,
}

impl TasksCommand {
    pub async fn run(self, ctx: CommandContext) -> Result<()> {
        match self.command {
            TasksSubcommand::List(args) => list_tasks(ctx, args).await,
        }
    }
}

async fn list_tasks(ctx: CommandContext, args: ListTasksArgs) -> Result<()> {
    let (application, environment) = args.target.require()?;

    let cloud = ctx.cloud().await?;
    let no_sources: Vec<ConfigDocument> = Vec::new();
    let reconciler = Reconciler::new(&cloud, &cloud, &no_sources);

    let (_, environment_id) = reconciler
        .resolve_target(&application, &environment)
        .await?;
    let tasks = reconciler.actual_state(&environment_id).await?;

    print_output(&task_rows(tasks.values()), ctx.format);
    Ok(())
}
