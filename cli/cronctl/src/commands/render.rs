//! Offline view of the configured tasks.

use std::collections::BTreeMap;

use anyhow::Result;
use clap::Args;
use cronsync_reconcile::{normalize_desired, resolve_desired, ConfigSource};

use crate::output::{print_info, print_output, task_rows, OutputFormat};
use crate::sources::YamlSources;

use super::{CommandContext, TargetArgs};

/// Print the desired tasks after merge and overrides.
///
/// Server names are shown as configured, since nothing is resolved remotely.
#[derive(Debug, Args)]
pub struct RenderCommand {
    #[command(flatten)]
    target: TargetArgs,
}

impl RenderCommand {
    pub fn run(self, ctx: CommandContext) -> Result<()> {
        let (application, environment) = self.target.require()?;

        let sources = YamlSources::new(&ctx.config_dir);
        let documents = sources.load(&application)?;
        if documents.is_empty() && ctx.format == OutputFormat::Table {
            print_info(&format!(
                "No config files found in {}.",
                ctx.config_dir.display()
            ));
        }

        let (settings, resolved) = resolve_desired(&documents, &environment);

        let servers: BTreeMap<String, String> = resolved
            .values()
            .filter_map(|task| task.server.clone())
            .map(|name| (name.clone(), name))
            .collect();
        let default_server = settings.default_server.unwrap_or_default();

        let tasks = normalize_desired(resolved, &default_server, &servers)?;
        print_output(&task_rows(tasks.values()), ctx.format);

        Ok(())
    }
}
