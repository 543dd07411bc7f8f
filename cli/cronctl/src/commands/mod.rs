//! CLI commands.

mod auth;
mod render;
mod sync;
mod tasks;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};

use crate::client::ApiClient;
use crate::cloud::CloudApi;
use crate::config::{config_dir, Config, Credentials};
use crate::error::CliError;
use crate::output::OutputFormat;

/// cronctl - Keep scheduled tasks in sync with layered YAML config.
#[derive(Debug, Parser)]
#[command(name = "cronctl")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Output format (table or json).
    #[arg(long, global = true, default_value = "table")]
    format: String,

    /// Directory holding blt.yml, crons.yml and <application>.crons.yml.
    #[arg(long, global = true, default_value = "blt", env = "CRONSYNC_CONFIG_DIR")]
    config_dir: PathBuf,

    /// Cloud API base URL (overrides config.json).
    #[arg(long, global = true, env = "CRONSYNC_API_URL")]
    api_url: Option<String>,

    /// Log filter used when RUST_LOG is not set.
    #[arg(long, global = true, default_value = "warn", env = "CRONSYNC_LOG_LEVEL")]
    pub log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Synchronize scheduled tasks with the configuration.
    #[command(alias = "crons")]
    Sync(sync::SyncCommand),

    /// Print the configured tasks for an environment, without calling the API.
    Render(render::RenderCommand),

    /// Inspect remote scheduled tasks.
    Tasks(tasks::TasksCommand),

    /// Manage API credentials.
    Auth(auth::AuthCommand),

    /// Show CLI version.
    Version,
}

/// Application and environment names, falling back to the hosting environment.
#[derive(Debug, Args)]
pub struct TargetArgs {
    /// Application name.
    #[arg(env = "AH_SITE_GROUP")]
    application: Option<String>,

    /// Environment name.
    #[arg(env = "AH_SITE_ENVIRONMENT")]
    environment: Option<String>,
}

impl TargetArgs {
    pub fn require(self) -> Result<(String, String)> {
        let application = self.application.filter(|a| !a.is_empty()).ok_or_else(|| {
            anyhow::anyhow!("Application not passed and not available in ENV as well.")
        })?;
        let environment = self.environment.filter(|e| !e.is_empty()).ok_or_else(|| {
            anyhow::anyhow!("Environment not passed and not available in ENV as well.")
        })?;
        Ok((application, environment))
    }
}

/// Process exit status of a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    /// In sync, or every change applied.
    Success,
    /// At least one change failed to apply.
    Failure,
    /// Dry run found pending changes.
    Pending,
}

impl ExitStatus {
    pub fn code(self) -> i32 {
        match self {
            Self::Success => 0,
            Self::Failure => 1,
            Self::Pending => 2,
        }
    }
}

impl Cli {
    pub fn output_format(&self) -> OutputFormat {
        match self.format.as_str() {
            "json" => OutputFormat::Json,
            _ => OutputFormat::Table,
        }
    }

    /// Run the CLI command.
    pub async fn run(self) -> Result<ExitStatus> {
        let ctx = CommandContext {
            format: self.output_format(),
            config_dir: self.config_dir,
            api_url: self.api_url,
            home: None,
        };

        self.command.run(ctx).await
    }
}

impl Commands {
    async fn run(self, ctx: CommandContext) -> Result<ExitStatus> {
        match self {
            Commands::Sync(cmd) => cmd.run(ctx).await,
            Commands::Render(cmd) => cmd.run(ctx).map(|_| ExitStatus::Success),
            Commands::Tasks(cmd) => cmd.run(ctx).await.map(|_| ExitStatus::Success),
            Commands::Auth(cmd) => cmd.run(ctx).await.map(|_| ExitStatus::Success),
            Commands::Version => {
                println!("cronctl {}", env!("CARGO_PKG_VERSION"));
                Ok(ExitStatus::Success)
            }
        }
    }
}

/// Shared command context.
///
/// Nothing is read from disk up front; commands that talk to the API load
/// `config.json` and credentials when they need them.
pub struct CommandContext {
    pub format: OutputFormat,
    pub config_dir: PathBuf,
    api_url: Option<String>,
    /// Directory holding `config.json` and `credentials.json`; the platform
    /// config directory when unset.
    home: Option<PathBuf>,
}

impl CommandContext {
    fn home(&self) -> Result<PathBuf> {
        match &self.home {
            Some(home) => Ok(home.clone()),
            None => config_dir(),
        }
    }

    /// CLI config with the `--api-url` override applied.
    pub fn config(&self) -> Result<Config> {
        let mut config = Config::load_from(&self.home()?)?;
        if let Some(api_url) = &self.api_url {
            config.api_url = api_url.clone();
        }
        Ok(config)
    }

    pub fn credentials(&self) -> Result<Option<Credentials>> {
        Credentials::load_from(&self.home()?)
    }

    /// Get an authenticated cloud API adapter.
    pub async fn cloud(&self) -> Result<CloudApi> {
        let config = self.config()?;
        let credentials = self.credentials()?.ok_or(CliError::NotAuthenticated)?;
        let token = crate::auth::fetch_token(&config, &credentials).await?;
        let client = ApiClient::new(&config, Some(&token.token))?;
        Ok(CloudApi::new(client))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(ExitStatus::Success, 0)]
    #[case(ExitStatus::Failure, 1)]
    #[case(ExitStatus::Pending, 2)]
    fn test_exit_codes(#[case] status: ExitStatus, #[case] code: i32) {
        assert_eq!(status.code(), code);
    }

    #[test]
    fn test_sync_alias_and_flags() {
        let cli = Cli::try_parse_from([
            "cronctl",
            "crons",
            "mysite",
            "prod",
            "--dry-run",
            "--no-delete",
            "--format",
            "json",
        ])
        .unwrap();
        assert_eq!(cli.output_format(), OutputFormat::Json);
        assert!(matches!(cli.command, Commands::Sync(_)));
    }

    #[tokio::test]
    async fn test_offline_commands_ignore_broken_credentials() {
        let home = tempfile::TempDir::new().unwrap();
        std::fs::write(home.path().join("credentials.json"), "{ not json").unwrap();
        std::fs::write(home.path().join("config.json"), "[").unwrap();

        let blt = tempfile::TempDir::new().unwrap();
        std::fs::write(
            blt.path().join("crons.yml"),
            "crons:\n  tasks:\n    cron:\n      command: drush cron\n      frequency: '0 * * * *'\n",
        )
        .unwrap();

        for args in [vec!["cronctl", "render", "mysite", "dev"], vec!["cronctl", "version"]] {
            let cli = Cli::try_parse_from(args).unwrap();
            let ctx = CommandContext {
                format: cli.output_format(),
                config_dir: blt.path().to_path_buf(),
                api_url: None,
                home: Some(home.path().to_path_buf()),
            };
            assert_eq!(cli.command.run(ctx).await.unwrap(), ExitStatus::Success);
        }
    }

    #[test]
    fn test_config_is_loaded_on_demand() {
        let home = tempfile::TempDir::new().unwrap();
        std::fs::write(home.path().join("config.json"), "[").unwrap();
        let ctx = CommandContext {
            format: OutputFormat::Table,
            config_dir: PathBuf::from("blt"),
            api_url: None,
            home: Some(home.path().to_path_buf()),
        };
        assert!(ctx.config().is_err());
    }

    #[test]
    fn test_target_requires_application() {
        let target = TargetArgs {
            application: None,
            environment: Some("dev".to_string()),
        };
        let err = target.require().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Application not passed and not available in ENV as well."
        );
    }
}
