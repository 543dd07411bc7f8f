//! cronctl - keeps an environment's scheduled tasks in sync with YAML config.
//!
//! Reads `blt.yml`, `crons.yml` and `<application>.crons.yml`, compares the
//! result with the tasks stored on the cloud platform, and creates, edits or
//! deletes remote tasks until both agree.

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod auth;
mod client;
mod cloud;
mod commands;
mod config;
mod error;
mod output;
mod sources;

use commands::{Cli, ExitStatus};
use output::OutputFormat;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level, cli.output_format());

    match cli.run().await {
        Ok(ExitStatus::Success) => Ok(()),
        Ok(status) => std::process::exit(status.code()),
        Err(e) => {
            // Print error in a user-friendly way
            error::print_error(&e);
            std::process::exit(1);
        }
    }
}

/// Logs go to stderr so stdout stays parseable; JSON output gets JSON logs.
fn init_tracing(log_level: &str, format: OutputFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    let json = format == OutputFormat::Json;

    tracing_subscriber::registry()
        .with(filter)
        .with(json.then(|| fmt::layer().json().with_writer(std::io::stderr)))
        .with((!json).then(|| fmt::layer().with_target(false).with_writer(std::io::stderr)))
        .init();
}
