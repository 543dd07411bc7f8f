//! Credential commands.

use anyhow::Result;
use clap::{Args, Subcommand};
use colored::Colorize;

use crate::auth::fetch_token;
use crate::config::Credentials;
use crate::output::{print_info, print_success};

use super::CommandContext;

/// Credential commands.
#[derive(Debug, Args)]
pub struct AuthCommand {
    #[command(subcommand)]
    command: AuthSubcommand,
}

#[derive(Debug, Subcommand)]
enum AuthSubcommand {
    /// Verify and store an API key and secret.
    Login(LoginArgs),

    /// Remove stored credentials.
    Logout,

    /// Show which credentials are in use and whether they work.
    Status,
}

#[derive(Debug, Args)]
struct LoginArgs {
    /// API key.
    #[arg(long)]
    key: String,

    /// API secret.
    #[arg(long)]
    secret: String,
}

impl AuthCommand {
    pub async fn run(self, ctx: CommandContext) -> Result<()> {
        match self.command {
            AuthSubcommand::Login(args) => login(ctx, args).await,
            AuthSubcommand::Logout => logout(),
            AuthSubcommand::Status => status(ctx).await,
        }
    }
}

/// Exchange the credentials once, then save them.
async fn login(ctx: CommandContext, args: LoginArgs) -> Result<()> {
    let creds = Credentials::new(args.key, args.secret);
    fetch_token(&ctx.config()?, &creds).await?;

    let path = creds.save()?;
    print_success(&format!("Credentials saved to {}.", path.display()));
    Ok(())
}

fn logout() -> Result<()> {
    Credentials::delete()?;
    print_success("Credentials removed.");
    Ok(())
}

async fn status(ctx: CommandContext) -> Result<()> {
    let Some(creds) = ctx.credentials()? else {
        println!("{} Not authenticated", "Status:".red().bold());
        println!("\nRun {} to log in.", "cronctl auth login".cyan());
        return Ok(());
    };

    print_info(&format!("API key: {}", creds.masked_key()));
    let config = ctx.config()?;
    print_info(&format!("Token URL: {}", config.token_url));

    let token = fetch_token(&config, &creds).await?;
    println!("{} Authenticated", "Status:".green().bold());
    if let Some(expires_at) = token.expires_at {
        println!("  Token expires: {}", expires_at);
    }

    Ok(())
}
