//! Error handling and display for the CLI.

use colored::Colorize;
use cronsync_reconcile::{ApiError, ReconcileError};
use thiserror::Error;

/// CLI-specific errors.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("Not authenticated. Run `cronctl auth login` or set CRONSYNC_API_KEY and CRONSYNC_API_SECRET.")]
    NotAuthenticated,

    #[error("Authentication failed: {message}")]
    Auth { status: u16, message: String },

    #[error("API error: {message}")]
    Api {
        status: u16,
        code: String,
        message: String,
    },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl CliError {
    /// Create an API error from response details.
    pub fn api(status: u16, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            code: code.into(),
            message: message.into(),
        }
    }
}

impl From<CliError> for ApiError {
    fn from(err: CliError) -> Self {
        match err {
            CliError::Api {
                status, message, ..
            }
            | CliError::Auth { status, message } => ApiError::status(status, message),
            CliError::NotAuthenticated => ApiError::status(401, err.to_string()),
            CliError::Network(e) => ApiError::Transport(e.to_string()),
            CliError::Other(e) => ApiError::Decode(e.to_string()),
        }
    }
}

/// Print an error in a user-friendly format.
pub fn print_error(err: &anyhow::Error) {
    eprintln!("{} {}", "Error:".red().bold(), err);

    // Check for specific error types and provide hints
    if let Some(cli_err) = err.downcast_ref::<CliError>() {
        match cli_err {
            CliError::NotAuthenticated => {
                eprintln!(
                    "\n{}",
                    "Hint: Run `cronctl auth login --key <KEY> --secret <SECRET>`.".yellow()
                );
            }
            CliError::Auth { .. } => {
                eprintln!(
                    "\n{}",
                    "Hint: Check the API key and secret, or the token URL in config.json."
                        .yellow()
                );
            }
            CliError::Api { status, .. } if *status == 403 => {
                eprintln!(
                    "\n{}",
                    "Hint: The API credentials may not have permission for this operation."
                        .yellow()
                );
            }
            CliError::Network(_) => {
                eprintln!(
                    "\n{}",
                    "Hint: Check your network connection and API endpoint.".yellow()
                );
            }
            _ => {}
        }
    }

    if let Some(reconcile_err) = err.downcast_ref::<ReconcileError>() {
        match reconcile_err {
            ReconcileError::Api(ApiError::Status { status: 401, .. }) => {
                eprintln!(
                    "\n{}",
                    "Hint: The access token was rejected. Run `cronctl auth status`.".yellow()
                );
            }
            ReconcileError::Api(ApiError::Transport(_)) => {
                eprintln!(
                    "\n{}",
                    "Hint: Check your network connection and API endpoint.".yellow()
                );
            }
            ReconcileError::InvalidTask { .. } | ReconcileError::DuplicateLabel { .. } => {
                eprintln!(
                    "\n{}",
                    "Hint: Run `cronctl render <ENVIRONMENT>` to inspect the merged configuration."
                        .yellow()
                );
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_error_maps_to_api_error() {
        let err: ApiError = CliError::api(404, "not_found", "No such cron").into();
        assert_eq!(err, ApiError::status(404, "No such cron"));

        let err: ApiError = CliError::NotAuthenticated.into();
        assert!(matches!(err, ApiError::Status { status: 401, .. }));

        let err: ApiError = CliError::Other(anyhow::anyhow!("bad json")).into();
        assert_eq!(err, ApiError::Decode("bad json".to_string()));
    }
}
