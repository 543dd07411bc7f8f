//! Reconciliation errors.

use thiserror::Error;

use crate::api::ApiError;

/// Fatal errors that abort a reconciliation run before anything is applied.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// The application name did not match any application visible to the API credentials.
    #[error(
        "impossible to find an application \"{0}\"; verify the application exists and the API credentials have the appropriate permissions"
    )]
    ApplicationNotFound(String),

    /// The environment name did not match any environment of the application.
    #[error(
        "impossible to find an environment \"{environment}\" within application \"{application}\" ({application_id}); verify the environment exists and the API credentials have the appropriate permissions"
    )]
    EnvironmentNotFound {
        application: String,
        application_id: String,
        environment: String,
    },

    /// Config documents could not be loaded or parsed.
    #[error("failed to load task configuration: {0}")]
    Source(String),

    /// A configured task cannot be turned into a canonical task.
    #[error("invalid task \"{label}\": {reason}")]
    InvalidTask { label: String, reason: String },

    /// Two configured tasks resolve to the same label.
    #[error("label \"{label}\" is declared by both \"{first}\" and \"{second}\"")]
    DuplicateLabel {
        label: String,
        first: String,
        second: String,
    },

    /// A remote call needed before the diff (identity lookup, task listing) failed.
    #[error("remote API error: {0}")]
    Api(#[from] ApiError),
}

impl ReconcileError {
    pub(crate) fn invalid_task(label: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidTask {
            label: label.into(),
            reason: reason.into(),
        }
    }
}
