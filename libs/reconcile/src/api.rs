//! Collaborators the reconciler talks to.
//!
//! The engine never performs I/O itself: remote calls go through [`TaskApi`]
//! and [`IdentityResolver`], config documents come from a [`ConfigSource`].

use async_trait::async_trait;
use thiserror::Error;

use crate::error::ReconcileError;
use crate::normalize::RemoteTask;
use crate::source::ConfigDocument;

/// Errors returned by remote calls.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// The request never produced a response.
    #[error("transport error: {0}")]
    Transport(String),

    /// The API answered with an error status.
    #[error("{message} (HTTP {status})")]
    Status { status: u16, message: String },

    /// The response could not be understood.
    #[error("unexpected response: {0}")]
    Decode(String),
}

impl ApiError {
    pub fn status(status: u16, message: impl Into<String>) -> Self {
        Self::Status {
            status,
            message: message.into(),
        }
    }
}

/// Scheduled task endpoints of the remote platform.
///
/// `server_id` is `None` when the task may run on any server.
#[async_trait]
pub trait TaskApi: Send + Sync {
    async fn list_tasks(&self, environment_id: &str) -> Result<Vec<RemoteTask>, ApiError>;

    /// Create a task and return its remote id.
    async fn create_task(
        &self,
        environment_id: &str,
        command: &str,
        frequency: &str,
        label: &str,
        server_id: Option<&str>,
    ) -> Result<String, ApiError>;

    async fn update_task(
        &self,
        environment_id: &str,
        task_id: &str,
        command: &str,
        frequency: &str,
        label: &str,
        server_id: Option<&str>,
    ) -> Result<(), ApiError>;

    async fn enable_task(&self, environment_id: &str, task_id: &str) -> Result<(), ApiError>;

    async fn disable_task(&self, environment_id: &str, task_id: &str) -> Result<(), ApiError>;

    async fn delete_task(&self, environment_id: &str, task_id: &str) -> Result<(), ApiError>;
}

/// Name to id lookups. `Ok(None)` means the name is unknown.
#[async_trait]
pub trait IdentityResolver: Send + Sync {
    /// Application names match case-insensitively.
    async fn resolve_application_id(&self, name: &str) -> Result<Option<String>, ApiError>;

    /// Environment names match case-insensitively.
    async fn resolve_environment_id(
        &self,
        application_id: &str,
        name: &str,
    ) -> Result<Option<String>, ApiError>;

    async fn resolve_server_id(
        &self,
        environment_id: &str,
        name: &str,
    ) -> Result<Option<String>, ApiError>;
}

/// Ordered config documents for an application, earliest first.
pub trait ConfigSource {
    fn load(&self, application: &str) -> Result<Vec<ConfigDocument>, ReconcileError>;
}

impl ConfigSource for Vec<ConfigDocument> {
    fn load(&self, _application: &str) -> Result<Vec<ConfigDocument>, ReconcileError> {
        Ok(self.clone())
    }
}
