//! Cloud API v2 implementation of the reconciler's remote collaborators.

use async_trait::async_trait;
use cronsync_reconcile::{ApiError, IdentityResolver, RemoteTask, TaskApi};
use serde::{Deserialize, Serialize};

use crate::client::ApiClient;

/// Cloud API adapter for scheduled tasks and name lookups.
#[derive(Debug, Clone)]
pub struct CloudApi {
    client: ApiClient,
}

/// HAL collection envelope.
#[derive(Debug, Deserialize)]
struct Collection<T> {
    #[serde(rename = "_embedded")]
    embedded: Embedded<T>,
}

#[derive(Debug, Deserialize)]
struct Embedded<T> {
    #[serde(default = "Vec::new")]
    items: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct Application {
    uuid: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    hosting: Option<Hosting>,
}

#[derive(Debug, Deserialize)]
struct Hosting {
    /// `<realm>:<name>`.
    id: String,
}

impl Application {
    /// Site group name, falling back to the display name.
    fn site_name(&self) -> &str {
        match &self.hosting {
            Some(hosting) => hosting
                .id
                .split_once(':')
                .map_or(hosting.id.as_str(), |(_, name)| name),
            None => &self.name,
        }
    }
}

/// Environment or server: both are listed as `{id, name}`.
#[derive(Debug, Deserialize)]
struct Named {
    id: String,
    name: String,
}

#[derive(Debug, Serialize)]
struct CronRequest<'a> {
    command: &'a str,
    frequency: &'a str,
    label: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    server_id: Option<&'a str>,
}

/// Response to mutations: a message plus HAL links.
#[derive(Debug, Default, Deserialize)]
struct MutationResponse {
    #[serde(default, rename = "_links")]
    links: Option<Links>,
}

#[derive(Debug, Default, Deserialize)]
struct Links {
    #[serde(default, rename = "self")]
    this: Option<Link>,
}

#[derive(Debug, Default, Deserialize)]
struct Link {
    href: String,
}

impl MutationResponse {
    /// Id of the created resource: the last segment of the self link.
    fn created_id(&self) -> Option<String> {
        let href = &self.links.as_ref()?.this.as_ref()?.href;
        href.trim_end_matches('/')
            .rsplit('/')
            .next()
            .filter(|id| !id.is_empty())
            .map(str::to_string)
    }
}

impl CloudApi {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    async fn list<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<Vec<T>, ApiError> {
        let collection: Collection<T> = self.client.get(path).await?;
        Ok(collection.embedded.items)
    }

    async fn action(&self, environment_id: &str, task_id: &str, action: &str) -> Result<(), ApiError> {
        let path = format!("/environments/{environment_id}/crons/{task_id}/actions/{action}");
        let _: MutationResponse = self.client.post(&path, &serde_json::json!({})).await?;
        Ok(())
    }
}

#[async_trait]
impl TaskApi for CloudApi {
    async fn list_tasks(&self, environment_id: &str) -> Result<Vec<RemoteTask>, ApiError> {
        self.list(&format!("/environments/{environment_id}/crons"))
            .await
    }

    async fn create_task(
        &self,
        environment_id: &str,
        command: &str,
        frequency: &str,
        label: &str,
        server_id: Option<&str>,
    ) -> Result<String, ApiError> {
        let body = CronRequest {
            command,
            frequency,
            label,
            server_id,
        };
        let response: MutationResponse = self
            .client
            .post(&format!("/environments/{environment_id}/crons"), &body)
            .await?;

        response
            .created_id()
            .ok_or_else(|| ApiError::Decode("create response has no self link".to_string()))
    }

    async fn update_task(
        &self,
        environment_id: &str,
        task_id: &str,
        command: &str,
        frequency: &str,
        label: &str,
        server_id: Option<&str>,
    ) -> Result<(), ApiError> {
        let body = CronRequest {
            command,
            frequency,
            label,
            server_id,
        };
        let _: MutationResponse = self
            .client
            .put(&format!("/environments/{environment_id}/crons/{task_id}"), &body)
            .await?;
        Ok(())
    }

    async fn enable_task(&self, environment_id: &str, task_id: &str) -> Result<(), ApiError> {
        self.action(environment_id, task_id, "enable").await
    }

    async fn disable_task(&self, environment_id: &str, task_id: &str) -> Result<(), ApiError> {
        self.action(environment_id, task_id, "disable").await
    }

    async fn delete_task(&self, environment_id: &str, task_id: &str) -> Result<(), ApiError> {
        self.client
            .delete(&format!("/environments/{environment_id}/crons/{task_id}"))
            .await?;
        Ok(())
    }
}

#[async_trait]
impl IdentityResolver for CloudApi {
    async fn resolve_application_id(&self, name: &str) -> Result<Option<String>, ApiError> {
        let applications: Vec<Application> = self.list("/applications").await?;
        Ok(applications
            .into_iter()
            .find(|app| app.site_name().eq_ignore_ascii_case(name))
            .map(|app| app.uuid))
    }

    async fn resolve_environment_id(
        &self,
        application_id: &str,
        name: &str,
    ) -> Result<Option<String>, ApiError> {
        let environments: Vec<Named> = self
            .list(&format!("/applications/{application_id}/environments"))
            .await?;
        Ok(environments
            .into_iter()
            .find(|env| env.name.eq_ignore_ascii_case(name))
            .map(|env| env.id))
    }

    async fn resolve_server_id(
        &self,
        environment_id: &str,
        name: &str,
    ) -> Result<Option<String>, ApiError> {
        let servers: Vec<Named> = self
            .list(&format!("/environments/{environment_id}/servers"))
            .await?;
        Ok(servers
            .into_iter()
            .find(|server| server.name == name)
            .map(|server| server.id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn cloud(server: &MockServer) -> CloudApi {
        let config = Config {
            api_url: server.uri(),
            token_url: String::new(),
        };
        CloudApi::new(ApiClient::new(&config, Some("token-1")).unwrap())
    }

    fn items(items: serde_json::Value) -> serde_json::Value {
        json!({ "total": 1, "_embedded": { "items": items } })
    }

    #[tokio::test]
    async fn test_resolve_application_by_site_group() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/applications"))
            .and(header("authorization", "Bearer token-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(items(json!([
                { "uuid": "a-1", "name": "Other", "hosting": { "id": "prod:other" } },
                { "uuid": "a-2", "name": "My Site", "hosting": { "id": "prod:mysite" } }
            ]))))
            .mount(&server)
            .await;

        let api = cloud(&server).await;
        assert_eq!(
            api.resolve_application_id("MySite").await.unwrap().as_deref(),
            Some("a-2")
        );
        assert_eq!(api.resolve_application_id("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_resolve_environment_case_insensitive() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/applications/a-2/environments"))
            .respond_with(ResponseTemplate::new(200).set_body_json(items(json!([
                { "id": "1-a2", "name": "dev" },
                { "id": "2-a2", "name": "prod" }
            ]))))
            .mount(&server)
            .await;

        let api = cloud(&server).await;
        assert_eq!(
            api.resolve_environment_id("a-2", "PROD").await.unwrap().as_deref(),
            Some("2-a2")
        );
    }

    #[tokio::test]
    async fn test_list_tasks_parses_remote_shape() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/environments/2-a2/crons"))
            .respond_with(ResponseTemplate::new(200).set_body_json(items(json!([{
                "id": 43,
                "label": "backup",
                "command": "# drush backup",
                "minute": "0",
                "hour": "2",
                "dayMonth": "*",
                "month": "*",
                "dayWeek": "*",
                "flags": { "enabled": false, "system": false },
                "server": { "id": "7" }
            }]))))
            .mount(&server)
            .await;

        let api = cloud(&server).await;
        let tasks = api.list_tasks("2-a2").await.unwrap();
        assert_eq!(tasks.len(), 1);

        let task = tasks[0].clone().into_task();
        assert_eq!(task.id.as_deref(), Some("43"));
        assert_eq!(task.command, "drush backup");
        assert_eq!(task.frequency, "0 2 * * *");
        assert!(!task.status);
        assert_eq!(task.server_id, "7");
    }

    #[tokio::test]
    async fn test_create_returns_id_from_self_link() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/environments/2-a2/crons"))
            .and(body_json(json!({
                "command": "drush cron",
                "frequency": "0 * * * *",
                "label": "cron"
            })))
            .respond_with(ResponseTemplate::new(202).set_body_json(json!({
                "message": "Creating a new cron.",
                "_links": { "self": { "href": "https://example.test/api/environments/2-a2/crons/51" } }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let api = cloud(&server).await;
        let id = api
            .create_task("2-a2", "drush cron", "0 * * * *", "cron", None)
            .await
            .unwrap();
        assert_eq!(id, "51");
    }

    #[tokio::test]
    async fn test_update_sends_server_id() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/environments/2-a2/crons/51"))
            .and(body_json(json!({
                "command": "# drush cron",
                "frequency": "*/5 * * * *",
                "label": "cron",
                "server_id": "7"
            })))
            .respond_with(ResponseTemplate::new(202).set_body_json(json!({ "message": "Updating cron." })))
            .expect(1)
            .mount(&server)
            .await;

        let api = cloud(&server).await;
        api.update_task("2-a2", "51", "# drush cron", "*/5 * * * *", "cron", Some("7"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_enable_disable_and_delete_paths() {
        let server = MockServer::start().await;
        for action in ["enable", "disable"] {
            Mock::given(method("POST"))
                .and(path(format!("/environments/2-a2/crons/51/actions/{action}")))
                .respond_with(ResponseTemplate::new(202).set_body_json(json!({ "message": "ok" })))
                .expect(1)
                .mount(&server)
                .await;
        }
        Mock::given(method("DELETE"))
            .and(path("/environments/2-a2/crons/51"))
            .respond_with(ResponseTemplate::new(202).set_body_json(json!({ "message": "ok" })))
            .expect(1)
            .mount(&server)
            .await;

        let api = cloud(&server).await;
        api.enable_task("2-a2", "51").await.unwrap();
        api.disable_task("2-a2", "51").await.unwrap();
        api.delete_task("2-a2", "51").await.unwrap();
    }

    #[tokio::test]
    async fn test_error_body_becomes_status_error() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/environments/2-a2/crons/99"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "error": "not_found",
                "message": "The cron you are trying to access does not exist."
            })))
            .mount(&server)
            .await;

        let api = cloud(&server).await;
        let err = api.delete_task("2-a2", "99").await.unwrap_err();
        assert_eq!(
            err,
            ApiError::status(404, "The cron you are trying to access does not exist.")
        );
    }

    #[test]
    fn test_created_id_requires_self_link() {
        let response: MutationResponse =
            serde_json::from_value(json!({ "message": "Creating a new cron." })).unwrap();
        assert_eq!(response.created_id(), None);
    }
}
