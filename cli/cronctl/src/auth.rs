//! OAuth2 client-credentials token exchange.

use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;

use crate::config::{Config, Credentials};
use crate::error::CliError;

/// A bearer token for the cloud API.
#[derive(Debug, Clone)]
pub struct AccessToken {
    pub token: String,
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
struct TokenErrorResponse {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
}

/// Exchange API key and secret for an access token.
pub async fn fetch_token(config: &Config, credentials: &Credentials) -> Result<AccessToken, CliError> {
    let response = reqwest::Client::new()
        .post(&config.token_url)
        .form(&[
            ("grant_type", "client_credentials"),
            ("client_id", credentials.key.as_str()),
            ("client_secret", credentials.secret.as_str()),
        ])
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        let body: TokenErrorResponse = response.json().await.unwrap_or_default();
        let message = body
            .error_description
            .or(body.error)
            .unwrap_or_else(|| format!("token endpoint returned {status}"));
        return Err(CliError::Auth {
            status: status.as_u16(),
            message,
        });
    }

    let body: TokenResponse = response
        .json()
        .await
        .map_err(|e| CliError::Other(anyhow::anyhow!("Failed to parse token response: {}", e)))?;

    let expires_at = body
        .expires_in
        .map(|seconds| Utc::now() + Duration::seconds(seconds));
    tracing::debug!(?expires_at, "obtained access token");

    Ok(AccessToken {
        token: body.access_token,
        expires_at,
    })
}
