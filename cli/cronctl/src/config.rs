//! Configuration and credential management.
//!
//! Handles:
//! - API and token endpoint configuration
//! - API key/secret storage

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

/// Configuration file name.
const CONFIG_FILE: &str = "config.json";

/// Credentials file name.
const CREDENTIALS_FILE: &str = "credentials.json";

const DEFAULT_API_URL: &str = "https://cloud.acquia.com/api";
const DEFAULT_TOKEN_URL: &str = "https://accounts.acquia.com/api/auth/oauth/token";

/// Get the config directory path.
pub fn config_dir() -> Result<PathBuf> {
    ProjectDirs::from("com", "cronsync", "cronctl")
        .map(|dirs| dirs.config_dir().to_path_buf())
        .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))
}

/// CLI configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Cloud API base URL.
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// OAuth2 token endpoint.
    #[serde(default = "default_token_url")]
    pub token_url: String,
}

fn default_api_url() -> String {
    std::env::var("CRONSYNC_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string())
}

fn default_token_url() -> String {
    std::env::var("CRONSYNC_TOKEN_URL").unwrap_or_else(|_| DEFAULT_TOKEN_URL.to_string())
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            token_url: default_token_url(),
        }
    }
}

impl Config {
    /// Load config from `dir`, or return default.
    pub fn load_from(dir: &Path) -> Result<Self> {
        let path = dir.join(CONFIG_FILE);

        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config from {:?}", path))?;

        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse config from {:?}", path))
    }

    /// Get the API URL.
    pub fn api_url(&self) -> &str {
        &self.api_url
    }
}

/// API key and secret used for the client-credentials grant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub key: String,
    pub secret: String,
}

impl Credentials {
    pub fn new(key: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            secret: secret.into(),
        }
    }

    /// Credentials from `CRONSYNC_API_KEY` / `CRONSYNC_API_SECRET`, then from `dir`.
    pub fn load_from(dir: &Path) -> Result<Option<Self>> {
        if let Some(creds) = Self::from_env() {
            return Ok(Some(creds));
        }

        Self::read(dir)
    }

    /// Credentials stored in `dir`, ignoring the environment.
    fn read(dir: &Path) -> Result<Option<Self>> {
        let path = dir.join(CREDENTIALS_FILE);

        if !path.exists() {
            return Ok(None);
        }

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read credentials from {:?}", path))?;

        let creds: Self = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse credentials from {:?}", path))?;

        Ok(Some(creds))
    }

    fn from_env() -> Option<Self> {
        let key = std::env::var("CRONSYNC_API_KEY").ok()?;
        let secret = std::env::var("CRONSYNC_API_SECRET").ok()?;
        Some(Self::new(key, secret))
    }

    /// Save credentials to disk.
    pub fn save(&self) -> Result<PathBuf> {
        let dir = config_dir()?;
        fs::create_dir_all(&dir)?;

        let path = dir.join(CREDENTIALS_FILE);
        let contents = serde_json::to_string_pretty(self)?;

        // Set restrictive permissions on Unix
        #[cfg(unix)]
        {
            use std::io::Write;
            use std::os::unix::fs::OpenOptionsExt;

            let mut file = fs::OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .mode(0o600)
                .open(&path)?;
            file.write_all(contents.as_bytes())?;
        }

        #[cfg(not(unix))]
        {
            fs::write(&path, contents)
                .with_context(|| format!("Failed to write credentials to {:?}", path))?;
        }

        Ok(path)
    }

    /// Delete credentials from disk.
    pub fn delete() -> Result<()> {
        let path = config_dir()?.join(CREDENTIALS_FILE);

        if path.exists() {
            fs::remove_file(&path)
                .with_context(|| format!("Failed to delete credentials at {:?}", path))?;
        }

        Ok(())
    }

    /// Key with everything but the first four characters masked.
    pub fn masked_key(&self) -> String {
        let visible: String = self.key.chars().take(4).collect();
        format!("{visible}****")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert!(!config.api_url.is_empty());
        assert!(!config.token_url.is_empty());
    }

    #[test]
    fn test_config_fills_missing_fields() {
        let config: Config =
            serde_json::from_str(r#"{"api_url": "http://localhost:9000"}"#).unwrap();
        assert_eq!(config.api_url(), "http://localhost:9000");
        assert!(!config.token_url.is_empty());
    }

    #[test]
    fn test_malformed_credentials_file_is_an_error() {
        let dir = tempfile::TempDir::new().unwrap();
        assert_eq!(Credentials::read(dir.path()).unwrap(), None);

        fs::write(dir.path().join(CREDENTIALS_FILE), "{ not json").unwrap();
        assert!(Credentials::read(dir.path()).is_err());
    }

    #[test]
    fn test_masked_key() {
        let creds = Credentials::new("abcdef123", "secret");
        assert_eq!(creds.masked_key(), "abcd****");
    }
}
