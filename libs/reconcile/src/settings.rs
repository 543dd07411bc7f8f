//! Per-run settings derived from the config sources.

use crate::overrides::MatchMode;
use crate::source::ConfigDocument;

/// Settings shared by every phase of one reconciliation run.
///
/// Built once from the config documents and passed by value; nothing mutates
/// it after the default server has been resolved.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSettings {
    /// How override rules match environment names.
    pub match_mode: MatchMode,

    /// Default server name from `crons.server` (production environments only).
    pub default_server: Option<String>,

    /// Resolved id of `default_server`. Empty means any server.
    pub default_server_id: String,
}

impl RunSettings {
    /// Collect settings from `documents` for `environment`.
    ///
    /// Later documents win. The default server is ignored outside production,
    /// where environments have a single server.
    pub fn from_documents(documents: &[ConfigDocument], environment: &str) -> Self {
        let is_prod = is_production_environment(environment);
        let mut settings = Self::default();

        for crons in documents.iter().filter_map(|doc| doc.crons.as_ref()) {
            if is_prod {
                if let Some(server) = &crons.server {
                    settings.default_server = Some(server.clone());
                }
            }
            if let Some(contains) = crons.overrides_environments_contains {
                settings.match_mode = MatchMode::from_contains_flag(contains);
            }
        }

        settings
    }

    /// Settings with the default server id resolved.
    pub fn with_default_server_id(self, default_server_id: impl Into<String>) -> Self {
        Self {
            default_server_id: default_server_id.into(),
            ..self
        }
    }
}

/// Whether `environment` names a production environment (`prod`, `live`, `01live`, ...).
pub fn is_production_environment(environment: &str) -> bool {
    if environment == "prod" {
        return true;
    }
    environment
        .strip_suffix("live")
        .is_some_and(|prefix| prefix.chars().all(|c| c.is_ascii_digit()))
}
