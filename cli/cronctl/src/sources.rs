//! YAML config documents on disk.

use std::fs;
use std::path::{Path, PathBuf};

use cronsync_reconcile::{ConfigDocument, ConfigSource, ReconcileError};

/// Shared project config, loaded first.
const PROJECT_FILE: &str = "blt.yml";

/// Task definitions shared by every application.
const CRONS_FILE: &str = "crons.yml";

/// Reads `blt.yml`, `crons.yml` and `<application>.crons.yml` from one directory.
#[derive(Debug, Clone)]
pub struct YamlSources {
    dir: PathBuf,
}

impl YamlSources {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Candidate files in merge order.
    pub fn paths(&self, application: &str) -> Vec<PathBuf> {
        vec![
            self.dir.join(PROJECT_FILE),
            self.dir.join(CRONS_FILE),
            self.dir.join(format!("{application}.crons.yml")),
        ]
    }
}

fn read_document(path: &Path) -> Result<ConfigDocument, ReconcileError> {
    let contents = fs::read_to_string(path)
        .map_err(|e| ReconcileError::Source(format!("{}: {e}", path.display())))?;

    if contents.trim().is_empty() {
        return Ok(ConfigDocument::default());
    }

    serde_yaml::from_str(&contents)
        .map_err(|e| ReconcileError::Source(format!("{}: {e}", path.display())))
}

impl ConfigSource for YamlSources {
    fn load(&self, application: &str) -> Result<Vec<ConfigDocument>, ReconcileError> {
        let mut documents = Vec::new();

        for path in self.paths(application) {
            if !path.is_file() {
                tracing::debug!(path = %path.display(), "config file not found, skipping");
                continue;
            }
            tracing::debug!(path = %path.display(), "loading config file");
            documents.push(read_document(&path)?);
        }

        Ok(documents)
    }
}
