//! Per-machine sync configuration

use std::path::Path;

use ocsync_fs::ConfigStore;
use ocsync_git::RepoIdentity;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Which repository to sync with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoConfig {
    #[serde(flatten)]
    pub identity: RepoIdentity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
}

/// Contents of `opencode-synced.jsonc`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncConfig {
    pub repo: RepoConfig,
    #[serde(default)]
    pub include_secrets: bool,
    #[serde(default)]
    pub extra_secret_paths: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_repo_path: Option<String>,
}

impl SyncConfig {
    pub fn new(identity: RepoIdentity) -> Self {
        Self {
            repo: RepoConfig {
                identity,
                branch: None,
            },
            include_secrets: false,
            extra_secret_paths: Vec::new(),
            local_repo_path: None,
        }
    }

    /// Load from `path`, failing with [`Error::ConfigMissing`] if absent.
    pub fn load(path: &Path) -> Result<Self> {
        ConfigStore::new()
            .load_optional(path)?
            .ok_or_else(|| Error::ConfigMissing {
                path: path.to_path_buf(),
            })
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        ConfigStore::new().save(path, self)?;
        tracing::debug!(path = %path.display(), "saved sync config");
        Ok(())
    }

    pub fn configured_branch(&self) -> Option<&str> {
        self.repo.branch.as_deref()
    }
}
