//! Persisted sync timestamps

use std::path::Path;

use chrono::{DateTime, Utc};
use ocsync_fs::ConfigStore;
use serde::{Deserialize, Serialize};

use crate::Result;

/// Contents of `sync-state.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_pull: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_push: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_remote_update: Option<DateTime<Utc>>,
}

impl SyncState {
    pub fn load(path: &Path) -> Result<Self> {
        Ok(ConfigStore::new().load_optional(path)?.unwrap_or_default())
    }

    /// Like [`SyncState::load`], but an unreadable file starts over empty.
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_else(|e| {
            tracing::warn!(path = %path.display(), error = %e, "ignoring unreadable sync state");
            Self::default()
        })
    }

    /// Written atomically; readers never observe a partial file.
    pub fn save(&self, path: &Path) -> Result<()> {
        ConfigStore::new().save(path, self)?;
        Ok(())
    }

    /// Load, mutate and save in one step.
    pub fn update(path: &Path, change: impl FnOnce(&mut Self)) -> Result<Self> {
        let mut state = Self::load_or_default(path);
        change(&mut state);
        state.save(path)?;
        Ok(state)
    }
}
