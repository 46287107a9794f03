//! Location resolution
//!
//! Every well-known path is derived from an [`EnvSnapshot`] and a
//! [`Platform`], never read from the live process environment, so resolving
//! twice with the same inputs always yields the same [`SyncLocations`].

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::config::SyncConfig;
use crate::{Error, Result};

/// Directory name OpenCode uses under the config and data roots.
pub const APP_DIR: &str = "opencode";
pub const SYNC_CONFIG_FILE: &str = "opencode-synced.jsonc";
pub const OVERRIDES_FILE: &str = "opencode-synced.overrides.jsonc";
pub const STATE_FILE: &str = "sync-state.json";

/// Variables the resolver consults.
const KNOWN_VARS: &[&str] = &[
    "HOME",
    "USERPROFILE",
    "XDG_CONFIG_HOME",
    "XDG_DATA_HOME",
    "APPDATA",
    "LOCALAPPDATA",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    /// Linux, macOS and other XDG-style systems
    Unix,
    Windows,
}

impl Platform {
    pub fn current() -> Self {
        if cfg!(windows) {
            Self::Windows
        } else {
            Self::Unix
        }
    }
}

/// Captured environment: selected variables plus a home directory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvSnapshot {
    vars: BTreeMap<String, String>,
    home: Option<PathBuf>,
}

impl EnvSnapshot {
    pub fn new(home: Option<PathBuf>) -> Self {
        Self {
            vars: BTreeMap::new(),
            home,
        }
    }

    /// Capture the running process's environment once.
    pub fn from_process() -> Self {
        let vars = KNOWN_VARS
            .iter()
            .filter_map(|key| std::env::var(key).ok().map(|value| (key.to_string(), value)))
            .collect();
        Self {
            vars,
            home: dirs::home_dir(),
        }
    }

    pub fn with_var(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(key.into(), value.into());
        self
    }

    /// Variable value; empty counts as unset.
    pub fn var(&self, key: &str) -> Option<&str> {
        self.vars
            .get(key)
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }

    fn var_path(&self, key: &str) -> Option<PathBuf> {
        self.var(key).map(PathBuf::from)
    }

    fn home(&self, platform: Platform) -> Option<PathBuf> {
        let key = match platform {
            Platform::Unix => "HOME",
            Platform::Windows => "USERPROFILE",
        };
        self.home.clone().or_else(|| self.var_path(key))
    }
}

/// Well-known paths for one machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncLocations {
    pub home: PathBuf,
    pub config_root: PathBuf,
    pub data_dir: PathBuf,
    pub sync_config_path: PathBuf,
    pub overrides_path: PathBuf,
    pub state_path: PathBuf,
    pub default_repo_root: PathBuf,
}

impl SyncLocations {
    pub fn resolve(env: &EnvSnapshot, platform: Platform) -> Result<Self> {
        let home = env.home(platform).ok_or(Error::HomeNotFound)?;

        let (config_base, data_base) = match platform {
            Platform::Unix => (
                env.var_path("XDG_CONFIG_HOME")
                    .unwrap_or_else(|| home.join(".config")),
                env.var_path("XDG_DATA_HOME")
                    .unwrap_or_else(|| home.join(".local").join("share")),
            ),
            Platform::Windows => (
                env.var_path("XDG_CONFIG_HOME")
                    .or_else(|| env.var_path("APPDATA"))
                    .unwrap_or_else(|| home.join("AppData").join("Roaming")),
                env.var_path("XDG_DATA_HOME")
                    .or_else(|| env.var_path("LOCALAPPDATA"))
                    .unwrap_or_else(|| home.join("AppData").join("Local")),
            ),
        };

        let config_root = config_base.join(APP_DIR);
        let data_dir = data_base.join(APP_DIR);

        Ok(Self {
            sync_config_path: config_root.join(SYNC_CONFIG_FILE),
            overrides_path: config_root.join(OVERRIDES_FILE),
            state_path: data_dir.join(STATE_FILE),
            default_repo_root: data_dir.join("opencode-synced").join("repo"),
            home,
            config_root,
            data_dir,
        })
    }

    /// Clone location: the configured `localRepoPath` or the default.
    pub fn repo_root(&self, config: &SyncConfig) -> PathBuf {
        match config.local_repo_path.as_deref().filter(|p| !p.trim().is_empty()) {
            Some(path) => {
                let expanded = ocsync_fs::expand_tilde(path, &self.home);
                let expanded = Path::new(expanded.as_ref());
                if expanded.is_absolute() {
                    expanded.to_path_buf()
                } else {
                    self.home.join(expanded)
                }
            }
            None => self.default_repo_root.clone(),
        }
    }
}
