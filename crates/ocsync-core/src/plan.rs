//! Sync planning
//!
//! [`build_plan`] turns a [`SyncConfig`] and resolved [`SyncLocations`] into
//! the exact set of local ↔ repo mappings one sync pass will touch. It does
//! no I/O, so a plan can be rebuilt cheaply on every operation.

use std::path::{Path, PathBuf};

use ocsync_fs::{RepoRelPath, expand_tilde};
use serde::Serialize;

use crate::config::SyncConfig;
use crate::locations::{Platform, SyncLocations};

/// How an item is copied and whether the overlay applies to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ItemKind {
    /// Materialized OpenCode config the override overlay is applied to
    ConfigFile,
    File,
    Directory,
}

/// One file or directory mapped between the local tree and the repo.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncItem {
    pub source_path: PathBuf,
    pub repo_relative_path: RepoRelPath,
    pub is_secret: bool,
    pub kind: ItemKind,
}

/// An allowlisted secret outside the well-known catalogs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtraSecretEntry {
    /// Path as written in the config, before expansion
    #[serde(rename = "sourcePath")]
    pub configured: String,
    #[serde(skip)]
    pub source_path: PathBuf,
    #[serde(rename = "repoPath")]
    pub repo_relative_path: RepoRelPath,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtraSecrets {
    pub allowlist: Vec<String>,
    pub entries: Vec<ExtraSecretEntry>,
    pub manifest_path: RepoRelPath,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncPlan {
    pub repo_root: PathBuf,
    /// Regular items first, then secret items
    pub items: Vec<SyncItem>,
    pub extra_secrets: ExtraSecrets,
}

impl SyncPlan {
    /// Native path of a repo-relative path inside this plan's clone.
    pub fn repo_path(&self, rel: &RepoRelPath) -> PathBuf {
        rel.to_native_under(&self.repo_root)
    }

    pub fn secret_items(&self) -> impl Iterator<Item = &SyncItem> {
        self.items.iter().filter(|item| item.is_secret)
    }
}

/// Repo directory holding regular config.
pub const CONFIG_PREFIX: &str = "config";
/// Repo directory holding well-known secrets.
pub const DATA_PREFIX: &str = "data";
pub const EXTRA_SECRETS_PREFIX: &str = "secrets/extra";
pub const EXTRA_SECRETS_MANIFEST: &str = "secrets/extra-manifest.json";

/// Config-root entries synced for everyone.
pub const REGULAR_CATALOG: &[(&str, ItemKind)] = &[
    ("opencode.json", ItemKind::ConfigFile),
    ("opencode.jsonc", ItemKind::ConfigFile),
    ("AGENTS.md", ItemKind::File),
    ("agent", ItemKind::Directory),
    ("command", ItemKind::Directory),
    ("mode", ItemKind::Directory),
    ("tool", ItemKind::Directory),
    ("themes", ItemKind::Directory),
    ("plugin", ItemKind::Directory),
];

/// Data-dir credential files synced only when secrets are enabled.
pub const SECRET_CATALOG: &[&str] = &["auth.json", "mcp-auth.json"];

pub fn build_plan(
    config: &SyncConfig,
    locations: &SyncLocations,
    repo_root: &Path,
    platform: Platform,
) -> SyncPlan {
    let mut items: Vec<SyncItem> = REGULAR_CATALOG
        .iter()
        .map(|(name, kind)| SyncItem {
            source_path: locations.config_root.join(name),
            repo_relative_path: RepoRelPath::new(CONFIG_PREFIX).join(name),
            is_secret: false,
            kind: *kind,
        })
        .collect();

    let mut extra_secrets = ExtraSecrets {
        allowlist: Vec::new(),
        entries: Vec::new(),
        manifest_path: RepoRelPath::new(EXTRA_SECRETS_MANIFEST),
    };

    // Single gate: nothing secret enters the plan unless opted in
    if config.include_secrets {
        items.extend(SECRET_CATALOG.iter().map(|name| SyncItem {
            source_path: locations.data_dir.join(name),
            repo_relative_path: RepoRelPath::new(DATA_PREFIX).join(name),
            is_secret: true,
            kind: ItemKind::File,
        }));

        for configured in &config.extra_secret_paths {
            extra_secrets.allowlist.push(configured.clone());
            extra_secrets
                .entries
                .push(map_extra_secret(configured, &locations.home, platform));
        }
    }

    SyncPlan {
        repo_root: repo_root.to_path_buf(),
        items,
        extra_secrets,
    }
}

fn normalize_separators(path: &str, platform: Platform) -> String {
    match platform {
        Platform::Windows => path.replace('\\', "/"),
        Platform::Unix => path.to_string(),
    }
}

/// Resolve `.` and `..` segments of a forward-slash path without touching
/// the filesystem. `..` never climbs above the root or a drive prefix.
fn normalize_lexically(path: &str) -> String {
    let absolute = path.starts_with('/');
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => match segments.last().copied() {
                Some("..") => segments.push(".."),
                Some(last) if segments.len() == 1 && last.ends_with(':') => {}
                Some(_) => {
                    segments.pop();
                }
                None if !absolute => segments.push(".."),
                None => {}
            },
            other => segments.push(other),
        }
    }
    let joined = segments.join("/");
    if absolute { format!("/{joined}") } else { joined }
}

/// Map an allowlisted path to its place under `secrets/extra/`.
///
/// Paths under the home directory keep their home-relative shape so they
/// land in the same spot on every machine. Relative paths are taken as
/// home-relative. `..` segments are resolved first, so the mapping follows
/// where the path really points.
fn map_extra_secret(configured: &str, home: &Path, platform: Platform) -> ExtraSecretEntry {
    let home_str = normalize_separators(&home.to_string_lossy(), platform);
    let home_str = home_str.trim_end_matches('/');
    let normalized = normalize_separators(configured.trim(), platform);
    let expanded = expand_tilde(&normalized, Path::new(home_str)).into_owned();

    let is_absolute = expanded.starts_with('/')
        || (platform == Platform::Windows && expanded.as_bytes().get(1) == Some(&b':'));
    let resolved = if is_absolute {
        normalize_lexically(&expanded)
    } else {
        normalize_lexically(&format!("{home_str}/{expanded}"))
    };

    let base = RepoRelPath::new(EXTRA_SECRETS_PREFIX);
    let repo_relative_path = match resolved
        .strip_prefix(home_str)
        .filter(|rest| rest.is_empty() || rest.starts_with('/'))
    {
        Some(rel) => base.join("home").join(rel),
        None => base.join("root").join(resolved.replace(':', "")),
    };

    ExtraSecretEntry {
        configured: configured.to_string(),
        source_path: PathBuf::from(&resolved),
        repo_relative_path,
    }
}
