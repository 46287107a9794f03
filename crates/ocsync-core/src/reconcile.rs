//! Reconciler: executes a [`SyncPlan`] in either direction
//!
//! Repo → local merges repo content into the local tree and then re-applies
//! the override overlay. Local → repo mirrors local content into the clone
//! with the overlay stripped out. Both directions skip items whose source
//! does not exist and never rewrite a file whose content is unchanged.

use std::path::Path;

use ocsync_fs::{ConfigStore, RepoRelPath, TreeChanges, io, merge_tree, mirror_tree};
use serde::Serialize;
use serde_json::Value;

use crate::Result;
use crate::overlay::Overrides;
use crate::plan::{ExtraSecretEntry, ItemKind, SyncItem, SyncPlan};

/// Repo-relative paths a reconcile pass wrote or removed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub written: Vec<RepoRelPath>,
    pub removed: Vec<RepoRelPath>,
}

impl ReconcileReport {
    pub fn is_empty(&self) -> bool {
        self.written.is_empty() && self.removed.is_empty()
    }

    fn record_tree(&mut self, base: &RepoRelPath, changes: TreeChanges) {
        let to_rel = |path: std::path::PathBuf| base.join(path.to_string_lossy());
        self.written.extend(changes.written.into_iter().map(to_rel));
        self.removed.extend(changes.removed.into_iter().map(to_rel));
    }
}

#[derive(Serialize)]
struct ExtraSecretsManifest<'a> {
    entries: &'a [ExtraSecretEntry],
}

/// Copy repo content onto the local tree, then re-apply the overlay.
pub fn sync_repo_to_local(plan: &SyncPlan, overrides: &Overrides) -> Result<ReconcileReport> {
    let mut report = ReconcileReport::default();

    for item in &plan.items {
        let repo_path = plan.repo_path(&item.repo_relative_path);
        let local_path = item.source_path.as_path();

        match item.kind {
            ItemKind::ConfigFile => {
                // Handled after the copy pass so overrides land last
                continue;
            }
            ItemKind::Directory => {
                if !repo_path.is_dir() {
                    tracing::trace!(item = %item.repo_relative_path, "not in repo, skipping");
                    continue;
                }
                let changes = merge_tree(&repo_path, local_path)?;
                if item.is_secret {
                    for rel in &changes.written {
                        io::restrict_permissions(&local_path.join(rel))?;
                    }
                }
                report.record_tree(&item.repo_relative_path, changes);
            }
            ItemKind::File => {
                if copy_into_local(&repo_path, local_path, item.is_secret)? {
                    report.written.push(item.repo_relative_path.clone());
                }
            }
        }
    }

    for entry in &plan.extra_secrets.entries {
        let repo_path = plan.repo_path(&entry.repo_relative_path);
        if repo_path.is_dir() {
            let changes = merge_tree(&repo_path, &entry.source_path)?;
            for rel in &changes.written {
                io::restrict_permissions(&entry.source_path.join(rel))?;
            }
            report.record_tree(&entry.repo_relative_path, changes);
        } else if copy_into_local(&repo_path, &entry.source_path, true)? {
            report.written.push(entry.repo_relative_path.clone());
        }
    }

    for item in config_files(plan) {
        let repo_path = plan.repo_path(&item.repo_relative_path);
        if materialize_config(&repo_path, &item.source_path, overrides)? {
            report.written.push(item.repo_relative_path.clone());
        }
    }

    tracing::debug!(
        written = report.written.len(),
        "reconciled repo to local"
    );
    Ok(report)
}

/// Copy local content into the clone, with overrides stripped out.
pub fn sync_local_to_repo(plan: &SyncPlan, overrides: &Overrides) -> Result<ReconcileReport> {
    let mut report = ReconcileReport::default();

    for item in &plan.items {
        let local_path = item.source_path.as_path();
        if !local_path.exists() {
            tracing::trace!(item = %item.repo_relative_path, "no local source, skipping");
            continue;
        }
        let repo_path = plan.repo_path(&item.repo_relative_path);

        let wrote = match item.kind {
            ItemKind::Directory if local_path.is_dir() => {
                let changes = mirror_tree(local_path, &repo_path)?;
                report.record_tree(&item.repo_relative_path, changes);
                continue;
            }
            ItemKind::Directory => false,
            ItemKind::ConfigFile => publish_config(local_path, &repo_path, overrides)?,
            ItemKind::File => local_path.is_file() && io::copy_file_if_changed(local_path, &repo_path)?,
        };
        if wrote {
            report.written.push(item.repo_relative_path.clone());
        }
    }

    let entries = &plan.extra_secrets.entries;
    for entry in entries {
        let repo_path = plan.repo_path(&entry.repo_relative_path);
        if entry.source_path.is_dir() {
            let changes = mirror_tree(&entry.source_path, &repo_path)?;
            report.record_tree(&entry.repo_relative_path, changes);
        } else if entry.source_path.is_file()
            && io::copy_file_if_changed(&entry.source_path, &repo_path)?
        {
            report.written.push(entry.repo_relative_path.clone());
        }
    }

    if !entries.is_empty() {
        let manifest_path = plan.repo_path(&plan.extra_secrets.manifest_path);
        let mut content = serde_json::to_string_pretty(&ExtraSecretsManifest { entries })?;
        content.push('\n');
        let current = std::fs::read_to_string(&manifest_path).ok();
        if current.as_deref() != Some(content.as_str()) {
            io::write_text(&manifest_path, &content)?;
            report.written.push(plan.extra_secrets.manifest_path.clone());
        }
    }

    tracing::debug!(
        written = report.written.len(),
        removed = report.removed.len(),
        "reconciled local to repo"
    );
    Ok(report)
}

fn config_files(plan: &SyncPlan) -> impl Iterator<Item = &SyncItem> {
    plan.items
        .iter()
        .filter(|item| item.kind == ItemKind::ConfigFile)
}

fn copy_into_local(repo_path: &Path, local_path: &Path, is_secret: bool) -> Result<bool> {
    if !repo_path.is_file() {
        return Ok(false);
    }
    let wrote = io::copy_file_if_changed(repo_path, local_path)?;
    if is_secret {
        io::restrict_permissions(local_path)?;
    }
    Ok(wrote)
}

/// Bring a local config file in line with `repo copy + overrides`.
///
/// With no overrides the repo bytes are copied verbatim. Otherwise the merged
/// document is written only when it differs semantically from the local one.
/// A config present only locally still gets the overlay applied. The merged
/// document is a re-serialized value, so JSONC comments in the local file
/// are not kept.
fn materialize_config(repo_path: &Path, local_path: &Path, overrides: &Overrides) -> Result<bool> {
    if overrides.is_empty() {
        return Ok(repo_path.is_file() && io::copy_file_if_changed(repo_path, local_path)?);
    }

    let store = ConfigStore::new();
    let current: Option<Value> = store.load_optional(local_path)?;
    let synced: Option<Value> = store.load_optional(repo_path)?;
    let Some(source) = synced.as_ref().or(current.as_ref()) else {
        return Ok(false);
    };

    let merged = overrides.apply(source);
    if current.as_ref() == Some(&merged) {
        return Ok(false);
    }
    store.save(local_path, &merged)?;
    tracing::debug!(path = %local_path.display(), "applied overrides");
    Ok(true)
}

/// Write a local config into the repo with overlay values stripped.
///
/// A stripped document semantically equal to the repo copy leaves the repo
/// file untouched. With overrides present the repo copy is re-serialized
/// from the stripped value, which drops any JSONC comments; without
/// overrides the local bytes are copied as they are.
fn publish_config(local_path: &Path, repo_path: &Path, overrides: &Overrides) -> Result<bool> {
    if !local_path.is_file() {
        return Ok(false);
    }
    if overrides.is_empty() {
        return io::copy_file_if_changed(local_path, repo_path).map_err(Into::into);
    }

    let store = ConfigStore::new();
    let local: Value = store.load(local_path)?;
    let base: Option<Value> = store.load_optional(repo_path)?;
    let stripped = overrides.strip(&local, base.as_ref());

    if base.as_ref() == Some(&stripped) {
        return Ok(false);
    }
    store.save(repo_path, &stripped)?;
    Ok(true)
}
