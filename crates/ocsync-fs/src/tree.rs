//! Directory tree copying
//!
//! Two flavours: [`merge_tree`] only adds or updates files under the
//! destination, while [`mirror_tree`] additionally removes destination
//! entries the source no longer has. Both skip version-control metadata and
//! dependency folders at any depth.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use walkdir::{DirEntry, WalkDir};

use crate::{Error, Result, io};

/// Directory names never copied or removed.
pub const SKIPPED_DIRS: &[&str] = &[".git", "node_modules"];

/// Paths touched by a tree copy, relative to the destination root.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TreeChanges {
    pub written: Vec<PathBuf>,
    pub removed: Vec<PathBuf>,
}

impl TreeChanges {
    pub fn is_empty(&self) -> bool {
        self.written.is_empty() && self.removed.is_empty()
    }
}

fn is_skipped(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry.file_type().is_dir()
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| SKIPPED_DIRS.contains(&name))
}

/// Relative paths of every file under `root`, skipped folders excluded.
fn relative_files(root: &Path) -> Result<BTreeSet<PathBuf>> {
    let mut files = BTreeSet::new();
    if !root.is_dir() {
        return Ok(files);
    }
    for entry in WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|e| !is_skipped(e))
    {
        let entry = entry.map_err(|e| Error::Walk {
            root: root.to_path_buf(),
            message: e.to_string(),
        })?;
        if entry.file_type().is_dir() {
            continue;
        }
        if let Ok(rel) = entry.path().strip_prefix(root) {
            files.insert(rel.to_path_buf());
        }
    }
    Ok(files)
}

fn copy_one(src_root: &Path, dst_root: &Path, rel: &Path) -> Result<bool> {
    let src = src_root.join(rel);
    let dst = dst_root.join(rel);

    // A directory in the way of a file has to go first
    if dst.is_dir() {
        io::remove_path(&dst)?;
    }
    // Likewise any file standing where a parent directory must be
    for ancestor in rel.ancestors().skip(1) {
        if ancestor.as_os_str().is_empty() {
            break;
        }
        let candidate = dst_root.join(ancestor);
        if candidate.is_file() {
            io::remove_path(&candidate)?;
        }
    }

    io::copy_file_if_changed(&src, &dst)
}

/// Copy every file from `src` into `dst`, leaving destination-only files alone.
pub fn merge_tree(src: &Path, dst: &Path) -> Result<TreeChanges> {
    let mut changes = TreeChanges::default();
    if dst.is_file() {
        io::remove_path(dst)?;
    }
    fs::create_dir_all(dst).map_err(|e| Error::io(dst, e))?;

    for rel in relative_files(src)? {
        if copy_one(src, dst, &rel)? {
            changes.written.push(rel);
        }
    }

    tracing::debug!(
        src = %src.display(),
        dst = %dst.display(),
        written = changes.written.len(),
        "merged tree"
    );
    Ok(changes)
}

/// Make `dst` an exact copy of `src`.
pub fn mirror_tree(src: &Path, dst: &Path) -> Result<TreeChanges> {
    let mut changes = merge_tree(src, dst)?;
    let wanted = relative_files(src)?;

    for rel in relative_files(dst)? {
        if !wanted.contains(&rel) && io::remove_path(&dst.join(&rel))? {
            changes.removed.push(rel);
        }
    }
    prune_empty_dirs(src, dst)?;

    tracing::debug!(
        src = %src.display(),
        dst = %dst.display(),
        written = changes.written.len(),
        removed = changes.removed.len(),
        "mirrored tree"
    );
    Ok(changes)
}

/// Remove destination directories that are empty and absent from the source.
fn prune_empty_dirs(src: &Path, dst: &Path) -> Result<()> {
    let mut dirs: Vec<PathBuf> = Vec::new();
    for entry in WalkDir::new(dst)
        .min_depth(1)
        .into_iter()
        .filter_entry(|e| !is_skipped(e))
    {
        let entry = entry.map_err(|e| Error::Walk {
            root: dst.to_path_buf(),
            message: e.to_string(),
        })?;
        if entry.file_type().is_dir() {
            dirs.push(entry.path().to_path_buf());
        }
    }

    // Deepest first so parents empty out after their children
    dirs.sort_by_key(|d| std::cmp::Reverse(d.components().count()));
    for dir in dirs {
        let Ok(rel) = dir.strip_prefix(dst) else {
            continue;
        };
        if src.join(rel).is_dir() {
            continue;
        }
        let is_empty = fs::read_dir(&dir)
            .map_err(|e| Error::io(&dir, e))?
            .next()
            .is_none();
        if is_empty {
            fs::remove_dir(&dir).map_err(|e| Error::io(&dir, e))?;
        }
    }
    Ok(())
}
