//! Repo-relative path handling and home expansion

use std::borrow::Cow;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A path relative to the root of the sync repository.
///
/// Stored with forward slashes and without empty, `.` or leading-slash
/// segments, so the same logical path compares equal on every platform.
/// `..` removes the previous segment and is dropped at the root, so a
/// repo-relative path never climbs out of the root it is resolved under.
/// Converted to a native path only when joined onto a concrete root.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RepoRelPath {
    inner: String,
}

impl RepoRelPath {
    /// Normalize any path-like input into a repo-relative path.
    pub fn new(path: impl AsRef<str>) -> Self {
        let unified = path.as_ref().replace('\\', "/");
        let mut segments: Vec<&str> = Vec::new();
        for segment in unified.split('/') {
            match segment {
                "" | "." => {}
                ".." => {
                    segments.pop();
                }
                other => segments.push(other),
            }
        }
        Self {
            inner: segments.join("/"),
        }
    }

    /// Internal forward-slash representation.
    pub fn as_str(&self) -> &str {
        &self.inner
    }

    /// Append a segment, normalizing it on its own first.
    ///
    /// The result always stays under `self`: `..` in `segment` can only
    /// climb back to `self`, never above it.
    pub fn join(&self, segment: impl AsRef<str>) -> Self {
        let tail = Self::new(segment);
        match (self.inner.is_empty(), tail.inner.is_empty()) {
            (_, true) => self.clone(),
            (true, false) => tail,
            (false, false) => Self {
                inner: format!("{}/{}", self.inner, tail.inner),
            },
        }
    }

    /// Resolve against a native root directory.
    pub fn to_native_under(&self, root: &Path) -> PathBuf {
        self.inner
            .split('/')
            .filter(|segment| !segment.is_empty())
            .fold(root.to_path_buf(), |acc, segment| acc.join(segment))
    }
}

impl std::fmt::Display for RepoRelPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.inner)
    }
}

impl From<&str> for RepoRelPath {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for RepoRelPath {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl Serialize for RepoRelPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.inner)
    }
}

impl<'de> Deserialize<'de> for RepoRelPath {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::new(raw))
    }
}

/// Expand a leading `~` against an explicit home directory.
///
/// Only the tilde form is expanded; `$VAR` references are left alone so the
/// result stays a pure function of its inputs.
pub fn expand_tilde<'a>(input: &'a str, home: &Path) -> Cow<'a, str> {
    shellexpand::tilde_with_context(input, || Some(home.to_string_lossy().into_owned()))
}
