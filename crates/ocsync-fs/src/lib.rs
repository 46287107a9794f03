//! Filesystem primitives for ocsync
//!
//! Provides repo-relative paths, atomic I/O, checksummed copies and
//! format-agnostic config loading.

pub mod checksum;
pub mod config;
pub mod error;
pub mod io;
pub mod path;
pub mod tree;

pub use config::{ConfigFormat, ConfigStore};
pub use error::{Error, Result};
pub use path::{RepoRelPath, expand_tilde};
pub use tree::{SKIPPED_DIRS, TreeChanges, merge_tree, mirror_tree};
