//! Isolated user directories for exercising path resolution and sync runs.

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

/// A throwaway home with separate XDG config and data roots.
///
/// Nothing outside the temp directory is ever touched, so tests can run in
/// parallel and never see the developer's real configuration.
pub struct Sandbox {
    temp: TempDir,
    home: PathBuf,
    xdg_config: PathBuf,
    xdg_data: PathBuf,
}

impl Sandbox {
    /// # Panics
    /// Panics if the directories cannot be created.
    pub fn new() -> Self {
        let temp = TempDir::new().unwrap_or_else(|e| panic!("Sandbox: tempdir: {e}"));
        let home = temp.path().join("home");
        let xdg_config = home.join(".config");
        let xdg_data = home.join(".local/share");
        for dir in [&home, &xdg_config, &xdg_data] {
            fs::create_dir_all(dir).unwrap_or_else(|e| panic!("Sandbox: mkdir: {e}"));
        }
        Self {
            temp,
            home,
            xdg_config,
            xdg_data,
        }
    }

    pub fn root(&self) -> &Path {
        self.temp.path()
    }

    pub fn home(&self) -> &Path {
        &self.home
    }

    pub fn xdg_config(&self) -> &Path {
        &self.xdg_config
    }

    pub fn xdg_data(&self) -> &Path {
        &self.xdg_data
    }

    /// Write a file under the sandbox root, creating parents.
    pub fn write(&self, path: &Path, content: &str) -> PathBuf {
        let full = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.temp.path().join(path)
        };
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent).unwrap_or_else(|e| panic!("Sandbox::write: mkdir: {e}"));
        }
        fs::write(&full, content).unwrap_or_else(|e| panic!("Sandbox::write: {e}"));
        full
    }
}

impl Default for Sandbox {
    fn default() -> Self {
        Self::new()
    }
}
