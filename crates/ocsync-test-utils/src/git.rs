//! Git fixtures backed by a bare repository on local disk.
//!
//! A bare repository stands in for the hosted remote so clone, fetch and push
//! run for real without network access.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use tempfile::TempDir;

/// Run `git` in `dir`, returning trimmed stdout.
///
/// # Panics
/// Panics if the command cannot start or exits non-zero.
pub fn run_git(dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .env("GIT_TERMINAL_PROMPT", "0")
        .output()
        .unwrap_or_else(|e| panic!("run_git: failed to run `git {args:?}`: {e}"));
    if !output.status.success() {
        panic!(
            "run_git: `git {args:?}` in {} failed:\n{}",
            dir.display(),
            String::from_utf8_lossy(&output.stderr)
        );
    }
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

/// Give a working copy a committer identity and disable signing.
pub fn configure_identity(dir: &Path) {
    run_git(dir, &["config", "user.email", "test@test.com"]);
    run_git(dir, &["config", "user.name", "Test User"]);
    run_git(dir, &["config", "commit.gpgsign", "false"]);
}

/// A bare remote on `main` plus a seed clone used to publish upstream commits.
pub struct RemoteFixture {
    _temp: TempDir,
    bare: PathBuf,
    seed: PathBuf,
}

impl RemoteFixture {
    /// Bare remote whose `main` holds a single commit with `README.md`.
    ///
    /// # Panics
    /// Panics if any git operation fails.
    pub fn new() -> Self {
        let fixture = Self::empty();
        fixture.publish("README.md", "# Sync repo\n", "Initial commit");
        fixture
    }

    /// Bare remote with no commits at all.
    ///
    /// # Panics
    /// Panics if any git operation fails.
    pub fn empty() -> Self {
        let temp = TempDir::new().unwrap_or_else(|e| panic!("RemoteFixture: tempdir: {e}"));
        let bare = temp.path().join("remote.git");
        let seed = temp.path().join("seed");
        fs::create_dir_all(&bare).unwrap_or_else(|e| panic!("RemoteFixture: mkdir bare: {e}"));
        fs::create_dir_all(&seed).unwrap_or_else(|e| panic!("RemoteFixture: mkdir seed: {e}"));

        run_git(&bare, &["init", "--bare"]);
        run_git(&bare, &["symbolic-ref", "HEAD", "refs/heads/main"]);

        run_git(&seed, &["init"]);
        run_git(&seed, &["symbolic-ref", "HEAD", "refs/heads/main"]);
        configure_identity(&seed);
        let url = bare.to_string_lossy().into_owned();
        run_git(&seed, &["remote", "add", "origin", &url]);

        Self {
            _temp: temp,
            bare,
            seed,
        }
    }

    /// Remote URL usable with `git clone`.
    pub fn url(&self) -> String {
        self.bare.to_string_lossy().into_owned()
    }

    /// Commit `content` at `rel` from the seed clone and push it to `main`.
    ///
    /// Returns the new commit id.
    pub fn publish(&self, rel: &str, content: &str, message: &str) -> String {
        let path = self.seed.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap_or_else(|e| panic!("publish: mkdir: {e}"));
        }
        fs::write(&path, content).unwrap_or_else(|e| panic!("publish: write {rel}: {e}"));
        run_git(&self.seed, &["add", "-A"]);
        run_git(&self.seed, &["commit", "-m", message]);
        run_git(&self.seed, &["push", "origin", "main"]);
        run_git(&self.seed, &["rev-parse", "HEAD"])
    }

    /// Clone the remote into `dest` with a committer identity configured.
    pub fn clone_into(&self, dest: &Path) {
        let parent = dest
            .parent()
            .unwrap_or_else(|| panic!("clone_into: {} has no parent", dest.display()));
        fs::create_dir_all(parent).unwrap_or_else(|e| panic!("clone_into: mkdir: {e}"));
        let dest_str = dest.to_string_lossy().into_owned();
        run_git(parent, &["clone", "--branch", "main", &self.url(), &dest_str]);
        configure_identity(dest);
    }

    /// Commit id that `main` points at on the remote.
    pub fn remote_head(&self) -> String {
        head_commit(&self.bare, "refs/heads/main")
    }

    /// Read a file from the remote's `main` tip.
    pub fn remote_file(&self, rel: &str) -> Option<String> {
        let repo = git2::Repository::open_bare(&self.bare)
            .unwrap_or_else(|e| panic!("remote_file: open bare: {e}"));
        let tree = repo
            .find_reference("refs/heads/main")
            .and_then(|r| r.peel_to_tree())
            .unwrap_or_else(|e| panic!("remote_file: main tree: {e}"));
        let entry = tree.get_path(Path::new(rel)).ok()?;
        let blob = repo.find_blob(entry.id()).ok()?;
        Some(String::from_utf8_lossy(blob.content()).into_owned())
    }
}

impl Default for RemoteFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// Commit id a reference resolves to, read through `git2`.
///
/// # Panics
/// Panics if the repository or reference cannot be resolved.
pub fn head_commit(repo_path: &Path, reference: &str) -> String {
    let repo = git2::Repository::open(repo_path)
        .unwrap_or_else(|e| panic!("head_commit: open {}: {e}", repo_path.display()));
    repo.find_reference(reference)
        .and_then(|r| r.peel_to_commit())
        .map(|c| c.id().to_string())
        .unwrap_or_else(|e| panic!("head_commit: resolve {reference}: {e}"))
}
