//! Repo Gateway: the version-control capability the sync engine relies on
//!
//! [`RepoGateway`] is the contract. [`GitGateway`] fulfils it by shelling out
//! to `git` and `gh` for network and mutating steps, and using libgit2 for
//! inspection and the fast-forward itself.

use std::fs;
use std::path::Path;

use git2::build::CheckoutBuilder;
use git2::{ErrorCode, Repository, Status, StatusOptions};
use serde::Deserialize;

use crate::branch;
use crate::identity::RepoIdentity;
use crate::runner::{CommandRunner, SystemRunner};
use crate::{Error, Result};

/// Snapshot of a clone's working tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepoStatus {
    /// Checked-out branch; `None` when `HEAD` is detached
    pub branch: Option<String>,
    /// One `<code> <path>` line per changed or untracked path
    pub changes: Vec<String>,
}

/// Outcome of [`RepoGateway::fetch_and_fast_forward`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FastForward {
    pub updated: bool,
}

/// Operations the sync engine needs from a local clone and its remote.
pub trait RepoGateway {
    fn is_repo_cloned(&self, root: &Path) -> bool;

    /// Clone `remote` into `root` unless it is already a clone of it.
    ///
    /// Fails if `root` is a clone of a different remote or a non-empty
    /// directory that is not a repository.
    fn ensure_repo_cloned(&self, remote: &RepoIdentity, branch: Option<&str>, root: &Path)
    -> Result<()>;

    fn resolve_repo_branch(&self, configured: Option<&str>, observed: Option<&str>) -> String {
        branch::resolve_repo_branch(configured, observed)
    }

    /// Whether the working tree differs from `HEAD`, untracked files included.
    fn has_local_changes(&self, root: &Path) -> Result<bool>;

    fn repo_status(&self, root: &Path) -> Result<RepoStatus>;

    /// Fetch `origin` and fast-forward `branch` to `origin/<branch>`.
    ///
    /// Never merges: a local branch that is not an ancestor of upstream
    /// yields [`Error::Diverged`]. An upstream branch that does not exist yet
    /// reports `updated: false`.
    fn fetch_and_fast_forward(&self, root: &Path, branch: &str) -> Result<FastForward>;

    /// Name/status plus diffstat of the working tree against `HEAD`.
    fn diff_summary(&self, root: &Path) -> Result<String>;

    fn commit_all(&self, root: &Path, message: &str) -> Result<()>;

    fn push_branch(&self, root: &Path, branch: &str) -> Result<()>;

    /// Commits on `branch` that `origin/<branch>` lacks, as of the last fetch.
    ///
    /// A branch without an upstream counts all of its commits; an unborn
    /// branch has none.
    fn unpushed_commits(&self, root: &Path, branch: &str) -> Result<usize>;

    /// Fails unless the hosting provider reports the repository as private.
    fn ensure_repo_private(&self, remote: &RepoIdentity) -> Result<()>;
}

/// [`RepoGateway`] backed by the `git` and `gh` executables plus libgit2.
#[derive(Debug, Default, Clone)]
pub struct GitGateway<R = SystemRunner> {
    runner: R,
}

impl GitGateway<SystemRunner> {
    pub fn system() -> Self {
        Self::new(SystemRunner)
    }
}

impl<R: CommandRunner> GitGateway<R> {
    pub fn new(runner: R) -> Self {
        Self { runner }
    }

    fn git(&self, root: &Path, args: &[&str]) -> Result<String> {
        self.runner.run("git", args, Some(root))
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Visibility {
    is_private: bool,
}

fn checked_out_branch(repo: &Repository) -> Result<Option<String>> {
    if repo.head_detached()? {
        return Ok(None);
    }
    // Read the symbolic ref directly so an unborn branch still has a name
    let head = repo.find_reference("HEAD")?;
    Ok(head
        .symbolic_target()
        .and_then(|target| target.strip_prefix("refs/heads/"))
        .map(str::to_string))
}

fn status_code(status: Status) -> &'static str {
    if status.is_conflicted() {
        "U"
    } else if status.is_wt_new() {
        "??"
    } else if status.is_index_new() {
        "A"
    } else if status.intersects(Status::INDEX_DELETED | Status::WT_DELETED) {
        "D"
    } else if status.intersects(Status::INDEX_RENAMED | Status::WT_RENAMED) {
        "R"
    } else if status.intersects(Status::INDEX_TYPECHANGE | Status::WT_TYPECHANGE) {
        "T"
    } else {
        "M"
    }
}

fn status_options() -> StatusOptions {
    let mut opts = StatusOptions::new();
    opts.include_untracked(true)
        .recurse_untracked_dirs(true)
        .include_ignored(false);
    opts
}

impl<R: CommandRunner> RepoGateway for GitGateway<R> {
    fn is_repo_cloned(&self, root: &Path) -> bool {
        root.join(".git").exists() && Repository::open(root).is_ok()
    }

    fn ensure_repo_cloned(
        &self,
        remote: &RepoIdentity,
        branch: Option<&str>,
        root: &Path,
    ) -> Result<()> {
        if self.is_repo_cloned(root) {
            let repo = Repository::open(root)?;
            let actual = repo
                .find_remote("origin")
                .ok()
                .and_then(|origin| origin.url().map(str::to_string));
            return match actual {
                Some(url) if remote.matches_remote_url(&url) => {
                    tracing::debug!(root = %root.display(), "repository already cloned");
                    Ok(())
                }
                other => Err(Error::RemoteMismatch {
                    path: root.to_path_buf(),
                    expected: remote.display_name(),
                    actual: other.unwrap_or_else(|| "no origin remote".into()),
                }),
            };
        }

        if root.exists() {
            let occupied = !root.is_dir()
                || fs::read_dir(root)
                    .map_err(|e| Error::io(root, e))?
                    .next()
                    .is_some();
            if occupied {
                return Err(Error::TargetNotEmpty {
                    path: root.to_path_buf(),
                });
            }
        }
        if let Some(parent) = root.parent() {
            fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
        }

        let url = remote.clone_url();
        let target = root.to_string_lossy();
        let mut args: Vec<&str> = vec!["clone"];
        if let Some(branch) = branch {
            args.extend(["--branch", branch]);
        }
        args.extend([url.as_str(), &*target]);

        tracing::debug!(remote = %remote, root = %root.display(), "cloning repository");
        self.runner.run("git", &args, None)?;
        Ok(())
    }

    fn has_local_changes(&self, root: &Path) -> Result<bool> {
        let repo = Repository::open(root)?;
        let dirty = !repo.statuses(Some(&mut status_options()))?.is_empty();
        Ok(dirty)
    }

    fn repo_status(&self, root: &Path) -> Result<RepoStatus> {
        let repo = Repository::open(root)?;
        let branch = checked_out_branch(&repo)?;
        let statuses = repo.statuses(Some(&mut status_options()))?;
        let changes = statuses
            .iter()
            .filter_map(|entry| {
                entry
                    .path()
                    .map(|path| format!("{} {}", status_code(entry.status()), path))
            })
            .collect();
        Ok(RepoStatus { branch, changes })
    }

    fn fetch_and_fast_forward(&self, root: &Path, branch: &str) -> Result<FastForward> {
        self.git(root, &["fetch", "origin"])?;

        let repo = Repository::open(root)?;
        let upstream = match repo.find_reference(&format!("refs/remotes/origin/{branch}")) {
            Ok(reference) => reference.peel_to_commit()?,
            Err(e) if e.code() == ErrorCode::NotFound => {
                tracing::debug!(branch, "no upstream branch yet");
                return Ok(FastForward { updated: false });
            }
            Err(e) => return Err(e.into()),
        };

        let local_name = format!("refs/heads/{branch}");
        let mut local = match repo.find_reference(&local_name) {
            Ok(reference) => reference,
            Err(e) if e.code() == ErrorCode::NotFound => {
                // Clone of a remote that was empty at the time, or a branch
                // only upstream has
                repo.reference(
                    &local_name,
                    upstream.id(),
                    false,
                    &format!("ocsync: create {branch} at {}", upstream.id()),
                )?;
                repo.set_head(&local_name)?;
                repo.checkout_head(Some(CheckoutBuilder::default().force()))?;
                tracing::debug!(branch, commit = %upstream.id(), "created local branch from upstream");
                return Ok(FastForward { updated: true });
            }
            Err(e) => return Err(e.into()),
        };

        let annotated = repo.find_annotated_commit(upstream.id())?;
        let (analysis, _) = repo.merge_analysis_for_ref(&local, &[&annotated])?;

        if analysis.is_up_to_date() {
            return Ok(FastForward { updated: false });
        }

        if analysis.is_fast_forward() {
            local.set_target(
                upstream.id(),
                &format!("ocsync: fast-forward to {}", upstream.id()),
            )?;
            repo.set_head(&local_name)?;
            repo.checkout_head(Some(CheckoutBuilder::default().force()))?;
            tracing::debug!(branch, commit = %upstream.id(), "fast-forwarded");
            return Ok(FastForward { updated: true });
        }

        Err(Error::Diverged {
            branch: branch.to_string(),
        })
    }

    fn diff_summary(&self, root: &Path) -> Result<String> {
        let status = self.git(root, &["status", "--porcelain"])?;
        // An unborn HEAD has nothing to diff against
        let stat = self
            .git(root, &["diff", "HEAD", "--stat"])
            .unwrap_or_else(|e| {
                tracing::debug!(error = %e, "diffstat unavailable");
                String::new()
            });

        let parts: Vec<&str> = [status.trim_end(), stat.trim_end()]
            .into_iter()
            .filter(|part| !part.trim().is_empty())
            .collect();
        Ok(parts.join("\n\n"))
    }

    fn commit_all(&self, root: &Path, message: &str) -> Result<()> {
        self.git(root, &["add", "-A"])?;
        self.git(root, &["commit", "-m", message])?;
        Ok(())
    }

    fn push_branch(&self, root: &Path, branch: &str) -> Result<()> {
        self.git(root, &["push", "-u", "origin", branch])?;
        Ok(())
    }

    fn unpushed_commits(&self, root: &Path, branch: &str) -> Result<usize> {
        let repo = Repository::open(root)?;
        let local = match repo.find_reference(&format!("refs/heads/{branch}")) {
            Ok(reference) => reference.peel_to_commit()?.id(),
            Err(e) if e.code() == ErrorCode::NotFound => return Ok(0),
            Err(e) => return Err(e.into()),
        };

        match repo.find_reference(&format!("refs/remotes/origin/{branch}")) {
            Ok(reference) => {
                let upstream = reference.peel_to_commit()?.id();
                let (ahead, _behind) = repo.graph_ahead_behind(local, upstream)?;
                Ok(ahead)
            }
            Err(e) if e.code() == ErrorCode::NotFound => {
                let mut walk = repo.revwalk()?;
                walk.push(local)?;
                Ok(walk.count())
            }
            Err(e) => Err(e.into()),
        }
    }

    fn ensure_repo_private(&self, remote: &RepoIdentity) -> Result<()> {
        let repo = remote.display_name();
        let slug = remote.hosted_slug().ok_or_else(|| Error::VisibilityUnknown {
            repo: repo.clone(),
            reason: "remote is not a hosted owner/name repository".into(),
        })?;
        let target = slug.gh_target();

        let output = self
            .runner
            .run("gh", &["repo", "view", &target, "--json", "isPrivate"], None)
            .map_err(|e| Error::VisibilityUnknown {
                repo: repo.clone(),
                reason: e.to_string(),
            })?;
        let visibility: Visibility =
            serde_json::from_str(output.trim()).map_err(|e| Error::VisibilityUnknown {
                repo: repo.clone(),
                reason: format!("unexpected gh output: {e}"),
            })?;

        if !visibility.is_private {
            return Err(Error::NotPrivate { repo });
        }
        tracing::debug!(repo = %repo, "repository is private");
        Ok(())
    }
}
