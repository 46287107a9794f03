//! In-memory fakes and a sandboxed machine for ocsync-core tests.
#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};

use ocsync_core::{
    EnvSnapshot, ModelError, ModelRef, ModelReply, ModelSessions, NoticeLevel, Notifier,
    Platform, SessionId, SyncConfig, SyncLocations,
};
use ocsync_git::{Error as GitError, FastForward, RepoGateway, RepoIdentity, RepoStatus};
use ocsync_test_utils::Sandbox;

/// A machine with its own home, XDG roots and resolved locations.
pub struct Machine {
    pub sandbox: Sandbox,
    pub locations: SyncLocations,
}

impl Machine {
    pub fn new() -> Self {
        let sandbox = Sandbox::new();
        let env = EnvSnapshot::new(Some(sandbox.home().to_path_buf()))
            .with_var("XDG_CONFIG_HOME", sandbox.xdg_config().to_string_lossy())
            .with_var("XDG_DATA_HOME", sandbox.xdg_data().to_string_lossy());
        let locations = SyncLocations::resolve(&env, Platform::Unix).unwrap();
        Self { sandbox, locations }
    }

    pub fn write_config(&self, config: &SyncConfig) {
        config.save(&self.locations.sync_config_path).unwrap();
    }

    pub fn read_config(&self) -> SyncConfig {
        SyncConfig::load(&self.locations.sync_config_path).unwrap()
    }

    pub fn repo_root(&self) -> PathBuf {
        self.locations.default_repo_root.clone()
    }

    /// Write under the OpenCode config root.
    pub fn write_local(&self, rel: &str, content: &str) -> PathBuf {
        write_file(&self.locations.config_root.join(rel), content)
    }

    pub fn read_local(&self, rel: &str) -> Option<String> {
        fs::read_to_string(self.locations.config_root.join(rel)).ok()
    }

    /// Write under the data dir.
    pub fn write_data(&self, rel: &str, content: &str) -> PathBuf {
        write_file(&self.locations.data_dir.join(rel), content)
    }

    pub fn write_repo(&self, rel: &str, content: &str) -> PathBuf {
        write_file(&self.repo_root().join(rel), content)
    }

    pub fn read_repo(&self, rel: &str) -> Option<String> {
        fs::read_to_string(self.repo_root().join(rel)).ok()
    }

    pub fn write_overrides(&self, content: &str) {
        write_file(&self.locations.overrides_path, content);
    }
}

pub fn write_file(path: &Path, content: &str) -> PathBuf {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
    path.to_path_buf()
}

pub fn acme_config() -> SyncConfig {
    SyncConfig::new(RepoIdentity::slug("acme", "cfg"))
}

/// What the fake remote does on fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Remote {
    UpToDate,
    Updated,
    Diverged,
    Unreachable,
}

/// Scripted [`RepoGateway`] that records every call.
pub struct FakeGateway {
    pub cloned: Cell<bool>,
    /// Answers to successive `has_local_changes` calls
    pub dirty: RefCell<VecDeque<bool>>,
    /// Answer once the queue is drained
    pub dirty_default: Cell<bool>,
    pub remote: Cell<Remote>,
    /// `Some(is_private)`, or `None` when visibility cannot be determined
    pub private: Cell<Option<bool>>,
    pub branch: RefCell<Option<String>>,
    pub status_fails: Cell<bool>,
    pub diff: RefCell<String>,
    pub calls: RefCell<Vec<String>>,
    pub commits: RefCell<Vec<String>>,
    pub pushes: RefCell<Vec<String>>,
    /// Commits made since the last successful push
    pub unpushed: Cell<usize>,
    pub push_fails: Cell<bool>,
}

impl FakeGateway {
    pub fn new() -> Self {
        Self {
            cloned: Cell::new(false),
            dirty: RefCell::new(VecDeque::new()),
            dirty_default: Cell::new(false),
            remote: Cell::new(Remote::UpToDate),
            private: Cell::new(Some(true)),
            branch: RefCell::new(Some("main".into())),
            status_fails: Cell::new(false),
            diff: RefCell::new(String::new()),
            calls: RefCell::new(Vec::new()),
            commits: RefCell::new(Vec::new()),
            pushes: RefCell::new(Vec::new()),
            unpushed: Cell::new(0),
            push_fails: Cell::new(false),
        }
    }

    /// Clean for the pre-flight check, then changed after reconciling.
    pub fn with_dirty_sequence(self, answers: &[bool]) -> Self {
        self.dirty.borrow_mut().extend(answers.iter().copied());
        self
    }

    pub fn called(&self, name: &str) -> bool {
        self.calls.borrow().iter().any(|call| call == name)
    }

    fn record(&self, name: &str) {
        self.calls.borrow_mut().push(name.to_string());
    }
}

impl RepoGateway for FakeGateway {
    fn is_repo_cloned(&self, _root: &Path) -> bool {
        self.cloned.get()
    }

    fn ensure_repo_cloned(
        &self,
        _remote: &RepoIdentity,
        _branch: Option<&str>,
        root: &Path,
    ) -> ocsync_git::Result<()> {
        self.record("ensure_repo_cloned");
        if !self.cloned.get() {
            self.record("clone");
            fs::create_dir_all(root).map_err(|e| GitError::io(root, e))?;
            self.cloned.set(true);
        }
        Ok(())
    }

    fn has_local_changes(&self, _root: &Path) -> ocsync_git::Result<bool> {
        self.record("has_local_changes");
        Ok(self
            .dirty
            .borrow_mut()
            .pop_front()
            .unwrap_or(self.dirty_default.get()))
    }

    fn repo_status(&self, _root: &Path) -> ocsync_git::Result<RepoStatus> {
        self.record("repo_status");
        if self.status_fails.get() {
            return Err(GitError::CommandFailed {
                command: "git status".into(),
                code: 128,
                stderr: "fatal: not a git repository".into(),
            });
        }
        Ok(RepoStatus {
            branch: self.branch.borrow().clone(),
            changes: Vec::new(),
        })
    }

    fn fetch_and_fast_forward(&self, _root: &Path, branch: &str) -> ocsync_git::Result<FastForward> {
        self.record("fetch_and_fast_forward");
        match self.remote.get() {
            Remote::UpToDate => Ok(FastForward { updated: false }),
            Remote::Updated => Ok(FastForward { updated: true }),
            Remote::Diverged => Err(GitError::Diverged {
                branch: branch.to_string(),
            }),
            Remote::Unreachable => Err(GitError::CommandFailed {
                command: "git fetch origin".into(),
                code: 128,
                stderr: "fatal: could not read from remote repository".into(),
            }),
        }
    }

    fn diff_summary(&self, _root: &Path) -> ocsync_git::Result<String> {
        self.record("diff_summary");
        Ok(self.diff.borrow().clone())
    }

    fn commit_all(&self, _root: &Path, message: &str) -> ocsync_git::Result<()> {
        self.record("commit_all");
        self.commits.borrow_mut().push(message.to_string());
        self.unpushed.set(self.unpushed.get() + 1);
        Ok(())
    }

    fn push_branch(&self, _root: &Path, branch: &str) -> ocsync_git::Result<()> {
        self.record("push_branch");
        if self.push_fails.get() {
            return Err(GitError::CommandFailed {
                command: format!("git push -u origin {branch}"),
                code: 128,
                stderr: "fatal: unable to access remote".into(),
            });
        }
        self.pushes.borrow_mut().push(branch.to_string());
        self.unpushed.set(0);
        Ok(())
    }

    fn unpushed_commits(&self, _root: &Path, _branch: &str) -> ocsync_git::Result<usize> {
        self.record("unpushed_commits");
        Ok(self.unpushed.get())
    }

    fn ensure_repo_private(&self, remote: &RepoIdentity) -> ocsync_git::Result<()> {
        self.record("ensure_repo_private");
        match self.private.get() {
            Some(true) => Ok(()),
            Some(false) => Err(GitError::NotPrivate {
                repo: remote.display_name(),
            }),
            None => Err(GitError::VisibilityUnknown {
                repo: remote.display_name(),
                reason: "gh: authentication required".into(),
            }),
        }
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub notices: RefCell<Vec<(NoticeLevel, String)>>,
}

impl RecordingNotifier {
    pub fn levels(&self) -> Vec<NoticeLevel> {
        self.notices.borrow().iter().map(|(level, _)| *level).collect()
    }

    pub fn messages(&self) -> Vec<String> {
        self.notices.borrow().iter().map(|(_, m)| m.clone()).collect()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, level: NoticeLevel, message: &str) {
        self.notices.borrow_mut().push((level, message.to_string()));
    }
}

/// Scripted [`ModelSessions`] that records the session lifecycle.
pub struct ScriptedSessions {
    pub create: Result<(), ModelError>,
    pub reply: Result<ModelReply, ModelError>,
    pub release: Result<(), ModelError>,
    pub log: RefCell<Vec<String>>,
    pub prompts: RefCell<Vec<String>>,
}

impl ScriptedSessions {
    pub fn replying(text: &str) -> Self {
        Self {
            create: Ok(()),
            reply: Ok(ModelReply::text(text)),
            release: Ok(()),
            log: RefCell::new(Vec::new()),
            prompts: RefCell::new(Vec::new()),
        }
    }

    /// Every step fails.
    pub fn broken() -> Self {
        Self {
            create: Err(ModelError::Unavailable("host down".into())),
            reply: Err(ModelError::Request("timeout".into())),
            release: Err(ModelError::Request("timeout".into())),
            log: RefCell::new(Vec::new()),
            prompts: RefCell::new(Vec::new()),
        }
    }
}

impl ModelSessions for ScriptedSessions {
    fn create_session(&self, _title: &str) -> Result<SessionId, ModelError> {
        self.log.borrow_mut().push("create".into());
        self.create.clone().map(|()| SessionId("ses_1".into()))
    }

    fn prompt(
        &self,
        session: &SessionId,
        model: &ModelRef,
        text: &str,
    ) -> Result<ModelReply, ModelError> {
        self.log
            .borrow_mut()
            .push(format!("prompt {} {}/{}", session.0, model.provider_id, model.model_id));
        self.prompts.borrow_mut().push(text.to_string());
        self.reply.clone()
    }

    fn delete_session(&self, session: &SessionId) -> Result<(), ModelError> {
        self.log.borrow_mut().push(format!("delete {}", session.0));
        self.release.clone()
    }
}
