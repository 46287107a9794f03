//! Sync orchestrator
//!
//! Startup, pull, push, status, init and enable-secrets are traversals of one
//! phase machine. Each flow first runs a shared preamble (config, privacy,
//! clone, branch) and then checks the clone is clean before mutating it.

use std::cell::Cell;
use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use ocsync_git::{FastForward, RepoIdentity};

use crate::commit_message::CommitMessageGenerator;
use crate::config::{RepoConfig, SyncConfig};
use crate::context::{NoticeLevel, SyncContext};
use crate::error::ErrorKind;
use crate::overlay::Overrides;
use crate::plan::{SyncPlan, build_plan};
use crate::reconcile::{sync_local_to_repo, sync_repo_to_local};
use crate::state::SyncState;
use crate::{Error, Result};

pub const ALREADY_UP_TO_DATE: &str = "Already up to date.";
pub const PULLED: &str = "Pulled latest config. Restart OpenCode to apply.";
pub const NOTHING_TO_PUSH: &str = "No local changes to push.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    Unconfigured,
    Ready,
    Cloning,
    CheckingDirty,
    /// Terminal for this run; needs manual resolution
    Diverged,
    FastForwarding,
    Reconciling,
    Committing,
    Pushing,
    Done,
}

impl fmt::Display for SyncPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Unconfigured => "unconfigured",
            Self::Ready => "ready",
            Self::Cloning => "cloning",
            Self::CheckingDirty => "checking-dirty",
            Self::Diverged => "diverged",
            Self::FastForwarding => "fast-forwarding",
            Self::Reconciling => "reconciling",
            Self::Committing => "committing",
            Self::Pushing => "pushing",
            Self::Done => "done",
        };
        f.write_str(name)
    }
}

/// What an unattended startup sync did. Startup never returns an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartupOutcome {
    Unconfigured,
    /// The clone had uncommitted changes; nothing was touched
    SkippedDirty,
    /// Remote changes were applied locally
    Pulled,
    Pushed { message: String },
    UpToDate,
    Failed { kind: ErrorKind, message: String },
}

/// Options for creating a machine's sync config.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitOptions {
    pub repo: RepoIdentity,
    pub branch: Option<String>,
    pub include_secrets: bool,
    pub extra_secret_paths: Vec<String>,
    pub local_repo_path: Option<String>,
}

impl InitOptions {
    pub fn new(repo: RepoIdentity) -> Self {
        Self {
            repo,
            branch: None,
            include_secrets: false,
            extra_secret_paths: Vec::new(),
            local_repo_path: None,
        }
    }

    fn into_config(self) -> SyncConfig {
        SyncConfig {
            repo: RepoConfig {
                identity: self.repo,
                branch: self.branch,
            },
            include_secrets: self.include_secrets,
            extra_secret_paths: self.extra_secret_paths,
            local_repo_path: self.local_repo_path,
        }
    }
}

/// Result of the shared preamble.
struct Prepared {
    config: SyncConfig,
    repo_root: PathBuf,
    branch: String,
    plan: SyncPlan,
}

pub struct SyncOrchestrator<'a> {
    ctx: &'a SyncContext<'a>,
    phase: Cell<SyncPhase>,
}

impl<'a> SyncOrchestrator<'a> {
    pub fn new(ctx: &'a SyncContext<'a>) -> Self {
        Self {
            ctx,
            phase: Cell::new(SyncPhase::Ready),
        }
    }

    /// Phase the last flow reached.
    pub fn phase(&self) -> SyncPhase {
        self.phase.get()
    }

    fn enter(&self, phase: SyncPhase) {
        let from = self.phase.replace(phase);
        tracing::debug!(%from, to = %phase, "sync phase");
    }

    fn load_config(&self) -> Result<SyncConfig> {
        SyncConfig::load(&self.ctx.locations.sync_config_path).inspect_err(|e| {
            if matches!(e, Error::ConfigMissing { .. }) {
                self.enter(SyncPhase::Unconfigured);
            }
        })
    }

    fn prepare(&self) -> Result<Prepared> {
        let config = self.load_config()?;
        self.enter(SyncPhase::Ready);

        let gateway = self.ctx.gateway;
        // Checked before the clone so a public remote never receives a write
        if config.include_secrets {
            gateway.ensure_repo_private(&config.repo.identity)?;
        }

        let repo_root = self.ctx.locations.repo_root(&config);
        self.enter(SyncPhase::Cloning);
        gateway.ensure_repo_cloned(
            &config.repo.identity,
            config.configured_branch(),
            &repo_root,
        )?;

        let observed = match gateway.repo_status(&repo_root) {
            Ok(status) => status.branch,
            Err(e) => {
                tracing::warn!(error = %e, "repo status failed, using configured branch");
                None
            }
        };
        let branch = gateway.resolve_repo_branch(config.configured_branch(), observed.as_deref());

        let plan = build_plan(&config, &self.ctx.locations, &repo_root, self.ctx.platform);
        tracing::debug!(
            repo = %config.repo.identity,
            root = %repo_root.display(),
            branch = %branch,
            items = plan.items.len(),
            "sync prepared"
        );

        Ok(Prepared {
            config,
            repo_root,
            branch,
            plan,
        })
    }

    fn is_dirty(&self, prepared: &Prepared) -> Result<bool> {
        self.enter(SyncPhase::CheckingDirty);
        Ok(self.ctx.gateway.has_local_changes(&prepared.repo_root)?)
    }

    fn require_clean(&self, prepared: &Prepared) -> Result<()> {
        if self.is_dirty(prepared)? {
            return Err(Error::DirtyRepoConflict {
                path: prepared.repo_root.clone(),
            });
        }
        Ok(())
    }

    fn fast_forward(&self, prepared: &Prepared) -> Result<FastForward> {
        self.enter(SyncPhase::FastForwarding);
        self.ctx
            .gateway
            .fetch_and_fast_forward(&prepared.repo_root, &prepared.branch)
            .map_err(|e| match e {
                ocsync_git::Error::Diverged { branch } => {
                    self.enter(SyncPhase::Diverged);
                    Error::Diverged {
                        branch,
                        path: prepared.repo_root.clone(),
                    }
                }
                other => other.into(),
            })
    }

    fn apply_remote(&self, prepared: &Prepared, overrides: &Overrides) -> Result<()> {
        self.enter(SyncPhase::Reconciling);
        let report = sync_repo_to_local(&prepared.plan, overrides)?;
        tracing::debug!(written = report.written.len(), "applied remote changes");

        let now = Utc::now();
        SyncState::update(&self.ctx.locations.state_path, |state| {
            state.last_pull = Some(now);
            state.last_remote_update = Some(now);
        })?;
        Ok(())
    }

    /// Reconcile local → repo; `true` if the clone now has changes to commit.
    fn stage_local(&self, prepared: &Prepared, overrides: &Overrides) -> Result<bool> {
        self.enter(SyncPhase::Reconciling);
        let report = sync_local_to_repo(&prepared.plan, overrides)?;
        let changed = self.ctx.gateway.has_local_changes(&prepared.repo_root)?;
        tracing::debug!(
            written = report.written.len(),
            removed = report.removed.len(),
            changed,
            "staged local config"
        );
        Ok(changed)
    }

    fn commit_and_push(&self, prepared: &Prepared) -> Result<String> {
        let gateway = self.ctx.gateway;

        self.enter(SyncPhase::Committing);
        let generator = CommitMessageGenerator::new(
            gateway,
            self.ctx.sessions,
            &self.ctx.locations.config_root,
        );
        let message = generator.generate(&prepared.repo_root);
        gateway.commit_all(&prepared.repo_root, &message)?;

        self.push_to_remote(prepared)?;
        Ok(message)
    }

    /// Push commits a failed earlier push left behind; returns how many.
    fn push_pending(&self, prepared: &Prepared) -> Result<usize> {
        let unpushed = self
            .ctx
            .gateway
            .unpushed_commits(&prepared.repo_root, &prepared.branch)?;
        if unpushed > 0 {
            tracing::info!(unpushed, branch = %prepared.branch, "pushing earlier commits");
            self.push_to_remote(prepared)?;
        }
        Ok(unpushed)
    }

    fn push_to_remote(&self, prepared: &Prepared) -> Result<()> {
        self.enter(SyncPhase::Pushing);
        self.ctx
            .gateway
            .push_branch(&prepared.repo_root, &prepared.branch)?;

        SyncState::update(&self.ctx.locations.state_path, |state| {
            state.last_push = Some(Utc::now());
        })?;
        Ok(())
    }

    /// Unattended sync at host startup.
    pub fn startup(&self) -> StartupOutcome {
        match self.run_startup() {
            Ok(outcome) => outcome,
            Err(Error::ConfigMissing { .. }) => {
                tracing::debug!("no sync config, skipping startup sync");
                StartupOutcome::Unconfigured
            }
            Err(e) => {
                tracing::warn!(error = %e, phase = %self.phase(), "startup sync failed");
                self.ctx
                    .notifier
                    .notify(NoticeLevel::Error, &format!("Config sync failed: {e}"));
                StartupOutcome::Failed {
                    kind: e.kind(),
                    message: e.to_string(),
                }
            }
        }
    }

    fn run_startup(&self) -> Result<StartupOutcome> {
        let prepared = self.prepare()?;

        if self.is_dirty(&prepared)? {
            self.ctx.notifier.notify(
                NoticeLevel::Warning,
                &format!(
                    "Sync repo at {} has uncommitted changes. Skipping sync until it is clean.",
                    prepared.repo_root.display()
                ),
            );
            self.enter(SyncPhase::Done);
            return Ok(StartupOutcome::SkippedDirty);
        }

        let overrides = Overrides::load(&self.ctx.locations)?;

        if self.fast_forward(&prepared)?.updated {
            self.apply_remote(&prepared, &overrides)?;
            self.ctx.notifier.notify(NoticeLevel::Info, PULLED);
            self.enter(SyncPhase::Done);
            return Ok(StartupOutcome::Pulled);
        }

        let message = if self.stage_local(&prepared, &overrides)? {
            self.commit_and_push(&prepared)?
        } else {
            match self.push_pending(&prepared)? {
                0 => {
                    self.enter(SyncPhase::Done);
                    return Ok(StartupOutcome::UpToDate);
                }
                n => pending_commits(n),
            }
        };
        self.ctx
            .notifier
            .notify(NoticeLevel::Info, &format!("Pushed changes: {message}"));
        self.enter(SyncPhase::Done);
        Ok(StartupOutcome::Pushed { message })
    }

    /// Fetch and apply remote changes.
    pub fn pull(&self) -> Result<String> {
        let prepared = self.prepare()?;
        self.require_clean(&prepared)?;
        let overrides = Overrides::load(&self.ctx.locations)?;

        if !self.fast_forward(&prepared)?.updated {
            self.enter(SyncPhase::Done);
            return Ok(ALREADY_UP_TO_DATE.to_string());
        }

        self.apply_remote(&prepared, &overrides)?;
        self.ctx.notifier.notify(NoticeLevel::Info, PULLED);
        self.enter(SyncPhase::Done);
        Ok(PULLED.to_string())
    }

    /// Commit and push local changes.
    pub fn push(&self) -> Result<String> {
        let prepared = self.prepare()?;
        self.require_clean(&prepared)?;
        let overrides = Overrides::load(&self.ctx.locations)?;

        let message = if self.stage_local(&prepared, &overrides)? {
            self.commit_and_push(&prepared)?
        } else {
            match self.push_pending(&prepared)? {
                0 => {
                    self.enter(SyncPhase::Done);
                    return Ok(NOTHING_TO_PUSH.to_string());
                }
                n => pending_commits(n),
            }
        };
        self.enter(SyncPhase::Done);
        Ok(format!("Pushed changes: {message}"))
    }

    /// One-line summary of the sync setup.
    pub fn status(&self) -> Result<String> {
        let prepared = self.prepare()?;
        let status = self.ctx.gateway.repo_status(&prepared.repo_root)?;
        let unpushed = self
            .ctx
            .gateway
            .unpushed_commits(&prepared.repo_root, &prepared.branch)?;
        let state = SyncState::load_or_default(&self.ctx.locations.state_path);
        self.enter(SyncPhase::Done);

        let secrets = if prepared.config.include_secrets {
            format!("on ({} extra)", prepared.plan.extra_secrets.allowlist.len())
        } else {
            "off".to_string()
        };
        let mut pending = match status.changes.len() {
            0 => "clean".to_string(),
            1 => "1 pending change".to_string(),
            n => format!("{n} pending changes"),
        };
        match unpushed {
            0 => {}
            1 => pending.push_str(", 1 unpushed commit"),
            n => pending.push_str(&format!(", {n} unpushed commits")),
        }

        Ok(format!(
            "{} on {} | secrets: {} | {} | last pull: {} | last push: {}",
            prepared.config.repo.identity,
            prepared.branch,
            secrets,
            pending,
            format_timestamp(state.last_pull),
            format_timestamp(state.last_push),
        ))
    }

    /// Turn on secrets sync after confirming the remote is private.
    pub fn enable_secrets(&self, extra_secret_paths: Option<Vec<String>>) -> Result<String> {
        let mut config = self.load_config()?;
        config.include_secrets = true;
        if let Some(paths) = extra_secret_paths {
            config.extra_secret_paths = paths;
        }

        self.ctx
            .gateway
            .ensure_repo_private(&config.repo.identity)?;
        config.save(&self.ctx.locations.sync_config_path)?;
        self.enter(SyncPhase::Done);

        Ok(format!("Secrets sync enabled for {}.", config.repo.identity))
    }

    /// Write this machine's sync config and clone the repository.
    pub fn init(&self, options: InitOptions) -> Result<String> {
        let config = options.into_config();
        let gateway = self.ctx.gateway;

        if config.include_secrets {
            gateway.ensure_repo_private(&config.repo.identity)?;
        }
        config.save(&self.ctx.locations.sync_config_path)?;
        self.enter(SyncPhase::Ready);

        let repo_root = self.ctx.locations.repo_root(&config);
        self.enter(SyncPhase::Cloning);
        gateway.ensure_repo_cloned(
            &config.repo.identity,
            config.configured_branch(),
            &repo_root,
        )?;
        self.enter(SyncPhase::Done);

        Ok(format!(
            "Sync configured for {} at {}.",
            config.repo.identity,
            repo_root.display()
        ))
    }
}

fn pending_commits(count: usize) -> String {
    match count {
        1 => "1 pending commit".to_string(),
        n => format!("{n} pending commits"),
    }
}

fn format_timestamp(timestamp: Option<DateTime<Utc>>) -> String {
    timestamp.map_or_else(
        || "never".to_string(),
        |t| t.format("%Y-%m-%d %H:%M UTC").to_string(),
    )
}
