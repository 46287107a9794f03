//! Sync engine for ocsync
//!
//! Keeps a machine's OpenCode configuration in step with a shared git
//! repository:
//!
//! - **Locations**: platform-specific config, data and clone paths
//! - **Planning**: which local paths map to which repo paths, secrets gated
//! - **Overlay**: machine-local overrides merged in on pull and stripped on push
//! - **Reconciliation**: copying a plan in either direction
//! - **Orchestration**: startup, pull, push, status, init and enable-secrets
//!
//! # Architecture
//!
//! ```text
//!        ocsync-cli
//!            |
//!       ocsync-core
//!            |
//!     +------+------+
//!     |             |
//! ocsync-fs    ocsync-git
//! ```

pub mod commit_message;
pub mod config;
pub mod context;
pub mod error;
pub mod locations;
pub mod orchestrator;
pub mod overlay;
pub mod plan;
pub mod reconcile;
pub mod state;

pub use commit_message::{
    CommitMessageGenerator, ModelError, ModelRef, ModelReply, ModelSessions, OfflineSessions,
    ReplyPart, SessionId, fallback_message,
};
pub use config::{RepoConfig, SyncConfig};
pub use context::{NoticeLevel, Notifier, SilentNotifier, SyncContext};
pub use error::{Error, ErrorKind, Result};
pub use locations::{EnvSnapshot, Platform, SyncLocations};
pub use orchestrator::{InitOptions, StartupOutcome, SyncOrchestrator, SyncPhase};
pub use overlay::Overrides;
pub use plan::{ExtraSecretEntry, ExtraSecrets, ItemKind, SyncItem, SyncPlan, build_plan};
pub use reconcile::{ReconcileReport, sync_local_to_repo, sync_repo_to_local};
pub use state::SyncState;
