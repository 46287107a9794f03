//! Git and hosting-provider gateway for ocsync
//!
//! Wraps the local clone of the shared config repository behind the
//! [`RepoGateway`] trait so the sync engine can be exercised without real
//! processes.

pub mod branch;
pub mod error;
pub mod gateway;
pub mod identity;
pub mod runner;

pub use branch::{DEFAULT_BRANCH, resolve_repo_branch};
pub use error::{Error, Result};
pub use gateway::{FastForward, GitGateway, RepoGateway, RepoStatus};
pub use identity::{HostedSlug, RepoIdentity, parse_remote_url};
pub use runner::{CommandRunner, SystemRunner};
