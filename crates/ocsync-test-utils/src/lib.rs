//! Shared test utilities for the ocsync workspace.
//!
//! Dev-dependency only, never published.
//!
//! # Modules
//!
//! - [`git`]: a local bare remote with working clones, driven through the `git` CLI
//! - [`sandbox`]: an isolated home directory with XDG config and data roots

pub mod git;
pub mod sandbox;

pub use git::{RemoteFixture, run_git};
pub use sandbox::Sandbox;
