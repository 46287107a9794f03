//! CLI argument parsing using clap derive

use clap::{Args, Parser, Subcommand};
use ocsync_git::RepoIdentity;

use crate::error::{CliError, Result};

/// ocsync - Keep OpenCode configuration in sync across machines
#[derive(Parser, Debug)]
#[command(name = "ocsync")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// The command to run
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available commands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Configure this machine and clone the sync repository
    ///
    /// Examples:
    ///   ocsync init --owner acme --name opencode-config
    ///   ocsync init --url git@github.com:acme/opencode-config.git --branch sync
    Init {
        #[command(flatten)]
        repo: RepoArgs,

        /// Branch to sync (defaults to the clone's current branch, then main)
        #[arg(short, long)]
        branch: Option<String>,

        /// Also sync credentials; the remote must be private
        #[arg(long)]
        include_secrets: bool,

        /// Extra secret file or directory to sync (repeatable)
        #[arg(long = "extra-secret", value_name = "PATH")]
        extra_secrets: Vec<String>,

        /// Where to keep the local clone
        #[arg(long, value_name = "PATH", env = "OCSYNC_REPO_PATH")]
        repo_path: Option<String>,
    },

    /// Show the sync repository, branch and last sync times
    Status,

    /// Fetch the sync repository and apply remote changes locally
    Pull,

    /// Commit local changes and push them to the sync repository
    Push,

    /// Turn on secrets sync after checking the repository is private
    EnableSecrets {
        /// Replace the extra secret paths (repeatable)
        #[arg(long = "extra-secret", value_name = "PATH")]
        extra_secrets: Vec<String>,
    },

    /// Run the unattended sync performed when OpenCode starts
    Startup,
}

/// Which repository to sync with.
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct RepoArgs {
    /// Repository owner on GitHub
    #[arg(long, requires = "name", conflicts_with = "url")]
    pub owner: Option<String>,

    /// Repository name on GitHub
    #[arg(long, requires = "owner", conflicts_with = "url")]
    pub name: Option<String>,

    /// Full clone URL instead of owner and name
    #[arg(long)]
    pub url: Option<String>,
}

impl RepoArgs {
    pub fn identity(self) -> Result<RepoIdentity> {
        match (self.url, self.owner, self.name) {
            (Some(url), _, _) => Ok(RepoIdentity::url(url)),
            (None, Some(owner), Some(name)) => Ok(RepoIdentity::slug(owner, name)),
            _ => Err(CliError::user(
                "Specify the repository with --owner and --name, or with --url",
            )),
        }
    }
}
