//! Error types for ocsync-core

use std::path::PathBuf;

/// Result type for ocsync-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by sync flows
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No sync config on this machine yet
    #[error("No sync config found at {path}. Run `ocsync init` first.")]
    ConfigMissing { path: PathBuf },

    #[error("Could not determine the home directory")]
    HomeNotFound,

    /// The overrides file parsed but is not a JSON object
    #[error("Overrides at {path} must be a JSON object")]
    InvalidOverrides { path: PathBuf },

    /// The local clone has uncommitted changes
    #[error(
        "Sync repo at {path} has uncommitted changes. Commit, stash or discard them, then retry."
    )]
    DirtyRepoConflict { path: PathBuf },

    /// Secrets are enabled but the remote is not provably private
    #[error("Refusing to sync secrets with {repo}: {reason}")]
    SecretsPolicyViolation { repo: String, reason: String },

    /// Local and remote histories diverged; no automatic merge is attempted
    #[error(
        "Sync repo at {path} has diverged from origin/{branch}. Reconcile it manually, then retry."
    )]
    Diverged { branch: String, path: PathBuf },

    #[error("Commit message model unavailable: {0}")]
    ModelUnavailable(String),

    // Transparent wrappers for underlying crate errors
    /// Filesystem error from ocsync-fs
    #[error(transparent)]
    Fs(#[from] ocsync_fs::Error),

    /// Git error from ocsync-git
    #[error(transparent)]
    Git(ocsync_git::Error),

    /// Standard I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Coarse classification of an [`Error`] for callers deciding how to react.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    ConfigMissing,
    CommandFailure,
    DirtyRepoConflict,
    SecretsPolicyViolation,
    Diverged,
    ModelUnavailable,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ConfigMissing { .. } => ErrorKind::ConfigMissing,
            Self::DirtyRepoConflict { .. } => ErrorKind::DirtyRepoConflict,
            Self::SecretsPolicyViolation { .. } => ErrorKind::SecretsPolicyViolation,
            Self::Diverged { .. } | Self::Git(ocsync_git::Error::Diverged { .. }) => {
                ErrorKind::Diverged
            }
            Self::ModelUnavailable(_) => ErrorKind::ModelUnavailable,
            Self::HomeNotFound
            | Self::InvalidOverrides { .. }
            | Self::Fs(_)
            | Self::Git(_)
            | Self::Io(_)
            | Self::Json(_) => ErrorKind::CommandFailure,
        }
    }
}

impl From<ocsync_git::Error> for Error {
    fn from(err: ocsync_git::Error) -> Self {
        match err {
            ocsync_git::Error::NotPrivate { repo } => Self::SecretsPolicyViolation {
                repo,
                reason: "the repository is public".into(),
            },
            ocsync_git::Error::VisibilityUnknown { repo, reason } => {
                Self::SecretsPolicyViolation { repo, reason }
            }
            other => Self::Git(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn visibility_failures_become_policy_violations() {
        let public: Error = ocsync_git::Error::NotPrivate {
            repo: "acme/cfg".into(),
        }
        .into();
        assert_eq!(public.kind(), ErrorKind::SecretsPolicyViolation);

        let unknown: Error = ocsync_git::Error::VisibilityUnknown {
            repo: "acme/cfg".into(),
            reason: "gh not installed".into(),
        }
        .into();
        assert_eq!(unknown.kind(), ErrorKind::SecretsPolicyViolation);
    }

    #[test]
    fn process_failures_classify_as_command_failure() {
        let err: Error = ocsync_git::Error::CommandFailed {
            command: "git push".into(),
            code: 1,
            stderr: "rejected".into(),
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::CommandFailure);
        assert!(err.to_string().contains("rejected"));
    }
}
