//! Error types for ocsync-git

use std::path::PathBuf;

/// Result type for ocsync-git operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in ocsync-git operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Git error: {0}")]
    Git(#[from] git2::Error),

    #[error("`{command}` failed with exit code {code}: {stderr}")]
    CommandFailed {
        command: String,
        code: i32,
        stderr: String,
    },

    #[error("Failed to start `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path} is a clone of {actual}, expected {expected}")]
    RemoteMismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },

    #[error("{path} exists and is not an empty directory or a git clone")]
    TargetNotEmpty { path: PathBuf },

    #[error("Local branch '{branch}' has diverged from origin/{branch}. Manual resolution required.")]
    Diverged { branch: String },

    #[error("Repository {repo} is public")]
    NotPrivate { repo: String },

    #[error("Could not determine visibility of {repo}: {reason}")]
    VisibilityUnknown { repo: String, reason: String },
}

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
