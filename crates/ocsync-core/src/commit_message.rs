//! Commit message generation
//!
//! Asks a small language model for a one-line summary of the pending diff and
//! falls back to a dated message whenever anything along the way fails.

use std::path::{Path, PathBuf};

use chrono::{NaiveDate, Utc};
use ocsync_fs::ConfigStore;
use ocsync_git::RepoGateway;
use serde_json::Value;

/// Longest subject line accepted from the model.
pub const MAX_SUBJECT_CHARS: usize = 72;
/// Longest diff summary sent to the model.
pub const MAX_SUMMARY_CHARS: usize = 4000;

const SESSION_TITLE: &str = "opencode-synced commit message";

/// `provider/model` reference from the OpenCode config.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelRef {
    pub provider_id: String,
    pub model_id: String,
}

impl ModelRef {
    pub fn parse(value: &str) -> Option<Self> {
        let (provider, model) = value.trim().split_once('/')?;
        if provider.is_empty() || model.is_empty() {
            return None;
        }
        Some(Self {
            provider_id: provider.to_string(),
            model_id: model.to_string(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionId(pub String);

/// One part of a model reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyPart {
    Text(String),
    /// Tool calls, reasoning and anything else without plain text
    Other,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelReply {
    pub parts: Vec<ReplyPart>,
}

impl ModelReply {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            parts: vec![ReplyPart::Text(text.into())],
        }
    }

    /// First text part with visible content.
    pub fn first_text(&self) -> Option<&str> {
        self.parts.iter().find_map(|part| match part {
            ReplyPart::Text(text) if !text.trim().is_empty() => Some(text.as_str()),
            _ => None,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModelError {
    #[error("model unavailable: {0}")]
    Unavailable(String),
    #[error("model request failed: {0}")]
    Request(String),
    #[error("model returned no usable text")]
    Empty,
}

impl From<ModelError> for crate::Error {
    fn from(err: ModelError) -> Self {
        Self::ModelUnavailable(err.to_string())
    }
}

/// Ephemeral chat sessions with a language model.
pub trait ModelSessions {
    fn create_session(&self, title: &str) -> Result<SessionId, ModelError>;
    fn prompt(&self, session: &SessionId, model: &ModelRef, text: &str)
    -> Result<ModelReply, ModelError>;
    fn delete_session(&self, session: &SessionId) -> Result<(), ModelError>;
}

/// Sessions for hosts with no model access; every request is unavailable.
#[derive(Debug, Default, Clone, Copy)]
pub struct OfflineSessions;

impl ModelSessions for OfflineSessions {
    fn create_session(&self, _title: &str) -> Result<SessionId, ModelError> {
        Err(ModelError::Unavailable("no model host connected".into()))
    }

    fn prompt(&self, _: &SessionId, _: &ModelRef, _: &str) -> Result<ModelReply, ModelError> {
        Err(ModelError::Unavailable("no model host connected".into()))
    }

    fn delete_session(&self, _: &SessionId) -> Result<(), ModelError> {
        Ok(())
    }
}

/// Releases a session when dropped, whatever happened while it was held.
struct SessionGuard<'a> {
    sessions: &'a dyn ModelSessions,
    id: SessionId,
}

impl Drop for SessionGuard<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.sessions.delete_session(&self.id) {
            tracing::warn!(session = %self.id.0, error = %e, "failed to release model session");
        }
    }
}

/// `"Sync OpenCode config (YYYY-MM-DD)"`
pub fn fallback_message(date: NaiveDate) -> String {
    format!("Sync OpenCode config ({})", date.format("%Y-%m-%d"))
}

/// First non-empty line, unquoted and capped at [`MAX_SUBJECT_CHARS`].
pub fn sanitize_reply(raw: &str) -> Option<String> {
    let line = raw.lines().map(str::trim).find(|line| !line.is_empty())?;
    let unquoted = line
        .trim_matches(|c: char| matches!(c, '"' | '\'' | '`'))
        .trim();
    if unquoted.is_empty() {
        return None;
    }
    let truncated: String = unquoted.chars().take(MAX_SUBJECT_CHARS).collect();
    Some(truncated.trim_end().to_string())
}

/// Small model named by `small_model`, else `model`, in the local OpenCode config.
pub fn resolve_small_model(config_root: &Path) -> Option<ModelRef> {
    let store = ConfigStore::new();
    ["opencode.json", "opencode.jsonc"].iter().find_map(|name| {
        let path = config_root.join(name);
        let document: Value = match store.load_optional(&path) {
            Ok(document) => document?,
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "unreadable OpenCode config");
                return None;
            }
        };
        ["small_model", "model"]
            .iter()
            .filter_map(|key| document.get(key).and_then(Value::as_str))
            .find_map(ModelRef::parse)
    })
}

fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Produces commit messages for the sync clone.
pub struct CommitMessageGenerator<'a> {
    gateway: &'a dyn RepoGateway,
    sessions: &'a dyn ModelSessions,
    config_root: PathBuf,
}

impl<'a> CommitMessageGenerator<'a> {
    pub fn new(
        gateway: &'a dyn RepoGateway,
        sessions: &'a dyn ModelSessions,
        config_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            gateway,
            sessions,
            config_root: config_root.into(),
        }
    }

    /// Message for the pending changes in `repo_dir`. Never fails.
    pub fn generate(&self, repo_dir: &Path) -> String {
        self.generate_on(repo_dir, Utc::now().date_naive())
    }

    /// [`generate`](Self::generate) with an explicit date for the fallback.
    pub fn generate_on(&self, repo_dir: &Path, today: NaiveDate) -> String {
        let summary = match self.gateway.diff_summary(repo_dir) {
            Ok(summary) if !summary.trim().is_empty() => summary,
            Ok(_) => return fallback_message(today),
            Err(e) => {
                tracing::warn!(error = %e, "diff summary failed, using fallback message");
                return fallback_message(today);
            }
        };

        match self.ask_model(&summary) {
            Ok(message) => message,
            Err(e) => {
                tracing::debug!(error = %e, "commit message model failed, using fallback");
                fallback_message(today)
            }
        }
    }

    fn ask_model(&self, summary: &str) -> Result<String, ModelError> {
        let model = resolve_small_model(&self.config_root).ok_or_else(|| {
            ModelError::Unavailable("no small_model or model in OpenCode config".into())
        })?;

        let guard = SessionGuard {
            sessions: self.sessions,
            id: self.sessions.create_session(SESSION_TITLE)?,
        };

        let prompt = format!(
            "Write a git commit message for these OpenCode config changes. \
             Reply with a single line of at most {MAX_SUBJECT_CHARS} characters and nothing else.\n\n{}",
            truncate_chars(summary, MAX_SUMMARY_CHARS)
        );
        let reply = self.sessions.prompt(&guard.id, &model, &prompt)?;

        reply
            .first_text()
            .and_then(sanitize_reply)
            .ok_or(ModelError::Empty)
    }
}
