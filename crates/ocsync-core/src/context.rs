//! Explicit capabilities handed to every sync flow

use ocsync_git::RepoGateway;

use crate::commit_message::ModelSessions;
use crate::locations::{Platform, SyncLocations};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

/// Where user-facing notices go (toasts in a host app, stderr in a terminal).
pub trait Notifier {
    fn notify(&self, level: NoticeLevel, message: &str);
}

/// Discards every notice.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentNotifier;

impl Notifier for SilentNotifier {
    fn notify(&self, _level: NoticeLevel, _message: &str) {}
}

/// Everything a flow may touch: paths, platform and external capabilities.
pub struct SyncContext<'a> {
    pub locations: SyncLocations,
    pub platform: Platform,
    pub gateway: &'a dyn RepoGateway,
    pub sessions: &'a dyn ModelSessions,
    pub notifier: &'a dyn Notifier,
}

impl<'a> SyncContext<'a> {
    pub fn new(
        locations: SyncLocations,
        platform: Platform,
        gateway: &'a dyn RepoGateway,
        sessions: &'a dyn ModelSessions,
        notifier: &'a dyn Notifier,
    ) -> Self {
        Self {
            locations,
            platform,
            gateway,
            sessions,
            notifier,
        }
    }
}
