//! Terminal notices on stderr

use colored::Colorize;
use ocsync_core::{NoticeLevel, Notifier};

/// Prints warnings and errors to stderr.
///
/// Informational notices are skipped; each command prints its own result.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalNotifier;

impl Notifier for TerminalNotifier {
    fn notify(&self, level: NoticeLevel, message: &str) {
        match level {
            NoticeLevel::Info => tracing::debug!(notice = message, "info notice"),
            NoticeLevel::Warning => eprintln!("{}: {}", "warning".yellow().bold(), message),
            NoticeLevel::Error => eprintln!("{}: {}", "error".red().bold(), message),
        }
    }
}
