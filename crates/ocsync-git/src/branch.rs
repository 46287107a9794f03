//! Working branch resolution

/// Branch used when neither the config nor the clone names one.
pub const DEFAULT_BRANCH: &str = "main";

/// Pick the branch to sync.
///
/// A configured branch wins, then the branch the clone has checked out, then
/// [`DEFAULT_BRANCH`]. A detached `HEAD` or blank name does not count.
pub fn resolve_repo_branch(configured: Option<&str>, observed: Option<&str>) -> String {
    let usable = |branch: &&str| !branch.trim().is_empty() && *branch != "HEAD";
    configured
        .filter(usable)
        .or_else(|| observed.filter(usable))
        .unwrap_or(DEFAULT_BRANCH)
        .trim()
        .to_string()
}
