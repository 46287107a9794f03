//! Remote repository identity

use serde::{Deserialize, Serialize};

/// Host assumed for `{owner, name}` identities.
pub const DEFAULT_HOST: &str = "github.com";

/// Where the shared config repository lives.
///
/// Serialized untagged so a config can say either
/// `{"owner": "acme", "name": "cfg"}` or `{"url": "git@host:acme/cfg.git"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RepoIdentity {
    Slug { owner: String, name: String },
    Url { url: String },
}

/// `owner/name` on a specific host, as understood by the hosting CLI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostedSlug {
    pub host: String,
    pub owner: String,
    pub name: String,
}

impl HostedSlug {
    /// Argument for `gh repo view`.
    pub fn gh_target(&self) -> String {
        if self.host.eq_ignore_ascii_case(DEFAULT_HOST) {
            format!("{}/{}", self.owner, self.name)
        } else {
            format!("{}/{}/{}", self.host, self.owner, self.name)
        }
    }

    fn same_as(&self, other: &Self) -> bool {
        self.host.eq_ignore_ascii_case(&other.host)
            && self.owner.eq_ignore_ascii_case(&other.owner)
            && self.name.eq_ignore_ascii_case(&other.name)
    }
}

impl RepoIdentity {
    pub fn slug(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self::Slug {
            owner: owner.into(),
            name: name.into(),
        }
    }

    pub fn url(url: impl Into<String>) -> Self {
        Self::Url { url: url.into() }
    }

    /// Canonical string used for display: `owner/name` or the URL verbatim.
    pub fn display_name(&self) -> String {
        match self {
            Self::Slug { owner, name } => format!("{owner}/{name}"),
            Self::Url { url } => url.clone(),
        }
    }

    /// Target passed to `git clone`.
    pub fn clone_url(&self) -> String {
        match self {
            Self::Slug { owner, name } => format!("https://{DEFAULT_HOST}/{owner}/{name}.git"),
            Self::Url { url } => url.clone(),
        }
    }

    /// Hosting-provider coordinates, if the identity names a hosted repo.
    pub fn hosted_slug(&self) -> Option<HostedSlug> {
        match self {
            Self::Slug { owner, name } => Some(HostedSlug {
                host: DEFAULT_HOST.into(),
                owner: owner.clone(),
                name: name.clone(),
            }),
            Self::Url { url } => parse_remote_url(url),
        }
    }

    /// Whether a clone's configured origin URL points at this repository.
    ///
    /// SSH and HTTPS spellings of the same hosted repo are treated as equal.
    pub fn matches_remote_url(&self, actual: &str) -> bool {
        if trim_url(&self.clone_url()) == trim_url(actual) {
            return true;
        }
        match (self.hosted_slug(), parse_remote_url(actual)) {
            (Some(expected), Some(actual)) => expected.same_as(&actual),
            _ => false,
        }
    }
}

impl std::fmt::Display for RepoIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.display_name())
    }
}

fn trim_url(url: &str) -> &str {
    let url = url.trim().trim_end_matches('/');
    url.strip_suffix(".git").unwrap_or(url)
}

/// Parse `scheme://[user@]host[:port]/owner/name[.git]` or scp-style
/// `[user@]host:owner/name[.git]`. Local paths and `file://` URLs yield `None`.
pub fn parse_remote_url(url: &str) -> Option<HostedSlug> {
    let url = url.trim();
    let (host, path) = if let Some((scheme, rest)) = url.split_once("://") {
        if scheme.eq_ignore_ascii_case("file") {
            return None;
        }
        let (authority, path) = rest.split_once('/')?;
        let host = authority.rsplit('@').next()?;
        (host.split(':').next()?, path)
    } else if let Some((authority, path)) = url.split_once(':') {
        // A single letter before the colon is a Windows drive
        if authority.contains('/') || authority.contains('\\') || authority.len() < 2 {
            return None;
        }
        (authority.rsplit('@').next()?, path)
    } else {
        return None;
    };

    if host.is_empty() {
        return None;
    }

    let path = trim_url(path.trim_start_matches('/'));
    let mut segments = path.split('/').filter(|s| !s.is_empty());
    let owner = segments.next()?;
    let name = segments.next()?;
    if segments.next().is_some() {
        return None;
    }

    Some(HostedSlug {
        host: host.to_string(),
        owner: owner.to_string(),
        name: name.to_string(),
    })
}
