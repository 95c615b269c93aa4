//! Per-request repository authorization.
//!
//! Decides which repositories a caller may act on. Denial is never an
//! error: an unauthorized repository is simply absent from the result,
//! exactly like one that does not exist.

use std::collections::{BTreeSet, HashSet};

use crate::core::config::RepoConfig;
use crate::core::registry::Registry;

/// Which repositories a request names
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepoSelection {
    /// `*`
    All,
    /// Comma-separated list of names; order is irrelevant
    Explicit(Vec<String>),
}

impl RepoSelection {
    /// Parse the `repos` request parameter
    ///
    /// Names are matched exactly, so only the whole value is trimmed.
    pub fn parse(value: &str) -> Self {
        let value = value.trim();
        if value == "*" {
            return Self::All;
        }
        Self::Explicit(
            value
                .split(',')
                .filter(|name| !name.is_empty())
                .map(str::to_string)
                .collect(),
        )
    }
}

/// Caller credentials relevant to authorization
#[derive(Debug, Clone, Default)]
pub struct Caller {
    pub access_key: String,
    pub authorized_urls: HashSet<String>,
}

impl Caller {
    pub fn new(access_key: impl Into<String>, authorized_urls: HashSet<String>) -> Self {
        Self {
            access_key: access_key.into(),
            authorized_urls,
        }
    }

    pub fn anonymous() -> Self {
        Self::default()
    }
}

/// Access policy for one repository
///
/// 1. An access-key list, when present, alone decides (exact match).
/// 2. Otherwise the OAuth marker, when present at all, requires the
///    repository URL to be among the caller's authorized URLs.
/// 3. Otherwise the repository is open.
pub fn check_access(repo: &RepoConfig, access_key: &str, authorized_urls: &HashSet<String>) -> bool {
    if let Some(keys) = &repo.access_keys {
        keys.iter().any(|key| key == access_key)
    } else if repo.oauth_authorization.is_some() {
        authorized_urls.contains(&repo.url)
    } else {
        true
    }
}

/// Resolve a selection to the names the caller may act on
///
/// Unknown names are dropped silently.
pub fn resolve_repos(
    selection: &RepoSelection,
    registry: &Registry,
    caller: &Caller,
) -> BTreeSet<String> {
    let allowed =
        |repo: &RepoConfig| check_access(repo, &caller.access_key, &caller.authorized_urls);

    match selection {
        RepoSelection::All => registry
            .iter()
            .filter(|(_, repo)| allowed(&repo.config))
            .map(|(name, _)| name.to_string())
            .collect(),
        RepoSelection::Explicit(names) => names
            .iter()
            .filter(|name| registry.get(name).is_some_and(|repo| allowed(&repo.config)))
            .cloned()
            .collect(),
    }
}
