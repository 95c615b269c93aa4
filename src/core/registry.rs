//! Set of repositories being served.
//!
//! Built once at startup after the initial synchronization and never
//! mutated afterwards, so it is shared freely between request handlers
//! and background workers.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::core::config::RepoConfig;
use crate::core::search::Searcher;

/// A served repository: its configuration and its searcher
pub struct Repository {
    pub name: String,
    pub config: RepoConfig,
    pub searcher: Arc<dyn Searcher>,
}

impl Repository {
    pub fn new(name: impl Into<String>, config: RepoConfig, searcher: Arc<dyn Searcher>) -> Self {
        Self {
            name: name.into(),
            config,
            searcher,
        }
    }
}

/// Immutable name-to-repository map
#[derive(Clone, Default)]
pub struct Registry {
    repos: Arc<BTreeMap<String, Arc<Repository>>>,
}

impl Registry {
    pub fn new(repos: impl IntoIterator<Item = Repository>) -> Self {
        Self {
            repos: Arc::new(
                repos
                    .into_iter()
                    .map(|repo| (repo.name.clone(), Arc::new(repo)))
                    .collect(),
            ),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Arc<Repository>> {
        self.repos.get(name)
    }

    /// Repositories in name order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Arc<Repository>)> {
        self.repos.iter().map(|(name, repo)| (name.as_str(), repo))
    }

    pub fn names(&self) -> Vec<String> {
        self.repos.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.repos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.repos.is_empty()
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.repos.keys()).finish()
    }
}
