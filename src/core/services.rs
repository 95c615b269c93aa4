//! Unified service container for Fathom
//!
//! Everything a request handler or CLI command needs, built once at
//! startup and passed around explicitly.

use crate::core::auth::{MemorySessionStore, OAuthProvider, SessionStore};
use crate::core::config::Config;
use crate::core::error::Result;
use crate::core::registry::{Registry, Repository};
use crate::core::search::{Searcher, WorkingCopySearcher};
use crate::core::sync::SyncCoordinator;
use std::sync::Arc;
use std::time::Instant;

/// Unified services container
///
/// All adapters use this same struct for service access.
#[derive(Clone)]
pub struct Services {
    /// Application configuration
    pub config: Arc<Config>,

    /// Repositories being served
    pub registry: Registry,

    /// Working-copy synchronization
    pub sync: Arc<SyncCoordinator>,

    pub sessions: Arc<dyn SessionStore>,

    /// Present when `gitlab-oauth` is configured
    pub oauth: Option<Arc<OAuthProvider>>,
}

impl Services {
    /// Assemble services from already-built parts
    pub fn new(
        config: Config,
        registry: Registry,
        sync: Arc<SyncCoordinator>,
        sessions: Arc<dyn SessionStore>,
    ) -> Result<Self> {
        let oauth = config
            .gitlab_oauth
            .clone()
            .map(OAuthProvider::new)
            .transpose()?
            .map(Arc::new);

        Ok(Self {
            config: Arc::new(config),
            registry,
            sync,
            sessions,
            oauth,
        })
    }

    /// Discover projects, sync every repository and build the registry
    ///
    /// Repositories that fail their initial sync are logged and not
    /// served.
    pub async fn bootstrap(mut config: Config) -> Result<Self> {
        let discovered = config.discover_projects().await?;
        if discovered > 0 {
            tracing::info!(count = discovered, "Added discovered repositories");
        }

        std::fs::create_dir_all(&config.dbpath)?;

        let sync = Arc::new(SyncCoordinator::from_config(&config));
        let started = Instant::now();
        tracing::info!(repos = sync.names().len(), "Starting initial sync");
        let results = sync.sync_all().await;

        let mut repos = Vec::with_capacity(results.len());
        for (name, result) in results {
            let rev = match result {
                Ok(rev) => rev,
                Err(e) => {
                    tracing::error!(repo = %name, error = %e, "Initial sync failed, not serving");
                    continue;
                }
            };
            if let Some(repo) = build_repository(&config, &sync, &name, &rev).await {
                repos.push(repo);
            }
        }

        tracing::info!(
            served = repos.len(),
            duration_ms = started.elapsed().as_millis() as u64,
            "Initial sync complete"
        );

        let registry = Registry::new(repos);
        Self::new(
            config,
            registry,
            sync,
            Arc::new(MemorySessionStore::new()),
        )
    }
}

async fn build_repository(
    config: &Config,
    sync: &SyncCoordinator,
    name: &str,
    rev: &str,
) -> Option<Repository> {
    let repo_config = config.repos.get(name)?;
    let working_dir = sync.working_dir(name)?;
    let special_files = sync.special_files(name)?;

    let searcher = WorkingCopySearcher::new(
        working_dir,
        special_files,
        repo_config.exclude_dot_files,
        config.search.max_file_size_mb * 1024 * 1024,
    );
    searcher.refresh(rev).await;

    Some(Repository::new(name, repo_config.clone(), Arc::new(searcher)))
}
