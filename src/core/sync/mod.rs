//! Working-copy synchronization.
//!
//! Every repository has its own mutex: a clone or pull against one
//! working directory never overlaps another sync of the same
//! directory, whatever triggered it. Different repositories sync in
//! parallel, bounded by a global permit pool.

mod poller;

pub use poller::spawn_workers;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, Notify, Semaphore};
use tokio::task::JoinSet;

use crate::core::config::Config;
use crate::core::error::{FathomError, Result};
use crate::core::vcs::{self, VcsDriver};

/// What the coordinator needs to know about one repository
pub struct SyncTarget {
    pub name: String,
    pub url: String,
    pub working_dir: PathBuf,
    /// `None` when poll updates are disabled
    pub poll_interval: Option<Duration>,
    pub push_enabled: bool,
    pub driver: Arc<dyn VcsDriver>,
}

impl SyncTarget {
    fn describe(&self) -> String {
        format!("{} ({})", self.name, self.working_dir.display())
    }
}

struct RepoSync {
    target: SyncTarget,
    lock: Mutex<()>,
    trigger: Notify,
}

/// Owns the sync state of every configured repository
pub struct SyncCoordinator {
    repos: BTreeMap<String, Arc<RepoSync>>,
    permits: Arc<Semaphore>,
}

impl SyncCoordinator {
    pub fn new(targets: impl IntoIterator<Item = SyncTarget>, max_concurrent: usize) -> Self {
        let repos = targets
            .into_iter()
            .map(|target| {
                let name = target.name.clone();
                let repo = RepoSync {
                    target,
                    lock: Mutex::new(()),
                    trigger: Notify::new(),
                };
                (name, Arc::new(repo))
            })
            .collect();

        Self {
            repos,
            permits: Arc::new(Semaphore::new(max_concurrent.max(1))),
        }
    }

    /// Build sync targets for every configured repository
    ///
    /// Repositories whose VCS driver cannot be built are logged and
    /// left out.
    pub fn from_config(config: &Config) -> Self {
        let mut targets = Vec::with_capacity(config.repos.len());
        for (name, repo) in &config.repos {
            let driver = match vcs::new_driver(&repo.vcs, repo.vcs_config.as_ref()) {
                Ok(driver) => driver,
                Err(e) => {
                    tracing::error!(repo = %name, error = %e, "Failed to create VCS driver");
                    continue;
                }
            };

            targets.push(SyncTarget {
                name: name.clone(),
                url: repo.url.clone(),
                working_dir: config.working_dir(name),
                poll_interval: repo.poll_updates_enabled().then(|| repo.poll_interval()),
                push_enabled: repo.push_updates_enabled(),
                driver,
            });
        }

        Self::new(targets, config.max_concurrent_indexers)
    }

    pub fn names(&self) -> Vec<String> {
        self.repos.keys().cloned().collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.repos.contains_key(name)
    }

    pub fn working_dir(&self, name: &str) -> Option<&Path> {
        self.repos.get(name).map(|r| r.target.working_dir.as_path())
    }

    /// VCS metadata entries of the repository's driver
    pub fn special_files(&self, name: &str) -> Option<Vec<String>> {
        self.repos.get(name).map(|r| r.target.driver.special_files())
    }

    /// Request a push-style update of `name`
    ///
    /// Returns `Ok(false)` when push updates are disabled for the
    /// repository. Requests made while one is already pending are
    /// folded into it.
    pub fn update(&self, name: &str) -> Result<bool> {
        let repo = self
            .repos
            .get(name)
            .ok_or_else(|| FathomError::RepositoryNotFound(name.to_string()))?;

        if !repo.target.push_enabled {
            return Ok(false);
        }

        tracing::debug!(repo = %name, "Update requested");
        repo.trigger.notify_one();
        Ok(true)
    }

    /// Clone or pull `name` now, returning the checked-out revision
    pub async fn sync(&self, name: &str) -> Result<String> {
        let repo = self
            .repos
            .get(name)
            .ok_or_else(|| FathomError::RepositoryNotFound(name.to_string()))?;
        self.sync_repo(repo).await
    }

    /// Sync several repositories concurrently
    pub async fn sync_many(self: &Arc<Self>, names: &[String]) -> BTreeMap<String, Result<String>> {
        let mut tasks = JoinSet::new();
        for name in names {
            let this = Arc::clone(self);
            let name = name.clone();
            tasks.spawn(async move {
                let result = this.sync(&name).await;
                (name, result)
            });
        }

        let mut results = BTreeMap::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((name, result)) => {
                    results.insert(name, result);
                }
                Err(e) => tracing::error!(error = %e, "Sync task failed"),
            }
        }
        results
    }

    /// Sync every repository concurrently
    pub async fn sync_all(self: &Arc<Self>) -> BTreeMap<String, Result<String>> {
        self.sync_many(&self.names()).await
    }

    async fn sync_repo(&self, repo: &RepoSync) -> Result<String> {
        let _guard = repo.lock.lock().await;
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|e| FathomError::VcsCommand {
                desc: "sync".to_string(),
                dir: repo.target.working_dir.display().to_string(),
                output: e.to_string(),
            })?;

        let target = &repo.target;
        let started = Instant::now();
        let result = if target.working_dir.is_dir() {
            tracing::debug!(repo = %target.name, "Pulling");
            target.driver.pull(&target.working_dir).await
        } else {
            tracing::info!(repo = %target.name, url = %target.url, "Cloning");
            target.driver.clone_repo(&target.working_dir, &target.url).await
        };
        let rev = result.map_err(|e| {
            tracing::warn!(repo = %target.describe(), error = %e, "Sync failed");
            e
        })?;

        tracing::info!(
            repo = %target.name,
            rev = %rev,
            duration_ms = started.elapsed().as_millis() as u64,
            "Synced"
        );
        Ok(rev)
    }
}
