//! Background update workers.
//!
//! One task per repository with poll or push updates enabled. A worker
//! sleeps until its poll interval elapses or an update is requested,
//! syncs, and hands the new revision to the repository's searcher.
//! Failures are logged and retried on the next wake-up.

use std::sync::Arc;
use tokio::task::JoinHandle;

use super::{RepoSync, SyncCoordinator};
use crate::core::registry::Registry;
use crate::core::search::Searcher;

/// Start a worker for every served repository that updates itself
pub fn spawn_workers(coordinator: &Arc<SyncCoordinator>, registry: &Registry) -> Vec<JoinHandle<()>> {
    let mut handles = Vec::new();
    for (name, repo) in registry.iter() {
        let Some(sync) = coordinator.repos.get(name) else {
            continue;
        };
        if sync.target.poll_interval.is_none() && !sync.target.push_enabled {
            tracing::info!(repo = %name, "Updates disabled");
            continue;
        }

        handles.push(tokio::spawn(run_worker(
            Arc::clone(coordinator),
            Arc::clone(sync),
            Arc::clone(&repo.searcher),
        )));
    }

    tracing::info!(workers = handles.len(), "Started update workers");
    handles
}

async fn run_worker(
    coordinator: Arc<SyncCoordinator>,
    repo: Arc<RepoSync>,
    searcher: Arc<dyn Searcher>,
) {
    let poll_interval = repo.target.poll_interval;
    let push_enabled = repo.target.push_enabled;

    loop {
        tokio::select! {
            _ = tokio::time::sleep(poll_interval.unwrap_or_default()), if poll_interval.is_some() => {}
            _ = repo.trigger.notified(), if push_enabled => {
                tracing::debug!(repo = %repo.target.name, "Update triggered");
            }
        }

        match coordinator.sync_repo(&repo).await {
            Ok(rev) => searcher.refresh(&rev).await,
            Err(e) => {
                tracing::warn!(repo = %repo.target.name, error = %e, "Update failed, will retry");
            }
        }
    }
}
