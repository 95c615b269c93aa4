//! Concurrent multi-repository search.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;

use super::{SearchOptions, SearchResponse};
use crate::core::error::{FathomError, Result};
use crate::core::registry::{Registry, Repository};

/// Combined results of one fan-out
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SearchAggregate {
    /// Only repositories that produced matches
    pub results: BTreeMap<String, SearchResponse>,
    pub files_opened: usize,
    /// Wall-clock time of the whole fan-out
    pub duration_ms: u64,
}

/// Search every repository in `repos` concurrently
///
/// One task per repository. The first failure to arrive aborts the
/// whole search and discards any results already collected. Tasks
/// still running at that point are not cancelled; their results land
/// in the channel buffer and are dropped with it.
pub async fn search_all(
    query: &str,
    options: &SearchOptions,
    repos: &BTreeSet<String>,
    registry: &Registry,
) -> Result<SearchAggregate> {
    let started = Instant::now();

    let targets: Vec<Arc<Repository>> = repos
        .iter()
        .filter_map(|name| registry.get(name).cloned())
        .collect();
    let count = targets.len();

    // Sized so every task can hand off its result even if nobody reads it
    let (tx, mut rx) = mpsc::channel(count.max(1));
    for repo in targets {
        let tx = tx.clone();
        let query = query.to_string();
        let options = options.clone();
        tokio::spawn(async move {
            let result = repo.searcher.search(&query, &options).await;
            let _ = tx.send((repo.name.clone(), result)).await;
        });
    }
    drop(tx);

    let mut aggregate = SearchAggregate::default();
    for _ in 0..count {
        let Some((name, result)) = rx.recv().await else {
            return Err(FathomError::SearchFailed(
                "search task ended without reporting a result".to_string(),
            ));
        };

        let response = result.map_err(|e| {
            tracing::warn!(repo = %name, error = %e, "Search failed");
            e
        })?;

        aggregate.files_opened += response.files_opened;
        if response.matches.is_empty() {
            continue;
        }
        aggregate.results.insert(name, response);
    }

    aggregate.duration_ms = started.elapsed().as_millis() as u64;
    Ok(aggregate)
}
