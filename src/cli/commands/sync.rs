//! Sync command - clone or pull repositories once

use crate::cli::output::{colors, format_duration_ms, print_json, print_success};
use crate::cli::OutputFormat;
use crate::core::config::Config;
use crate::core::error::FathomError;
use crate::core::sync::SyncCoordinator;
use clap::Args;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

/// Arguments for the sync command
#[derive(Args, Debug)]
pub struct SyncArgs {
    /// Repositories to sync (default: all)
    pub repos: Vec<String>,
}

/// Outcome for one repository
#[derive(Debug, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncOutcome {
    Ok { revision: String },
    Failed { error: String },
}

/// Sync response
#[derive(Debug, Serialize)]
pub struct SyncResponse {
    pub repos: BTreeMap<String, SyncOutcome>,
    pub duration_ms: u64,
}

impl SyncResponse {
    fn failures(&self) -> usize {
        self.repos
            .values()
            .filter(|outcome| matches!(outcome, SyncOutcome::Failed { .. }))
            .count()
    }
}

/// Execute the sync command
pub async fn execute(
    args: SyncArgs,
    mut config: Config,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    config.discover_projects().await?;
    std::fs::create_dir_all(&config.dbpath)?;

    let coordinator = Arc::new(SyncCoordinator::from_config(&config));
    let names = if args.repos.is_empty() {
        coordinator.names()
    } else {
        args.repos
    };
    if let Some(unknown) = names.iter().find(|name| !coordinator.contains(name)) {
        return Err(FathomError::RepositoryNotFound(unknown.clone()).into());
    }

    let started = Instant::now();
    let results = coordinator.sync_many(&names).await;
    let response = SyncResponse {
        repos: results
            .into_iter()
            .map(|(name, result)| {
                let outcome = match result {
                    Ok(revision) => SyncOutcome::Ok { revision },
                    Err(e) => SyncOutcome::Failed {
                        error: e.to_string(),
                    },
                };
                (name, outcome)
            })
            .collect(),
        duration_ms: started.elapsed().as_millis() as u64,
    };

    match format {
        OutputFormat::Human => print_human(&response),
        OutputFormat::Json => print_json(&response),
    }

    match response.failures() {
        0 => Ok(()),
        n => Err(format!("{n} of {} repositories failed to sync", response.repos.len()).into()),
    }
}

fn print_human(response: &SyncResponse) {
    for (name, outcome) in &response.repos {
        match outcome {
            SyncOutcome::Ok { revision } => println!(
                "{} {}",
                colors::repo_name(name),
                colors::revision(crate::cli::output::short_rev(revision))
            ),
            SyncOutcome::Failed { error } => {
                println!("{} {}", colors::repo_name(name), colors::error(error))
            }
        }
    }

    if response.failures() == 0 {
        print_success(&format!(
            "Synced {} repositories in {}",
            response.repos.len(),
            format_duration_ms(response.duration_ms)
        ));
    }
}
