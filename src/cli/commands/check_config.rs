//! Check-config command - load, merge and validate the configuration

use crate::cli::output::{
    colors, on_off, print_header, print_json, print_success, print_warning,
};
use crate::cli::OutputFormat;
use crate::core::config::{Config, PublicRepoConfig};
use clap::Args;
use serde::Serialize;
use std::collections::BTreeMap;

/// Arguments for the check-config command
#[derive(Args, Debug)]
pub struct CheckConfigArgs {
    /// Skip project discovery against configured GitLab instances
    #[arg(long)]
    pub no_discovery: bool,
}

/// Validated configuration summary
#[derive(Debug, Serialize)]
pub struct CheckConfigResponse {
    pub title: String,
    pub dbpath: String,
    pub listen: String,
    pub oauth: bool,
    pub discovered: usize,
    pub repos: BTreeMap<String, PublicRepoConfig>,
}

impl CheckConfigResponse {
    fn new(config: &Config, discovered: usize) -> Self {
        Self {
            title: config.title.clone(),
            dbpath: config.dbpath.display().to_string(),
            listen: format!("{}:{}", config.server.host, config.server.port),
            oauth: config.gitlab_oauth.is_some(),
            discovered,
            repos: config
                .repos
                .iter()
                .map(|(name, repo)| (name.clone(), repo.public()))
                .collect(),
        }
    }
}

/// Execute the check-config command
pub async fn execute(
    args: CheckConfigArgs,
    mut config: Config,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let discovered = if args.no_discovery {
        0
    } else {
        config.discover_projects().await?
    };
    config.validate()?;

    let response = CheckConfigResponse::new(&config, discovered);

    match format {
        OutputFormat::Human => print_human(&response),
        OutputFormat::Json => print_json(&response),
    }

    Ok(())
}

fn print_human(response: &CheckConfigResponse) {
    print_header(&response.title);
    println!("  {}: {}", colors::label("dbpath"), colors::url(&response.dbpath));
    println!("  {}: {}", colors::label("listen"), response.listen);
    println!("  {}: {}", colors::label("oauth"), on_off(response.oauth));
    if response.discovered > 0 {
        println!(
            "  {}: {}",
            colors::label("discovered"),
            colors::number(&response.discovered.to_string())
        );
    }

    println!();
    for (name, repo) in &response.repos {
        let poll = if repo.enable_poll_updates.unwrap_or(true) {
            format!("{}ms", repo.ms_between_poll)
        } else {
            on_off(false)
        };
        println!("{} {}", colors::repo_name(name), colors::url(&repo.url));
        println!(
            "  {} {}  {} {}  {} {}",
            colors::dim("vcs"),
            repo.vcs,
            colors::dim("push"),
            on_off(repo.enable_push_updates.unwrap_or(false)),
            colors::dim("poll"),
            poll,
        );
    }

    println!();
    if response.repos.is_empty() {
        print_warning("No repositories configured");
        return;
    }
    print_success(&format!(
        "Configuration OK ({} repositories)",
        response.repos.len()
    ));
}
