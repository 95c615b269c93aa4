//! check-config and sync commands

use fathom::cli::commands::{check_config, sync, CheckConfigArgs, SyncArgs};
use fathom::cli::OutputFormat;
use fathom::core::config::{Config, RepoConfig};
use tempfile::TempDir;

use crate::common::{git_available, GitFixture};

fn config_with(dbpath: &std::path::Path, repos: &[(&str, String)]) -> Config {
    let mut config = Config::default();
    config.dbpath = dbpath.to_path_buf();
    for (name, url) in repos {
        config
            .repos
            .insert(name.to_string(), RepoConfig::with_url(url.clone()));
    }
    config.finalize().unwrap();
    config
}

#[tokio::test]
async fn test_check_config_succeeds() {
    let temp = TempDir::new().unwrap();
    let config = config_with(
        temp.path(),
        &[("svc", "https://example.com/svc.git".to_string())],
    );

    let result = check_config::execute(
        CheckConfigArgs { no_discovery: true },
        config,
        OutputFormat::Json,
    )
    .await;
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_sync_unknown_repository() {
    let temp = TempDir::new().unwrap();
    let config = config_with(temp.path(), &[]);

    let err = sync::execute(
        SyncArgs {
            repos: vec!["nope".to_string()],
        },
        config,
        OutputFormat::Human,
    )
    .await
    .unwrap_err();
    assert!(err.to_string().contains("nope"));
}

#[tokio::test]
async fn test_sync_reports_failures() {
    if !git_available() {
        eprintln!("git not available, skipping");
        return;
    }
    let fixture = GitFixture::new(&[("a.txt", "a\n")]);
    let missing = format!("file://{}", fixture.temp.path().join("missing").display());
    let config = config_with(
        &fixture.temp.path().join("data"),
        &[("good", fixture.url()), ("bad", missing)],
    );

    let err = sync::execute(SyncArgs { repos: vec![] }, config, OutputFormat::Json)
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "1 of 2 repositories failed to sync");
    assert!(fixture.temp.path().join("data").join("vcs-good").is_dir());
}

#[tokio::test]
async fn test_sync_selected_repository() {
    if !git_available() {
        eprintln!("git not available, skipping");
        return;
    }
    let fixture = GitFixture::new(&[("a.txt", "a\n")]);
    let config = config_with(
        &fixture.temp.path().join("data"),
        &[("good", fixture.url())],
    );

    let result = sync::execute(
        SyncArgs {
            repos: vec!["good".to_string()],
        },
        config,
        OutputFormat::Human,
    )
    .await;
    assert!(result.is_ok());
}
