//! End-to-end sync and search against a local git upstream

use fathom::core::config::{Config, RepoConfig};
use fathom::core::search::{search_all, SearchOptions};
use fathom::core::services::Services;
use std::collections::BTreeSet;

use crate::common::{git_available, GitFixture};

fn config(fixture: &GitFixture) -> Config {
    let mut config = Config::default();
    config.dbpath = fixture.temp.path().join("data");
    config
        .repos
        .insert("demo".to_string(), RepoConfig::with_url(fixture.url()));
    config.repos.insert(
        "gone".to_string(),
        RepoConfig::with_url(format!("file://{}", fixture.temp.path().join("nope").display())),
    );
    config.finalize().unwrap();
    config
}

#[tokio::test]
async fn test_bootstrap_serves_synced_repositories() {
    if !git_available() {
        eprintln!("git not available, skipping");
        return;
    }
    let fixture = GitFixture::new(&[
        ("src/main.rs", "fn main() {\n    println!(\"needle\");\n}\n"),
        ("README.md", "nothing here\n"),
    ]);

    let services = Services::bootstrap(config(&fixture)).await.unwrap();
    assert_eq!(services.registry.names(), vec!["demo"]);

    let selected: BTreeSet<String> = ["demo".to_string(), "gone".to_string()].into();
    let aggregate = search_all("needle", &SearchOptions::default(), &selected, &services.registry)
        .await
        .unwrap();

    let demo = &aggregate.results["demo"];
    assert_eq!(demo.revision, fixture.head());
    assert_eq!(demo.matches.len(), 1);
    assert_eq!(demo.matches[0].filename, "src/main.rs");
    assert_eq!(demo.matches[0].matches[0].line_number, 2);

    let excluded = services.registry.get("demo").unwrap().searcher.excluded_files().await;
    assert!(excluded.unwrap().is_empty());
}

#[tokio::test]
async fn test_sync_picks_up_new_commits() {
    if !git_available() {
        eprintln!("git not available, skipping");
        return;
    }
    let fixture = GitFixture::new(&[("a.txt", "first\n")]);
    let services = Services::bootstrap(config(&fixture)).await.unwrap();
    let repo = services.registry.get("demo").unwrap();

    fixture.commit(&[("b.txt", "second needle\n")], "add b");
    let rev = services.sync.sync("demo").await.unwrap();
    assert_eq!(rev, fixture.head());
    repo.searcher.refresh(&rev).await;

    let response = repo
        .searcher
        .search("needle", &SearchOptions::default())
        .await
        .unwrap();
    assert_eq!(response.revision, rev);
    assert_eq!(response.matches[0].filename, "b.txt");
}
