//! Configuration loading and merging

use fathom::core::config::Config;
use serde_json::json;
use std::fs;
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const CONFIG_TOML: &str = r#"
dbpath = "data"
title = "Code"
max-concurrent-indexers = 4

[vcs-config.git]
detect-ref = true
username = "bot"

[repos.svc]
url = "https://example.com/svc.git"
vcs-config = { ref = "main", username = "svc-bot" }
access-keys = ["k1"]

[repos.web]
url = "https://example.com/web.git"
ms-between-poll = 5000
enable-push-updates = true
"#;

#[test]
fn test_load_toml_file() {
    let temp = TempDir::new().unwrap();
    let file = temp.path().join("fathom.toml");
    fs::write(&file, CONFIG_TOML).unwrap();

    let mut config = Config::from_file(&file).unwrap();
    config.finalize().unwrap();

    assert_eq!(config.title, "Code");
    assert_eq!(config.max_concurrent_indexers, 4);
    // Relative to the config file
    assert_eq!(config.dbpath, temp.path().join("data"));

    let web = &config.repos["web"];
    assert_eq!(web.vcs, "git");
    assert_eq!(web.ms_between_poll, 5000);
    assert!(web.push_updates_enabled());
    assert!(web.poll_updates_enabled());
    assert!(web.url_pattern.is_some());
}

#[test]
fn test_global_vcs_config_fills_gaps() {
    let mut config = Config::parse(CONFIG_TOML, false).unwrap();
    config.finalize().unwrap();

    let svc = serde_json::to_value(config.repos["svc"].vcs_config.as_ref().unwrap().values())
        .unwrap();
    assert_eq!(
        svc,
        json!({"ref": "main", "username": "svc-bot", "detect-ref": true})
    );

    let web = serde_json::to_value(config.repos["web"].vcs_config.as_ref().unwrap().values())
        .unwrap();
    assert_eq!(web, json!({"detect-ref": true, "username": "bot"}));

    // Merging again changes nothing
    let before = config.repos["svc"].vcs_config.clone();
    config.finalize().unwrap();
    assert_eq!(config.repos["svc"].vcs_config, before);
}

#[test]
fn test_load_json_file() {
    let temp = TempDir::new().unwrap();
    let file = temp.path().join("config.json");
    fs::write(
        &file,
        r#"{
            "dbpath": "/var/lib/fathom",
            "repos": {
                "svc": {"url": "https://example.com/svc.git", "oauth-authorization": false}
            }
        }"#,
    )
    .unwrap();

    let mut config = Config::from_file(&file).unwrap();
    config.finalize().unwrap();

    assert_eq!(config.dbpath, std::path::PathBuf::from("/var/lib/fathom"));
    assert_eq!(config.repos["svc"].oauth_authorization, Some(false));
}

#[test]
fn test_invalid_configs() {
    let mut missing_url = Config::parse("[repos.svc]\nvcs = \"git\"\n", false).unwrap();
    assert!(missing_url.finalize().is_err());

    let mut colliding = Config::parse(
        r#"
[repos."a/b"]
url = "https://example.com/1.git"

[repos."a:b"]
url = "https://example.com/2.git"
"#,
        false,
    )
    .unwrap();
    assert!(colliding.finalize().is_err());

    assert!(Config::parse("repos = 3", false).is_err());
    assert!(Config::from_file("/nonexistent/fathom.toml").is_err());
}

#[tokio::test]
async fn test_discovery_never_overrides_manual_entries() {
    let gitlab = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v4/projects"))
        .and(query_param("membership", "True"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"name_with_namespace": "svc", "http_url_to_repo": "https://gl/team/svc.git"},
            {"name_with_namespace": "team / new", "http_url_to_repo": "https://gl/team/new.git"}
        ])))
        .mount(&gitlab)
        .await;

    let mut config = Config::parse(
        &format!(
            r#"
[repos.svc]
url = "https://example.com/svc.git"

[gitlab-sync.main]
url = "{}"
key = "token"

[gitlab-sync.main.repo-options]
enable-push-updates = true
"#,
            gitlab.uri()
        ),
        false,
    )
    .unwrap();
    config.finalize().unwrap();

    let added = config.discover_projects().await.unwrap();
    assert_eq!(added, 1);
    assert_eq!(config.repos["svc"].url, "https://example.com/svc.git");

    let discovered = &config.repos["team / new"];
    assert_eq!(discovered.url, "https://gl/team/new.git");
    assert!(discovered.push_updates_enabled());
    // Defaults applied after discovery
    assert_eq!(discovered.vcs, "git");
}
