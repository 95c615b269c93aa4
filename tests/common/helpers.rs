// Test helper functions

use axum::body::Body;
use axum::http::{Request, Response};
use chrono::Utc;
use fathom::core::auth::{AuthorizedUrlSet, MemorySessionStore, OAuthConfig, SessionData};
use fathom::core::config::{Config, RepoConfig};
use fathom::core::registry::{Registry, Repository};
use fathom::core::services::Services;
use fathom::core::sync::{SyncCoordinator, SyncTarget};
use fathom::http::{ACCESS_KEY_HEADER, SESSION_COOKIE};
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt as TowerServiceExt;

use super::fixtures::{StubDriver, StubSearcher};

/// URL of the OAuth-gated fixture repository
#[allow(dead_code)]
pub const PRIVATE_URL: &str = "https://gl.example.com/team/private.git";

/// Router plus the state behind it
#[allow(dead_code)]
pub struct TestServer {
    pub services: Arc<Services>,
    pub temp: TempDir,
}

#[allow(dead_code)]
impl TestServer {
    pub async fn send(&self, request: Request<Body>) -> Response<axum::body::Body> {
        fathom::http::router(Arc::clone(&self.services))
            .oneshot(request)
            .await
            .unwrap()
    }
}

fn repo(url: &str, push: bool) -> RepoConfig {
    let mut config = RepoConfig::with_url(url);
    config.enable_poll_updates = Some(false);
    config.enable_push_updates = Some(push);
    config
}

/// Services over a fixed set of stub repositories
///
/// - `open`: no access control, push updates on
/// - `static`: no access control, push updates off
/// - `org/hooked`: no access control, push updates on
/// - `keyed`: access key `k1`
/// - `private`: OAuth-gated on [`PRIVATE_URL`]
/// - `broken`: access key `boom`, every search fails
#[allow(dead_code)] // Used in integration tests
pub fn create_test_services(oauth: Option<OAuthConfig>) -> TestServer {
    let temp = TempDir::new().expect("Failed to create temp dir");

    let mut keyed = repo("https://example.com/keyed.git", true);
    keyed.access_keys = Some(vec!["k1".to_string()]);
    let mut private = repo(PRIVATE_URL, true);
    private.oauth_authorization = Some(false);
    let mut broken = repo("https://example.com/broken.git", true);
    broken.access_keys = Some(vec!["boom".to_string()]);

    let repos = vec![
        ("open", repo("https://example.com/open.git", true), StubSearcher::matching("main.rs", 3)),
        ("static", repo("https://example.com/static.git", false), StubSearcher::matching("lib.rs", 4)),
        ("org/hooked", repo("https://github.com/org/hooked.git", true), StubSearcher::matching("hook.rs", 1)),
        ("keyed", keyed, StubSearcher::matching("secret.rs", 5)),
        ("private", private, StubSearcher::matching("internal.rs", 2)),
        ("broken", broken, StubSearcher::failing()),
    ];

    let mut config = Config::default();
    config.dbpath = temp.path().to_path_buf();
    config.gitlab_oauth = oauth;

    let mut targets = Vec::new();
    let mut served = Vec::new();
    for (name, repo_config, searcher) in repos {
        targets.push(SyncTarget {
            name: name.to_string(),
            url: repo_config.url.clone(),
            working_dir: config.working_dir(name),
            poll_interval: None,
            push_enabled: repo_config.push_updates_enabled(),
            driver: Arc::new(StubDriver),
        });
        config.repos.insert(name.to_string(), repo_config.clone());
        served.push(Repository::new(name, repo_config, Arc::new(searcher)));
    }

    let services = Services::new(
        config,
        Registry::new(served),
        Arc::new(SyncCoordinator::new(targets, 2)),
        Arc::new(MemorySessionStore::new()),
    )
    .unwrap();

    TestServer {
        services: Arc::new(services),
        temp,
    }
}

/// Store a session authorized for `urls` and return its id
#[allow(dead_code)]
pub fn session_for(services: &Services, urls: &[&str]) -> String {
    let id = fathom::core::auth::new_session_id();
    services.sessions.put(
        &id,
        SessionData {
            oauth_provider: Some("gitlab".to_string()),
            authorized_urls: Some(AuthorizedUrlSet::new(
                urls.iter().map(|u| u.to_string()),
                Utc::now(),
            )),
        },
    );
    id
}

/// GET request with optional access key and session cookie
#[allow(dead_code)]
pub fn get(uri: &str, access_key: Option<&str>, session: Option<&str>) -> Request<Body> {
    request("GET", uri, access_key, session, Body::empty())
}

/// POST request with optional access key and a raw body
#[allow(dead_code)]
pub fn post(uri: &str, access_key: Option<&str>, body: impl Into<Body>) -> Request<Body> {
    request("POST", uri, access_key, None, body.into())
}

fn request(
    method: &str,
    uri: &str,
    access_key: Option<&str>,
    session: Option<&str>,
    body: Body,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(key) = access_key {
        builder = builder.header(ACCESS_KEY_HEADER, key);
    }
    if let Some(id) = session {
        builder = builder.header("cookie", format!("{SESSION_COOKIE}={id}"));
    }
    builder.body(body).unwrap()
}

/// Decode a JSON response body
#[allow(dead_code)]
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), 1_000_000)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}
