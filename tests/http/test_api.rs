//! Integration tests for the Fathom REST API

use axum::body::Body;
use axum::http::{Request, StatusCode};

use crate::common::helpers::PRIVATE_URL;
use crate::common::{body_json, create_test_services, get, post, session_for};

fn names(value: &serde_json::Value) -> Vec<String> {
    let mut names: Vec<String> = value.as_object().unwrap().keys().cloned().collect();
    names.sort();
    names
}

#[tokio::test]
async fn test_health_endpoint() {
    let server = create_test_services(None);

    let response = server.send(get("/healthz", None, None)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_repos_anonymous_sees_open_repositories() {
    let server = create_test_services(None);

    let response = server.send(get("/api/v1/repos", None, None)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(names(&json), vec!["open", "org/hooked", "static"]);
    assert_eq!(json["open"]["url"], "https://example.com/open.git");
    assert_eq!(json["open"]["vcs"], "git");
    assert!(json["open"].get("access-keys").is_none());
}

#[tokio::test]
async fn test_repos_access_key_and_session() {
    let server = create_test_services(None);

    let json = body_json(server.send(get("/api/v1/repos", Some("k1"), None)).await).await;
    assert_eq!(names(&json), vec!["keyed", "open", "org/hooked", "static"]);

    // Wrong key behaves like no key
    let json = body_json(server.send(get("/api/v1/repos", Some("k2"), None)).await).await;
    assert_eq!(names(&json), vec!["open", "org/hooked", "static"]);

    let session = session_for(&server.services, &[PRIVATE_URL]);
    let json = body_json(server.send(get("/api/v1/repos", None, Some(&session))).await).await;
    assert_eq!(names(&json), vec!["open", "org/hooked", "private", "static"]);
}

#[tokio::test]
async fn test_search_filters_unauthorized_repositories() {
    let server = create_test_services(None);

    let response = server
        .send(get("/api/v1/search?q=needle&repos=open,keyed,missing", None, None))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(names(&json["Results"]), vec!["open"]);
    assert!(json.get("Stats").is_none());

    let file = &json["Results"]["open"]["Matches"][0];
    assert_eq!(file["Filename"], "main.rs");
    assert_eq!(file["Matches"][0]["Line"], "let x = needle;");
    assert_eq!(json["Results"]["open"]["Revision"], "rev-1");
}

#[tokio::test]
async fn test_search_stats() {
    let server = create_test_services(None);

    let json = body_json(
        server
            .send(get("/api/v1/search?q=x&repos=*&stats=fosho", Some("k1"), None))
            .await,
    )
    .await;

    assert_eq!(
        names(&json["Results"]),
        vec!["keyed", "open", "org/hooked", "static"]
    );
    // 3 + 4 + 1 + 5
    assert_eq!(json["Stats"]["FilesOpened"], 13);
    assert!(json["Stats"]["DurationMs"].is_u64());
}

#[tokio::test]
async fn test_search_failure_is_reported_in_band() {
    let server = create_test_services(None);

    let response = server
        .send(get("/api/v1/search?q=x&repos=*", Some("boom"), None))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert!(json.get("Results").is_none());
    assert!(json["Error"].as_str().unwrap().contains("index unavailable"));
}

#[tokio::test]
async fn test_search_without_repositories() {
    let server = create_test_services(None);

    let json = body_json(server.send(get("/api/v1/search?q=x", None, None)).await).await;
    assert_eq!(json["Results"], serde_json::json!({}));
}

#[tokio::test]
async fn test_excludes() {
    let server = create_test_services(None);

    let response = server
        .send(get("/api/v1/excludes?repo=keyed", None, None))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = body_json(response).await;
    assert!(json["Error"].is_string());

    let response = server
        .send(get("/api/v1/excludes?repo=missing", Some("k1"), None))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = server
        .send(get("/api/v1/excludes?repo=keyed", Some("k1"), None))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json[0]["Filename"], ".git");
    assert!(json[0]["Reason"].is_string());
}

#[tokio::test]
async fn test_update_triggers_push_enabled_repositories() {
    let server = create_test_services(None);

    let response = server
        .send(post("/api/v1/update?repos=open,org/hooked", None, Body::empty()))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, "ok");
}

#[tokio::test]
async fn test_update_push_disabled_is_forbidden() {
    let server = create_test_services(None);

    let response = server
        .send(post("/api/v1/update?repos=static", None, Body::empty()))
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let json = body_json(response).await;
    assert!(json["Error"].as_str().unwrap().contains("static"));
}

#[tokio::test]
async fn test_update_skips_unauthorized_repositories() {
    let server = create_test_services(None);

    // keyed is invisible without its key, so nothing is triggered
    let response = server
        .send(post("/api/v1/update?repos=keyed,missing", None, Body::empty()))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_update_requires_post() {
    let server = create_test_services(None);

    let response = server.send(get("/api/v1/update?repos=open", None, None)).await;
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn test_github_webhook() {
    let server = create_test_services(None);

    let response = server
        .send(post(
            "/api/v1/github-webhook",
            None,
            r#"{"repository": {"full_name": "org/hooked"}, "ref": "refs/heads/master"}"#,
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = server
        .send(post(
            "/api/v1/github-webhook",
            None,
            r#"{"repository": {"full_name": "org/unknown"}}"#,
        ))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = server
        .send(post("/api/v1/github-webhook", None, "not json"))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unknown_route() {
    let server = create_test_services(None);

    let response = server
        .send(
            Request::builder()
                .uri("/api/v2/search")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
