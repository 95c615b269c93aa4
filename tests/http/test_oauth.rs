//! Integration tests for the OAuth authorization flow

use axum::body::Body;
use axum::http::{header, Request, Response, StatusCode};
use fathom::core::auth::OAuthConfig;
use fathom::http::{SESSION_COOKIE, STATE_COOKIE};
use serde_json::json;
use std::collections::HashMap;
use wiremock::matchers::{body_string_contains, header as header_matches, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::common::helpers::PRIVATE_URL;
use crate::common::{body_json, create_test_services, get, session_for};

const REDIRECT_HOST: &str = "https://search.example.com";

fn oauth_config(provider: &str) -> OAuthConfig {
    OAuthConfig {
        client_id: "client".to_string(),
        client_secret: "shh".to_string(),
        token_url: format!("{provider}/oauth/token"),
        auth_url: format!("{provider}/oauth/authorize"),
        redirect_host: REDIRECT_HOST.to_string(),
    }
}

/// Name -> value of every `Set-Cookie` header
fn set_cookies(response: &Response<Body>) -> HashMap<String, String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .filter_map(|v| v.split(';').next())
        .filter_map(|pair| pair.split_once('='))
        .map(|(name, value)| (name.to_string(), value.to_string()))
        .collect()
}

/// Cookie values may be percent-encoded on the wire
fn decoded(value: &str) -> String {
    url::form_urlencoded::parse(format!("v={value}").as_bytes())
        .next()
        .map(|(_, v)| v.into_owned())
        .unwrap_or_default()
}

fn location(response: &Response<Body>) -> String {
    response
        .headers()
        .get(header::LOCATION)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string()
}

fn callback(code: &str, state: &str, cookies: &HashMap<String, String>) -> Request<Body> {
    let cookie = cookies
        .iter()
        .map(|(name, value)| format!("{name}={value}"))
        .collect::<Vec<_>>()
        .join("; ");
    let state = state.replace('=', "%3D");
    Request::builder()
        .uri(format!("/api/v1/oauth/redirect?code={code}&state={state}"))
        .header(header::COOKIE, cookie)
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn test_begin_without_provider() {
    let server = create_test_services(None);

    let response = server.send(get("/api/v1/oauth/gitlab", None, None)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_json(response).await["Error"].is_string());
}

#[tokio::test]
async fn test_begin_redirects_with_state() {
    let server = create_test_services(Some(oauth_config("https://gitlab.example.com")));

    let response = server.send(get("/api/v1/oauth/gitlab", None, None)).await;
    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);

    let cookies = set_cookies(&response);
    let state = decoded(cookies.get(STATE_COOKIE).unwrap());
    assert!(!state.is_empty());
    assert!(cookies.contains_key(SESSION_COOKIE));

    let target = url::Url::parse(&location(&response)).unwrap();
    assert_eq!(target.path(), "/oauth/authorize");
    let params: HashMap<_, _> = target.query_pairs().into_owned().collect();
    assert_eq!(params["client_id"], "client");
    assert_eq!(params["response_type"], "code");
    assert_eq!(params["state"], state);
    assert_eq!(
        params["redirect_uri"],
        format!("{REDIRECT_HOST}/api/v1/oauth/redirect")
    );
}

#[tokio::test]
async fn test_begin_when_already_authorized() {
    let server = create_test_services(Some(oauth_config("https://gitlab.example.com")));
    let session = session_for(&server.services, &[PRIVATE_URL]);

    let response = server
        .send(get("/api/v1/oauth/gitlab", None, Some(&session)))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_full_flow_grants_access() {
    let provider = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .and(body_string_contains("code=abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "user-token",
            "token_type": "bearer"
        })))
        .expect(1)
        .mount(&provider)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v4/projects"))
        .and(query_param("membership", "True"))
        .and(header_matches("Authorization", "Bearer user-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"name_with_namespace": "team / private", "http_url_to_repo": PRIVATE_URL}
        ])))
        .expect(1)
        .mount(&provider)
        .await;

    let server = create_test_services(Some(oauth_config(&provider.uri())));

    let begin = server.send(get("/api/v1/oauth/gitlab", None, None)).await;
    let cookies = set_cookies(&begin);
    let state = decoded(&cookies[STATE_COOKIE]);
    let session = cookies[SESSION_COOKIE].clone();

    let response = server.send(callback("abc", &state, &cookies)).await;
    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(location(&response), REDIRECT_HOST);
    // The state cookie is cleared once used
    assert_eq!(set_cookies(&response).get(STATE_COOKIE).map(String::as_str), Some(""));

    let repos = body_json(server.send(get("/api/v1/repos", None, Some(&session))).await).await;
    assert!(repos.get("private").is_some());

    let search = body_json(
        server
            .send(get("/api/v1/search?q=x&repos=private", None, Some(&session)))
            .await,
    )
    .await;
    assert_eq!(search["Results"]["private"]["Matches"][0]["Filename"], "internal.rs");
}

#[tokio::test]
async fn test_callback_state_mismatch() {
    let provider = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access_token": "t"})))
        .expect(0)
        .mount(&provider)
        .await;

    let server = create_test_services(Some(oauth_config(&provider.uri())));

    let begin = server.send(get("/api/v1/oauth/gitlab", None, None)).await;
    let cookies = set_cookies(&begin);
    let session = cookies[SESSION_COOKIE].clone();

    let response = server.send(callback("abc", "forged", &cookies)).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let repos = body_json(server.send(get("/api/v1/repos", None, Some(&session))).await).await;
    assert!(repos.get("private").is_none());
}

#[tokio::test]
async fn test_callback_without_session() {
    let server = create_test_services(Some(oauth_config("https://gitlab.example.com")));

    let mut cookies = HashMap::new();
    cookies.insert(STATE_COOKIE.to_string(), "s1".to_string());

    let response = server.send(callback("abc", "s1", &cookies)).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}
