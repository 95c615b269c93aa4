//! HTTP request handlers for the Fathom API

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Redirect, Response},
    Json,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::error::error_response;
use super::params::{OAuthCallbackParams, RepoParam, ReposParam, SearchParams};
use crate::core::access::{resolve_repos, Caller, RepoSelection};
use crate::core::auth::{
    new_session_id, new_state_token, session_lifetime, verify_state, AuthorizedUrlSet,
    SessionData,
};
use crate::core::config::PublicRepoConfig;
use crate::core::error::{FathomError, Result};
use crate::core::search::{search_all, ExcludedFile, SearchResponse};
use crate::core::services::Services;

/// Header carrying the caller's access key
pub const ACCESS_KEY_HEADER: &str = "fathom-access-key";

/// Cookie holding the session id
pub const SESSION_COOKIE: &str = "fathom_session";

/// Cookie holding the OAuth CSRF state
pub const STATE_COOKIE: &str = "oauthstate";

const STATE_COOKIE_MINUTES: i64 = 10;

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct SearchStats {
    pub files_opened: usize,
    pub duration_ms: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct SearchResults {
    pub results: BTreeMap<String, SearchResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<SearchStats>,
}

/// Push notification body; only `repository.full_name` is used
#[derive(Debug, Default, Deserialize)]
struct Webhook {
    #[serde(default)]
    repository: WebhookRepository,
}

#[derive(Debug, Default, Deserialize)]
struct WebhookRepository {
    #[serde(default)]
    full_name: String,
}

/// Identify the caller from the access-key header and session cookie
fn caller(services: &Services, headers: &HeaderMap, jar: &CookieJar) -> Caller {
    let access_key = headers
        .get(ACCESS_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    Caller::new(access_key, authorized_urls(services, jar))
}

fn authorized_urls(services: &Services, jar: &CookieJar) -> HashSet<String> {
    jar.get(SESSION_COOKIE)
        .and_then(|cookie| services.sessions.get(cookie.value()))
        .and_then(|data| data.active_urls(Utc::now()).map(|set| set.urls().clone()))
        .unwrap_or_default()
}

/// Health check handler
///
/// Returns server status and version information.
pub async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Public configuration of every repository the caller may see
pub async fn repos_handler(
    State(services): State<Arc<Services>>,
    headers: HeaderMap,
    jar: CookieJar,
) -> Json<BTreeMap<String, PublicRepoConfig>> {
    let caller = caller(&services, &headers, &jar);
    let names = resolve_repos(&RepoSelection::All, &services.registry, &caller);

    let repos = names
        .into_iter()
        .filter_map(|name| {
            let public = services.registry.get(&name)?.config.public();
            Some((name, public))
        })
        .collect();
    Json(repos)
}

/// Search handler
///
/// A failed search still answers 200, with the message in an `Error`
/// field in place of `Results`.
pub async fn search_handler(
    State(services): State<Arc<Services>>,
    headers: HeaderMap,
    jar: CookieJar,
    Query(params): Query<SearchParams>,
) -> Response {
    let caller = caller(&services, &headers, &jar);
    let repos = resolve_repos(&params.selection(), &services.registry, &caller);
    let options = params.options();

    match search_all(&params.q, &options, &repos, &services.registry).await {
        Ok(aggregate) => {
            let stats = params.wants_stats().then_some(SearchStats {
                files_opened: aggregate.files_opened,
                duration_ms: aggregate.duration_ms,
            });
            Json(SearchResults {
                results: aggregate.results,
                stats,
            })
            .into_response()
        }
        Err(e) => {
            tracing::warn!(error = %e, "Search failed");
            error_response(StatusCode::OK, e.message())
        }
    }
}

/// Files of one repository that are never searched
pub async fn excludes_handler(
    State(services): State<Arc<Services>>,
    headers: HeaderMap,
    jar: CookieJar,
    Query(params): Query<RepoParam>,
) -> Result<Json<Vec<ExcludedFile>>> {
    let caller = caller(&services, &headers, &jar);
    let selection = RepoSelection::Explicit(vec![params.repo.clone()]);

    // Unauthorized and unknown look the same
    if resolve_repos(&selection, &services.registry, &caller).is_empty() {
        return Err(FathomError::RepositoryNotFound(params.repo));
    }
    let repo = services
        .registry
        .get(&params.repo)
        .ok_or_else(|| FathomError::RepositoryNotFound(params.repo.clone()))?;

    Ok(Json(repo.searcher.excluded_files().await?))
}

fn trigger_update(services: &Services, name: &str) -> Result<()> {
    if services.registry.get(name).is_none() {
        return Err(FathomError::RepositoryNotFound(name.to_string()));
    }
    if !services.sync.update(name)? {
        return Err(FathomError::UpdatesDisabled(name.to_string()));
    }
    Ok(())
}

/// Request push-style updates of the named repositories
///
/// Names the caller may not see are skipped like unknown ones.
pub async fn update_handler(
    State(services): State<Arc<Services>>,
    headers: HeaderMap,
    jar: CookieJar,
    Query(params): Query<ReposParam>,
) -> Result<Json<&'static str>> {
    let caller = caller(&services, &headers, &jar);
    let selection = RepoSelection::parse(&params.repos);

    for name in resolve_repos(&selection, &services.registry, &caller) {
        trigger_update(&services, &name)?;
    }
    Ok(Json("ok"))
}

/// GitHub push webhook keyed by `repository.full_name`
pub async fn github_webhook_handler(
    State(services): State<Arc<Services>>,
    body: Bytes,
) -> Result<Json<&'static str>> {
    let hook: Webhook = serde_json::from_slice(&body)
        .map_err(|e| FathomError::MalformedWebhook(e.to_string()))?;

    trigger_update(&services, &hook.repository.full_name)?;
    Ok(Json("ok"))
}

fn session_cookie(id: String) -> Cookie<'static> {
    let lifetime = time::Duration::seconds(session_lifetime().num_seconds());
    Cookie::build((SESSION_COOKIE, id))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(lifetime)
        .build()
}

/// Start the OAuth flow
///
/// Stores the provider in the session, binds a fresh state token to a
/// short-lived cookie and redirects to the provider.
pub async fn oauth_begin_handler(
    State(services): State<Arc<Services>>,
    jar: CookieJar,
) -> Result<(CookieJar, Redirect)> {
    let provider = services
        .oauth
        .as_ref()
        .ok_or(FathomError::OAuthNotConfigured)?;

    let existing = jar
        .get(SESSION_COOKIE)
        .map(|c| c.value().to_string())
        .filter(|id| services.sessions.get(id).is_some());
    if let Some(id) = &existing {
        let authorized = services
            .sessions
            .get(id)
            .is_some_and(|data| data.active_urls(Utc::now()).is_some());
        if authorized {
            return Err(FathomError::AlreadyAuthorized);
        }
    }

    let session_id = existing.unwrap_or_else(new_session_id);
    services.sessions.put(
        &session_id,
        SessionData {
            oauth_provider: Some(provider.name().to_string()),
            authorized_urls: None,
        },
    );

    let state = new_state_token();
    let auth_url = provider.authorization_url(&state)?;

    let state_cookie = Cookie::build((STATE_COOKIE, state))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::minutes(STATE_COOKIE_MINUTES))
        .build();

    let jar = jar.add(state_cookie).add(session_cookie(session_id));
    Ok((jar, Redirect::temporary(&auth_url)))
}

/// Provider callback
///
/// Verifies the state, exchanges the code, records the caller's
/// project URLs in the session and sends them on to the redirect host.
pub async fn oauth_redirect_handler(
    State(services): State<Arc<Services>>,
    jar: CookieJar,
    Query(params): Query<OAuthCallbackParams>,
) -> Result<(CookieJar, Redirect)> {
    let provider = services
        .oauth
        .as_ref()
        .ok_or(FathomError::OAuthNotConfigured)?;

    verify_state(
        jar.get(STATE_COOKIE).map(|c| c.value()),
        params.state.as_deref(),
    )?;

    let session_id = jar
        .get(SESSION_COOKIE)
        .map(|c| c.value().to_string())
        .ok_or_else(|| FathomError::Authorization("No session".to_string()))?;
    let session = services.sessions.get(&session_id).unwrap_or_default();

    if session.oauth_provider.as_deref() != Some(provider.name()) {
        return Err(FathomError::Authorization(
            "Redirect action for oauth provider not implemented".to_string(),
        ));
    }

    let code = params.code.unwrap_or_default();
    let token = provider.exchange_code(&code).await?;
    let urls = provider.authorized_urls(&token).await?;
    tracing::info!(projects = urls.len(), "OAuth authorization complete");

    services.sessions.put(
        &session_id,
        SessionData {
            oauth_provider: session.oauth_provider,
            authorized_urls: Some(AuthorizedUrlSet::new(urls, Utc::now())),
        },
    );

    let jar = jar.remove(Cookie::build(STATE_COOKIE).path("/").build());
    Ok((jar, Redirect::temporary(provider.redirect_host())))
}
