//! HTTP REST adapter
//!
//! Depends only on core/.
//!
//! Serves repository listing, search, exclusions, update triggers and
//! the OAuth flow via the Axum web framework.

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod params;

pub use handlers::*;

use std::sync::Arc;

use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;

use crate::core::auth::oauth::{GITLAB_PROVIDER, REDIRECT_PATH};
use crate::core::error::Result;
use crate::core::services::Services;

/// Build the API router
pub fn router(services: Arc<Services>) -> Router {
    let health_uri = services.config.health_check_uri.clone();
    let oauth_begin = format!("/api/v1/oauth/{GITLAB_PROVIDER}");

    Router::new()
        // Health check endpoint
        .route(&health_uri, get(health_handler))
        // API v1 endpoints
        .route("/api/v1/repos", get(repos_handler))
        .route("/api/v1/search", get(search_handler))
        .route("/api/v1/excludes", get(excludes_handler))
        .route("/api/v1/update", post(update_handler))
        .route("/api/v1/github-webhook", post(github_webhook_handler))
        .route(&oauth_begin, get(oauth_begin_handler))
        .route(REDIRECT_PATH, get(oauth_redirect_handler))
        // Add middleware
        .layer(axum_middleware::from_fn(middleware::log_request))
        .layer(CorsLayer::permissive())
        // Add shared state
        .with_state(services)
}

/// Serve the API on `addr` until Ctrl-C or SIGTERM
pub async fn serve(services: Arc<Services>, addr: &str) -> Result<()> {
    let health_uri = services.config.health_check_uri.clone();
    let app = router(services);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Listening on {}", addr);
    tracing::info!("Service ready - Health check at http://{}{}", addr, health_uri);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("Received shutdown signal");
}
