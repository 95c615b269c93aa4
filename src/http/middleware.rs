//! Middleware for the Fathom API
//!
//! Provides request logging with duration tracking.

use axum::{body::Body, http::Request, middleware::Next, response::Response};
use std::time::Instant;
use tracing::{error, info};

/// Request logging middleware
///
/// Logs method, path, status code and duration. Successful requests
/// are logged at INFO level, failed requests at ERROR level. The query
/// string is left out since it may carry OAuth codes.
pub async fn log_request(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    let response = next.run(request).await;

    let duration_ms = start.elapsed().as_millis();
    let status = response.status();

    // Redirects are part of the OAuth flow, not failures
    if status.is_success() || status.is_redirection() {
        info!(
            method = %method,
            path = %path,
            status = %status.as_u16(),
            duration_ms = %duration_ms,
            "Request completed"
        );
    } else {
        error!(
            method = %method,
            path = %path,
            status = %status.as_u16(),
            duration_ms = %duration_ms,
            "Request failed"
        );
    }

    response
}
