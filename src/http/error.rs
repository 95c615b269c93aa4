//! HTTP mapping of domain errors
//!
//! Error bodies are `{"Error": "<message>"}`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::core::error::FathomError;

/// Status code for a domain error
pub fn status_code(err: &FathomError) -> StatusCode {
    if err.is_not_found() {
        StatusCode::NOT_FOUND
    } else if err.is_forbidden() {
        StatusCode::FORBIDDEN
    } else if err.is_bad_request() {
        StatusCode::BAD_REQUEST
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    }
}

/// Error body with an explicit status
pub fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({ "Error": message.into() }))).into_response()
}

/// Implement IntoResponse for automatic error conversion in Axum
impl IntoResponse for FathomError {
    fn into_response(self) -> Response {
        let status = status_code(&self);
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }
        error_response(status, self.message())
    }
}
