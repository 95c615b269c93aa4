//! Error types and error handling for the Fathom search server.
//!
//! This module defines the error types used throughout the
//! application. Protocol-specific mapping (HTTP status codes) is
//! handled in the respective adapter modules.

use thiserror::Error;

/// Result type alias for Fathom operations
pub type Result<T> = std::result::Result<T, FathomError>;

/// Main error type for the Fathom service
#[derive(Error, Debug)]
pub enum FathomError {
    #[error("No such repository: {0}")]
    RepositoryNotFound(String),

    #[error("Push updates are not enabled for repository {0}")]
    UpdatesDisabled(String),

    #[error("Malformed webhook payload: {0}")]
    MalformedWebhook(String),

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Search failed: {0}")]
    SearchFailed(String),

    #[error("{desc} failed in {dir}: {output}")]
    VcsCommand {
        desc: String,
        dir: String,
        output: String,
    },

    #[error("Unknown VCS driver: {0}")]
    UnknownVcs(String),

    #[error("Project discovery failed: {0}")]
    Discovery(String),

    #[error("Authorization failed: {0}")]
    Authorization(String),

    #[error("No OAuth provider configured")]
    OAuthNotConfigured,

    #[error("Already authorized")]
    AlreadyAuthorized,

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("HTTP client error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("URL parsing error: {0}")]
    UrlError(#[from] url::ParseError),
}

impl FathomError {
    /// Get user-friendly error message
    pub fn message(&self) -> String {
        self.to_string()
    }

    /// Check if this is a "not found" type error
    pub fn is_not_found(&self) -> bool {
        matches!(self, FathomError::RepositoryNotFound(_))
    }

    /// Check if the caller is not allowed to perform the operation
    pub fn is_forbidden(&self) -> bool {
        matches!(self, FathomError::UpdatesDisabled(_))
    }

    /// Check if this is a bad request error (invalid input)
    pub fn is_bad_request(&self) -> bool {
        matches!(
            self,
            FathomError::MalformedWebhook(_)
                | FathomError::InvalidQuery(_)
                | FathomError::OAuthNotConfigured
                | FathomError::AlreadyAuthorized
        )
    }
}
