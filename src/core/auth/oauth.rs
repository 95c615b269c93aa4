//! OAuth2 authorization-code flow against a GitLab instance.
//!
//! A caller is sent to the provider with a random state token, comes
//! back with a code, and the code is exchanged for a token that lists
//! the projects the caller can see. Those project URLs become the
//! session's authorized URL set.

use base64::engine::general_purpose::URL_SAFE;
use base64::Engine;
use rand::RngCore;
use reqwest::Client;
use serde::Deserialize;
use std::fmt;
use url::Url;

use crate::core::discovery::{GitlabSource, GitlabSyncConfig, ProjectSource};
use crate::core::error::{FathomError, Result};

/// Path the provider redirects back to
pub const REDIRECT_PATH: &str = "/api/v1/oauth/redirect";

/// Provider name stored in the session while a flow is in progress
pub const GITLAB_PROVIDER: &str = "gitlab";

const SCOPES: &str = "read_api";

/// `gitlab-oauth` entry of the configuration file
#[derive(Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct OAuthConfig {
    pub client_id: String,
    pub client_secret: String,
    pub token_url: String,
    pub auth_url: String,
    /// Where this server is reachable; also the post-login destination
    pub redirect_host: String,
}

impl fmt::Debug for OAuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuthConfig")
            .field("client_id", &self.client_id)
            .field("token_url", &self.token_url)
            .field("auth_url", &self.auth_url)
            .field("redirect_host", &self.redirect_host)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Configured OAuth2 provider
pub struct OAuthProvider {
    config: OAuthConfig,
    redirect_uri: String,
    api_host: String,
    client: Client,
}

impl OAuthProvider {
    pub fn new(config: OAuthConfig) -> Result<Self> {
        tracing::info!("Initializing OAuth2 config");

        // API calls go to the host that issues tokens
        let token_url = Url::parse(&config.token_url)?;
        let api_host = token_url.origin().ascii_serialization();
        let redirect_uri = format!(
            "{}{}",
            config.redirect_host.trim_end_matches('/'),
            REDIRECT_PATH
        );
        tracing::info!(redirect_uri = %redirect_uri, "OAuth redirect URL");

        Ok(Self {
            config,
            redirect_uri,
            api_host,
            client: Client::new(),
        })
    }

    pub fn name(&self) -> &'static str {
        GITLAB_PROVIDER
    }

    pub fn redirect_uri(&self) -> &str {
        &self.redirect_uri
    }

    /// Destination after a completed flow
    pub fn redirect_host(&self) -> &str {
        &self.config.redirect_host
    }

    pub fn api_host(&self) -> &str {
        &self.api_host
    }

    /// Provider URL the caller is sent to
    pub fn authorization_url(&self, state: &str) -> Result<String> {
        let url = Url::parse_with_params(
            &self.config.auth_url,
            &[
                ("response_type", "code"),
                ("client_id", self.config.client_id.as_str()),
                ("redirect_uri", self.redirect_uri.as_str()),
                ("scope", SCOPES),
                ("state", state),
            ],
        )?;
        Ok(url.into())
    }

    /// Exchange an authorization code for an access token
    pub async fn exchange_code(&self, code: &str) -> Result<String> {
        let params = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.redirect_uri.as_str()),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
        ];

        let response = self
            .client
            .post(&self.config.token_url)
            .form(&params)
            .send()
            .await
            .map_err(|e| FathomError::Authorization(format!("Token request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(FathomError::Authorization(format!(
                "Token endpoint returned {}",
                response.status().as_u16()
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| FathomError::Authorization(format!("Invalid token response: {e}")))?;
        Ok(token.access_token)
    }

    /// Clone URLs of every project the token's owner is a member of
    pub async fn authorized_urls(&self, token: &str) -> Result<Vec<String>> {
        let source = GitlabSource::new(GitlabSyncConfig::for_token(&self.api_host, token))?;
        source
            .project_urls()
            .await
            .map_err(|e| FathomError::Authorization(format!("Failed to retrieve projects: {e}")))
    }
}

/// Random CSRF state token (16 bytes, URL-safe base64)
pub fn new_state_token() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE.encode(bytes)
}

/// Check the state returned by the provider against the state cookie
pub fn verify_state(cookie_state: Option<&str>, returned_state: Option<&str>) -> Result<()> {
    match (cookie_state, returned_state) {
        (Some(expected), Some(actual)) if !expected.is_empty() && expected == actual => Ok(()),
        _ => Err(FathomError::Authorization(
            "Failed to verify state".to_string(),
        )),
    }
}
