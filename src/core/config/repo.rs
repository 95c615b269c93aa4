//! Per-repository configuration.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::time::Duration;

pub(crate) const DEFAULT_MS_BETWEEN_POLL: u64 = 30_000;
pub(crate) const DEFAULT_VCS: &str = "git";
pub(crate) const DEFAULT_BASE_URL: &str = "{url}/blob/{rev}/{path}{anchor}";
pub(crate) const DEFAULT_ANCHOR: &str = "#L{line}";
const DEFAULT_POLL_ENABLED: bool = true;
const DEFAULT_PUSH_ENABLED: bool = false;

/// Template used by clients to link a match back to the hosting UI
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct UrlPattern {
    #[serde(default)]
    pub base_url: String,
    #[serde(default)]
    pub anchor: String,
}

/// Opaque VCS-specific configuration
///
/// Holds a JSON object whose shape only the VCS driver understands.
/// It may carry credentials, so it is never serialized back out and
/// its `Debug` output is redacted.
#[derive(Clone, Default, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct VcsConfigBlob(Map<String, Value>);

impl VcsConfigBlob {
    pub fn new(values: Map<String, Value>) -> Self {
        Self(values)
    }

    /// Decode a JSON object from raw bytes
    pub fn from_bytes(bytes: &[u8]) -> crate::core::error::Result<Self> {
        Ok(Self(serde_json::from_slice(bytes)?))
    }

    /// Encode back to JSON bytes (for handing to a driver)
    pub fn to_bytes(&self) -> crate::core::error::Result<Vec<u8>> {
        Ok(serde_json::to_vec(&self.0)?)
    }

    pub fn values(&self) -> &Map<String, Value> {
        &self.0
    }

    pub(crate) fn values_mut(&mut self) -> &mut Map<String, Value> {
        &mut self.0
    }
}

impl fmt::Debug for VcsConfigBlob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VcsConfigBlob(<{} redacted fields>)", self.0.len())
    }
}

/// Configuration of a single searchable repository
#[derive(Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RepoConfig {
    #[serde(default)]
    pub url: String,

    /// Poll interval in milliseconds (0 = use default)
    #[serde(default)]
    pub ms_between_poll: u64,

    #[serde(default)]
    pub vcs: String,

    #[serde(default)]
    pub vcs_config: Option<VcsConfigBlob>,

    /// When present, only callers presenting one of these keys are authorized
    #[serde(default)]
    pub access_keys: Option<Vec<String>>,

    /// When present (whatever its value), access is gated on the caller's
    /// OAuth-authorized project URLs
    #[serde(default)]
    pub oauth_authorization: Option<bool>,

    #[serde(default)]
    pub url_pattern: Option<UrlPattern>,

    #[serde(default)]
    pub exclude_dot_files: bool,

    #[serde(default)]
    pub enable_poll_updates: Option<bool>,

    #[serde(default)]
    pub enable_push_updates: Option<bool>,
}

impl RepoConfig {
    /// Create a repository config for a remote URL with defaults applied
    pub fn with_url(url: impl Into<String>) -> Self {
        let mut repo = Self {
            url: url.into(),
            ..Default::default()
        };
        repo.apply_defaults();
        repo
    }

    /// Populate missing values with defaults
    pub fn apply_defaults(&mut self) {
        if self.ms_between_poll == 0 {
            self.ms_between_poll = DEFAULT_MS_BETWEEN_POLL;
        }

        if self.vcs.is_empty() {
            self.vcs = DEFAULT_VCS.to_string();
        }

        let pattern = self.url_pattern.get_or_insert_with(UrlPattern::default);
        if pattern.base_url.is_empty() {
            pattern.base_url = DEFAULT_BASE_URL.to_string();
        }
        if pattern.anchor.is_empty() {
            pattern.anchor = DEFAULT_ANCHOR.to_string();
        }
    }

    /// Are polling based updates enabled on this repo?
    pub fn poll_updates_enabled(&self) -> bool {
        self.enable_poll_updates.unwrap_or(DEFAULT_POLL_ENABLED)
    }

    /// Are push based updates enabled on this repo?
    pub fn push_updates_enabled(&self) -> bool {
        self.enable_push_updates.unwrap_or(DEFAULT_PUSH_ENABLED)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.ms_between_poll.max(1))
    }

    /// View with every secret field removed
    pub fn public(&self) -> PublicRepoConfig {
        PublicRepoConfig {
            url: self.url.clone(),
            ms_between_poll: self.ms_between_poll,
            vcs: self.vcs.clone(),
            url_pattern: self.url_pattern.clone(),
            exclude_dot_files: self.exclude_dot_files,
            enable_poll_updates: self.enable_poll_updates,
            enable_push_updates: self.enable_push_updates,
        }
    }
}

impl fmt::Debug for RepoConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RepoConfig")
            .field("url", &self.url)
            .field("ms_between_poll", &self.ms_between_poll)
            .field("vcs", &self.vcs)
            .field("vcs_config", &self.vcs_config)
            .field(
                "access_keys",
                &self.access_keys.as_ref().map(|keys| keys.len()),
            )
            .field("oauth_authorization", &self.oauth_authorization)
            .field("exclude_dot_files", &self.exclude_dot_files)
            .finish_non_exhaustive()
    }
}

/// Repository configuration as exposed through `/api/v1/repos`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PublicRepoConfig {
    pub url: String,
    pub ms_between_poll: u64,
    pub vcs: String,
    pub url_pattern: Option<UrlPattern>,
    pub exclude_dot_files: bool,
    pub enable_poll_updates: Option<bool>,
    pub enable_push_updates: Option<bool>,
}
