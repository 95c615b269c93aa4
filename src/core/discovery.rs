//! Repository discovery from a project-hosting API.
//!
//! Discovered projects only feed the repository set (see
//! `config::merge`) and the OAuth flow's list of authorized URLs.

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, LINK};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::fmt;
use std::time::Duration;

use crate::core::config::RepoConfig;
use crate::core::error::{FathomError, Result};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// A project reported by a discovery source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredProject {
    pub name: String,
    pub url: String,
}

/// A feed of repositories the server (or a caller) can access
#[async_trait]
pub trait ProjectSource: Send + Sync {
    async fn projects(&self) -> Result<Vec<DiscoveredProject>>;

    /// Clone URLs of every project
    async fn project_urls(&self) -> Result<Vec<String>> {
        Ok(self.projects().await?.into_iter().map(|p| p.url).collect())
    }
}

/// `gitlab-sync` entry of the configuration file
#[derive(Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct GitlabSyncConfig {
    /// API token sent as a bearer credential
    #[serde(default)]
    pub key: String,

    #[serde(default = "default_gitlab_url")]
    pub url: String,

    #[serde(default = "default_membership")]
    pub membership_required: bool,

    #[serde(default)]
    pub ownership_required: bool,

    /// Refuse to continue when more projects are visible (0 = unlimited)
    #[serde(default = "default_max_projects")]
    pub maximum_projects: usize,

    /// Template applied to every discovered repository
    #[serde(default)]
    pub repo_options: Option<RepoConfig>,
}

fn default_gitlab_url() -> String {
    "https://gitlab.com".to_string()
}

fn default_membership() -> bool {
    true
}

fn default_max_projects() -> usize {
    1000
}

impl GitlabSyncConfig {
    /// Config for listing the projects a user token can see
    pub fn for_token(url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            key: token.into(),
            url: url.into(),
            membership_required: true,
            ownership_required: false,
            maximum_projects: 0,
            repo_options: None,
        }
    }
}

impl fmt::Debug for GitlabSyncConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GitlabSyncConfig")
            .field("url", &self.url)
            .field("membership_required", &self.membership_required)
            .field("ownership_required", &self.ownership_required)
            .field("maximum_projects", &self.maximum_projects)
            .finish_non_exhaustive()
    }
}

/// GitLab API response for a project (simple view)
#[derive(Debug, Deserialize)]
struct GitlabProject {
    name_with_namespace: String,
    http_url_to_repo: String,
}

/// Lists projects through the GitLab v4 API, following pagination
pub struct GitlabSource {
    config: GitlabSyncConfig,
    client: Client,
}

impl GitlabSource {
    pub fn new(config: GitlabSyncConfig) -> Result<Self> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self { config, client })
    }

    fn first_page_url(&self) -> String {
        let mut url = format!(
            "{}/api/v4/projects?simple=True",
            self.config.url.trim_end_matches('/')
        );
        if self.config.ownership_required {
            url.push_str("&ownership=True");
        } else if self.config.membership_required {
            url.push_str("&membership=True");
        }
        url
    }
}

#[async_trait]
impl ProjectSource for GitlabSource {
    async fn projects(&self) -> Result<Vec<DiscoveredProject>> {
        let mut projects = Vec::new();
        let mut page_url = Some(self.first_page_url());

        while let Some(url) = page_url.take() {
            let response = self
                .client
                .get(&url)
                .header(AUTHORIZATION, format!("Bearer {}", self.config.key))
                .send()
                .await?;

            if response.status() != StatusCode::OK {
                return Err(FathomError::Discovery(format!(
                    "HTTP request failed for {url} with status code {}",
                    response.status().as_u16()
                )));
            }

            page_url = response
                .headers()
                .get(LINK)
                .and_then(|v| v.to_str().ok())
                .and_then(next_page_link);

            let page: Vec<GitlabProject> = response.json().await?;
            projects.extend(page.into_iter().map(|p| DiscoveredProject {
                name: p.name_with_namespace,
                url: p.http_url_to_repo,
            }));
        }

        if self.config.maximum_projects != 0 && projects.len() > self.config.maximum_projects {
            return Err(FathomError::Discovery(format!(
                "Trying to clone {} projects which is larger than the maximum defined {}",
                projects.len(),
                self.config.maximum_projects
            )));
        }

        tracing::debug!(count = projects.len(), "Fetched GitLab projects");
        Ok(projects)
    }
}

/// Extract the `rel="next"` target from a `Link` header
///
/// Input looks like:
/// `<https://gitlab.com/a>; rel="next", <https://gitlab.com/b>; rel="first"`
pub fn next_page_link(header: &str) -> Option<String> {
    header
        .split(", ")
        .filter_map(|rel| {
            rel.strip_suffix(r#"; rel="next""#)
                .map(|link| link.trim_start_matches('<').trim_end_matches('>'))
        })
        .last()
        .filter(|link| !link.is_empty())
        .map(str::to_string)
}
