//! Configuration management for the Fathom search server.
//!
//! This module handles loading configuration from TOML (or JSON)
//! files and environment variables, with sensible defaults for all
//! settings, and builds the per-repository configuration set.

pub mod merge;
pub mod repo;

pub use repo::{PublicRepoConfig, RepoConfig, UrlPattern, VcsConfigBlob};

use crate::core::auth::OAuthConfig;
use crate::core::discovery::{GitlabSource, GitlabSyncConfig, ProjectSource};
use crate::core::error::{FathomError, Result};
use crate::core::xdg::XdgDirs;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Path prefix reserved for API routes
pub const API_PREFIX: &str = "/api/v1";

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    /// Root directory for repository working copies
    #[serde(default)]
    pub dbpath: PathBuf,

    #[serde(default = "default_title")]
    pub title: String,

    /// Upper bound on repositories synchronizing at the same time
    #[serde(default = "default_max_concurrent_indexers")]
    pub max_concurrent_indexers: usize,

    #[serde(default = "default_health_check_uri")]
    pub health_check_uri: String,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub search: SearchConfig,

    /// Global per-VCS defaults, keyed by VCS kind
    #[serde(default)]
    pub vcs_config: BTreeMap<String, VcsConfigBlob>,

    #[serde(default)]
    pub repos: BTreeMap<String, RepoConfig>,

    /// Named project discovery sources
    #[serde(default)]
    pub gitlab_sync: BTreeMap<String, GitlabSyncConfig>,

    #[serde(default)]
    pub gitlab_oauth: Option<OAuthConfig>,
}

/// HTTP listener configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

/// Searcher configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SearchConfig {
    /// Files larger than this are not searched
    #[serde(default = "default_max_file_size")]
    pub max_file_size_mb: u64,
}

fn default_title() -> String {
    "Fathom".to_string()
}

fn default_max_concurrent_indexers() -> usize {
    2
}

fn default_health_check_uri() -> String {
    "/healthz".to_string()
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    6080
}

fn default_max_file_size() -> u64 {
    5
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_file_size_mb: default_max_file_size(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            dbpath: PathBuf::new(),
            title: default_title(),
            max_concurrent_indexers: default_max_concurrent_indexers(),
            health_check_uri: default_health_check_uri(),
            server: ServerConfig::default(),
            search: SearchConfig::default(),
            vcs_config: BTreeMap::new(),
            repos: BTreeMap::new(),
            gitlab_sync: BTreeMap::new(),
            gitlab_oauth: None,
        }
    }
}

impl Config {
    /// Parse configuration text; JSON when `is_json`, TOML otherwise
    pub fn parse(contents: &str, is_json: bool) -> Result<Self> {
        if is_json {
            Ok(serde_json::from_str(contents)?)
        } else {
            Ok(toml::from_str(contents)?)
        }
    }

    /// Load configuration from a TOML or JSON file
    ///
    /// A relative `dbpath` is resolved against the file's directory.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| {
            FathomError::ConfigError(format!("Failed to read config file {path:?}: {e}"))
        })?;

        let is_json = path.extension().is_some_and(|ext| ext == "json");
        let mut config = Self::parse(&contents, is_json)?;

        if !config.dbpath.as_os_str().is_empty() && config.dbpath.is_relative() {
            let base = path.parent().unwrap_or_else(|| Path::new("."));
            config.dbpath = base.join(&config.dbpath);
        }

        Ok(config)
    }

    /// Load config with priority: env vars > file > defaults
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let xdg = XdgDirs::new();
        Self::load_with_xdg(explicit, &xdg)
    }

    /// Load config with explicit XDG directories
    ///
    /// File resolution order:
    /// 1. `explicit` path (from the command line)
    /// 2. FATHOM_CONFIG env var
    /// 3. XDG config file (~/.config/fathom/config.toml)
    /// 4. ./fathom.toml
    /// 5. Defaults
    pub fn load_with_xdg(explicit: Option<&Path>, xdg: &XdgDirs) -> Result<Self> {
        let mut config = if let Some(path) = explicit {
            Self::from_file(path)?
        } else if let Ok(path) = env::var("FATHOM_CONFIG") {
            Self::from_file(path)?
        } else {
            let xdg_config = xdg.config_file();
            if xdg_config.exists() {
                Self::from_file(xdg_config)?
            } else if Path::new("fathom.toml").exists() {
                Self::from_file("fathom.toml")?
            } else {
                Self::default()
            }
        };

        if config.dbpath.as_os_str().is_empty() {
            config.dbpath = xdg.repos_dir();
        }

        config.merge_env();
        config.finalize()?;

        Ok(config)
    }

    /// Merge configuration with environment variables
    pub fn merge_env(&mut self) {
        if let Ok(host) = env::var("FATHOM_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = env::var("FATHOM_PORT") {
            if let Ok(p) = port.parse() {
                self.server.port = p;
            }
        }
        if let Ok(data_dir) = env::var("FATHOM_DATA_DIR") {
            self.dbpath = PathBuf::from(data_dir).join("repos");
        }
    }

    /// Apply repository defaults, merge global VCS configs and validate
    ///
    /// Safe to call more than once (e.g. after discovery added entries).
    pub fn finalize(&mut self) -> Result<()> {
        for repo in self.repos.values_mut() {
            repo.apply_defaults();
        }
        merge::merge_vcs_configs(&mut self.repos, &self.vcs_config);
        self.validate()
    }

    /// Pull repositories from every configured discovery source
    ///
    /// Manually configured repositories are never overwritten. Returns
    /// the number of repositories added.
    pub async fn discover_projects(&mut self) -> Result<usize> {
        let mut added = 0;
        for (name, sync) in &self.gitlab_sync {
            tracing::info!(source = %name, "Syncing in GitLab projects");
            let source = GitlabSource::new(sync.clone())?;
            let projects = source.projects().await?;
            added += merge::add_discovered_projects(
                &mut self.repos,
                projects,
                sync.repo_options.as_ref(),
            );
        }

        if added > 0 {
            self.finalize()?;
        }
        Ok(added)
    }

    /// Directory holding the working copy of repository `name`
    pub fn working_dir(&self, name: &str) -> PathBuf {
        self.dbpath.join(format!("vcs-{}", sanitize_name(name)))
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.max_concurrent_indexers == 0 {
            return Err(FathomError::ConfigError(
                "max-concurrent-indexers must be non-zero".to_string(),
            ));
        }

        if self.server.port == 0 {
            return Err(FathomError::ConfigError(
                "Server port must be non-zero".to_string(),
            ));
        }

        if !self.health_check_uri.starts_with('/') {
            return Err(FathomError::ConfigError(
                "health-check-uri must start with '/'".to_string(),
            ));
        }

        // The API owns everything below /api/v1; ':' and '*' are route captures
        let uri = &self.health_check_uri;
        if uri == API_PREFIX
            || uri.starts_with(&format!("{API_PREFIX}/"))
            || uri.contains([':', '*'])
        {
            return Err(FathomError::ConfigError(format!(
                "health-check-uri {uri} collides with an API route"
            )));
        }

        let mut dirs: HashMap<String, &str> = HashMap::new();
        for (name, repo) in &self.repos {
            if repo.url.trim().is_empty() {
                return Err(FathomError::ConfigError(format!(
                    "Repository {name} has no url"
                )));
            }

            if let Some(other) = dirs.insert(sanitize_name(name), name) {
                return Err(FathomError::ConfigError(format!(
                    "Repositories {other} and {name} map to the same working directory"
                )));
            }
        }

        Ok(())
    }

    /// Log configuration (redacting sensitive values)
    pub fn log_config(&self) {
        tracing::info!("Configuration loaded:");
        tracing::info!("  Title: {}", self.title);
        tracing::info!("  Data dir: {:?}", self.dbpath);
        tracing::info!("  Listen: {}:{}", self.server.host, self.server.port);
        tracing::info!(
            "  Max concurrent indexers: {}",
            self.max_concurrent_indexers
        );
        tracing::info!("  Health check: {}", self.health_check_uri);
        tracing::info!("  Repositories: {}", self.repos.len());
        tracing::info!("  Discovery sources: {}", self.gitlab_sync.len());
        tracing::info!(
            "  OAuth: {}",
            if self.gitlab_oauth.is_some() {
                "enabled"
            } else {
                "disabled"
            }
        );
    }
}

/// Reduce a repository name to a filesystem-safe directory component
fn sanitize_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect()
}
