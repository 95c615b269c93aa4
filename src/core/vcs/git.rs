//! Git driver.
//!
//! Working copies are shallow (depth 1) and track a single ref. A pull
//! fetches that ref into `remotes/origin/<ref>` and hard-resets onto it,
//! so repeated pulls converge on the upstream tip.

use async_trait::async_trait;
use serde::Deserialize;
use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::process::Command;
use url::Url;

use super::VcsDriver;
use crate::core::error::{FathomError, Result};

/// Ref checked out when none is configured or detected
pub const DEFAULT_REF: &str = "master";

const HEAD_BRANCH_PREFIX: &str = "HEAD branch:";

#[derive(Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct GitSettings {
    #[serde(default)]
    detect_ref: bool,
    #[serde(default, rename = "ref")]
    git_ref: String,
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: String,
}

/// Finds the upstream's default branch
#[async_trait]
pub trait RefDetector: Send + Sync {
    async fn detect_ref(&self, dir: &Path) -> Option<String>;
}

/// Reads `HEAD branch:` from `git remote show origin`
pub struct RemoteHeadDetector;

#[async_trait]
impl RefDetector for RemoteHeadDetector {
    async fn detect_ref(&self, dir: &Path) -> Option<String> {
        let output = match run("git remote show", dir, &["remote", "show", "origin"]).await {
            Ok(output) => output,
            Err(e) => {
                tracing::warn!(
                    dir = %dir.display(),
                    error = %e,
                    "Could not fetch remote info, falling back to {}",
                    DEFAULT_REF
                );
                return None;
            }
        };

        let branch = parse_head_branch(&output);
        if branch.is_none() {
            tracing::warn!(
                dir = %dir.display(),
                "Could not determine target ref, falling back to {}",
                DEFAULT_REF
            );
        }
        branch
    }
}

/// Extract the branch name from `git remote show` output
pub fn parse_head_branch(output: &str) -> Option<String> {
    output
        .lines()
        .find_map(|line| line.trim_start().strip_prefix(HEAD_BRANCH_PREFIX))
        .map(str::trim)
        .filter(|branch| !branch.is_empty())
        .map(str::to_string)
}

pub struct GitDriver {
    settings: GitSettings,
    detector: Arc<dyn RefDetector>,
}

impl GitDriver {
    /// Build from the raw JSON VCS configuration, if any
    pub fn from_raw(raw: Option<&[u8]>) -> Result<Self> {
        let settings = match raw {
            Some(bytes) => serde_json::from_slice(bytes)?,
            None => GitSettings::default(),
        };
        Ok(Self {
            settings,
            detector: Arc::new(RemoteHeadDetector),
        })
    }

    pub fn with_detector(mut self, detector: Arc<dyn RefDetector>) -> Self {
        self.detector = detector;
        self
    }

    fn has_credentials(&self) -> bool {
        !self.settings.username.is_empty() && !self.settings.password.is_empty()
    }

    /// Ref to track: configured, then detected, then [`DEFAULT_REF`]
    pub async fn target_ref(&self, dir: &Path) -> String {
        if !self.settings.git_ref.is_empty() {
            return self.settings.git_ref.clone();
        }
        if self.settings.detect_ref {
            if let Some(detected) = self.detector.detect_ref(dir).await {
                return detected;
            }
        }
        DEFAULT_REF.to_string()
    }

    /// Credential file in the format `git credential-store` reads
    ///
    /// Written once, owner-readable only; an existing file is reused
    /// untouched.
    fn credential_file(&self, parent: &Path, dir_name: &str, remote: &str) -> Result<PathBuf> {
        let path = parent.join(format!(".{dir_name}-credentials"));
        if path.exists() {
            return Ok(path);
        }

        let mut url = Url::parse(remote)?;
        let invalid = |_| FathomError::ConfigError(format!("Cannot embed credentials in {remote}"));
        url.set_username(&self.settings.username).map_err(invalid)?;
        url.set_password(Some(&self.settings.password))
            .map_err(invalid)?;
        url.set_path("");
        url.set_query(None);
        url.set_fragment(None);
        let line = format!("{}\n", url.as_str().trim_end_matches('/'));

        let mut options = OpenOptions::new();
        options.write(true).create_new(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let mut file = options.open(&path)?;
        file.write_all(line.as_bytes())?;
        Ok(path)
    }
}

impl fmt::Debug for GitDriver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GitDriver")
            .field("detect_ref", &self.settings.detect_ref)
            .field("ref", &self.settings.git_ref)
            .field("credentials", &self.has_credentials())
            .finish()
    }
}

#[async_trait]
impl VcsDriver for GitDriver {
    async fn clone_repo(&self, dir: &Path, url: &str) -> Result<String> {
        let (parent, dir_name) = split_dir(dir)?;
        fs::create_dir_all(parent)?;

        let mut args = vec![
            "clone".to_string(),
            "--depth".to_string(),
            "1".to_string(),
            url.to_string(),
            dir_name.clone(),
        ];

        if self.has_credentials() {
            match self.credential_file(parent, &dir_name, url) {
                Ok(file) => {
                    args.push("--config".to_string());
                    args.push(format!("credential.helper=store --file {}", file.display()));
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to set up git credential helper");
                }
            }
        }

        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        run("git clone", parent, &args).await?;

        self.pull(dir).await
    }

    async fn pull(&self, dir: &Path) -> Result<String> {
        let target = self.target_ref(dir).await;

        // Fetch and reset failures leave the previous checkout in place
        let refspec = format!("+{target}:remotes/origin/{target}");
        if let Err(e) = run(
            "git fetch",
            dir,
            &[
                "fetch", "--prune", "--no-tags", "--depth", "1", "origin", &refspec,
            ],
        )
        .await
        {
            tracing::warn!(error = %e, "Continuing after failed fetch");
        }

        let tracking = format!("origin/{target}");
        if let Err(e) = run("git reset", dir, &["reset", "--hard", &tracking]).await {
            tracing::warn!(error = %e, "Continuing after failed reset");
        }

        self.head_rev(dir).await
    }

    async fn head_rev(&self, dir: &Path) -> Result<String> {
        let output = run("git rev-parse", dir, &["rev-parse", "HEAD"]).await?;
        Ok(output.trim().to_string())
    }

    fn special_files(&self) -> Vec<String> {
        vec![".git".to_string()]
    }
}

fn split_dir(dir: &Path) -> Result<(&Path, String)> {
    let name = dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| FathomError::ConfigError(format!("Invalid working directory {dir:?}")))?;
    let parent = dir.parent().unwrap_or_else(|| Path::new("."));
    Ok((parent, name))
}

/// Run git in `dir`, returning stdout; a non-zero exit is an error
/// carrying the combined output
async fn run(desc: &str, dir: &Path, args: &[&str]) -> Result<String> {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .env("GIT_TERMINAL_PROMPT", "0")
        .output()
        .await
        .map_err(|e| FathomError::VcsCommand {
            desc: desc.to_string(),
            dir: dir.display().to_string(),
            output: e.to_string(),
        })?;

    if !output.status.success() {
        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));
        return Err(FathomError::VcsCommand {
            desc: desc.to_string(),
            dir: dir.display().to_string(),
            output: combined.trim().to_string(),
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}
