//! XDG Base Directory Support
//!
//! Resolves where Fathom looks for its configuration file and where
//! it keeps repository working copies when the configuration does not
//! name a `dbpath`.

use std::env;
use std::fs;
use std::path::PathBuf;

/// XDG directory structure for Fathom
#[derive(Debug, Clone)]
pub struct XdgDirs {
    pub config_dir: PathBuf,
    pub data_dir: PathBuf,
}

impl XdgDirs {
    /// Create new XDG directory structure with proper resolution order
    ///
    /// Priority order (highest to lowest):
    /// 1. Explicit FATHOM_* env vars
    /// 2. XDG_* environment variables
    /// 3. XDG defaults (~/.config, ~/.local/share)
    pub fn new() -> Self {
        Self {
            config_dir: Self::resolve_config_dir(),
            data_dir: Self::resolve_data_dir(),
        }
    }

    fn resolve_config_dir() -> PathBuf {
        if let Ok(dir) = env::var("FATHOM_CONFIG_DIR") {
            return PathBuf::from(dir);
        }

        if let Ok(xdg) = env::var("XDG_CONFIG_HOME") {
            return PathBuf::from(xdg).join("fathom");
        }

        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".config")
            .join("fathom")
    }

    fn resolve_data_dir() -> PathBuf {
        if let Ok(dir) = env::var("FATHOM_DATA_DIR") {
            return PathBuf::from(dir);
        }

        if let Ok(xdg) = env::var("XDG_DATA_HOME") {
            return PathBuf::from(xdg).join("fathom");
        }

        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".local")
            .join("share")
            .join("fathom")
    }

    /// Get config file path
    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join("config.toml")
    }

    /// Default root for repository working copies
    pub fn repos_dir(&self) -> PathBuf {
        self.data_dir.join("repos")
    }

    /// Create the data directories if they don't exist
    pub fn ensure_dirs_exist(&self) -> std::io::Result<()> {
        fs::create_dir_all(self.repos_dir())
    }

    /// Log the resolved XDG paths
    pub fn log_paths(&self) {
        tracing::debug!("XDG directories resolved:");
        tracing::debug!("  Config: {:?}", self.config_dir);
        tracing::debug!("  Data: {:?}", self.data_dir);
        tracing::debug!("  Config file: {:?}", self.config_file());
    }
}

impl Default for XdgDirs {
    fn default() -> Self {
        Self::new()
    }
}
