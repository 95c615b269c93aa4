//! Version-control drivers.
//!
//! A driver knows how to bring a working copy into existence and keep
//! it current. Drivers are looked up by VCS kind (`git`) and built from
//! the repository's opaque VCS configuration.

mod git;

pub use git::{parse_head_branch, GitDriver, RefDetector, RemoteHeadDetector, DEFAULT_REF};

use async_trait::async_trait;
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use crate::core::config::VcsConfigBlob;
use crate::core::error::{FathomError, Result};

/// Capability set every VCS backend provides
#[async_trait]
pub trait VcsDriver: Send + Sync {
    /// Create the working copy at `dir` and check out the target ref
    async fn clone_repo(&self, dir: &Path, url: &str) -> Result<String>;

    /// Bring an existing working copy up to date
    async fn pull(&self, dir: &Path) -> Result<String>;

    /// Revision currently checked out
    async fn head_rev(&self, dir: &Path) -> Result<String>;

    /// Top-level VCS metadata entries never searched
    fn special_files(&self) -> Vec<String>;
}

type DriverFactory = fn(Option<&[u8]>) -> Result<Arc<dyn VcsDriver>>;

static DRIVERS: Lazy<HashMap<&'static str, DriverFactory>> = Lazy::new(|| {
    let mut drivers: HashMap<&'static str, DriverFactory> = HashMap::new();
    drivers.insert("git", |raw| Ok(Arc::new(GitDriver::from_raw(raw)?)));
    drivers
});

/// Build the driver registered for `kind`
pub fn new_driver(kind: &str, config: Option<&VcsConfigBlob>) -> Result<Arc<dyn VcsDriver>> {
    let factory = DRIVERS
        .get(kind)
        .ok_or_else(|| FathomError::UnknownVcs(kind.to_string()))?;

    let raw = config.map(VcsConfigBlob::to_bytes).transpose()?;
    factory(raw.as_deref())
}

/// Registered VCS kinds, sorted
pub fn driver_kinds() -> Vec<&'static str> {
    let mut kinds: Vec<_> = DRIVERS.keys().copied().collect();
    kinds.sort_unstable();
    kinds
}
