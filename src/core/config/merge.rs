//! Building the repository set from static and discovered configuration.
//!
//! Manual entries always win over discovered ones, and global per-VCS
//! defaults only fill fields a repository leaves unset.

use std::collections::BTreeMap;

use super::repo::{RepoConfig, VcsConfigBlob};
use crate::core::discovery::DiscoveredProject;
use crate::core::error::Result;

/// Fill fields absent from `repo` with values from `global`
///
/// Fields present at the repository level are kept unchanged, even when
/// their value is `null`.
pub fn merge_vcs_config(repo: Option<&VcsConfigBlob>, global: &VcsConfigBlob) -> VcsConfigBlob {
    let mut merged = repo.cloned().unwrap_or_default();
    let values = merged.values_mut();
    for (name, value) in global.values() {
        if !values.contains_key(name) {
            values.insert(name.clone(), value.clone());
        }
    }
    merged
}

/// Byte-level variant of [`merge_vcs_config`]
///
/// Both inputs must be JSON objects; an empty repository blob counts as
/// absent.
pub fn merge_vcs_config_bytes(repo: &[u8], global: &[u8]) -> Result<Vec<u8>> {
    let global = VcsConfigBlob::from_bytes(global)?;
    let repo = if repo.is_empty() {
        None
    } else {
        Some(VcsConfigBlob::from_bytes(repo)?)
    };
    merge_vcs_config(repo.as_ref(), &global).to_bytes()
}

/// Merge the global `vcs-config` defaults into every repository of that VCS
pub fn merge_vcs_configs(
    repos: &mut BTreeMap<String, RepoConfig>,
    globals: &BTreeMap<String, VcsConfigBlob>,
) {
    if globals.is_empty() {
        return;
    }

    for repo in repos.values_mut() {
        let Some(global) = globals.get(&repo.vcs) else {
            continue;
        };
        repo.vcs_config = Some(merge_vcs_config(repo.vcs_config.as_ref(), global));
    }
}

/// Add discovered projects that do not collide with an existing entry
///
/// New entries start from `template` (or the defaults) with the
/// discovered URL. Returns the number of repositories added.
pub fn add_discovered_projects(
    repos: &mut BTreeMap<String, RepoConfig>,
    projects: Vec<DiscoveredProject>,
    template: Option<&RepoConfig>,
) -> usize {
    let mut added = 0;
    for project in projects {
        if repos.contains_key(&project.name) {
            tracing::info!(
                repo = %project.name,
                "Discovered repo already has a configured entry, skipping"
            );
            continue;
        }

        let mut repo = template.cloned().unwrap_or_default();
        repo.url = project.url;
        repos.insert(project.name, repo);
        added += 1;
    }
    added
}
