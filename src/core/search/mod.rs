//! Searching repositories.
//!
//! The [`Searcher`] trait is the per-repository search capability; the
//! orchestrator fans a query out over many of them. `grep` provides a
//! searcher that scans a repository's working copy directly.

mod grep;
mod orchestrator;

pub use grep::WorkingCopySearcher;
pub use orchestrator::{search_all, SearchAggregate};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::error::Result;

/// Context lines returned around a match when the request names none
pub const DEFAULT_LINES_OF_CONTEXT: usize = 2;

/// Upper bound for requested context lines
pub const MAX_LINES_OF_CONTEXT: usize = 20;

/// Options accompanying a query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchOptions {
    pub ignore_case: bool,
    /// Treat the query as literal text rather than a regular expression
    pub literal: bool,
    /// Only search files whose relative path matches (empty = all)
    pub file_regexp: String,
    /// Skip files whose relative path matches (empty = none)
    pub exclude_file_regexp: String,
    pub lines_of_context: usize,
    /// Number of matching files to skip
    pub offset: usize,
    /// Maximum number of matching files to return (0 = no limit)
    pub limit: usize,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            ignore_case: false,
            literal: false,
            file_regexp: String::new(),
            exclude_file_regexp: String::new(),
            lines_of_context: DEFAULT_LINES_OF_CONTEXT,
            offset: 0,
            limit: 0,
        }
    }
}

/// A matching line with its surrounding context
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LineMatch {
    pub line: String,
    /// 1-based
    pub line_number: usize,
    pub before: Vec<String>,
    pub after: Vec<String>,
}

/// All matches within one file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct FileMatch {
    pub filename: String,
    pub matches: Vec<LineMatch>,
}

/// Result of searching one repository
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SearchResponse {
    pub matches: Vec<FileMatch>,
    /// Matching files before offset/limit paging
    pub files_with_match: usize,
    pub files_opened: usize,
    pub duration_ms: u64,
    pub revision: String,
}

/// A file left out of search, and why
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ExcludedFile {
    pub filename: String,
    pub reason: String,
}

/// Per-repository search capability
#[async_trait]
pub trait Searcher: Send + Sync {
    async fn search(&self, query: &str, options: &SearchOptions) -> Result<SearchResponse>;

    /// Files present in the working copy that are never searched
    async fn excluded_files(&self) -> Result<Vec<ExcludedFile>>;

    /// Called after the working copy was synchronized to `revision`
    async fn refresh(&self, _revision: &str) {}
}
