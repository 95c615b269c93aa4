//! Searcher that scans a repository's working copy on every query.
//!
//! Walks the checkout in file-name order, skipping VCS metadata and
//! (optionally) dot files, and runs the query regex line by line.
//! Files over the size limit and binary files are skipped and
//! reported through `excluded_files`.

use async_trait::async_trait;
use parking_lot::RwLock;
use regex::{Regex, RegexBuilder};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use walkdir::{DirEntry, WalkDir};

use super::{ExcludedFile, FileMatch, LineMatch, SearchOptions, SearchResponse, Searcher};
use crate::core::error::{FathomError, Result};

/// Bytes inspected when deciding whether a file is binary
const BINARY_SNIFF_LEN: usize = 8000;

const REASON_DOT_FILE: &str = "Dot files are excluded";
const REASON_TOO_LARGE: &str = "File size exceeds maximum";
const REASON_BINARY: &str = "Binary file";

/// Grep over a working copy
#[derive(Clone)]
pub struct WorkingCopySearcher {
    inner: Arc<Inner>,
}

struct Inner {
    root: PathBuf,
    /// Top-level names never searched nor reported (e.g. `.git`)
    special_files: Vec<String>,
    exclude_dot_files: bool,
    max_file_size_bytes: u64,
    revision: RwLock<String>,
}

/// Compiled form of a query plus its path filters
struct Matcher {
    query: Regex,
    include: Option<Regex>,
    exclude: Option<Regex>,
}

impl Matcher {
    fn new(query: &str, options: &SearchOptions) -> Result<Self> {
        if query.is_empty() {
            return Err(FathomError::InvalidQuery("Query is empty".to_string()));
        }

        let pattern = if options.literal {
            regex::escape(query)
        } else {
            query.to_string()
        };
        let query = RegexBuilder::new(&pattern)
            .case_insensitive(options.ignore_case)
            .build()
            .map_err(|e| FathomError::InvalidQuery(format!("Invalid query: {e}")))?;

        Ok(Self {
            query,
            include: path_regex(&options.file_regexp)?,
            exclude: path_regex(&options.exclude_file_regexp)?,
        })
    }

    fn wants_path(&self, path: &str) -> bool {
        self.include.as_ref().map_or(true, |re| re.is_match(path))
            && !self.exclude.as_ref().is_some_and(|re| re.is_match(path))
    }
}

fn path_regex(pattern: &str) -> Result<Option<Regex>> {
    if pattern.is_empty() {
        return Ok(None);
    }
    Regex::new(pattern)
        .map(Some)
        .map_err(|e| FathomError::InvalidQuery(format!("Invalid file pattern '{pattern}': {e}")))
}

/// Why a file would be left out of search, if it is
enum Skip {
    DotFile,
    TooLarge,
    Binary,
}

impl Skip {
    fn reason(&self) -> &'static str {
        match self {
            Skip::DotFile => REASON_DOT_FILE,
            Skip::TooLarge => REASON_TOO_LARGE,
            Skip::Binary => REASON_BINARY,
        }
    }
}

impl WorkingCopySearcher {
    pub fn new(
        root: impl Into<PathBuf>,
        special_files: Vec<String>,
        exclude_dot_files: bool,
        max_file_size_bytes: u64,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                root: root.into(),
                special_files,
                exclude_dot_files,
                max_file_size_bytes,
                revision: RwLock::new(String::new()),
            }),
        }
    }

    pub fn root(&self) -> &Path {
        &self.inner.root
    }

    /// Revision of the last synchronization
    pub fn revision(&self) -> String {
        self.inner.revision.read().clone()
    }
}

#[async_trait]
impl Searcher for WorkingCopySearcher {
    async fn search(&self, query: &str, options: &SearchOptions) -> Result<SearchResponse> {
        let matcher = Matcher::new(query, options)?;
        let inner = Arc::clone(&self.inner);
        let options = options.clone();

        tokio::task::spawn_blocking(move || inner.search(&matcher, &options))
            .await
            .map_err(|e| FathomError::SearchFailed(format!("Search task failed: {e}")))?
    }

    async fn excluded_files(&self) -> Result<Vec<ExcludedFile>> {
        let inner = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || inner.excluded_files())
            .await
            .map_err(|e| FathomError::SearchFailed(format!("Listing task failed: {e}")))?
    }

    async fn refresh(&self, revision: &str) {
        *self.inner.revision.write() = revision.to_string();
    }
}

impl Inner {
    fn ensure_root(&self) -> Result<()> {
        if self.root.is_dir() {
            Ok(())
        } else {
            Err(FathomError::SearchFailed(format!(
                "Working copy {:?} is missing",
                self.root
            )))
        }
    }

    /// Every regular file under the root, in a stable order, paired
    /// with its path relative to the root
    fn files(&self) -> impl Iterator<Item = (DirEntry, String)> + '_ {
        WalkDir::new(&self.root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| self.should_descend(e))
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    tracing::warn!("Walk error: {}", e);
                    None
                }
            })
            .filter(|entry| entry.file_type().is_file())
            .filter_map(|entry| {
                let rel = relative_path(&self.root, entry.path())?;
                Some((entry, rel))
            })
    }

    fn should_descend(&self, entry: &DirEntry) -> bool {
        if entry.depth() == 0 {
            return true;
        }
        let Some(name) = entry.file_name().to_str() else {
            return false;
        };
        if entry.depth() == 1 && self.special_files.iter().any(|s| s == name) {
            return false;
        }
        // Dot directories are pruned; dot files are reported as excluded
        !(self.exclude_dot_files && name.starts_with('.') && entry.file_type().is_dir())
    }

    /// Reason a file is skipped, judged from its name and metadata
    fn skip_reason(&self, entry: &DirEntry) -> Option<Skip> {
        if self.exclude_dot_files && entry.file_name().to_string_lossy().starts_with('.') {
            return Some(Skip::DotFile);
        }
        if let Ok(metadata) = entry.metadata() {
            if metadata.len() > self.max_file_size_bytes {
                return Some(Skip::TooLarge);
            }
        }
        None
    }

    fn search(&self, matcher: &Matcher, options: &SearchOptions) -> Result<SearchResponse> {
        self.ensure_root()?;
        let started = Instant::now();

        let mut response = SearchResponse {
            revision: self.revision.read().clone(),
            ..Default::default()
        };

        for (entry, rel) in self.files() {
            if self.skip_reason(&entry).is_some() || !matcher.wants_path(&rel) {
                continue;
            }

            let bytes = match fs::read(entry.path()) {
                Ok(bytes) => bytes,
                Err(e) => {
                    tracing::debug!("Failed to read {:?}: {}", entry.path(), e);
                    continue;
                }
            };
            response.files_opened += 1;

            if is_binary(&bytes) {
                continue;
            }

            let matches = match_lines(
                &String::from_utf8_lossy(&bytes),
                &matcher.query,
                options.lines_of_context,
            );
            if matches.is_empty() {
                continue;
            }

            response.files_with_match += 1;
            let in_page = response.files_with_match > options.offset
                && (options.limit == 0 || response.matches.len() < options.limit);
            if in_page {
                response.matches.push(FileMatch {
                    filename: rel,
                    matches,
                });
            }
        }

        response.duration_ms = started.elapsed().as_millis() as u64;
        Ok(response)
    }

    fn excluded_files(&self) -> Result<Vec<ExcludedFile>> {
        self.ensure_root()?;

        let mut excluded = Vec::new();
        for (entry, rel) in self.files() {
            let skip = match self.skip_reason(&entry) {
                Some(skip) => Some(skip),
                None => fs::read(entry.path())
                    .ok()
                    .filter(|bytes| is_binary(bytes))
                    .map(|_| Skip::Binary),
            };
            if let Some(skip) = skip {
                excluded.push(ExcludedFile {
                    filename: rel,
                    reason: skip.reason().to_string(),
                });
            }
        }
        Ok(excluded)
    }
}

fn relative_path(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let parts: Vec<_> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect();
    Some(parts.join("/"))
}

fn is_binary(bytes: &[u8]) -> bool {
    bytes[..bytes.len().min(BINARY_SNIFF_LEN)].contains(&0)
}

fn match_lines(content: &str, query: &Regex, context: usize) -> Vec<LineMatch> {
    let lines: Vec<&str> = content.lines().collect();
    let owned = |slice: &[&str]| slice.iter().map(|l| l.to_string()).collect::<Vec<_>>();

    lines
        .iter()
        .enumerate()
        .filter(|(_, line)| query.is_match(line))
        .map(|(i, line)| LineMatch {
            line: line.to_string(),
            line_number: i + 1,
            before: owned(&lines[i.saturating_sub(context)..i]),
            after: owned(&lines[i + 1..(i + 1 + context).min(lines.len())]),
        })
        .collect()
}
