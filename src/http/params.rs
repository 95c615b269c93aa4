//! Query-string parsing for the search API.
//!
//! Malformed values never fail a request: each parser falls back to a
//! default instead.

use serde::Deserialize;

use crate::core::access::RepoSelection;
use crate::core::search::{SearchOptions, DEFAULT_LINES_OF_CONTEXT, MAX_LINES_OF_CONTEXT};

/// Raw `/api/v1/search` parameters
#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: String,
    #[serde(default)]
    pub repos: String,
    #[serde(default)]
    pub files: String,
    #[serde(default, rename = "excludeFiles")]
    pub exclude_files: String,
    #[serde(default)]
    pub i: String,
    #[serde(default)]
    pub literal: String,
    #[serde(default)]
    pub ctx: String,
    #[serde(default)]
    pub rng: String,
    #[serde(default)]
    pub stats: String,
}

impl SearchParams {
    pub fn selection(&self) -> RepoSelection {
        RepoSelection::parse(&self.repos)
    }

    pub fn wants_stats(&self) -> bool {
        parse_as_bool(&self.stats)
    }

    pub fn options(&self) -> SearchOptions {
        let (offset, limit) = parse_range(&self.rng);
        SearchOptions {
            ignore_case: parse_as_bool(&self.i),
            literal: parse_as_bool(&self.literal),
            file_regexp: self.files.clone(),
            exclude_file_regexp: self.exclude_files.clone(),
            lines_of_context: parse_context(&self.ctx),
            offset,
            limit,
        }
    }
}

/// `repos` parameter shared by several endpoints
#[derive(Debug, Default, Deserialize)]
pub struct ReposParam {
    #[serde(default)]
    pub repos: String,
}

/// `repo` parameter of `/api/v1/excludes`
#[derive(Debug, Default, Deserialize)]
pub struct RepoParam {
    #[serde(default)]
    pub repo: String,
}

/// Parameters the OAuth provider sends back
#[derive(Debug, Default, Deserialize)]
pub struct OAuthCallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
}

/// "true", "1" and "fosho" (any case) are true; anything else is false
pub fn parse_as_bool(value: &str) -> bool {
    let value = value.to_lowercase();
    value == "true" || value == "1" || value == "fosho"
}

/// Bit width of `ctx`; wider values are unparsable
const CONTEXT_BITS: u32 = 54;

/// Unsigned decimal of at most `bits` bits: ASCII digits only, no sign
fn parse_uint(value: &str, bits: u32) -> Option<u64> {
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    value
        .parse::<u64>()
        .ok()
        .filter(|n| bits >= u64::BITS || n >> bits == 0)
}

/// `"<offset>:<limit>"`; a missing colon or an unparsable half is 0
pub fn parse_range(value: &str) -> (usize, usize) {
    let Some((offset, limit)) = value.split_once(':') else {
        return (0, 0);
    };
    let half = |s: &str| {
        parse_uint(s, u64::BITS)
            .and_then(|n| usize::try_from(n).ok())
            .unwrap_or(0)
    };
    (half(offset), half(limit))
}

/// Lines of context, clamped to the maximum; unparsable means default
pub fn parse_context(value: &str) -> usize {
    parse_uint(value, CONTEXT_BITS)
        .map(|n| n.min(MAX_LINES_OF_CONTEXT as u64) as usize)
        .unwrap_or(DEFAULT_LINES_OF_CONTEXT)
}
