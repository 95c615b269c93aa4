//! Session storage.
//!
//! Only the get/put contract matters to the rest of the server; the
//! in-memory store is what the binary uses.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use rand::RngCore;
use std::collections::{HashMap, HashSet};

/// How long a session (and the URLs it authorized) stays valid
pub fn session_lifetime() -> Duration {
    Duration::days(5)
}

/// Repository URLs a caller proved access to through OAuth
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizedUrlSet {
    urls: HashSet<String>,
    expires_at: DateTime<Utc>,
}

impl AuthorizedUrlSet {
    pub fn new(urls: impl IntoIterator<Item = String>, now: DateTime<Utc>) -> Self {
        Self {
            urls: urls.into_iter().collect(),
            expires_at: now + session_lifetime(),
        }
    }

    pub fn contains(&self, url: &str) -> bool {
        self.urls.contains(url)
    }

    pub fn urls(&self) -> &HashSet<String> {
        &self.urls
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Per-session state
#[derive(Debug, Clone, Default)]
pub struct SessionData {
    /// Provider of the authorization flow in progress
    pub oauth_provider: Option<String>,
    pub authorized_urls: Option<AuthorizedUrlSet>,
}

impl SessionData {
    /// Authorized URLs, unless absent or expired
    pub fn active_urls(&self, now: DateTime<Utc>) -> Option<&AuthorizedUrlSet> {
        self.authorized_urls
            .as_ref()
            .filter(|set| !set.is_expired(now))
    }
}

/// Session store contract
pub trait SessionStore: Send + Sync {
    fn get(&self, session_id: &str) -> Option<SessionData>;
    fn put(&self, session_id: &str, data: SessionData);
}

struct StoredSession {
    expires_at: DateTime<Utc>,
    data: SessionData,
}

/// Process-local session store
///
/// Sessions expire a fixed lifetime after creation; expired sessions
/// read as absent and are swept on the next write.
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<String, StoredSession>>,
    lifetime: Duration,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::with_lifetime(session_lifetime())
    }

    pub fn with_lifetime(lifetime: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            lifetime,
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore for MemorySessionStore {
    fn get(&self, session_id: &str) -> Option<SessionData> {
        let sessions = self.sessions.read();
        sessions
            .get(session_id)
            .filter(|s| s.expires_at > Utc::now())
            .map(|s| s.data.clone())
    }

    fn put(&self, session_id: &str, data: SessionData) {
        let now = Utc::now();
        let mut sessions = self.sessions.write();
        sessions.retain(|_, s| s.expires_at > now);

        let expires_at = sessions
            .get(session_id)
            .map(|s| s.expires_at)
            .unwrap_or(now + self.lifetime);
        sessions.insert(session_id.to_string(), StoredSession { expires_at, data });
    }
}

/// Random, URL-safe session identifier
pub fn new_session_id() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}
