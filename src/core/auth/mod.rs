//! Session-scoped authorization state.
//!
//! - **session**: session store contract and the in-memory store
//! - **oauth**: OAuth2 authorization-code flow against the project host

pub mod oauth;
pub mod session;

pub use oauth::{new_state_token, verify_state, OAuthConfig, OAuthProvider};
pub use session::{
    new_session_id, session_lifetime, AuthorizedUrlSet, MemorySessionStore, SessionData,
    SessionStore,
};
