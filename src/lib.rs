//! Fathom - multi-repository code search
//!
//! Keeps working copies of many version-controlled repositories in sync
//! with their upstreams and answers regular-expression searches across
//! any subset of them concurrently.
//!
//! # Architecture
//!
//! The codebase is organized into three main modules:
//!
//! - **core**: Domain logic (protocol-agnostic)
//!   - config, error, xdg
//!   - vcs (drivers), sync (coordination and background updates)
//!   - search (working-copy searcher, fan-out orchestration)
//!   - access, auth (access keys, sessions, OAuth)
//!   - discovery (GitLab project listing)
//!   - services (unified service container)
//!
//! - **http**: REST API adapter (depends on core)
//!   - handlers, params, middleware
//!
//! - **cli**: Command line adapter (depends on core and http)
//!   - serve, check-config, sync

// Core domain logic (protocol-agnostic)
pub mod core;

// HTTP REST adapter
pub mod http;

// Command line adapter
pub mod cli;

// Re-export commonly used types for convenience
pub use core::config::Config;
pub use core::error::{FathomError, Result};
pub use core::registry::{Registry, Repository};
pub use core::services::Services;
