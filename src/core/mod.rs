//! Core domain logic (protocol-agnostic)
//!
//! This module contains all business logic that is independent
//! of transport protocols (HTTP, CLI).
//!
//! # Architecture
//!
//! - **config**: Configuration loading (TOML/JSON + environment) and merging
//! - **error**: Error types and Result alias
//! - **xdg**: XDG directory handling
//! - **registry**: Immutable set of served repositories
//! - **access**: Per-request repository authorization
//! - **search**: Searcher capability and concurrent fan-out
//! - **vcs**: Version-control drivers (git)
//! - **sync**: Per-repository synchronization and update workers
//! - **discovery**: Repository discovery from GitLab
//! - **auth**: Sessions and the OAuth flow
//! - **services**: Unified service container

pub mod access;
pub mod auth;
pub mod config;
pub mod discovery;
pub mod error;
pub mod registry;
pub mod search;
pub mod services;
pub mod sync;
pub mod vcs;
pub mod xdg;

// Re-export key types for convenience
pub use config::Config;
pub use error::{FathomError, Result};
pub use registry::{Registry, Repository};
pub use services::Services;
