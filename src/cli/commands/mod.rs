//! CLI command implementations
//!
//! Each command module handles argument parsing and execution for a specific CLI command.

pub mod check_config;
pub mod serve;
pub mod sync;

// Re-export argument types for use in mod.rs
pub use check_config::CheckConfigArgs;
pub use serve::ServeArgs;
pub use sync::SyncArgs;
