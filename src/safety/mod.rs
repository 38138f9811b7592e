//! Workspace safety
//!
//! - [`workspace`]: per-request private directories
//! - [`safe_cleanup`]: symlink-safe removal of those directories

pub mod safe_cleanup;
pub mod workspace;
