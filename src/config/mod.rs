//! Configuration
//!
//! Shared types, runner/server settings and startup validation.

pub mod runner;
pub mod types;
pub mod validator;
