//! algosync-runner: compile-and-run service for the AlgoSync practice tracker
//!
//! Accepts Java, C++, JavaScript and Python submissions, runs each one in a
//! private workspace under wall-clock limits, and answers with the program's
//! output.
//!
//! # Architecture
//!
//! ## Configuration ([`config`])
//! - [`config::types`]: languages, requests, results and the error enum
//! - [`config::runner`]: runner and server configuration loading
//! - [`config::validator`]: startup validation
//!
//! ## Core Types ([`core`])
//! - [`core::types`]: invocations, command plans, process outputs
//!
//! ## Kernel Primitives ([`kernel`])
//! - [`kernel::signal`]: process-group termination and exit probing
//!
//! ## Toolchain Adapters ([`judge`])
//! - [`judge::adapter`]: the adapter contract
//! - [`judge::languages`]: one adapter per language
//! - [`judge::registry`]: adapter lookup and toolchain probing
//!
//! ## Execution Control ([`exec`])
//! - [`exec::runner`]: one subprocess under a timeout
//! - [`exec::coordinator`]: request lifecycle from workspace to result
//!
//! ## Safety ([`safety`])
//! - [`safety::workspace`]: per-request directories
//! - [`safety::safe_cleanup`]: symlink-safe removal
//!
//! ## Observability ([`observability`])
//! - [`observability::audit`]: structured execution events
//!
//! ## HTTP ([`http`])
//! - [`http::routes`]: `/run-*`, `/api/execute`, health
//! - [`http::state`]: shared coordinator and concurrency cap
//! - [`http::error`]: error to response mapping
//!
//! # Limits
//!
//! Isolation is a private directory, a dedicated process group and a
//! timeout. There are no namespaces, cgroups or syscall filters; deploy
//! behind a container boundary.

// Configuration
pub mod config;

// Shared types
pub mod core;

// Kernel Primitives
pub mod kernel;

// Toolchain adapters
pub mod judge;

// Execution Control
pub mod exec;

// Safety & Cleanup
pub mod safety;

// Observability
pub mod observability;

// HTTP surface
pub mod http;

// Utilities
pub mod utils;

// CLI entry point
pub mod cli;

pub use config::types::{
    CompatResponse, ExecutionRequest, ExecutionResult, FailureStage, Language, Result, RunnerError,
};
pub use exec::coordinator::ExecutionCoordinator;
