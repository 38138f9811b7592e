//! Observability
//!
//! Structured audit events for every execution.

pub mod audit;
