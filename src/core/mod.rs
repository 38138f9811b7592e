//! Language-agnostic execution core types.
//!
//! Plans, invocations and process outcomes shared by the adapters, the
//! process runner and the coordinator.

pub mod types;
