//! Execution control
//!
//! - [`runner`]: launches one invocation under a wall-clock limit
//! - [`coordinator`]: drives a request through compile, run and cleanup

pub mod coordinator;
pub mod runner;

pub use coordinator::ExecutionCoordinator;
pub use runner::ProcessRunner;
