//! Kernel primitives
//!
//! - [`signal`]: process-group termination and exit probing

pub mod signal;
