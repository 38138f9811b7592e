//! Toolchain adapters.
//!
//! The coordinator stays language-agnostic. Adapters decide the source file
//! name, the optional compile step and the run step for each language.

pub mod adapter;
pub mod languages;
pub mod registry;

pub use adapter::ToolchainAdapter;
pub use registry::adapter_for;
