//! Tools agents can call, and the executor that runs them.

pub mod base;
pub mod builtin;
pub mod executor;
pub mod registry;

pub use base::{FnTool, Tool, ToolError};
pub use executor::ToolExecutor;
pub use registry::ToolRegistry;
