//! Core abstractions for invest-reporter
//!
//! This crate defines the tool-invocation seam used by the report pipeline:
//! the [`Tool`] trait implemented by the data-gathering tools, the
//! [`ToolRegistry`] an orchestration layer dispatches through, and the shared
//! [`Error`] type raised for contract violations at that boundary.

pub mod error;
pub mod registry;
pub mod tool;

pub use error::{Error, Result};
pub use registry::ToolRegistry;
pub use tool::Tool;
