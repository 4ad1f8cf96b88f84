//! Error types for invest-core

use thiserror::Error;

/// Result type alias for tool invocations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised at the tool-invocation boundary.
///
/// Data-availability problems (a source being down, a page missing a field)
/// are never reported through this type; tools fold them into their output.
#[derive(Error, Debug)]
pub enum Error {
    /// Tool input did not match the declared schema
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// No tool registered under the requested name
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    /// A tool failed to produce its output
    #[error("Tool '{tool}' failed: {message}")]
    ToolFailed { tool: String, message: String },

    /// Generic error message
    #[error("{0}")]
    Generic(String),
}

impl Error {
    /// Build a [`Error::ToolFailed`] for the named tool
    pub fn tool_failed(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ToolFailed {
            tool: tool.into(),
            message: message.into(),
        }
    }
}
