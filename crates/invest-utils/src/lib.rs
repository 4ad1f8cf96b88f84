//! Shared utilities for invest-reporter
//!
//! Logging setup and the application-level configuration used by the
//! binaries in this workspace.

pub mod config;
pub mod logging;

pub use config::{Config, ConfigError};
pub use logging::{LogFormat, init_tracing_with};
