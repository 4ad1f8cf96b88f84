//! Application configuration

use crate::logging::LogFormat;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// An environment variable held an unusable value
    #[error("invalid value for {var}: {reason}")]
    InvalidVar { var: &'static str, reason: String },
}

/// Process-level settings shared by the binaries
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Application name
    pub app_name: String,
    /// Environment (development, production, ...)
    pub environment: String,
    /// Log line format
    pub log_format: LogFormat,
    /// Default tracing filter when `RUST_LOG` is unset
    pub log_filter: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            app_name: "invest-reporter".to_string(),
            environment: "development".to_string(),
            log_format: LogFormat::Text,
            log_filter: "warn,invest_stock=info,invest_reporter=info".to_string(),
        }
    }
}

impl Config {
    /// Load from process environment (`APP_ENV`, `LOG_FORMAT`, `LOG_FILTER`)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load using an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(env) = lookup("APP_ENV").filter(|v| !v.trim().is_empty()) {
            config.environment = env.trim().to_string();
        }

        if let Some(format) = lookup("LOG_FORMAT") {
            config.log_format = format.parse().map_err(|reason| ConfigError::InvalidVar {
                var: "LOG_FORMAT",
                reason,
            })?;
        }

        if let Some(filter) = lookup("LOG_FILTER").filter(|v| !v.trim().is_empty()) {
            config.log_filter = filter;
        }

        Ok(config)
    }
}
