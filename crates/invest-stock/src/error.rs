//! Errors raised below the per-source boundary
//!
//! Extractors convert these into [`crate::sources::ExtractError`] before they
//! reach a report; only configuration problems escape to callers.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StockError {
    /// Upstream answered with an unusable status or payload
    #[error("API error: {0}")]
    ApiError(String),

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// RSS body that does not deserialize as a channel
    #[error("Invalid feed: {0}")]
    InvalidFeed(String),

    #[error("Yahoo Finance error: {0}")]
    YahooFinanceError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

pub type Result<T> = std::result::Result<T, StockError>;

impl From<yahoo_finance_api::YahooError> for StockError {
    fn from(err: yahoo_finance_api::YahooError) -> Self {
        StockError::YahooFinanceError(err.to_string())
    }
}

impl From<StockError> for invest_core::Error {
    fn from(err: StockError) -> Self {
        invest_core::Error::Generic(err.to_string())
    }
}
