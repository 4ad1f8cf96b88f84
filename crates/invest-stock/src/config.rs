//! Configuration for fundamentals aggregation and news retrieval

use crate::error::{Result, StockError};
use crate::fundamentals::Metric;
use crate::http;
use crate::news;
use crate::retry::RetryPolicy;
use crate::sources::{FundamentusSource, Investidor10Source, StatusInvestSource, YahooMarketData};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// A fundamentals provider that can be enabled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Yahoo Finance market data (info + price history)
    YFinance,
    Fundamentus,
    StatusInvest,
    Investidor10,
}

impl SourceKind {
    pub const ALL: [SourceKind; 4] = [
        SourceKind::YFinance,
        SourceKind::Fundamentus,
        SourceKind::StatusInvest,
        SourceKind::Investidor10,
    ];

    /// Name used as the report key
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::YFinance => "yfinance",
            SourceKind::Fundamentus => "fundamentus",
            SourceKind::StatusInvest => "statusinvest",
            SourceKind::Investidor10 => "investidor10",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceKind {
    type Err = StockError;

    fn from_str(s: &str) -> Result<Self> {
        SourceKind::ALL
            .iter()
            .find(|k| k.as_str().eq_ignore_ascii_case(s.trim()))
            .copied()
            .ok_or_else(|| StockError::ConfigError(format!("unknown source '{s}'")))
    }
}

/// Defaults applied to news searches
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsDefaults {
    pub language: String,
    pub region: String,
    /// Lookback window in days
    pub days: u32,
    pub max_results: usize,
}

impl Default for NewsDefaults {
    fn default() -> Self {
        Self {
            language: news::DEFAULT_LANGUAGE.to_string(),
            region: news::DEFAULT_REGION.to_string(),
            days: news::DEFAULT_DAYS,
            max_results: news::DEFAULT_MAX_RESULTS,
        }
    }
}

/// Base URLs of every external endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Endpoints {
    pub yahoo: String,
    pub fundamentus: String,
    pub statusinvest: String,
    pub investidor10: String,
    pub news: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            yahoo: YahooMarketData::DEFAULT_BASE_URL.to_string(),
            fundamentus: FundamentusSource::DEFAULT_BASE_URL.to_string(),
            statusinvest: StatusInvestSource::DEFAULT_BASE_URL.to_string(),
            investidor10: Investidor10Source::DEFAULT_BASE_URL.to_string(),
            news: news::DEFAULT_BASE_URL.to_string(),
        }
    }
}

/// Configuration for the reporter tools
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReporterConfig {
    /// Enabled sources in merge priority order
    pub sources: Vec<SourceKind>,

    /// Price-history period used when a request names none
    pub default_period: String,

    /// Sources compared for discrepancies
    pub discrepancy_pair: (SourceKind, SourceKind),

    /// Numeric metrics compared for discrepancies
    pub discrepancy_metrics: Vec<Metric>,

    /// Per-request HTTP timeout
    pub request_timeout: Duration,

    /// Attempts for the market-data history call
    pub max_retries: u32,

    /// Linear backoff step between those attempts
    pub retry_backoff_step: Duration,

    pub news: NewsDefaults,

    pub endpoints: Endpoints,
}

impl Default for ReporterConfig {
    fn default() -> Self {
        Self {
            sources: SourceKind::ALL.to_vec(),
            default_period: "1y".to_string(),
            discrepancy_pair: (SourceKind::YFinance, SourceKind::Fundamentus),
            discrepancy_metrics: vec![
                Metric::TrailingPe,
                Metric::PriceToBook,
                Metric::DividendYield,
                Metric::MarketCap,
                Metric::ProfitMargins,
                Metric::CurrentPrice,
                Metric::DividendsLast12m,
            ],
            request_timeout: http::DEFAULT_TIMEOUT,
            max_retries: 3,
            retry_backoff_step: Duration::from_millis(1500),
            news: NewsDefaults::default(),
            endpoints: Endpoints::default(),
        }
    }
}

impl ReporterConfig {
    /// Create a new configuration builder
    pub fn builder() -> ReporterConfigBuilder {
        ReporterConfigBuilder::default()
    }

    /// Apply `INVEST_*` overrides from the process environment
    pub fn with_env(self) -> Result<Self> {
        self.with_lookup(|var| std::env::var(var).ok())
    }

    /// Apply `INVEST_*` overrides from `lookup`
    pub fn with_lookup<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(list) = lookup("INVEST_SOURCES") {
            self.sources = list
                .split(',')
                .filter(|s| !s.trim().is_empty())
                .map(SourceKind::from_str)
                .collect::<Result<Vec<_>>>()?;
        }
        if let Some(period) = lookup("INVEST_PERIOD") {
            self.default_period = period.trim().to_string();
        }
        if let Some(language) = lookup("INVEST_NEWS_LANGUAGE") {
            self.news.language = language.trim().to_string();
        }
        if let Some(region) = lookup("INVEST_NEWS_REGION") {
            self.news.region = region.trim().to_string();
        }

        self.validate()?;
        Ok(self)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.sources.is_empty() {
            return Err(StockError::ConfigError(
                "at least one source must be enabled".to_string(),
            ));
        }

        for (i, source) in self.sources.iter().enumerate() {
            if self.sources[..i].contains(source) {
                return Err(StockError::ConfigError(format!(
                    "source '{source}' listed more than once"
                )));
            }
        }

        if self.discrepancy_pair.0 == self.discrepancy_pair.1 {
            return Err(StockError::ConfigError(
                "discrepancy pair must name two different sources".to_string(),
            ));
        }

        if self.default_period.is_empty() {
            return Err(StockError::ConfigError(
                "default_period must not be empty".to_string(),
            ));
        }

        if self.max_retries == 0 {
            return Err(StockError::ConfigError(
                "max_retries must be greater than 0".to_string(),
            ));
        }

        if self.news.days == 0 {
            return Err(StockError::ConfigError(
                "news lookback must be at least one day".to_string(),
            ));
        }

        Ok(())
    }

    /// Retry policy for the market-data source
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_retries, self.retry_backoff_step)
    }
}

/// Builder for ReporterConfig
#[derive(Debug, Default)]
pub struct ReporterConfigBuilder {
    sources: Option<Vec<SourceKind>>,
    default_period: Option<String>,
    discrepancy_pair: Option<(SourceKind, SourceKind)>,
    discrepancy_metrics: Option<Vec<Metric>>,
    request_timeout: Option<Duration>,
    max_retries: Option<u32>,
    retry_backoff_step: Option<Duration>,
    news: Option<NewsDefaults>,
    endpoints: Option<Endpoints>,
}

impl ReporterConfigBuilder {
    /// Set the enabled sources, highest priority first
    pub fn sources(mut self, sources: impl Into<Vec<SourceKind>>) -> Self {
        self.sources = Some(sources.into());
        self
    }

    pub fn default_period(mut self, period: impl Into<String>) -> Self {
        self.default_period = Some(period.into());
        self
    }

    pub fn discrepancy_pair(mut self, a: SourceKind, b: SourceKind) -> Self {
        self.discrepancy_pair = Some((a, b));
        self
    }

    pub fn discrepancy_metrics(mut self, metrics: impl Into<Vec<Metric>>) -> Self {
        self.discrepancy_metrics = Some(metrics.into());
        self
    }

    /// Set request timeout
    pub fn request_timeout(mut self, duration: Duration) -> Self {
        self.request_timeout = Some(duration);
        self
    }

    /// Set maximum attempts for the market-data history call
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.max_retries = Some(retries);
        self
    }

    pub fn retry_backoff_step(mut self, step: Duration) -> Self {
        self.retry_backoff_step = Some(step);
        self
    }

    pub fn news(mut self, news: NewsDefaults) -> Self {
        self.news = Some(news);
        self
    }

    /// Override endpoint base URLs (for testing with wiremock)
    pub fn endpoints(mut self, endpoints: Endpoints) -> Self {
        self.endpoints = Some(endpoints);
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<ReporterConfig> {
        let defaults = ReporterConfig::default();

        let config = ReporterConfig {
            sources: self.sources.unwrap_or(defaults.sources),
            default_period: self.default_period.unwrap_or(defaults.default_period),
            discrepancy_pair: self.discrepancy_pair.unwrap_or(defaults.discrepancy_pair),
            discrepancy_metrics: self
                .discrepancy_metrics
                .unwrap_or(defaults.discrepancy_metrics),
            request_timeout: self.request_timeout.unwrap_or(defaults.request_timeout),
            max_retries: self.max_retries.unwrap_or(defaults.max_retries),
            retry_backoff_step: self.retry_backoff_step.unwrap_or(defaults.retry_backoff_step),
            news: self.news.unwrap_or(defaults.news),
            endpoints: self.endpoints.unwrap_or(defaults.endpoints),
        };

        config.validate()?;
        Ok(config)
    }
}
