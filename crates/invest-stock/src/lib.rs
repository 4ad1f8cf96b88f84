//! Stock fundamentals aggregation and news retrieval
//!
//! This crate gathers fundamentals for Brazilian (B3) tickers from several
//! independent sources and reconciles them into one report. It includes:
//!
//! - Extractors for Yahoo Finance, Fundamentus, StatusInvest and Investidor10
//! - Locale-aware number parsing for pt-BR formatted pages
//! - A canonical metric set with per-source field mappings
//! - Best-effort merging, discrepancy detection and a per-(ticker, period) cache
//! - A Google News RSS retriever with promotional-title filtering
//!
//! # Architecture
//!
//! Every source implements [`SourceExtractor`]. The [`Aggregator`] fans out to
//! all of them concurrently, maps each raw field map into
//! [`CanonicalFundamentals`] and merges them in priority order. Two tools wrap
//! the pipeline for an orchestration layer:
//! - [`FundamentalsTool`] (`stock_fundamentals`)
//! - [`NewsSearchTool`] (`news_search`)
//!
//! # Example
//!
//! ```rust,ignore
//! use invest_stock::{FundamentalsTool, ReportCache, ReporterConfig};
//! use invest_core::Tool;
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ReporterConfig::default().with_env()?;
//!     let tool = FundamentalsTool::from_config(&config, ReportCache::new())?;
//!
//!     let report = tool.execute(json!({"ticker": "PETR4"})).await?;
//!     println!("{}", report.as_str().unwrap_or_default());
//!
//!     Ok(())
//! }
//! ```

pub mod aggregate;
pub mod cache;
pub mod config;
pub mod error;
pub mod fundamentals;
pub mod http;
pub mod mapper;
pub mod news;
pub mod normalize;
pub mod report;
pub mod retry;
pub mod sources;
pub mod tools;

// Re-export main types for convenience
pub use aggregate::{Aggregator, AggregatorSettings};
pub use cache::{CacheKey, ReportCache};
pub use config::{Endpoints, NewsDefaults, ReporterConfig, SourceKind};
pub use error::{Result, StockError};
pub use fundamentals::{CanonicalFundamentals, Metric, MetricValue};
pub use news::{NewsItem, NewsQuery, NewsRetriever, NewsSearch};
pub use report::{AggregatedReport, Discrepancy, PriceMetrics, SourceData, SourceResult};
pub use retry::RetryPolicy;
pub use sources::{ExtractError, SourceExtractor};
pub use tools::{FundamentalsTool, NewsSearchTool};
