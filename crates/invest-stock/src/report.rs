//! Aggregated report types

use chrono::{DateTime, Utc};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::fundamentals::CanonicalFundamentals;
use crate::sources::RawFieldMap;

/// Price statistics derived from a closing-price history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceMetrics {
    pub period: String,
    pub first_close: f64,
    pub last_close: f64,
    /// `last / first - 1`
    pub total_return: f64,
    /// Sample std-dev of daily simple returns × √252
    pub annualized_volatility: Option<f64>,
}

impl PriceMetrics {
    /// Derive metrics from closes in chronological order.
    ///
    /// Returns `None` with fewer than two usable closes. Non-finite and
    /// non-positive closes are dropped first.
    pub fn from_closes(period: &str, closes: &[f64]) -> Option<Self> {
        let closes: Vec<f64> = closes
            .iter()
            .copied()
            .filter(|c| c.is_finite() && *c > 0.0)
            .collect();
        if closes.len() < 2 {
            return None;
        }

        let first_close = closes[0];
        let last_close = closes[closes.len() - 1];

        let returns: Vec<f64> = closes.windows(2).map(|w| w[1] / w[0] - 1.0).collect();

        Some(Self {
            period: period.to_string(),
            first_close,
            last_close,
            total_return: last_close / first_close - 1.0,
            annualized_volatility: annualized_volatility(&returns),
        })
    }
}

fn annualized_volatility(returns: &[f64]) -> Option<f64> {
    if returns.len() < 2 {
        return None;
    }
    let n = returns.len() as f64;
    let mean = returns.iter().sum::<f64>() / n;
    let variance = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / (n - 1.0);
    Some(variance.sqrt() * 252.0_f64.sqrt())
}

/// Successful output of one source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceData {
    pub source_url: String,
    /// Ticker as the source was queried with
    pub ticker: String,
    pub raw: RawFieldMap,
    pub mapped: CanonicalFundamentals,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_metrics: Option<PriceMetrics>,
}

/// Outcome of one source attempt: exactly one of `data` or `error` is set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceResult {
    data: Option<SourceData>,
    error: Option<String>,
}

impl SourceResult {
    pub fn ok(data: SourceData) -> Self {
        Self {
            data: Some(data),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            data: None,
            error: Some(error.into()),
        }
    }

    pub fn data(&self) -> Option<&SourceData> {
        self.data.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_ok(&self) -> bool {
        self.data.is_some()
    }
}

/// Disagreement between two sources on one numeric metric
#[derive(Debug, Clone, PartialEq)]
pub struct Discrepancy {
    pub source_a: String,
    pub value_a: f64,
    pub source_b: String,
    pub value_b: f64,
    pub abs_delta: f64,
}

impl Discrepancy {
    pub fn new(source_a: &str, value_a: f64, source_b: &str, value_b: f64) -> Self {
        Self {
            source_a: source_a.to_string(),
            value_a,
            source_b: source_b.to_string(),
            value_b,
            abs_delta: (value_a - value_b).abs(),
        }
    }
}

// Serialized as `{<source_a>: a, <source_b>: b, "abs_delta": d}`
impl Serialize for Discrepancy {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(3))?;
        map.serialize_entry(&self.source_a, &self.value_a)?;
        map.serialize_entry(&self.source_b, &self.value_b)?;
        map.serialize_entry("abs_delta", &self.abs_delta)?;
        map.end()
    }
}

/// The combined result of one fundamentals lookup
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregatedReport {
    pub input_ticker: String,
    pub period: String,
    /// Ticker variant each source was queried with
    pub tickers: BTreeMap<String, String>,
    pub retrieved_at: DateTime<Utc>,
    pub sources: BTreeMap<String, SourceResult>,
    /// Best-effort merge across sources in priority order
    pub fundamentals: CanonicalFundamentals,
    pub discrepancies: BTreeMap<String, Discrepancy>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_metrics: Option<PriceMetrics>,
}

impl AggregatedReport {
    /// Textual rendering handed to downstream agents
    pub fn render(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Names of sources that produced data
    pub fn successful_sources(&self) -> Vec<&str> {
        self.sources
            .iter()
            .filter(|(_, r)| r.is_ok())
            .map(|(name, _)| name.as_str())
            .collect()
    }
}
