//! Canonical fundamentals schema shared by every source

use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Canonical metric names. Every source maps into this fixed set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Metric {
    CurrentPrice,
    PriceChange12m,
    #[serde(rename = "trailingPE")]
    TrailingPe,
    #[serde(rename = "forwardPE")]
    ForwardPe,
    PriceToBook,
    DividendYield,
    MarketCap,
    ProfitMargins,
    Beta,
    DividendsLast12m,
    AverageDailyLiquidity,
    NetAssets,
    LastDividend,
    Sector,
    Industry,
    Country,
    Currency,
    ShortName,
    Symbol,
}

impl Metric {
    /// All metrics in output order
    pub const ALL: [Metric; 19] = [
        Metric::CurrentPrice,
        Metric::PriceChange12m,
        Metric::TrailingPe,
        Metric::ForwardPe,
        Metric::PriceToBook,
        Metric::DividendYield,
        Metric::MarketCap,
        Metric::ProfitMargins,
        Metric::Beta,
        Metric::DividendsLast12m,
        Metric::AverageDailyLiquidity,
        Metric::NetAssets,
        Metric::LastDividend,
        Metric::Sector,
        Metric::Industry,
        Metric::Country,
        Metric::Currency,
        Metric::ShortName,
        Metric::Symbol,
    ];

    /// Wire name of the metric
    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::CurrentPrice => "currentPrice",
            Metric::PriceChange12m => "priceChange12m",
            Metric::TrailingPe => "trailingPE",
            Metric::ForwardPe => "forwardPE",
            Metric::PriceToBook => "priceToBook",
            Metric::DividendYield => "dividendYield",
            Metric::MarketCap => "marketCap",
            Metric::ProfitMargins => "profitMargins",
            Metric::Beta => "beta",
            Metric::DividendsLast12m => "dividendsLast12m",
            Metric::AverageDailyLiquidity => "averageDailyLiquidity",
            Metric::NetAssets => "netAssets",
            Metric::LastDividend => "lastDividend",
            Metric::Sector => "sector",
            Metric::Industry => "industry",
            Metric::Country => "country",
            Metric::Currency => "currency",
            Metric::ShortName => "shortName",
            Metric::Symbol => "symbol",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Metric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Metric::ALL
            .iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(s.trim()))
            .copied()
            .ok_or_else(|| format!("unknown metric '{s}'"))
    }
}

/// A normalized metric value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetricValue {
    Int(i64),
    Float(f64),
    Text(String),
}

impl MetricValue {
    /// Numeric view used for discrepancy checks; text has none
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            MetricValue::Float(v) => Some(*v),
            MetricValue::Int(v) => Some(*v as f64),
            MetricValue::Text(_) => None,
        }
    }
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricValue::Int(v) => write!(f, "{v}"),
            MetricValue::Float(v) => write!(f, "{v}"),
            MetricValue::Text(v) => f.write_str(v),
        }
    }
}

/// Source-independent fundamentals record.
///
/// Metrics that were not populated are absent from the map and serialize as
/// `null`; the serialized form always lists every metric.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CanonicalFundamentals {
    values: BTreeMap<Metric, MetricValue>,
}

impl CanonicalFundamentals {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, metric: Metric) -> Option<&MetricValue> {
        self.values.get(&metric)
    }

    /// Numeric value of a metric, if present and numeric
    pub fn number(&self, metric: Metric) -> Option<f64> {
        self.get(metric).and_then(MetricValue::as_f64)
    }

    /// Set a metric; `None` clears it
    pub fn set(&mut self, metric: Metric, value: Option<MetricValue>) {
        match value {
            Some(v) => {
                self.values.insert(metric, v);
            }
            None => {
                self.values.remove(&metric);
            }
        }
    }

    pub fn contains(&self, metric: Metric) -> bool {
        self.values.contains_key(&metric)
    }

    /// Number of populated metrics
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Populated metrics in canonical order
    pub fn iter(&self) -> impl Iterator<Item = (Metric, &MetricValue)> {
        self.values.iter().map(|(m, v)| (*m, v))
    }
}

impl Serialize for CanonicalFundamentals {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(Metric::ALL.len()))?;
        for metric in Metric::ALL {
            map.serialize_entry(metric.as_str(), &self.values.get(&metric))?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for CanonicalFundamentals {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw: BTreeMap<Metric, Option<MetricValue>> = BTreeMap::deserialize(deserializer)?;
        Ok(Self {
            values: raw
                .into_iter()
                .filter_map(|(m, v)| v.map(|v| (m, v)))
                .collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_metric_names() {
        assert_eq!(Metric::TrailingPe.as_str(), "trailingPE");
        assert_eq!("priceToBook".parse::<Metric>(), Ok(Metric::PriceToBook));
        assert!("ebitda".parse::<Metric>().is_err());
        assert_eq!(
            serde_json::to_value(Metric::ForwardPe).unwrap(),
            json!("forwardPE")
        );
    }

    #[test]
    fn test_serialize_emits_every_metric() {
        let mut f = CanonicalFundamentals::new();
        f.set(Metric::TrailingPe, Some(MetricValue::Float(10.0)));
        f.set(Metric::MarketCap, Some(MetricValue::Int(1_000)));

        let value = serde_json::to_value(&f).unwrap();
        let obj = value.as_object().unwrap();
        assert_eq!(obj.len(), Metric::ALL.len());
        assert_eq!(obj["trailingPE"], json!(10.0));
        assert_eq!(obj["marketCap"], json!(1000));
        assert!(obj["priceToBook"].is_null());
    }

    #[test]
    fn test_deserialize_skips_nulls() {
        let f: CanonicalFundamentals =
            serde_json::from_value(json!({"trailingPE": 8.5, "sector": null, "symbol": "PETR4"}))
                .unwrap();
        assert_eq!(f.len(), 2);
        assert_eq!(f.number(Metric::TrailingPe), Some(8.5));
        assert_eq!(
            f.get(Metric::Symbol),
            Some(&MetricValue::Text("PETR4".to_string()))
        );
    }

    #[test]
    fn test_set_none_clears() {
        let mut f = CanonicalFundamentals::new();
        f.set(Metric::Beta, Some(MetricValue::Float(1.1)));
        f.set(Metric::Beta, None);
        assert!(!f.contains(Metric::Beta));
        assert!(f.is_empty());
    }
}
