//! Multi-source fundamentals aggregation
//!
//! Every configured source is fetched concurrently and in isolation. Results
//! are merged in priority order, the configured source pair is compared for
//! discrepancies, and the finished report is cached per `(ticker, period)`.

use chrono::Utc;
use futures::future::join_all;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, warn};

use crate::cache::{CacheKey, ReportCache};
use crate::config::{ReporterConfig, SourceKind};
use crate::error::Result;
use crate::fundamentals::{CanonicalFundamentals, Metric};
use crate::http::build_http_client;
use crate::mapper::to_source_data;
use crate::report::{AggregatedReport, Discrepancy, SourceResult};
use crate::sources::{
    FundamentusSource, Investidor10Source, SourceExtractor, StatusInvestSource, YahooMarketData,
    YahooSource,
};

/// Merge and discrepancy settings
#[derive(Debug, Clone, PartialEq)]
pub struct AggregatorSettings {
    /// `(a, b)` source names compared for discrepancies
    pub discrepancy_pair: (String, String),
    pub discrepancy_metrics: Vec<Metric>,
}

impl Default for AggregatorSettings {
    fn default() -> Self {
        Self::from_config(&ReporterConfig::default())
    }
}

impl AggregatorSettings {
    pub fn from_config(config: &ReporterConfig) -> Self {
        let (a, b) = config.discrepancy_pair;
        Self {
            discrepancy_pair: (a.as_str().to_string(), b.as_str().to_string()),
            discrepancy_metrics: config.discrepancy_metrics.clone(),
        }
    }
}

/// Runs sources for a ticker and combines them into one report
pub struct Aggregator {
    sources: Vec<Arc<dyn SourceExtractor>>,
    cache: ReportCache,
    settings: AggregatorSettings,
}

impl Aggregator {
    /// `sources` are given in merge priority order
    pub fn new(
        sources: Vec<Arc<dyn SourceExtractor>>,
        cache: ReportCache,
        settings: AggregatorSettings,
    ) -> Self {
        Self {
            sources,
            cache,
            settings,
        }
    }

    /// Build the configured sources over one shared HTTP client
    pub fn from_config(config: &ReporterConfig, cache: ReportCache) -> Result<Self> {
        config.validate()?;
        let client = build_http_client(config.request_timeout)?;
        let endpoints = &config.endpoints;

        let sources = config
            .sources
            .iter()
            .map(|kind| -> Result<Arc<dyn SourceExtractor>> {
                Ok(match kind {
                    SourceKind::YFinance => Arc::new(YahooSource::new(
                        Arc::new(YahooMarketData::from_config(client.clone(), config)?),
                        config.retry_policy(),
                    )),
                    SourceKind::Fundamentus => Arc::new(FundamentusSource::with_base_url(
                        client.clone(),
                        &endpoints.fundamentus,
                    )),
                    SourceKind::StatusInvest => Arc::new(StatusInvestSource::with_base_url(
                        client.clone(),
                        &endpoints.statusinvest,
                    )),
                    SourceKind::Investidor10 => Arc::new(Investidor10Source::with_base_url(
                        client.clone(),
                        &endpoints.investidor10,
                    )),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self::new(
            sources,
            cache,
            AggregatorSettings::from_config(config),
        ))
    }

    /// Source names in priority order
    pub fn source_names(&self) -> Vec<&'static str> {
        self.sources.iter().map(|s| s.name()).collect()
    }

    /// Aggregate fundamentals for `ticker`. Never fails: per-source errors
    /// are recorded in the report.
    pub async fn aggregate(&self, ticker: &str, period: &str) -> AggregatedReport {
        self.cache
            .get_or_compute(CacheKey::new(ticker, period), || self.collect(ticker, period))
            .await
    }

    async fn collect(&self, ticker: &str, period: &str) -> AggregatedReport {
        info!(ticker, period, sources = self.sources.len(), "Aggregating fundamentals");

        let tickers = self
            .sources
            .iter()
            .map(|s| (s.name().to_string(), s.ticker_for(ticker)))
            .collect();

        let fetches = self.sources.iter().map(|source| async move {
            let result = match source.fetch(ticker, period).await {
                Ok(extraction) => SourceResult::ok(to_source_data(extraction, source.mapping())),
                Err(e) => {
                    warn!(source = source.name(), ticker, error = %e, "Source failed");
                    SourceResult::failed(e.to_string())
                }
            };
            (source.name(), result)
        });
        let results = join_all(fetches).await;

        let fundamentals = merge_fundamentals(
            results
                .iter()
                .filter_map(|(_, r)| r.data())
                .map(|d| &d.mapped),
        );
        let price_metrics = results
            .iter()
            .find_map(|(_, r)| r.data()?.price_metrics.clone());

        let sources: BTreeMap<String, SourceResult> = results
            .into_iter()
            .map(|(name, result)| (name.to_string(), result))
            .collect();

        let (name_a, name_b) = &self.settings.discrepancy_pair;
        let discrepancies = match (
            sources.get(name_a).and_then(SourceResult::data),
            sources.get(name_b).and_then(SourceResult::data),
        ) {
            (Some(a), Some(b)) => detect_discrepancies(
                (name_a.as_str(), &a.mapped),
                (name_b.as_str(), &b.mapped),
                &self.settings.discrepancy_metrics,
            ),
            _ => BTreeMap::new(),
        };

        let report = AggregatedReport {
            input_ticker: ticker.to_string(),
            period: period.to_string(),
            tickers,
            retrieved_at: Utc::now(),
            sources,
            fundamentals,
            discrepancies,
            price_metrics,
        };

        info!(
            ticker,
            succeeded = ?report.successful_sources(),
            metrics = report.fundamentals.len(),
            discrepancies = report.discrepancies.len(),
            "Aggregation complete"
        );
        report
    }
}

/// Best-effort merge: for each metric the first source (in iteration order)
/// with a value wins. Later sources only fill gaps.
pub fn merge_fundamentals<'a>(
    ordered: impl IntoIterator<Item = &'a CanonicalFundamentals>,
) -> CanonicalFundamentals {
    let mut merged = CanonicalFundamentals::new();
    for fundamentals in ordered {
        for (metric, value) in fundamentals.iter() {
            if !merged.contains(metric) {
                merged.set(metric, Some(value.clone()));
            }
        }
    }
    merged
}

/// Compare two sources on `metrics`. An entry is recorded only when both
/// sides have a numeric value and they differ.
pub fn detect_discrepancies(
    (name_a, a): (&str, &CanonicalFundamentals),
    (name_b, b): (&str, &CanonicalFundamentals),
    metrics: &[Metric],
) -> BTreeMap<String, Discrepancy> {
    metrics
        .iter()
        .filter_map(|metric| {
            let value_a = a.number(*metric)?;
            let value_b = b.number(*metric)?;
            let discrepancy = Discrepancy::new(name_a, value_a, name_b, value_b);
            (discrepancy.abs_delta != 0.0).then(|| (metric.as_str().to_string(), discrepancy))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fundamentals::MetricValue;
    use crate::mapper::{FieldKind, FieldRule};
    use crate::sources::{ExtractError, Extraction, RawFieldMap};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};

    const RULES: &[FieldRule] = &[
        FieldRule::new(Metric::TrailingPe, &["pe"], FieldKind::PlainFloat),
        FieldRule::new(Metric::PriceToBook, &["pb"], FieldKind::PlainFloat),
        FieldRule::new(Metric::Sector, &["sector"], FieldKind::Text),
    ];

    /// In-process source returning a fixed outcome and counting calls
    struct FakeSource {
        name: &'static str,
        outcome: std::result::Result<RawFieldMap, ExtractError>,
        calls: AtomicU32,
    }

    impl FakeSource {
        fn ok(name: &'static str, pairs: &[(&str, &str)]) -> Arc<Self> {
            let raw = pairs
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect();
            Arc::new(Self {
                name,
                outcome: Ok(raw),
                calls: AtomicU32::new(0),
            })
        }

        fn failing(name: &'static str, error: ExtractError) -> Arc<Self> {
            Arc::new(Self {
                name,
                outcome: Err(error),
                calls: AtomicU32::new(0),
            })
        }
    }

    #[async_trait]
    impl SourceExtractor for FakeSource {
        fn name(&self) -> &'static str {
            self.name
        }

        fn mapping(&self) -> &'static [FieldRule] {
            RULES
        }

        async fn fetch(
            &self,
            ticker: &str,
            _period: &str,
        ) -> std::result::Result<Extraction, ExtractError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let raw = self.outcome.clone()?;
            Ok(Extraction {
                url: format!("https://{}.test/{ticker}", self.name),
                ticker: self.ticker_for(ticker),
                raw,
                price_metrics: None,
            })
        }
    }

    fn aggregator(sources: &[&Arc<FakeSource>]) -> Aggregator {
        let sources = sources
            .iter()
            .map(|s| {
                let source: Arc<dyn SourceExtractor> = (*s).clone();
                source
            })
            .collect();
        Aggregator::new(sources, ReportCache::new(), AggregatorSettings::default())
    }

    fn fundamentals(pairs: &[(Metric, f64)]) -> CanonicalFundamentals {
        let mut f = CanonicalFundamentals::new();
        for (metric, value) in pairs {
            f.set(*metric, Some(MetricValue::Float(*value)));
        }
        f
    }

    #[test]
    fn test_merge_respects_priority() {
        let a = fundamentals(&[(Metric::TrailingPe, 10.0)]);
        let b = fundamentals(&[(Metric::TrailingPe, 12.0), (Metric::PriceToBook, 1.5)]);

        let merged = merge_fundamentals([&a, &b]);
        assert_eq!(merged.number(Metric::TrailingPe), Some(10.0));
        assert_eq!(merged.number(Metric::PriceToBook), Some(1.5));
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn test_equal_values_are_not_discrepancies() {
        let a = fundamentals(&[(Metric::TrailingPe, 10.0)]);
        let b = fundamentals(&[(Metric::TrailingPe, 10.0)]);

        let found = detect_discrepancies(
            ("yfinance", &a),
            ("fundamentus", &b),
            &[Metric::TrailingPe],
        );
        assert!(found.is_empty());
    }

    #[test]
    fn test_differing_values_are_discrepancies() {
        let a = fundamentals(&[(Metric::TrailingPe, 10.0), (Metric::Beta, 1.0)]);
        let b = fundamentals(&[(Metric::TrailingPe, 12.0), (Metric::Beta, 2.0)]);

        let found = detect_discrepancies(
            ("yfinance", &a),
            ("fundamentus", &b),
            &[Metric::TrailingPe, Metric::PriceToBook],
        );
        assert_eq!(found.len(), 1);
        assert_eq!(
            serde_json::to_value(&found["trailingPE"]).unwrap(),
            serde_json::json!({"yfinance": 10.0, "fundamentus": 12.0, "abs_delta": 2.0})
        );
    }

    #[test]
    fn test_one_sided_values_are_not_discrepancies() {
        let a = fundamentals(&[(Metric::TrailingPe, 10.0)]);
        let b = CanonicalFundamentals::new();
        assert!(detect_discrepancies(("a", &a), ("b", &b), &[Metric::TrailingPe]).is_empty());
    }

    #[tokio::test]
    async fn test_aggregate_merges_and_flags() {
        let primary = FakeSource::ok("yfinance", &[("pe", "10.0")]);
        let secondary = FakeSource::ok("fundamentus", &[("pe", "12.0"), ("pb", "1.5")]);
        let agg = aggregator(&[&primary, &secondary]);

        let report = agg.aggregate("PETR4", "1y").await;

        assert_eq!(report.input_ticker, "PETR4");
        assert_eq!(report.fundamentals.number(Metric::TrailingPe), Some(10.0));
        assert_eq!(report.fundamentals.number(Metric::PriceToBook), Some(1.5));
        assert_eq!(report.discrepancies["trailingPE"].abs_delta, 2.0);
        assert_eq!(report.successful_sources(), vec!["fundamentus", "yfinance"]);
        assert_eq!(report.tickers["yfinance"], "PETR4");
    }

    #[tokio::test]
    async fn test_source_failure_is_isolated() {
        let broken = FakeSource::failing(
            "yfinance",
            ExtractError::HttpStatus {
                source_name: "yfinance",
                status: 503,
            },
        );
        let healthy = FakeSource::ok("fundamentus", &[("pe", "12.0"), ("sector", "Energia")]);
        let agg = aggregator(&[&broken, &healthy]);

        let report = agg.aggregate("PETR4", "1y").await;

        let failed = &report.sources["yfinance"];
        assert!(failed.data().is_none());
        assert_eq!(failed.error(), Some("yfinance http status=503"));

        let ok = report.sources["fundamentus"].data().unwrap();
        assert_eq!(ok.mapped.number(Metric::TrailingPe), Some(12.0));
        assert_eq!(report.fundamentals.number(Metric::TrailingPe), Some(12.0));
        assert!(report.discrepancies.is_empty());
    }

    #[tokio::test]
    async fn test_all_sources_failing_still_reports() {
        let rejected = FakeSource::failing(
            "statusinvest",
            ExtractError::UnsupportedTicker {
                source_name: "statusinvest",
            },
        );
        let empty = FakeSource::failing(
            "investidor10",
            ExtractError::EmptyData {
                source_name: "investidor10",
            },
        );
        let agg = aggregator(&[&rejected, &empty]);

        let report = agg.aggregate("PETR4!", "1y").await;
        assert!(report.fundamentals.is_empty());
        assert!(report.successful_sources().is_empty());
        assert_eq!(report.sources.len(), 2);
    }

    #[tokio::test]
    async fn test_cache_idempotence() {
        let primary = FakeSource::ok("yfinance", &[("pe", "10.0")]);
        let secondary = FakeSource::ok("fundamentus", &[("pb", "1.5")]);
        let agg = aggregator(&[&primary, &secondary]);

        let first = agg.aggregate("PETR4", "1y").await;
        let second = agg.aggregate("PETR4", "1y").await;

        assert_eq!(first, second);
        assert_eq!(primary.calls.load(Ordering::SeqCst), 1);
        assert_eq!(secondary.calls.load(Ordering::SeqCst), 1);

        // a different period is a different key
        agg.aggregate("PETR4", "6mo").await;
        assert_eq!(primary.calls.load(Ordering::SeqCst), 2);
        agg.aggregate("PETR4", "6mo").await;
        assert_eq!(primary.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_from_config_respects_source_order() {
        let config = ReporterConfig::builder()
            .sources([SourceKind::StatusInvest, SourceKind::YFinance])
            .build()
            .unwrap();
        let agg = Aggregator::from_config(&config, ReportCache::new()).unwrap();
        assert_eq!(agg.source_names(), vec!["statusinvest", "yfinance"]);
    }
}
