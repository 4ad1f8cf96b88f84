//! Fundamentals sources
//!
//! Each source fetches one external provider and returns the provider's own
//! labels with unparsed values ([`RawFieldMap`]). Mapping into the canonical
//! schema happens afterwards in [`crate::mapper`], driven by the source's
//! [`SourceExtractor::mapping`] rules.
//!
//! Sources never panic or raise for data-availability reasons: every failure
//! comes back as an [`ExtractError`] scoped to that source.

pub mod fundamentus;
pub mod investidor10;
pub mod statusinvest;
pub mod yahoo;

pub use fundamentus::FundamentusSource;
pub use investidor10::Investidor10Source;
pub use statusinvest::StatusInvestSource;
pub use yahoo::{MarketDataApi, YahooMarketData, YahooSource};

use async_trait::async_trait;
use reqwest::StatusCode;
use scraper::ElementRef;
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{debug, warn};

use crate::mapper::FieldRule;
use crate::report::PriceMetrics;

/// Source label → unparsed value, e.g. `"P/L" → "4,12"`
pub type RawFieldMap = BTreeMap<String, String>;

/// Per-source failure, rendered into the report's `error` slot
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractError {
    /// Ticker rejected before any request was issued
    #[error("{source_name} supports only alphanumeric tickers")]
    UnsupportedTicker { source_name: &'static str },

    /// Every candidate URL answered with a non-200 status
    #[error("{source_name} http status={status}")]
    HttpStatus {
        source_name: &'static str,
        status: u16,
    },

    /// A page was fetched but nothing could be extracted from it
    #[error("{source_name} parse error: empty extracted data")]
    EmptyData { source_name: &'static str },

    /// No candidate produced a response at all
    #[error("{source_name} request failed: {reason}")]
    Request {
        source_name: &'static str,
        reason: String,
    },
}

/// Successful output of a single fetch
#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    /// URL the data came from
    pub url: String,
    /// Ticker as sent to the source
    pub ticker: String,
    pub raw: RawFieldMap,
    /// Only market-data sources fill this
    pub price_metrics: Option<PriceMetrics>,
}

/// A pluggable fundamentals provider
#[async_trait]
pub trait SourceExtractor: Send + Sync {
    /// Stable source name used as the report key
    fn name(&self) -> &'static str;

    /// Ticker variant this source should be queried with
    fn ticker_for(&self, input: &str) -> String {
        b3_ticker(input)
    }

    /// Rules mapping this source's labels into canonical metrics
    fn mapping(&self) -> &'static [FieldRule];

    /// Fetch raw fields for `ticker`. `period` only matters to sources that
    /// read price history.
    async fn fetch(&self, ticker: &str, period: &str) -> Result<Extraction, ExtractError>;
}

/// Uppercased B3 code with any `.SA` suffix removed
pub fn b3_ticker(input: &str) -> String {
    let upper = input.trim().to_uppercase();
    match upper.strip_suffix(".SA") {
        Some(base) => base.to_string(),
        None => upper,
    }
}

/// Whether a B3 code names a fund (FII/ETF codes end in `11`)
pub(crate) fn is_fund_ticker(papel: &str) -> bool {
    papel.ends_with("11")
}

pub(crate) fn ensure_alphanumeric(
    source_name: &'static str,
    papel: &str,
) -> Result<(), ExtractError> {
    if papel.is_empty() || !papel.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(ExtractError::UnsupportedTicker { source_name });
    }
    Ok(())
}

/// Try each candidate URL in order and return the first one that answers
/// 200 and parses into a non-empty field map.
///
/// Transport errors on a candidate are logged and skipped. When every
/// candidate fails the error distinguishes "something answered 200 but was
/// empty" from "nothing answered 200".
pub(crate) async fn fetch_first_candidate(
    client: &reqwest::Client,
    source_name: &'static str,
    urls: &[String],
    parse: fn(&str) -> RawFieldMap,
) -> Result<(String, RawFieldMap), ExtractError> {
    let mut last_status: Option<StatusCode> = None;
    let mut last_failure: Option<String> = None;
    let mut saw_ok = false;

    for url in urls {
        debug!(source = source_name, url = %url, "Trying candidate");

        let response = match client.get(url).send().await {
            Ok(response) => response,
            Err(e) => {
                warn!(source = source_name, url = %url, error = %e, "Candidate request failed");
                last_failure = Some(e.to_string());
                continue;
            }
        };

        let status = response.status();
        last_status = Some(status);
        if status != StatusCode::OK {
            debug!(
                source = source_name,
                url = %url,
                status = status.as_u16(),
                "Candidate rejected"
            );
            continue;
        }

        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                warn!(source = source_name, url = %url, error = %e, "Failed to read body");
                last_failure = Some(e.to_string());
                continue;
            }
        };

        saw_ok = true;
        let raw = parse(&body);
        if raw.is_empty() {
            debug!(source = source_name, url = %url, "Candidate yielded no fields");
            continue;
        }

        return Ok((url.clone(), raw));
    }

    if saw_ok {
        Err(ExtractError::EmptyData { source_name })
    } else if let Some(status) = last_status {
        Err(ExtractError::HttpStatus {
            source_name,
            status: status.as_u16(),
        })
    } else {
        Err(ExtractError::Request {
            source_name,
            reason: last_failure.unwrap_or_else(|| "no candidate urls".to_string()),
        })
    }
}

/// Text of an element with whitespace-trimmed fragments joined by `sep`
pub(crate) fn element_text(element: ElementRef<'_>, sep: &str) -> String {
    element
        .text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(sep)
}

pub(crate) fn has_class(element: ElementRef<'_>, class: &str) -> bool {
    element.value().classes().any(|c| c == class)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn parse_nonempty(body: &str) -> RawFieldMap {
        let mut raw = RawFieldMap::new();
        if body.contains("P/L") {
            raw.insert("P/L".to_string(), "4,2".to_string());
        }
        raw
    }

    #[test]
    fn test_b3_ticker() {
        assert_eq!(b3_ticker("petr4.sa"), "PETR4");
        assert_eq!(b3_ticker(" PETR4.SA "), "PETR4");
        assert_eq!(b3_ticker("hglg11"), "HGLG11");
    }

    #[test]
    fn test_ensure_alphanumeric() {
        assert!(ensure_alphanumeric("x", "PETR4").is_ok());
        assert_eq!(
            ensure_alphanumeric("fundamentus", "PETR4!"),
            Err(ExtractError::UnsupportedTicker {
                source_name: "fundamentus"
            })
        );
        assert!(ensure_alphanumeric("x", "").is_err());
    }

    #[test]
    fn test_error_messages() {
        let err = ExtractError::HttpStatus {
            source_name: "statusinvest",
            status: 404,
        };
        assert_eq!(err.to_string(), "statusinvest http status=404");

        let err = ExtractError::EmptyData {
            source_name: "investidor10",
        };
        assert_eq!(
            err.to_string(),
            "investidor10 parse error: empty extracted data"
        );
    }

    #[tokio::test]
    async fn test_first_candidate_wins_after_failures() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/a"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/b"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<p>nothing</p>"))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/c"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<p>P/L</p>"))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/d"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<p>P/L</p>"))
            .expect(0)
            .mount(&server)
            .await;

        let client = reqwest::Client::new();
        let urls: Vec<String> = ["a", "b", "c", "d"]
            .iter()
            .map(|p| format!("{}/{p}", server.uri()))
            .collect();

        let (url, raw) = fetch_first_candidate(&client, "test", &urls, parse_nonempty)
            .await
            .unwrap();
        assert!(url.ends_with("/c"));
        assert_eq!(raw.get("P/L").map(String::as_str), Some("4,2"));
    }

    #[tokio::test]
    async fn test_all_candidates_non_200() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let client = reqwest::Client::new();
        let urls = vec![format!("{}/x", server.uri())];
        let err = fetch_first_candidate(&client, "test", &urls, parse_nonempty)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "test http status=503");
    }

    #[tokio::test]
    async fn test_all_candidates_empty() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
            .mount(&server)
            .await;

        let client = reqwest::Client::new();
        let urls = vec![format!("{}/x", server.uri())];
        let err = fetch_first_candidate(&client, "test", &urls, parse_nonempty)
            .await
            .unwrap_err();
        assert_eq!(err, ExtractError::EmptyData { source_name: "test" });
    }

    #[tokio::test]
    async fn test_connection_failure_is_captured() {
        let client = reqwest::Client::new();
        // port 9 on localhost is not expected to accept HTTP
        let urls = vec!["http://127.0.0.1:9/unreachable".to_string()];
        let err = fetch_first_candidate(&client, "test", &urls, parse_nonempty)
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractError::Request { .. }));
    }
}
