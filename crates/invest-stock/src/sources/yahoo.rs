//! Yahoo Finance market data: quote summary plus closing-price history

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use yahoo_finance_api as yahoo;

use super::{ExtractError, Extraction, RawFieldMap, SourceExtractor};
use crate::config::ReporterConfig;
use crate::error::{Result, StockError};
use crate::fundamentals::Metric;
use crate::http::BROWSER_USER_AGENT;
use crate::mapper::{FieldKind, FieldRule};
use crate::report::PriceMetrics;
use crate::retry::RetryPolicy;

/// quoteSummary modules read for "info", in precedence order
const SUMMARY_MODULES: &[&str] = &[
    "price",
    "summaryDetail",
    "defaultKeyStatistics",
    "financialData",
    "assetProfile",
];

const FIELDS: &[FieldRule] = &[
    FieldRule::new(
        Metric::CurrentPrice,
        &["currentPrice", "regularMarketPrice"],
        FieldKind::PlainFloat,
    ),
    FieldRule::new(
        Metric::PriceChange12m,
        &["52WeekChange"],
        FieldKind::PlainFloat,
    ),
    FieldRule::new(Metric::TrailingPe, &["trailingPE"], FieldKind::PlainFloat),
    FieldRule::new(Metric::ForwardPe, &["forwardPE"], FieldKind::PlainFloat),
    FieldRule::new(Metric::PriceToBook, &["priceToBook"], FieldKind::PlainFloat),
    FieldRule::new(
        Metric::DividendYield,
        &["dividendYield"],
        FieldKind::PlainFloat,
    ),
    FieldRule::new(Metric::MarketCap, &["marketCap"], FieldKind::PlainInt),
    FieldRule::new(
        Metric::ProfitMargins,
        &["profitMargins"],
        FieldKind::PlainFloat,
    ),
    FieldRule::new(Metric::Beta, &["beta"], FieldKind::PlainFloat),
    FieldRule::new(
        Metric::DividendsLast12m,
        &["trailingAnnualDividendRate"],
        FieldKind::PlainFloat,
    ),
    FieldRule::new(Metric::Sector, &["sector"], FieldKind::Text),
    FieldRule::new(Metric::Industry, &["industry"], FieldKind::Text),
    FieldRule::new(Metric::Country, &["country"], FieldKind::Text),
    FieldRule::new(Metric::Currency, &["currency"], FieldKind::Text),
    FieldRule::new(
        Metric::ShortName,
        &["shortName", "longName"],
        FieldKind::Text,
    ),
    FieldRule::new(Metric::Symbol, &["symbol"], FieldKind::Text),
];

/// Market-data backend behind the yfinance source
#[async_trait]
pub trait MarketDataApi: Send + Sync {
    /// Flat key → value map of ticker info, keyed by Yahoo field names
    async fn info(&self, symbol: &str) -> Result<RawFieldMap>;

    /// Daily closes for a range such as `"1y"`, oldest first
    async fn closes(&self, symbol: &str, period: &str) -> Result<Vec<f64>>;
}

/// Yahoo Finance over HTTP. The history connector is built once so its
/// cookie and crumb survive retries.
pub struct YahooMarketData {
    client: reqwest::Client,
    base_url: String,
    connector: yahoo::YahooConnector,
    timeout: Duration,
}

impl YahooMarketData {
    pub const DEFAULT_BASE_URL: &'static str = "https://query2.finance.yahoo.com";

    /// Build against the configured endpoint and request timeout
    pub fn from_config(client: reqwest::Client, config: &ReporterConfig) -> Result<Self> {
        Self::with_base_url(client, &config.endpoints.yahoo, config.request_timeout)
    }

    /// Create with a custom quoteSummary base URL (for testing with wiremock).
    /// History always goes to Yahoo over HTTPS.
    pub fn with_base_url(
        client: reqwest::Client,
        base_url: &str,
        timeout: Duration,
    ) -> Result<Self> {
        let connector = yahoo::YahooConnector::builder()
            .timeout(timeout)
            .user_agent(BROWSER_USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            connector,
            timeout,
        })
    }

    /// Timeout applied to history requests
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

#[async_trait]
impl MarketDataApi for YahooMarketData {
    async fn info(&self, symbol: &str) -> Result<RawFieldMap> {
        let url = format!("{}/v10/finance/quoteSummary/{symbol}", self.base_url);
        debug!(url = %url, "Fetching quote summary");

        let response = self
            .client
            .get(&url)
            .query(&[("modules", SUMMARY_MODULES.join(","))])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(StockError::ApiError(format!(
                "quoteSummary status={}",
                status.as_u16()
            )));
        }

        let body: Value = response.json().await?;
        let result = body
            .pointer("/quoteSummary/result/0")
            .ok_or_else(|| StockError::ApiError("quoteSummary returned no result".to_string()))?;

        Ok(flatten_summary(result))
    }

    async fn closes(&self, symbol: &str, period: &str) -> Result<Vec<f64>> {
        debug!(symbol, period, timeout = ?self.timeout, "Requesting price history");
        let response = self
            .connector
            .get_quote_range(symbol, "1d", period)
            .await?;
        let quotes = response.quotes()?;
        Ok(quotes.iter().map(|q| q.close).collect())
    }
}

/// Flatten quoteSummary modules into one map. `{"raw": x}` wrappers are
/// unwrapped and the first module carrying a key wins.
pub fn flatten_summary(result: &Value) -> RawFieldMap {
    let mut raw = RawFieldMap::new();

    for module in SUMMARY_MODULES {
        let Some(fields) = result.get(*module).and_then(Value::as_object) else {
            continue;
        };
        for (key, value) in fields {
            let text = match value {
                Value::Object(wrapper) => match wrapper.get("raw") {
                    Some(Value::Number(n)) => n.to_string(),
                    _ => continue,
                },
                Value::Number(n) => n.to_string(),
                Value::String(s) if !s.trim().is_empty() => s.clone(),
                _ => continue,
            };
            raw.entry(key.clone()).or_insert(text);
        }
    }

    raw
}

/// The yfinance source: info is best-effort, price history is retried
pub struct YahooSource {
    api: Arc<dyn MarketDataApi>,
    retry: RetryPolicy,
}

impl YahooSource {
    pub const NAME: &'static str = "yfinance";

    pub fn new(api: Arc<dyn MarketDataApi>, retry: RetryPolicy) -> Self {
        Self { api, retry }
    }

    fn quote_url(symbol: &str) -> String {
        format!("https://finance.yahoo.com/quote/{symbol}")
    }
}

#[async_trait]
impl SourceExtractor for YahooSource {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    /// Bare B3 codes (`PETR4`) get the `.SA` suffix; anything else is
    /// uppercased and passed through.
    fn ticker_for(&self, input: &str) -> String {
        let upper = input.trim().to_uppercase();
        let bare_b3 = !upper.is_empty()
            && upper.chars().all(|c| c.is_ascii_alphanumeric())
            && upper.ends_with(|c: char| c.is_ascii_digit());
        if bare_b3 { format!("{upper}.SA") } else { upper }
    }

    fn mapping(&self) -> &'static [FieldRule] {
        FIELDS
    }

    async fn fetch(
        &self,
        ticker: &str,
        period: &str,
    ) -> std::result::Result<Extraction, ExtractError> {
        let symbol = self.ticker_for(ticker);
        let base = symbol.split('.').next().unwrap_or_default();
        if base.is_empty() || !base.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(ExtractError::UnsupportedTicker {
                source_name: Self::NAME,
            });
        }

        let raw = match self.api.info(&symbol).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!(source = Self::NAME, symbol = %symbol, error = %e, "Ticker info unavailable");
                RawFieldMap::new()
            }
        };

        let closes = self
            .retry
            .execute("yfinance history", || self.api.closes(&symbol, period))
            .await;

        let price_metrics = match closes {
            Ok(closes) => PriceMetrics::from_closes(period, &closes),
            Err(e) if raw.is_empty() => {
                return Err(ExtractError::Request {
                    source_name: Self::NAME,
                    reason: e.to_string(),
                });
            }
            Err(e) => {
                warn!(
                    source = Self::NAME,
                    symbol = %symbol,
                    error = %e,
                    "Price history unavailable"
                );
                None
            }
        };

        if raw.is_empty() && price_metrics.is_none() {
            return Err(ExtractError::EmptyData {
                source_name: Self::NAME,
            });
        }

        Ok(Extraction {
            url: Self::quote_url(&symbol),
            ticker: symbol,
            raw,
            price_metrics,
        })
    }
}
