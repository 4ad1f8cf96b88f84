//! Tool for aggregated stock fundamentals

use async_trait::async_trait;
use invest_core::{Error as CoreError, Result as CoreResult, Tool};
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::Arc;

use crate::aggregate::Aggregator;
use crate::cache::ReportCache;
use crate::config::ReporterConfig;
use crate::error::Result;

/// Fetches fundamentals from every configured source and returns the
/// aggregated report as pretty JSON text
pub struct FundamentalsTool {
    aggregator: Arc<Aggregator>,
    default_period: String,
}

#[derive(Debug, Deserialize)]
struct FundamentalsParams {
    ticker: String,
    #[serde(default)]
    period: Option<String>,
}

impl FundamentalsTool {
    pub const NAME: &'static str = "stock_fundamentals";

    pub fn new(aggregator: Arc<Aggregator>, default_period: impl Into<String>) -> Self {
        Self {
            aggregator,
            default_period: default_period.into(),
        }
    }

    /// Build the aggregator described by `config`
    pub fn from_config(config: &ReporterConfig, cache: ReportCache) -> Result<Self> {
        let aggregator = Aggregator::from_config(config, cache)?;
        Ok(Self::new(Arc::new(aggregator), config.default_period.clone()))
    }

    fn parse_params(&self, params: Value) -> CoreResult<(String, String)> {
        let params: FundamentalsParams = serde_json::from_value(params)
            .map_err(|e| CoreError::InvalidInput(format!("Invalid parameters: {e}")))?;

        let ticker = params.ticker.trim().to_string();
        if ticker.is_empty() {
            return Err(CoreError::InvalidInput("ticker must not be empty".to_string()));
        }

        let period = params
            .period
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| self.default_period.clone());

        Ok((ticker, period))
    }
}

#[async_trait]
impl Tool for FundamentalsTool {
    async fn execute(&self, params: Value) -> CoreResult<Value> {
        let (ticker, period) = self.parse_params(params)?;

        let report = self.aggregator.aggregate(&ticker, &period).await;
        let text = report
            .render()
            .map_err(|e| CoreError::tool_failed(Self::NAME, e.to_string()))?;

        Ok(Value::String(text))
    }

    fn name(&self) -> &str {
        Self::NAME
    }

    fn description(&self) -> &str {
        "Fetch stock fundamentals for a B3 ticker from several sources \
         (Yahoo Finance, Fundamentus, StatusInvest, Investidor10). Returns the merged \
         metrics, per-source data and errors, discrepancies between sources and, \
         when available, price return and volatility over the period."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "ticker": {
                    "type": "string",
                    "description": "Stock ticker. For B3, you can pass PETR4 or PETR4.SA"
                },
                "period": {
                    "type": "string",
                    "description": "Price-history period such as 1mo, 6mo, 1y",
                    "default": self.default_period
                }
            },
            "required": ["ticker"]
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Endpoints, SourceKind};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const PAGE: &str = r#"<table>
        <tr><td class="label"><span class="txt">P/L</span></td><td class="data"><span class="txt">4,12</span></td></tr>
        <tr><td class="label"><span class="txt">Div. Yield</span></td><td class="data"><span class="txt">15,8%</span></td></tr>
    </table>"#;

    async fn tool_against(server: &MockServer) -> FundamentalsTool {
        let config = ReporterConfig::builder()
            .sources([SourceKind::Fundamentus])
            .discrepancy_pair(SourceKind::Fundamentus, SourceKind::StatusInvest)
            .endpoints(Endpoints {
                fundamentus: server.uri(),
                ..Endpoints::default()
            })
            .build()
            .unwrap();
        FundamentalsTool::from_config(&config, ReportCache::new()).unwrap()
    }

    #[tokio::test]
    async fn test_execute_returns_rendered_report() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/detalhes.php"))
            .respond_with(ResponseTemplate::new(200).set_body_string(PAGE))
            .expect(1)
            .mount(&server)
            .await;

        let tool = tool_against(&server).await;
        let output = tool.execute(json!({"ticker": "PETR4.SA"})).await.unwrap();

        let text = output.as_str().unwrap();
        let report: Value = serde_json::from_str(text).unwrap();
        assert_eq!(report["input_ticker"], "PETR4.SA");
        assert_eq!(report["period"], "1y");
        assert_eq!(report["tickers"]["fundamentus"], "PETR4");
        assert_eq!(report["fundamentals"]["trailingPE"], 4.12);
        assert!(report["fundamentals"]["beta"].is_null());
        assert!(report["sources"]["fundamentus"]["error"].is_null());
    }

    #[tokio::test]
    async fn test_repeated_call_is_served_from_cache() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(PAGE))
            .expect(1)
            .mount(&server)
            .await;

        let tool = tool_against(&server).await;
        let first = tool.execute(json!({"ticker": "PETR4", "period": "6mo"})).await.unwrap();
        let second = tool.execute(json!({"ticker": "PETR4", "period": "6mo"})).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_invalid_input() {
        let server = MockServer::start().await;
        let tool = tool_against(&server).await;

        let err = tool.execute(json!({"ticker": "  "})).await.unwrap_err();
        assert!(matches!(err, CoreError::InvalidInput(_)));

        let err = tool.execute(json!({"period": "1y"})).await.unwrap_err();
        assert!(matches!(err, CoreError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_source_errors_do_not_fail_the_call() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let tool = tool_against(&server).await;
        let output = tool.execute(json!({"ticker": "PETR4"})).await.unwrap();
        let report: Value = serde_json::from_str(output.as_str().unwrap()).unwrap();
        assert_eq!(
            report["sources"]["fundamentus"]["error"],
            "fundamentus http status=500"
        );
    }

    #[tokio::test]
    async fn test_tool_metadata() {
        let server = MockServer::start().await;
        let tool = tool_against(&server).await;
        assert_eq!(tool.name(), "stock_fundamentals");
        assert_eq!(tool.input_schema()["required"][0], "ticker");
        assert_eq!(tool.definition()["name"], "stock_fundamentals");
    }
}
