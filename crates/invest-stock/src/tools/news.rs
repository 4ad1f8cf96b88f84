//! Tool for recent news about a company or ticker

use async_trait::async_trait;
use invest_core::{Error as CoreError, Result as CoreResult, Tool};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::config::{NewsDefaults, ReporterConfig};
use crate::error::Result;
use crate::http::build_http_client;
use crate::news::{NewsQuery, NewsRetriever};

/// Searches the news feed and returns the rendered result
pub struct NewsSearchTool {
    retriever: NewsRetriever,
    defaults: NewsDefaults,
}

#[derive(Debug, Deserialize)]
struct NewsParams {
    query: String,
    #[serde(default)]
    max_results: Option<i64>,
    #[serde(default)]
    days: Option<u32>,
    #[serde(default)]
    language: Option<String>,
    #[serde(default)]
    region: Option<String>,
}

impl NewsSearchTool {
    pub const NAME: &'static str = "news_search";

    pub fn new(retriever: NewsRetriever, defaults: NewsDefaults) -> Self {
        Self {
            retriever,
            defaults,
        }
    }

    pub fn from_config(config: &ReporterConfig) -> Result<Self> {
        let client = build_http_client(config.request_timeout)?;
        let retriever = NewsRetriever::with_base_url(client, &config.endpoints.news);
        Ok(Self::new(retriever, config.news.clone()))
    }

    fn to_query(&self, params: NewsParams) -> CoreResult<NewsQuery> {
        let query = params.query.trim();
        if query.is_empty() {
            return Err(CoreError::InvalidInput("query must not be empty".to_string()));
        }

        Ok(NewsQuery::new(query)
            .max_results(
                params
                    .max_results
                    .unwrap_or(self.defaults.max_results as i64),
            )
            .days(params.days.unwrap_or(self.defaults.days))
            .language(params.language.unwrap_or_else(|| self.defaults.language.clone()))
            .region(params.region.unwrap_or_else(|| self.defaults.region.clone())))
    }
}

#[async_trait]
impl Tool for NewsSearchTool {
    async fn execute(&self, params: Value) -> CoreResult<Value> {
        let params: NewsParams = serde_json::from_value(params)
            .map_err(|e| CoreError::InvalidInput(format!("Invalid parameters: {e}")))?;
        let query = self.to_query(params)?;

        let search = self.retriever.search(&query).await;
        Ok(Value::String(search.render()))
    }

    fn name(&self) -> &str {
        Self::NAME
    }

    fn description(&self) -> &str {
        "Search recent news from reputable sources using Google News RSS and return a \
         structured list (title, source, published, url). Use it to gather news context \
         about a stock ticker/company."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "Search query, e.g. PETR4 Petrobras"
                },
                "max_results": {
                    "type": "integer",
                    "description": "Maximum number of news items to return",
                    "default": self.defaults.max_results
                },
                "days": {
                    "type": "integer",
                    "description": "Lookback window in days",
                    "default": self.defaults.days
                },
                "language": {
                    "type": "string",
                    "description": "Language code for results",
                    "default": self.defaults.language
                },
                "region": {
                    "type": "string",
                    "description": "Region code for results",
                    "default": self.defaults.region
                }
            },
            "required": ["query"]
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const FEED: &str = r#"<rss><channel>
        <item><title>Petrobras anuncia dividendos</title><link>https://n.example/1</link></item>
        <item><title>Quanto renderia investir em PETR4</title><link>https://n.example/2</link></item>
        <item><title>Petrobras eleva produção</title><link>https://n.example/3</link></item>
    </channel></rss>"#;

    fn tool_for(server: &MockServer) -> NewsSearchTool {
        NewsSearchTool::new(
            NewsRetriever::with_base_url(reqwest::Client::new(), &server.uri()),
            NewsDefaults::default(),
        )
    }

    #[tokio::test]
    async fn test_execute_with_defaults() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rss/search"))
            .and(query_param("q", "PETR4 Petrobras when:30d"))
            .and(query_param("hl", "pt-BR"))
            .respond_with(ResponseTemplate::new(200).set_body_string(FEED))
            .expect(1)
            .mount(&server)
            .await;

        let output = tool_for(&server)
            .execute(json!({"query": "PETR4 Petrobras"}))
            .await
            .unwrap();

        let rendered: Value = serde_json::from_str(output.as_str().unwrap()).unwrap();
        let items = rendered["items"].as_array().unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[1]["title"], "Petrobras eleva produção");
    }

    #[tokio::test]
    async fn test_execute_with_overrides() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("q", "VALE3 when:7d"))
            .and(query_param("gl", "US"))
            .and(query_param("hl", "en-US"))
            .respond_with(ResponseTemplate::new(200).set_body_string(FEED))
            .expect(1)
            .mount(&server)
            .await;

        let output = tool_for(&server)
            .execute(json!({
                "query": "VALE3",
                "max_results": 1,
                "days": 7,
                "language": "en-US",
                "region": "US"
            }))
            .await
            .unwrap();

        let rendered: Value = serde_json::from_str(output.as_str().unwrap()).unwrap();
        assert_eq!(rendered["items"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_no_items_is_not_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string("<rss><channel></channel></rss>"),
            )
            .mount(&server)
            .await;

        let output = tool_for(&server)
            .execute(json!({"query": "XPTO3"}))
            .await
            .unwrap();
        assert!(output.as_str().unwrap().starts_with("No news found for query='XPTO3'"));
    }

    #[tokio::test]
    async fn test_missing_query_is_invalid() {
        let server = MockServer::start().await;
        let tool = tool_for(&server);

        assert!(matches!(
            tool.execute(json!({"days": 3})).await,
            Err(CoreError::InvalidInput(_))
        ));
        assert!(matches!(
            tool.execute(json!({"query": ""})).await,
            Err(CoreError::InvalidInput(_))
        ));
    }
}
