//! News search over the Google News RSS feed
//!
//! Entries are read in feed order. "What if you had invested" style
//! clickbait is dropped before counting toward the limit.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use tracing::{debug, warn};
use url::Url;

use crate::error::{Result, StockError};

pub const DEFAULT_BASE_URL: &str = "https://news.google.com";
pub const DEFAULT_LANGUAGE: &str = "pt-BR";
pub const DEFAULT_REGION: &str = "BR";
pub const DEFAULT_DAYS: u32 = 30;
pub const DEFAULT_MAX_RESULTS: usize = 10;

static EXCLUDED_TITLE: LazyLock<Regex> = LazyLock::new(|| {
    let patterns = [
        r"\bquanto\s+ganharia\b",
        r"\bquanto\s+renderia\b",
        r"\bse\s+(?:voce|você)\s+tivesse\s+investido\b",
        r"\bse\s+tivesse\s+investido\b",
        r"\bsimulador\b",
        r"\bsimula(?:c|ç)\b",
    ];
    Regex::new(&format!("(?i){}", patterns.join("|"))).expect("valid exclusion patterns")
});

/// Whether a headline is simulator/clickbait noise
pub fn is_excluded(title: &str) -> bool {
    EXCLUDED_TITLE.is_match(title)
}

/// Parameters of one news search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsQuery {
    pub query: String,
    /// Values ≤ 0 fall back to the default of 10
    pub max_results: i64,
    /// Lookback window in days
    pub days: u32,
    pub language: String,
    pub region: String,
}

impl NewsQuery {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            max_results: DEFAULT_MAX_RESULTS as i64,
            days: DEFAULT_DAYS,
            language: DEFAULT_LANGUAGE.to_string(),
            region: DEFAULT_REGION.to_string(),
        }
    }

    pub fn max_results(mut self, max_results: i64) -> Self {
        self.max_results = max_results;
        self
    }

    pub fn days(mut self, days: u32) -> Self {
        self.days = days;
        self
    }

    pub fn language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    pub fn region(mut self, region: impl Into<String>) -> Self {
        self.region = region.into();
        self
    }

    /// Limit actually applied
    pub fn effective_max_results(&self) -> usize {
        usize::try_from(self.max_results)
            .ok()
            .filter(|n| *n > 0)
            .unwrap_or(DEFAULT_MAX_RESULTS)
    }
}

/// One accepted headline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsItem {
    pub title: String,
    pub source: Option<String>,
    /// As published by the feed, unparsed
    pub published: Option<String>,
    pub url: Option<String>,
}

/// Outcome of a search. Failures are recorded, never raised.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewsSearch {
    pub query: String,
    pub rss_url: String,
    pub items: Vec<NewsItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl NewsSearch {
    /// Text handed to downstream agents; a placeholder when nothing qualified
    pub fn render(&self) -> String {
        if self.items.is_empty() {
            return format!(
                "No news found for query='{}'. RSS url={}",
                self.query, self.rss_url
            );
        }
        serde_json::to_string_pretty(self).unwrap_or_else(|e| format!("{self:?} ({e})"))
    }
}

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    items: Vec<FeedEntry>,
}

#[derive(Debug, Deserialize)]
struct FeedEntry {
    #[serde(default)]
    title: String,
    link: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    source: Option<FeedSource>,
}

#[derive(Debug, Deserialize)]
struct FeedSource {
    #[serde(rename = "$text", default)]
    name: String,
}

impl From<FeedEntry> for NewsItem {
    fn from(entry: FeedEntry) -> Self {
        Self {
            title: entry.title.trim().to_string(),
            source: entry
                .source
                .map(|s| s.name.trim().to_string())
                .filter(|s| !s.is_empty()),
            published: entry.pub_date,
            url: entry.link,
        }
    }
}

/// Client for the RSS search endpoint
pub struct NewsRetriever {
    client: reqwest::Client,
    base_url: String,
}

impl NewsRetriever {
    /// Create against the configured endpoint or a mock server
    pub fn with_base_url(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// `{base}/rss/search?q=<query> when:<days>d&hl=..&gl=..&ceid=<region>:<lang>`
    pub fn feed_url(&self, query: &NewsQuery) -> Result<Url> {
        Url::parse_with_params(
            &format!("{}/rss/search", self.base_url),
            &[
                ("q", format!("{} when:{}d", query.query, query.days)),
                ("hl", query.language.clone()),
                ("gl", query.region.clone()),
                ("ceid", format!("{}:{}", query.region, query.language)),
            ],
        )
        .map_err(|e| StockError::ConfigError(format!("invalid news url: {e}")))
    }

    /// Search the feed. Transport and parse failures produce an empty result
    /// carrying the error.
    pub async fn search(&self, query: &NewsQuery) -> NewsSearch {
        let mut search = NewsSearch {
            query: query.query.clone(),
            rss_url: String::new(),
            items: Vec::new(),
            error: None,
        };

        let url = match self.feed_url(query) {
            Ok(url) => url,
            Err(e) => {
                warn!(query = %query.query, error = %e, "Cannot build news url");
                search.error = Some(e.to_string());
                return search;
            }
        };
        search.rss_url = url.to_string();

        match self.fetch_entries(url).await {
            Ok(entries) => {
                let limit = query.effective_max_results();
                let total = entries.len();
                search.items = entries
                    .into_iter()
                    .filter(|entry| !is_excluded(&entry.title))
                    .take(limit)
                    .map(NewsItem::from)
                    .collect();
                debug!(
                    query = %query.query,
                    total,
                    accepted = search.items.len(),
                    "News feed filtered"
                );
            }
            Err(e) => {
                warn!(query = %query.query, error = %e, "News search failed");
                search.error = Some(e.to_string());
            }
        }

        search
    }

    async fn fetch_entries(&self, url: Url) -> Result<Vec<FeedEntry>> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(StockError::ApiError(format!(
                "rss status={}",
                status.as_u16()
            )));
        }

        let body = response.text().await?;
        parse_feed(&body)
    }
}

fn parse_feed(xml: &str) -> Result<Vec<FeedEntry>> {
    let rss: Rss = quick_xml::de::from_str(xml)
        .map_err(|e| StockError::InvalidFeed(e.to_string()))?;
    Ok(rss.channel.items)
}
