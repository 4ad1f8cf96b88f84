//! Investidor10: FAQ answers from JSON-LD plus page text, read with regexes

use async_trait::async_trait;
use regex::Regex;
use scraper::{Html, Selector};
use serde_json::Value;
use std::sync::LazyLock;

use super::{
    ExtractError, Extraction, RawFieldMap, SourceExtractor, ensure_alphanumeric,
    fetch_first_candidate, is_fund_ticker,
};
use crate::fundamentals::Metric;
use crate::mapper::{FieldKind, FieldRule};

static LD_JSON: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"script[type="application/ld+json"]"#).expect("valid selector")
});

/// How a regex match is turned into the raw value
#[derive(Debug, Clone, Copy)]
enum Capture {
    /// First group, trimmed
    Plain,
    /// First group with `%` appended
    Percent,
    /// `R$ <amount> <suffix>` from two groups
    ScaledCurrency,
}

struct TextRule {
    label: &'static str,
    pattern: Regex,
    capture: Capture,
}

impl TextRule {
    fn new(label: &'static str, pattern: &str, capture: Capture) -> Self {
        Self {
            label,
            pattern: Regex::new(pattern).expect("valid pattern"),
            capture,
        }
    }

    fn apply(&self, text: &str) -> Option<String> {
        let caps = self.pattern.captures(text)?;
        let first = caps.get(1)?.as_str().trim();
        let value = match self.capture {
            Capture::Plain => first.to_string(),
            Capture::Percent => format!("{first}%"),
            Capture::ScaledCurrency => format!("R$ {first} {}", caps.get(2)?.as_str()),
        };
        (!first.is_empty()).then_some(value)
    }
}

static TEXT_RULES: LazyLock<Vec<TextRule>> = LazyLock::new(|| {
    vec![
        TextRule::new(
            "Preço",
            r"(?is)está cotad[oa]\s+a\s+R\$\s*([0-9\.]+,[0-9]{2})",
            Capture::Plain,
        ),
        TextRule::new(
            "Variação (12M)",
            r"(?is)variaç[aã]o\s+de\s*([\-\+]?[0-9\.]+,[0-9]{1,2}|[\-\+]?[0-9\.]+)\s*%",
            Capture::Percent,
        ),
        TextRule::new(
            "P/L",
            r"(?is)P\s*/\s*L\s+de\s*([0-9\.]+,[0-9]{1,2}|[0-9\.]+)",
            Capture::Plain,
        ),
        TextRule::new(
            "P/VP",
            r"(?is)P\s*/\s*VP\s+de\s*([0-9\.]+,[0-9]{1,2}|[0-9\.]+)",
            Capture::Plain,
        ),
        TextRule::new(
            "Dividend Yield",
            r"(?is)Dividend\s*Yield[^0-9%]*([0-9\.]+,[0-9]{1,2}|[0-9\.]+)\s*%",
            Capture::Percent,
        ),
        TextRule::new(
            "Dividendos (12m)",
            r"(?is)Nos\s+últimos\s+12\s+meses,\s+distribuiu\s+um\s+total\s+de\s*R\$\s*([0-9\.]+,[0-9]{2})",
            Capture::Plain,
        ),
        TextRule::new(
            "Liquidez Diária",
            r"(?is)Liquidez\s*Di[áa]ria\s*R\$\s*([0-9\.]+,[0-9]{2})\s*([MK])",
            Capture::ScaledCurrency,
        ),
    ]
});

const FIELDS: &[FieldRule] = &[
    FieldRule::new(Metric::CurrentPrice, &["Preço"], FieldKind::LocaleFloat),
    FieldRule::new(
        Metric::PriceChange12m,
        &["Variação (12M)"],
        FieldKind::LocalePercent,
    ),
    FieldRule::new(Metric::TrailingPe, &["P/L"], FieldKind::LocaleFloat),
    FieldRule::new(Metric::PriceToBook, &["P/VP"], FieldKind::LocaleFloat),
    FieldRule::new(
        Metric::DividendYield,
        &["Dividend Yield"],
        FieldKind::LocalePercent,
    ),
    FieldRule::new(
        Metric::DividendsLast12m,
        &["Dividendos (12m)"],
        FieldKind::LocaleFloat,
    ),
    FieldRule::new(
        Metric::AverageDailyLiquidity,
        &["Liquidez Diária"],
        FieldKind::ScaledAmount,
    ),
];

/// Investidor10 scraper (`/acoes/{t}/` or `/fiis/{t}/`)
pub struct Investidor10Source {
    client: reqwest::Client,
    base_url: String,
}

impl Investidor10Source {
    pub const NAME: &'static str = "investidor10";
    pub const DEFAULT_BASE_URL: &'static str = "https://investidor10.com.br";

    /// Create against the configured endpoint or a mock server
    pub fn with_base_url(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn page_url(&self, papel: &str) -> String {
        let kind = if is_fund_ticker(papel) { "fiis" } else { "acoes" };
        format!("{}/{kind}/{}/", self.base_url, papel.to_lowercase())
    }
}

#[async_trait]
impl SourceExtractor for Investidor10Source {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn mapping(&self) -> &'static [FieldRule] {
        FIELDS
    }

    async fn fetch(&self, ticker: &str, _period: &str) -> Result<Extraction, ExtractError> {
        let papel = self.ticker_for(ticker);
        ensure_alphanumeric(Self::NAME, &papel)?;

        let urls = [self.page_url(&papel)];
        let (url, raw) =
            fetch_first_candidate(&self.client, Self::NAME, &urls, extract_from_text).await?;

        Ok(Extraction {
            url,
            ticker: papel,
            raw,
            price_metrics: None,
        })
    }
}

/// Apply the text rules to the FAQ answers followed by the visible page text
pub fn extract_from_text(html: &str) -> RawFieldMap {
    let document = Html::parse_document(html);

    let faq = faq_answers(&document);
    let page = visible_text(&document);
    let combined = if faq.is_empty() {
        page
    } else {
        format!("{}\n{page}", faq.join("\n"))
    };

    TEXT_RULES
        .iter()
        .filter_map(|rule| {
            rule.apply(&combined)
                .map(|value| (rule.label.to_string(), value))
        })
        .collect()
}

/// `acceptedAnswer.text` of every `FAQPage` JSON-LD block. Malformed blocks
/// are skipped.
fn faq_answers(document: &Html) -> Vec<String> {
    let mut answers = Vec::new();

    for script in document.select(&LD_JSON) {
        let body: String = script.text().collect();
        let Ok(data) = serde_json::from_str::<Value>(body.trim()) else {
            continue;
        };

        let objects: Vec<&Value> = match &data {
            Value::Array(items) => items.iter().filter(|v| v.is_object()).collect(),
            Value::Object(_) => vec![&data],
            _ => continue,
        };

        for obj in objects {
            if obj.get("@type").and_then(Value::as_str) != Some("FAQPage") {
                continue;
            }
            let Some(entities) = obj.get("mainEntity").and_then(Value::as_array) else {
                continue;
            };
            answers.extend(
                entities
                    .iter()
                    .filter_map(|q| q.get("acceptedAnswer")?.get("text")?.as_str())
                    .filter(|t| !t.trim().is_empty())
                    .map(str::to_string),
            );
        }
    }

    answers
}

/// Trimmed text nodes joined by newlines, skipping script and style content
fn visible_text(document: &Html) -> String {
    document
        .tree
        .root()
        .descendants()
        .filter_map(|node| {
            let text = node.value().as_text()?;
            let parent = node.parent()?;
            let hidden = parent
                .value()
                .as_element()
                .is_some_and(|e| matches!(e.name(), "script" | "style" | "noscript"));
            (!hidden).then(|| text.trim())
        })
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
