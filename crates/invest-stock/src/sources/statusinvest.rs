//! StatusInvest: indicator cards with an `h3` title and a `.value` block

use async_trait::async_trait;
use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;

use super::{
    ExtractError, Extraction, RawFieldMap, SourceExtractor, element_text, ensure_alphanumeric,
    fetch_first_candidate, has_class, is_fund_ticker,
};
use crate::fundamentals::Metric;
use crate::mapper::{FieldKind, FieldRule};
use crate::normalize::normalize_title;

static HEADING: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("h3").expect("valid selector"));
static VALUE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".value").expect("valid selector"));

/// Raw label → card titles to look for, in preference order
const INDICATORS: &[(&str, &[&str])] = &[
    ("Valor atual", &["Valor atual"]),
    ("Variação (12M)", &["Valorização (12m)", "Variação (12m)"]),
    ("P/L", &["P/L"]),
    ("P/VP", &["P/VP"]),
    ("Dividend Yield", &["Dividend Yield", "D.Y"]),
    ("Valor de mercado", &["Valor de mercado"]),
    ("M. Líquida", &["M. Líquida", "Margem líquida"]),
    ("Patrimônio líquido", &["Patrimônio líquido", "Patrimônio"]),
    ("Liquidez média diária", &["Liquidez média diária"]),
    ("Último rendimento", &["Último rendimento"]),
];

const FIELDS: &[FieldRule] = &[
    FieldRule::new(
        Metric::CurrentPrice,
        &["Valor atual"],
        FieldKind::LocaleFloat,
    ),
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
        Metric::MarketCap,
        &["Valor de mercado"],
        FieldKind::LocaleInt,
    ),
    FieldRule::new(
        Metric::ProfitMargins,
        &["M. Líquida"],
        FieldKind::LocalePercent,
    ),
    FieldRule::new(
        Metric::NetAssets,
        &["Patrimônio líquido"],
        FieldKind::LocaleInt,
    ),
    FieldRule::new(
        Metric::AverageDailyLiquidity,
        &["Liquidez média diária"],
        FieldKind::LocaleFloat,
    ),
    FieldRule::new(
        Metric::LastDividend,
        &["Último rendimento"],
        FieldKind::LocaleFloat,
    ),
];

/// StatusInvest scraper (`/acoes/{t}` and `/fundos-imobiliarios/{t}`)
pub struct StatusInvestSource {
    client: reqwest::Client,
    base_url: String,
}

impl StatusInvestSource {
    pub const NAME: &'static str = "statusinvest";
    pub const DEFAULT_BASE_URL: &'static str = "https://statusinvest.com.br";

    /// Create against the configured endpoint or a mock server
    pub fn with_base_url(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn candidate_urls(&self, papel: &str) -> Vec<String> {
        let lower = papel.to_lowercase();
        let stock = format!("{}/acoes/{lower}", self.base_url);
        let fund = format!("{}/fundos-imobiliarios/{lower}", self.base_url);
        if is_fund_ticker(papel) {
            vec![fund, stock]
        } else {
            vec![stock, fund]
        }
    }
}

#[async_trait]
impl SourceExtractor for StatusInvestSource {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn mapping(&self) -> &'static [FieldRule] {
        FIELDS
    }

    async fn fetch(&self, ticker: &str, _period: &str) -> Result<Extraction, ExtractError> {
        let papel = self.ticker_for(ticker);
        ensure_alphanumeric(Self::NAME, &papel)?;

        let urls = self.candidate_urls(&papel);
        let (url, raw) =
            fetch_first_candidate(&self.client, Self::NAME, &urls, extract_indicators).await?;

        Ok(Extraction {
            url,
            ticker: papel,
            raw,
            price_metrics: None,
        })
    }
}

/// Read every known indicator card from a page
pub fn extract_indicators(html: &str) -> RawFieldMap {
    let document = Html::parse_document(html);
    INDICATORS
        .iter()
        .filter_map(|(label, titles)| {
            find_indicator_any(&document, titles).map(|value| ((*label).to_string(), value))
        })
        .collect()
}

/// First non-empty value among `titles`
pub fn find_indicator_any(document: &Html, titles: &[&str]) -> Option<String> {
    titles
        .iter()
        .find_map(|title| find_indicator(document, title))
}

/// Value for the first `h3` whose normalized text equals or starts with the
/// normalized `title`.
///
/// The value is the first `.value` inside the enclosing `div.item`. Without
/// one, the first `.value` after the heading's parent in document order is
/// used.
pub fn find_indicator(document: &Html, title: &str) -> Option<String> {
    let wanted = normalize_title(title);
    if wanted.is_empty() {
        return None;
    }

    let heading = document.select(&HEADING).find(|h| {
        let got = normalize_title(&element_text(*h, " "));
        !got.is_empty() && got.starts_with(&wanted)
    })?;

    let item = heading
        .ancestors()
        .filter_map(ElementRef::wrap)
        .find(|e| e.value().name() == "div" && has_class(*e, "item"));
    if let Some(value) = item.and_then(|item| item.select(&VALUE).next()) {
        return non_empty(element_text(value, " "));
    }

    let container = heading.parent()?;
    document
        .tree
        .root()
        .descendants()
        .skip_while(|node| node.id() != container.id())
        .skip(1)
        .filter_map(ElementRef::wrap)
        .find(|e| has_class(*e, "value"))
        .and_then(|value| non_empty(element_text(value, " ")))
}

fn non_empty(text: String) -> Option<String> {
    (!text.is_empty()).then_some(text)
}
