//! Fundamentus: label/value table pages
//!
//! Every indicator sits in a `<td class="label">` cell whose next sibling
//! cell holds the value.

use async_trait::async_trait;
use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;

use super::{
    ExtractError, Extraction, RawFieldMap, SourceExtractor, element_text, ensure_alphanumeric,
    fetch_first_candidate, is_fund_ticker,
};
use crate::fundamentals::Metric;
use crate::mapper::{FieldKind, FieldRule};

static LABEL_CELL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("td.label").expect("valid selector"));
static LABEL_TEXT: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("span.txt").expect("valid selector"));

const FIELDS: &[FieldRule] = &[
    FieldRule::new(Metric::CurrentPrice, &["Cotação"], FieldKind::LocaleFloat),
    FieldRule::new(Metric::TrailingPe, &["P/L"], FieldKind::LocaleFloat),
    FieldRule::new(Metric::PriceToBook, &["P/VP"], FieldKind::LocaleFloat),
    FieldRule::new(
        Metric::DividendYield,
        &["Div. Yield"],
        FieldKind::LocalePercent,
    ),
    FieldRule::new(
        Metric::MarketCap,
        &["Valor de mercado"],
        FieldKind::LocaleInt,
    ),
    FieldRule::new(
        Metric::ProfitMargins,
        &["Marg. Líquida"],
        FieldKind::LocalePercent,
    ),
    FieldRule::new(
        Metric::AverageDailyLiquidity,
        &["Vol $ méd (2m)"],
        FieldKind::LocaleFloat,
    ),
    FieldRule::new(
        Metric::NetAssets,
        &["Patrim. Líq", "Patrim Líquido"],
        FieldKind::LocaleInt,
    ),
    FieldRule::new(
        Metric::DividendsLast12m,
        &["Dividendo/cota"],
        FieldKind::LocaleFloat,
    ),
    FieldRule::new(Metric::LastDividend, &["Últ rend."], FieldKind::LocaleFloat),
    FieldRule::new(Metric::Sector, &["Setor", "Segmento"], FieldKind::Text),
    FieldRule::new(Metric::Industry, &["Subsetor"], FieldKind::Text),
    FieldRule::new(Metric::ShortName, &["Empresa", "Nome"], FieldKind::Text),
    FieldRule::new(Metric::Symbol, &["Papel", "FII"], FieldKind::Text),
];

/// Fundamentus scraper (`detalhes.php` / `fii_detalhes.php`)
pub struct FundamentusSource {
    client: reqwest::Client,
    base_url: String,
}

impl FundamentusSource {
    pub const NAME: &'static str = "fundamentus";
    pub const DEFAULT_BASE_URL: &'static str = "https://www.fundamentus.com.br";

    /// Create against the configured endpoint or a mock server
    pub fn with_base_url(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Candidate pages, fund page first for `11` codes
    pub fn candidate_urls(&self, papel: &str) -> Vec<String> {
        let stock = format!("{}/detalhes.php?papel={papel}", self.base_url);
        let fund = format!("{}/fii_detalhes.php?papel={papel}", self.base_url);
        if is_fund_ticker(papel) {
            vec![fund, stock]
        } else {
            vec![stock, fund]
        }
    }
}

#[async_trait]
impl SourceExtractor for FundamentusSource {
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
            fetch_first_candidate(&self.client, Self::NAME, &urls, extract_label_table).await?;

        Ok(Extraction {
            url,
            ticker: papel,
            raw,
            price_metrics: None,
        })
    }
}

/// Collect `label → value` pairs from `td.label` cells. The first occurrence
/// of a label wins.
pub fn extract_label_table(html: &str) -> RawFieldMap {
    let document = Html::parse_document(html);
    let mut raw = RawFieldMap::new();

    for cell in document.select(&LABEL_CELL) {
        let label = label_text(cell);
        if label.is_empty() {
            continue;
        }

        let Some(value_cell) = cell.next_siblings().find_map(ElementRef::wrap) else {
            continue;
        };
        let value = element_text(value_cell, " ");
        if value.is_empty() {
            continue;
        }

        raw.entry(label).or_insert(value);
    }

    raw
}

fn label_text(cell: ElementRef<'_>) -> String {
    if let Some(span) = cell.select(&LABEL_TEXT).next() {
        return element_text(span, " ");
    }
    element_text(cell, " ")
        .trim_start_matches('?')
        .trim()
        .to_string()
}
