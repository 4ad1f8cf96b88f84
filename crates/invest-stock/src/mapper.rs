//! Mapping from per-source labels to canonical metrics

use crate::fundamentals::{CanonicalFundamentals, Metric, MetricValue};
use crate::normalize::{
    parse_locale_float, parse_locale_int, parse_locale_percent, parse_plain_float,
    parse_scaled_amount,
};
use crate::report::SourceData;
use crate::sources::{Extraction, RawFieldMap};

/// How a raw value is normalized
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// `"1.234,56"` / `"R$ 10,00"`
    LocaleFloat,
    /// `"12,5%"` into a fraction
    LocalePercent,
    /// Locale number truncated to an integer
    LocaleInt,
    /// Locale amount with magnitude suffix (`"R$ 12,3 M"`)
    ScaledAmount,
    /// Passed through trimmed
    Text,
    /// `.`-decimal number from a JSON API
    PlainFloat,
    /// `.`-decimal number from a JSON API, truncated
    PlainInt,
}

impl FieldKind {
    fn apply(self, raw: &str) -> Option<MetricValue> {
        let raw = Some(raw);
        match self {
            FieldKind::LocaleFloat => parse_locale_float(raw).map(MetricValue::Float),
            FieldKind::LocalePercent => parse_locale_percent(raw).map(MetricValue::Float),
            FieldKind::LocaleInt => parse_locale_int(raw).map(MetricValue::Int),
            FieldKind::ScaledAmount => parse_scaled_amount(raw).map(MetricValue::Float),
            FieldKind::PlainFloat => parse_plain_float(raw).map(MetricValue::Float),
            FieldKind::PlainInt => {
                parse_plain_float(raw).map(|v| MetricValue::Int(v.trunc() as i64))
            }
            FieldKind::Text => raw
                .map(str::trim)
                .filter(|s| !s.is_empty() && *s != "-")
                .map(|s| MetricValue::Text(s.to_string())),
        }
    }
}

/// One canonical metric and the source labels that may carry it, in
/// preference order
#[derive(Debug, Clone, Copy)]
pub struct FieldRule {
    pub metric: Metric,
    pub labels: &'static [&'static str],
    pub kind: FieldKind,
}

impl FieldRule {
    pub const fn new(metric: Metric, labels: &'static [&'static str], kind: FieldKind) -> Self {
        Self {
            metric,
            labels,
            kind,
        }
    }
}

/// Map a raw field map into canonical fundamentals.
///
/// For each rule the first label whose value normalizes successfully wins.
/// Metrics with no usable label stay absent.
pub fn map_fields(raw: &RawFieldMap, rules: &[FieldRule]) -> CanonicalFundamentals {
    let mut out = CanonicalFundamentals::new();
    for rule in rules {
        if out.contains(rule.metric) {
            continue;
        }
        let value = rule
            .labels
            .iter()
            .filter_map(|label| raw.get(*label))
            .find_map(|v| rule.kind.apply(v));
        out.set(rule.metric, value);
    }
    out
}

/// Map an extraction, keeping its raw fields and URL alongside
pub fn to_source_data(extraction: Extraction, rules: &[FieldRule]) -> SourceData {
    let mapped = map_fields(&extraction.raw, rules);
    SourceData {
        source_url: extraction.url,
        ticker: extraction.ticker,
        raw: extraction.raw,
        mapped,
        price_metrics: extraction.price_metrics,
    }
}
