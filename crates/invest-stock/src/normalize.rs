//! Locale-aware number parsing
//!
//! Brazilian finance sites print numbers as `1.234,56`, prefix currency with
//! `R$`, and mix in `%` signs and non-breaking spaces. Everything here is pure
//! and total: bad input yields `None`, never a panic.

use regex::Regex;
use std::sync::LazyLock;
use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

static SCALED_AMOUNT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:R\$)?\s*([-+]?[0-9.,]+)\s*(\p{L}*)\.?\s*$")
        .expect("valid scaled amount regex")
});

/// Parse a pt-BR formatted number (`"R$ 1.234,56"`, `"12,5%"`) into a float.
pub fn parse_locale_float(input: Option<&str>) -> Option<f64> {
    let s = input?;
    if s.is_empty() {
        return None;
    }

    let cleaned = s
        .replace('.', "")
        .replace("R$", "")
        .replace('%', "")
        .replace(' ', "")
        .replace('\u{a0}', "")
        .replace(',', ".");

    let value = cleaned.parse::<f64>().ok()?;
    value.is_finite().then_some(value)
}

/// Parse a pt-BR percentage into a fraction: `"12,5%"` becomes `0.125`.
pub fn parse_locale_percent(input: Option<&str>) -> Option<f64> {
    parse_locale_float(input).map(|v| v / 100.0)
}

/// Parse a pt-BR number and truncate it toward zero.
pub fn parse_locale_int(input: Option<&str>) -> Option<i64> {
    parse_locale_float(input).map(|v| v.trunc() as i64)
}

/// Parse an amount with a magnitude suffix, e.g. `"R$ 12,34 M"` or
/// `"1,2 Bilhões"`, into its absolute value.
pub fn parse_scaled_amount(input: Option<&str>) -> Option<f64> {
    let s = input?;
    let caps = SCALED_AMOUNT.captures(s)?;
    let base = parse_locale_float(caps.get(1).map(|m| m.as_str()))?;
    let suffix = caps.get(2).map_or("", |m| m.as_str()).to_lowercase();

    let multiplier = match suffix.as_str() {
        "" => 1.0,
        "k" | "mil" => 1e3,
        "m" | "mi" | "mm" | "milhão" | "milhao" | "milhões" | "milhoes" => 1e6,
        "b" | "bi" | "bilhão" | "bilhao" | "bilhões" | "bilhoes" => 1e9,
        "t" | "tri" | "trilhão" | "trilhao" | "trilhões" | "trilhoes" => 1e12,
        _ => return None,
    };

    Some(base * multiplier)
}

/// Parse a plain (`.` decimal) number as emitted by JSON APIs.
pub fn parse_plain_float(input: Option<&str>) -> Option<f64> {
    let value = input?.trim().parse::<f64>().ok()?;
    value.is_finite().then_some(value)
}

/// Accent-stripped, lowercased, alphanumeric-only form of a heading.
///
/// `"Dividend Yield"` and `"DIVIDEND  YIELD "` both become `"dividendyield"`;
/// `"M. Líquida"` becomes `"mliquida"`.
pub fn normalize_title(s: &str) -> String {
    s.nfkd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .filter(|c| c.is_alphanumeric())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_locale_float() {
        assert_eq!(parse_locale_float(Some("1.234,56")), Some(1234.56));
        assert_eq!(parse_locale_float(Some("R$ 10,00")), Some(10.0));
        assert_eq!(parse_locale_float(Some("R$\u{a0}7,5")), Some(7.5));
        assert_eq!(parse_locale_float(Some("-3,2")), Some(-3.2));
        assert_eq!(parse_locale_float(Some("12,5%")), Some(12.5));
    }

    #[test]
    fn test_parse_locale_float_rejects() {
        assert_eq!(parse_locale_float(Some("")), None);
        assert_eq!(parse_locale_float(None), None);
        assert_eq!(parse_locale_float(Some("-")), None);
        assert_eq!(parse_locale_float(Some("n/a")), None);
        assert_eq!(parse_locale_float(Some("inf")), None);
        assert_eq!(parse_locale_float(Some("NaN")), None);
    }

    #[test]
    fn test_parse_locale_percent() {
        assert_eq!(parse_locale_percent(Some("12,5%")), Some(0.125));
        assert_eq!(parse_locale_percent(Some("")), None);
        assert_eq!(parse_locale_percent(None), None);
    }

    #[test]
    fn test_parse_locale_int() {
        assert_eq!(parse_locale_int(Some("412.345.678.901")), Some(412_345_678_901));
        assert_eq!(parse_locale_int(Some("9,99")), Some(9));
        assert_eq!(parse_locale_int(Some("-9,99")), Some(-9));
        assert_eq!(parse_locale_int(Some("infinity")), None);
        assert_eq!(parse_locale_int(None), None);
    }

    #[test]
    fn test_parse_scaled_amount() {
        assert_eq!(parse_scaled_amount(Some("R$ 12,34 M")), Some(12_340_000.0));
        assert_eq!(parse_scaled_amount(Some("R$ 850,00 K")), Some(850_000.0));
        assert_eq!(parse_scaled_amount(Some("1,5 Bilhões")), Some(1_500_000_000.0));
        assert_eq!(parse_scaled_amount(Some("R$ 1.000,00")), Some(1000.0));
        assert_eq!(parse_scaled_amount(Some("12 parsecs")), None);
        assert_eq!(parse_scaled_amount(None), None);
    }

    #[test]
    fn test_parse_plain_float() {
        assert_eq!(parse_plain_float(Some("12.5")), Some(12.5));
        assert_eq!(parse_plain_float(Some("0.0731")), Some(0.0731));
        assert_eq!(parse_plain_float(Some("abc")), None);
    }

    #[test]
    fn test_normalize_title() {
        assert_eq!(normalize_title("Dividend Yield"), "dividendyield");
        assert_eq!(normalize_title("M. Líquida"), "mliquida");
        assert_eq!(normalize_title("  P/VP "), "pvp");
        assert_eq!(normalize_title("Patrimônio Líquido"), "patrimonioliquido");
    }
}
