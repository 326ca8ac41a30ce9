//! Display formatting and value normalization helpers.
//!
//! Everything here is pure: no I/O, no state.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::Value;

/// Label used when a category is blank.
pub const UNCATEGORIZED: &str = "Uncategorized";

/// Shown in place of a missing or unparseable date.
pub const DATE_PLACEHOLDER: &str = "N/A";

/// Parse a monetary value from a JSON field.
///
/// Numbers are taken as-is. Strings have every character other than ASCII
/// digits, `.` and `-` stripped before parsing, so `"€1,200.50"` becomes
/// `1200.5`. Anything else, or anything that fails to parse, is `0.0`.
#[must_use]
pub fn parse_money(value: &Value) -> f64 {
    match value {
        Value::Number(n) => n.as_f64().filter(|v| v.is_finite()).unwrap_or(0.0),
        Value::String(s) => parse_money_str(s),
        _ => 0.0,
    }
}

/// String half of [`parse_money`].
#[must_use]
pub fn parse_money_str(raw: &str) -> f64 {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();
    cleaned
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .unwrap_or(0.0)
}

/// Format an amount as whole euros with thousands separators.
///
/// ```
/// use plantrack_core::format::format_currency;
/// assert_eq!(format_currency(1_234_567.8), "€1,234,568");
/// assert_eq!(format_currency(-950.0), "-€950");
/// ```
#[must_use]
pub fn format_currency(amount: f64) -> String {
    let rounded = if amount.is_finite() { amount.round() } else { 0.0 };
    let negative = rounded < 0.0;
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let whole = rounded.abs() as u64;

    let digits = whole.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    if negative {
        format!("-€{grouped}")
    } else {
        format!("€{grouped}")
    }
}

/// Format a date string as `15 Jan 2024`.
///
/// Accepts RFC 3339 timestamps, bare `YYYY-MM-DD` dates and zone-less
/// `YYYY-MM-DDTHH:MM:SS` timestamps. Returns [`DATE_PLACEHOLDER`] otherwise.
#[must_use]
pub fn format_date(raw: &str) -> String {
    parse_date(raw).map_or_else(
        || DATE_PLACEHOLDER.to_string(),
        |date| date.format("%-d %b %Y").to_string(),
    )
}

/// Parse the date forms accepted by [`format_date`].
#[must_use]
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.date_naive());
    }
    if let Ok(ts) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(ts.date());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()
}

/// Trim and collapse internal whitespace; blank input becomes [`UNCATEGORIZED`].
#[must_use]
pub fn normalize_category(raw: &str) -> String {
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        UNCATEGORIZED.to_string()
    } else {
        collapsed
    }
}

/// First `max` characters of `s`, never splitting a code point.
#[must_use]
pub fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn money_strings_are_stripped_before_parsing() {
        assert!((parse_money(&json!("€1,200.50")) - 1200.5).abs() < f64::EPSILON);
        assert!((parse_money(&json!("1200")) - 1200.0).abs() < f64::EPSILON);
        assert!((parse_money(&json!(1200.5)) - 1200.5).abs() < f64::EPSILON);
        assert!(parse_money(&Value::Null).abs() < f64::EPSILON);
    }

    #[test]
    fn unparseable_money_is_zero() {
        assert!(parse_money_str("TBC").abs() < f64::EPSILON);
        assert!(parse_money_str("1.2.3").abs() < f64::EPSILON);
        assert!(parse_money(&json!(true)).abs() < f64::EPSILON);
        assert!((parse_money_str("-€40") + 40.0).abs() < f64::EPSILON);
    }

    #[test]
    fn currency_groups_thousands() {
        assert_eq!(format_currency(0.0), "€0");
        assert_eq!(format_currency(999.4), "€999");
        assert_eq!(format_currency(1000.0), "€1,000");
        assert_eq!(format_currency(12_500_000.0), "€12,500,000");
        assert_eq!(format_currency(f64::NAN), "€0");
    }

    #[test]
    fn dates_accept_common_shapes() {
        assert_eq!(format_date("2024-01-15"), "15 Jan 2024");
        assert_eq!(format_date("2024-01-15T09:30:00"), "15 Jan 2024");
        assert_eq!(format_date("2024-01-15T09:30:00Z"), "15 Jan 2024");
        assert_eq!(format_date("2023-11-02T23:59:59+01:00"), "2 Nov 2023");
        assert_eq!(format_date(""), DATE_PLACEHOLDER);
        assert_eq!(format_date("last tuesday"), DATE_PLACEHOLDER);
    }

    #[test]
    fn categories_are_collapsed() {
        assert_eq!(normalize_category("  Retail   Unit "), "Retail Unit");
        assert_eq!(normalize_category("   "), UNCATEGORIZED);
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        assert_eq!(truncate_chars("héllo wörld", 7), "héllo w");
        assert_eq!(truncate_chars("short", 30), "short");
        assert_eq!(truncate_chars("", 3), "");
    }
}
