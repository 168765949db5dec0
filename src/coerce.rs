// 🧮 Cell Coercion - text cells to typed amounts and calendar days
//
// Every function here returns `None` on failure. Callers treat `None` as a
// null cell and drop the row; nothing in this module errors.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

// ============================================================================
// AMOUNTS
// ============================================================================

const CURRENCY_SYMBOLS: &[char] = &['$', '€', '£', '¥'];

/// Which character separates the fractional part in a currency amount.
/// The other one ("," or ".") is read as a thousands separator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecimalSeparator {
    #[default]
    Point,
    Comma,
}

impl DecimalSeparator {
    fn chars(&self) -> (char, char) {
        // (decimal, grouping)
        match self {
            DecimalSeparator::Point => ('.', ','),
            DecimalSeparator::Comma => (',', '.'),
        }
    }
}

/// Beyond this magnitude an f64 carries no cent digits to round.
const CENT_PRECISION_LIMIT: f64 = 1e15;

/// Amounts are stored at cent precision
pub fn round_cents(value: f64) -> f64 {
    if value.abs() >= CENT_PRECISION_LIMIT {
        return value;
    }
    let rounded = (value * 100.0).round() / 100.0;
    // normalize -0.0 so it never renders as "-0.00"
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}

/// Parse a bare number ("12.5", "-3", " 7.25 "). No currency handling.
pub fn parse_plain_amount(text: &str) -> Option<f64> {
    let value: f64 = text.trim().parse().ok()?;
    let rounded = round_cents(value);
    rounded.is_finite().then_some(rounded)
}

/// Parse a currency-formatted amount ("$1,234.50", "-$3.00", "€ 12").
///
/// Currency symbols and whitespace are stripped. Grouping separators must
/// split the integer part into proper groups of three digits; anything else
/// (e.g. "$3,00" under the point convention) is ambiguous and yields `None`.
pub fn parse_currency_amount(text: &str, decimal: DecimalSeparator) -> Option<f64> {
    let (point, group) = decimal.chars();

    let stripped: String = text
        .chars()
        .filter(|c| !CURRENCY_SYMBOLS.contains(c) && !c.is_whitespace())
        .collect();

    let (sign, body) = match stripped.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", stripped.strip_prefix('+').unwrap_or(stripped.as_str())),
    };

    let (int_part, frac_part) = match body.split_once(point) {
        Some((int_part, frac)) => (int_part, Some(frac)),
        None => (body, None),
    };

    if let Some(frac) = frac_part {
        if frac.is_empty() || !frac.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
    }

    if !valid_grouping(int_part, group) {
        return None;
    }

    let digits: String = int_part.chars().filter(|c| *c != group).collect();
    let normalized = match frac_part {
        Some(frac) => format!("{}{}.{}", sign, digits, frac),
        None => format!("{}{}", sign, digits),
    };

    parse_plain_amount(&normalized)
}

fn valid_grouping(int_part: &str, group: char) -> bool {
    if !int_part.contains(group) {
        return true;
    }

    let parts: Vec<&str> = int_part.split(group).collect();
    let Some((first, rest)) = parts.split_first() else {
        return false;
    };

    let all_digits = |s: &str| s.chars().all(|c| c.is_ascii_digit());

    (1..=3).contains(&first.len())
        && all_digits(first)
        && rest.iter().all(|g| g.len() == 3 && all_digits(g))
}

// ============================================================================
// DATES
// ============================================================================

/// Timestamp layouts seen in exports; the time part is discarded.
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%m/%d/%Y %I:%M:%S %p",
    "%m/%d/%Y %I:%M %p",
    "%m/%d/%y %H:%M:%S",
    "%m/%d/%y %H:%M",
    "%m/%d/%y %I:%M:%S %p",
    "%m/%d/%y %I:%M %p",
];

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%m/%d/%y",
    "%b %d, %Y",
    "%B %d, %Y",
    "%d-%b-%Y",
];

/// Parse a date or timestamp into a calendar day (month-first for slashes).
pub fn parse_day(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.date_naive());
    }

    let from_datetime = DATETIME_FORMATS.iter().find_map(|fmt| {
        NaiveDateTime::parse_from_str(text, fmt)
            .ok()
            .map(|dt| dt.date())
            .filter(plausible_year)
    });
    if from_datetime.is_some() {
        return from_datetime;
    }

    DATE_FORMATS.iter().find_map(|fmt| {
        NaiveDate::parse_from_str(text, fmt)
            .ok()
            .filter(plausible_year)
    })
}

// "%Y" happily reads "24" as year 24; let the "%y" layouts handle two-digit years
fn plausible_year(day: &NaiveDate) -> bool {
    day.year() >= 1000
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_plain_amount() {
        assert_eq!(parse_plain_amount("12.5"), Some(12.5));
        assert_eq!(parse_plain_amount(" -3 "), Some(-3.0));
        assert_eq!(parse_plain_amount("2.346"), Some(2.35));
    }

    #[test]
    fn test_plain_amount_rejects_formatting() {
        assert_eq!(parse_plain_amount("$5.00"), None);
        assert_eq!(parse_plain_amount("1,000"), None);
        assert_eq!(parse_plain_amount("abc"), None);
        assert_eq!(parse_plain_amount("inf"), None);
        assert_eq!(parse_plain_amount("NaN"), None);
        assert_eq!(parse_plain_amount("1e309"), None);
    }

    #[test]
    fn test_huge_amounts_stay_finite() {
        assert_eq!(parse_plain_amount("1e307"), Some(1e307));
        assert_eq!(parse_plain_amount("-1e307"), Some(-1e307));
        assert_eq!(
            parse_currency_amount("$1e307", DecimalSeparator::Point),
            Some(1e307)
        );
        assert_eq!(round_cents(f64::MAX), f64::MAX);
        assert_eq!(round_cents(1e15 + 0.5), 1e15 + 0.5);
    }

    #[test]
    fn test_currency_amount_strips_symbols() {
        let p = DecimalSeparator::Point;
        assert_eq!(parse_currency_amount("$12.50", p), Some(12.5));
        assert_eq!(parse_currency_amount("-$855.94", p), Some(-855.94));
        assert_eq!(parse_currency_amount("$-4.00", p), Some(-4.0));
        assert_eq!(parse_currency_amount("$1,234.50", p), Some(1234.5));
        assert_eq!(parse_currency_amount("$1,234,567", p), Some(1234567.0));
        assert_eq!(parse_currency_amount(" $ 7 ", p), Some(7.0));
    }

    #[test]
    fn test_currency_amount_ambiguous_grouping() {
        let p = DecimalSeparator::Point;
        assert_eq!(parse_currency_amount("$3,00", p), None);
        assert_eq!(parse_currency_amount("1,23,456", p), None);
        assert_eq!(parse_currency_amount("1234,567.00", p), None);
        assert_eq!(parse_currency_amount("$1.2.3", p), None);
    }

    #[test]
    fn test_currency_amount_comma_decimal() {
        let c = DecimalSeparator::Comma;
        assert_eq!(parse_currency_amount("$3,00", c), Some(3.0));
        assert_eq!(parse_currency_amount("€1.234,50", c), Some(1234.5));
        assert_eq!(parse_currency_amount("1.23", c), None);
    }

    #[test]
    fn test_currency_amount_garbage() {
        let p = DecimalSeparator::Point;
        assert_eq!(parse_currency_amount("", p), None);
        assert_eq!(parse_currency_amount("$", p), None);
        assert_eq!(parse_currency_amount("free", p), None);
        assert_eq!(parse_currency_amount("5.", p), None);
    }

    #[test]
    fn test_round_cents_normalizes_negative_zero() {
        assert_eq!(round_cents(-0.001).to_string(), "0");
        assert_eq!(round_cents(12.499), 12.5);
    }

    #[test]
    fn test_parse_day_iso() {
        assert_eq!(parse_day("2024-01-05"), Some(day(2024, 1, 5)));
        assert_eq!(parse_day("2024-01-05 13:45:10"), Some(day(2024, 1, 5)));
        assert_eq!(parse_day("2024-01-05T23:59:59"), Some(day(2024, 1, 5)));
        assert_eq!(parse_day("2024-01-05T23:59:59-05:00"), Some(day(2024, 1, 5)));
    }

    #[test]
    fn test_parse_day_us_formats() {
        assert_eq!(parse_day("01/05/2024"), Some(day(2024, 1, 5)));
        assert_eq!(parse_day("1/5/24"), Some(day(2024, 1, 5)));
        assert_eq!(parse_day("01/05/2024 08:15 PM"), Some(day(2024, 1, 5)));
        assert_eq!(parse_day("01/05/24 20:15"), Some(day(2024, 1, 5)));
    }

    #[test]
    fn test_parse_day_trims_whitespace() {
        assert_eq!(parse_day("  2024-03-20 10:00:00  "), Some(day(2024, 3, 20)));
    }

    #[test]
    fn test_parse_day_rejects_garbage() {
        assert_eq!(parse_day(""), None);
        assert_eq!(parse_day("yesterday"), None);
        assert_eq!(parse_day("2024-13-40"), None);
        assert_eq!(parse_day("Total"), None);
    }
}
