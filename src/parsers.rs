//! Best-effort value parsers for raw CSV cell text
//!
//! Exported tracker files spell the same quantity a dozen different ways:
//! `"1,234 steps"`, `"56.7%"`, `"1:05:30"`, `"75 minutes"`, `"5/1/2023 08:00"`.
//! The parsers in this module coerce such strings into numbers, calendar
//! dates, timestamps, and minute durations, returning `None` instead of an
//! error when no interpretation exists. A parse miss is expected data loss,
//! not a failure (the caller records the field as absent).

use chrono::{NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;

/// Tokens that mean "no value" rather than zero.
const NULL_TOKENS: &[&str] = &["", "na", "n/a", "none", "null", "-", "--"];

/// Explicit date formats tried in order; earlier entries win on ambiguous
/// input (ISO before US before EU).
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%d/%m/%Y", "%Y/%m/%d"];

/// Explicit datetime formats tried in order.
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
];

static NON_NUMERIC: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^0-9.+\-]").expect("regex is valid"));
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("regex is valid"));
static ISO_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d{4}-\d{2}-\d{2})").expect("regex is valid"));
static SLASH_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d{1,2}/\d{1,2}/\d{4})").expect("regex is valid"));
static ISO_DATETIME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d{4}-\d{2}-\d{2})[T ]?(\d{2}:\d{2}:\d{2})?").expect("regex is valid"));
static COLON_DURATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{1,2}:\d{2}(:\d{2})?$").expect("regex is valid"));
static HOURS_QTY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([\d.]+)\s*(hours|hour|hrs|hr|h)").expect("regex is valid"));
static MINUTES_QTY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([\d.]+)\s*(minutes|minute|mins|min|m)").expect("regex is valid"));
static SECONDS_QTY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([\d.]+)\s*(seconds|second|secs|sec|s)").expect("regex is valid"));

/// Collapse runs of whitespace into single spaces and trim.
pub fn normalize_whitespace(s: &str) -> String {
    WHITESPACE.replace_all(s, " ").trim().to_string()
}

/// Coerce a raw cell into a float.
///
/// Strips percent signs and thousands separators, blanks out every other
/// non-numeric character, then returns the *last* whitespace-separated token
/// that parses as a number. This handles unit-bearing strings such as
/// `"Elevation 120 m"` (→ 120.0) where the trailing token is the value.
///
/// Null tokens (`""`, `na`, `n/a`, `none`, `null`, `-`, `--`) mean "no value"
/// and return `None` rather than zero.
pub fn parse_number(raw: &str) -> Option<f64> {
    let t = raw.trim().to_lowercase();
    if NULL_TOKENS.contains(&t.as_str()) {
        return None;
    }
    let t = t.replace([',', '%'], "");
    let t = NON_NUMERIC.replace_all(&t, " ");
    let t = normalize_whitespace(&t);
    t.split(' ').rev().find_map(|token| token.parse::<f64>().ok())
}

/// Coerce a raw cell into a calendar date.
///
/// Tries the explicit date formats, then the datetime formats (taking the
/// date part), and finally falls back to extracting an embedded `YYYY-MM-DD`
/// or `M/D/YYYY` substring — so `"2023-05-01T12:34:56Z"` still yields
/// 2023-05-01 even though no explicit format matches the trailing `Z`.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Some(d);
        }
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.date());
        }
    }
    if let Ok(dt) = chrono::DateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%z") {
        return Some(dt.date_naive());
    }
    if let Some(m) = ISO_DATE.captures(s) {
        if let Ok(d) = NaiveDate::parse_from_str(&m[1], "%Y-%m-%d") {
            return Some(d);
        }
    }
    if let Some(m) = SLASH_DATE.captures(s) {
        for fmt in ["%m/%d/%Y", "%d/%m/%Y"] {
            if let Ok(d) = NaiveDate::parse_from_str(&m[1], fmt) {
                return Some(d);
            }
        }
    }
    None
}

/// Coerce a raw cell into a timestamp.
///
/// Superset of [`parse_date`]: tries time-bearing formats first, then
/// date-only formats (midnight), then extracts an ISO-like
/// `YYYY-MM-DD[ T]HH:MM:SS` substring.
pub fn parse_datetime(raw: &str) -> Option<NaiveDateTime> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }
    if let Ok(dt) = chrono::DateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%z") {
        return Some(dt.naive_local());
    }
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return d.and_hms_opt(0, 0, 0);
        }
    }
    if let Some(m) = ISO_DATETIME.captures(s) {
        let date = NaiveDate::parse_from_str(&m[1], "%Y-%m-%d").ok()?;
        return match m.get(2) {
            Some(time) => {
                let t = chrono::NaiveTime::parse_from_str(time.as_str(), "%H:%M:%S").ok()?;
                Some(date.and_time(t))
            }
            None => date.and_hms_opt(0, 0, 0),
        };
    }
    None
}

/// Coerce a raw cell into a duration in minutes.
///
/// Recognizes `H:MM:SS` and `MM:SS` colon forms, then free-text
/// hour/minute/second quantities (`"1 hr 20 min"`, `"1.5 h"`, `"75 minutes"`)
/// summed as minute-equivalents, and as a last resort treats a bare numeric
/// string as minutes. Returns `None` only when no numeric signal exists.
pub fn parse_duration_minutes(raw: &str) -> Option<f64> {
    let s = raw.trim().to_lowercase();
    if s.is_empty() {
        return None;
    }
    if COLON_DURATION.is_match(&s) {
        let parts: Vec<f64> = s.split(':').filter_map(|p| p.parse::<f64>().ok()).collect();
        return match parts.as_slice() {
            [h, m, sec] => Some(h * 60.0 + m + sec / 60.0),
            [m, sec] => Some(m + sec / 60.0),
            _ => None,
        };
    }
    let mut total = 0.0;
    if let Some(m) = HOURS_QTY.captures(&s) {
        if let Ok(v) = m[1].parse::<f64>() {
            total += v * 60.0;
        }
    }
    if let Some(m) = MINUTES_QTY.captures(&s) {
        if let Ok(v) = m[1].parse::<f64>() {
            total += v;
        }
    }
    if let Some(m) = SECONDS_QTY.captures(&s) {
        if let Ok(v) = m[1].parse::<f64>() {
            total += v / 60.0;
        }
    }
    if total > 0.0 {
        return Some(total);
    }
    s.parse::<f64>().ok()
}

/// Round to 3 decimal places, the precision used across all output streams.
pub fn round3(v: f64) -> f64 {
    (v * 1000.0).round() / 1000.0
}

/// Round to 6 decimal places (kilometre distances backfilled from
/// millimetre series).
pub fn round6(v: f64) -> f64 {
    (v * 1_000_000.0).round() / 1_000_000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_number_plain() {
        assert_eq!(parse_number("42"), Some(42.0));
        assert_eq!(parse_number("  3.5 "), Some(3.5));
        assert_eq!(parse_number("-7"), Some(-7.0));
    }

    #[test]
    fn test_parse_number_units_and_separators() {
        assert_eq!(parse_number("1,234 steps"), Some(1234.0));
        assert_eq!(parse_number("56.7%"), Some(56.7));
        assert_eq!(parse_number("Elevation 120 m"), Some(120.0));
    }

    #[test]
    fn test_parse_number_null_tokens() {
        for t in ["", "NA", "n/a", "None", "null", "-", "--", "  "] {
            assert_eq!(parse_number(t), None, "token {t:?} should be absent");
        }
    }

    #[test]
    fn test_parse_number_no_signal() {
        assert_eq!(parse_number("steps"), None);
        assert_eq!(parse_number("..."), None);
    }

    #[test]
    fn test_parse_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2023, 5, 1).unwrap();
        assert_eq!(parse_date("2023-05-01"), Some(expected));
        assert_eq!(parse_date("5/1/2023"), Some(expected));
        assert_eq!(parse_date("2023/05/01"), Some(expected));
        assert_eq!(parse_date("2023-05-01 12:30:00"), Some(expected));
        assert_eq!(parse_date("5/1/2023 08:00"), Some(expected));
    }

    #[test]
    fn test_parse_date_embedded_iso() {
        let expected = NaiveDate::from_ymd_opt(2023, 5, 1).unwrap();
        assert_eq!(parse_date("2023-05-01T12:34:56Z"), Some(expected));
    }

    #[test]
    fn test_parse_date_eu_fallback() {
        // Day 13 cannot be a month, so the US format fails and EU wins.
        let expected = NaiveDate::from_ymd_opt(2023, 5, 13).unwrap();
        assert_eq!(parse_date("13/5/2023"), Some(expected));
    }

    #[test]
    fn test_parse_date_garbage() {
        assert_eq!(parse_date("not a date"), None);
        assert_eq!(parse_date(""), None);
    }

    #[test]
    fn test_parse_datetime() {
        let dt = parse_datetime("2023-05-01 08:15:00").unwrap();
        assert_eq!(dt.to_string(), "2023-05-01 08:15:00");
        let dt = parse_datetime("2023-05-01").unwrap();
        assert_eq!(dt.to_string(), "2023-05-01 00:00:00");
        let dt = parse_datetime("logged 2023-05-01T07:00:00 by watch").unwrap();
        assert_eq!(dt.to_string(), "2023-05-01 07:00:00");
    }

    #[test]
    fn test_parse_duration_colon_forms() {
        assert_eq!(parse_duration_minutes("1:05:30"), Some(65.5));
        assert_eq!(parse_duration_minutes("45:30"), Some(45.5));
    }

    #[test]
    fn test_parse_duration_free_text() {
        assert_eq!(parse_duration_minutes("75 minutes"), Some(75.0));
        assert_eq!(parse_duration_minutes("1.5 h"), Some(90.0));
        assert_eq!(parse_duration_minutes("1 hr 20 min"), Some(80.0));
        assert_eq!(parse_duration_minutes("90 sec"), Some(1.5));
    }

    #[test]
    fn test_parse_duration_bare_number_is_minutes() {
        assert_eq!(parse_duration_minutes("42"), Some(42.0));
        assert_eq!(parse_duration_minutes("42.5"), Some(42.5));
    }

    #[test]
    fn test_parse_duration_no_signal() {
        assert_eq!(parse_duration_minutes("soon"), None);
        assert_eq!(parse_duration_minutes(""), None);
    }

    #[test]
    fn test_round3() {
        assert_eq!(round3(65.4999), 65.5);
        assert_eq!(round3(1.0 / 3.0), 0.333);
    }
}
