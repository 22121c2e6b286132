//! Value normalizers shared by the validator and the record cleaner.
//!
//! Every function here is total: malformed input degrades to an empty string,
//! an empty list or `None`, never to a panic or a made-up value.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

static DISALLOWED_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^\w\s@.\-]").expect("disallowed-char pattern compiles"));
static WHITESPACE_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("whitespace pattern compiles"));
static LIST_DELIMITERS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[,;|]").expect("delimiter pattern compiles"));
/// An amount, optionally written in thousands (`85.5k`).
static SALARY_AMOUNT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d+(?:\.\d+)?)(?:([kK])\b)?").expect("salary amount pattern compiles")
});

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d-%b-%Y"];
const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S%.f"];

/// Strips characters outside `[\w\s@.-]`, collapses whitespace runs and trims.
///
/// Stripping happens before collapsing so the result is a fixed point:
/// `clean_text(clean_text(x)) == clean_text(x)`.
pub fn clean_text(input: &str) -> String {
    let stripped = DISALLOWED_CHARS.replace_all(input, "");
    WHITESPACE_RUN
        .replace_all(&stripped, " ")
        .trim()
        .to_string()
}

/// Text form of an untyped raw value. Null becomes the empty string.
pub fn clean_text_value(raw: &Value) -> String {
    match raw {
        Value::Null => String::new(),
        Value::String(s) => clean_text(s),
        Value::Number(n) => clean_text(&n.to_string()),
        Value::Bool(b) => b.to_string(),
        Value::Array(_) => split_list(raw).join(" "),
        Value::Object(_) => String::new(),
    }
}

/// Best-effort numeric coercion. Anything that does not parse to a finite
/// number is `None`, never zero.
pub fn coerce_number(raw: &Value) -> Option<f64> {
    match raw {
        Value::Number(n) => n.as_f64().filter(|f| f.is_finite()),
        Value::String(s) => parse_number(s),
        _ => None,
    }
}

pub fn parse_number(s: &str) -> Option<f64> {
    s.trim().parse::<f64>().ok().filter(|f| f.is_finite())
}

/// Parses the common upstream date shapes. Unparseable input is `None`.
pub fn parse_date(raw: &Value) -> Option<NaiveDate> {
    let s = match raw {
        Value::String(s) => s.trim(),
        _ => return None,
    };
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.date());
        }
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
}

/// Accepts a native list or a `,` / `;` / `|` delimited string. Elements are
/// text-normalized independently and empty ones dropped.
pub fn split_list(raw: &Value) -> Vec<String> {
    match raw {
        Value::Array(items) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(clean_text(s)),
                Value::Number(n) => Some(clean_text(&n.to_string())),
                _ => None,
            })
            .filter(|s| !s.is_empty())
            .collect(),
        Value::String(s) => LIST_DELIMITERS
            .split(s)
            .map(clean_text)
            .filter(|s| !s.is_empty())
            .collect(),
        _ => Vec::new(),
    }
}

/// Title-cases like a human-facing label: first letter of every alphabetic
/// run upper-cased, the rest lower-cased.
pub fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_is_letter = false;
    for c in s.chars() {
        if c.is_alphabetic() {
            if prev_is_letter {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            prev_is_letter = true;
        } else {
            out.push(c);
            prev_is_letter = false;
        }
    }
    out
}

/// Normalizes a salary range to `lo-hi`. A `k` suffix is kept when an amount
/// was written in thousands (`"80k-120k"`) so range filters can still read it;
/// a `k` elsewhere in the text (`"Kansas City"`) does not count.
pub fn clean_salary_range(raw: &Value) -> String {
    let text = match raw {
        Value::Null => return String::new(),
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => return String::new(),
    };
    let cleaned = text.replace(['$', ','], "");
    let cleaned = cleaned.trim();

    let amounts: Vec<(String, bool)> = SALARY_AMOUNT
        .captures_iter(cleaned)
        .map(|caps| (trim_amount(&caps[1]), caps.get(2).is_some()))
        .collect();
    let suffix = if amounts.iter().any(|(_, thousands)| *thousands) {
        "k"
    } else {
        ""
    };
    match amounts.as_slice() {
        [(lo, _), (hi, _), ..] => format!("{lo}{suffix}-{hi}{suffix}"),
        [(only, _)] => format!("{only}{suffix}"),
        [] => clean_text(cleaned),
    }
}

/// `"80000.00"` -> `"80000"`, `"85.50"` -> `"85.5"`.
fn trim_amount(amount: &str) -> String {
    if amount.contains('.') {
        amount.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        amount.to_string()
    }
}

pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_clean_text_trims_and_collapses() {
        assert_eq!(clean_text("  Hello   World  "), "Hello World");
        assert_eq!(clean_text("a\t\n b"), "a b");
    }

    #[test]
    fn test_clean_text_keeps_email_punctuation() {
        assert_eq!(clean_text("Hello@World#123"), "Hello@World123");
        assert_eq!(clean_text("jane.doe-1@example.com"), "jane.doe-1@example.com");
    }

    #[test]
    fn test_clean_text_is_idempotent() {
        let inputs = [
            "a # b",
            "  ##  ",
            "x\u{00a0}\u{00a0}y",
            "C++ / Rust!",
            "tab\tsep|pipe;semi",
            "",
            "ünïcödé   wörds",
        ];
        for input in inputs {
            let once = clean_text(input);
            assert_eq!(clean_text(&once), once, "not idempotent for {input:?}");
        }
    }

    #[test]
    fn test_clean_text_value_null_is_empty() {
        assert_eq!(clean_text_value(&Value::Null), "");
        assert_eq!(clean_text_value(&json!(3.5)), "3.5");
    }

    #[test]
    fn test_coerce_number_never_defaults_to_zero() {
        assert_eq!(coerce_number(&json!("3.7")), Some(3.7));
        assert_eq!(coerce_number(&json!(4)), Some(4.0));
        assert_eq!(coerce_number(&json!("four")), None);
        assert_eq!(coerce_number(&json!("NaN")), None);
        assert_eq!(coerce_number(&Value::Null), None);
        assert_eq!(coerce_number(&json!(true)), None);
    }

    #[test]
    fn test_parse_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 5, 15);
        assert_eq!(parse_date(&json!("2024-05-15")), expected);
        assert_eq!(parse_date(&json!("05/15/2024")), expected);
        assert_eq!(parse_date(&json!("2024-05-15 10:00:00")), expected);
        assert_eq!(parse_date(&json!("2024-05-15T10:00:00Z")), expected);
    }

    #[test]
    fn test_parse_date_garbage_is_none() {
        assert_eq!(parse_date(&json!("soon")), None);
        assert_eq!(parse_date(&json!("2024-13-45")), None);
        assert_eq!(parse_date(&json!(20240515)), None);
    }

    #[test]
    fn test_split_list_from_string_and_array() {
        assert_eq!(
            split_list(&json!("Python, AWS;Docker | ")),
            vec!["Python", "AWS", "Docker"]
        );
        assert_eq!(
            split_list(&json!(["Python", "", "  AWS ", null])),
            vec!["Python", "AWS"]
        );
        assert!(split_list(&Value::Null).is_empty());
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("computer science"), "Computer Science");
        assert_eq!(title_case("DATA SCIENCE"), "Data Science");
        assert_eq!(title_case("tech corp-west"), "Tech Corp-West");
    }

    #[test]
    fn test_clean_salary_range() {
        assert_eq!(clean_salary_range(&json!("$80,000 - $120,000")), "80000-120000");
        assert_eq!(clean_salary_range(&json!("80k-120k")), "80k-120k");
        assert_eq!(clean_salary_range(&json!("100000")), "100000");
        assert_eq!(clean_salary_range(&Value::Null), "");
        assert_eq!(clean_salary_range(&json!("competitive")), "competitive");
    }

    #[test]
    fn test_clean_salary_range_keeps_decimals() {
        assert_eq!(clean_salary_range(&json!("$85.5k - $110k")), "85.5k-110k");
        assert_eq!(clean_salary_range(&json!("$80,000.00 - $120,000.00")), "80000-120000");
        assert_eq!(clean_salary_range(&json!("$72,500.50 - $90,000")), "72500.5-90000");
    }

    #[test]
    fn test_clean_salary_range_ignores_k_outside_amounts() {
        assert_eq!(
            clean_salary_range(&json!("$60,000 - $75,000 (Kansas City)")),
            "60000-75000"
        );
        assert_eq!(clean_salary_range(&json!("60K to 75K")), "60k-75k");
    }

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(3.456, 2), 3.46);
        assert_eq!(round_to(0.1234, 3), 0.123);
    }
}
