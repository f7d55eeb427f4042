//! Lenient scalar parsing for values as statements print them.
//!
//! Model output tends to echo the statement's own formatting
//! ("Jan 1 2024", "$1,234.56", "(15.00)"), so the validator normalizes
//! through these helpers before typing the record.

use std::str::FromStr;
use std::sync::OnceLock;

use chrono::{Datelike, NaiveDate};
use regex::Regex;
use rust_decimal::Decimal;

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%m-%d-%Y",
    "%b %d %Y",
    "%b %d, %Y",
    "%d %b %Y",
    "%d %b, %Y",
];

/// chrono's `%Y` takes one to four digits, so "01/31/24" would otherwise
/// land in year 24. Two-digit years are rejected rather than guessed.
const YEARS: std::ops::RangeInclusive<i32> = 1900..=2100;

fn month_from_name(s: &str) -> Option<u32> {
    // Example: "Jan", "January", "Sept"
    let prefix: String = s.chars().take(3).collect::<String>().to_lowercase();
    let month = match prefix.as_str() {
        "jan" => 1,
        "feb" => 2,
        "mar" => 3,
        "apr" => 4,
        "may" => 5,
        "jun" => 6,
        "jul" => 7,
        "aug" => 8,
        "sep" => 9,
        "oct" => 10,
        "nov" => 11,
        "dec" => 12,
        _ => return None,
    };
    Some(month)
}

fn month_day_year_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?P<mon>[A-Za-z]{3,9})\.?\s+(?P<day>\d{1,2})(?:st|nd|rd|th)?,?\s+(?P<year>\d{4})$")
            .expect("static regex")
    })
}

fn period_split_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+(?:–|—|-|to|through|thru)\s+").expect("static regex"))
}

/// Parse a statement date in any of the common printed forms.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    let in_range = |d: &NaiveDate| YEARS.contains(&d.year());
    if let Some(d) = DATE_FORMATS
        .iter()
        .filter_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
        .find(in_range)
    {
        return Some(d);
    }

    let caps = month_day_year_re().captures(s)?;
    let month = month_from_name(&caps["mon"])?;
    let day: u32 = caps["day"].parse().ok()?;
    let year: i32 = caps["year"].parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day).filter(in_range)
}

/// Split a printed range such as "Jan 1 2024 – Jan 31 2024" into dates.
pub fn parse_period(s: &str) -> Option<(NaiveDate, NaiveDate)> {
    let s = s.trim();
    let s = s
        .strip_prefix("Statement Period:")
        .or_else(|| s.strip_prefix("Statement period:"))
        .unwrap_or(s)
        .trim();
    let mut parts = period_split_re().splitn(s, 2);
    let start = parse_date(parts.next()?)?;
    let end = parse_date(parts.next()?)?;
    Some((start, end))
}

/// Parse a currency amount: `1234.56`, `-$1,234.56`, `$ 5.82`, `(15.00)`, `15.00-`.
pub fn parse_decimal(s: &str) -> Option<Decimal> {
    let mut s = s.trim().replace([',', '$', ' '], "");
    let mut negative = false;

    if s.starts_with('(') && s.ends_with(')') && s.len() > 2 {
        negative = true;
        s = s[1..s.len() - 1].to_string();
    }
    if let Some(rest) = s.strip_suffix('-') {
        negative = !negative;
        s = rest.to_string();
    }
    if let Some(rest) = s.strip_prefix('-') {
        negative = !negative;
        s = rest.trim_start_matches('$').to_string();
    } else if let Some(rest) = s.strip_prefix('+') {
        s = rest.to_string();
    }

    if s.is_empty() || !s.chars().all(|c| c.is_ascii_digit() || c == '.') {
        return None;
    }

    let value = Decimal::from_str(&s).ok()?;
    Some(if negative { -value } else { value })
}
