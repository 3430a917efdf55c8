// Lenient cell parsing plus the number formatting used by the previews.
//
// Nothing in here fails loudly: a cell that does not look like a number is
// worth 0 and a cell that does not look like a date has no date.
use crate::types::CellValue;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use num_format::{Locale, ToFormattedString};
use once_cell::sync::Lazy;
use regex::Regex;

static DAY_MONTH_YEAR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{1,2})[./-](\d{1,2})[./-](\d{2,4})$").expect("valid date regex")
});

const NAIVE_DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

// RFC 3339 requires seconds; these accept an offset without them.
const OFFSET_DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M%:z", "%Y-%m-%d %H:%M%:z"];

const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%Y/%m/%d"];

/// Lower-case, trim and drop whitespace, underscores and hyphens so that
/// `"Order_Total"`, `"order-total"` and `" Order Total "` compare equal.
pub fn normalize_key(s: &str) -> String {
    s.trim()
        .to_lowercase()
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '_' && *c != '-')
        .collect()
}

/// Numeric value of a cell; 0 for anything empty or unparsable.
pub fn parse_number(cell: &CellValue) -> f64 {
    match cell {
        CellValue::Empty => 0.0,
        CellValue::Number(n) if n.is_finite() => *n,
        CellValue::Number(_) => 0.0,
        CellValue::Text(s) => parse_number_str(s),
    }
}

/// Parse a loosely formatted amount such as `"$1,234.56"` or `"1.234,56 €"`.
///
/// - Everything except digits, `,`, `.` and `-` is discarded.
/// - With only commas, the first comma is the decimal separator, so `"1,234"`
///   reads as `1.234`. That input is ambiguous and kept as-is on purpose.
/// - With both, whichever separator comes last is the decimal one and the
///   other is dropped as a thousands separator.
pub fn parse_number_str(s: &str) -> f64 {
    let cleaned: String = s
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, ',' | '.' | '-'))
        .collect();
    if cleaned.is_empty() {
        return 0.0;
    }

    let normalized = match (cleaned.rfind(','), cleaned.rfind('.')) {
        (Some(_), None) => cleaned.replacen(',', ".", 1),
        (Some(comma), Some(dot)) if comma > dot => cleaned.replace('.', "").replacen(',', ".", 1),
        (Some(_), Some(_)) => cleaned.replace(',', ""),
        _ => cleaned,
    };

    normalized
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
        .unwrap_or(0.0)
}

/// Calendar day of a cell, if it holds something date-like.
pub fn parse_date(cell: &CellValue) -> Option<NaiveDate> {
    match cell {
        CellValue::Text(s) => parse_date_str(s),
        _ => None,
    }
}

pub fn parse_date_str(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc).date_naive());
    }
    // chrono's %Y takes any width, so "5/3/24" would otherwise read as year 5.
    if starts_with_year(s) {
        for fmt in OFFSET_DATETIME_FORMATS {
            if let Ok(dt) = DateTime::parse_from_str(s, fmt) {
                return Some(dt.with_timezone(&Utc).date_naive());
            }
        }
        for fmt in NAIVE_DATETIME_FORMATS {
            if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
                return Some(dt.date());
            }
        }
        for fmt in DATE_FORMATS {
            if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
                return Some(d);
            }
        }
    }

    // dd.mm.yyyy, dd/mm/yy, dd-mm-yyyy
    let caps = DAY_MONTH_YEAR.captures(s)?;
    let day: u32 = caps[1].parse().ok()?;
    let month: u32 = caps[2].parse().ok()?;
    let mut year: i32 = caps[3].parse().ok()?;
    if year < 100 {
        year += 2000;
    }
    NaiveDate::from_ymd_opt(year, month, day)
}

fn starts_with_year(s: &str) -> bool {
    let b = s.as_bytes();
    b.len() >= 5 && b[..4].iter().all(u8::is_ascii_digit) && matches!(b[4], b'-' | b'/')
}

pub fn format_number(n: f64, decimals: usize) -> String {
    // Fixed decimals with locale-aware thousands separators (`1,234,567.89`).
    let n = if n.is_finite() { n } else { 0.0 };
    let neg = n < 0.0;
    let s = format!("{:.*}", decimals, n.abs());
    let mut parts = s.split('.');
    let int_part = parts.next().unwrap_or("0");
    let frac_part = parts.next();
    let int_val: i64 = int_part.parse().unwrap_or(0);
    let mut res = int_val.to_formatted_string(&Locale::en);
    if let Some(frac) = frac_part {
        res.push('.');
        res.push_str(frac);
    }
    // "-0.00" reads badly in a report.
    if neg && res.chars().any(|c| c.is_ascii_digit() && c != '0') {
        format!("-{}", res)
    } else {
        res
    }
}

pub fn format_money(n: f64) -> String {
    let s = format_number(n, 2);
    match s.strip_prefix('-') {
        Some(abs) => format!("-${}", abs),
        None => format!("${}", s),
    }
}

pub fn format_int<T>(n: T) -> String
where
    T: ToFormattedString,
{
    n.to_formatted_string(&Locale::en)
}
