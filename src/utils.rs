use crate::error::{CashFlowError, Result};
use crate::schema::YearMonth;
use chrono::NaiveDate;

const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// Rounds a money amount to whole cents. Negative zero comes back as `0.0`.
pub fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0 + 0.0
}

/// Number of calendar months from `start` to `end` (negative if `end` is earlier).
pub fn months_between(start: YearMonth, end: YearMonth) -> i32 {
    let year_diff = end.year - start.year;
    let month_diff = end.month as i32 - start.month as i32;
    year_diff * 12 + month_diff
}

/// English name of a calendar month (1 = January). Out-of-range input yields `None`.
pub fn month_name(month: u32) -> Option<&'static str> {
    month
        .checked_sub(1)
        .and_then(|idx| MONTH_NAMES.get(idx as usize))
        .copied()
}

/// Parses a month key in the format "YYYY-MM".
pub fn parse_year_month(text: &str) -> Result<YearMonth> {
    let start_str = format!("{}-01", text.trim());
    let start_date = NaiveDate::parse_from_str(&start_str, "%Y-%m-%d")
        .map_err(|_| CashFlowError::InvalidMonthKey(text.to_string()))?;

    Ok(YearMonth::from_date(start_date))
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Whole-dollar amount with thousands separators, e.g. `-$12,500`.
pub fn format_currency(value: f64) -> String {
    let rounded = value.round();
    let digits = format!("{:.0}", rounded.abs());

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    if rounded < 0.0 {
        format!("-${}", grouped)
    } else {
        format!("${}", grouped)
    }
}
