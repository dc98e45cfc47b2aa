//! Calendar helpers for the string-typed dates used throughout the store.
//!
//! Dates are kept as fixed-width `YYYY-MM-DD` strings and months as
//! `YYYY-MM`, so lexical comparison matches calendar order.

use chrono::{Local, NaiveDate};

use crate::error::{Error, Result};

/// Validate a `YYYY-MM-DD` day and return it unchanged.
pub fn parse_day(field: &str, value: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.len() != 10 {
        return Err(Error::invalid(field, format!("'{value}' is not YYYY-MM-DD")));
    }
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .map_err(|_| Error::invalid(field, format!("'{value}' is not a valid date")))?;
    Ok(trimmed.to_string())
}

/// Validate a `YYYY-MM` month and return it unchanged.
pub fn parse_month(field: &str, value: &str) -> Result<String> {
    let trimmed = value.trim();
    let valid = trimmed.len() == 7
        && NaiveDate::parse_from_str(&format!("{trimmed}-01"), "%Y-%m-%d").is_ok();
    if !valid {
        return Err(Error::invalid(field, format!("'{value}' is not YYYY-MM")));
    }
    Ok(trimmed.to_string())
}

/// Inclusive lexical day range covering a `YYYY-MM` month.
///
/// The end bound is always day 31; no stored day sorts between the real last
/// day of the month and `-31`.
pub fn month_range(month: &str) -> (String, String) {
    (format!("{month}-01"), format!("{month}-31"))
}

/// (month, year) from the first two dash-separated parts of a date string.
pub fn month_year_of(date: &str) -> Result<(u32, i32)> {
    let mut parts = date.split('-');
    let year = parts
        .next()
        .and_then(|p| p.trim().parse::<i32>().ok())
        .ok_or_else(|| Error::invalid("date", format!("'{date}' has no year component")))?;
    let month = parts
        .next()
        .and_then(|p| p.trim().parse::<u32>().ok())
        .filter(|m| (1..=12).contains(m))
        .ok_or_else(|| Error::invalid("date", format!("'{date}' has no month component")))?;
    Ok((month, year))
}

/// Today's local date as `YYYY-MM-DD`.
pub fn today() -> String {
    Local::now().date_naive().format("%Y-%m-%d").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_day_accepts_fixed_width_dates() {
        assert_eq!(parse_day("date", "2024-06-15").unwrap(), "2024-06-15");
        assert_eq!(parse_day("date", " 2024-06-15 ").unwrap(), "2024-06-15");
    }

    #[test]
    fn parse_day_rejects_loose_or_impossible_dates() {
        assert!(parse_day("date", "2024-6-15").is_err());
        assert!(parse_day("date", "2024-02-30").is_err());
        assert!(parse_day("date", "15/06/2024").is_err());
    }

    #[test]
    fn parse_month_validates_range() {
        assert_eq!(parse_month("month", "2024-06").unwrap(), "2024-06");
        assert!(parse_month("month", "2024-13").is_err());
        assert!(parse_month("month", "2024-6").is_err());
    }

    #[test]
    fn month_range_brackets_every_day() {
        let (start, end) = month_range("2024-02");
        assert_eq!(start, "2024-02-01");
        assert_eq!(end, "2024-02-31");
        assert!("2024-02-29" >= start.as_str() && "2024-02-29" <= end.as_str());
        assert!("2024-03-01" > end.as_str());
    }

    #[test]
    fn month_year_from_date_prefix() {
        assert_eq!(month_year_of("2024-06-15").unwrap(), (6, 2024));
        assert_eq!(month_year_of("2023-12").unwrap(), (12, 2023));
        assert!(month_year_of("2024").is_err());
        assert!(month_year_of("2024-00-01").is_err());
    }
}
