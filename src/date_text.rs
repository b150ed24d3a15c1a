//! Portuguese free-text date expressions.
//!
//! Holidays and interruptions are often typed the way they appear in the
//! official school calendar ("22 de dezembro de 2025 a 2 de janeiro de 2026",
//! "16 e 17 de fevereiro de 2026"). This module turns those expressions into
//! concrete dates.
//!
//! Supported forms, tried in this order:
//! 1. `D1 e D2 de MES de YYYY`: exactly two dates in the same month.
//! 2. `<left> a <right>`: inclusive range. `<right>` must carry day, month
//!    and year; `<left>` may omit the year, or both month and year, and then
//!    inherits them from `<right>`.
//! 3. `D de MES de YYYY` or `D de MES`: a single date. A missing year falls
//!    back to the anchor's year, or to the current year without an anchor.

use crate::calendar::days_inclusive;
use chrono::{Datelike, Local, NaiveDate};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DateExpressionError {
    #[error("unrecognized PT month name: '{0}'")]
    UnknownMonth(String),
    #[error("unrecognized PT date expression: '{0}'")]
    Unrecognized(String),
    #[error("day {day} does not exist in {month}/{year}")]
    InvalidDate { day: u32, month: u32, year: i32 },
}

const MONTHS_PT: [(&str, u32); 13] = [
    ("janeiro", 1),
    ("fevereiro", 2),
    ("março", 3),
    ("marco", 3),
    ("abril", 4),
    ("maio", 5),
    ("junho", 6),
    ("julho", 7),
    ("agosto", 8),
    ("setembro", 9),
    ("outubro", 10),
    ("novembro", 11),
    ("dezembro", 12),
];

fn month_from_name(name: &str) -> Result<u32, DateExpressionError> {
    MONTHS_PT
        .iter()
        .find(|(candidate, _)| *candidate == name)
        .map(|(_, month)| *month)
        .ok_or_else(|| DateExpressionError::UnknownMonth(name.to_string()))
}

fn build_date(year: i32, month: u32, day: u32) -> Result<NaiveDate, DateExpressionError> {
    NaiveDate::from_ymd_opt(year, month, day)
        .ok_or(DateExpressionError::InvalidDate { day, month, year })
}

fn parse_day(token: &str) -> Option<u32> {
    if token.is_empty() || token.len() > 2 || !token.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    token.parse().ok()
}

fn parse_year(token: &str) -> Option<i32> {
    if token.len() != 4 || !token.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    token.parse().ok()
}

/// One side of an expression, possibly missing month and year.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PartialDate {
    Day(u32),
    DayMonth(u32, u32),
    Full(NaiveDate),
}

fn parse_partial(tokens: &[&str], original: &str) -> Result<PartialDate, DateExpressionError> {
    let unrecognized = || DateExpressionError::Unrecognized(original.to_string());
    match tokens {
        [day] => parse_day(day).map(PartialDate::Day).ok_or_else(unrecognized),
        [day, "de", month] => {
            let day = parse_day(day).ok_or_else(unrecognized)?;
            Ok(PartialDate::DayMonth(day, month_from_name(month)?))
        }
        [day, "de", month, "de", year] => {
            let day = parse_day(day).ok_or_else(unrecognized)?;
            let year = parse_year(year).ok_or_else(unrecognized)?;
            let month = month_from_name(month)?;
            Ok(PartialDate::Full(build_date(year, month, day)?))
        }
        _ => Err(unrecognized()),
    }
}

/// Parses a single full `D de MES de YYYY` date.
pub fn parse_pt_date(text: &str) -> Result<NaiveDate, DateExpressionError> {
    let normalized = text.trim().to_lowercase();
    let tokens: Vec<&str> = normalized.split_whitespace().collect();
    match parse_partial(&tokens, text)? {
        PartialDate::Full(date) => Ok(date),
        _ => Err(DateExpressionError::Unrecognized(text.to_string())),
    }
}

fn expand_two_days(tokens: &[&str], original: &str) -> Option<Result<Vec<NaiveDate>, DateExpressionError>> {
    let [d1, "e", d2, "de", month, "de", year] = tokens else {
        return None;
    };
    let (Some(d1), Some(d2), Some(year)) = (parse_day(d1), parse_day(d2), parse_year(year)) else {
        return Some(Err(DateExpressionError::Unrecognized(original.to_string())));
    };
    Some(month_from_name(month).and_then(|month| {
        Ok(vec![build_date(year, month, d1)?, build_date(year, month, d2)?])
    }))
}

fn expand_range(left: &[&str], right: &[&str], original: &str) -> Result<Vec<NaiveDate>, DateExpressionError> {
    let end = match parse_partial(right, original)? {
        PartialDate::Full(date) => date,
        _ => return Err(DateExpressionError::Unrecognized(original.to_string())),
    };
    let start = match parse_partial(left, original)? {
        PartialDate::Full(date) => date,
        PartialDate::DayMonth(day, month) => build_date(end.year(), month, day)?,
        PartialDate::Day(day) => build_date(end.year(), end.month(), day)?,
    };
    let (first, last) = if start <= end { (start, end) } else { (end, start) };
    Ok(days_inclusive(first, last).collect())
}

/// Expands a free-text PT date expression into concrete dates.
///
/// With no text (or blank text) the anchor alone is returned, if any.
pub fn expand_dates(
    anchor: Option<NaiveDate>,
    text: Option<&str>,
) -> Result<Vec<NaiveDate>, DateExpressionError> {
    let Some(original) = text.map(str::trim).filter(|t| !t.is_empty()) else {
        return Ok(anchor.into_iter().collect());
    };
    let normalized = original.to_lowercase();
    let tokens: Vec<&str> = normalized.split_whitespace().collect();

    if let Some(result) = expand_two_days(&tokens, original) {
        return result;
    }

    if let Some(split) = tokens.iter().position(|t| *t == "a") {
        return expand_range(&tokens[..split], &tokens[split + 1..], original);
    }

    match parse_partial(&tokens, original)? {
        PartialDate::Full(date) => Ok(vec![date]),
        PartialDate::DayMonth(day, month) => {
            let year = anchor.map(|a| a.year()).unwrap_or_else(|| Local::now().year());
            Ok(vec![build_date(year, month, day)?])
        }
        PartialDate::Day(_) => Err(DateExpressionError::Unrecognized(original.to_string())),
    }
}
