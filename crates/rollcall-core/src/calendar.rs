//! # Calendar helpers
//!
//! Month bounds, day counting and `HH:MM` parsing. All dates are UTC
//! calendar dates.

use crate::error::{PortalError, Result};
use chrono::{Datelike, NaiveDate, NaiveTime};

/// Earliest year accepted by reports and payroll.
pub const MIN_YEAR: i32 = 2020;

/// First and last day of `month`/`year`.
pub fn month_bounds(year: i32, month: u32) -> Result<(NaiveDate, NaiveDate)> {
    if !(1..=12).contains(&month) {
        return Err(PortalError::invalid("Month must be between 1 and 12"));
    }
    if year < MIN_YEAR {
        return Err(PortalError::invalid(format!("Year must be {MIN_YEAR} or later")));
    }
    let first = NaiveDate::from_ymd_opt(year, month, 1)
        .ok_or_else(|| PortalError::invalid("Invalid month"))?;
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year.saturating_add(1), 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month.saturating_add(1), 1)
    };
    let last = next
        .and_then(|d| d.pred_opt())
        .ok_or_else(|| PortalError::invalid("Invalid month"))?;
    Ok((first, last))
}

/// Number of days in `[from, to]`, zero when the range is empty.
#[must_use]
pub fn days_inclusive(from: NaiveDate, to: NaiveDate) -> u32 {
    if to < from {
        return 0;
    }
    let span = to.signed_duration_since(from).num_days();
    span.saturating_add(1) as u32
}

/// Days shared by `[a_from, a_to]` and `[b_from, b_to]`.
#[must_use]
pub fn overlap_days(a_from: NaiveDate, a_to: NaiveDate, b_from: NaiveDate, b_to: NaiveDate) -> u32 {
    days_inclusive(a_from.max(b_from), a_to.min(b_to))
}

/// Parse an `HH:MM` wall-clock time.
pub fn parse_hhmm(value: &str) -> Result<NaiveTime> {
    let bytes = value.as_bytes();
    if bytes.len() != 5 || bytes[2] != b':' {
        return Err(PortalError::invalid(format!("Invalid time '{value}', expected HH:MM")));
    }
    NaiveTime::parse_from_str(value, "%H:%M")
        .map_err(|_| PortalError::invalid(format!("Invalid time '{value}', expected HH:MM")))
}

/// Day of week with 0 = Sunday.
#[must_use]
pub fn weekday_index(date: NaiveDate) -> u8 {
    date.weekday().num_days_from_sunday() as u8
}
