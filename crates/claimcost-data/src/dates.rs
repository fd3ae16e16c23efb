//! Date parsing and day-difference helpers.
//!
//! Raw tables carry dates as text. Parsing happens here with chrono so the
//! derived day counts do not depend on CSV dtype inference.
//!
//! Cells may be plain dates (taken as midnight) or date-times. Day counts are
//! the elapsed time floored to whole days, so `2023-01-01 23:00` to
//! `2023-01-05 01:00` is 3 days.

use crate::error::{DataError, Result};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use polars::prelude::*;

const DATE_FORMAT: &str = "%Y-%m-%d";
const DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];
const SECONDS_PER_DAY: i64 = 86_400;

/// Parse a single date or date-time cell.
///
/// Accepts `YYYY-MM-DD` (midnight) and `YYYY-MM-DD HH:MM[:SS[.fff]]`, with
/// either a space or `T` before the time.
pub fn parse_timestamp(column: &str, value: &str) -> Result<NaiveDateTime> {
    let trimmed = value.trim();

    if let Ok(date) = NaiveDate::parse_from_str(trimmed, DATE_FORMAT) {
        return Ok(date.and_time(NaiveTime::default()));
    }

    DATETIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(trimmed, format).ok())
        .ok_or_else(|| DataError::InvalidDate {
            column: column.to_string(),
            value: value.to_string(),
        })
}

/// Parse a text column of dates; nulls stay `None`.
pub fn parse_timestamp_column(df: &DataFrame, column: &str) -> Result<Vec<Option<NaiveDateTime>>> {
    let values = df.column(column)?;
    let values = values.cast(&DataType::String)?;

    values
        .str()?
        .into_iter()
        .map(|cell| cell.map(|v| parse_timestamp(column, v)).transpose())
        .collect()
}

/// Elapsed `later - earlier` per row, floored to whole days.
///
/// A row is null when either side is null.
pub fn day_difference(
    df: &DataFrame,
    later: &str,
    earlier: &str,
) -> Result<Vec<Option<i64>>> {
    let later_times = parse_timestamp_column(df, later)?;
    let earlier_times = parse_timestamp_column(df, earlier)?;

    Ok(later_times
        .into_iter()
        .zip(earlier_times)
        .map(|(l, e)| match (l, e) {
            (Some(l), Some(e)) => Some((l - e).num_seconds().div_euclid(SECONDS_PER_DAY)),
            _ => None,
        })
        .collect())
}
