//! Date and timestamp helpers.
//!
//! Everything ends up as Unix epoch seconds. Offsets are expressed in whole
//! hours and are applied *sign-flipped*: an offset of `+9` moves the instant
//! nine hours later instead of earlier, which is how the stored metrics have
//! always been bucketed.

use chrono::{DateTime, NaiveDate, TimeDelta, Utc};
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum DateError {
    #[error("expected an 8 digit date (YYYYMMDD), got {0:?}")]
    InvalidCompactDate(String),
    #[error("invalid timestamp {value:?} - {reason}")]
    InvalidTimestamp { value: String, reason: String },
    #[error("offset of {0} hours is out of range")]
    OffsetOutOfRange(i64),
}

/// `"20230101"` -> `"2023-01-01"`.
pub fn to_iso_date(date: &str) -> Result<String, DateError> {
    let date = date.trim();
    if date.len() != 8 || !date.chars().all(|c| c.is_ascii_digit()) {
        return Err(DateError::InvalidCompactDate(date.to_string()));
    }
    Ok(format!("{}-{}-{}", &date[0..4], &date[4..6], &date[6..8]))
}

/// Midnight of an 8 digit date, shifted by `offset_hours`, as Unix seconds.
pub fn date_to_unix(date: &str, offset_hours: i64) -> Result<i64, DateError> {
    let iso = to_iso_date(date)?;
    let day = NaiveDate::parse_from_str(&iso, "%Y-%m-%d")
        .map_err(|_| DateError::InvalidCompactDate(date.to_string()))?;
    let midnight = day
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| DateError::InvalidCompactDate(date.to_string()))?
        .and_utc();
    TimeDelta::try_hours(offset_hours)
        .and_then(|offset| midnight.checked_add_signed(offset))
        .map(|shifted| shifted.timestamp())
        .ok_or(DateError::OffsetOutOfRange(offset_hours))
}

/// Inverse of [`date_to_unix`]; returns the compact `YYYYMMDD` form.
pub fn epoch_to_date(secs: i64, offset_hours: i64) -> Option<String> {
    let instant = DateTime::<Utc>::from_timestamp(secs, 0)?
        .checked_sub_signed(TimeDelta::try_hours(offset_hours)?)?;
    Some(instant.format("%Y%m%d").to_string())
}

/// Parses an RFC 3339 timestamp (any offset) into Unix seconds.
pub fn timestamp_to_unix(value: &str) -> Result<i64, DateError> {
    DateTime::parse_from_rfc3339(value.trim())
        .map(|dt| dt.timestamp())
        .map_err(|e| DateError::InvalidTimestamp {
            value: value.to_string(),
            reason: e.to_string(),
        })
}

/// First usable completion timestamp, falling back to `now`.
pub fn resolved_or_now(candidates: &[Option<&str>], now: DateTime<Utc>) -> i64 {
    candidates
        .iter()
        .flatten()
        .find_map(|value| timestamp_to_unix(value).ok())
        .unwrap_or_else(|| now.timestamp())
}
