//! Civil time for Mauritius: a fixed +04:00 offset with no daylight saving.
//!
//! Every function takes an absolute instant (UTC) and renders it in local civil
//! time. The `*_str` variants accept RFC 3339 text and fail with
//! [`OutageError::InvalidInstant`] instead of rendering a garbage date.

use crate::utils::error::{OutageError, Result};
use chrono::{DateTime, Duration, FixedOffset, NaiveDate, TimeZone, Utc};

pub const CIVIL_OFFSET_SECONDS: i32 = 4 * 60 * 60;

pub fn civil_offset() -> FixedOffset {
    FixedOffset::east_opt(CIVIL_OFFSET_SECONDS).expect("+04:00 is within chrono's offset range")
}

pub fn parse_instant(value: &str) -> Result<DateTime<Utc>> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(OutageError::invalid_instant(value, "empty timestamp"));
    }

    DateTime::parse_from_rfc3339(trimmed)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| OutageError::invalid_instant(value, e))
}

pub fn to_civil(instant: &DateTime<Utc>) -> DateTime<FixedOffset> {
    instant.with_timezone(&civil_offset())
}

pub fn civil_date(instant: &DateTime<Utc>) -> NaiveDate {
    to_civil(instant).date_naive()
}

/// Local midnight on `date`, as an absolute instant.
pub fn civil_midnight(date: NaiveDate) -> DateTime<Utc> {
    let naive = date.and_time(chrono::NaiveTime::MIN);
    civil_offset()
        .from_local_datetime(&naive)
        .single()
        .map(|dt| dt.with_timezone(&Utc))
        // A fixed offset has exactly one mapping for every local time.
        .unwrap_or_else(|| naive.and_utc() - Duration::seconds(CIVIL_OFFSET_SECONDS as i64))
}

/// The civil day boundary that contains `instant`.
pub fn civil_day_start(instant: &DateTime<Utc>) -> DateTime<Utc> {
    civil_midnight(civil_date(instant))
}

/// `hours` past local midnight on `date`; 24 lands on the next midnight.
pub fn civil_hour(date: NaiveDate, hours: u32) -> DateTime<Utc> {
    civil_midnight(date) + Duration::hours(hours as i64)
}

/// `HH:MM`, 24-hour clock.
pub fn format_time(instant: &DateTime<Utc>) -> String {
    to_civil(instant).format("%H:%M").to_string()
}

/// `Saturday, June 1, 2024`
pub fn format_long_date(instant: &DateTime<Utc>) -> String {
    to_civil(instant).format("%A, %B %-d, %Y").to_string()
}

/// `Sat, Jun 1, 2024`
pub fn format_short_date(instant: &DateTime<Utc>) -> String {
    to_civil(instant).format("%a, %b %-d, %Y").to_string()
}

/// `2024-06-01`
pub fn format_iso_date(instant: &DateTime<Utc>) -> String {
    to_civil(instant).format("%Y-%m-%d").to_string()
}

pub fn format_time_str(value: &str) -> Result<String> {
    parse_instant(value).map(|dt| format_time(&dt))
}

pub fn format_long_date_str(value: &str) -> Result<String> {
    parse_instant(value).map(|dt| format_long_date(&dt))
}

pub fn format_short_date_str(value: &str) -> Result<String> {
    parse_instant(value).map(|dt| format_short_date(&dt))
}

pub fn format_iso_date_str(value: &str) -> Result<String> {
    parse_instant(value).map(|dt| format_iso_date(&dt))
}

pub fn parse_civil_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|e| OutageError::invalid_instant(value, e))
}
