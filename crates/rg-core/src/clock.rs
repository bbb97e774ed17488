//! Wall-clock helpers for bucket indexing.
//!
//! All bucket math works on whole seconds since the Unix epoch in UTC.

use chrono::{DateTime, Utc};

pub const SECONDS_PER_MINUTE: i64 = 60;
pub const SECONDS_PER_HOUR: i64 = 3_600;
pub const SECONDS_PER_DAY: i64 = 86_400;

/// Current wall-clock time in seconds.
#[must_use]
pub fn now_secs() -> i64 {
    Utc::now().timestamp()
}

/// Strips the seconds off a timestamp.
#[must_use]
pub const fn truncate_to_minute(secs: i64) -> i64 {
    secs.div_euclid(SECONDS_PER_MINUTE) * SECONDS_PER_MINUTE
}

/// Minute of the hour, `0..60`.
#[expect(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    reason = "rem_euclid keeps the value in 0..60"
)]
#[must_use]
pub const fn minute_of_hour(secs: i64) -> usize {
    secs.div_euclid(SECONDS_PER_MINUTE).rem_euclid(60) as usize
}

/// Hour of the day in UTC, `0..24`.
#[expect(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    reason = "rem_euclid keeps the value in 0..24"
)]
#[must_use]
pub const fn hour_of_day(secs: i64) -> usize {
    secs.div_euclid(SECONDS_PER_HOUR).rem_euclid(24) as usize
}

/// Formats a timestamp as a naive ISO 8601 string, e.g. `2025-03-05T10:15:00`.
#[must_use]
pub fn iso_timestamp(secs: i64) -> String {
    DateTime::<Utc>::from_timestamp(secs, 0)
        .unwrap_or_default()
        .format("%Y-%m-%dT%H:%M:%S")
        .to_string()
}
