//! Human-readable status dates.
//!
//! Released and restricted statuses are shown as `"<date> <HH:MM> ( <relative time> )"`, for
//! example `3/1/2024 10:15 ( 3 hours ago )`. Relative phrasing uses the same thresholds as the
//! moment.js `fromNow` helper the lab UI already uses elsewhere, so both agree on wording.

use crate::constants::TIME_OF_DAY_FORMAT;
use crate::ViewConfig;
use chrono::{DateTime, Utc};

const MILLIS_PER_SECOND: f64 = 1_000.0;
const MILLIS_PER_MINUTE: f64 = 60_000.0;
const MILLIS_PER_HOUR: f64 = 3_600_000.0;
const MILLIS_PER_DAY: f64 = 86_400_000.0;

/// Days per month as used by the Gregorian 400-year cycle (146097 days / 4800 months).
const DAYS_PER_MONTH: f64 = 146_097.0 / 4_800.0;

/// Render a status instant as calendar date, time of day and relative time.
pub fn format_status_date(instant: DateTime<Utc>, cfg: &ViewConfig) -> String {
    let local = instant.with_timezone(&cfg.utc_offset());
    format!(
        "{} {} ( {} )",
        local.format(cfg.date_format()),
        local.format(TIME_OF_DAY_FORMAT),
        relative_time(instant, cfg.now())
    )
}

/// Describe `instant` relative to `now` ("3 hours ago", "in a day").
pub fn relative_time(instant: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let delta_ms = now.signed_duration_since(instant).num_milliseconds();
    let phrase = relative_phrase(delta_ms.unsigned_abs() as f64);

    if delta_ms < 0 {
        format!("in {phrase}")
    } else {
        format!("{phrase} ago")
    }
}

fn relative_phrase(abs_ms: f64) -> String {
    let seconds = (abs_ms / MILLIS_PER_SECOND).round();
    let minutes = (abs_ms / MILLIS_PER_MINUTE).round();
    let hours = (abs_ms / MILLIS_PER_HOUR).round();
    let exact_days = abs_ms / MILLIS_PER_DAY;
    let days = exact_days.round();
    let exact_months = exact_days / DAYS_PER_MONTH;
    let months = exact_months.round();
    let years = (exact_months / 12.0).round();

    if seconds < 45.0 {
        "a few seconds".to_string()
    } else if minutes <= 1.0 {
        "a minute".to_string()
    } else if minutes < 45.0 {
        format!("{minutes} minutes")
    } else if hours <= 1.0 {
        "an hour".to_string()
    } else if hours < 22.0 {
        format!("{hours} hours")
    } else if days <= 1.0 {
        "a day".to_string()
    } else if days < 26.0 {
        format!("{days} days")
    } else if months <= 1.0 {
        "a month".to_string()
    } else if months < 11.0 {
        format!("{months} months")
    } else if years <= 1.0 {
        "a year".to_string()
    } else {
        format!("{years} years")
    }
}
