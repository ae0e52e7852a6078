//! Date and time-of-day helpers shared by the visitors.

use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Timelike, Utc};
use regex::Regex;

use crate::error::TransformError;

static TIME_FORMAT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:2[0-3]|[01][0-9]):[0-5][0-9]:[0-5][0-9]$").expect("pattern is valid")
});

/// Returns true for strings of the form `HH:MM:SS` (24-hour clock).
pub fn is_time_format(value: &str) -> bool {
    TIME_FORMAT.is_match(value)
}

/// Parses a date string.
///
/// Accepted forms are RFC 3339, `YYYY-MM-DD HH:MM:SS`, `YYYY-MM-DDTHH:MM:SS`
/// (both with optional fraction and offset), `YYYY-MM-DD`, `YYYYMMDD`,
/// `@<unix seconds>` and the keywords `now` and `today`. Strings without an
/// offset are read as UTC.
pub fn parse_datetime(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();

    match value {
        "now" => return Some(Utc::now()),
        "today" => {
            return Utc::now()
                .date_naive()
                .and_hms_opt(0, 0, 0)
                .map(|dt| Utc.from_utc_datetime(&dt));
        }
        _ => {}
    }

    if let Some(seconds) = value.strip_prefix('@') {
        return seconds
            .parse::<i64>()
            .ok()
            .and_then(|s| DateTime::from_timestamp(s, 0));
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%d %H:%M:%S%.f%:z", "%Y-%m-%d %H:%M:%S%.f%z"] {
        if let Ok(dt) = DateTime::parse_from_str(value, format) {
            return Some(dt.with_timezone(&Utc));
        }
    }

    for format in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, format) {
            return Some(Utc.from_utc_datetime(&dt));
        }
    }

    let compact = value.len() == 8 && value.bytes().all(|b| b.is_ascii_digit());
    let date_format = if compact { "%Y%m%d" } else { "%Y-%m-%d" };
    NaiveDate::parse_from_str(value, date_format)
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| Utc.from_utc_datetime(&dt))
}

/// Seconds since midnight of a time-of-day string.
///
/// `HH:MM` and `HH:MM:SS` are read directly; other strings are parsed as
/// dates and their time of day is used. Unreadable input yields 0, while
/// components too large to count in seconds are an error.
pub fn seconds_since_midnight(value: &str) -> Result<i64, TransformError> {
    let value = value.trim();
    let parts: Vec<&str> = value.split(':').collect();
    if (2..=3).contains(&parts.len()) {
        let numbers: Option<Vec<i64>> = parts.iter().map(|p| p.parse::<i64>().ok()).collect();
        if let Some(numbers) = numbers {
            let seconds = numbers.get(2).copied().unwrap_or(0);
            return numbers[0]
                .checked_mul(3600)
                .and_then(|h| numbers[1].checked_mul(60).and_then(|m| h.checked_add(m)))
                .and_then(|hm| hm.checked_add(seconds))
                .ok_or_else(|| {
                    TransformError::failed(format!("time \"{}\" is out of range", value))
                });
        }
    }

    Ok(parse_datetime(value)
        .map(|dt| i64::from(dt.num_seconds_from_midnight()))
        .unwrap_or(0))
}

/// Formats a number of seconds as zero-padded `HH:MM:SS`.
///
/// Hours are not wrapped at 24. Negative input is treated as 0.
pub fn format_time(seconds: i64) -> String {
    let seconds = seconds.max(0);
    format!(
        "{:02}:{:02}:{:02}",
        seconds / 3600,
        (seconds / 60) % 60,
        seconds % 60
    )
}
