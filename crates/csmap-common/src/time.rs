//! Query window helpers
//!
//! The activity API takes millisecond Unix timestamps. When the caller does not
//! pass a window, the previous full local day is queried.

use crate::error::{CsMapError, Result};
use chrono::{DateTime, Duration, Local, LocalResult, NaiveDate, TimeZone};

/// Milliseconds since the epoch for local midnight at the start of today
pub fn today_midnight_ms() -> Result<i64> {
    local_midnight_ms(Local::now().date_naive())
}

/// Milliseconds since the epoch for local midnight at the start of yesterday
pub fn yesterday_midnight_ms() -> Result<i64> {
    let yesterday = Local::now().date_naive() - Duration::days(1);
    local_midnight_ms(yesterday)
}

/// Local midnight for `date` in milliseconds.
///
/// Midnight can be skipped or repeated by a DST transition. A repeated
/// midnight resolves to the earlier instant; a skipped one is an error.
pub fn local_midnight_ms(date: NaiveDate) -> Result<i64> {
    let naive = date
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| CsMapError::InvalidTime(format!("no midnight for {}", date)))?;

    match Local.from_local_datetime(&naive) {
        LocalResult::Single(dt) => Ok(dt.timestamp_millis()),
        LocalResult::Ambiguous(earliest, _) => Ok(earliest.timestamp_millis()),
        LocalResult::None => Err(CsMapError::InvalidTime(format!(
            "local midnight does not exist on {}",
            date
        ))),
    }
}

/// Render a millisecond timestamp in RFC 822 style, in local time
/// (e.g. `02 Jan 24 00:00 +0100`).
pub fn format_rfc822(ms: i64) -> Result<String> {
    let utc = DateTime::from_timestamp_millis(ms)
        .ok_or_else(|| CsMapError::InvalidTime(format!("{} is out of range", ms)))?;
    Ok(utc.with_timezone(&Local).format("%d %b %y %H:%M %z").to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_yesterday_is_before_today() {
        let today = today_midnight_ms().unwrap();
        let yesterday = yesterday_midnight_ms().unwrap();
        assert!(yesterday < today);
        // 23h/25h days happen across DST transitions
        let hours = (today - yesterday) / 3_600_000;
        assert!((23..=25).contains(&hours));
    }

    #[test]
    fn test_today_midnight_not_in_future() {
        let now = Local::now().timestamp_millis();
        assert!(today_midnight_ms().unwrap() <= now);
    }

    #[test]
    fn test_format_rfc822_shape() {
        let formatted = format_rfc822(0).unwrap();
        let parts: Vec<&str> = formatted.split(' ').collect();
        assert_eq!(parts.len(), 5);
        assert!(parts[4].starts_with('+') || parts[4].starts_with('-'));
    }

    #[test]
    fn test_format_rfc822_out_of_range() {
        assert!(matches!(
            format_rfc822(i64::MAX),
            Err(CsMapError::InvalidTime(_))
        ));
    }
}
