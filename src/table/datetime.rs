//! Date/time parsing for loosely typed field values
//!
//! Health-log entries were written by different app versions, so time fields
//! arrive as store timestamps, ISO strings, German dates or epoch numbers.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

/// Date-time formats tried in order, after RFC 3339
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%d.%m.%Y %H:%M:%S",
    "%d.%m.%Y %H:%M",
];

/// Date-only formats; parsed values land on midnight UTC
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d.%m.%Y", "%m/%d/%Y", "%Y/%m/%d"];

/// Parse a text value as a UTC date/time
pub fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }

    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.and_utc());
        }
    }

    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());
        }
    }

    None
}

/// Convert Unix epoch milliseconds to a UTC date/time
pub fn epoch_millis_to_datetime(millis: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp_millis(millis)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_rfc3339() {
        let dt = parse_datetime("2024-05-01T08:30:00+02:00").unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2024, 5, 1, 6, 30, 0).unwrap());
    }

    #[test]
    fn test_parse_common_formats() {
        let expected = Utc.with_ymd_and_hms(2024, 5, 1, 8, 30, 0).unwrap();
        assert_eq!(parse_datetime("2024-05-01 08:30:00"), Some(expected));
        assert_eq!(parse_datetime("2024-05-01T08:30:00"), Some(expected));
        assert_eq!(parse_datetime("2024-05-01 08:30"), Some(expected));
        assert_eq!(parse_datetime("01.05.2024 08:30"), Some(expected));
    }

    #[test]
    fn test_parse_date_only_is_midnight() {
        let midnight = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
        assert_eq!(parse_datetime("2024-05-01"), Some(midnight));
        assert_eq!(parse_datetime("01.05.2024"), Some(midnight));
        assert_eq!(parse_datetime(" 2024/05/01 "), Some(midnight));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert_eq!(parse_datetime(""), None);
        assert_eq!(parse_datetime("gestern"), None);
        assert_eq!(parse_datetime("7"), None);
    }

    #[test]
    fn test_epoch_millis() {
        let dt = epoch_millis_to_datetime(1_714_552_200_000).unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2024, 5, 1, 8, 30, 0).unwrap());
    }
}
