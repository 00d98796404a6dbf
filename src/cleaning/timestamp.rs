//! Timestamp parsing into UTC instants

use crate::error::Result;
use crate::schema::TIMESTAMP;
use crate::utils::frame::{has_column, parse_f64, str_values};
use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use polars::prelude::*;

const OFFSET_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%d %H:%M:%S%:z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%dT%H:%M:%S%z",
];

const NAIVE_FORMATS: [&str; 6] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Smallest number treated as epoch seconds rather than garbage (1973-03-03)
const MIN_EPOCH_SECONDS: f64 = 1.0e8;

/// Parse a source timestamp. Naive values are taken as UTC; anything
/// unparsable yields `None`.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(s, fmt) {
            return Some(dt.with_timezone(&Utc));
        }
    }
    for fmt in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|n| Utc.from_utc_datetime(&n));
    }

    parse_f64(s)
        .filter(|secs| *secs >= MIN_EPOCH_SECONDS)
        .and_then(|secs| DateTime::from_timestamp(secs.trunc() as i64, 0))
}

/// Canonical text form of an instant, e.g. `2024-01-01T10:00:00Z`
pub fn format_timestamp(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

/// Parsed canonical `timestamp` column; all `None` when the column is absent
pub fn timestamps(df: &DataFrame) -> Result<Vec<Option<DateTime<Utc>>>> {
    if !has_column(df, TIMESTAMP) {
        return Ok(vec![None; df.height()]);
    }
    Ok(str_values(df, TIMESTAMP)?
        .into_iter()
        .map(|v| v.as_deref().and_then(parse_timestamp))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn test_parse_rfc3339_with_offset() {
        let dt = parse_timestamp("2024-03-05T10:30:00+05:30").unwrap();
        assert_eq!(dt.hour(), 5);
        assert_eq!(dt.minute(), 0);
    }

    #[test]
    fn test_parse_naive_is_utc() {
        let dt = parse_timestamp("2024-03-05 10:30:00").unwrap();
        assert_eq!(dt.hour(), 10);
        assert_eq!(format_timestamp(&dt), "2024-03-05T10:30:00Z");
    }

    #[test]
    fn test_parse_date_only_and_epoch() {
        let dt = parse_timestamp("2024-07-01").unwrap();
        assert_eq!(dt.month(), 7);
        assert_eq!(dt.hour(), 0);

        let epoch = parse_timestamp("1704067200").unwrap();
        assert_eq!(format_timestamp(&epoch), "2024-01-01T00:00:00Z");
    }

    #[test]
    fn test_unparsable_is_none() {
        assert!(parse_timestamp("not a date").is_none());
        assert!(parse_timestamp("").is_none());
        assert!(parse_timestamp("42").is_none());
    }
}
