//! Inclusive calendar-date windows over call and order timestamps.

use crate::error::{AppError, Result};
use chrono::{DateTime, Days, Local, NaiveDate, NaiveDateTime, Utc};
use serde::Serialize;

const NAIVE_DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Offset forms RFC 3339 rejects: `+hhmm` offsets and minute precision.
const OFFSET_DATETIME_FORMATS: [&str; 3] = [
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S%.f%z",
    "%Y-%m-%dT%H:%M%z",
];

/// An inclusive `[start, end]` range of calendar dates. Time of day is ignored.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    /// Creates a range, rejecting a lower bound after the upper bound.
    pub(crate) fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            return Err(AppError::InvalidDateRange { start, end });
        }
        Ok(Self { start, end })
    }

    /// The `days`-long window ending on `today`, e.g. 7 days back gives
    /// `[today - 7, today]`.
    pub(crate) fn days_back(today: NaiveDate, days: u64) -> Self {
        let start = today.checked_sub_days(Days::new(days)).unwrap_or(NaiveDate::MIN);
        Self { start, end: today }
    }

    /// Resolves optional bounds against a default window ending today.
    ///
    /// A missing `end` defaults to `today`; a missing `start` defaults to
    /// `days` before the end.
    pub(crate) fn resolve(
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
        today: NaiveDate,
        days: u64,
    ) -> Result<Self> {
        let end = end.unwrap_or(today);
        let start = match start {
            Some(start) => start,
            None => Self::days_back(end, days).start,
        };
        Self::new(start, end)
    }

    pub(crate) fn start(&self) -> NaiveDate {
        self.start
    }

    pub(crate) fn end(&self) -> NaiveDate {
        self.end
    }

    pub(crate) fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Checks an ISO-8601 timestamp. The date is taken in the timestamp's own
    /// offset; absent or unparseable input is out of range.
    pub(crate) fn date_in_range(&self, iso: Option<&str>) -> bool {
        match iso.and_then(parse_iso_date) {
            Some(date) => self.contains(date),
            None => {
                if let Some(raw) = iso {
                    tracing::debug!("Excluding record with unparseable timestamp '{}'", raw);
                }
                false
            }
        }
    }

    /// Checks a millisecond epoch timestamp against the range using its UTC date.
    pub(crate) fn timestamp_in_range(&self, epoch_millis: i64) -> bool {
        match DateTime::<Utc>::from_timestamp_millis(epoch_millis) {
            Some(dt) => self.contains(dt.date_naive()),
            None => false,
        }
    }
}

/// Parses a `YYYY-MM-DD` argument.
pub(crate) fn parse_date_arg(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| AppError::InvalidDate(raw.to_string()))
}

/// Builds the window for a run from optional `YYYY-MM-DD` bounds, defaulting
/// to the `days` ending today (local time).
pub(crate) fn range_from_args(from: Option<&str>, to: Option<&str>, days: u64) -> Result<DateRange> {
    let start = from.map(parse_date_arg).transpose()?;
    let end = to.map(parse_date_arg).transpose()?;
    DateRange::resolve(start, end, Local::now().date_naive(), days)
}

/// Extracts the calendar date from an ISO-8601 timestamp.
fn parse_iso_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.date_naive());
    }
    for fmt in OFFSET_DATETIME_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(trimmed, fmt) {
            return Some(dt.date_naive());
        }
    }
    for fmt in NAIVE_DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, fmt) {
            return Some(dt.date());
        }
    }
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .or_else(|| parse_hour_only(trimmed))
}

/// `YYYY-MM-DDTHH` (or with a space): chrono wants at least a minute.
fn parse_hour_only(raw: &str) -> Option<NaiveDate> {
    let (date, rest) = raw.split_at_checked(10)?;
    let hour = rest.strip_prefix('T').or_else(|| rest.strip_prefix(' '))?;
    if hour.len() != 2 || !hour.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if hour.parse::<u32>().ok()? > 23 {
        return None;
    }
    NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn first_week() -> DateRange {
        DateRange::new(date(2024, 1, 1), date(2024, 1, 7)).unwrap()
    }

    #[test]
    fn test_date_in_range_is_inclusive() {
        let range = first_week();
        assert!(range.date_in_range(Some("2024-01-01T00:00:00Z")));
        assert!(range.date_in_range(Some("2024-01-07T23:59:59Z")));
        assert!(!range.date_in_range(Some("2024-01-08T00:00:01Z")));
        assert!(!range.date_in_range(Some("2023-12-31T23:59:59Z")));
    }

    #[test]
    fn test_date_in_range_uses_own_offset() {
        let range = first_week();
        // 2024-01-08T04:59:59Z in UTC, but still the 7th locally.
        assert!(range.date_in_range(Some("2024-01-07T23:59:59-05:00")));
        assert!(!range.date_in_range(Some("2024-01-08T00:30:00+05:30")));
    }

    #[test]
    fn test_date_in_range_accepts_naive_forms() {
        let range = first_week();
        assert!(range.date_in_range(Some("2024-01-03T10:15:00")));
        assert!(range.date_in_range(Some("2024-01-03 10:15:00.123")));
        assert!(range.date_in_range(Some("2024-01-03")));
        assert!(range.date_in_range(Some("2024-01-03T10")));
        assert!(range.date_in_range(Some("2024-01-03 23")));
    }

    #[test]
    fn test_date_in_range_accepts_compact_offsets() {
        let range = first_week();
        assert!(range.date_in_range(Some("2024-01-03T10:15:00+0530")));
        assert!(range.date_in_range(Some("2024-01-03 10:15:00-0500")));
        assert!(range.date_in_range(Some("2024-01-07T23:59-0500")));
        assert!(!range.date_in_range(Some("2024-01-08T00:30:00+0530")));
    }

    #[test]
    fn test_date_in_range_rejects_malformed_and_absent() {
        let range = first_week();
        assert!(!range.date_in_range(None));
        assert!(!range.date_in_range(Some("")));
        assert!(!range.date_in_range(Some("yesterday")));
        assert!(!range.date_in_range(Some("2024-13-01T00:00:00Z")));
        assert!(!range.date_in_range(Some("2024-01-03T25")));
        assert!(!range.date_in_range(Some("2024-01-03T1")));
        assert!(!range.date_in_range(Some("2024-01-03X10")));
    }

    #[test]
    fn test_timestamp_in_range() {
        let range = first_week();
        // 2024-01-01T00:00:00Z
        assert!(range.timestamp_in_range(1_704_067_200_000));
        // 2024-01-07T23:59:59.999Z
        assert!(range.timestamp_in_range(1_704_671_999_999));
        // 2024-01-08T00:00:00Z
        assert!(!range.timestamp_in_range(1_704_672_000_000));
        assert!(!range.timestamp_in_range(i64::MAX));
    }

    #[test]
    fn test_new_rejects_inverted_range() {
        assert!(matches!(
            DateRange::new(date(2024, 1, 8), date(2024, 1, 7)),
            Err(AppError::InvalidDateRange { .. })
        ));
        assert!(DateRange::new(date(2024, 1, 7), date(2024, 1, 7)).is_ok());
    }

    #[test]
    fn test_resolve_defaults() {
        let today = date(2024, 3, 10);
        let range = DateRange::resolve(None, None, today, 7).unwrap();
        assert_eq!(range.start(), date(2024, 3, 3));
        assert_eq!(range.end(), today);

        let range = DateRange::resolve(None, Some(date(2024, 2, 1)), today, 7).unwrap();
        assert_eq!(range.start(), date(2024, 1, 25));

        assert!(DateRange::resolve(Some(date(2024, 4, 1)), None, today, 7).is_err());
    }

    #[test]
    fn test_parse_date_arg() {
        assert_eq!(parse_date_arg(" 2024-01-05 ").unwrap(), date(2024, 1, 5));
        assert!(matches!(
            parse_date_arg("05/01/2024"),
            Err(AppError::InvalidDate(_))
        ));
    }

    #[test]
    fn test_range_from_args() {
        let range = range_from_args(Some("2024-01-01"), Some("2024-01-07"), 30).unwrap();
        assert_eq!(range, first_week());
        assert!(range_from_args(Some("2024-01-08"), Some("2024-01-07"), 7).is_err());
        assert!(range_from_args(Some("Jan 1"), None, 7).is_err());

        // Only the shape of the default window is stable across midnight.
        let range = range_from_args(None, None, 7).unwrap();
        assert_eq!(range.start() + Days::new(7), range.end());

        let range = range_from_args(None, Some("2024-01-07"), 6).unwrap();
        assert_eq!(range, first_week());
    }
}
