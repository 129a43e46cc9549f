// SPDX-License-Identifier: MIT

use chrono::{DateTime, Months, NaiveDate, NaiveDateTime, TimeDelta, Utc};

/// Decides which readings are plotted, based on their timestamp.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TimeWindow {
    /// Every reading passes, even one with an unparsable timestamp.
    #[default]
    All,
    /// No reading passes. Used for an incomplete custom range.
    Closed,
    /// Readings strictly after the given instant.
    Since(DateTime<Utc>),
    /// Readings strictly after `now` minus the given number of days.
    LastDays(u32),
    /// Readings strictly after `now` minus the given number of calendar months.
    LastMonths(u32),
    /// Readings strictly between `start` and `end`.
    Custom {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
}

impl TimeWindow {
    /// Lower bound of the window relative to `now`, if it has one.
    pub fn start(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match *self {
            TimeWindow::All | TimeWindow::Closed => None,
            TimeWindow::Since(start) | TimeWindow::Custom { start, .. } => Some(start),
            TimeWindow::LastDays(days) => now.checked_sub_signed(TimeDelta::days(days.into())),
            TimeWindow::LastMonths(months) => now.checked_sub_months(Months::new(months)),
        }
    }

    /// Evaluates the window for a raw timestamp string.
    pub fn contains(&self, timestamp: &str, now: DateTime<Utc>) -> bool {
        match *self {
            TimeWindow::All => return true,
            TimeWindow::Closed => return false,
            _ => {}
        }

        let Some(instant) = parse_timestamp(timestamp) else {
            return false;
        };

        if let TimeWindow::Custom { start, end } = *self {
            return instant > start && instant < end;
        }

        // A start before the representable range leaves the window open.
        self.start(now).map_or(true, |start| instant > start)
    }
}

/// The date range choices offered on the analytics page.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DateRange {
    Last7Days,
    Last30Days,
    #[default]
    Last6Months,
    Custom,
}

impl DateRange {
    pub const ALL: [DateRange; 4] = [
        DateRange::Last7Days,
        DateRange::Last30Days,
        DateRange::Last6Months,
        DateRange::Custom,
    ];

    pub fn label(self) -> &'static str {
        match self {
            DateRange::Last7Days => "Last 7 Days",
            DateRange::Last30Days => "Last 30 Days",
            DateRange::Last6Months => "Last 6 Months",
            DateRange::Custom => "Custom",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|range| range.label() == label)
    }

    /// Turns the choice into a window. A custom range missing either end
    /// lets nothing through.
    pub fn window(self, custom_start: Option<DateTime<Utc>>, custom_end: Option<DateTime<Utc>>) -> TimeWindow {
        match self {
            DateRange::Last7Days => TimeWindow::LastDays(7),
            DateRange::Last30Days => TimeWindow::LastDays(30),
            DateRange::Last6Months => TimeWindow::LastMonths(6),
            DateRange::Custom => match (custom_start, custom_end) {
                (Some(start), Some(end)) => TimeWindow::Custom { start, end },
                _ => TimeWindow::Closed,
            },
        }
    }
}

/// Parses the timestamp formats the sensor API is known to produce.
///
/// RFC 3339 is tried first; naive date-times and plain dates are taken as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();

    if let Ok(instant) = DateTime::parse_from_rfc3339(raw) {
        return Some(instant.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 7, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_parse_timestamp_formats() {
        let expected = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();

        assert_eq!(parse_timestamp("2024-01-01T00:00:00Z"), Some(expected));
        assert_eq!(parse_timestamp("2024-01-01T01:00:00+01:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-01-01T00:00:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-01-01T00:00:00.000"), Some(expected));
        assert_eq!(parse_timestamp("2024-01-01 00:00:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-01-01"), Some(expected));
        assert_eq!(parse_timestamp("yesterday"), None);
    }

    #[test]
    fn test_all_window_accepts_garbage() {
        assert!(TimeWindow::All.contains("not a time", now()));
        assert!(!TimeWindow::Closed.contains("2024-07-01T00:00:00Z", now()));
    }

    #[test]
    fn test_relative_windows() {
        let week = TimeWindow::LastDays(7);
        assert!(week.contains("2024-06-30T00:00:00Z", now()));
        assert!(!week.contains("2024-06-24T12:00:00Z", now()), "start is exclusive");
        assert!(!week.contains("2024-06-01T00:00:00Z", now()));
        assert!(!week.contains("garbage", now()));

        let half_year = TimeWindow::LastMonths(6);
        assert!(half_year.contains("2024-01-02T00:00:00Z", now()));
        assert!(!half_year.contains("2023-12-31T00:00:00Z", now()));
    }

    #[test]
    fn test_since_window() {
        let start = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        let window = TimeWindow::Since(start);

        assert_eq!(window.start(now()), Some(start));
        assert!(window.contains("2024-06-01T00:00:01Z", now()));
        assert!(!window.contains("2024-06-01T00:00:00Z", now()));
    }

    #[test]
    fn test_custom_window_is_exclusive_on_both_ends() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap();
        let window = TimeWindow::Custom { start, end };

        assert!(window.contains("2024-01-15T00:00:00Z", now()));
        assert!(!window.contains("2024-01-01T00:00:00Z", now()));
        assert!(!window.contains("2024-02-01T00:00:00Z", now()));
    }

    #[test]
    fn test_date_range_windows() {
        assert_eq!(DateRange::Last7Days.window(None, None), TimeWindow::LastDays(7));
        assert_eq!(DateRange::Last6Months.window(None, None), TimeWindow::LastMonths(6));
        assert_eq!(DateRange::Custom.window(Some(now()), None), TimeWindow::Closed);
        assert_eq!(DateRange::from_label("Last 30 Days"), Some(DateRange::Last30Days));
        assert_eq!(DateRange::from_label("Forever"), None);
    }
}
