// SPDX-License-Identifier: MIT

use chrono::{DateTime, TimeDelta, Utc};

use super::{parse_timestamp, Metric, RawReading, SensorPoint, SensorSeries, TimeWindow};

/// Buckets raw readings into per-metric series.
///
/// A reading is kept when its timestamp lies inside `window` and its channel
/// id maps to a [`Metric`]. Everything else is dropped without error, and the
/// arrival order is preserved inside each bucket.
pub fn transform<'a, I>(readings: I, window: &TimeWindow, now: DateTime<Utc>) -> SensorSeries
where
    I: IntoIterator<Item = &'a RawReading>,
{
    let mut series = SensorSeries::default();

    for reading in readings {
        if !window.contains(&reading.time, now) {
            continue;
        }
        if let Some(metric) = Metric::from_channel(reading.channel_id) {
            series.push(
                metric,
                SensorPoint {
                    value: reading.value,
                    timestamp: reading.time.clone(),
                },
            );
        }
    }

    series
}

/// Buckets every reading, without a time restriction.
pub fn bucket<'a, I>(readings: I) -> SensorSeries
where
    I: IntoIterator<Item = &'a RawReading>,
{
    transform(readings, &TimeWindow::All, Utc::now())
}

/// The 24 hours ending at the most recent reading, both ends included.
///
/// Readings whose timestamp cannot be parsed never make it into this view.
pub fn recent_day(readings: &[RawReading]) -> SensorSeries {
    let latest = readings
        .iter()
        .filter_map(|reading| parse_timestamp(&reading.time))
        .max();

    let mut series = SensorSeries::default();
    let Some(latest) = latest else {
        return series;
    };
    let day_before = latest - TimeDelta::hours(24);

    for reading in readings {
        let Some(instant) = parse_timestamp(&reading.time) else {
            continue;
        };
        if instant < day_before || instant > latest {
            continue;
        }
        if let Some(metric) = Metric::from_channel(reading.channel_id) {
            series.push(
                metric,
                SensorPoint {
                    value: reading.value,
                    timestamp: reading.time.clone(),
                },
            );
        }
    }

    series
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn reading(channel_id: u32, value: f64, time: &str) -> RawReading {
        RawReading {
            channel_id,
            value,
            time: time.to_string(),
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_unknown_channel_is_dropped() {
        let readings = vec![
            reading(101, 20.0, "2024-01-01T00:00:00Z"),
            reading(999, 5.0, "2024-01-01T00:05:00Z"),
        ];

        let series = transform(&readings, &TimeWindow::All, now());

        assert_eq!(series.temperature.len(), 1);
        assert_eq!(series.temperature[0].value, 20.0);
        assert_eq!(series.temperature[0].timestamp, "2024-01-01T00:00:00Z");
        assert!(series.humidity.is_empty());
        assert!(series.pressure.is_empty());
    }

    #[test]
    fn test_no_unknown_channel_ever_leaks() {
        let readings: Vec<RawReading> = (90..120)
            .map(|channel| reading(channel, channel as f64, "2024-01-01T00:00:00Z"))
            .collect();

        let series = transform(&readings, &TimeWindow::All, now());

        assert_eq!(series.len(), 3);
        for metric in Metric::ALL {
            let points = series.get(metric);
            assert_eq!(points.len(), 1);
            assert_eq!(points[0].value, metric.channel_id() as f64);
        }
    }

    #[test]
    fn test_out_of_window_dropped_for_every_channel() {
        let readings = vec![
            reading(101, 1.0, "2023-06-01T00:00:00Z"),
            reading(102, 2.0, "2023-06-01T00:00:00Z"),
            reading(103, 3.0, "2023-06-01T00:00:00Z"),
            reading(103, 4.0, "2024-01-01T12:00:00Z"),
        ];

        let series = transform(&readings, &TimeWindow::LastDays(7), now());

        assert!(series.temperature.is_empty());
        assert!(series.humidity.is_empty());
        assert_eq!(series.pressure.len(), 1);
        assert_eq!(series.pressure[0].value, 4.0);
    }

    #[test]
    fn test_arrival_order_is_kept() {
        let readings = vec![
            reading(102, 3.0, "2024-01-01T03:00:00Z"),
            reading(102, 1.0, "2024-01-01T01:00:00Z"),
            reading(102, 2.0, "2024-01-01T02:00:00Z"),
        ];

        let series = bucket(&readings);
        let values: Vec<f64> = series.humidity.iter().map(|point| point.value).collect();

        assert_eq!(values, vec![3.0, 1.0, 2.0]);
    }

    #[test]
    fn test_empty_result_reports_no_data() {
        let readings = vec![reading(500, 1.0, "2024-01-01T00:00:00Z")];
        assert!(!transform(&readings, &TimeWindow::All, now()).has_data());
    }

    #[test]
    fn test_recent_day_is_anchored_on_latest_reading() {
        let readings = vec![
            reading(101, 1.0, "2024-03-01T00:00:00Z"),
            reading(101, 2.0, "2024-03-09T12:00:00Z"),
            reading(101, 3.0, "2024-03-10T12:00:00Z"),
            reading(102, 4.0, "2024-03-10T06:00:00Z"),
            reading(101, 5.0, "broken"),
        ];

        let series = recent_day(&readings);

        let values: Vec<f64> = series.temperature.iter().map(|point| point.value).collect();
        assert_eq!(values, vec![2.0, 3.0]);
        assert_eq!(series.humidity.len(), 1);
    }
}
