// SPDX-License-Identifier: MIT

mod aggregate;
mod chart;
mod export;
mod series;
mod table;
mod window;

pub use aggregate::Aggregation;
pub use chart::{chart_rows, metric_rows, time_of_day_rows, Bar, Chart, ChartRow, ChartType, MetricFilter, SeriesGeometry};
pub use export::{export_csv, export_svg, ExportError};
pub use series::{bucket, recent_day, transform};
pub use table::{sensor_rows, LatestReadings, Pagination, Reading, SensorList, SensorRow, ROWS_PER_PAGE_OPTIONS};
pub use window::{parse_timestamp, DateRange, TimeWindow};

use serde::{Deserialize, Serialize};

/// Channel id carrying temperature readings.
pub const TEMPERATURE_CHANNEL: u32 = 101;
/// Channel id carrying humidity readings.
pub const HUMIDITY_CHANNEL: u32 = 102;
/// Channel id carrying air pressure readings.
pub const PRESSURE_CHANNEL: u32 = 103;

/// A single numerical reading as delivered by `GET /sensorData`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct RawReading {
    pub channel_id: u32,
    pub value: f64,
    pub time: String,
}

/// One plotted point of a series.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct SensorPoint {
    pub value: f64,
    pub timestamp: String,
}

/// The physical quantity a channel represents.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Metric {
    #[default]
    Temperature,
    Humidity,
    Pressure,
}

impl Metric {
    pub const ALL: [Metric; 3] = [Metric::Temperature, Metric::Humidity, Metric::Pressure];

    pub const fn channel_id(self) -> u32 {
        match self {
            Metric::Temperature => TEMPERATURE_CHANNEL,
            Metric::Humidity => HUMIDITY_CHANNEL,
            Metric::Pressure => PRESSURE_CHANNEL,
        }
    }

    /// Maps a channel id to its metric. Unknown channels have none.
    pub fn from_channel(channel_id: u32) -> Option<Self> {
        match channel_id {
            TEMPERATURE_CHANNEL => Some(Metric::Temperature),
            HUMIDITY_CHANNEL => Some(Metric::Humidity),
            PRESSURE_CHANNEL => Some(Metric::Pressure),
            _ => None,
        }
    }

    /// Lower case key, as used for the BIM panel tabs.
    pub fn key(self) -> &'static str {
        match self {
            Metric::Temperature => "temperature",
            Metric::Humidity => "humidity",
            Metric::Pressure => "pressure",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|metric| metric.key() == key)
    }

    /// Column label used by the analytics chart and the CSV export.
    pub fn label(self) -> &'static str {
        match self {
            Metric::Temperature => "Temperature",
            Metric::Humidity => "Humidity",
            Metric::Pressure => "Air Pressure",
        }
    }

    pub fn unit(self) -> &'static str {
        match self {
            Metric::Temperature => "°C",
            Metric::Humidity => "%",
            Metric::Pressure => "hPa",
        }
    }

    /// Series color as `0xRRGGBB`.
    pub fn color(self) -> u32 {
        match self {
            Metric::Temperature => 0xf44336,
            Metric::Humidity => 0x3f51b5,
            Metric::Pressure => 0x00bcd4,
        }
    }
}

/// Readings bucketed per metric, each bucket in arrival order.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct SensorSeries {
    pub temperature: Vec<SensorPoint>,
    pub humidity: Vec<SensorPoint>,
    pub pressure: Vec<SensorPoint>,
}

impl SensorSeries {
    pub fn get(&self, metric: Metric) -> &[SensorPoint] {
        match metric {
            Metric::Temperature => &self.temperature,
            Metric::Humidity => &self.humidity,
            Metric::Pressure => &self.pressure,
        }
    }

    pub fn push(&mut self, metric: Metric, point: SensorPoint) {
        match metric {
            Metric::Temperature => self.temperature.push(point),
            Metric::Humidity => self.humidity.push(point),
            Metric::Pressure => self.pressure.push(point),
        }
    }

    /// Total number of points over all metrics.
    pub fn len(&self) -> usize {
        self.temperature.len() + self.humidity.len() + self.pressure.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn has_data(&self) -> bool {
        !self.is_empty()
    }

    pub fn clear(&mut self) {
        self.temperature.clear();
        self.humidity.clear();
        self.pressure.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_mapping() {
        assert_eq!(Metric::from_channel(101), Some(Metric::Temperature));
        assert_eq!(Metric::from_channel(102), Some(Metric::Humidity));
        assert_eq!(Metric::from_channel(103), Some(Metric::Pressure));
        assert_eq!(Metric::from_channel(104), None);
        assert_eq!(Metric::from_channel(0), None);

        for metric in Metric::ALL {
            assert_eq!(Metric::from_channel(metric.channel_id()), Some(metric));
            assert_eq!(Metric::from_key(metric.key()), Some(metric));
        }
    }

    #[test]
    fn test_series_len_counts_every_bucket() {
        let mut series = SensorSeries::default();
        assert!(!series.has_data());

        series.push(Metric::Pressure, SensorPoint { value: 1013.0, timestamp: "t".into() });
        series.push(Metric::Humidity, SensorPoint { value: 40.0, timestamp: "t".into() });
        assert_eq!(series.len(), 2);
        assert!(series.has_data());
        assert!(series.get(Metric::Temperature).is_empty());

        series.clear();
        assert!(series.is_empty());
    }
}
