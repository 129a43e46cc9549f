// SPDX-License-Identifier: MIT

use std::collections::BTreeMap;
use std::fmt::Write as _;

use super::{parse_timestamp, Metric, SensorSeries};

/// Shape used to draw the analytics chart.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ChartType {
    #[default]
    Line,
    Bar,
    Area,
}

impl ChartType {
    pub const ALL: [ChartType; 3] = [ChartType::Line, ChartType::Bar, ChartType::Area];

    pub fn label(self) -> &'static str {
        match self {
            ChartType::Line => "Line",
            ChartType::Bar => "Bar",
            ChartType::Area => "Area",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|chart_type| chart_type.label().eq_ignore_ascii_case(label))
    }
}

/// Which metrics the analytics chart shows.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MetricFilter {
    #[default]
    All,
    Only(Metric),
}

impl MetricFilter {
    pub const ALL_LABEL: &'static str = "All Metrics";

    pub fn label(self) -> &'static str {
        match self {
            MetricFilter::All => Self::ALL_LABEL,
            MetricFilter::Only(metric) => metric.label(),
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        if label == Self::ALL_LABEL {
            return Some(MetricFilter::All);
        }
        Metric::ALL
            .into_iter()
            .find(|metric| metric.label() == label)
            .map(MetricFilter::Only)
    }

    /// Every label, in the order offered to the user.
    pub fn labels() -> Vec<&'static str> {
        std::iter::once(Self::ALL_LABEL)
            .chain(Metric::ALL.into_iter().map(Metric::label))
            .collect()
    }

    pub fn includes(self, metric: Metric) -> bool {
        match self {
            MetricFilter::All => true,
            MetricFilter::Only(only) => only == metric,
        }
    }

    pub fn metrics(self) -> Vec<Metric> {
        Metric::ALL.into_iter().filter(|metric| self.includes(*metric)).collect()
    }
}

/// One x-axis slot: the series are zipped by position, not by time.
#[derive(Clone, Debug, PartialEq)]
pub struct ChartRow {
    pub label: String,
    pub values: [Option<f64>; 3],
}

impl ChartRow {
    pub fn value(&self, metric: Metric) -> Option<f64> {
        self.values[metric as usize]
    }
}

/// Zips all three series by index into chart rows.
///
/// A row is labelled with the first timestamp present at that index, looking
/// at temperature, humidity and pressure in that order.
pub fn chart_rows(series: &SensorSeries) -> Vec<ChartRow> {
    let length = Metric::ALL
        .into_iter()
        .map(|metric| series.get(metric).len())
        .max()
        .unwrap_or(0);

    (0..length)
        .map(|index| {
            let label = Metric::ALL
                .into_iter()
                .find_map(|metric| series.get(metric).get(index))
                .map_or_else(|| format!("T{index}"), |point| axis_label(&point.timestamp, "%b %-d %H:%M"));

            ChartRow {
                label,
                values: Metric::ALL.map(|metric| series.get(metric).get(index).map(|point| point.value)),
            }
        })
        .collect()
}

/// Rows of a single metric, labelled with the time of day.
pub fn metric_rows(series: &SensorSeries, metric: Metric) -> Vec<ChartRow> {
    series
        .get(metric)
        .iter()
        .map(|point| {
            let mut values = [None; 3];
            values[metric as usize] = Some(point.value);
            ChartRow {
                label: axis_label(&point.timestamp, "%H:%M"),
                values,
            }
        })
        .collect()
}

/// One row per `HH:MM` time of day (UTC), sorted from midnight on.
///
/// Readings of the same metric at the same minute collapse into one slot; the
/// later reading wins. Unparsable timestamps are skipped.
pub fn time_of_day_rows(series: &SensorSeries) -> Vec<ChartRow> {
    let mut slots: BTreeMap<String, [Option<f64>; 3]> = BTreeMap::new();

    for metric in Metric::ALL {
        for point in series.get(metric) {
            let Some(instant) = parse_timestamp(&point.timestamp) else {
                continue;
            };
            let slot = slots.entry(instant.format("%H:%M").to_string()).or_default();
            slot[metric as usize] = Some(point.value);
        }
    }

    slots
        .into_iter()
        .map(|(label, values)| ChartRow { label, values })
        .collect()
}

fn axis_label(timestamp: &str, format: &str) -> String {
    parse_timestamp(timestamp).map_or_else(|| timestamp.to_string(), |instant| instant.format(format).to_string())
}

/// A bar in viewbox coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bar {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// Drawing instructions for one metric.
#[derive(Clone, Debug, PartialEq)]
pub struct SeriesGeometry {
    pub metric: Metric,
    /// SVG path commands for line and area charts, empty for bar charts.
    pub commands: String,
    pub bars: Vec<Bar>,
}

/// A chart laid out in a `VIEWBOX` x `VIEWBOX` square, y pointing down.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Chart {
    pub chart_type: ChartType,
    pub min: f64,
    pub max: f64,
    pub labels: Vec<String>,
    pub series: Vec<SeriesGeometry>,
}

impl Chart {
    pub const VIEWBOX: f32 = 100.0;

    pub fn build(rows: &[ChartRow], filter: MetricFilter, chart_type: ChartType) -> Self {
        let metrics: Vec<Metric> = filter
            .metrics()
            .into_iter()
            .filter(|metric| rows.iter().any(|row| row.value(*metric).is_some()))
            .collect();

        let values = || metrics.iter().flat_map(move |metric| rows.iter().filter_map(move |row| row.value(*metric)));
        let (Some(mut min), Some(mut max)) = (values().reduce(f64::min), values().reduce(f64::max)) else {
            return Self {
                chart_type,
                ..Self::default()
            };
        };

        if chart_type == ChartType::Bar {
            min = min.min(0.0);
            max = max.max(0.0);
        }
        if max - min < f64::EPSILON {
            min -= 1.0;
            max += 1.0;
        }

        let scale = Scale {
            min,
            max,
            slots: rows.len(),
        };
        let series = metrics
            .iter()
            .enumerate()
            .map(|(index, metric)| {
                let values: Vec<Option<f64>> = rows.iter().map(|row| row.value(*metric)).collect();
                match chart_type {
                    ChartType::Line => SeriesGeometry {
                        metric: *metric,
                        commands: scale.line(&values),
                        bars: Vec::new(),
                    },
                    ChartType::Area => SeriesGeometry {
                        metric: *metric,
                        commands: scale.area(&values),
                        bars: Vec::new(),
                    },
                    ChartType::Bar => SeriesGeometry {
                        metric: *metric,
                        commands: String::new(),
                        bars: scale.bars(&values, index, metrics.len()),
                    },
                }
            })
            .collect();

        Self {
            chart_type,
            min,
            max,
            labels: rows.iter().map(|row| row.label.clone()).collect(),
            series,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }
}

struct Scale {
    min: f64,
    max: f64,
    slots: usize,
}

impl Scale {
    fn x(&self, index: usize) -> f32 {
        if self.slots <= 1 {
            return Chart::VIEWBOX / 2.0;
        }
        Chart::VIEWBOX * index as f32 / (self.slots - 1) as f32
    }

    fn y(&self, value: f64) -> f32 {
        let ratio = (value - self.min) / (self.max - self.min);
        Chart::VIEWBOX * (1.0 - ratio as f32)
    }

    /// Polyline that lifts the pen over missing values.
    fn line(&self, values: &[Option<f64>]) -> String {
        let mut commands = String::new();
        let mut pen_down = false;

        for (index, value) in values.iter().enumerate() {
            match value {
                Some(value) => {
                    let verb = if pen_down { 'L' } else { 'M' };
                    let _ = write!(commands, "{verb} {:.2} {:.2} ", self.x(index), self.y(*value));
                    pen_down = true;
                }
                None => pen_down = false,
            }
        }

        commands.trim_end().to_string()
    }

    /// One closed shape per run of consecutive values, down to the bottom edge.
    fn area(&self, values: &[Option<f64>]) -> String {
        let mut commands = String::new();
        let mut index = 0;

        while index < values.len() {
            if values[index].is_none() {
                index += 1;
                continue;
            }

            let start = index;
            let _ = write!(commands, "M {:.2} {:.2} ", self.x(start), Chart::VIEWBOX);
            while let Some(Some(value)) = values.get(index) {
                let _ = write!(commands, "L {:.2} {:.2} ", self.x(index), self.y(*value));
                index += 1;
            }
            let _ = write!(commands, "L {:.2} {:.2} Z ", self.x(index - 1), Chart::VIEWBOX);
        }

        commands.trim_end().to_string()
    }

    /// Bars grouped per slot, one lane per series, growing from zero.
    fn bars(&self, values: &[Option<f64>], lane: usize, lanes: usize) -> Vec<Bar> {
        let slot = Chart::VIEWBOX / self.slots.max(1) as f32;
        let width = slot * 0.8 / lanes.max(1) as f32;
        let zero = self.y(0.0);

        values
            .iter()
            .enumerate()
            .filter_map(|(index, value)| {
                let top = self.y((*value)?);
                Some(Bar {
                    x: index as f32 * slot + slot * 0.1 + lane as f32 * width,
                    y: top.min(zero),
                    width,
                    height: (top - zero).abs(),
                })
            })
            .collect()
    }
}
