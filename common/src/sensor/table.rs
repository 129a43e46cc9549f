// SPDX-License-Identifier: MIT

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Page sizes offered below the sensor table.
pub const ROWS_PER_PAGE_OPTIONS: [usize; 4] = [5, 10, 25, 50];

const NOT_AVAILABLE: &str = "N/A";

/// The latest value of one quantity.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Reading {
    pub value: f64,
    pub time: String,
}

/// Latest readings of one sensor as reported by `GET /sensors`.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct LatestReadings {
    #[serde(default)]
    pub temperature: Option<Reading>,
    #[serde(default)]
    pub humidity: Option<Reading>,
    #[serde(default)]
    pub pressure: Option<Reading>,
}

impl LatestReadings {
    /// The first known update time, looking at temperature, humidity and
    /// pressure in that order.
    pub fn last_updated(&self) -> Option<&str> {
        [&self.temperature, &self.humidity, &self.pressure]
            .into_iter()
            .flatten()
            .map(|reading| reading.time.as_str())
            .find(|time| !time.is_empty())
    }
}

/// Sensor name to latest readings, ordered by name.
pub type SensorList = BTreeMap<String, LatestReadings>;

/// One display row of the sensor table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SensorRow {
    pub name: String,
    pub temperature: String,
    pub humidity: String,
    pub pressure: String,
    pub last_updated: String,
}

impl SensorRow {
    pub fn new(name: &str, readings: &LatestReadings) -> Self {
        fn cell(reading: &Option<Reading>) -> String {
            reading
                .as_ref()
                .map_or_else(|| NOT_AVAILABLE.to_string(), |reading| reading.value.to_string())
        }

        Self {
            name: name.to_string(),
            temperature: cell(&readings.temperature),
            humidity: cell(&readings.humidity),
            pressure: cell(&readings.pressure),
            last_updated: readings.last_updated().unwrap_or(NOT_AVAILABLE).to_string(),
        }
    }
}

pub fn sensor_rows(list: &SensorList) -> Vec<SensorRow> {
    list.iter().map(|(name, readings)| SensorRow::new(name, readings)).collect()
}

/// Client-side pagination of the sensor table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Pagination {
    page: usize,
    rows_per_page: usize,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: 0,
            rows_per_page: ROWS_PER_PAGE_OPTIONS[0],
        }
    }
}

impl Pagination {
    pub fn new(rows_per_page: usize) -> Self {
        let mut pagination = Self::default();
        pagination.set_rows_per_page(rows_per_page);
        pagination
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn rows_per_page(&self) -> usize {
        self.rows_per_page
    }

    /// Changes the page size and jumps back to the first page. Zero is ignored.
    pub fn set_rows_per_page(&mut self, rows_per_page: usize) {
        if rows_per_page == 0 {
            return;
        }
        self.rows_per_page = rows_per_page;
        self.page = 0;
    }

    pub fn page_count(&self, total: usize) -> usize {
        total.div_ceil(self.rows_per_page).max(1)
    }

    pub fn next(&mut self, total: usize) {
        if self.page + 1 < self.page_count(total) {
            self.page += 1;
        }
    }

    pub fn previous(&mut self) {
        self.page = self.page.saturating_sub(1);
    }

    /// The rows visible on the current page. The page is clamped first, so a
    /// shrinking table never shows an empty page past its end.
    pub fn slice<'a, T>(&mut self, rows: &'a [T]) -> &'a [T] {
        self.page = self.page.min(self.page_count(rows.len()) - 1);

        let start = (self.page * self.rows_per_page).min(rows.len());
        let end = (start + self.rows_per_page).min(rows.len());
        &rows[start..end]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> SensorList {
        serde_json::from_str(
            r#"{
                "sensor1": {
                    "temperature": { "value": 21.5, "time": "2024-05-01T10:00:00Z" },
                    "humidity": { "value": 40, "time": "2024-05-01T10:00:01Z" }
                },
                "sensor2": {
                    "pressure": { "value": 1013.2, "time": "2024-05-01T09:00:00Z" }
                },
                "sensor3": {}
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_rows_fill_missing_cells() {
        let rows = sensor_rows(&fixture());

        assert_eq!(rows.len(), 3);
        assert_eq!(
            rows[0],
            SensorRow {
                name: "sensor1".into(),
                temperature: "21.5".into(),
                humidity: "40".into(),
                pressure: "N/A".into(),
                last_updated: "2024-05-01T10:00:00Z".into(),
            }
        );
        assert_eq!(rows[1].temperature, "N/A");
        assert_eq!(rows[1].last_updated, "2024-05-01T09:00:00Z");
        assert_eq!(rows[2].last_updated, "N/A");
    }

    #[test]
    fn test_pagination() {
        let rows: Vec<usize> = (0..12).collect();
        let mut pagination = Pagination::default();

        assert_eq!(pagination.page_count(rows.len()), 3);
        assert_eq!(pagination.slice(&rows), &[0, 1, 2, 3, 4]);

        pagination.next(rows.len());
        pagination.next(rows.len());
        pagination.next(rows.len());
        assert_eq!(pagination.page(), 2);
        assert_eq!(pagination.slice(&rows), &[10, 11]);

        pagination.set_rows_per_page(10);
        assert_eq!(pagination.page(), 0);
        assert_eq!(pagination.slice(&rows).len(), 10);

        pagination.previous();
        assert_eq!(pagination.page(), 0);
    }

    #[test]
    fn test_slice_clamps_after_shrink() {
        let mut pagination = Pagination::default();
        let long: Vec<usize> = (0..20).collect();
        pagination.next(long.len());
        pagination.next(long.len());

        let short = [1, 2];
        assert_eq!(pagination.slice(&short), &[1, 2]);
        assert_eq!(pagination.page(), 0);

        let empty: [usize; 0] = [];
        assert!(pagination.slice(&empty).is_empty());
    }
}
