// SPDX-License-Identifier: MIT

use crate::api::{ApiError, FetchOutcome, RequestSequence, Ticket};
use crate::sensor::{bucket, Metric, RawReading, SensorSeries};

use super::{ModelSource, ObjectProperties};

/// State of the model browser: selection, property panel and the sensor chart.
pub struct BimViewer<M> {
    model: Option<M>,
    selected: Option<ObjectProperties>,
    pinned: bool,
    sensor_name: String,
    series: SensorSeries,
    active_tab: Metric,
    requests: RequestSequence,
}

impl<M> Default for BimViewer<M> {
    fn default() -> Self {
        Self {
            model: None,
            selected: None,
            pinned: false,
            sensor_name: String::new(),
            series: SensorSeries::default(),
            active_tab: Metric::Temperature,
            requests: RequestSequence::default(),
        }
    }
}

impl<M: ModelSource> BimViewer<M> {
    pub fn new(model: M) -> Self {
        Self {
            model: Some(model),
            ..Self::default()
        }
    }

    pub fn model(&self) -> Option<&M> {
        self.model.as_ref()
    }

    /// Replace the loaded model. Any selection refers to the old one and is dropped.
    pub fn set_model(&mut self, model: M) {
        self.model = Some(model);
        self.selected = None;
        self.pinned = false;
        self.reset_chart();
    }

    /// Handle a pick on the model. The first id that resolves to an entity
    /// wins. The chart is reset even while the panel is pinned.
    pub fn select(&mut self, express_ids: &[u32]) -> Option<&ObjectProperties> {
        self.reset_chart();

        let model = self.model.as_ref()?;
        let props = express_ids.iter().find_map(|&id| model.properties(id))?;
        log::debug!("Selected {} #{}", props.type_name, props.express_id);

        self.sensor_name = props.name.clone().unwrap_or_default();
        self.selected = Some(ObjectProperties::new(&props));
        self.selected.as_ref()
    }

    pub fn selected(&self) -> Option<&ObjectProperties> {
        self.selected.as_ref()
    }

    pub fn is_pinned(&self) -> bool {
        self.pinned
    }

    pub fn toggle_pin(&mut self) {
        self.pinned = !self.pinned;
    }

    /// Close the property panel unless it is pinned.
    pub fn close(&mut self) {
        if !self.pinned {
            self.selected = None;
        }
    }

    /// Unpin and drop the selection and its chart. The model stays loaded.
    pub fn clear_selection(&mut self) {
        self.selected = None;
        self.pinned = false;
        self.reset_chart();
    }

    pub fn sensor_name(&self) -> &str {
        &self.sensor_name
    }

    pub fn active_tab(&self) -> Metric {
        self.active_tab
    }

    pub fn set_active_tab(&mut self, metric: Metric) {
        self.active_tab = metric;
    }

    pub fn series(&self) -> &SensorSeries {
        &self.series
    }

    pub fn has_data(&self) -> bool {
        self.series.has_data()
    }

    /// Start loading the chart of the selected sensor. Returns the ticket and
    /// sensor name to query, or `None` when the selection is not a sensor.
    pub fn begin_fetch(&mut self) -> Option<(Ticket, String)> {
        let sensor = self.selected.as_ref().filter(|props| props.sensor)?;
        if self.sensor_name.is_empty() {
            return None;
        }
        log::debug!("Fetching chart for element #{}", sensor.express_id);
        Some((self.requests.begin(), self.sensor_name.clone()))
    }

    pub fn apply_fetch(
        &mut self,
        ticket: Ticket,
        result: Result<Vec<RawReading>, ApiError>,
    ) -> FetchOutcome {
        if !self.requests.is_current(ticket) {
            return FetchOutcome::Stale;
        }
        match result {
            Ok(readings) => {
                self.series = bucket(&readings);
                if self.series.has_data() {
                    FetchOutcome::Plotted
                } else {
                    FetchOutcome::NoData
                }
            }
            Err(error) => {
                log::warn!("Failed to fetch sensor data for {}: {error}", self.sensor_name);
                self.series.clear();
                FetchOutcome::Failed(error)
            }
        }
    }

    /// Release the model. Returns whether there was one to release.
    pub fn dispose(&mut self) -> bool {
        let released = self.model.take().is_some();
        if released {
            self.selected = None;
            self.reset_chart();
            log::info!("BIM model released");
        }
        released
    }

    fn reset_chart(&mut self) {
        self.requests.invalidate();
        self.series.clear();
        self.sensor_name.clear();
        self.active_tab = Metric::Temperature;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bim::EntityProps;
    use std::collections::BTreeMap;

    struct FakeModel(BTreeMap<u32, EntityProps>);

    impl FakeModel {
        fn new() -> Self {
            let entity = |express_id, type_name: &str, name: Option<&str>| {
                (
                    express_id,
                    EntityProps {
                        express_id,
                        type_name: type_name.to_string(),
                        global_id: Some(format!("guid-{express_id}")),
                        name: name.map(str::to_string),
                    },
                )
            };
            Self(BTreeMap::from([
                entity(1, "IFCWALL", Some("Wall")),
                entity(2, "IFCSENSOR", Some("sensor1")),
                entity(3, "IFCSENSOR", None),
            ]))
        }
    }

    impl ModelSource for FakeModel {
        fn properties(&self, express_id: u32) -> Option<EntityProps> {
            self.0.get(&express_id).cloned()
        }

        fn elements(&self) -> Vec<EntityProps> {
            self.0.values().cloned().collect()
        }
    }

    fn reading(channel_id: u32, value: f64) -> RawReading {
        RawReading {
            channel_id,
            value,
            time: "2024-01-01T00:00:00Z".to_string(),
        }
    }

    #[test]
    fn test_select_first_resolvable() {
        let mut viewer = BimViewer::new(FakeModel::new());
        let selected = viewer.select(&[42, 2, 1]).unwrap();
        assert_eq!(selected.class, "IFCSENSOR");
        assert!(selected.sensor);
        assert_eq!(viewer.sensor_name(), "sensor1");

        assert!(viewer.select(&[42]).is_none());
        assert_eq!(viewer.sensor_name(), "");
    }

    #[test]
    fn test_pin_keeps_panel_open() {
        let mut viewer = BimViewer::new(FakeModel::new());
        viewer.select(&[1]);
        viewer.toggle_pin();
        viewer.close();
        assert!(viewer.selected().is_some());

        viewer.toggle_pin();
        viewer.close();
        assert!(viewer.selected().is_none());
    }

    #[test]
    fn test_fetch_only_for_named_sensors() {
        let mut viewer = BimViewer::new(FakeModel::new());
        viewer.select(&[1]);
        assert!(viewer.begin_fetch().is_none());

        viewer.select(&[3]);
        assert!(viewer.begin_fetch().is_none());

        viewer.select(&[2]);
        let (_, name) = viewer.begin_fetch().unwrap();
        assert_eq!(name, "sensor1");
    }

    #[test]
    fn test_selection_resets_chart_even_when_pinned() {
        let mut viewer = BimViewer::new(FakeModel::new());
        viewer.select(&[2]);
        let (ticket, _) = viewer.begin_fetch().unwrap();
        assert!(matches!(
            viewer.apply_fetch(ticket, Ok(vec![reading(101, 20.0)])),
            FetchOutcome::Plotted
        ));
        viewer.set_active_tab(Metric::Pressure);
        viewer.toggle_pin();

        viewer.select(&[1]);
        assert!(!viewer.has_data());
        assert_eq!(viewer.active_tab(), Metric::Temperature);
        assert!(viewer.is_pinned());
    }

    #[test]
    fn test_stale_fetch_dropped() {
        let mut viewer = BimViewer::new(FakeModel::new());
        viewer.select(&[2]);
        let (first, _) = viewer.begin_fetch().unwrap();
        viewer.select(&[2]);
        let (second, _) = viewer.begin_fetch().unwrap();

        assert!(matches!(
            viewer.apply_fetch(second, Ok(vec![reading(102, 40.0)])),
            FetchOutcome::Plotted
        ));
        assert!(matches!(
            viewer.apply_fetch(first, Ok(vec![reading(101, 20.0)])),
            FetchOutcome::Stale
        ));
        assert!(viewer.series().temperature.is_empty());
        assert_eq!(viewer.series().humidity.len(), 1);
    }

    #[test]
    fn test_failed_fetch_empties_chart() {
        let mut viewer = BimViewer::new(FakeModel::new());
        viewer.select(&[2]);
        let (ticket, _) = viewer.begin_fetch().unwrap();
        let outcome = viewer.apply_fetch(
            ticket,
            Err(ApiError::Status {
                status: 500,
                path: "/sensorData".to_string(),
            }),
        );
        assert!(matches!(outcome, FetchOutcome::Failed(_)));
        assert!(!viewer.has_data());

        let (ticket, _) = viewer.begin_fetch().unwrap();
        assert!(matches!(
            viewer.apply_fetch(ticket, Ok(vec![reading(999, 1.0)])),
            FetchOutcome::NoData
        ));
    }

    #[test]
    fn test_clear_selection_keeps_model() {
        let mut viewer = BimViewer::new(FakeModel::new());
        viewer.select(&[2]);
        let (ticket, _) = viewer.begin_fetch().unwrap();
        viewer.toggle_pin();

        viewer.clear_selection();

        assert!(viewer.selected().is_none());
        assert!(!viewer.is_pinned());
        assert_eq!(viewer.sensor_name(), "");
        assert!(matches!(
            viewer.apply_fetch(ticket, Ok(vec![reading(101, 20.0)])),
            FetchOutcome::Stale
        ));
        assert!(viewer.model().is_some());
    }

    #[test]
    fn test_dispose_once() {
        let mut viewer = BimViewer::new(FakeModel::new());
        viewer.select(&[2]);
        assert!(viewer.dispose());
        assert!(!viewer.dispose());
        assert!(viewer.model().is_none());
        assert!(viewer.select(&[2]).is_none());
    }
}
