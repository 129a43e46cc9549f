// SPDX-License-Identifier: MIT

//! Inspecting elements of a BIM model and wiring sensors to their charts.

mod step;
mod viewer;

pub use step::{IfcModel, ModelError};
pub use viewer::BimViewer;

/// Type name the IFC schema uses for sensor instances.
pub const IFC_SENSOR_TYPE: &str = "IFCSENSOR";

/// Placeholder shown for sensor fields the model does not carry.
const PLACEHOLDER: &str = "-";

/// The attributes of a model entity the dashboard cares about.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EntityProps {
    pub express_id: u32,
    /// Upper case IFC type name, e.g. `IFCWALL`.
    pub type_name: String,
    pub global_id: Option<String>,
    pub name: Option<String>,
}

impl EntityProps {
    /// A sensor instance, or anything whose name mentions a sensor.
    pub fn is_sensor_like(&self) -> bool {
        self.type_name == IFC_SENSOR_TYPE
            || self
                .name
                .as_deref()
                .is_some_and(|name| name.to_lowercase().contains("sensor"))
    }
}

/// Source of entity properties, i.e. the loaded model.
pub trait ModelSource {
    /// Properties of one entity, if the id resolves to something with attributes.
    fn properties(&self, express_id: u32) -> Option<EntityProps>;

    /// The selectable building elements, ordered by id.
    fn elements(&self) -> Vec<EntityProps>;
}

/// What the property panel shows for the selected element.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ObjectProperties {
    pub express_id: u32,
    pub class: String,
    pub global_id: Option<String>,
    pub name: Option<String>,
    pub sensor: bool,
}

impl ObjectProperties {
    pub fn new(props: &EntityProps) -> Self {
        Self {
            express_id: props.express_id,
            class: props.type_name.clone(),
            global_id: props.global_id.clone(),
            name: props.name.clone(),
            sensor: props.is_sensor_like(),
        }
    }

    /// Key/value rows in display order. Sensors get the position, battery and
    /// status rows on top, which are not populated from the model yet.
    pub fn rows(&self) -> Vec<(&'static str, String)> {
        let value = |field: &Option<String>| field.clone().unwrap_or_else(|| PLACEHOLDER.to_string());

        let mut rows = vec![
            ("Class", self.class.clone()),
            ("GlobalId", value(&self.global_id)),
            ("Name", value(&self.name)),
        ];
        if self.sensor {
            for key in ["Position", "Battery", "Status"] {
                rows.push((key, PLACEHOLDER.to_string()));
            }
        }
        rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn props(type_name: &str, name: Option<&str>) -> EntityProps {
        EntityProps {
            express_id: 1,
            type_name: type_name.to_string(),
            global_id: Some("0YvctVUKr0kugbFTf53O9L".to_string()),
            name: name.map(str::to_string),
        }
    }

    #[test]
    fn test_sensor_classification() {
        assert!(props("IFCSENSOR", None).is_sensor_like());
        assert!(props("IFCWALL", Some("Wall SENSOR mount")).is_sensor_like());
        assert!(props("IFCFLOWTERMINAL", Some("room sensor 3")).is_sensor_like());
        assert!(!props("IFCWALL", Some("Exterior wall")).is_sensor_like());
        assert!(!props("IFCWALL", None).is_sensor_like());
    }

    #[test]
    fn test_property_rows() {
        let wall = ObjectProperties::new(&props("IFCWALL", Some("Wall")));
        let keys: Vec<&str> = wall.rows().iter().map(|(key, _)| *key).collect();
        assert_eq!(keys, vec!["Class", "GlobalId", "Name"]);

        let sensor = ObjectProperties::new(&props("IFCSENSOR", None));
        let rows = sensor.rows();
        assert_eq!(rows.len(), 6);
        assert_eq!(rows[2], ("Name", "-".to_string()));
        assert_eq!(rows[4], ("Battery", "-".to_string()));
    }
}
