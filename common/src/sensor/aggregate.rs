// SPDX-License-Identifier: MIT

use super::SensorPoint;

/// Summary statistic shown next to a plotted series.
///
/// The plotted points themselves are never aggregated.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Aggregation {
    #[default]
    Mean,
    Median,
    Max,
}

impl Aggregation {
    pub const ALL: [Aggregation; 3] = [Aggregation::Mean, Aggregation::Median, Aggregation::Max];

    pub fn label(self) -> &'static str {
        match self {
            Aggregation::Mean => "Mean",
            Aggregation::Median => "Median",
            Aggregation::Max => "Max",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|aggregation| aggregation.label() == label)
    }

    /// Computes the statistic, or `None` for an empty series.
    pub fn apply(self, points: &[SensorPoint]) -> Option<f64> {
        if points.is_empty() {
            return None;
        }

        let values = points.iter().map(|point| point.value);
        match self {
            Aggregation::Mean => Some(values.sum::<f64>() / points.len() as f64),
            Aggregation::Max => values.reduce(f64::max),
            Aggregation::Median => {
                let mut sorted: Vec<f64> = values.collect();
                sorted.sort_by(f64::total_cmp);

                let middle = sorted.len() / 2;
                if sorted.len() % 2 == 0 {
                    Some((sorted[middle - 1] + sorted[middle]) / 2.0)
                } else {
                    Some(sorted[middle])
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn points(values: &[f64]) -> Vec<SensorPoint> {
        values
            .iter()
            .map(|value| SensorPoint {
                value: *value,
                timestamp: String::new(),
            })
            .collect()
    }

    #[test]
    fn test_aggregations() {
        let odd = points(&[3.0, 1.0, 2.0]);
        assert_eq!(Aggregation::Mean.apply(&odd), Some(2.0));
        assert_eq!(Aggregation::Median.apply(&odd), Some(2.0));
        assert_eq!(Aggregation::Max.apply(&odd), Some(3.0));

        let even = points(&[4.0, 1.0, 3.0, 2.0]);
        assert_eq!(Aggregation::Median.apply(&even), Some(2.5));
        assert_eq!(Aggregation::Mean.apply(&even), Some(2.5));
    }

    #[test]
    fn test_empty_series_has_no_aggregate() {
        for aggregation in Aggregation::ALL {
            assert_eq!(aggregation.apply(&[]), None);
        }
    }
}
