//! Charts
//!
//! A chart is described by a [`ChartSpec`] (labels plus one or more
//! datasets), drawn by a [`ChartBackend`], and tracked in a
//! [`ChartRegistry`] so that each mount point holds at most one live chart.

pub mod registry;
pub mod renderer;
pub mod series;
pub mod stats;
pub mod svg;
pub mod terminal;

pub use registry::{ChartHandle, ChartRegistry};
pub use renderer::{ChartBackend, ChartRenderer, RenderError};
pub use stats::SummaryStats;
pub use svg::SvgBackend;
pub use terminal::TerminalBackend;

use serde::Serialize;

use crate::api::PredictionResult;
use crate::reading::SensorReading;
use crate::sensors::FieldConfig;

/// Color of every forecast dataset
pub const PREDICTION_COLOR: &str = "#f59e0b";

/// One line on a chart
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dataset {
    pub label: String,
    pub color: String,
    /// One value per chart label; `None` leaves a gap
    pub values: Vec<Option<f64>>,
    pub dashed: bool,
    pub filled: bool,
}

/// Everything a backend needs to draw a chart
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSpec {
    pub mount_id: String,
    pub title: String,
    pub labels: Vec<String>,
    pub datasets: Vec<Dataset>,
    /// Overlay shown under the title
    pub stats: Option<SummaryStats>,
}

impl ChartSpec {
    /// Line chart of one field over the given readings (oldest first)
    pub fn series(mount_id: &str, readings: &[SensorReading], field: &FieldConfig) -> Self {
        let values = series::extract_series(readings, field.path);
        let stats = SummaryStats::compute(values.iter().copied());

        Self {
            mount_id: mount_id.to_string(),
            title: format!("{} - Últimas lecturas", field.label),
            labels: series::series_labels(readings),
            datasets: vec![Dataset {
                label: field.label.to_string(),
                color: field.color.to_string(),
                values: values.into_iter().map(Some).collect(),
                dashed: false,
                filled: true,
            }],
            stats: Some(stats),
        }
    }

    /// Historical readings followed by the forecast, on one shared axis
    pub fn comparison(
        mount_id: &str,
        historical: &[SensorReading],
        prediction: &PredictionResult,
        field: &FieldConfig,
    ) -> Self {
        let forecast = prediction.series(field.path);
        let hist_values = series::extract_series(historical, field.path);
        let (hist, pred) = series::align_comparison(&hist_values, forecast);

        let mut labels = series::history_labels(historical);
        labels.extend(series::forecast_labels(&prediction.timestamps, forecast.len()));

        Self {
            mount_id: mount_id.to_string(),
            title: format!("{} - Histórico vs Predicción", field.label),
            labels,
            datasets: vec![
                Dataset {
                    label: "Datos Históricos".to_string(),
                    color: field.color.to_string(),
                    values: hist,
                    dashed: false,
                    filled: false,
                },
                Dataset {
                    label: "Predicción ML".to_string(),
                    color: PREDICTION_COLOR.to_string(),
                    values: pred,
                    dashed: true,
                    filled: false,
                },
            ],
            stats: None,
        }
    }

    /// Number of points on the x axis
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensors::SensorType;
    use serde_json::json;

    fn readings(values: &[f64]) -> Vec<SensorReading> {
        let mut data: Vec<SensorReading> =
            serde_json::from_value(crate::testing::readings_json("co2", values)).unwrap();
        data.reverse();
        data
    }

    #[test]
    fn test_series_spec() {
        let field = SensorType::Aire.field("object.co2").unwrap();
        let spec = ChartSpec::series("aire-co2-chart", &readings(&[400.0, 410.0, 420.0]), field);

        assert_eq!(spec.title, "CO2 (ppm) - Últimas lecturas");
        assert_eq!(spec.labels, vec!["10:00", "10:01", "10:02"]);
        assert_eq!(spec.datasets.len(), 1);
        assert_eq!(
            spec.datasets[0].values,
            vec![Some(400.0), Some(410.0), Some(420.0)]
        );
        assert_eq!(spec.datasets[0].color, "#3b82f6");
        assert_eq!(spec.stats.unwrap().mean, 410.0);
    }

    #[test]
    fn test_comparison_spec_lengths() {
        let field = SensorType::Aire.field("object.co2").unwrap();
        let prediction: PredictionResult = serde_json::from_value(json!({
            "metadata": {"prediction_days": 7, "total_predictions": 2},
            "predictions": {"object.co2": [430.0, null]},
            "timestamps": ["2024-03-02T00:00:00", "2024-03-02T01:00:00"]
        }))
        .unwrap();

        let historical = readings(&[400.0, 410.0, 420.0]);
        let spec = ChartSpec::comparison("pred-aire-0", &historical, &prediction, field);

        assert_eq!(spec.len(), 5);
        assert_eq!(spec.title, "CO2 (ppm) - Histórico vs Predicción");
        assert_eq!(spec.datasets[0].label, "Datos Históricos");
        assert_eq!(spec.datasets[1].label, "Predicción ML");
        for dataset in &spec.datasets {
            assert_eq!(dataset.values.len(), 5);
        }
        let forecast = &spec.datasets[1];
        assert!(forecast.dashed);
        assert_eq!(forecast.color, PREDICTION_COLOR);
        assert_eq!(forecast.values[..3], [None, None, None]);
        assert_eq!(forecast.values[3], Some(430.0));
        assert_eq!(spec.labels[3], "02 Mar");
    }

    #[test]
    fn test_comparison_without_forecast_for_field() {
        let field = SensorType::Aire.field("object.humidity").unwrap();
        let prediction = PredictionResult::default();

        let spec = ChartSpec::comparison("pred-aire-2", &readings(&[1.0, 2.0]), &prediction, field);

        assert_eq!(spec.len(), 2);
        assert_eq!(spec.datasets[1].values, vec![None, None]);
    }
}
