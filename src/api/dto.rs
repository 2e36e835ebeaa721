//! Data Transfer Objects
//!
//! Request and response shapes of the sensor platform API.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::reading::SensorReading;
use crate::session::User;

// ============================================
// Auth DTOs
// ============================================

/// Body of `POST /auth/login`
#[derive(Debug, Serialize)]
pub struct LoginRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

/// Successful login
#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: User,
}

// ============================================
// Sensor DTOs
// ============================================

/// One entry of `GET /sensors/summary`
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct SummaryEntry {
    pub total_records: u64,
    #[serde(default)]
    pub latest_update: Option<String>,
}

/// `GET /sensors/summary`: sensor name → counters
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(transparent)]
pub struct SensorSummary(pub BTreeMap<String, SummaryEntry>);

impl SensorSummary {
    pub fn count(&self, sensor: &str) -> Option<u64> {
        self.0.get(sensor).map(|e| e.total_records)
    }

    /// Sum of every sensor's record count
    pub fn total(&self) -> u64 {
        self.0.values().map(|e| e.total_records).sum()
    }
}

/// `GET /sensors/{type}/latest`
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LatestResponse {
    #[serde(default)]
    pub sensor_type: Option<String>,
    #[serde(default)]
    pub count: Option<usize>,
    #[serde(default)]
    pub data: Vec<SensorReading>,
}

/// `GET /sensors/{type}/statistics`
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StatisticsResponse {
    pub sensor_type: String,
    pub hours: u32,
    pub statistics: serde_json::Value,
}

/// `GET /sensors/types`
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SensorTypesResponse {
    pub sensor_types: Vec<String>,
    #[serde(default)]
    pub descriptions: BTreeMap<String, String>,
}

// ============================================
// Prediction DTOs
// ============================================

/// Forecast granularity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Frequency {
    /// Hourly points
    #[serde(rename = "H")]
    Hourly,
    /// Daily points
    #[serde(rename = "D")]
    Daily,
}

impl Frequency {
    /// Hourly for a one-week horizon, daily for anything else
    pub fn for_days(days: u32) -> Self {
        if days == 7 {
            Frequency::Hourly
        } else {
            Frequency::Daily
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Frequency::Hourly => "H",
            Frequency::Daily => "D",
        }
    }
}

/// Body of `POST /predictions/{type}/predict`
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PredictRequest {
    pub days: u32,
    pub frequency: Frequency,
}

impl PredictRequest {
    pub fn new(days: u32) -> Self {
        Self {
            days,
            frequency: Frequency::for_days(days),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct PredictionMetadata {
    pub prediction_days: u32,
    pub total_predictions: usize,
    #[serde(default)]
    pub sensor_type: Option<String>,
    #[serde(default)]
    pub frequency: Option<String>,
    #[serde(default)]
    pub generated_at: Option<String>,
}

/// Forecast produced by the ML endpoint
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct PredictionResult {
    pub metadata: PredictionMetadata,
    /// Field path → forecast values (null where the model produced none)
    #[serde(default)]
    pub predictions: BTreeMap<String, Vec<Option<f64>>>,
    /// Timestamps parallel to each forecast sequence
    #[serde(default)]
    pub timestamps: Vec<String>,
}

impl PredictionResult {
    /// Forecast for a field, empty when the model skipped it
    pub fn series(&self, field: &str) -> &[Option<f64>] {
        self.predictions.get(field).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Body of the training endpoints
#[derive(Debug, Clone, Serialize)]
pub struct TrainRequest {
    pub days: u32,
}

/// Test-set metrics of one trained field model
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct FieldMetrics {
    pub test_r2: f64,
    pub test_rmse: f64,
    pub test_mae: f64,
    pub samples: u64,
}

/// Per-sensor entry of `POST /predictions/train/all`
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SensorTrainingResult {
    pub success: bool,
    #[serde(default)]
    pub metrics: Option<BTreeMap<String, FieldMetrics>>,
}

/// Response of either training endpoint
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TrainingResponse {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub sensor_type: Option<String>,
    /// Single-sensor shape
    #[serde(default)]
    pub metrics: Option<BTreeMap<String, FieldMetrics>>,
    /// All-sensors shape
    #[serde(default)]
    pub results: Option<BTreeMap<String, SensorTrainingResult>>,
}

impl TrainingResponse {
    /// Flatten both response shapes into `(name, metrics)` rows.
    ///
    /// All-sensors rows are named `sensor/field`.
    pub fn rows(&self) -> Vec<(String, FieldMetrics)> {
        let mut rows: Vec<(String, FieldMetrics)> = self
            .metrics
            .iter()
            .flatten()
            .map(|(field, m)| (field.clone(), m.clone()))
            .collect();

        for (sensor, result) in self.results.iter().flatten() {
            for (field, m) in result.metrics.iter().flatten() {
                rows.push((format!("{}/{}", sensor, field), m.clone()));
            }
        }

        rows
    }

    /// Sensors the all-sensors endpoint reported as failed
    pub fn failed_sensors(&self) -> Vec<String> {
        self.results
            .iter()
            .flatten()
            .filter(|(_, r)| !r.success)
            .map(|(sensor, _)| sensor.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_frequency_heuristic() {
        assert_eq!(PredictRequest::new(7).frequency, Frequency::Hourly);
        assert_eq!(PredictRequest::new(30).frequency, Frequency::Daily);
        assert_eq!(PredictRequest::new(1).frequency, Frequency::Daily);
        assert_eq!(
            serde_json::to_value(PredictRequest::new(7)).unwrap(),
            json!({"days": 7, "frequency": "H"})
        );
    }

    #[test]
    fn test_summary_totals() {
        let summary: SensorSummary = serde_json::from_value(json!({
            "aire": {"total_records": 1200, "latest_update": "2024-03-01T10:00:00"},
            "sonido": {"total_records": 300, "latest_update": null},
            "soterrado": {"total_records": 0}
        }))
        .unwrap();

        assert_eq!(summary.count("aire"), Some(1200));
        assert_eq!(summary.count("agua"), None);
        assert_eq!(summary.total(), 1500);
    }

    #[test]
    fn test_prediction_with_nulls() {
        let result: PredictionResult = serde_json::from_value(json!({
            "metadata": {"prediction_days": 7, "total_predictions": 3, "frequency": "H"},
            "predictions": {"object.co2": [410.0, null, 415.5]},
            "timestamps": ["2024-03-02 00:00:00", "2024-03-02 01:00:00", "2024-03-02 02:00:00"]
        }))
        .unwrap();

        assert_eq!(result.series("object.co2"), &[Some(410.0), None, Some(415.5)]);
        assert!(result.series("object.humidity").is_empty());
    }

    #[test]
    fn test_training_rows_both_shapes() {
        let single: TrainingResponse = serde_json::from_value(json!({
            "message": "Modelo entrenado exitosamente",
            "sensor_type": "soterrado",
            "metrics": {"object.distance": {
                "train_r2": 0.95, "test_r2": 0.91, "train_rmse": 1.0,
                "test_rmse": 1.4, "train_mae": 0.8, "test_mae": 1.1, "samples": 900
            }}
        }))
        .unwrap();
        let rows = single.rows();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].0, "object.distance");
        assert_eq!(rows[0].1.samples, 900);

        let all: TrainingResponse = serde_json::from_value(json!({
            "message": "Entrenamiento completado",
            "results": {
                "aire": {"success": true, "metrics": {"object.co2": {
                    "test_r2": 0.8, "test_rmse": 20.0, "test_mae": 15.0, "samples": 400
                }}},
                "sonido": {"success": false, "metrics": null}
            }
        }))
        .unwrap();
        let rows = all.rows();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].0, "aire/object.co2");
        assert_eq!(all.failed_sensors(), vec!["sonido".to_string()]);
    }
}
