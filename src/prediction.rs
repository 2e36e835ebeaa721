//! Prediction Controller
//!
//! Forecast generation and model training. At most one request per
//! (target, operation) is in flight; a second submission while the first
//! is pending is rejected without touching the network.

use serde::{Serialize, Serializer};
use std::collections::HashSet;
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use tracing::{error, info, warn};

use crate::api::{
    ApiClient, ApiError, FieldMetrics, PredictRequest, PredictionResult, TrainingResponse,
};
use crate::auth::AuthController;
use crate::chart::{ChartRenderer, SummaryStats};
use crate::sensors::{SensorType, UnknownSensor};
use crate::ui::{Diagnostic, NoticeLevel, Panel, RetryAction, Surface, Target};

/// Historical points fetched alongside a forecast
pub fn history_limit(days: u32) -> u32 {
    if days == 7 {
        168
    } else {
        30
    }
}

/// Mount id of the comparison chart for a sensor's `index`-th field
pub fn prediction_mount(sensor: SensorType, index: usize) -> String {
    format!("pred-{}-{}", sensor, index)
}

// ============================================
// Training types
// ============================================

/// What a training run covers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrainTarget {
    Sensor(SensorType),
    All,
}

impl TrainTarget {
    /// Wording used in prompts and reports
    pub fn description(&self) -> String {
        match self {
            TrainTarget::Sensor(sensor) => sensor.to_string(),
            TrainTarget::All => "todos los sensores".to_string(),
        }
    }
}

impl std::fmt::Display for TrainTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrainTarget::Sensor(sensor) => write!(f, "{}", sensor),
            TrainTarget::All => f.write_str("all"),
        }
    }
}

impl FromStr for TrainTarget {
    type Err = UnknownSensor;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("all") {
            Ok(TrainTarget::All)
        } else {
            s.parse().map(TrainTarget::Sensor)
        }
    }
}

impl Serialize for TrainTarget {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Quality band of a model's test R²
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum R2Tier {
    Good,
    Fair,
    Poor,
}

impl R2Tier {
    /// ≥ 0.85 good, ≥ 0.70 fair, anything lower poor
    pub fn from_r2(r2: f64) -> Self {
        if r2 >= 0.85 {
            R2Tier::Good
        } else if r2 >= 0.70 {
            R2Tier::Fair
        } else {
            R2Tier::Poor
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            R2Tier::Good => "bueno",
            R2Tier::Fair => "regular",
            R2Tier::Poor => "bajo",
        }
    }

    pub fn color(&self) -> &'static str {
        match self {
            R2Tier::Good => "#10b981",
            R2Tier::Fair => "#f59e0b",
            R2Tier::Poor => "#ef4444",
        }
    }
}

/// One trained field model
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsRow {
    pub name: String,
    /// Test R² × 100
    pub r2_percent: f64,
    pub tier: R2Tier,
    pub rmse: f64,
    pub mae: f64,
    pub samples: u64,
}

impl MetricsRow {
    pub fn new(name: impl Into<String>, metrics: &FieldMetrics) -> Self {
        Self {
            name: name.into(),
            r2_percent: metrics.test_r2 * 100.0,
            tier: R2Tier::from_r2(metrics.test_r2),
            rmse: metrics.test_rmse,
            mae: metrics.test_mae,
            samples: metrics.samples,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrainingReport {
    pub target: TrainTarget,
    pub days: u32,
    pub message: Option<String>,
    pub rows: Vec<MetricsRow>,
    /// Sensors an all-sensors run reported as failed
    pub failed_sensors: Vec<String>,
}

impl TrainingReport {
    pub fn from_response(target: TrainTarget, days: u32, response: &TrainingResponse) -> Self {
        Self {
            target,
            days,
            message: response.message.clone(),
            rows: response
                .rows()
                .iter()
                .map(|(name, metrics)| MetricsRow::new(name.clone(), metrics))
                .collect(),
            failed_sensors: response.failed_sensors(),
        }
    }
}

// ============================================
// Outcomes
// ============================================

#[derive(Debug, Clone, PartialEq)]
pub enum PredictionOutcome {
    Rendered { charts: usize },
    /// A forecast for this sensor was already in flight
    Duplicate,
    /// A 401 ended the session
    Unauthorized,
    Failed(ApiError),
}

#[derive(Debug, Clone, PartialEq)]
pub enum TrainingOutcome {
    /// The confirmation was declined
    Cancelled,
    Trained(TrainingReport),
    PermissionDenied,
    Unauthorized,
    Failed(ApiError),
    Duplicate,
}

// ============================================
// In-flight set
// ============================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Operation {
    Predict,
    Train,
}

type InFlightKey = (String, Operation);

/// Removes its key from the in-flight set when dropped
struct InFlightGuard<'a> {
    set: &'a Mutex<HashSet<InFlightKey>>,
    key: InFlightKey,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        match self.set.lock() {
            Ok(mut set) => set.remove(&self.key),
            Err(poisoned) => poisoned.into_inner().remove(&self.key),
        };
    }
}

// ============================================
// Controller
// ============================================

pub struct PredictionController {
    client: ApiClient,
    auth: Arc<AuthController>,
    charts: Arc<ChartRenderer>,
    surface: Arc<dyn Surface>,
    in_flight: Mutex<HashSet<InFlightKey>>,
}

impl PredictionController {
    pub fn new(
        client: ApiClient,
        auth: Arc<AuthController>,
        charts: Arc<ChartRenderer>,
        surface: Arc<dyn Surface>,
    ) -> Self {
        Self {
            client,
            auth,
            charts,
            surface,
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    fn begin(&self, target: String, operation: Operation) -> Option<InFlightGuard<'_>> {
        let key = (target, operation);
        let inserted = match self.in_flight.lock() {
            Ok(mut set) => set.insert(key.clone()),
            Err(poisoned) => poisoned.into_inner().insert(key.clone()),
        };

        inserted.then(|| InFlightGuard {
            set: &self.in_flight,
            key,
        })
    }

    /// Generate a forecast and chart it against recent history.
    pub async fn request_prediction(&self, sensor: SensorType, days: u32) -> PredictionOutcome {
        let Some(_guard) = self.begin(sensor.to_string(), Operation::Predict) else {
            return self.prediction_in_progress(sensor);
        };

        self.surface.show(
            Target::PredictionResults,
            Panel::Busy {
                message: format!("Generando predicciones para {} días...", days),
            },
        );

        let request = PredictRequest::new(days);
        info!(%sensor, days, frequency = request.frequency.as_str(), "Requesting prediction");

        let prediction = match self.client.predict(sensor, &request).await {
            Ok(prediction) => prediction,
            Err(e) => return self.prediction_failed(sensor, days, e).await,
        };

        self.render_prediction(sensor, days, &prediction).await
    }

    /// Chart the last forecast the server stored for `sensor`, without
    /// generating a new one.
    pub async fn show_latest_prediction(&self, sensor: SensorType) -> PredictionOutcome {
        let Some(_guard) = self.begin(sensor.to_string(), Operation::Predict) else {
            return self.prediction_in_progress(sensor);
        };

        let prediction = match self.client.latest_prediction(sensor).await {
            Ok(prediction) => prediction,
            Err(e) => {
                if self.auth.intercept(&e).await {
                    return PredictionOutcome::Unauthorized;
                }
                error!(%sensor, error = %e, "Failed to load stored prediction");
                self.surface.show(
                    Target::PredictionResults,
                    Panel::Diagnostic(Diagnostic::load_failed(
                        &format!("la última predicción de {}", sensor),
                        &e,
                        RetryAction::ShowLatestPrediction { sensor },
                    )),
                );
                return PredictionOutcome::Failed(e);
            }
        };

        let days = prediction.metadata.prediction_days;
        self.render_prediction(sensor, days, &prediction).await
    }

    async fn render_prediction(
        &self,
        sensor: SensorType,
        days: u32,
        prediction: &PredictionResult,
    ) -> PredictionOutcome {
        let mut historical = match self.client.latest(sensor, history_limit(days)).await {
            Ok(latest) => latest.data,
            Err(e) => return self.prediction_failed(sensor, days, e).await,
        };
        historical.reverse();

        self.surface.show(
            Target::PredictionResults,
            Panel::PredictionSummary {
                sensor,
                prediction_days: prediction.metadata.prediction_days,
                total_predictions: prediction.metadata.total_predictions,
            },
        );

        let mut rendered = 0;
        for (index, field) in sensor.fields().iter().enumerate() {
            let mount = prediction_mount(sensor, index);
            match self
                .charts
                .render_comparison(&mount, &historical, prediction, field)
                .await
            {
                Ok(_) => rendered += 1,
                Err(e) => {
                    error!(
                        %sensor,
                        field = field.path,
                        error = %e,
                        "Failed to render prediction chart"
                    );
                    self.surface.show(
                        Target::Notifications,
                        Panel::notice(
                            NoticeLevel::Error,
                            format!("No se pudo dibujar {}: {}", field.label, e),
                        ),
                    );
                }
            }

            let forecast = prediction.series(field.path);
            if !forecast.is_empty() {
                self.surface.show(
                    Target::PredictionResults,
                    Panel::PredictionStats {
                        label: field.label.to_string(),
                        stats: SummaryStats::from_optional(forecast),
                    },
                );
            }
        }

        info!(%sensor, days, charts = rendered, "Prediction rendered");
        PredictionOutcome::Rendered { charts: rendered }
    }

    fn prediction_in_progress(&self, sensor: SensorType) -> PredictionOutcome {
        warn!(%sensor, "Prediction already in progress");
        self.surface.show(
            Target::Notifications,
            Panel::notice(
                NoticeLevel::Warning,
                format!("Ya hay una predicción en curso para {}", sensor),
            ),
        );
        PredictionOutcome::Duplicate
    }

    async fn prediction_failed(
        &self,
        sensor: SensorType,
        days: u32,
        e: ApiError,
    ) -> PredictionOutcome {
        if self.auth.intercept(&e).await {
            return PredictionOutcome::Unauthorized;
        }

        error!(%sensor, days, error = %e, "Prediction failed");
        self.surface.show(
            Target::PredictionResults,
            Panel::Diagnostic(Diagnostic::prediction_failed(sensor, days, &e)),
        );
        PredictionOutcome::Failed(e)
    }

    /// Train models for `target` after `confirm` accepts the prompt.
    ///
    /// Declining sends nothing. A 403 leaves the session alone.
    pub async fn request_training<F>(
        &self,
        target: TrainTarget,
        days: u32,
        confirm: F,
    ) -> TrainingOutcome
    where
        F: FnOnce(&str) -> bool,
    {
        let Some(_guard) = self.begin(target.to_string(), Operation::Train) else {
            warn!(%target, "Training already in progress");
            self.surface.show(
                Target::Notifications,
                Panel::notice(
                    NoticeLevel::Warning,
                    format!("Ya hay un entrenamiento en curso para {}", target.description()),
                ),
            );
            return TrainingOutcome::Duplicate;
        };

        let prompt = format!(
            "¿Está seguro de entrenar el modelo para {} con {} días de datos?\n\nEsto puede tardar varios minutos.",
            target.description(),
            days
        );
        if !confirm(&prompt) {
            info!(%target, "Training cancelled");
            return TrainingOutcome::Cancelled;
        }

        self.surface.show(
            Target::TrainingResults,
            Panel::Busy {
                message: format!(
                    "Entrenando modelos de Machine Learning... Sensor: {} | Días de entrenamiento: {}",
                    target.description(),
                    days
                ),
            },
        );
        info!(%target, days, "Requesting training");

        let result = match target {
            TrainTarget::Sensor(sensor) => self.client.train(sensor, days).await,
            TrainTarget::All => self.client.train_all(days).await,
        };

        match result {
            Ok(response) => {
                let report = TrainingReport::from_response(target, days, &response);
                info!(%target, models = report.rows.len(), "Training completed");
                self.surface
                    .show(Target::TrainingResults, Panel::Training(report.clone()));
                TrainingOutcome::Trained(report)
            }
            Err(e) if e.is_forbidden() => {
                warn!(%target, "Training refused: insufficient permissions");
                self.surface
                    .show(Target::TrainingResults, Panel::permission_denied());
                TrainingOutcome::PermissionDenied
            }
            Err(e) => {
                if self.auth.intercept(&e).await {
                    return TrainingOutcome::Unauthorized;
                }
                error!(%target, days, error = %e, "Training failed");
                self.surface.show(
                    Target::TrainingResults,
                    Panel::Diagnostic(Diagnostic::training_failed(target, days, &e)),
                );
                TrainingOutcome::Failed(e)
            }
        }
    }
}

impl std::fmt::Debug for PredictionController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PredictionController")
            .field("client", &self.client)
            .finish_non_exhaustive()
    }
}
