//! Display surface
//!
//! Controllers never print directly. They hand a [`Panel`] to a
//! [`Surface`] for a named [`Target`] region; the terminal surface writes
//! it out, the memory surface records it.

use serde::Serialize;
use std::collections::BTreeMap;
use std::io::Write;
use std::sync::Mutex;

use crate::api::ApiError;
use crate::chart::SummaryStats;
use crate::prediction::{TrainTarget, TrainingReport};
use crate::sensors::SensorType;

/// Region of the dashboard a panel is shown in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Target {
    LoginError,
    UserBadge,
    AdminSections,
    Overview,
    Sensor(SensorType),
    PredictionResults,
    TrainingResults,
    Notifications,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// User-initiated follow-up offered by a diagnostic
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum RetryAction {
    ReloadOverview,
    ReloadSensor { sensor: SensorType },
    Predict { sensor: SensorType, days: u32 },
    ShowLatestPrediction { sensor: SensorType },
    Train { target: TrainTarget, days: u32 },
}

impl std::fmt::Display for RetryAction {
    /// The CLI invocation that repeats the failed operation
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RetryAction::ReloadOverview => write!(f, "iot-dashboard overview"),
            RetryAction::ReloadSensor { sensor } => write!(f, "iot-dashboard sensor {}", sensor),
            RetryAction::Predict { sensor, days } => {
                write!(f, "iot-dashboard predict {} --days {}", sensor, days)
            }
            RetryAction::ShowLatestPrediction { sensor } => {
                write!(f, "iot-dashboard predict {} --latest", sensor)
            }
            RetryAction::Train { target, days } => {
                write!(f, "iot-dashboard train {} --days {}", target, days)
            }
        }
    }
}

/// Fixed error explanation with a retry action
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub title: String,
    /// Error text of the failure that triggered the panel
    pub detail: Option<String>,
    pub causes: Vec<String>,
    pub remedies: Vec<String>,
    pub retry: RetryAction,
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Diagnostic {
    pub fn load_failed(what: &str, error: &ApiError, retry: RetryAction) -> Self {
        Self {
            title: format!("Error cargando datos de {}", what),
            detail: Some(error.to_string()),
            causes: strings(&[
                "Error de conexión con la API",
                "El servidor no pudo completar la consulta",
            ]),
            remedies: strings(&[
                "Verificar que la API está en ejecución",
                "Reintentar la carga",
            ]),
            retry,
        }
    }

    pub fn prediction_failed(sensor: SensorType, days: u32, error: &ApiError) -> Self {
        Self {
            title: "Error generando predicciones".to_string(),
            detail: Some(error.to_string()),
            causes: strings(&[
                "No hay datos suficientes en MongoDB (mínimo 50 registros)",
                "Los modelos no están entrenados",
                "Error de conexión con la API",
            ]),
            remedies: vec![
                format!(
                    "Verificar que hay datos: ir a la pestaña \"{}\"",
                    sensor.as_str().to_uppercase()
                ),
                "Si no hay datos, cargarlos con el productor CSV de ingesta".to_string(),
                "Entrenar modelos: pestaña \"Administración\" → Entrenar Modelos".to_string(),
            ],
            retry: RetryAction::Predict { sensor, days },
        }
    }

    pub fn training_failed(target: TrainTarget, days: u32, error: &ApiError) -> Self {
        Self {
            title: "Error en el entrenamiento".to_string(),
            detail: Some(error.to_string()),
            causes: strings(&[
                "No hay suficientes datos en MongoDB (mínimo 50 registros)",
                "Permisos insuficientes (solo administradores)",
                "Error de conexión con la API",
            ]),
            remedies: strings(&[
                "Verificar que está logueado como administrador",
                "Cargar datos con el productor CSV de ingesta",
                "Verificar logs de la API en la terminal",
            ]),
            retry: RetryAction::Train { target, days },
        }
    }
}

/// Content shown in a region
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "panel", rename_all = "snake_case")]
pub enum Panel {
    LoginError {
        message: String,
    },
    UserBadge {
        full_name: String,
        role_label: String,
    },
    AdminSections {
        visible: bool,
    },
    /// Record counts per sensor plus the grand total
    Counters {
        per_sensor: BTreeMap<String, u64>,
        total: u64,
    },
    Busy {
        message: String,
    },
    PredictionSummary {
        sensor: SensorType,
        prediction_days: u32,
        total_predictions: usize,
    },
    PredictionStats {
        label: String,
        stats: SummaryStats,
    },
    Training(TrainingReport),
    PermissionDenied {
        title: String,
        message: String,
    },
    Diagnostic(Diagnostic),
    Notice {
        level: NoticeLevel,
        message: String,
    },
}

impl Panel {
    pub fn notice(level: NoticeLevel, message: impl Into<String>) -> Self {
        Panel::Notice {
            level,
            message: message.into(),
        }
    }

    pub fn permission_denied() -> Self {
        Panel::PermissionDenied {
            title: "Permisos insuficientes".to_string(),
            message: "Solo los administradores pueden entrenar modelos.".to_string(),
        }
    }
}

/// Where controllers put what the user sees
pub trait Surface: Send + Sync {
    fn show(&self, target: Target, panel: Panel);
}

// ============================================
// Terminal
// ============================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text
    #[default]
    Table,
    /// One JSON object per panel
    Json,
}

pub struct TerminalSurface {
    out: Mutex<Box<dyn Write + Send>>,
    format: OutputFormat,
}

impl TerminalSurface {
    pub fn stdout(format: OutputFormat) -> Self {
        Self::with_writer(Box::new(std::io::stdout()), format)
    }

    pub fn with_writer(out: Box<dyn Write + Send>, format: OutputFormat) -> Self {
        Self {
            out: Mutex::new(out),
            format,
        }
    }
}

impl Surface for TerminalSurface {
    fn show(&self, target: Target, panel: Panel) {
        let text = match self.format {
            OutputFormat::Table => render_panel(&panel),
            OutputFormat::Json => {
                let line = serde_json::json!({ "target": target, "content": panel });
                format!("{}\n", line)
            }
        };

        let Ok(mut out) = self.out.lock() else {
            tracing::warn!("Terminal surface writer poisoned");
            return;
        };
        if let Err(e) = out.write_all(text.as_bytes()).and_then(|_| out.flush()) {
            tracing::warn!(error = %e, "Failed to write panel");
        }
    }
}

/// Plain-text rendering of a panel
pub fn render_panel(panel: &Panel) -> String {
    let mut text = String::new();
    match panel {
        Panel::LoginError { message } => {
            text.push_str(&format!("✗ {}\n", message));
        }
        Panel::UserBadge {
            full_name,
            role_label,
        } => {
            text.push_str(&format!("👤 {} ({})\n", full_name, role_label));
        }
        Panel::AdminSections { visible } => {
            if *visible {
                text.push_str("Secciones de administración disponibles: train\n");
            }
        }
        Panel::Counters { per_sensor, total } => {
            for (sensor, count) in per_sensor {
                text.push_str(&format!("  {:<12} {:>10}\n", sensor, count));
            }
            text.push_str(&format!("  {:<12} {:>10}\n", "total", total));
        }
        Panel::Busy { message } => {
            text.push_str(&format!("⏳ {}\n", message));
        }
        Panel::PredictionSummary {
            sensor,
            prediction_days,
            total_predictions,
        } => {
            text.push_str(&format!(
                "✅ Predicciones generadas para {}: {} días | {} puntos de datos\n",
                sensor, prediction_days, total_predictions
            ));
        }
        Panel::PredictionStats { label, stats } => {
            text.push_str(&format!("   Estadísticas de Predicción ({}): {}\n", label, stats));
        }
        Panel::Training(report) => {
            text.push_str(&format!(
                "✅ Entrenamiento completado: {} ({} días)\n",
                report.target.description(),
                report.days
            ));
            if let Some(message) = &report.message {
                text.push_str(&format!("   {}\n", message));
            }
            if !report.rows.is_empty() {
                text.push_str(&format!(
                    "   {:<28} {:>9} {:>6} {:>10} {:>10} {:>9}\n",
                    "Campo", "R²", "", "RMSE", "MAE", "Muestras"
                ));
            }
            for row in &report.rows {
                text.push_str(&format!(
                    "   {:<28} {:>8.2}% {:>6} {:>10.2} {:>10.2} {:>9}\n",
                    row.name,
                    row.r2_percent,
                    row.tier.label(),
                    row.rmse,
                    row.mae,
                    row.samples
                ));
            }
            for sensor in &report.failed_sensors {
                text.push_str(&format!("   ✗ {}: entrenamiento fallido\n", sensor));
            }
        }
        Panel::PermissionDenied { title, message } => {
            text.push_str(&format!("🔒 {}\n   {}\n", title, message));
        }
        Panel::Diagnostic(d) => {
            text.push_str(&format!("❌ {}\n", d.title));
            if let Some(detail) = &d.detail {
                text.push_str(&format!("   {}\n", detail));
            }
            text.push_str("   Posibles causas:\n");
            for cause in &d.causes {
                text.push_str(&format!("     - {}\n", cause));
            }
            text.push_str("   Solución:\n");
            for (i, remedy) in d.remedies.iter().enumerate() {
                text.push_str(&format!("     {}. {}\n", i + 1, remedy));
            }
            text.push_str(&format!("   🔄 Reintentar: {}\n", d.retry));
        }
        Panel::Notice { level, message } => {
            let icon = match level {
                NoticeLevel::Info => "ℹ",
                NoticeLevel::Success => "✓",
                NoticeLevel::Warning => "⚠",
                NoticeLevel::Error => "✗",
            };
            text.push_str(&format!("{} {}\n", icon, message));
        }
    }
    text
}

// ============================================
// Memory
// ============================================

/// Records every panel; used by tests and embedders that render elsewhere
#[derive(Debug, Default)]
pub struct MemorySurface {
    shown: Mutex<Vec<(Target, Panel)>>,
}

impl MemorySurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every panel shown so far, in order
    pub fn panels(&self) -> Vec<(Target, Panel)> {
        match self.shown.lock() {
            Ok(shown) => shown.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Latest panel shown in `target`
    pub fn last(&self, target: Target) -> Option<Panel> {
        self.panels()
            .into_iter()
            .rev()
            .find(|(t, _)| *t == target)
            .map(|(_, p)| p)
    }

    pub fn count(&self, target: Target) -> usize {
        self.panels().iter().filter(|(t, _)| *t == target).count()
    }
}

impl Surface for MemorySurface {
    fn show(&self, target: Target, panel: Panel) {
        match self.shown.lock() {
            Ok(mut shown) => shown.push((target, panel)),
            Err(poisoned) => poisoned.into_inner().push((target, panel)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prediction::{MetricsRow, R2Tier};

    #[test]
    fn test_memory_surface_last() {
        let surface = MemorySurface::new();
        surface.show(Target::Notifications, Panel::notice(NoticeLevel::Info, "uno"));
        surface.show(Target::Overview, Panel::Busy { message: "x".into() });
        surface.show(Target::Notifications, Panel::notice(NoticeLevel::Info, "dos"));

        assert_eq!(surface.count(Target::Notifications), 2);
        assert_eq!(
            surface.last(Target::Notifications),
            Some(Panel::notice(NoticeLevel::Info, "dos"))
        );
        assert_eq!(surface.last(Target::LoginError), None);
    }

    #[test]
    fn test_retry_hint() {
        let retry = RetryAction::Predict {
            sensor: SensorType::Aire,
            days: 7,
        };
        assert_eq!(retry.to_string(), "iot-dashboard predict aire --days 7");
        let retry = RetryAction::Train {
            target: TrainTarget::All,
            days: 30,
        };
        assert_eq!(retry.to_string(), "iot-dashboard train all --days 30");
        let retry = RetryAction::ShowLatestPrediction {
            sensor: SensorType::Soterrado,
        };
        assert_eq!(retry.to_string(), "iot-dashboard predict soterrado --latest");
    }

    #[test]
    fn test_render_diagnostic() {
        let d = Diagnostic::prediction_failed(
            SensorType::Sonido,
            30,
            &ApiError::Network("connection refused".into()),
        );
        let text = render_panel(&Panel::Diagnostic(d));

        assert!(text.starts_with("❌ Error generando predicciones"));
        assert!(text.contains("Posibles causas:"));
        assert!(text.contains("pestaña \"SONIDO\""));
        assert!(text.contains("Reintentar: iot-dashboard predict sonido --days 30"));
    }

    #[test]
    fn test_render_training_rows() {
        let report = TrainingReport {
            target: TrainTarget::Sensor(SensorType::Aire),
            days: 30,
            message: None,
            rows: vec![MetricsRow {
                name: "object.co2".into(),
                r2_percent: 91.234,
                tier: R2Tier::Good,
                rmse: 12.5,
                mae: 9.0,
                samples: 1200,
            }],
            failed_sensors: vec![],
        };
        let text = render_panel(&Panel::Training(report));
        assert!(text.contains("object.co2"));
        assert!(text.contains("91.23%"));
        assert!(text.contains("1200"));
    }

    #[test]
    fn test_json_output() {
        #[derive(Clone, Default)]
        struct Sink(std::sync::Arc<Mutex<Vec<u8>>>);
        impl Write for Sink {
            fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
                self.0.lock().unwrap().extend_from_slice(buf);
                Ok(buf.len())
            }
            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }

        let sink = Sink::default();
        let surface = TerminalSurface::with_writer(Box::new(sink.clone()), OutputFormat::Json);
        surface.show(Target::AdminSections, Panel::AdminSections { visible: true });

        let line = String::from_utf8(sink.0.lock().unwrap().clone()).unwrap();
        let value: serde_json::Value = serde_json::from_str(line.trim()).unwrap();
        assert_eq!(value["target"], "admin_sections");
        assert_eq!(value["content"]["panel"], "admin_sections");
        assert_eq!(value["content"]["visible"], true);
    }
}
