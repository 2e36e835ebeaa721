//! # IoT Dashboard
//!
//! Client for an IoT sensor platform: authenticates against the platform's
//! REST API, charts the latest readings of each sensor family, and drives
//! the platform's forecasting and model-training endpoints.
//!
//! ## Modules
//!
//! - [`session`]: Persisted token and user profile
//! - [`api`]: REST client and wire types
//! - [`auth`]: Login, logout, restore and the global 401 rule
//! - [`view`]: Screens, tabs and load tickets
//! - [`dashboard`]: Overview and per-sensor tabs, auto-refresh
//! - [`chart`]: Series shaping, statistics and chart backends
//! - [`prediction`]: Forecasts and training
//! - [`export`]: CSV export of readings
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use iot_dashboard::{App, Config, OutputFormat, Tab, SensorType};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load_default();
//!     let app = App::from_config(&config, OutputFormat::Table)?;
//!
//!     app.auth.login("admin", "secret").await?;
//!     app.dashboard.enter().await;
//!     app.dashboard.activate_tab(Tab::Sensor(SensorType::Aire)).await;
//!
//!     app.predictions.request_prediction(SensorType::Aire, 7).await;
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod app;
pub mod auth;
pub mod chart;
pub mod config;
pub mod dashboard;
pub mod export;
pub mod prediction;
pub mod reading;
pub mod sensors;
pub mod session;
pub mod ui;
pub mod view;

#[cfg(test)]
pub(crate) mod testing;

// Re-export top-level types for convenience
pub use app::App;

pub use api::{ApiClient, ApiError, ApiResult, PredictionResult, TrainingResponse};

pub use auth::{AuthController, AuthError, AuthState, SESSION_EXPIRED};

pub use chart::{
    ChartBackend, ChartHandle, ChartRenderer, ChartSpec, RenderError, SummaryStats, SvgBackend,
    TerminalBackend,
};

pub use config::{Config, ConfigError};

pub use dashboard::{DashboardController, LoadOutcome};

pub use export::ExportError;

pub use prediction::{
    PredictionController, PredictionOutcome, R2Tier, TrainTarget, TrainingOutcome, TrainingReport,
};

pub use reading::SensorReading;

pub use sensors::{FieldConfig, SensorType};

pub use session::{Role, Session, SessionError, SessionStore, User};

pub use ui::{MemorySurface, OutputFormat, Panel, Surface, Target, TerminalSurface};

pub use view::{LoadTicket, Screen, Tab, ViewRouter};
