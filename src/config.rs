//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and environment variable overrides.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub session: SessionConfig,

    #[serde(default)]
    pub dashboard: DashboardConfig,

    #[serde(default)]
    pub charts: ChartsConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Remote sensor platform API
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_base_url() -> String {
    "http://localhost:5000/api".to_string()
}

fn default_request_timeout() -> u64 {
    60
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl ApiConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Where the session (token + user profile) is persisted
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_session_path")]
    pub path: String,
}

fn default_session_path() -> String {
    dirs::data_local_dir()
        .map(|p| {
            p.join("iot-dashboard")
                .join("session.json")
                .to_string_lossy()
                .to_string()
        })
        .unwrap_or_else(|| "./iot_session.json".to_string())
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            path: default_session_path(),
        }
    }
}

/// Dashboard behaviour
#[derive(Debug, Clone, Deserialize)]
pub struct DashboardConfig {
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval_secs: u64,

    #[serde(default = "default_overview_limit")]
    pub overview_limit: u32,

    #[serde(default = "default_sensor_limit")]
    pub sensor_limit: u32,
}

fn default_refresh_interval() -> u64 {
    30
}

fn default_overview_limit() -> u32 {
    50
}

fn default_sensor_limit() -> u32 {
    100
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            refresh_interval_secs: default_refresh_interval(),
            overview_limit: default_overview_limit(),
            sensor_limit: default_sensor_limit(),
        }
    }
}

impl DashboardConfig {
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs.max(1))
    }
}

/// Chart output
#[derive(Debug, Clone, Deserialize)]
pub struct ChartsConfig {
    /// When set, charts are written as SVG files into this directory
    /// instead of being drawn in the terminal.
    pub svg_dir: Option<String>,

    #[serde(default = "default_chart_width")]
    pub width: usize,
}

fn default_chart_width() -> usize {
    60
}

impl Default for ChartsConfig {
    fn default() -> Self {
        Self {
            svg_dir: None,
            width: default_chart_width(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "warn".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Self::parse(&content).map_err(|error| ConfigError::Parse {
            path: path.to_path_buf(),
            error,
        })
    }

    fn parse(content: &str) -> Result<Self, String> {
        toml::from_str(content).map_err(|e| e.to_string())
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from default locations or environment
    pub fn load_default() -> Self {
        let config_paths = [
            dirs::config_dir().map(|p| p.join("iot-dashboard").join("config.toml")),
            Some(PathBuf::from("./config.toml")),
        ];

        for path in config_paths.iter().flatten() {
            if path.exists() {
                match Self::load_with_env(path) {
                    Ok(config) => {
                        tracing::debug!("Loaded config from {:?}", path);
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load config from {:?}: {}", path, e);
                    }
                }
            }
        }

        Self::from_env()
    }

    /// Apply environment variable overrides to an existing config
    fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("IOT_DASHBOARD_API_URL") {
            self.api.base_url = url;
        }
        if let Ok(path) = std::env::var("IOT_DASHBOARD_SESSION_FILE") {
            self.session.path = path;
        }
        if let Ok(secs) = std::env::var("IOT_DASHBOARD_REFRESH_SECS") {
            if let Ok(s) = secs.parse() {
                self.dashboard.refresh_interval_secs = s;
            }
        }
        if let Ok(level) = std::env::var("IOT_DASHBOARD_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(format) = std::env::var("IOT_DASHBOARD_LOG_FORMAT") {
            self.logging.format = format;
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# IoT Dashboard Configuration
#
# Environment variables override these settings:
# - IOT_DASHBOARD_API_URL
# - IOT_DASHBOARD_SESSION_FILE
# - IOT_DASHBOARD_REFRESH_SECS
# - IOT_DASHBOARD_LOG_LEVEL
# - IOT_DASHBOARD_LOG_FORMAT

[api]
# Base URL of the sensor platform API
base_url = "http://localhost:5000/api"

# Request timeout in seconds
request_timeout_secs = 60

[session]
# File holding the auth token and user profile
path = "~/.local/share/iot-dashboard/session.json"

[dashboard]
# Overview auto-refresh interval (seconds)
refresh_interval_secs = 30

# Readings shown in the overview charts
overview_limit = 50

# Readings loaded per sensor tab
sensor_limit = 100

[charts]
# Write charts as SVG files instead of drawing them in the terminal
# svg_dir = "./charts"

# Terminal chart width (columns)
width = 60

[logging]
# Log level: trace, debug, info, warn, error
level = "warn"

# Log format: pretty or json
format = "pretty"
"#
    .to_string()
}
