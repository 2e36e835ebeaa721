//! IoT Dashboard CLI
//!
//! Command-line front end for the sensor platform:
//! - Log in and out
//! - Chart the overview and per-sensor readings
//! - Generate forecasts and train models
//! - Export readings to CSV

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use iot_dashboard::api::ApiError;
use iot_dashboard::config::{generate_default_config, LoggingConfig};
use iot_dashboard::{
    App, AuthState, Config, LoadOutcome, OutputFormat, PredictionOutcome, SensorType, Tab,
    TrainTarget, TrainingOutcome, SESSION_EXPIRED,
};

#[derive(Parser)]
#[command(name = "iot-dashboard")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Dashboard client for the IoT sensor platform")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (default: user config dir, then ./config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// API base URL
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    /// Session file
    #[arg(long, global = true)]
    pub session_file: Option<PathBuf>,

    /// Write charts as SVG files into this directory
    #[arg(long, global = true)]
    pub svg_dir: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table", global = true)]
    pub format: OutputFormat,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Log in and store the session
    Login {
        username: String,
        /// Password (prompted when omitted)
        #[arg(short, long)]
        password: Option<String>,
    },

    /// End the stored session
    Logout,

    /// Show the stored session and whether the API accepts it
    Status,

    /// Record counters and overview charts
    Overview,

    /// Chart the latest readings of one sensor
    Sensor {
        /// aire, sonido or soterrado
        sensor: SensorType,
        /// Number of readings (default from config)
        #[arg(short, long)]
        limit: Option<u32>,
    },

    /// Keep the overview on screen, refreshing periodically
    Watch,

    /// Generate a forecast and chart it against recent history
    Predict {
        sensor: SensorType,
        /// Forecast horizon in days (7 gives hourly points)
        #[arg(short, long, default_value = "30")]
        days: u32,
        /// Chart the last stored forecast instead of generating one
        #[arg(long)]
        latest: bool,
    },

    /// Train forecasting models (administrators only)
    Train {
        /// Sensor name or "all"
        target: TrainTarget,
        /// Days of history to train on
        #[arg(short, long, default_value = "30")]
        days: u32,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Server-side statistics for a sensor
    Stats {
        sensor: SensorType,
        /// Window in hours
        #[arg(long, default_value = "24")]
        hours: u32,
    },

    /// List the sensor types the platform knows
    Types,

    /// Export the latest readings of a sensor as CSV
    Export {
        sensor: SensorType,
        #[arg(short, long, default_value = "100")]
        limit: u32,
        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Generate default config file
    Config {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::load_with_env(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => Config::load_default(),
    };
    if let Some(url) = &cli.api_url {
        config.api.base_url = url.clone();
    }
    if let Some(path) = &cli.session_file {
        config.session.path = path.to_string_lossy().to_string();
    }
    if let Some(dir) = &cli.svg_dir {
        config.charts.svg_dir = Some(dir.to_string_lossy().to_string());
    }

    init_logging(&config.logging);
    tracing::debug!(
        api = %config.api.base_url,
        session = %config.session.path,
        "Configuration loaded"
    );

    if let Commands::Config { output } = &cli.command {
        let content = generate_default_config();
        match output {
            Some(path) => {
                std::fs::write(path, content)?;
                println!("Config written to {}", path.display());
            }
            None => print!("{}", content),
        }
        return Ok(());
    }

    let app = App::from_config(&config, cli.format)?;

    match cli.command {
        Commands::Login { username, password } => {
            let password = match password {
                Some(p) => p,
                None => prompt("Contraseña: ")?,
            };
            let user = app.auth.login(&username, &password).await?;
            println!(
                "Sesión iniciada como {} ({})",
                user.full_name,
                user.role.label()
            );
        }

        Commands::Logout => {
            app.auth.logout().await;
            println!("Sesión cerrada");
        }

        Commands::Status => {
            let user = app.session.user();
            let valid = app.auth.verify().await;
            let profile = if valid {
                app.client.profile().await.ok()
            } else {
                None
            };
            match cli.format {
                OutputFormat::Json => {
                    let status = serde_json::json!({
                        "api_url": config.api.base_url,
                        "session_file": config.session.path,
                        "authenticated": app.session.is_authenticated(),
                        "token_valid": valid,
                        "user": user,
                        "profile": profile,
                    });
                    println!("{}", serde_json::to_string_pretty(&status)?);
                }
                OutputFormat::Table => {
                    println!("IoT Dashboard v{}", env!("CARGO_PKG_VERSION"));
                    println!();
                    println!("API:     {}", config.api.base_url);
                    println!("Session: {}", config.session.path);
                    match user {
                        Some(user) => {
                            println!("User:    {} ({})", user.full_name, user.role.label())
                        }
                        None => println!("User:    -"),
                    }
                    let account = profile.as_ref().map(|p| p.get("user").unwrap_or(p));
                    let email = account
                        .and_then(|u| u.get("email"))
                        .and_then(|v| v.as_str());
                    if let Some(email) = email {
                        println!("Email:   {}", email);
                    }
                    println!(
                        "Token:   {}",
                        match (app.session.is_authenticated(), valid) {
                            (false, _) => "none",
                            (true, true) => "valid",
                            (true, false) => "rejected",
                        }
                    );
                }
            }
        }

        Commands::Overview => {
            require_session(&app).await?;
            check_load(app.dashboard.enter().await)?;
        }

        Commands::Sensor { sensor, limit } => {
            require_session(&app).await?;
            if let Some(limit) = limit {
                app.dashboard.set_sensor_limit(sensor, limit).await;
            }
            check_load(app.dashboard.activate_tab(Tab::Sensor(sensor)).await)?;
        }

        Commands::Watch => {
            require_session(&app).await?;
            check_load(app.dashboard.enter().await)?;

            let refresher = Arc::clone(&app.dashboard).start_auto_refresh();
            tokio::signal::ctrl_c().await?;
            refresher.abort();
            tracing::info!("Watch stopped");
        }

        Commands::Predict {
            sensor,
            days,
            latest,
        } => {
            require_session(&app).await?;
            let outcome = if latest {
                app.predictions.show_latest_prediction(sensor).await
            } else {
                app.predictions.request_prediction(sensor, days).await
            };
            match outcome {
                PredictionOutcome::Rendered { .. } => {}
                PredictionOutcome::Duplicate => {
                    bail!("A prediction for {} is already running", sensor)
                }
                PredictionOutcome::Unauthorized => bail!(SESSION_EXPIRED),
                PredictionOutcome::Failed(e) => return Err(e.into()),
            }
        }

        Commands::Train { target, days, yes } => {
            require_session(&app).await?;
            let outcome = app
                .predictions
                .request_training(target, days, |question| yes || confirm(question))
                .await;
            match outcome {
                TrainingOutcome::Trained(_) => {}
                TrainingOutcome::Cancelled => println!("Entrenamiento cancelado"),
                TrainingOutcome::PermissionDenied => bail!("Permisos insuficientes"),
                TrainingOutcome::Duplicate => bail!("Training for {} is already running", target),
                TrainingOutcome::Unauthorized => bail!(SESSION_EXPIRED),
                TrainingOutcome::Failed(e) => return Err(e.into()),
            }
        }

        Commands::Stats { sensor, hours } => {
            require_session(&app).await?;
            let response = intercepted(&app, app.client.statistics(sensor, hours).await).await?;
            match cli.format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&response)?),
                OutputFormat::Table => {
                    println!(
                        "Estadísticas de {} (últimas {} h)",
                        response.sensor_type, response.hours
                    );
                    println!("{}", "-".repeat(40));
                    match response.statistics.as_object() {
                        Some(map) => {
                            for (key, value) in map {
                                println!("{:<24} {}", key, value);
                            }
                        }
                        None => println!("{}", response.statistics),
                    }
                }
            }
        }

        Commands::Types => {
            require_session(&app).await?;
            let response = intercepted(&app, app.client.sensor_types().await).await?;
            match cli.format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&response)?),
                OutputFormat::Table => {
                    println!("{:<12} {}", "Tipo", "Descripción");
                    println!("{}", "-".repeat(50));
                    for name in &response.sensor_types {
                        let description = response
                            .descriptions
                            .get(name)
                            .map(String::as_str)
                            .unwrap_or("-");
                        println!("{:<12} {}", name, description);
                    }
                }
            }
        }

        Commands::Export {
            sensor,
            limit,
            output,
        } => {
            require_session(&app).await?;
            let mut readings = intercepted(&app, app.client.latest(sensor, limit).await)
                .await?
                .data;
            readings.reverse();

            match output {
                Some(path) => {
                    let rows = iot_dashboard::export::export_to_path(&readings, &path)?;
                    eprintln!("Exported {} readings to {}", rows, path.display());
                }
                None => {
                    iot_dashboard::export::write_csv(&readings, std::io::stdout().lock())?;
                }
            }
        }

        Commands::Config { .. } => unreachable!("handled before the app is built"),
    }

    Ok(())
}

fn init_logging(config: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| {
            tracing_subscriber::EnvFilter::new(format!("iot_dashboard={}", config.level))
        });

    let registry = tracing_subscriber::registry().with(filter);
    if config.format == "json" {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

/// Resume the stored session or fail with a hint
async fn require_session(app: &App) -> anyhow::Result<()> {
    if app.auth.restore().await != AuthState::LoggedIn {
        bail!("No active session. Run `iot-dashboard login <username>` first");
    }
    Ok(())
}

/// Apply the unauthorized rule to a direct client call
async fn intercepted<T>(app: &App, result: Result<T, ApiError>) -> anyhow::Result<T> {
    match result {
        Ok(value) => Ok(value),
        Err(e) if app.auth.intercept(&e).await => bail!(SESSION_EXPIRED),
        Err(e) => Err(e.into()),
    }
}

fn check_load(outcome: LoadOutcome) -> anyhow::Result<()> {
    match outcome {
        LoadOutcome::Rendered { .. } | LoadOutcome::Idle | LoadOutcome::Stale => Ok(()),
        LoadOutcome::Unauthorized => bail!(SESSION_EXPIRED),
        LoadOutcome::Failed(e) => Err(e.into()),
    }
}

fn prompt(label: &str) -> anyhow::Result<String> {
    eprint!("{}", label);
    std::io::stderr().flush()?;
    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

fn confirm(question: &str) -> bool {
    eprintln!("{}", question);
    match prompt("[s/N] ") {
        Ok(answer) => matches!(
            answer.trim().to_lowercase().as_str(),
            "s" | "si" | "sí" | "y" | "yes"
        ),
        Err(_) => false,
    }
}
