//! Dashboard Controller
//!
//! Loads tab data on activation and keeps the overview fresh. Each load is
//! tied to the [`LoadTicket`] of the activation that started it; when the
//! user has moved on by the time the response arrives, the result is
//! dropped instead of being drawn over the newer view.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::api::{ApiClient, ApiError};
use crate::auth::AuthController;
use crate::chart::ChartRenderer;
use crate::config::DashboardConfig;
use crate::reading::SensorReading;
use crate::sensors::SensorType;
use crate::ui::{Diagnostic, NoticeLevel, Panel, RetryAction, Surface, Target};
use crate::view::{LoadTicket, Screen, Tab, ViewRouter};

/// Sensor and field charted on the overview tab
const OVERVIEW_CHARTS: &[(SensorType, &str)] = &[
    (SensorType::Aire, "object.co2"),
    (SensorType::Sonido, "object.LAeq"),
];

/// Mount id of an overview chart
pub fn overview_mount(sensor: SensorType) -> String {
    format!("overview-{}-chart", sensor)
}

#[derive(Debug, Clone, PartialEq)]
pub enum LoadOutcome {
    Rendered { charts: usize },
    /// The tab has nothing to fetch
    Idle,
    /// A newer activation superseded this load
    Stale,
    /// A 401 ended the session
    Unauthorized,
    Failed(ApiError),
}

pub struct DashboardController {
    client: ApiClient,
    auth: Arc<AuthController>,
    router: Arc<ViewRouter>,
    charts: Arc<ChartRenderer>,
    surface: Arc<dyn Surface>,
    config: DashboardConfig,
    limits: RwLock<HashMap<SensorType, u32>>,
}

impl DashboardController {
    pub fn new(
        client: ApiClient,
        auth: Arc<AuthController>,
        router: Arc<ViewRouter>,
        charts: Arc<ChartRenderer>,
        surface: Arc<dyn Surface>,
        config: DashboardConfig,
    ) -> Self {
        Self {
            client,
            auth,
            router,
            charts,
            surface,
            config,
            limits: RwLock::new(HashMap::new()),
        }
    }

    pub fn router(&self) -> &Arc<ViewRouter> {
        &self.router
    }

    /// Show the dashboard for the cached user and load the overview
    pub async fn enter(&self) -> LoadOutcome {
        let Some(user) = self.client.session().user() else {
            warn!("No cached user, returning to login");
            self.auth.logout().await;
            return LoadOutcome::Unauthorized;
        };

        self.surface.show(
            Target::UserBadge,
            Panel::UserBadge {
                full_name: user.full_name.clone(),
                role_label: user.role.label().to_string(),
            },
        );
        self.surface.show(
            Target::AdminSections,
            Panel::AdminSections {
                visible: user.role.is_admin(),
            },
        );

        self.router.show_screen(Screen::Dashboard).await;
        info!(user = %user.full_name, role = %user.role.as_str(), "Dashboard opened");

        self.activate_tab(Tab::Overview).await
    }

    /// Switch tabs and load whatever the new tab shows
    pub async fn activate_tab(&self, tab: Tab) -> LoadOutcome {
        let ticket = self.router.activate(tab).await;
        match tab {
            Tab::Overview => self.load_overview(ticket).await,
            Tab::Sensor(sensor) => self.load_sensor(sensor, ticket).await,
            Tab::Predictions | Tab::Admin => LoadOutcome::Idle,
        }
    }

    /// Record counters plus the CO2 and LAeq overview charts
    pub async fn load_overview(&self, ticket: LoadTicket) -> LoadOutcome {
        let summary = match self.client.summary().await {
            Ok(summary) => summary,
            Err(e) => {
                return self
                    .load_failed(
                        &ticket,
                        "resumen",
                        e,
                        Target::Overview,
                        RetryAction::ReloadOverview,
                    )
                    .await
            }
        };
        if !self.router.is_current(&ticket).await {
            debug!(generation = ticket.generation, "Discarding stale overview");
            return LoadOutcome::Stale;
        }

        let mut per_sensor: BTreeMap<String, u64> = SensorType::all()
            .iter()
            .map(|s| (s.to_string(), 0))
            .collect();
        for (sensor, entry) in &summary.0 {
            per_sensor.insert(sensor.clone(), entry.total_records);
        }
        self.surface.show(
            Target::Overview,
            Panel::Counters {
                per_sensor,
                total: summary.total(),
            },
        );

        let mut rendered = 0;
        for &(sensor, path) in OVERVIEW_CHARTS {
            let Some(field) = sensor.field(path) else {
                continue;
            };

            let readings = match self.fetch_readings(sensor, self.config.overview_limit).await {
                Ok(readings) => readings,
                Err(e) => {
                    return self
                        .load_failed(
                            &ticket,
                            sensor.as_str(),
                            e,
                            Target::Overview,
                            RetryAction::ReloadOverview,
                        )
                        .await
                }
            };
            if !self.router.is_current(&ticket).await {
                debug!(generation = ticket.generation, "Discarding stale overview");
                return LoadOutcome::Stale;
            }

            match self
                .charts
                .render_series(&overview_mount(sensor), &readings, field)
                .await
            {
                Ok(_) => rendered += 1,
                Err(e) => self.chart_failed(field.label, &e),
            }
        }

        LoadOutcome::Rendered { charts: rendered }
    }

    /// One chart per tracked field of `sensor`
    pub async fn load_sensor(&self, sensor: SensorType, ticket: LoadTicket) -> LoadOutcome {
        let limit = self.sensor_limit(sensor).await;

        let readings = match self.fetch_readings(sensor, limit).await {
            Ok(readings) => readings,
            Err(e) => {
                return self
                    .load_failed(
                        &ticket,
                        sensor.as_str(),
                        e,
                        Target::Sensor(sensor),
                        RetryAction::ReloadSensor { sensor },
                    )
                    .await
            }
        };
        if !self.router.is_current(&ticket).await {
            debug!(%sensor, generation = ticket.generation, "Discarding stale sensor data");
            return LoadOutcome::Stale;
        }

        self.surface.show(
            Target::Sensor(sensor),
            Panel::notice(
                NoticeLevel::Info,
                format!("{} lecturas de {}", readings.len(), sensor),
            ),
        );

        let mut rendered = 0;
        for field in sensor.fields() {
            match self
                .charts
                .render_series(&sensor.chart_mount(field), &readings, field)
                .await
            {
                Ok(_) => rendered += 1,
                Err(e) => self.chart_failed(field.label, &e),
            }
        }

        debug!(%sensor, readings = readings.len(), charts = rendered, "Sensor tab loaded");
        LoadOutcome::Rendered { charts: rendered }
    }

    /// Number of readings the sensor tab fetches
    pub async fn sensor_limit(&self, sensor: SensorType) -> u32 {
        self.limits
            .read()
            .await
            .get(&sensor)
            .copied()
            .unwrap_or(self.config.sensor_limit)
    }

    /// Change a sensor's reading limit, reloading when its tab is showing
    pub async fn set_sensor_limit(&self, sensor: SensorType, limit: u32) -> Option<LoadOutcome> {
        self.limits.write().await.insert(sensor, limit.max(1));

        let tab = Tab::Sensor(sensor);
        if self.router.screen().await == Screen::Dashboard
            && self.router.active_tab().await == tab
        {
            Some(self.activate_tab(tab).await)
        } else {
            None
        }
    }

    /// Reload the overview if it is what the user is looking at
    pub async fn refresh(&self) -> Option<LoadOutcome> {
        if self.router.screen().await != Screen::Dashboard
            || self.router.active_tab().await != Tab::Overview
        {
            return None;
        }

        debug!("Refreshing overview");
        let ticket = self.router.ticket().await;
        Some(self.load_overview(ticket).await)
    }

    /// Spawn the periodic overview refresh; abort the handle to stop it
    pub fn start_auto_refresh(self: Arc<Self>) -> JoinHandle<()> {
        let period = self.config.refresh_interval();
        info!(interval_secs = period.as_secs(), "Auto-refresh started");

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            // the first tick completes immediately
            interval.tick().await;
            loop {
                interval.tick().await;
                self.refresh().await;
            }
        })
    }

    async fn fetch_readings(
        &self,
        sensor: SensorType,
        limit: u32,
    ) -> Result<Vec<SensorReading>, ApiError> {
        let mut readings = self.client.latest(sensor, limit).await?.data;
        // newest first on the wire, charts want oldest first
        readings.reverse();
        Ok(readings)
    }

    async fn load_failed(
        &self,
        ticket: &LoadTicket,
        what: &str,
        e: ApiError,
        target: Target,
        retry: RetryAction,
    ) -> LoadOutcome {
        if self.auth.intercept(&e).await {
            return LoadOutcome::Unauthorized;
        }
        if !self.router.is_current(ticket).await {
            debug!(what, error = %e, "Ignoring failure of stale load");
            return LoadOutcome::Stale;
        }

        error!(what, error = %e, "Failed to load dashboard data");
        self.surface
            .show(target, Panel::Diagnostic(Diagnostic::load_failed(what, &e, retry)));
        LoadOutcome::Failed(e)
    }

    fn chart_failed(&self, label: &str, e: &crate::chart::RenderError) {
        error!(chart = label, error = %e, "Failed to render chart");
        self.surface.show(
            Target::Notifications,
            Panel::notice(NoticeLevel::Error, format!("No se pudo dibujar {}: {}", label, e)),
        );
    }
}

impl std::fmt::Debug for DashboardController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DashboardController")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
