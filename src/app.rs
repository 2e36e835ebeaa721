//! Application wiring
//!
//! Builds the controllers once and shares them through `Arc`s.

use std::sync::Arc;

use crate::api::{ApiClient, ApiResult};
use crate::auth::AuthController;
use crate::chart::{ChartBackend, ChartRenderer, SvgBackend, TerminalBackend};
use crate::config::Config;
use crate::dashboard::DashboardController;
use crate::prediction::PredictionController;
use crate::session::SessionStore;
use crate::ui::{OutputFormat, Surface, TerminalSurface};
use crate::view::ViewRouter;

/// Every component of a dashboard session
#[derive(Clone)]
pub struct App {
    pub session: SessionStore,
    pub client: ApiClient,
    pub router: Arc<ViewRouter>,
    pub charts: Arc<ChartRenderer>,
    pub surface: Arc<dyn Surface>,
    pub auth: Arc<AuthController>,
    pub dashboard: Arc<DashboardController>,
    pub predictions: Arc<PredictionController>,
}

impl App {
    pub fn new(
        config: &Config,
        session: SessionStore,
        surface: Arc<dyn Surface>,
        backend: Arc<dyn ChartBackend>,
    ) -> ApiResult<Self> {
        let client = ApiClient::new(&config.api, session.clone())?;
        let router = Arc::new(ViewRouter::new());
        let charts = Arc::new(ChartRenderer::new(backend));

        let auth = Arc::new(
            AuthController::new(client.clone(), router.clone(), surface.clone())
                .with_charts(charts.clone()),
        );
        let dashboard = Arc::new(DashboardController::new(
            client.clone(),
            auth.clone(),
            router.clone(),
            charts.clone(),
            surface.clone(),
            config.dashboard.clone(),
        ));
        let predictions = Arc::new(PredictionController::new(
            client.clone(),
            auth.clone(),
            charts.clone(),
            surface.clone(),
        ));

        Ok(Self {
            session,
            client,
            router,
            charts,
            surface,
            auth,
            dashboard,
            predictions,
        })
    }

    /// File-backed session, stdout surface, and SVG charts when a chart
    /// directory is configured (terminal sparklines otherwise)
    pub fn from_config(config: &Config, format: OutputFormat) -> ApiResult<Self> {
        let backend: Arc<dyn ChartBackend> = match &config.charts.svg_dir {
            Some(dir) => Arc::new(SvgBackend::new(dir)),
            None => Arc::new(TerminalBackend::stdout(config.charts.width)),
        };

        Self::new(
            config,
            SessionStore::file(&config.session.path),
            Arc::new(TerminalSurface::stdout(format)),
            backend,
        )
    }
}

impl std::fmt::Debug for App {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App")
            .field("client", &self.client)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::renderer::tests::CountingBackend;
    use crate::session::{Role, User};
    use crate::testing::{login_json, readings_json, MockApi};
    use crate::ui::{MemorySurface, Panel, Target};
    use crate::view::Screen;
    use serde_json::json;

    #[tokio::test]
    async fn test_login_dashboard_logout_flow() {
        let mock = MockApi::start().await;
        mock.on("POST", "/auth/login", 200, login_json("tok-9", "ejecutivo_director"));
        mock.on("GET", "/sensors/summary", 200, json!({"aire": {"total_records": 3}}));
        let aire = readings_json("co2", &[1.0, 2.0, 3.0]);
        mock.on("GET", "/sensors/aire/latest", 200, json!({ "data": aire }));
        mock.on("GET", "/sensors/sonido/latest", 200, json!({"data": []}));

        let mut config = Config::default();
        config.api = mock.config();
        let surface = Arc::new(MemorySurface::new());
        let app = App::new(
            &config,
            SessionStore::in_memory(),
            surface.clone(),
            Arc::new(CountingBackend::default()),
        )
        .unwrap();

        let user = app.auth.login("director", "clave").await.unwrap();
        assert_eq!(user.role, Role::EjecutivoDirector);
        app.dashboard.enter().await;

        assert_eq!(app.router.screen().await, Screen::Dashboard);
        assert_eq!(app.charts.live_count().await, 2);
        for request in mock.requests().iter().skip(1) {
            assert_eq!(request.authorization.as_deref(), Some("Bearer tok-9"));
        }
        match surface.last(Target::UserBadge) {
            Some(Panel::UserBadge { role_label, .. }) => assert_eq!(role_label, "Director"),
            other => panic!("unexpected panel {:?}", other),
        }

        app.auth.logout().await;
        assert_eq!(app.charts.live_count().await, 0);
        assert_eq!(app.router.screen().await, Screen::Login);
        assert_eq!(app.session.user(), None::<User>);
    }
}
