//! Auth Controller
//!
//! Login, logout, startup restore and the global unauthorized rule: any 401
//! from an authenticated call ends the session and routes back to the login
//! screen with a fixed message.

use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::api::{ApiClient, ApiError};
use crate::chart::ChartRenderer;
use crate::session::{Session, SessionError, SessionStore, User};
use crate::ui::{Panel, Surface, Target};
use crate::view::{Screen, ViewRouter};

/// Shown in the login error panel when a 401 ends the session
pub const SESSION_EXPIRED: &str = "Sesión expirada. Por favor inicie sesión nuevamente.";

/// Shown when the server rejects a login without saying why
pub const LOGIN_FAILED: &str = "Error en login";

const MISSING_CREDENTIALS: &str = "Usuario y contraseña son requeridos";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    LoggedOut,
    LoggingIn,
    LoggedIn,
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Usuario y contraseña son requeridos")]
    MissingCredentials,

    /// The server answered the login with an error
    #[error("{0}")]
    Rejected(String),

    #[error(transparent)]
    Api(ApiError),

    #[error("Session store error: {0}")]
    Session(#[from] SessionError),
}

pub struct AuthController {
    client: ApiClient,
    router: Arc<ViewRouter>,
    surface: Arc<dyn Surface>,
    charts: Option<Arc<ChartRenderer>>,
    state: RwLock<AuthState>,
}

impl AuthController {
    pub fn new(client: ApiClient, router: Arc<ViewRouter>, surface: Arc<dyn Surface>) -> Self {
        let state = if client.session().is_authenticated() {
            AuthState::LoggedIn
        } else {
            AuthState::LoggedOut
        };

        Self {
            client,
            router,
            surface,
            charts: None,
            state: RwLock::new(state),
        }
    }

    /// Release every live chart on logout
    pub fn with_charts(mut self, charts: Arc<ChartRenderer>) -> Self {
        self.charts = Some(charts);
        self
    }

    pub fn session(&self) -> &SessionStore {
        self.client.session()
    }

    pub async fn state(&self) -> AuthState {
        *self.state.read().await
    }

    async fn set_state(&self, state: AuthState) {
        *self.state.write().await = state;
    }

    /// Exchange credentials for a session.
    ///
    /// The store is only written on success; on failure the server's message
    /// (or a generic one) goes to the login error panel.
    pub async fn login(&self, username: &str, password: &str) -> Result<User, AuthError> {
        if username.trim().is_empty() || password.is_empty() {
            self.show_login_error(MISSING_CREDENTIALS);
            return Err(AuthError::MissingCredentials);
        }

        self.set_state(AuthState::LoggingIn).await;

        let response = match self.client.login(username, password).await {
            Ok(response) => response,
            Err(e) => {
                self.set_state(AuthState::LoggedOut).await;
                warn!(username, error = %e, "Login failed");

                let err = match e {
                    ApiError::Network(_) | ApiError::Decode(_) => AuthError::Api(e),
                    _ => AuthError::Rejected(
                        e.server_message().unwrap_or(LOGIN_FAILED).to_string(),
                    ),
                };
                self.show_login_error(&err.to_string());
                return Err(err);
            }
        };

        let session = Session {
            token: response.token,
            user: response.user,
        };
        if let Err(e) = self.session().store(&session) {
            self.set_state(AuthState::LoggedOut).await;
            return Err(e.into());
        }

        self.set_state(AuthState::LoggedIn).await;
        info!(
            user = %session.user.full_name,
            role = %session.user.role.as_str(),
            "Logged in"
        );
        Ok(session.user)
    }

    /// Whether the server still accepts the stored token
    pub async fn verify(&self) -> bool {
        if self.session().token().is_none() {
            return false;
        }

        match self.client.verify().await {
            Ok(()) => true,
            Err(e) => {
                debug!(error = %e, "Token verification failed");
                false
            }
        }
    }

    /// Startup check: resume a valid session, drop an invalid one
    pub async fn restore(&self) -> AuthState {
        if !self.session().is_authenticated() {
            self.set_state(AuthState::LoggedOut).await;
            self.router.show_screen(Screen::Login).await;
            return AuthState::LoggedOut;
        }

        if self.verify().await {
            self.set_state(AuthState::LoggedIn).await;
            self.router.show_screen(Screen::Dashboard).await;
            info!("Session restored");
            AuthState::LoggedIn
        } else {
            info!("Stored session is no longer valid");
            self.logout().await;
            AuthState::LoggedOut
        }
    }

    /// Clear the session and return to the login screen
    pub async fn logout(&self) {
        if let Err(e) = self.session().clear() {
            warn!(error = %e, "Failed to clear session store");
        }
        self.set_state(AuthState::LoggedOut).await;

        if let Some(charts) = &self.charts {
            charts.release_all().await;
        }
        self.router.show_screen(Screen::Login).await;
        info!("Logged out");
    }

    /// Apply the unauthorized rule to a failed call.
    ///
    /// Returns `true` when the error was a 401 and the session was ended;
    /// the caller must stop processing that result.
    pub async fn intercept(&self, error: &ApiError) -> bool {
        if !error.is_unauthorized() {
            return false;
        }

        warn!(error = %error, "Unauthorized response, ending session");
        self.logout().await;
        self.show_login_error(SESSION_EXPIRED);
        true
    }

    fn show_login_error(&self, message: &str) {
        self.surface.show(
            Target::LoginError,
            Panel::LoginError {
                message: message.to_string(),
            },
        );
    }
}

impl std::fmt::Debug for AuthController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthController")
            .field("client", &self.client)
            .finish_non_exhaustive()
    }
}
