//! View Router
//!
//! Tracks which screen and tab are showing. Every tab activation bumps a
//! generation counter and hands out a [`LoadTicket`]; a load started under
//! an older ticket is stale and its result must be dropped.

use serde::Serialize;
use tokio::sync::RwLock;

use crate::sensors::SensorType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Screen {
    Login,
    Dashboard,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Tab {
    Overview,
    Sensor(SensorType),
    Predictions,
    Admin,
}

impl std::fmt::Display for Tab {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Tab::Overview => f.write_str("overview"),
            Tab::Sensor(sensor) => write!(f, "{}", sensor),
            Tab::Predictions => f.write_str("predictions"),
            Tab::Admin => f.write_str("admin"),
        }
    }
}

/// Proof of which activation a load belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadTicket {
    pub tab: Tab,
    pub generation: u64,
}

#[derive(Debug)]
struct RouterState {
    screen: Screen,
    tab: Tab,
    generation: u64,
}

#[derive(Debug)]
pub struct ViewRouter {
    state: RwLock<RouterState>,
}

impl Default for ViewRouter {
    fn default() -> Self {
        Self::new()
    }
}

impl ViewRouter {
    /// Starts on the login screen with the overview tab selected
    pub fn new() -> Self {
        Self {
            state: RwLock::new(RouterState {
                screen: Screen::Login,
                tab: Tab::Overview,
                generation: 0,
            }),
        }
    }

    pub async fn show_screen(&self, screen: Screen) {
        let mut state = self.state.write().await;
        if state.screen != screen {
            tracing::debug!(?screen, "Screen changed");
            state.screen = screen;
        }
    }

    pub async fn screen(&self) -> Screen {
        self.state.read().await.screen
    }

    /// Make `tab` the active tab. Always starts a new generation, even when
    /// the tab was already active.
    pub async fn activate(&self, tab: Tab) -> LoadTicket {
        let mut state = self.state.write().await;
        state.tab = tab;
        state.generation += 1;
        tracing::debug!(%tab, generation = state.generation, "Tab activated");
        LoadTicket {
            tab,
            generation: state.generation,
        }
    }

    /// Ticket of the current activation, without starting a new one
    pub async fn ticket(&self) -> LoadTicket {
        let state = self.state.read().await;
        LoadTicket {
            tab: state.tab,
            generation: state.generation,
        }
    }

    /// Whether a load started under `ticket` may still apply its result
    pub async fn is_current(&self, ticket: &LoadTicket) -> bool {
        let state = self.state.read().await;
        state.screen == Screen::Dashboard
            && state.tab == ticket.tab
            && state.generation == ticket.generation
    }

    pub async fn active_tab(&self) -> Tab {
        self.state.read().await.tab
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_starts_on_login() {
        let router = ViewRouter::new();
        assert_eq!(router.screen().await, Screen::Login);
        assert_eq!(router.active_tab().await, Tab::Overview);
    }

    #[tokio::test]
    async fn test_newer_activation_invalidates_ticket() {
        let router = ViewRouter::new();
        router.show_screen(Screen::Dashboard).await;

        let first = router.activate(Tab::Sensor(SensorType::Aire)).await;
        assert!(router.is_current(&first).await);

        let second = router.activate(Tab::Overview).await;
        assert!(!router.is_current(&first).await);
        assert!(router.is_current(&second).await);
        assert_eq!(router.ticket().await, second);
    }

    #[tokio::test]
    async fn test_reactivating_same_tab_invalidates() {
        let router = ViewRouter::new();
        router.show_screen(Screen::Dashboard).await;

        let first = router.activate(Tab::Overview).await;
        let second = router.activate(Tab::Overview).await;
        assert!(!router.is_current(&first).await);
        assert!(router.is_current(&second).await);
    }

    #[tokio::test]
    async fn test_login_screen_makes_tickets_stale() {
        let router = ViewRouter::new();
        router.show_screen(Screen::Dashboard).await;
        let ticket = router.activate(Tab::Overview).await;

        router.show_screen(Screen::Login).await;
        assert!(!router.is_current(&ticket).await);
    }
}
