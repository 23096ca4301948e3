//! Agents menu: the list of agents a user can open a chat with.

use proto::{Agent, GatewayError};
use tracing::{debug, warn};

use crate::controller::RequestToken;

/// What the menu currently shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MenuScreen {
    Loading,
    Error(String),
    Ready(Vec<Agent>),
}

/// Request to fetch the agent catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListAgents {
    pub token: RequestToken,
}

/// Agents menu state machine.
///
/// Only the most recent `start` is honored; completions of earlier requests
/// are dropped.
#[derive(Debug)]
pub struct AgentsMenu {
    screen: MenuScreen,
    pending: Option<RequestToken>,
    issued: u64,
}

impl Default for AgentsMenu {
    fn default() -> Self {
        Self::new()
    }
}

impl AgentsMenu {
    pub fn new() -> Self {
        Self {
            screen: MenuScreen::Loading,
            pending: None,
            issued: 0,
        }
    }

    pub fn screen(&self) -> &MenuScreen {
        &self.screen
    }

    /// Starts (or retries) loading the catalog.
    pub fn start(&mut self) -> ListAgents {
        self.issued += 1;
        let token = RequestToken::from_raw(self.issued);
        self.pending = Some(token);
        self.screen = MenuScreen::Loading;
        debug!(%token, "Loading agents");
        ListAgents { token }
    }

    pub fn on_agents(&mut self, token: RequestToken, result: Result<Vec<Agent>, GatewayError>) {
        if self.pending != Some(token) {
            debug!(%token, "Ignoring stale agent listing");
            return;
        }
        self.pending = None;
        self.screen = match result {
            Ok(agents) => {
                debug!(count = %agents.len(), "Agents loaded");
                MenuScreen::Ready(agents)
            }
            Err(e) => {
                warn!(error = %e, "Failed to load agents");
                MenuScreen::Error(e.user_message())
            }
        };
    }
}
