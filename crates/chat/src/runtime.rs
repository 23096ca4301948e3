//! Async drivers that own the state machines and execute their gateway work.
//!
//! A driver task is the single owner of its state machine. Intents arrive on
//! an `mpsc` channel, gateway calls run as tasks in a [`JoinSet`], and every
//! state change is published on a `watch` channel for renderers. Dropping a
//! runtime aborts the driver and with it every outstanding request.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::FutureExt;
use gateway::AgentsGateway;
use proto::{Agent, GatewayError};
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, warn};

use crate::controller::{ChatController, Effect, Intent, Outcome, RequestToken};
use crate::menu::{AgentsMenu, MenuScreen};
use crate::state::ChatScreen;

const INTERRUPTED: &str = "Request was interrupted";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RuntimeError {
    #[error("runtime has stopped")]
    Stopped,
}

// ── Chat ────────────────────────────────────────────────────

/// Drives a [`ChatController`] against a gateway.
pub struct ChatRuntime {
    intents: mpsc::UnboundedSender<Intent>,
    screens: watch::Receiver<ChatScreen>,
    driver: JoinHandle<()>,
}

impl ChatRuntime {
    /// Spawns the driver on the current tokio runtime.
    pub fn spawn(controller: ChatController, gateway: Arc<dyn AgentsGateway>) -> Self {
        let (intent_tx, intent_rx) = mpsc::unbounded_channel();
        let (screen_tx, screen_rx) = watch::channel(controller.screen());
        let driver = tokio::spawn(drive_chat(controller, gateway, intent_rx, screen_tx));
        Self {
            intents: intent_tx,
            screens: screen_rx,
            driver,
        }
    }

    pub fn dispatch(&self, intent: Intent) -> Result<(), RuntimeError> {
        self.intents.send(intent).map_err(|_| RuntimeError::Stopped)
    }

    /// Receiver notified on every published screen.
    pub fn subscribe(&self) -> watch::Receiver<ChatScreen> {
        self.screens.clone()
    }

    /// Latest published screen.
    pub fn screen(&self) -> ChatScreen {
        self.screens.borrow().clone()
    }
}

impl Drop for ChatRuntime {
    fn drop(&mut self) {
        self.driver.abort();
    }
}

async fn drive_chat(
    mut controller: ChatController,
    gateway: Arc<dyn AgentsGateway>,
    mut intents: mpsc::UnboundedReceiver<Intent>,
    screens: watch::Sender<ChatScreen>,
) {
    let mut tasks: JoinSet<Outcome> = JoinSet::new();

    loop {
        tokio::select! {
            intent = intents.recv() => {
                let Some(intent) = intent else { break };
                debug!(?intent, "Chat intent");
                for effect in controller.handle(intent) {
                    spawn_chat_effect(&mut tasks, Arc::clone(&gateway), effect);
                }
            }
            Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
                match joined {
                    Ok(outcome) => controller.apply(outcome),
                    Err(e) => {
                        warn!(error = %e, "Chat request task ended unexpectedly");
                        continue;
                    }
                }
            }
        }
        screens.send_replace(controller.screen());
    }

    debug!(agent = %controller.agent_id(), "Chat runtime stopped");
}

fn spawn_chat_effect(tasks: &mut JoinSet<Outcome>, gateway: Arc<dyn AgentsGateway>, effect: Effect) {
    let token = effect.token();
    let fallback = effect.clone();
    debug!(%token, "Spawning chat request");
    tasks.spawn(guarded(token, execute(gateway, effect), move || {
        fallback.aborted(INTERRUPTED)
    }));
}

async fn execute(gateway: Arc<dyn AgentsGateway>, effect: Effect) -> Outcome {
    match effect {
        Effect::ListSessions { token, agent_id } => Outcome::SessionsListed {
            token,
            result: gateway.list_sessions(&agent_id).await,
        },
        Effect::FetchSessionDetail {
            token,
            agent_id,
            session_id,
        } => Outcome::SessionDetailLoaded {
            token,
            result: gateway.get_session_detail(&agent_id, &session_id).await,
        },
        Effect::SendMessage {
            token,
            agent_id,
            session_id,
            text,
        } => Outcome::MessageSent {
            token,
            result: gateway
                .send_message(&agent_id, session_id.as_ref(), &text)
                .await,
        },
    }
}

/// Runs `work`, turning a panic into the `fallback` outcome so the state
/// machine always hears back.
async fn guarded<T, F>(token: RequestToken, work: F, fallback: impl FnOnce() -> T) -> T
where
    F: Future<Output = T>,
{
    match AssertUnwindSafe(work).catch_unwind().await {
        Ok(value) => value,
        Err(_) => {
            warn!(%token, "Request task panicked");
            fallback()
        }
    }
}

// ── Agents menu ─────────────────────────────────────────────

type AgentsResult = (RequestToken, Result<Vec<Agent>, GatewayError>);

/// Drives an [`AgentsMenu`]; loading starts as soon as it is spawned.
pub struct MenuRuntime {
    retries: mpsc::UnboundedSender<()>,
    screens: watch::Receiver<MenuScreen>,
    driver: JoinHandle<()>,
}

impl MenuRuntime {
    pub fn spawn(gateway: Arc<dyn AgentsGateway>) -> Self {
        let (retry_tx, retry_rx) = mpsc::unbounded_channel();
        let (screen_tx, screen_rx) = watch::channel(MenuScreen::Loading);
        let driver = tokio::spawn(drive_menu(gateway, retry_rx, screen_tx));
        Self {
            retries: retry_tx,
            screens: screen_rx,
            driver,
        }
    }

    /// Reloads the catalog.
    pub fn retry(&self) -> Result<(), RuntimeError> {
        self.retries.send(()).map_err(|_| RuntimeError::Stopped)
    }

    pub fn subscribe(&self) -> watch::Receiver<MenuScreen> {
        self.screens.clone()
    }

    pub fn screen(&self) -> MenuScreen {
        self.screens.borrow().clone()
    }
}

impl Drop for MenuRuntime {
    fn drop(&mut self) {
        self.driver.abort();
    }
}

async fn drive_menu(
    gateway: Arc<dyn AgentsGateway>,
    mut retries: mpsc::UnboundedReceiver<()>,
    screens: watch::Sender<MenuScreen>,
) {
    let mut menu = AgentsMenu::new();
    let mut tasks: JoinSet<AgentsResult> = JoinSet::new();
    spawn_agents_fetch(&mut tasks, Arc::clone(&gateway), menu.start().token);
    screens.send_replace(menu.screen().clone());

    loop {
        tokio::select! {
            retry = retries.recv() => {
                if retry.is_none() {
                    break;
                }
                spawn_agents_fetch(&mut tasks, Arc::clone(&gateway), menu.start().token);
            }
            Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
                match joined {
                    Ok((token, result)) => menu.on_agents(token, result),
                    Err(e) => {
                        warn!(error = %e, "Agents request task ended unexpectedly");
                        continue;
                    }
                }
            }
        }
        screens.send_replace(menu.screen().clone());
    }
}

fn spawn_agents_fetch(
    tasks: &mut JoinSet<AgentsResult>,
    gateway: Arc<dyn AgentsGateway>,
    token: RequestToken,
) {
    let work = async move { (token, gateway.list_agents().await) };
    tasks.spawn(guarded(token, work, move || {
        (token, Err(GatewayError::Unknown(INTERRUPTED.to_string())))
    }));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn guarded_passes_through_result() {
        let token = RequestToken::from_raw(1);
        let value = guarded(token, async { 7 }, || 0).await;
        assert_eq!(value, 7);
    }

    #[tokio::test]
    async fn guarded_converts_panic_into_fallback() {
        let token = RequestToken::from_raw(2);
        let explode = true;
        let value = guarded(
            token,
            async move {
                if explode {
                    panic!("boom");
                }
                1
            },
            || 42,
        )
        .await;
        assert_eq!(value, 42);
    }
}
