//! Async event loop for the TUI: interleaves crossterm input, runtime screen
//! updates, and the spinner timer.

use std::sync::Arc;

use chat::{ChatController, ChatRuntime, ChatScreen, ChatSettings, Intent, MenuRuntime, MenuScreen};
use crossterm::{
    event::{Event, EventStream, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use futures_util::StreamExt;
use gateway::AgentsGateway;
use proto::{Agent, AgentId};
use ratatui::{Terminal, backend::CrosstermBackend};
use tokio::sync::watch;
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, info, warn};

use super::app::{AppAction, TuiApp};

/// RAII guard that restores the terminal on drop (even on panic).
struct TerminalGuard;

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(std::io::stdout(), LeaveAlternateScreen);
    }
}

/// Runtimes behind the screens currently on display.
struct Screens {
    gateway: Arc<dyn AgentsGateway>,
    settings: ChatSettings,
    menu: Option<MenuRuntime>,
    menu_rx: Option<watch::Receiver<MenuScreen>>,
    chat: Option<ChatRuntime>,
    chat_rx: Option<watch::Receiver<ChatScreen>>,
}

impl Screens {
    fn new(gateway: Arc<dyn AgentsGateway>, settings: ChatSettings) -> Self {
        Self {
            gateway,
            settings,
            menu: None,
            menu_rx: None,
            chat: None,
            chat_rx: None,
        }
    }

    fn start_menu(&mut self, app: &mut TuiApp) {
        let menu = MenuRuntime::spawn(self.gateway.clone());
        app.set_menu(menu.screen());
        self.menu_rx = Some(menu.subscribe());
        self.menu = Some(menu);
    }

    /// Replaces any open chat with a fresh one for `agent_id`.
    fn start_chat(&mut self, app: &mut TuiApp, agent_id: AgentId, agent_name: String) -> &ChatRuntime {
        info!(agent = %agent_id, "Opening chat");
        let controller = ChatController::new(agent_id, agent_name, self.settings.clone());
        let runtime = ChatRuntime::spawn(controller, self.gateway.clone());
        app.set_chat(runtime.screen());
        self.chat_rx = Some(runtime.subscribe());
        self.chat.insert(runtime)
    }

    fn open_agent(&mut self, app: &mut TuiApp, agent: Agent) {
        app.open_chat();
        let runtime = self.start_chat(app, agent.id, agent.name);
        dispatch(runtime, Intent::Start);
    }

    /// Applies the outcome of resolving the agent given on the command line.
    fn open_resolved(&mut self, app: &mut TuiApp, agent_id: AgentId, resolved: Result<Agent, String>) {
        match resolved {
            Ok(agent) => self.open_agent(app, agent),
            Err(message) => {
                warn!(agent = %agent_id, error = %message, "Agent lookup failed");
                let name = agent_id.to_string();
                let runtime = self.start_chat(app, agent_id, name);
                dispatch(runtime, Intent::SetupFailed(message));
            }
        }
    }

    fn close_chat(&mut self, app: &mut TuiApp) {
        // Dropping the runtime cancels its outstanding requests.
        self.chat = None;
        self.chat_rx = None;
        app.close_chat();
    }

    fn perform(&mut self, app: &mut TuiApp, action: AppAction) {
        match action {
            AppAction::None | AppAction::Quit => {}
            AppAction::OpenAgent(agent) => self.open_agent(app, agent),
            AppAction::RetryAgents => {
                if let Some(menu) = &self.menu
                    && let Err(err) = menu.retry()
                {
                    warn!(error = %err, "Agents menu retry dropped");
                }
            }
            AppAction::CloseChat => self.close_chat(app),
            AppAction::Dispatch(intent) => {
                if let Some(runtime) = &self.chat {
                    dispatch(runtime, intent);
                }
            }
        }
    }
}

fn dispatch(runtime: &ChatRuntime, intent: Intent) {
    if let Err(err) = runtime.dispatch(intent) {
        warn!(error = %err, "Chat intent dropped");
    }
}

/// Waits for the next published value; never resolves without a receiver.
async fn next_change<T>(rx: &mut Option<watch::Receiver<T>>) -> bool {
    match rx {
        Some(rx) => rx.changed().await.is_ok(),
        None => std::future::pending().await,
    }
}

async fn join_pending<T>(task: &mut Option<JoinHandle<T>>) -> Result<T, JoinError> {
    match task {
        Some(task) => task.await,
        None => std::future::pending().await,
    }
}

/// Looks an agent up in the backend catalog.
async fn resolve_agent(gateway: Arc<dyn AgentsGateway>, agent_id: AgentId) -> Result<Agent, String> {
    let agents = gateway
        .list_agents()
        .await
        .map_err(|err| err.user_message())?;
    agents
        .into_iter()
        .find(|agent| agent.id == agent_id)
        .ok_or_else(|| format!("Unknown agent: {agent_id}"))
}

/// Run the full-screen TUI until the user quits.
///
/// With `direct_agent` set the chat for that agent opens immediately and
/// leaving it exits; otherwise the agents menu is shown first.
pub async fn run_tui(
    gateway: Arc<dyn AgentsGateway>,
    settings: ChatSettings,
    direct_agent: Option<AgentId>,
) -> anyhow::Result<()> {
    // Terminal setup
    enable_raw_mode()?;
    let mut stdout = std::io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let _guard = TerminalGuard; // Drop restores terminal

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut screens = Screens::new(gateway.clone(), settings);
    let mut lookup: Option<JoinHandle<Result<Agent, String>>> = None;
    let mut app = match &direct_agent {
        Some(agent_id) => {
            debug!(agent = %agent_id, "TUI started in chat mode");
            lookup = Some(tokio::spawn(resolve_agent(gateway, agent_id.clone())));
            TuiApp::standalone_chat()
        }
        None => {
            debug!("TUI started in menu mode");
            let mut app = TuiApp::new();
            screens.start_menu(&mut app);
            app
        }
    };

    // Crossterm event stream (async)
    let mut crossterm_stream = EventStream::new();

    // Spinner tick interval (100ms)
    let mut spinner_interval = tokio::time::interval(std::time::Duration::from_millis(100));
    spinner_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        terminal.draw(|frame| app.render(frame))?;

        tokio::select! {
            maybe_event = crossterm_stream.next() => {
                match maybe_event {
                    Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => {
                        let action = app.handle_key(key);
                        screens.perform(&mut app, action);
                    }
                    Some(Ok(_)) => {}
                    Some(Err(err)) => {
                        warn!(error = %err, "Terminal event stream failed");
                        break;
                    }
                    None => break,
                }
            }

            alive = next_change(&mut screens.menu_rx) => {
                match screens.menu_rx.as_mut() {
                    Some(rx) if alive => app.set_menu(rx.borrow_and_update().clone()),
                    _ => screens.menu_rx = None,
                }
            }

            alive = next_change(&mut screens.chat_rx) => {
                match screens.chat_rx.as_mut() {
                    Some(rx) if alive => app.set_chat(rx.borrow_and_update().clone()),
                    _ => screens.chat_rx = None,
                }
            }

            joined = join_pending(&mut lookup) => {
                lookup = None;
                if let Some(agent_id) = direct_agent.clone() {
                    let resolved = joined.unwrap_or_else(|err| Err(format!("Agent lookup failed: {err}")));
                    screens.open_resolved(&mut app, agent_id, resolved);
                }
            }

            _ = spinner_interval.tick(), if app.is_busy() => {
                app.spinner_tick = app.spinner_tick.wrapping_add(1);
            }
        }

        if app.should_quit {
            break;
        }
    }

    // TerminalGuard::drop handles cleanup
    Ok(())
}
