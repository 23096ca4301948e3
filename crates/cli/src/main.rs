//! CLI entrypoint and subcommand orchestration.

mod config;
#[cfg(test)]
mod test_support;
mod tui;

use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use gateway::{AgentsGateway, HttpGateway};
use proto::{Agent, AgentId, ChatSession};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{Config, config_home};

/// Top-level command-line arguments for xiagents.
#[derive(Parser)]
#[command(name = "xiagents")]
#[command(about = "Terminal client for conversational agents", version)]
struct Cli {
    /// Path to config file
    #[arg(short, long)]
    config: Option<std::path::PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Enable debug logging to ~/.xiagents/logs
    #[arg(long, default_value_t = false)]
    debug: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// CLI subcommands.
#[derive(Subcommand, Debug, PartialEq, Eq)]
enum Commands {
    /// Open the agents menu (default)
    Tui,
    /// Open the chat screen for one agent
    Chat {
        /// Agent identifier; falls back to `chat.default_agent`
        #[arg(short, long)]
        agent: Option<String>,
    },
    /// Print the available agents
    Agents,
    /// Print an agent's stored sessions
    Sessions {
        #[arg(short, long)]
        agent: String,
    },
}

impl Commands {
    fn label(&self) -> &'static str {
        match self {
            Commands::Tui => "tui",
            Commands::Chat { .. } => "chat",
            Commands::Agents => "agents",
            Commands::Sessions { .. } => "sessions",
        }
    }

    fn is_tui(&self) -> bool {
        matches!(self, Commands::Tui | Commands::Chat { .. })
    }
}

#[tokio::main]
/// Program entrypoint.
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Commands::Tui);

    // Initialize tracing; console output would corrupt the TUI, so it is sunk there.
    let console_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    // WorkerGuard must outlive main() so buffered file writes are flushed on exit.
    let _file_guard: Option<tracing_appender::non_blocking::WorkerGuard>;

    let debug_writer = if cli.debug {
        let log_dir = config_home()
            .unwrap_or_else(|| std::path::PathBuf::from(".xiagents"))
            .join("logs");
        std::fs::create_dir_all(&log_dir).ok();
        let appender = tracing_appender::rolling::daily(&log_dir, "debug.log");
        let (writer, guard) = tracing_appender::non_blocking(appender);
        _file_guard = Some(guard);
        Some(writer)
    } else {
        _file_guard = None;
        None
    };

    match (command.is_tui(), debug_writer) {
        (true, Some(writer)) => {
            let console = fmt::layer()
                .with_writer(std::io::sink)
                .with_target(false)
                .with_filter(console_filter);
            tracing_subscriber::registry()
                .with(console)
                .with(file_layer(writer))
                .init();
        }
        (true, None) => {
            fmt()
                .with_env_filter(console_filter)
                .with_writer(std::io::sink)
                .with_target(false)
                .init();
        }
        (false, Some(writer)) => {
            let console = fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_filter(console_filter);
            tracing_subscriber::registry()
                .with(console)
                .with(file_layer(writer))
                .init();
        }
        (false, None) => {
            fmt()
                .with_env_filter(console_filter)
                .with_writer(std::io::stderr)
                .with_target(false)
                .init();
        }
    }

    if cli.debug {
        info!(
            version = env!("CARGO_PKG_VERSION"),
            command = command.label(),
            log_level = %cli.log_level,
            "========== xiagents session start =========="
        );
    }

    let config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) if cli.config.is_some() => {
            return Err(e).context("failed to load the config file given with --config");
        }
        Err(e) => {
            warn!("Failed to load config ({e}), using defaults");
            Config::default()
        }
    };

    let gateway: Arc<dyn AgentsGateway> = Arc::new(
        HttpGateway::new(&config.server.base_url, config.timeout())
            .context("failed to build the HTTP client")?,
    );

    match command {
        Commands::Tui => tui::run_tui(gateway, config.chat_settings(), None).await,
        Commands::Chat { agent } => {
            let agent = resolve_chat_agent(agent, &config)?;
            tui::run_tui(gateway, config.chat_settings(), Some(agent)).await
        }
        Commands::Agents => cmd_agents(gateway.as_ref()).await,
        Commands::Sessions { agent } => {
            cmd_sessions(gateway.as_ref(), &AgentId::from(agent)).await
        }
    }
}

fn file_layer<S>(writer: tracing_appender::non_blocking::NonBlocking) -> impl Layer<S>
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    fmt::layer()
        .with_writer(writer)
        .with_target(true)
        .with_ansi(false)
        .with_filter(EnvFilter::new("debug,hyper_util=info,rustls=info,reqwest=info"))
}

/// Picks the agent for `xiagents chat`: the flag wins over `chat.default_agent`.
fn resolve_chat_agent(flag: Option<String>, config: &Config) -> anyhow::Result<AgentId> {
    flag.or_else(|| config.chat.default_agent.clone())
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
        .map(AgentId::from)
        .context("no agent given; pass --agent or set chat.default_agent")
}

async fn cmd_agents(gateway: &dyn AgentsGateway) -> anyhow::Result<()> {
    let agents = gateway
        .list_agents()
        .await
        .map_err(|e| anyhow::anyhow!(e.user_message()))?;
    print!("{}", format_agents(&agents));
    Ok(())
}

async fn cmd_sessions(gateway: &dyn AgentsGateway, agent_id: &AgentId) -> anyhow::Result<()> {
    let sessions = gateway
        .list_sessions(agent_id)
        .await
        .map_err(|e| anyhow::anyhow!(e.user_message()))?;
    print!("{}", format_sessions(agent_id, &sessions));
    Ok(())
}

fn format_agents(agents: &[Agent]) -> String {
    if agents.is_empty() {
        return "No agents available\n".to_string();
    }
    let width = agents.iter().map(|a| a.id.as_str().len()).max().unwrap_or(0);
    let mut out = format!("Agents ({})\n", agents.len());
    for agent in agents {
        out.push_str(&format!(
            "  {:<width$}  {}  {}\n",
            agent.id.as_str(),
            agent.name,
            agent.description
        ));
    }
    out
}

fn format_sessions(agent_id: &AgentId, sessions: &[ChatSession]) -> String {
    if sessions.is_empty() {
        return format!("No sessions for {agent_id}\n");
    }
    let mut out = format!("Sessions for {agent_id} ({})\n", sessions.len());
    for session in sessions {
        out.push_str(&format!(
            "  {}  {}  {}\n",
            session.created_at.format("%Y-%m-%d %H:%M"),
            session.id,
            session.title
        ));
    }
    out
}
