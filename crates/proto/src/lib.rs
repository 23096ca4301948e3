//! Shared domain types for the agents client.
//!
//! This crate defines the serializable agent/session/message structures and
//! the strongly-typed error enums shared by the gateway, the chat core, and
//! the terminal front-end.

pub mod agent;
pub mod error;
pub mod event;
pub mod message;
pub mod session;

/// Re-export of agent catalog types.
pub use agent::{Agent, AgentId};
/// Re-export of all protocol error types.
pub use error::*;
/// Re-export of gateway reply types.
pub use event::SendReply;
/// Re-export of message identity types.
pub use message::{ChatMessage, Origin};
/// Re-export of session types.
pub use session::{ChatSession, SessionDetail, SessionId, SessionOrigin, SessionTurn};

/// Returns `true` when `agent_id` is one of the agents that keep a
/// multi-session history on the backend.
///
/// Comparison is ASCII case-insensitive so `"Pixel"` and `"pixel"` match.
pub fn supports_session_history(agent_id: &AgentId, session_agents: &[String]) -> bool {
    session_agents
        .iter()
        .any(|candidate| candidate.eq_ignore_ascii_case(agent_id.as_str()))
}
