//! Read-only views handed to renderers.

use proto::{AgentId, ChatMessage, ChatSession, SessionId};

/// Lifecycle phase of a chat screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestPhase {
    /// Nothing started yet.
    Loading,
    /// Setup failed; carries the message to show.
    Error(String),
    /// Normal operation. In-flight detail loads and sends do not leave this
    /// phase.
    Ready,
}

/// Everything a renderer needs to draw a ready chat screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatSnapshot {
    pub agent_id: AgentId,
    pub agent_name: String,
    /// Active transcript in arrival order.
    pub messages: Vec<ChatMessage>,
    /// Known sessions, local-only entries first.
    pub sessions: Vec<ChatSession>,
    /// `None` while on a new, unsaved conversation.
    pub selected_session: Option<SessionId>,
    pub is_loading_session_detail: bool,
    pub is_sending_message: bool,
    /// Whether this agent keeps a multi-session history.
    pub supports_sessions: bool,
}

impl ChatSnapshot {
    /// The selected session entry, if it is listed.
    pub fn selected(&self) -> Option<&ChatSession> {
        let id = self.selected_session.as_ref()?;
        self.sessions.iter().find(|s| &s.id == id)
    }
}

/// Screen state; ready-only data exists only in [`ChatScreen::Ready`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatScreen {
    Loading,
    Error(String),
    Ready(ChatSnapshot),
}

impl ChatScreen {
    pub fn snapshot(&self) -> Option<&ChatSnapshot> {
        match self {
            ChatScreen::Ready(snapshot) => Some(snapshot),
            _ => None,
        }
    }
}
