use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::agent::AgentId;

/// Opaque session identifier assigned by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub String);

impl SessionId {
    /// Returns the raw session identifier string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for SessionId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for SessionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Where a session entry came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionOrigin {
    /// Present in the backend's session list.
    Server,
    /// Created client-side after the first confirmed send; not yet seen in a
    /// server list.
    Local,
}

/// A resumable conversation thread with one agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatSession {
    /// Backend identifier.
    pub id: SessionId,
    /// Agent that owns the session.
    pub agent_id: AgentId,
    /// Display title.
    pub title: String,
    /// Creation timestamp in UTC.
    pub created_at: DateTime<Utc>,
    /// Provenance of this entry.
    pub origin: SessionOrigin,
}

impl ChatSession {
    /// Creates a server-confirmed session entry.
    pub fn server(
        id: impl Into<SessionId>,
        agent_id: impl Into<AgentId>,
        title: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            agent_id: agent_id.into(),
            title: title.into(),
            created_at,
            origin: SessionOrigin::Server,
        }
    }

    /// Creates a local-only session stamped with the current time.
    pub fn local(
        id: impl Into<SessionId>,
        agent_id: impl Into<AgentId>,
        title: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            agent_id: agent_id.into(),
            title: title.into(),
            created_at: Utc::now(),
            origin: SessionOrigin::Local,
        }
    }

    /// Returns `true` when the entry has not been confirmed by the server yet.
    pub fn is_local(&self) -> bool {
        self.origin == SessionOrigin::Local
    }
}

/// One user/assistant exchange inside a stored session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionTurn {
    /// What the user sent.
    pub user_message: String,
    /// What the agent answered.
    pub assistant_message: String,
    /// When the turn happened.
    pub created_at: DateTime<Utc>,
}

/// Full history of a session, used to hydrate it on first selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionDetail {
    /// Session the turns belong to.
    pub session_id: SessionId,
    /// Optional backend-side name.
    pub session_name: Option<String>,
    /// Session creation time.
    pub created_at: DateTime<Utc>,
    /// Turns in chronological order.
    pub turns: Vec<SessionTurn>,
}
