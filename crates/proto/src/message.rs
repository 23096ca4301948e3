use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Who authored a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    /// Typed by the end user.
    User,
    /// Produced by the agent (replies, greetings, failure notices).
    Agent,
}

impl std::fmt::Display for Origin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Origin::User => write!(f, "user"),
            Origin::Agent => write!(f, "agent"),
        }
    }
}

/// A single bubble in a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Client-side opaque identifier.
    pub id: String,
    /// Text content.
    pub content: String,
    /// Author of the message.
    pub origin: Origin,
    /// Creation timestamp in UTC.
    pub created_at: DateTime<Utc>,
}

impl ChatMessage {
    /// Creates a user-originated message with a fresh random id.
    pub fn user(content: impl Into<String>) -> Self {
        Self::fresh(content, Origin::User)
    }

    /// Creates an agent-originated message with a fresh random id.
    pub fn agent(content: impl Into<String>) -> Self {
        Self::fresh(content, Origin::Agent)
    }

    /// Creates a message with a caller-chosen id and timestamp.
    pub fn with_id(
        id: impl Into<String>,
        content: impl Into<String>,
        origin: Origin,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            origin,
            created_at,
        }
    }

    /// Returns `true` when the message was typed by the user.
    pub fn is_from_user(&self) -> bool {
        self.origin == Origin::User
    }

    fn fresh(content: impl Into<String>, origin: Origin) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            content: content.into(),
            origin,
            created_at: Utc::now(),
        }
    }
}
