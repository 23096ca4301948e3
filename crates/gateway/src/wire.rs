//! JSON payloads exchanged with the agents backend and their mapping onto
//! domain types.

use chrono::{DateTime, Utc};
use proto::{Agent, AgentId, ChatSession, SendReply, SessionDetail, SessionId, SessionTurn};
use serde::{Deserialize, Serialize};

// ── Request types ──────────────────────────────────────────────────────────────

/// Body of `POST /agents/chat/{agent}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub agent_id: String,
    /// Empty string starts a new conversation.
    pub session_id: String,
    pub message: String,
}

impl ChatRequest {
    pub fn new(agent_id: &AgentId, session_id: Option<&SessionId>, message: &str) -> Self {
        Self {
            agent_id: agent_id.as_str().to_string(),
            session_id: session_id.map(|id| id.as_str().to_string()).unwrap_or_default(),
            message: message.to_string(),
        }
    }
}

// ── Response types ─────────────────────────────────────────────────────────────

/// One entry of `GET /agents`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentDto {
    pub id: String,
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub icon_url: Option<String>,
}

/// Reply of `POST /agents/chat/{agent}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub agent_id: String,
    #[serde(default)]
    pub session_id: String,
    pub message: String,
}

/// One entry of the session listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSummaryDto {
    pub session_id: String,
    #[serde(default)]
    pub session_name: Option<String>,
    /// Epoch milliseconds.
    pub created_at: i64,
    #[serde(default)]
    pub runs_count: u32,
}

/// Paged reply of `GET /agents/chat/{agent}/sessions`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionListResponse {
    pub data: Vec<SessionSummaryDto>,
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_limit")]
    pub limit: u32,
    #[serde(default)]
    pub total: u32,
}

fn default_page() -> u32 {
    1
}

fn default_limit() -> u32 {
    20
}

/// One turn of a session detail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnDto {
    pub user_message: String,
    pub assistant_message: String,
    pub created_at: i64,
}

/// Reply of `GET /agents/chat/{agent}/sessions/{id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionDetailResponse {
    pub session_id: String,
    #[serde(default)]
    pub session_name: Option<String>,
    pub created_at: i64,
    #[serde(default)]
    pub turns: Vec<TurnDto>,
}

// ── Conversion helpers ─────────────────────────────────────────────────────────

/// Converts epoch milliseconds to UTC, clamping out-of-range values to the epoch.
pub fn millis_to_utc(millis: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(millis).unwrap_or(DateTime::UNIX_EPOCH)
}

impl From<AgentDto> for Agent {
    fn from(dto: AgentDto) -> Self {
        Agent {
            id: AgentId::from(dto.id),
            name: dto.name,
            description: dto.description,
            icon_url: dto.icon_url.filter(|url| !url.trim().is_empty()),
        }
    }
}

impl SessionSummaryDto {
    /// Maps a summary to a server-confirmed session owned by `agent_id`.
    ///
    /// The title is the backend name when it is non-blank, the id otherwise.
    pub fn into_session(self, agent_id: &AgentId) -> ChatSession {
        let title = match self.session_name {
            Some(name) if !name.trim().is_empty() => name,
            _ => self.session_id.clone(),
        };
        ChatSession::server(
            self.session_id,
            agent_id.clone(),
            title,
            millis_to_utc(self.created_at),
        )
    }
}

impl From<SessionDetailResponse> for SessionDetail {
    fn from(dto: SessionDetailResponse) -> Self {
        SessionDetail {
            session_id: SessionId::from(dto.session_id),
            session_name: dto.session_name,
            created_at: millis_to_utc(dto.created_at),
            turns: dto
                .turns
                .into_iter()
                .map(|turn| SessionTurn {
                    user_message: turn.user_message,
                    assistant_message: turn.assistant_message,
                    created_at: millis_to_utc(turn.created_at),
                })
                .collect(),
        }
    }
}

impl From<ChatResponse> for SendReply {
    fn from(dto: ChatResponse) -> Self {
        SendReply::new(dto.agent_id, Some(dto.session_id), dto.message)
    }
}
