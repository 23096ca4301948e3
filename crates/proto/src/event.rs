use serde::{Deserialize, Serialize};

use crate::agent::AgentId;
use crate::session::SessionId;

/// Backend answer to a sent chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendReply {
    /// Agent that produced the reply.
    pub agent_id: AgentId,
    /// Session the exchange was stored under; `None` when the backend did not
    /// assign one.
    pub session_id: Option<SessionId>,
    /// Reply text.
    pub text: String,
}

impl SendReply {
    /// Builds a reply, treating a blank session id as "no session".
    pub fn new(
        agent_id: impl Into<AgentId>,
        session_id: Option<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            agent_id: agent_id.into(),
            session_id: session_id
                .filter(|id| !id.trim().is_empty())
                .map(SessionId::from),
            text: text.into(),
        }
    }
}
