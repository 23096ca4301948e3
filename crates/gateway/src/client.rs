//! The gateway contract consumed by the chat core.

use async_trait::async_trait;
use proto::{Agent, AgentId, ChatSession, GatewayError, SendReply, SessionDetail, SessionId};

/// Remote operations the client needs from the backend.
///
/// Every call resolves to a payload or a normalized [`GatewayError`]; callers
/// decide locally how to degrade.
#[async_trait]
pub trait AgentsGateway: Send + Sync {
    /// Lists the selectable agents.
    async fn list_agents(&self) -> Result<Vec<Agent>, GatewayError>;

    /// Lists stored sessions for `agent_id`.
    async fn list_sessions(&self, agent_id: &AgentId) -> Result<Vec<ChatSession>, GatewayError>;

    /// Fetches the full turn history of one session.
    async fn get_session_detail(
        &self,
        agent_id: &AgentId,
        session_id: &SessionId,
    ) -> Result<SessionDetail, GatewayError>;

    /// Sends `text` to `agent_id`, continuing `session_id` when given.
    async fn send_message(
        &self,
        agent_id: &AgentId,
        session_id: Option<&SessionId>,
        text: &str,
    ) -> Result<SendReply, GatewayError>;
}
