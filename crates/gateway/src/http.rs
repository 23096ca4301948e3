//! REST implementation of [`AgentsGateway`].

use std::time::Duration;

use async_trait::async_trait;
use proto::{Agent, AgentId, ChatSession, GatewayError, SendReply, SessionDetail, SessionId};
use reqwest::Url;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::client::AgentsGateway;
use crate::wire::{
    AgentDto, ChatRequest, ChatResponse, SessionDetailResponse, SessionListResponse,
};

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Agents backend reached over HTTP/JSON.
pub struct HttpGateway {
    client: reqwest::Client,
    base_url: String,
}

impl HttpGateway {
    /// Creates a gateway targeting `base_url` with the given request timeout.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GatewayError::Unknown(e.to_string()))?;
        Ok(Self::with_client(client, base_url))
    }

    /// Creates a gateway reusing an existing `reqwest` client.
    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    /// Returns the normalized base URL (no trailing slash).
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Appends `segments` to the base URL, percent-encoding each one so ids
    /// containing `/`, `?` or `#` stay inside their own segment.
    fn url(&self, segments: &[&str]) -> Result<Url, GatewayError> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| GatewayError::Unknown(format!("Invalid base URL {}: {e}", self.base_url)))?;
        url.path_segments_mut()
            .map_err(|()| GatewayError::Unknown(format!("Invalid base URL {}", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T, GatewayError> {
        let url = self.url(segments)?;
        debug!(%url, "GET");
        let response = self.client.get(url).send().await.map_err(classify)?;
        read_json(response).await
    }
}

#[async_trait]
impl AgentsGateway for HttpGateway {
    async fn list_agents(&self) -> Result<Vec<Agent>, GatewayError> {
        let agents: Vec<AgentDto> = self.get_json(&["agents"]).await?;
        debug!(count = %agents.len(), "Agents listed");
        Ok(agents.into_iter().map(Agent::from).collect())
    }

    async fn list_sessions(&self, agent_id: &AgentId) -> Result<Vec<ChatSession>, GatewayError> {
        let list: SessionListResponse = self
            .get_json(&["agents", "chat", agent_id.as_str(), "sessions"])
            .await?;
        debug!(agent = %agent_id, count = %list.data.len(), total = %list.total, "Sessions listed");
        Ok(list
            .data
            .into_iter()
            .map(|summary| summary.into_session(agent_id))
            .collect())
    }

    async fn get_session_detail(
        &self,
        agent_id: &AgentId,
        session_id: &SessionId,
    ) -> Result<SessionDetail, GatewayError> {
        let detail: SessionDetailResponse = self
            .get_json(&[
                "agents",
                "chat",
                agent_id.as_str(),
                "sessions",
                session_id.as_str(),
            ])
            .await?;
        Ok(SessionDetail::from(detail))
    }

    async fn send_message(
        &self,
        agent_id: &AgentId,
        session_id: Option<&SessionId>,
        text: &str,
    ) -> Result<SendReply, GatewayError> {
        let url = self.url(&["agents", "chat", agent_id.as_str()])?;
        let body = ChatRequest::new(agent_id, session_id, text);
        debug!(%url, session = ?session_id, message_len = %text.len(), "POST chat");
        let response = self
            .client
            .post(url)
            .json(&body)
            .send()
            .await
            .map_err(classify)?;
        let reply: ChatResponse = read_json(response).await?;
        Ok(SendReply::from(reply))
    }
}

/// Reads a response body and decodes it, mapping non-2xx statuses to
/// [`GatewayError::Protocol`].
async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, GatewayError> {
    let status = response.status();
    let body = response.text().await.map_err(classify)?;

    if !status.is_success() {
        warn!(status = %status.as_u16(), body = %preview(&body, 500), "Backend returned error status");
        return Err(GatewayError::Protocol {
            status: status.as_u16(),
            body,
        });
    }

    serde_json::from_str(&body).map_err(|e| {
        warn!(error = %e, body = %preview(&body, 200), "Failed to decode backend response");
        GatewayError::Decode(e.to_string())
    })
}

/// Normalizes a transport-level `reqwest` failure.
fn classify(err: reqwest::Error) -> GatewayError {
    if err.is_timeout() {
        GatewayError::Timeout
    } else if err.is_connect() {
        GatewayError::Connectivity(err.to_string())
    } else if err.is_decode() {
        GatewayError::Decode(err.to_string())
    } else {
        GatewayError::Unknown(err.to_string())
    }
}

fn preview(body: &str, max: usize) -> String {
    body.chars().take(max).collect()
}
