//! In-memory session list and per-session transcript cache.

use std::collections::HashMap;

use proto::{AgentId, ChatMessage, ChatSession, SessionId};
use tracing::debug;

/// Maximum number of characters of the first message kept in a derived title.
pub const TITLE_MAX_CHARS: usize = 30;
/// Title used when the first message yields nothing printable.
pub const DEFAULT_NEW_SESSION_TITLE: &str = "New conversation";

/// Merges a fresh server listing with the sessions already known locally.
///
/// Server entries win on id collisions. Known entries the server did not
/// report are kept and placed first so sessions created in this run stay
/// visible until the backend lists them. Duplicate ids within `server` keep
/// their first occurrence.
pub fn merge_sessions(server: Vec<ChatSession>, known: &[ChatSession]) -> Vec<ChatSession> {
    let mut merged: Vec<ChatSession> = Vec::with_capacity(server.len() + known.len());

    for session in known {
        if !server.iter().any(|s| s.id == session.id) && !merged.iter().any(|s| s.id == session.id)
        {
            merged.push(session.clone());
        }
    }

    let local_count = merged.len();
    for session in server {
        if !merged[local_count..].iter().any(|s| s.id == session.id) {
            merged.push(session);
        }
    }
    merged
}

/// Derives a session title from the first message sent in it.
pub fn derive_session_title(text: &str, placeholder: &str) -> String {
    let trimmed = text.trim();
    let mut title: String = trimmed.chars().take(TITLE_MAX_CHARS).collect();
    if title.trim().is_empty() {
        return placeholder.to_string();
    }
    if trimmed.chars().count() > TITLE_MAX_CHARS {
        title.push_str("...");
    }
    title
}

/// Session list plus a transcript cache keyed by session id.
///
/// Owned by a single conversation; nothing is persisted and nothing is
/// evicted.
#[derive(Debug, Default, Clone)]
pub struct SessionStore {
    sessions: Vec<ChatSession>,
    cache: HashMap<SessionId, Vec<ChatMessage>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Known sessions in display order.
    pub fn sessions(&self) -> &[ChatSession] {
        &self.sessions
    }

    pub fn find(&self, id: &SessionId) -> Option<&ChatSession> {
        self.sessions.iter().find(|s| &s.id == id)
    }

    /// Replaces the session list with the merge of `server` and what is known.
    pub fn merge_server(&mut self, server: Vec<ChatSession>) {
        let merged = merge_sessions(server, &self.sessions);
        debug!(
            before = %self.sessions.len(),
            after = %merged.len(),
            "Merged server session list"
        );
        self.sessions = merged;
    }

    pub fn cache_put(&mut self, id: SessionId, messages: Vec<ChatMessage>) {
        self.cache.insert(id, messages);
    }

    /// Cached transcript for `id`, or an empty list on a miss.
    pub fn cache_get(&self, id: &SessionId) -> Vec<ChatMessage> {
        self.cache.get(id).cloned().unwrap_or_default()
    }

    /// `true` when a non-empty transcript is cached for `id`.
    pub fn has_cached(&self, id: &SessionId) -> bool {
        self.cache.get(id).is_some_and(|messages| !messages.is_empty())
    }

    /// Appends one message to an existing cached transcript.
    ///
    /// Returns `false` (and caches nothing) when there is no transcript yet.
    pub fn cache_append(&mut self, id: &SessionId, message: ChatMessage) -> bool {
        match self.cache.get_mut(id) {
            Some(messages) if !messages.is_empty() => {
                messages.push(message);
                true
            }
            _ => false,
        }
    }

    /// Makes sure a session with `id` is listed, returning the listed entry.
    ///
    /// A missing session is synthesized as a local entry and inserted first.
    /// An existing entry is reused unchanged.
    pub fn promote_local_session(
        &mut self,
        id: SessionId,
        title: impl Into<String>,
        agent_id: &AgentId,
    ) -> ChatSession {
        if let Some(existing) = self.find(&id) {
            return existing.clone();
        }
        let session = ChatSession::local(id, agent_id.clone(), title);
        debug!(session = %session.id, title = %session.title, "Promoted local session");
        self.sessions.insert(0, session.clone());
        session
    }
}
