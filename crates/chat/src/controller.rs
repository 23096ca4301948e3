//! Conversation state machine for one chat screen.
//!
//! [`ChatController`] never performs I/O. Intents return the gateway
//! [`Effect`]s the driver has to run; each completion is fed back as an
//! [`Outcome`] carrying the same [`RequestToken`]. Every request remembers the
//! [`Conversation`] it was issued for, so a completion that arrives after the
//! user moved elsewhere lands in that conversation's cached transcript
//! instead of the one on screen.

use std::collections::{HashMap, HashSet};

use proto::{
    AgentId, ChatMessage, ChatSession, GatewayError, Origin, SendReply, SessionDetail, SessionId,
    supports_session_history,
};
use tracing::{debug, warn};

use crate::state::{ChatScreen, ChatSnapshot, RequestPhase};
use crate::store::{DEFAULT_NEW_SESSION_TITLE, SessionStore, derive_session_title};

pub const DEFAULT_GREETING: &str = "Hello! How can I help you today?";
pub const DEFAULT_SEND_FAILURE_PREFIX: &str = "Failed to send message";

/// Tunables for a chat screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatSettings {
    /// Agent-originated message shown at the top of every new conversation.
    pub greeting: String,
    /// Title used for a promoted session whose first message was blank.
    pub new_session_title: String,
    /// Prefix of the inline notice shown when a send fails.
    pub send_failure_prefix: String,
    /// Agents that keep a multi-session history (case-insensitive).
    pub session_agents: Vec<String>,
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            greeting: DEFAULT_GREETING.to_string(),
            new_session_title: DEFAULT_NEW_SESSION_TITLE.to_string(),
            send_failure_prefix: DEFAULT_SEND_FAILURE_PREFIX.to_string(),
            session_agents: vec!["pixel".to_string()],
        }
    }
}

/// Correlates an [`Effect`] with its [`Outcome`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestToken(u64);

impl RequestToken {
    pub(crate) fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for RequestToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The conversation a request was issued for.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Conversation {
    /// A listed session.
    Session(SessionId),
    /// A new conversation not yet confirmed by the backend. Every switch to
    /// "new conversation" opens a fresh draft number.
    Draft(u64),
}

/// User-facing actions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    Start,
    /// `None` opens a new conversation.
    SelectSession(Option<ChatSession>),
    SendMessage(String),
    /// The driver could not set the screen up.
    SetupFailed(String),
}

/// Gateway work requested by the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    ListSessions {
        token: RequestToken,
        agent_id: AgentId,
    },
    FetchSessionDetail {
        token: RequestToken,
        agent_id: AgentId,
        session_id: SessionId,
    },
    SendMessage {
        token: RequestToken,
        agent_id: AgentId,
        session_id: Option<SessionId>,
        text: String,
    },
}

impl Effect {
    pub fn token(&self) -> RequestToken {
        match self {
            Effect::ListSessions { token, .. }
            | Effect::FetchSessionDetail { token, .. }
            | Effect::SendMessage { token, .. } => *token,
        }
    }

    /// Failed outcome for a task that ended before producing a result.
    pub fn aborted(&self, reason: impl Into<String>) -> Outcome {
        let error = GatewayError::Unknown(reason.into());
        let token = self.token();
        match self {
            Effect::ListSessions { .. } => Outcome::SessionsListed {
                token,
                result: Err(error),
            },
            Effect::FetchSessionDetail { .. } => Outcome::SessionDetailLoaded {
                token,
                result: Err(error),
            },
            Effect::SendMessage { .. } => Outcome::MessageSent {
                token,
                result: Err(error),
            },
        }
    }
}

/// Completion of an [`Effect`].
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    SessionsListed {
        token: RequestToken,
        result: Result<Vec<ChatSession>, GatewayError>,
    },
    SessionDetailLoaded {
        token: RequestToken,
        result: Result<SessionDetail, GatewayError>,
    },
    MessageSent {
        token: RequestToken,
        result: Result<SendReply, GatewayError>,
    },
}

impl Outcome {
    pub fn token(&self) -> RequestToken {
        match self {
            Outcome::SessionsListed { token, .. }
            | Outcome::SessionDetailLoaded { token, .. }
            | Outcome::MessageSent { token, .. } => *token,
        }
    }
}

#[derive(Debug)]
enum Pending {
    Sessions,
    Detail(SessionId),
    Send {
        target: Conversation,
        text: String,
        /// Transcript right after the optimistic user message was appended.
        transcript: Vec<ChatMessage>,
    },
}

/// State machine behind a single chat screen.
#[derive(Debug)]
pub struct ChatController {
    agent_id: AgentId,
    agent_name: String,
    settings: ChatSettings,
    phase: RequestPhase,
    messages: Vec<ChatMessage>,
    store: SessionStore,
    selected: Option<SessionId>,
    draft: u64,
    promoted_drafts: HashMap<u64, SessionId>,
    /// Sessions cached before their history arrived; the history goes in front.
    awaiting_history: HashSet<SessionId>,
    pending: HashMap<RequestToken, Pending>,
    next_token: u64,
}

impl ChatController {
    pub fn new(
        agent_id: impl Into<AgentId>,
        agent_name: impl Into<String>,
        settings: ChatSettings,
    ) -> Self {
        Self {
            agent_id: agent_id.into(),
            agent_name: agent_name.into(),
            settings,
            phase: RequestPhase::Loading,
            messages: Vec::new(),
            store: SessionStore::new(),
            selected: None,
            draft: 0,
            promoted_drafts: HashMap::new(),
            awaiting_history: HashSet::new(),
            pending: HashMap::new(),
            next_token: 0,
        }
    }

    pub fn agent_id(&self) -> &AgentId {
        &self.agent_id
    }

    pub fn phase(&self) -> &RequestPhase {
        &self.phase
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn selected_session(&self) -> Option<&SessionId> {
        self.selected.as_ref()
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    /// Whether this agent keeps a multi-session history.
    pub fn supports_sessions(&self) -> bool {
        supports_session_history(&self.agent_id, &self.settings.session_agents)
    }

    /// `true` while at least one send has not completed.
    pub fn is_sending_message(&self) -> bool {
        self.pending
            .values()
            .any(|p| matches!(p, Pending::Send { .. }))
    }

    /// `true` while the selected session's history is being fetched.
    pub fn is_loading_session_detail(&self) -> bool {
        self.selected
            .as_ref()
            .is_some_and(|id| self.detail_in_flight(id))
    }

    pub fn snapshot(&self) -> ChatSnapshot {
        ChatSnapshot {
            agent_id: self.agent_id.clone(),
            agent_name: self.agent_name.clone(),
            messages: self.messages.clone(),
            sessions: self.store.sessions().to_vec(),
            selected_session: self.selected.clone(),
            is_loading_session_detail: self.is_loading_session_detail(),
            is_sending_message: self.is_sending_message(),
            supports_sessions: self.supports_sessions(),
        }
    }

    pub fn screen(&self) -> ChatScreen {
        match &self.phase {
            RequestPhase::Loading => ChatScreen::Loading,
            RequestPhase::Error(message) => ChatScreen::Error(message.clone()),
            RequestPhase::Ready => ChatScreen::Ready(self.snapshot()),
        }
    }

    /// Applies a user intent and returns the gateway work it requires.
    pub fn handle(&mut self, intent: Intent) -> Vec<Effect> {
        match intent {
            Intent::Start => self.start(),
            Intent::SelectSession(target) => self.select_session(target),
            Intent::SendMessage(text) => self.send_message(text),
            Intent::SetupFailed(message) => {
                warn!(agent = %self.agent_id, error = %message, "Chat setup failed");
                self.phase = RequestPhase::Error(message);
                Vec::new()
            }
        }
    }

    /// Applies a gateway completion.
    pub fn apply(&mut self, outcome: Outcome) {
        let token = outcome.token();
        let Some(pending) = self.pending.remove(&token) else {
            debug!(%token, "Ignoring outcome of a discarded request");
            return;
        };

        match (pending, outcome) {
            (Pending::Sessions, Outcome::SessionsListed { result, .. }) => {
                self.on_sessions_listed(result)
            }
            (Pending::Detail(id), Outcome::SessionDetailLoaded { result, .. }) => {
                self.on_detail_loaded(id, result)
            }
            (
                Pending::Send {
                    target,
                    text,
                    transcript,
                },
                Outcome::MessageSent { result, .. },
            ) => self.on_message_sent(target, &text, transcript, result),
            (pending, outcome) => {
                warn!(%token, ?pending, ?outcome, "Outcome does not match its request")
            }
        }
    }

    // ── Intents ──────────────────────────────────────────────

    fn start(&mut self) -> Vec<Effect> {
        self.phase = RequestPhase::Ready;
        self.store = SessionStore::new();
        self.selected = None;
        self.promoted_drafts.clear();
        self.awaiting_history.clear();
        self.pending.clear();
        self.begin_draft();
        debug!(agent = %self.agent_id, "Chat started");

        if !self.supports_sessions() {
            return Vec::new();
        }
        let token = self.issue(Pending::Sessions);
        vec![Effect::ListSessions {
            token,
            agent_id: self.agent_id.clone(),
        }]
    }

    fn select_session(&mut self, target: Option<ChatSession>) -> Vec<Effect> {
        if self.phase != RequestPhase::Ready {
            debug!("Ignoring session selection before start");
            return Vec::new();
        }

        if let Some(current) = self.selected.take()
            && !self.messages.is_empty()
        {
            if self.detail_in_flight(&current) {
                self.awaiting_history.insert(current.clone());
            }
            self.store.cache_put(current, self.messages.clone());
        }

        let Some(session) = target else {
            self.begin_draft();
            debug!(draft = %self.draft, "Opened a new conversation");
            return Vec::new();
        };

        let id = session.id;
        self.selected = Some(id.clone());

        if self.store.has_cached(&id) {
            self.messages = self.store.cache_get(&id);
            debug!(session = %id, count = %self.messages.len(), "Restored cached transcript");
            return Vec::new();
        }

        self.messages.clear();
        if self.detail_in_flight(&id) {
            debug!(session = %id, "Session history already loading");
            return Vec::new();
        }

        let token = self.issue(Pending::Detail(id.clone()));
        debug!(session = %id, %token, "Loading session history");
        vec![Effect::FetchSessionDetail {
            token,
            agent_id: self.agent_id.clone(),
            session_id: id,
        }]
    }

    fn send_message(&mut self, text: String) -> Vec<Effect> {
        if text.trim().is_empty() {
            debug!("Ignoring blank message");
            return Vec::new();
        }
        if self.phase != RequestPhase::Ready {
            debug!("Ignoring message sent before start");
            return Vec::new();
        }

        let target = match &self.selected {
            Some(id) => Conversation::Session(id.clone()),
            None => Conversation::Draft(self.draft),
        };
        self.messages.push(ChatMessage::user(text.clone()));
        let session_id = self.selected.clone();
        let token = self.issue(Pending::Send {
            target,
            text: text.clone(),
            transcript: self.messages.clone(),
        });
        debug!(%token, session = ?session_id, "Sending message");

        vec![Effect::SendMessage {
            token,
            agent_id: self.agent_id.clone(),
            session_id,
            text,
        }]
    }

    // ── Outcomes ─────────────────────────────────────────────

    fn on_sessions_listed(&mut self, result: Result<Vec<ChatSession>, GatewayError>) {
        match result {
            Ok(sessions) => self.store.merge_server(sessions),
            Err(e) => {
                warn!(agent = %self.agent_id, error = %e, "Failed to load session list")
            }
        }
    }

    fn on_detail_loaded(&mut self, id: SessionId, result: Result<SessionDetail, GatewayError>) {
        let is_active = self.selected.as_ref() == Some(&id);
        let partial = self.awaiting_history.remove(&id);

        let hydrated = match result {
            Ok(detail) => self.hydrate(detail),
            Err(e) => {
                warn!(session = %id, error = %e, "Failed to load session history");
                if !is_active {
                    return;
                }
                vec![self.welcome()]
            }
        };

        if !is_active {
            if partial {
                debug!(session = %id, "Placing late history ahead of the cached transcript");
                let mut messages = hydrated;
                messages.extend(self.store.cache_get(&id));
                self.store.cache_put(id, messages);
            } else if !self.store.has_cached(&id) {
                debug!(session = %id, "Caching history for a session no longer selected");
                self.store.cache_put(id, hydrated);
            }
            return;
        }

        // Keep anything sent while the history was loading.
        let mut messages = hydrated;
        messages.append(&mut self.messages);
        self.messages = messages;
        self.store.cache_put(id, self.messages.clone());
    }

    fn on_message_sent(
        &mut self,
        target: Conversation,
        text: &str,
        transcript: Vec<ChatMessage>,
        result: Result<SendReply, GatewayError>,
    ) {
        let reply = match &result {
            Ok(reply) => ChatMessage::agent(reply.text.clone()),
            Err(e) => {
                warn!(error = %e, "Message send failed");
                ChatMessage::agent(format!(
                    "{}: {}",
                    self.settings.send_failure_prefix,
                    e.user_message()
                ))
            }
        };

        match self.resolve(target) {
            Conversation::Session(id) => self.deliver_to_session(id, reply, transcript),
            Conversation::Draft(draft) => match result {
                Ok(SendReply {
                    session_id: Some(session_id),
                    ..
                }) => self.promote_draft(draft, session_id, text, reply, transcript),
                _ if self.is_active_draft(draft) => self.messages.push(reply),
                _ => warn!(draft = %draft, "Dropping reply for an abandoned conversation"),
            },
        }
    }

    // ── Helpers ──────────────────────────────────────────────

    fn deliver_to_session(
        &mut self,
        id: SessionId,
        message: ChatMessage,
        mut transcript: Vec<ChatMessage>,
    ) {
        if self.selected.as_ref() == Some(&id) {
            self.messages.push(message);
            self.store.cache_put(id, self.messages.clone());
            return;
        }

        debug!(session = %id, "Reply arrived for a session no longer selected");
        if !self.store.cache_append(&id, message.clone()) {
            transcript.push(message);
            self.store.cache_put(id, transcript);
        }
    }

    fn promote_draft(
        &mut self,
        draft: u64,
        session_id: SessionId,
        text: &str,
        reply: ChatMessage,
        mut transcript: Vec<ChatMessage>,
    ) {
        let title = derive_session_title(text, &self.settings.new_session_title);
        self.store
            .promote_local_session(session_id.clone(), title, &self.agent_id);
        self.promoted_drafts.insert(draft, session_id.clone());

        if self.is_active_draft(draft) {
            self.messages.push(reply);
            self.selected = Some(session_id.clone());
            self.store.cache_put(session_id, self.messages.clone());
        } else {
            debug!(session = %session_id, draft = %draft, "Promoted a conversation in the background");
            transcript.push(reply);
            self.store.cache_put(session_id, transcript);
        }
    }

    fn hydrate(&self, detail: SessionDetail) -> Vec<ChatMessage> {
        if detail.turns.is_empty() {
            return vec![self.welcome()];
        }
        let sid = detail.session_id;
        detail
            .turns
            .into_iter()
            .enumerate()
            .flat_map(|(index, turn)| {
                [
                    ChatMessage::with_id(
                        format!("{sid}_{index}_user"),
                        turn.user_message,
                        Origin::User,
                        turn.created_at,
                    ),
                    ChatMessage::with_id(
                        format!("{sid}_{index}_assistant"),
                        turn.assistant_message,
                        Origin::Agent,
                        turn.created_at,
                    ),
                ]
            })
            .collect()
    }

    fn resolve(&self, target: Conversation) -> Conversation {
        match target {
            Conversation::Draft(draft) => match self.promoted_drafts.get(&draft) {
                Some(id) => Conversation::Session(id.clone()),
                None => Conversation::Draft(draft),
            },
            session => session,
        }
    }

    fn begin_draft(&mut self) {
        self.draft += 1;
        self.messages = vec![self.welcome()];
    }

    fn is_active_draft(&self, draft: u64) -> bool {
        self.selected.is_none() && self.draft == draft
    }

    fn detail_in_flight(&self, id: &SessionId) -> bool {
        self.pending
            .values()
            .any(|p| matches!(p, Pending::Detail(pending) if pending == id))
    }

    fn welcome(&self) -> ChatMessage {
        ChatMessage::agent(self.settings.greeting.clone())
    }

    fn issue(&mut self, pending: Pending) -> RequestToken {
        self.next_token += 1;
        let token = RequestToken::from_raw(self.next_token);
        self.pending.insert(token, pending);
        token
    }
}
