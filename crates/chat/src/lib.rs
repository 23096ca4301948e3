//! Chat core: session store, conversation and agents-menu state machines, and
//! the async runtimes that drive them against an [`gateway::AgentsGateway`].

pub mod controller;
pub mod menu;
pub mod runtime;
pub mod state;
pub mod store;

/// Conversation state machine and its request/response vocabulary.
pub use controller::{
    ChatController, ChatSettings, Conversation, Effect, Intent, Outcome, RequestToken,
};
/// Agents menu state machine.
pub use menu::{AgentsMenu, ListAgents, MenuScreen};
/// Async drivers.
pub use runtime::{ChatRuntime, MenuRuntime, RuntimeError};
/// Renderer-facing views.
pub use state::{ChatScreen, ChatSnapshot, RequestPhase};
/// Session list and transcript cache.
pub use store::{SessionStore, derive_session_title, merge_sessions};
