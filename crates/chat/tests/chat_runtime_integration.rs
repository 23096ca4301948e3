use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chat::{
    ChatController, ChatRuntime, ChatScreen, ChatSettings, ChatSnapshot, Intent, MenuRuntime,
    MenuScreen,
};
use chrono::{DateTime, Utc};
use gateway::AgentsGateway;
use proto::{
    Agent, AgentId, ChatSession, GatewayError, SendReply, SessionDetail, SessionId, SessionTurn,
};
use tokio::sync::{Notify, watch};
use tokio::time::timeout;

const WAIT: Duration = Duration::from_secs(2);

fn at(millis: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(millis).expect("valid ts")
}

/// Scripted gateway: each call pops the next queued result.
#[derive(Default)]
struct MockGateway {
    agents: Mutex<VecDeque<Result<Vec<Agent>, GatewayError>>>,
    sessions: Mutex<VecDeque<Result<Vec<ChatSession>, GatewayError>>>,
    sends: Mutex<VecDeque<Result<SendReply, GatewayError>>>,
    sent: Mutex<Vec<(Option<SessionId>, String)>>,
    detail_calls: AtomicUsize,
    /// When set, sends wait for a permit before answering.
    send_gate: Option<Arc<Notify>>,
    panic_on_send: bool,
    cancelled: Arc<AtomicBool>,
}

impl MockGateway {
    fn with_sends(replies: Vec<Result<SendReply, GatewayError>>) -> Self {
        Self {
            sends: Mutex::new(VecDeque::from(replies)),
            ..Self::default()
        }
    }

    fn sent(&self) -> Vec<(Option<SessionId>, String)> {
        self.sent.lock().expect("lock sent").clone()
    }
}

struct CancelGuard {
    flag: Arc<AtomicBool>,
    armed: bool,
}

impl Drop for CancelGuard {
    fn drop(&mut self) {
        if self.armed {
            self.flag.store(true, Ordering::SeqCst);
        }
    }
}

#[async_trait]
impl AgentsGateway for MockGateway {
    async fn list_agents(&self) -> Result<Vec<Agent>, GatewayError> {
        self.agents
            .lock()
            .expect("lock agents")
            .pop_front()
            .unwrap_or_else(|| Err(GatewayError::Unknown("No mock agents left".into())))
    }

    async fn list_sessions(&self, _agent_id: &AgentId) -> Result<Vec<ChatSession>, GatewayError> {
        self.sessions
            .lock()
            .expect("lock sessions")
            .pop_front()
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn get_session_detail(
        &self,
        _agent_id: &AgentId,
        session_id: &SessionId,
    ) -> Result<SessionDetail, GatewayError> {
        self.detail_calls.fetch_add(1, Ordering::SeqCst);
        Ok(SessionDetail {
            session_id: session_id.clone(),
            session_name: None,
            created_at: at(1),
            turns: vec![SessionTurn {
                user_message: "Oi".into(),
                assistant_message: "Olá!".into(),
                created_at: at(2),
            }],
        })
    }

    async fn send_message(
        &self,
        _agent_id: &AgentId,
        session_id: Option<&SessionId>,
        text: &str,
    ) -> Result<SendReply, GatewayError> {
        self.sent
            .lock()
            .expect("lock sent")
            .push((session_id.cloned(), text.to_string()));
        if self.panic_on_send {
            panic!("mock gateway exploded");
        }
        if let Some(gate) = &self.send_gate {
            let mut guard = CancelGuard {
                flag: Arc::clone(&self.cancelled),
                armed: true,
            };
            gate.notified().await;
            guard.armed = false;
        }
        self.sends
            .lock()
            .expect("lock sends")
            .pop_front()
            .unwrap_or_else(|| Err(GatewayError::Unknown("No mock reply left".into())))
    }
}

fn spawn(agent: &str, gateway: Arc<MockGateway>) -> ChatRuntime {
    let controller = ChatController::new(agent, "Agent", ChatSettings::default());
    ChatRuntime::spawn(controller, gateway)
}

async fn wait_for(
    screens: &mut watch::Receiver<ChatScreen>,
    condition: impl Fn(&ChatSnapshot) -> bool,
) -> ChatSnapshot {
    timeout(WAIT, async {
        loop {
            let current = screens.borrow_and_update().clone();
            if let Some(snapshot) = current.snapshot()
                && condition(snapshot)
            {
                return snapshot.clone();
            }
            screens.changed().await.expect("runtime alive");
        }
    })
    .await
    .expect("condition reached in time")
}

fn contents(snapshot: &ChatSnapshot) -> Vec<&str> {
    snapshot.messages.iter().map(|m| m.content.as_str()).collect()
}

#[tokio::test]
async fn runtime_is_loading_until_started() {
    let runtime = spawn("pixel", Arc::new(MockGateway::default()));
    assert_eq!(runtime.screen(), ChatScreen::Loading);
}

#[tokio::test]
async fn start_merges_server_sessions() {
    let gateway = Arc::new(MockGateway {
        sessions: Mutex::new(VecDeque::from(vec![Ok(vec![
            ChatSession::server("s1", "pixel", "Logo ideas", at(1)),
            ChatSession::server("s2", "pixel", "Trip", at(2)),
        ])])),
        ..MockGateway::default()
    });
    let runtime = spawn("pixel", gateway);
    let mut screens = runtime.subscribe();

    runtime.dispatch(Intent::Start).expect("dispatch");
    let snapshot = wait_for(&mut screens, |s| s.sessions.len() == 2).await;
    assert_eq!(snapshot.sessions[0].title, "Logo ideas");
    assert_eq!(snapshot.messages.len(), 1);
}

#[tokio::test]
async fn session_list_failure_keeps_screen_ready() {
    let gateway = Arc::new(MockGateway {
        sessions: Mutex::new(VecDeque::from(vec![Err(GatewayError::Timeout)])),
        ..MockGateway::default()
    });
    let runtime = spawn("pixel", gateway);
    let mut screens = runtime.subscribe();

    runtime.dispatch(Intent::Start).expect("dispatch");
    runtime
        .dispatch(Intent::SendMessage("ping".into()))
        .expect("dispatch");
    let snapshot = wait_for(&mut screens, |s| !s.is_sending_message && s.messages.len() == 3).await;
    assert!(snapshot.sessions.is_empty());
}

#[tokio::test]
async fn new_conversation_is_promoted_after_first_reply() {
    let gateway = Arc::new(MockGateway::with_sends(vec![Ok(SendReply::new(
        "axel",
        Some("s9".into()),
        "Where to?",
    ))]));
    let runtime = spawn("axel", Arc::clone(&gateway));
    let mut screens = runtime.subscribe();

    runtime.dispatch(Intent::Start).expect("dispatch");
    runtime
        .dispatch(Intent::SendMessage("Plan my trip".into()))
        .expect("dispatch");

    let snapshot = wait_for(&mut screens, |s| s.selected_session.is_some()).await;
    assert_eq!(snapshot.selected_session, Some(SessionId::from("s9")));
    assert_eq!(snapshot.sessions[0].title, "Plan my trip");
    assert_eq!(contents(&snapshot)[1..], ["Plan my trip", "Where to?"]);
    assert_eq!(gateway.sent(), vec![(None, "Plan my trip".to_string())]);
}

#[tokio::test]
async fn blank_message_never_reaches_gateway() {
    let gateway = Arc::new(MockGateway::default());
    let runtime = spawn("axel", Arc::clone(&gateway));
    let mut screens = runtime.subscribe();

    runtime.dispatch(Intent::Start).expect("dispatch");
    runtime
        .dispatch(Intent::SendMessage("   ".into()))
        .expect("dispatch");
    let snapshot = wait_for(&mut screens, |_| true).await;
    tokio::time::sleep(Duration::from_millis(20)).await;

    assert!(gateway.sent().is_empty());
    assert_eq!(snapshot.messages.len(), 1);
    assert_eq!(runtime.screen().snapshot(), Some(&snapshot));
}

#[tokio::test]
async fn reselecting_a_session_reuses_cached_history() {
    let gateway = Arc::new(MockGateway::default());
    let runtime = spawn("pixel", Arc::clone(&gateway));
    let mut screens = runtime.subscribe();
    let session = ChatSession::server("s1", "pixel", "Logo ideas", at(1));

    runtime.dispatch(Intent::Start).expect("dispatch");
    runtime
        .dispatch(Intent::SelectSession(Some(session.clone())))
        .expect("dispatch");
    let loaded = wait_for(&mut screens, |s| {
        !s.is_loading_session_detail && s.messages.len() == 2
    })
    .await;
    assert_eq!(loaded.messages[0].id, "s1_0_user");

    runtime
        .dispatch(Intent::SelectSession(None))
        .expect("dispatch");
    runtime
        .dispatch(Intent::SelectSession(Some(session)))
        .expect("dispatch");
    let restored = wait_for(&mut screens, |s| {
        s.selected_session.is_some() && s.messages.len() == 2
    })
    .await;

    assert_eq!(restored.messages, loaded.messages);
    assert_eq!(gateway.detail_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn sending_flag_is_set_while_request_is_outstanding() {
    let gate = Arc::new(Notify::new());
    let gateway = Arc::new(MockGateway {
        sends: Mutex::new(VecDeque::from(vec![Ok(SendReply::new("axel", None, "pong"))])),
        send_gate: Some(Arc::clone(&gate)),
        ..MockGateway::default()
    });
    let runtime = spawn("axel", gateway);
    let mut screens = runtime.subscribe();

    runtime.dispatch(Intent::Start).expect("dispatch");
    runtime
        .dispatch(Intent::SendMessage("ping".into()))
        .expect("dispatch");
    wait_for(&mut screens, |s| s.is_sending_message).await;

    gate.notify_one();
    let done = wait_for(&mut screens, |s| !s.is_sending_message).await;
    assert_eq!(contents(&done).last(), Some(&"pong"));
}

#[tokio::test]
async fn failed_send_shows_inline_notice() {
    let gateway = Arc::new(MockGateway::with_sends(vec![Err(GatewayError::Connectivity(
        "dns".into(),
    ))]));
    let runtime = spawn("axel", gateway);
    let mut screens = runtime.subscribe();

    runtime.dispatch(Intent::Start).expect("dispatch");
    runtime
        .dispatch(Intent::SendMessage("Olá".into()))
        .expect("dispatch");
    let snapshot = wait_for(&mut screens, |s| s.messages.len() == 3).await;

    assert_eq!(
        contents(&snapshot)[1..],
        ["Olá", "Failed to send message: No internet connection"]
    );
    assert!(snapshot.selected_session.is_none());
    assert!(!snapshot.is_sending_message);
}

#[tokio::test]
async fn panicking_request_still_resets_sending_flag() {
    let gateway = Arc::new(MockGateway {
        panic_on_send: true,
        ..MockGateway::default()
    });
    let runtime = spawn("axel", gateway);
    let mut screens = runtime.subscribe();

    runtime.dispatch(Intent::Start).expect("dispatch");
    runtime
        .dispatch(Intent::SendMessage("hi".into()))
        .expect("dispatch");
    let snapshot = wait_for(&mut screens, |s| s.messages.len() == 3).await;

    assert!(!snapshot.is_sending_message);
    assert_eq!(
        contents(&snapshot).last(),
        Some(&"Failed to send message: Request was interrupted")
    );
}

#[tokio::test]
async fn dropping_runtime_cancels_outstanding_requests() {
    let gate = Arc::new(Notify::new());
    let gateway = Arc::new(MockGateway {
        send_gate: Some(Arc::clone(&gate)),
        ..MockGateway::default()
    });
    let runtime = spawn("axel", Arc::clone(&gateway));
    let mut screens = runtime.subscribe();

    runtime.dispatch(Intent::Start).expect("dispatch");
    runtime
        .dispatch(Intent::SendMessage("hi".into()))
        .expect("dispatch");
    wait_for(&mut screens, |s| s.is_sending_message).await;
    timeout(WAIT, async {
        while gateway.sent().is_empty() {
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("send issued");

    drop(runtime);
    timeout(WAIT, async {
        while !gateway.cancelled.load(Ordering::SeqCst) {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("request cancelled");
}

#[tokio::test]
async fn setup_failure_publishes_error_screen() {
    let runtime = spawn("pixel", Arc::new(MockGateway::default()));
    let mut screens = runtime.subscribe();

    runtime
        .dispatch(Intent::SetupFailed("No internet connection".into()))
        .expect("dispatch");
    timeout(WAIT, screens.wait_for(|s| matches!(s, ChatScreen::Error(_))))
        .await
        .expect("in time")
        .expect("runtime alive");
    assert_eq!(
        runtime.screen(),
        ChatScreen::Error("No internet connection".into())
    );
}

#[tokio::test]
async fn menu_runtime_recovers_on_retry() {
    let gateway = Arc::new(MockGateway {
        agents: Mutex::new(VecDeque::from(vec![
            Err(GatewayError::Timeout),
            Ok(vec![
                Agent::new("pixel", "Pixel", "Design helper"),
                Agent::new("axel", "Axel", "Finance"),
            ]),
        ])),
        ..MockGateway::default()
    });
    let menu = MenuRuntime::spawn(gateway);
    let mut screens = menu.subscribe();

    timeout(WAIT, screens.wait_for(|s| matches!(s, MenuScreen::Error(_))))
        .await
        .expect("in time")
        .expect("runtime alive");
    assert_eq!(menu.screen(), MenuScreen::Error("Connection timed out".into()));

    menu.retry().expect("retry");
    timeout(WAIT, screens.wait_for(|s| matches!(s, MenuScreen::Ready(_))))
        .await
        .expect("in time")
        .expect("runtime alive");
    match menu.screen() {
        MenuScreen::Ready(agents) => assert_eq!(agents.len(), 2),
        other => panic!("unexpected menu screen: {other:?}"),
    }
}
