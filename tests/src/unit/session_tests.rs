use async_trait::async_trait;
use futures::future::join_all;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use vidpilot_core::client::{
    AgentClient, AgentReply, Backend, ChatRequest, MockBackend, QuickActionRequest, StatusPayload,
};
use vidpilot_core::conversation::{Entry, MessageRole};
use vidpilot_core::error::ClientError;
use vidpilot_core::orchestrator::{ExchangeState, IgnoreReason, SendOutcome};
use vidpilot_core::session::DashboardSession;

/// Agent that answers after a fixed delay and counts calls.
struct SlowAgent {
    delay: Duration,
    calls: AtomicUsize,
}

#[async_trait]
impl AgentClient for SlowAgent {
    async fn chat(&self, request: &ChatRequest) -> Result<AgentReply, ClientError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        Ok(AgentReply {
            response: format!("reply to {}", request.content),
        })
    }

    async fn quick_action(
        &self,
        request: &QuickActionRequest,
    ) -> Result<AgentReply, ClientError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        Ok(AgentReply {
            response: format!("ran {}", request.action),
        })
    }
}

fn session_with(agent: Arc<SlowAgent>) -> DashboardSession {
    let status = Arc::new(MockBackend::default().with_latency(Duration::ZERO));
    DashboardSession::with_interval(
        Backend::new(status, agent),
        "default_user",
        Duration::from_secs(30),
    )
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_sends_admit_exactly_one_exchange() {
    let agent = Arc::new(SlowAgent {
        delay: Duration::from_millis(100),
        calls: AtomicUsize::new(0),
    });
    let session = session_with(agent.clone());
    let orchestrator = session.orchestrator();

    let sends = (0..8).map(|i| {
        let orchestrator = orchestrator.clone();
        tokio::spawn(async move { orchestrator.send_message(&format!("question {i}")).await })
    });
    let outcomes: Vec<SendOutcome> = join_all(sends)
        .await
        .into_iter()
        .map(|joined| joined.expect("join"))
        .collect();

    let resolved = outcomes
        .iter()
        .filter(|o| matches!(o, SendOutcome::Resolved(_)))
        .count();
    let dropped = outcomes
        .iter()
        .filter(|o| matches!(o, SendOutcome::Ignored(IgnoreReason::InFlight)))
        .count();
    assert_eq!(resolved, 1);
    assert_eq!(dropped, 7);
    assert_eq!(agent.calls.load(Ordering::SeqCst), 1);

    let messages = session.conversation().messages();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].role, MessageRole::User);
    assert_eq!(messages[1].role, MessageRole::Agent);
    assert!(!messages[1].is_error);
    session.dispose().await;
}

#[tokio::test]
async fn ctr_question_walks_through_placeholder() {
    let agent = Arc::new(SlowAgent {
        delay: Duration::from_millis(50),
        calls: AtomicUsize::new(0),
    });
    let session = session_with(agent);
    let orchestrator = session.orchestrator();

    let pending = tokio::spawn({
        let orchestrator = orchestrator.clone();
        async move { orchestrator.send_message("What's my CTR?").await }
    });
    tokio::time::sleep(Duration::from_millis(10)).await;

    let entries = session.conversation().entries();
    assert_eq!(entries.len(), 2);
    assert!(matches!(&entries[0], Entry::Message(m) if m.content == "What's my CTR?"));
    assert!(matches!(&entries[1], Entry::Thinking(_)));
    assert_eq!(orchestrator.state(), ExchangeState::Sending);

    pending.await.expect("join");
    let entries = session.conversation().entries();
    assert_eq!(entries.len(), 2);
    assert!(
        matches!(&entries[1], Entry::Message(m) if m.role == MessageRole::Agent && m.content == "reply to What's my CTR?")
    );
    session.dispose().await;
}

#[tokio::test]
async fn quick_action_message_is_humanized() {
    let agent = Arc::new(SlowAgent {
        delay: Duration::ZERO,
        calls: AtomicUsize::new(0),
    });
    let session = session_with(agent);
    let outcome = session
        .orchestrator()
        .send_quick_action("generate_titles", "gaming")
        .await;
    assert!(matches!(outcome, SendOutcome::Resolved(ref m) if m.content == "ran generate_titles"));
    let first = session.conversation().messages().remove(0);
    assert_eq!(first.content, "generate titles (Quick Action)");
    session.dispose().await;
}

#[tokio::test]
async fn dispose_mid_exchange_leaves_conversation_untouched() {
    let agent = Arc::new(SlowAgent {
        delay: Duration::from_millis(200),
        calls: AtomicUsize::new(0),
    });
    let session = session_with(agent);
    let orchestrator = session.orchestrator();
    let pending = tokio::spawn({
        let orchestrator = orchestrator.clone();
        async move { orchestrator.send_message("slow").await }
    });
    tokio::time::sleep(Duration::from_millis(20)).await;

    let conversation = session.conversation().clone();
    session.dispose().await;
    assert_eq!(pending.await.expect("join"), SendOutcome::Discarded);
    assert_eq!(conversation.len(), 1);
    assert!(orchestrator.is_disposed());
}

#[tokio::test]
async fn reset_during_exchange_keeps_conversation_empty() {
    let mock = Arc::new(MockBackend::default().with_latency(Duration::from_millis(50)));
    let session = DashboardSession::with_interval(
        Backend::new(mock.clone(), mock),
        "default_user",
        Duration::from_secs(30),
    );
    let pending = tokio::spawn({
        let orchestrator = session.orchestrator();
        async move { orchestrator.send_message("hello").await }
    });
    tokio::time::sleep(Duration::from_millis(10)).await;

    session.reset_conversation();
    assert_eq!(pending.await.expect("join"), SendOutcome::Discarded);
    assert!(session.conversation().is_empty());
    assert!(session.conversation().thinking().is_none());
    assert!(!session.orchestrator().is_loading());

    let outcome = session.orchestrator().send_message("hello again").await;
    assert!(matches!(outcome, SendOutcome::Resolved(_)));
    assert_eq!(session.conversation().messages()[0].content, "hello again");
    session.dispose().await;
}

#[tokio::test]
async fn status_failure_then_recovery_through_poller() {
    let mock = Arc::new(MockBackend::new(StatusPayload {
        is_authenticated: true,
        expires_in_seconds: Some(3600),
        needs_refresh: false,
        scopes: None,
    })
    .with_latency(Duration::ZERO));
    let agent = Arc::new(SlowAgent {
        delay: Duration::ZERO,
        calls: AtomicUsize::new(0),
    });
    let session = DashboardSession::with_interval(
        Backend::new(mock.clone(), agent),
        "default_user",
        Duration::from_millis(50),
    );
    let mut updates = session.subscribe_status();
    updates
        .wait_for(|view| view.is_authenticated())
        .await
        .expect("first poll");

    // Each tick makes two fetches, so three queued failures reach the store
    // check even if a tick is already in flight.
    for _ in 0..3 {
        mock.push_status_failure("gateway timeout");
    }
    let view = updates
        .wait_for(|view| view.connection_error)
        .await
        .expect("error tick")
        .clone();
    assert!(view.is_authenticated());
    assert_eq!(view.last_error.as_deref(), Some("gateway timeout"));

    updates
        .wait_for(|view| !view.connection_error)
        .await
        .expect("recovery tick");
    session.dispose().await;
}
