use crate::auth::{AuthStatusStore, StatusView};
use crate::client::Backend;
use crate::config::ClientSettings;
use crate::conversation::ConversationStore;
use crate::orchestrator::ConversationOrchestrator;
use crate::poller::StatusPoller;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// Everything one mounted dashboard surface owns.
///
/// `init` wires the stores to a backend and starts polling; `dispose` stops the
/// poller and cancels any exchange still waiting on the agent. Each session is
/// independent, so tests can build as many as they like.
pub struct DashboardSession {
    status: AuthStatusStore,
    poller: StatusPoller,
    orchestrator: Arc<ConversationOrchestrator>,
}

impl DashboardSession {
    pub fn init(settings: &ClientSettings, backend: Backend) -> Self {
        Self::with_interval(backend, &settings.user_id, settings.poll_interval)
    }

    pub fn with_interval(backend: Backend, user_id: &str, poll_interval: Duration) -> Self {
        let status = AuthStatusStore::new(backend.status, user_id);
        let mut poller = StatusPoller::new(status.clone());
        poller.start(poll_interval);
        let orchestrator = Arc::new(ConversationOrchestrator::new(
            ConversationStore::new(),
            backend.agent,
            user_id,
        ));
        tracing::info!(user_id, interval_ms = poll_interval.as_millis() as u64, "session initialized");
        Self {
            status,
            poller,
            orchestrator,
        }
    }

    pub fn status(&self) -> &AuthStatusStore {
        &self.status
    }

    pub fn status_view(&self) -> StatusView {
        self.status.view()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<StatusView> {
        self.status.subscribe()
    }

    pub fn conversation(&self) -> &ConversationStore {
        self.orchestrator.conversation()
    }

    /// Shared handle for callers that drive exchanges from spawned tasks.
    pub fn orchestrator(&self) -> Arc<ConversationOrchestrator> {
        self.orchestrator.clone()
    }

    /// Reset collaborator: clears the visible conversation. A reply still in
    /// flight is dropped rather than appended to the fresh log.
    pub fn reset_conversation(&self) {
        self.orchestrator.conversation().clear();
    }

    pub async fn dispose(mut self) {
        self.orchestrator.dispose();
        self.poller.stop().await;
        tracing::info!(user_id = %self.status.user_id(), "session disposed");
    }
}
