use crate::client::{AgentClient, AgentReply, ChatRequest, QuickActionRequest};
use crate::conversation::{ConversationStore, Message, NewMessage};
use crate::error::ClientError;
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub const THINKING_TEXT: &str = "Analyzing your request...";
const QUICK_ACTION_SUFFIX: &str = "(Quick Action)";

/// Where the most recent exchange stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExchangeState {
    #[default]
    Idle,
    Sending,
    Resolved,
    Failed,
}

impl ExchangeState {
    pub fn is_in_flight(self) -> bool {
        matches!(self, Self::Sending)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    EmptyInput,
    InFlight,
    Disposed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    /// The guard rejected the call; nothing was appended.
    Ignored(IgnoreReason),
    Resolved(Message),
    Failed(Message),
    /// The reply arrived after the orchestrator was disposed or the
    /// conversation was reset; nothing was appended.
    Discarded,
}

enum AgentCall {
    Chat(ChatRequest),
    QuickAction(QuickActionRequest),
}

/// Drives chat and quick-action exchanges against an [`AgentClient`].
///
/// At most one exchange is in flight; extra calls made while one is pending
/// return [`SendOutcome::Ignored`] instead of queueing.
pub struct ConversationOrchestrator {
    conversation: ConversationStore,
    agent: Arc<dyn AgentClient>,
    user_id: String,
    state: Mutex<ExchangeState>,
    scope: CancellationToken,
}

impl ConversationOrchestrator {
    pub fn new(
        conversation: ConversationStore,
        agent: Arc<dyn AgentClient>,
        user_id: impl Into<String>,
    ) -> Self {
        Self {
            conversation,
            agent,
            user_id: user_id.into(),
            state: Mutex::new(ExchangeState::Idle),
            scope: CancellationToken::new(),
        }
    }

    pub fn conversation(&self) -> &ConversationStore {
        &self.conversation
    }

    pub fn state(&self) -> ExchangeState {
        *self.state.lock()
    }

    pub fn is_loading(&self) -> bool {
        self.state().is_in_flight()
    }

    pub fn is_disposed(&self) -> bool {
        self.scope.is_cancelled()
    }

    /// Stop accepting exchanges and drop any reply still in flight.
    pub fn dispose(&self) {
        self.scope.cancel();
    }

    pub async fn send_message(&self, content: &str) -> SendOutcome {
        if content.trim().is_empty() {
            return SendOutcome::Ignored(IgnoreReason::EmptyInput);
        }
        let request = ChatRequest {
            content: content.to_string(),
            user_id: self.user_id.clone(),
        };
        self.exchange(content.to_string(), AgentCall::Chat(request))
            .await
    }

    pub async fn send_quick_action(
        &self,
        action: &str,
        context: impl Into<Value>,
    ) -> SendOutcome {
        if action.trim().is_empty() {
            return SendOutcome::Ignored(IgnoreReason::EmptyInput);
        }
        let display = quick_action_label(action);
        let request = QuickActionRequest {
            action: action.to_string(),
            user_id: self.user_id.clone(),
            context: context.into(),
        };
        self.exchange(display, AgentCall::QuickAction(request))
            .await
    }

    async fn exchange(&self, display: String, call: AgentCall) -> SendOutcome {
        if let Err(reason) = self.begin() {
            tracing::debug!(?reason, "exchange ignored");
            return SendOutcome::Ignored(reason);
        }
        let guard = ExchangeGuard {
            orchestrator: self,
            settled: false,
        };

        let generation = self.conversation.generation();
        if self
            .conversation
            .add_message_in(generation, NewMessage::user(display))
            .is_none()
        {
            tracing::debug!("conversation reset before the exchange started");
        }
        if let Err(err) = self.conversation.add_thinking_placeholder(THINKING_TEXT) {
            // Only a caller bypassing the orchestrator can leave one behind.
            tracing::warn!(%err, "replacing stale thinking placeholder");
            if let Some(stale) = self.conversation.replace_thinking_placeholder(THINKING_TEXT) {
                tracing::debug!(id = %stale.id, content = %stale.content, "stale placeholder dropped");
            }
        }

        let result = tokio::select! {
            biased;
            _ = self.scope.cancelled() => None,
            result = self.dispatch(&call) => Some(result),
        };
        let Some(result) = result.filter(|_| !self.scope.is_cancelled()) else {
            tracing::debug!("discarding reply for disposed conversation");
            return SendOutcome::Discarded;
        };

        self.conversation.remove_thinking_placeholder();
        let (reply, resolved) = match result {
            Ok(reply) => (NewMessage::agent(reply.response), true),
            Err(err) => {
                tracing::warn!(%err, "agent exchange failed");
                let text = format!("Sorry, I encountered an error: {}", err.detail());
                (NewMessage::agent_error(text), false)
            }
        };
        let Some(message) = self.conversation.add_message_in(generation, reply) else {
            tracing::debug!("discarding reply for a conversation that was reset");
            return SendOutcome::Discarded;
        };
        if resolved {
            guard.settle(ExchangeState::Resolved);
            SendOutcome::Resolved(message)
        } else {
            guard.settle(ExchangeState::Failed);
            SendOutcome::Failed(message)
        }
    }

    fn begin(&self) -> Result<(), IgnoreReason> {
        if self.scope.is_cancelled() {
            return Err(IgnoreReason::Disposed);
        }
        let mut state = self.state.lock();
        if state.is_in_flight() {
            return Err(IgnoreReason::InFlight);
        }
        *state = ExchangeState::Sending;
        Ok(())
    }

    fn finish(&self, next: ExchangeState) {
        *self.state.lock() = next;
    }

    async fn dispatch(&self, call: &AgentCall) -> Result<AgentReply, ClientError> {
        match call {
            AgentCall::Chat(request) => self.agent.chat(request).await,
            AgentCall::QuickAction(request) => self.agent.quick_action(request).await,
        }
    }
}

/// Rolls an unfinished exchange back to `Idle`.
///
/// Runs on early returns and when the caller drops the send future mid-flight,
/// so a timed-out or aborted send never leaves the in-flight guard engaged.
struct ExchangeGuard<'a> {
    orchestrator: &'a ConversationOrchestrator,
    settled: bool,
}

impl ExchangeGuard<'_> {
    fn settle(mut self, next: ExchangeState) {
        self.orchestrator.finish(next);
        self.settled = true;
    }
}

impl Drop for ExchangeGuard<'_> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        // A disposed surface is left exactly as it was.
        if !self.orchestrator.is_disposed() {
            self.orchestrator.conversation.remove_thinking_placeholder();
        }
        self.orchestrator.finish(ExchangeState::Idle);
    }
}

impl Drop for ConversationOrchestrator {
    fn drop(&mut self) {
        self.scope.cancel();
    }
}

/// `generate_titles` becomes `generate titles (Quick Action)`.
pub fn quick_action_label(action: &str) -> String {
    format!("{} {QUICK_ACTION_SUFFIX}", action.replace('_', " "))
}
