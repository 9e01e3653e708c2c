use crate::error::ConversationError;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Agent,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    pub id: Uuid,
    pub role: MessageRole,
    pub content: String,
    #[serde(default)]
    pub is_error: bool,
    pub created_at: DateTime<Utc>,
}

impl Message {
    fn stamp(partial: NewMessage) -> Self {
        Self {
            id: Uuid::new_v4(),
            role: partial.role,
            content: partial.content,
            is_error: partial.is_error,
            created_at: Utc::now(),
        }
    }
}

/// The caller-supplied part of a [`Message`]; the store fills in the rest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMessage {
    pub role: MessageRole,
    pub content: String,
    pub is_error: bool,
}

impl NewMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
            is_error: false,
        }
    }

    pub fn agent(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Agent,
            content: content.into(),
            is_error: false,
        }
    }

    pub fn agent_error(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Agent,
            content: content.into(),
            is_error: true,
        }
    }
}

/// "Agent is composing a reply" marker. Never part of the message log.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ThinkingPlaceholder {
    pub id: Uuid,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// One row as a reader renders it: the log followed by the placeholder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entry {
    Message(Message),
    Thinking(ThinkingPlaceholder),
}

#[derive(Debug, Default)]
struct ConversationLog {
    messages: Vec<Message>,
    thinking: Option<ThinkingPlaceholder>,
    generation: u64,
}

/// Ordered, append-only message log plus at most one thinking placeholder.
#[derive(Clone, Default)]
pub struct ConversationStore {
    inner: Arc<RwLock<ConversationLog>>,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_message(&self, partial: NewMessage) -> Message {
        let message = Message::stamp(partial);
        self.inner.write().messages.push(message.clone());
        message
    }

    /// Appends only if the log has not been cleared since `generation` was
    /// read. Returns `None` when the message belongs to a reset conversation.
    pub fn add_message_in(&self, generation: u64, partial: NewMessage) -> Option<Message> {
        let mut inner = self.inner.write();
        if inner.generation != generation {
            return None;
        }
        let message = Message::stamp(partial);
        inner.messages.push(message.clone());
        Some(message)
    }

    /// Bumped by every [`ConversationStore::clear`].
    pub fn generation(&self) -> u64 {
        self.inner.read().generation
    }

    pub fn add_thinking_placeholder(
        &self,
        content: impl Into<String>,
    ) -> Result<ThinkingPlaceholder, ConversationError> {
        let mut inner = self.inner.write();
        if inner.thinking.is_some() {
            return Err(ConversationError::PlaceholderExists);
        }
        let placeholder = ThinkingPlaceholder {
            id: Uuid::new_v4(),
            content: content.into(),
            created_at: Utc::now(),
        };
        inner.thinking = Some(placeholder.clone());
        Ok(placeholder)
    }

    /// Installs a fresh placeholder whether or not one is showing and hands
    /// back the one it displaced.
    pub fn replace_thinking_placeholder(
        &self,
        content: impl Into<String>,
    ) -> Option<ThinkingPlaceholder> {
        let placeholder = ThinkingPlaceholder {
            id: Uuid::new_v4(),
            content: content.into(),
            created_at: Utc::now(),
        };
        self.inner.write().thinking.replace(placeholder)
    }

    pub fn remove_thinking_placeholder(&self) -> Option<ThinkingPlaceholder> {
        self.inner.write().thinking.take()
    }

    pub fn messages(&self) -> Vec<Message> {
        self.inner.read().messages.clone()
    }

    pub fn len(&self) -> usize {
        self.inner.read().messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().messages.is_empty()
    }

    pub fn thinking(&self) -> Option<ThinkingPlaceholder> {
        self.inner.read().thinking.clone()
    }

    pub fn entries(&self) -> Vec<Entry> {
        let inner = self.inner.read();
        let mut entries: Vec<Entry> = inner.messages.iter().cloned().map(Entry::Message).collect();
        if let Some(thinking) = &inner.thinking {
            entries.push(Entry::Thinking(thinking.clone()));
        }
        entries
    }

    /// Session reset: drops every message and any placeholder, and starts a
    /// new generation so replies to earlier exchanges are not appended.
    pub fn clear(&self) {
        let mut inner = self.inner.write();
        inner.messages.clear();
        inner.thinking = None;
        inner.generation = inner.generation.wrapping_add(1);
    }
}
