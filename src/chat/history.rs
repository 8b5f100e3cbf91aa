//! Conversation history store
//!
//! An ordered, append-only sequence of role-tagged messages. The static zone
//! renders it; the chat session appends user and assistant turns as they
//! complete.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

impl Role {
    pub fn label(&self) -> &'static str {
        match self {
            Role::User => "you",
            Role::Assistant => "assistant",
            Role::System => "system",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }
}

type AppendListener = Arc<dyn Fn(u64) + Send + Sync>;

/// Append-only message store
pub trait HistoryStore: Send + Sync {
    /// Snapshot of all messages, oldest first
    fn messages(&self) -> Vec<ChatMessage>;

    fn append(&self, message: ChatMessage);

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bumped on every append; cheap staleness check for renderers
    fn revision(&self) -> u64;

    /// Called with the new revision after every append
    fn on_append(&self, listener: Box<dyn Fn(u64) + Send + Sync>);
}

/// History kept in process memory for the lifetime of the session
#[derive(Default)]
pub struct InMemoryHistory {
    messages: RwLock<Vec<ChatMessage>>,
    revision: AtomicU64,
    listeners: RwLock<Vec<AppendListener>>,
}

impl InMemoryHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_messages(messages: Vec<ChatMessage>) -> Self {
        let revision = messages.len() as u64;
        Self {
            messages: RwLock::new(messages),
            revision: AtomicU64::new(revision),
            listeners: RwLock::new(Vec::new()),
        }
    }
}

impl HistoryStore for InMemoryHistory {
    fn messages(&self) -> Vec<ChatMessage> {
        self.messages.read().clone()
    }

    fn append(&self, message: ChatMessage) {
        tracing::debug!(
            "History append: {} ({} chars)",
            message.role.label(),
            message.content.len()
        );
        self.messages.write().push(message);
        let revision = self.revision.fetch_add(1, Ordering::AcqRel) + 1;

        let listeners = self.listeners.read().clone();
        for listener in listeners {
            listener(revision);
        }
    }

    fn len(&self) -> usize {
        self.messages.read().len()
    }

    fn revision(&self) -> u64 {
        self.revision.load(Ordering::Acquire)
    }

    fn on_append(&self, listener: Box<dyn Fn(u64) + Send + Sync>) {
        self.listeners.write().push(Arc::from(listener));
    }
}
