//! Chat message types — the in-context window sent to the provider.
//!
//! The message window is always derived from the event log: each event
//! maps to one chat message, with the role implied by the event kind.

use serde::{Deserialize, Serialize};

use crate::event::{Event, EventKind};

/// The role of a message in the provider window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
    System,
    /// A tool result fed back to the model.
    Tool,
}

/// A single message in the provider window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: ChatRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

impl From<&Event> for ChatMessage {
    fn from(event: &Event) -> Self {
        let role = match event.kind {
            EventKind::UserMessage => ChatRole::User,
            EventKind::AgentMessage => ChatRole::Assistant,
            EventKind::FunctionMessage => ChatRole::Tool,
            EventKind::SystemMessage => ChatRole::System,
        };
        Self::new(role, event.content.clone())
    }
}
