//! Event domain types — the recall tier's unit of history.
//!
//! Everything that happens in a conversation is recorded as an `Event`:
//! the user spoke, the agent spoke, a tool ran, the system injected a
//! note. Events are immutable once created and ordered by their log id.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What kind of event was recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventKind {
    /// An inbound message from the human.
    UserMessage,
    /// Raw model output: prose or the serialized tool call it emitted.
    AgentMessage,
    /// The outcome of a dispatched tool (or the raw text of a tool-free
    /// response).
    FunctionMessage,
    /// A note injected by the runtime itself, e.g. a corrective note
    /// after unparseable model output.
    SystemMessage,
}

/// A single immutable event in the chronological log.
///
/// `id` is assigned by the log and increases monotonically, so ordering
/// by `id` is creation order; equal timestamps cannot reorder events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Monotonic sequence number assigned at append time.
    pub id: u64,

    /// What happened.
    pub kind: EventKind,

    /// The text payload.
    pub content: String,

    /// Optional structured context (tool name, durations, etc.).
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub metadata: serde_json::Map<String, serde_json::Value>,

    /// When the event was appended.
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_serialization_roundtrip() {
        let event = Event {
            id: 7,
            kind: EventKind::FunctionMessage,
            content: "Message mode activated.".into(),
            metadata: serde_json::Map::new(),
            timestamp: Utc::now(),
        };
        let json = serde_json::to_string(&event).unwrap();
        let back: Event = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id, 7);
        assert_eq!(back.kind, EventKind::FunctionMessage);
        assert_eq!(back.content, "Message mode activated.");
    }

    #[test]
    fn empty_metadata_is_skipped() {
        let event = Event {
            id: 1,
            kind: EventKind::UserMessage,
            content: "hi".into(),
            metadata: serde_json::Map::new(),
            timestamp: Utc::now(),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(!json.contains("metadata"));
    }
}
