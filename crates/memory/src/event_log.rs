//! EventLog — the recall tier.
//!
//! An append-only chronological store of everything that happened:
//! user messages, raw model output, tool results, runtime notes. The
//! log is the source of truth for the provider window, and its full
//! history stays queryable even when it no longer fits in context.
//!
//! There is no retention policy: the log only grows. Persistence is one
//! JSON document holding the full ordered sequence.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use stratamind_core::error::MemoryError;
use stratamind_core::event::{Event, EventKind};
use stratamind_core::message::ChatMessage;
use tokio::sync::RwLock;
use tracing::debug;

struct LogInner {
    events: Vec<Event>,
    next_id: u64,
}

/// The append-only event log.
///
/// Appends are immediately visible to the next `all()`/`count()` call;
/// there is no buffering.
pub struct EventLog {
    inner: RwLock<LogInner>,
}

#[derive(Serialize, Deserialize)]
struct SavedLog {
    events: Vec<Event>,
}

impl EventLog {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(LogInner {
                events: Vec::new(),
                next_id: 0,
            }),
        }
    }

    /// Append an event. Always succeeds; ids increase monotonically.
    pub async fn append(
        &self,
        kind: EventKind,
        content: impl Into<String>,
        metadata: serde_json::Map<String, serde_json::Value>,
    ) -> Event {
        let mut inner = self.inner.write().await;
        let event = Event {
            id: inner.next_id,
            kind,
            content: content.into(),
            metadata,
            timestamp: Utc::now(),
        };
        inner.next_id += 1;
        inner.events.push(event.clone());
        event
    }

    /// The full ordered history.
    pub async fn all(&self) -> Vec<Event> {
        self.inner.read().await.events.clone()
    }

    pub async fn count(&self) -> usize {
        self.inner.read().await.events.len()
    }

    /// The provider window: every event mapped to a chat message, in
    /// log order.
    pub async fn window(&self) -> Vec<ChatMessage> {
        self.inner
            .read()
            .await
            .events
            .iter()
            .map(ChatMessage::from)
            .collect()
    }

    /// Case-insensitive substring search over event content, oldest
    /// match first.
    pub async fn search(&self, query: &str, limit: usize) -> Vec<Event> {
        let needle = query.to_lowercase();
        self.inner
            .read()
            .await
            .events
            .iter()
            .filter(|e| e.content.to_lowercase().contains(&needle))
            .take(limit)
            .cloned()
            .collect()
    }

    /// Events whose timestamp falls inside `[start, end]`, in log order.
    pub async fn search_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        limit: usize,
    ) -> Vec<Event> {
        self.inner
            .read()
            .await
            .events
            .iter()
            .filter(|e| e.timestamp >= start && e.timestamp <= end)
            .take(limit)
            .cloned()
            .collect()
    }

    /// Write the full ordered sequence to `path` as one JSON document.
    pub async fn save(&self, path: &Path) -> Result<(), MemoryError> {
        let inner = self.inner.read().await;
        let doc = SavedLog {
            events: inner.events.clone(),
        };
        drop(inner);

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| MemoryError::Storage(format!("Failed to create state directory: {e}")))?;
        }
        let json = serde_json::to_string_pretty(&doc)
            .map_err(|e| MemoryError::Storage(format!("Failed to serialize event log: {e}")))?;
        std::fs::write(path, json)
            .map_err(|e| MemoryError::Storage(format!("Failed to write event log: {e}")))?;
        debug!(path = %path.display(), "Event log saved");
        Ok(())
    }

    /// Restore a log saved with [`EventLog::save`]. Order and ids are
    /// preserved exactly; new appends continue after the highest id.
    pub fn load(path: &Path) -> Result<Self, MemoryError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| MemoryError::Storage(format!("Failed to read event log: {e}")))?;
        let doc: SavedLog = serde_json::from_str(&content)
            .map_err(|e| MemoryError::Storage(format!("Failed to parse event log: {e}")))?;
        let next_id = doc.events.iter().map(|e| e.id + 1).max().unwrap_or(0);
        debug!(path = %path.display(), count = doc.events.len(), "Event log loaded");
        Ok(Self {
            inner: RwLock::new(LogInner {
                events: doc.events,
                next_id,
            }),
        })
    }
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stratamind_core::message::ChatRole;

    fn no_meta() -> serde_json::Map<String, serde_json::Value> {
        serde_json::Map::new()
    }

    #[tokio::test]
    async fn appends_come_back_in_order() {
        let log = EventLog::new();
        for i in 0..10 {
            log.append(EventKind::UserMessage, format!("message {i}"), no_meta())
                .await;
        }

        let all = log.all().await;
        assert_eq!(all.len(), 10);
        assert_eq!(log.count().await, 10);
        for (i, event) in all.iter().enumerate() {
            assert_eq!(event.id, i as u64);
            assert_eq!(event.content, format!("message {i}"));
        }
    }

    #[tokio::test]
    async fn append_is_immediately_visible() {
        let log = EventLog::new();
        log.append(EventKind::AgentMessage, "first", no_meta()).await;
        assert_eq!(log.count().await, 1);
        log.append(EventKind::FunctionMessage, "second", no_meta())
            .await;
        assert_eq!(log.all().await.len(), 2);
    }

    #[tokio::test]
    async fn window_maps_kinds_to_roles() {
        let log = EventLog::new();
        log.append(EventKind::UserMessage, "hi", no_meta()).await;
        log.append(EventKind::AgentMessage, "hello", no_meta()).await;
        log.append(EventKind::FunctionMessage, "ok", no_meta()).await;

        let window = log.window().await;
        assert_eq!(window.len(), 3);
        assert_eq!(window[0].role, ChatRole::User);
        assert_eq!(window[1].role, ChatRole::Assistant);
        assert_eq!(window[2].role, ChatRole::Tool);
    }

    #[tokio::test]
    async fn search_matches_case_insensitively() {
        let log = EventLog::new();
        log.append(EventKind::UserMessage, "The Brass Compass", no_meta())
            .await;
        log.append(EventKind::UserMessage, "something else", no_meta())
            .await;

        let hits = log.search("brass", 10).await;
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].content, "The Brass Compass");
    }

    #[tokio::test]
    async fn search_respects_limit() {
        let log = EventLog::new();
        for i in 0..5 {
            log.append(EventKind::UserMessage, format!("note {i}"), no_meta())
                .await;
        }
        let hits = log.search("note", 2).await;
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].content, "note 0");
    }

    #[tokio::test]
    async fn search_range_filters_by_timestamp() {
        let log = EventLog::new();
        let before = Utc::now();
        log.append(EventKind::UserMessage, "inside", no_meta()).await;
        let after = Utc::now();

        let hits = log.search_range(before, after, 10).await;
        assert_eq!(hits.len(), 1);

        let later = log
            .search_range(after + chrono::Duration::seconds(1), after + chrono::Duration::seconds(2), 10)
            .await;
        assert!(later.is_empty());
    }

    #[tokio::test]
    async fn save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.json");

        let log = EventLog::new();
        log.append(EventKind::UserMessage, "hello", no_meta()).await;
        log.append(EventKind::AgentMessage, "hi there", no_meta())
            .await;
        log.save(&path).await.unwrap();

        let restored = EventLog::load(&path).unwrap();
        let original = log.all().await;
        let reloaded = restored.all().await;
        assert_eq!(reloaded.len(), original.len());
        for (a, b) in original.iter().zip(reloaded.iter()) {
            assert_eq!(a.id, b.id);
            assert_eq!(a.kind, b.kind);
            assert_eq!(a.content, b.content);
        }

        // New appends continue the sequence, no id reuse
        let next = restored
            .append(EventKind::UserMessage, "more", no_meta())
            .await;
        assert_eq!(next.id, 2);
    }
}
