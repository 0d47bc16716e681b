//! Archival memory seam — the similarity-search backend boundary.
//!
//! The archival tier is unbounded and lives behind an external
//! similarity index (embedding + vector store). This module defines the
//! seam; `stratamind-memory` provides the in-process reference index and
//! the store that wraps it.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::MemoryError;

/// An archival note returned from a search, score attached.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchivalEntry {
    /// Unique note id, also the key of the index's own record.
    pub id: String,

    /// The note text.
    pub text: String,

    /// Similarity score assigned by the backing index (higher is
    /// closer). Zero for entries not produced by a search.
    #[serde(default)]
    pub score: f32,
}

/// The similarity-search backend boundary.
///
/// Implementations must make an inserted entry searchable by the time
/// `insert` returns; there is no write-then-stale-read window beyond the
/// backend's own consistency guarantee.
#[async_trait]
pub trait SimilarityIndex: Send + Sync {
    /// The backend name (e.g., "in_memory").
    fn name(&self) -> &str;

    /// Record a note under the given id.
    async fn insert(&self, id: &str, text: &str) -> std::result::Result<(), MemoryError>;

    /// Return up to `top_k` notes ordered by descending similarity to
    /// `query`; ties break by insertion order.
    async fn search(
        &self,
        query: &str,
        top_k: usize,
    ) -> std::result::Result<Vec<ArchivalEntry>, MemoryError>;

    /// Total number of indexed notes.
    async fn count(&self) -> std::result::Result<usize, MemoryError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn archival_entry_serialization() {
        let entry = ArchivalEntry {
            id: "note_001".into(),
            text: "The traveler carries a brass compass".into(),
            score: 0.91,
        };
        let json = serde_json::to_string(&entry).unwrap();
        assert!(json.contains("brass compass"));
        let back: ArchivalEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id, "note_001");
    }
}
