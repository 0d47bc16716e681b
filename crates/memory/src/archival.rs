//! ArchivalMemoryStore — the unbounded, similarity-searched tier.
//!
//! The store itself is thin: embedding and ranking live behind the
//! `SimilarityIndex` seam, so a remote vector database drops in without
//! touching the agent. `InMemoryIndex` is the in-process reference
//! implementation used by tests and local sessions.

use async_trait::async_trait;
use std::sync::Arc;
use stratamind_core::error::MemoryError;
use stratamind_core::memory::{ArchivalEntry, SimilarityIndex};
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::vector::{cosine_similarity, term_frequency_embedding};

struct IndexedNote {
    id: String,
    text: String,
    embedding: Vec<f32>,
}

/// In-process similarity index: hashed term-frequency embeddings ranked
/// by cosine similarity. Ties keep insertion order (stable sort over a
/// Vec kept in insertion order).
pub struct InMemoryIndex {
    notes: RwLock<Vec<IndexedNote>>,
}

impl InMemoryIndex {
    pub fn new() -> Self {
        Self {
            notes: RwLock::new(Vec::new()),
        }
    }
}

impl Default for InMemoryIndex {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SimilarityIndex for InMemoryIndex {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn insert(&self, id: &str, text: &str) -> Result<(), MemoryError> {
        let embedding = term_frequency_embedding(text);
        self.notes.write().await.push(IndexedNote {
            id: id.to_string(),
            text: text.to_string(),
            embedding,
        });
        Ok(())
    }

    async fn search(&self, query: &str, top_k: usize) -> Result<Vec<ArchivalEntry>, MemoryError> {
        let query_embedding = term_frequency_embedding(query);
        let notes = self.notes.read().await;

        let mut results: Vec<ArchivalEntry> = notes
            .iter()
            .map(|note| ArchivalEntry {
                id: note.id.clone(),
                text: note.text.clone(),
                score: cosine_similarity(&note.embedding, &query_embedding),
            })
            .collect();

        results.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        results.truncate(top_k);
        Ok(results)
    }

    async fn count(&self) -> Result<usize, MemoryError> {
        Ok(self.notes.read().await.len())
    }
}

/// The archival memory store.
pub struct ArchivalMemoryStore {
    index: Arc<dyn SimilarityIndex>,
}

impl ArchivalMemoryStore {
    pub fn new(index: Arc<dyn SimilarityIndex>) -> Self {
        Self { index }
    }

    /// Convenience constructor backed by the in-process index.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryIndex::new()))
    }

    /// Insert a note. Returns its id only after the index has recorded
    /// it, so the note is searchable from the moment this returns.
    pub async fn insert(&self, text: &str) -> Result<String, MemoryError> {
        let id = Uuid::new_v4().to_string();
        self.index.insert(&id, text).await?;
        debug!(backend = self.index.name(), id = %id, "Archival note inserted");
        Ok(id)
    }

    /// Search for the `top_k` closest notes, descending score.
    pub async fn search(
        &self,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<ArchivalEntry>, MemoryError> {
        self.index.search(query, top_k).await
    }

    pub async fn count(&self) -> Result<usize, MemoryError> {
        self.index.count().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// An index that always fails, standing in for an unreachable
    /// vector backend.
    pub struct UnavailableIndex;

    #[async_trait]
    impl SimilarityIndex for UnavailableIndex {
        fn name(&self) -> &str {
            "unavailable"
        }
        async fn insert(&self, _id: &str, _text: &str) -> Result<(), MemoryError> {
            Err(MemoryError::BackendUnavailable("connection refused".into()))
        }
        async fn search(
            &self,
            _query: &str,
            _top_k: usize,
        ) -> Result<Vec<ArchivalEntry>, MemoryError> {
            Err(MemoryError::BackendUnavailable("connection refused".into()))
        }
        async fn count(&self) -> Result<usize, MemoryError> {
            Err(MemoryError::BackendUnavailable("connection refused".into()))
        }
    }

    #[tokio::test]
    async fn insert_is_immediately_searchable() {
        let store = ArchivalMemoryStore::in_memory();
        let id = store.insert("the brass compass points north").await.unwrap();
        assert!(!id.is_empty());

        let results = store.search("brass compass", 5).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, id);
    }

    #[tokio::test]
    async fn search_never_exceeds_top_k() {
        let store = ArchivalMemoryStore::in_memory();
        for i in 0..10 {
            store.insert(&format!("note number {i}")).await.unwrap();
        }
        let results = store.search("note", 3).await.unwrap();
        assert_eq!(results.len(), 3);
    }

    #[tokio::test]
    async fn results_are_sorted_by_descending_score() {
        let store = ArchivalMemoryStore::in_memory();
        store.insert("rain over the harbor").await.unwrap();
        store.insert("a brass compass in a wooden box").await.unwrap();
        store.insert("brass compass").await.unwrap();

        let results = store.search("brass compass", 10).await.unwrap();
        assert_eq!(results.len(), 3);
        for pair in results.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
        assert_eq!(results[0].text, "brass compass");
    }

    #[tokio::test]
    async fn equal_scores_keep_insertion_order() {
        let store = ArchivalMemoryStore::in_memory();
        let first = store.insert("identical note").await.unwrap();
        let second = store.insert("identical note").await.unwrap();

        let results = store.search("identical note", 10).await.unwrap();
        assert_eq!(results[0].id, first);
        assert_eq!(results[1].id, second);
    }

    #[tokio::test]
    async fn count_tracks_inserts() {
        let store = ArchivalMemoryStore::in_memory();
        assert_eq!(store.count().await.unwrap(), 0);
        store.insert("one").await.unwrap();
        store.insert("two").await.unwrap();
        assert_eq!(store.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn unavailable_backend_surfaces_as_error() {
        let store = ArchivalMemoryStore::new(Arc::new(UnavailableIndex));
        let err = store.insert("anything").await.unwrap_err();
        assert!(matches!(err, MemoryError::BackendUnavailable(_)));
        let err = store.search("anything", 3).await.unwrap_err();
        assert!(matches!(err, MemoryError::BackendUnavailable(_)));
    }
}
