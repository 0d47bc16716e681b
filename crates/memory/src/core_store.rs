//! CoreMemoryStore — the always-in-context tier.
//!
//! A small set of named text sections that is rendered into every
//! system prompt. The model edits it through three operations (append,
//! remove, replace); remove is a literal lookup-and-splice, never a
//! diff. The store tracks its rendered size and the time of the last
//! mutation so the prompt can surface both.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use stratamind_core::error::MemoryError;
use tokio::sync::RwLock;
use tracing::debug;

/// The fixed set of core memory sections. Rendering order is
/// declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoreSection {
    GeneralInfo,
    Participants,
    Progress,
    Miscellaneous,
}

impl CoreSection {
    pub const ALL: [CoreSection; 4] = [
        CoreSection::GeneralInfo,
        CoreSection::Participants,
        CoreSection::Progress,
        CoreSection::Miscellaneous,
    ];

    /// The label used in the rendered prompt.
    pub fn label(&self) -> &'static str {
        match self {
            CoreSection::GeneralInfo => "General Information",
            CoreSection::Participants => "Participants",
            CoreSection::Progress => "Progress",
            CoreSection::Miscellaneous => "Miscellaneous",
        }
    }

    /// The stable snake_case key used in tool arguments and persistence.
    pub fn key(&self) -> &'static str {
        match self {
            CoreSection::GeneralInfo => "general_info",
            CoreSection::Participants => "participants",
            CoreSection::Progress => "progress",
            CoreSection::Miscellaneous => "miscellaneous",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|sec| sec.key() == s)
    }

    fn index(&self) -> usize {
        Self::ALL.iter().position(|s| s == self).unwrap_or(0)
    }
}

struct CoreInner {
    sections: [String; 4],
    last_modified: DateTime<Utc>,
}

/// The core memory store. Interior mutability so tool adapters can
/// share it behind an `Arc`.
pub struct CoreMemoryStore {
    inner: RwLock<CoreInner>,
}

#[derive(Serialize, Deserialize)]
struct SavedCore {
    sections: serde_json::Map<String, serde_json::Value>,
    last_modified: DateTime<Utc>,
}

impl CoreMemoryStore {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(CoreInner {
                sections: Default::default(),
                last_modified: Utc::now(),
            }),
        }
    }

    /// Construct with initial section content, e.g. seed facts about
    /// the participants before the first turn.
    pub fn with_seed(seed: &[(CoreSection, &str)]) -> Self {
        let mut sections: [String; 4] = Default::default();
        for (section, text) in seed {
            sections[section.index()] = (*text).to_string();
        }
        Self {
            inner: RwLock::new(CoreInner {
                sections,
                last_modified: Utc::now(),
            }),
        }
    }

    /// Append `text` to a section, separated from existing content by a
    /// newline.
    pub async fn append(&self, section: CoreSection, text: &str) {
        let mut inner = self.inner.write().await;
        let content = &mut inner.sections[section.index()];
        if content.is_empty() {
            content.push_str(text);
        } else {
            content.push('\n');
            content.push_str(text);
        }
        inner.last_modified = Utc::now();
    }

    /// Remove the first literal occurrence of `text` from a section,
    /// splicing out the separator it leaves behind so that
    /// append-then-remove restores the section exactly.
    pub async fn remove(&self, section: CoreSection, text: &str) -> Result<(), MemoryError> {
        let mut inner = self.inner.write().await;
        let content = &mut inner.sections[section.index()];

        let Some(pos) = content.find(text) else {
            return Err(MemoryError::NotFound {
                section: section.key().into(),
                text: text.into(),
            });
        };

        content.replace_range(pos..pos + text.len(), "");
        if pos > 0 && content.as_bytes().get(pos - 1) == Some(&b'\n') {
            content.remove(pos - 1);
        } else if content.as_bytes().get(pos) == Some(&b'\n') {
            content.remove(pos);
        }

        inner.last_modified = Utc::now();
        Ok(())
    }

    /// Replace `old` with `new` in a section: remove-then-append,
    /// atomic from the caller's point of view (one write lock).
    pub async fn replace(
        &self,
        section: CoreSection,
        old: &str,
        new: &str,
    ) -> Result<(), MemoryError> {
        let mut inner = self.inner.write().await;
        let content = &mut inner.sections[section.index()];

        let Some(pos) = content.find(old) else {
            return Err(MemoryError::NotFound {
                section: section.key().into(),
                text: old.into(),
            });
        };

        content.replace_range(pos..pos + old.len(), "");
        if pos > 0 && content.as_bytes().get(pos - 1) == Some(&b'\n') {
            content.remove(pos - 1);
        } else if content.as_bytes().get(pos) == Some(&b'\n') {
            content.remove(pos);
        }
        if content.is_empty() {
            content.push_str(new);
        } else {
            content.push('\n');
            content.push_str(new);
        }

        inner.last_modified = Utc::now();
        Ok(())
    }

    /// Render all sections with their labels, in declaration order.
    pub async fn render(&self) -> String {
        let inner = self.inner.read().await;
        let mut out = String::new();
        for section in CoreSection::ALL {
            out.push_str("### ");
            out.push_str(section.label());
            out.push('\n');
            out.push_str(&inner.sections[section.index()]);
            out.push_str("\n\n");
        }
        out.trim_end().to_string()
    }

    /// Rendered size in characters. Callers pick content that fits
    /// their prompt budget; the store only reports.
    pub async fn size(&self) -> usize {
        self.render().await.chars().count()
    }

    pub async fn last_modified(&self) -> DateTime<Utc> {
        self.inner.read().await.last_modified
    }

    /// Write the store to `path` as one JSON document.
    pub async fn save(&self, path: &Path) -> Result<(), MemoryError> {
        let inner = self.inner.read().await;
        let mut sections = serde_json::Map::new();
        for section in CoreSection::ALL {
            sections.insert(
                section.key().into(),
                serde_json::Value::String(inner.sections[section.index()].clone()),
            );
        }
        let doc = SavedCore {
            sections,
            last_modified: inner.last_modified,
        };
        drop(inner);

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| MemoryError::Storage(format!("Failed to create state directory: {e}")))?;
        }
        let json = serde_json::to_string_pretty(&doc)
            .map_err(|e| MemoryError::Storage(format!("Failed to serialize core memory: {e}")))?;
        std::fs::write(path, json)
            .map_err(|e| MemoryError::Storage(format!("Failed to write core memory: {e}")))?;
        debug!(path = %path.display(), "Core memory saved");
        Ok(())
    }

    /// Restore a store saved with [`CoreMemoryStore::save`]; render
    /// output is identical to the saved store's.
    pub fn load(path: &Path) -> Result<Self, MemoryError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| MemoryError::Storage(format!("Failed to read core memory: {e}")))?;
        let doc: SavedCore = serde_json::from_str(&content)
            .map_err(|e| MemoryError::Storage(format!("Failed to parse core memory: {e}")))?;

        let mut sections: [String; 4] = Default::default();
        for section in CoreSection::ALL {
            if let Some(text) = doc.sections.get(section.key()).and_then(|v| v.as_str()) {
                sections[section.index()] = text.to_string();
            }
        }
        Ok(Self {
            inner: RwLock::new(CoreInner {
                sections,
                last_modified: doc.last_modified,
            }),
        })
    }
}

impl Default for CoreMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}
