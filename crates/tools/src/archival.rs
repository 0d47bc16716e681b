//! Archival memory tools.
//!
//! Insert and search adapters over `ArchivalMemoryStore`. A failing
//! similarity backend is reported as a failed tool result so the model
//! can react to it in the next heartbeat; it never aborts the turn.

use async_trait::async_trait;
use serde_json::json;
use std::fmt::Write as _;
use std::sync::Arc;
use stratamind_core::error::ToolError;
use stratamind_core::tool::{Tool, ToolOutput};
use stratamind_memory::ArchivalMemoryStore;
use tracing::warn;

const DEFAULT_TOP_K: u64 = 5;
const MAX_TOP_K: u64 = 50;

/// Writes a note into archival memory.
pub struct ArchivalInsertTool {
    store: Arc<ArchivalMemoryStore>,
}

impl ArchivalInsertTool {
    pub fn new(store: Arc<ArchivalMemoryStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for ArchivalInsertTool {
    fn name(&self) -> &str {
        "archival_memory_insert"
    }

    fn description(&self) -> &str {
        "Write a note into your archival memory. Archival memory is infinite in size \
         but outside your context window; use it for reflections and details that \
         matter later but do not fit in core memory."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "text": { "type": "string", "description": "The note to store" }
            },
            "required": ["text"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolOutput, ToolError> {
        let text = arguments["text"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("missing 'text' argument".into()))?;

        match self.store.insert(text).await {
            Ok(id) => Ok(ToolOutput::ok(format!(
                "Stored note {id} in archival memory."
            ))),
            Err(e) => {
                warn!(error = %e, "Archival insert failed");
                Ok(ToolOutput::failure(format!("Archival insert failed: {e}")))
            }
        }
    }
}

/// Searches archival memory by semantic similarity.
pub struct ArchivalSearchTool {
    store: Arc<ArchivalMemoryStore>,
}

impl ArchivalSearchTool {
    pub fn new(store: Arc<ArchivalMemoryStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for ArchivalSearchTool {
    fn name(&self) -> &str {
        "archival_memory_search"
    }

    fn description(&self) -> &str {
        "Search your archival memory for notes similar to a query. Returns the \
         closest notes first."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "query": { "type": "string", "description": "The search query" },
                "top_k": {
                    "type": "integer",
                    "description": "Maximum number of notes to return (default 5)"
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolOutput, ToolError> {
        let query = arguments["query"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("missing 'query' argument".into()))?;
        let top_k = arguments["top_k"]
            .as_u64()
            .unwrap_or(DEFAULT_TOP_K)
            .min(MAX_TOP_K) as usize;

        match self.store.search(query, top_k).await {
            Ok(entries) if entries.is_empty() => Ok(ToolOutput::ok(format!(
                "No archival notes found matching '{query}'."
            ))),
            Ok(entries) => {
                let mut output = String::new();
                for (i, entry) in entries.iter().enumerate() {
                    let _ = writeln!(
                        output,
                        "{}. [score={:.2}] {}",
                        i + 1,
                        entry.score,
                        entry.text
                    );
                }
                Ok(ToolOutput::ok(output.trim_end().to_string()))
            }
            Err(e) => {
                warn!(error = %e, "Archival search failed");
                Ok(ToolOutput::failure(format!("Archival search failed: {e}")))
            }
        }
    }
}
