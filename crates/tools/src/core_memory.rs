//! Core memory edit tools.
//!
//! Three adapters over `CoreMemoryStore`: append, remove, replace.
//! These are the only mutators of the core tier; their descriptions are
//! rendered into the system prompt so the model knows the section names
//! it may target.

use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use stratamind_core::error::ToolError;
use stratamind_core::tool::{Tool, ToolOutput};
use stratamind_memory::{CoreMemoryStore, CoreSection};

fn section_arg(arguments: &serde_json::Value) -> Result<CoreSection, ToolError> {
    let name = arguments["section"]
        .as_str()
        .ok_or_else(|| ToolError::InvalidArguments("missing 'section' argument".into()))?;
    CoreSection::parse(name).ok_or_else(|| {
        ToolError::InvalidArguments(format!(
            "unknown section '{name}', expected one of: general_info, participants, progress, miscellaneous"
        ))
    })
}

fn text_arg<'a>(arguments: &'a serde_json::Value, key: &str) -> Result<&'a str, ToolError> {
    arguments[key]
        .as_str()
        .ok_or_else(|| ToolError::InvalidArguments(format!("missing '{key}' argument")))
}

fn section_schema() -> serde_json::Value {
    json!({
        "type": "string",
        "description": "Target section: general_info, participants, progress, or miscellaneous"
    })
}

/// Appends text to a core memory section.
pub struct CoreMemoryAppendTool {
    store: Arc<CoreMemoryStore>,
}

impl CoreMemoryAppendTool {
    pub fn new(store: Arc<CoreMemoryStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for CoreMemoryAppendTool {
    fn name(&self) -> &str {
        "core_memory_append"
    }

    fn description(&self) -> &str {
        "Append text to a section of your core memory. Core memory is always visible \
         in your context, so keep entries short and essential."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "section": section_schema(),
                "text": { "type": "string", "description": "The text to append" }
            },
            "required": ["section", "text"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolOutput, ToolError> {
        let section = section_arg(&arguments)?;
        let text = text_arg(&arguments, "text")?;
        self.store.append(section, text).await;
        Ok(ToolOutput::ok(format!(
            "Appended to core memory section '{}'.",
            section.key()
        )))
    }
}

/// Removes a literal text fragment from a core memory section.
pub struct CoreMemoryRemoveTool {
    store: Arc<CoreMemoryStore>,
}

impl CoreMemoryRemoveTool {
    pub fn new(store: Arc<CoreMemoryStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for CoreMemoryRemoveTool {
    fn name(&self) -> &str {
        "core_memory_remove"
    }

    fn description(&self) -> &str {
        "Remove text from a section of your core memory. The text must match the \
         stored content exactly."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "section": section_schema(),
                "text": { "type": "string", "description": "The exact text to remove" }
            },
            "required": ["section", "text"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolOutput, ToolError> {
        let section = section_arg(&arguments)?;
        let text = text_arg(&arguments, "text")?;
        match self.store.remove(section, text).await {
            Ok(()) => Ok(ToolOutput::ok(format!(
                "Removed from core memory section '{}'.",
                section.key()
            ))),
            Err(e) => Ok(ToolOutput::failure(e.to_string())),
        }
    }
}

/// Replaces a literal text fragment in a core memory section.
pub struct CoreMemoryReplaceTool {
    store: Arc<CoreMemoryStore>,
}

impl CoreMemoryReplaceTool {
    pub fn new(store: Arc<CoreMemoryStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for CoreMemoryReplaceTool {
    fn name(&self) -> &str {
        "core_memory_replace"
    }

    fn description(&self) -> &str {
        "Replace text in a section of your core memory with new text. The old text \
         must match the stored content exactly."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "section": section_schema(),
                "old_text": { "type": "string", "description": "The exact text to replace" },
                "new_text": { "type": "string", "description": "The replacement text" }
            },
            "required": ["section", "old_text", "new_text"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolOutput, ToolError> {
        let section = section_arg(&arguments)?;
        let old_text = text_arg(&arguments, "old_text")?;
        let new_text = text_arg(&arguments, "new_text")?;
        match self.store.replace(section, old_text, new_text).await {
            Ok(()) => Ok(ToolOutput::ok(format!(
                "Replaced text in core memory section '{}'.",
                section.key()
            ))),
            Err(e) => Ok(ToolOutput::failure(e.to_string())),
        }
    }
}
