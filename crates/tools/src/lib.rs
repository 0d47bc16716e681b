//! Memory-tier tool adapters for stratamind.
//!
//! These tools are the model's only way to touch its own memory: edit
//! the core tier, write and search the archival tier, search the full
//! recall history, and switch into message mode to address the human.

pub mod archival;
pub mod core_memory;
pub mod message;
pub mod recall;

use std::sync::Arc;

use stratamind_core::error::ToolError;
use stratamind_core::tool::ToolRegistry;
use stratamind_memory::{ArchivalMemoryStore, CoreMemoryStore, EventLog};

pub use archival::{ArchivalInsertTool, ArchivalSearchTool};
pub use core_memory::{CoreMemoryAppendTool, CoreMemoryRemoveTool, CoreMemoryReplaceTool};
pub use message::{ActivateMessageModeTool, ACTIVATE_MESSAGE_MODE};
pub use recall::{ConversationSearchDateTool, ConversationSearchTool};

/// Build the full memory tool registry in its canonical order:
/// message mode first, then core memory edits, archival, recall.
///
/// The order is what the model sees in the rendered documentation, so
/// it stays fixed across runs.
pub fn memory_registry(
    core: Arc<CoreMemoryStore>,
    archival: Arc<ArchivalMemoryStore>,
    log: Arc<EventLog>,
) -> Result<ToolRegistry, ToolError> {
    let mut registry = ToolRegistry::new();
    registry.register(Box::new(ActivateMessageModeTool))?;
    registry.register(Box::new(CoreMemoryAppendTool::new(core.clone())))?;
    registry.register(Box::new(CoreMemoryRemoveTool::new(core.clone())))?;
    registry.register(Box::new(CoreMemoryReplaceTool::new(core)))?;
    registry.register(Box::new(ArchivalInsertTool::new(archival.clone())))?;
    registry.register(Box::new(ArchivalSearchTool::new(archival)))?;
    registry.register(Box::new(ConversationSearchTool::new(log.clone())))?;
    registry.register(Box::new(ConversationSearchDateTool::new(log)))?;
    Ok(registry)
}
