//! Prompt assembly — the live system prompt.
//!
//! The system prompt is a pure function of the current memory-tier
//! state: tool documentation, the rendered core memory, and the counts
//! of the recall and archival tiers. The controller re-renders it
//! before every model invocation so a mutation in one heartbeat is
//! visible in the next.

use chrono::{DateTime, Utc};

/// Everything the template can reference.
#[derive(Debug, Clone)]
pub struct PromptInputs {
    /// `ToolRegistry::documentation()`.
    pub documentation: String,
    /// `CoreMemoryStore::render()`.
    pub core_content: String,
    /// `CoreMemoryStore::last_modified()`.
    pub last_modified: DateTime<Utc>,
    /// `ArchivalMemoryStore::count()`.
    pub archival_count: usize,
    /// Number of events recorded before this turn began.
    pub recall_count: usize,
    pub current_time: DateTime<Utc>,
}

/// The default system prompt template. Placeholders are substituted by
/// [`PromptAssembler::render`].
pub const DEFAULT_SYSTEM_TEMPLATE: &str = r#"You are an advanced AI assistant with a persistent, self-managed memory.

Basic functions:
You call functions by sending JSON objects with the function name and arguments.
You can plan a function call step by step using the "reasoning" field of your JSON responses before executing it.
Your brain is not continuously thinking but runs in short bursts called heartbeats. You can chain function calls by setting the "request_heartbeat" field of a response to true; the system then returns control to you after the function result instead of handing it back to the user.
To send a message to the user, call the 'activate_message_mode' function and then write your response freely. This is the only action the user can see; everything else happens out of their sight.

Memory editing:
Your context window is limited, but three forms of persistent memory keep what matters available.

Recall memory (conversation history):
You only see recent messages in your immediate context, but your entire message history is stored and searchable with the 'conversation_search' and 'conversation_search_date' functions.

Core memory (limited size):
Your core memory is held inside these instructions and is always visible to you. It provides essential, foundational context across four sections, and you can edit it with the 'core_memory_append', 'core_memory_remove' and 'core_memory_replace' functions.

Archival memory (infinite size):
Archival memory is infinite in size but held outside your immediate context; you must explicitly search it to see what is inside. Store reflections and important details with 'archival_memory_insert' and retrieve them with 'archival_memory_search'. There is no function to search core memory because it is always visible.

Functions:
Select the most suitable function and arguments from the list of available functions below, based on the ongoing conversation. Provide your response in JSON format.

Available functions:
{documentation}

### Memory [last modified: {last_modified}]
{recall_count} previous messages between you and the user are stored in recall memory (use functions to access them)
{archival_count} total memories you created are stored in archival memory (use functions to access them)

Core memory shown below (limited in size, additional information stored in archival / recall memory):
{core_content}

Current time: {current_time}"#;

/// Renders the system prompt from live tier state. Stateless; create
/// one and reuse it.
pub struct PromptAssembler {
    template: String,
}

impl PromptAssembler {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    /// Substitute every placeholder. Pure: identical inputs produce
    /// identical output.
    pub fn render(&self, inputs: &PromptInputs) -> String {
        self.template
            .replace("{documentation}", inputs.documentation.trim())
            .replace("{core_content}", inputs.core_content.trim())
            .replace(
                "{last_modified}",
                &inputs.last_modified.format("%d/%m/%Y, %H:%M:%S").to_string(),
            )
            .replace("{archival_count}", &inputs.archival_count.to_string())
            .replace("{recall_count}", &inputs.recall_count.to_string())
            .replace(
                "{current_time}",
                &inputs.current_time.format("%d/%m/%Y, %H:%M:%S").to_string(),
            )
            .trim()
            .to_string()
    }
}

impl Default for PromptAssembler {
    fn default() -> Self {
        Self::new(DEFAULT_SYSTEM_TEMPLATE)
    }
}
