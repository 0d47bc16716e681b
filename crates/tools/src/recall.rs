//! Recall tools — search over the full event log.
//!
//! The in-context window only shows recent history; these adapters let
//! the model reach the rest of it, by content or by time range.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::json;
use std::fmt::Write as _;
use std::sync::Arc;
use stratamind_core::error::ToolError;
use stratamind_core::event::Event;
use stratamind_core::tool::{Tool, ToolOutput};
use stratamind_memory::EventLog;

const DEFAULT_LIMIT: u64 = 10;
const MAX_LIMIT: u64 = 50;

fn limit_arg(arguments: &serde_json::Value) -> usize {
    arguments["limit"].as_u64().unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT) as usize
}

fn format_events(events: &[Event]) -> String {
    let mut output = String::new();
    for event in events {
        let _ = writeln!(
            output,
            "[{} #{}] {:?}: {}",
            event.timestamp.format("%Y-%m-%d %H:%M:%S"),
            event.id,
            event.kind,
            event.content
        );
    }
    output.trim_end().to_string()
}

/// Searches past conversation events by content.
pub struct ConversationSearchTool {
    log: Arc<EventLog>,
}

impl ConversationSearchTool {
    pub fn new(log: Arc<EventLog>) -> Self {
        Self { log }
    }
}

#[async_trait]
impl Tool for ConversationSearchTool {
    fn name(&self) -> &str {
        "conversation_search"
    }

    fn description(&self) -> &str {
        "Search your full conversation history (recall memory) for past events \
         containing the given text."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "query": { "type": "string", "description": "Text to look for" },
                "limit": {
                    "type": "integer",
                    "description": "Maximum number of events to return (default 10)"
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolOutput, ToolError> {
        let query = arguments["query"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("missing 'query' argument".into()))?;
        let limit = limit_arg(&arguments);

        let hits = self.log.search(query, limit).await;
        if hits.is_empty() {
            Ok(ToolOutput::ok(format!(
                "No past events found matching '{query}'."
            )))
        } else {
            Ok(ToolOutput::ok(format_events(&hits)))
        }
    }
}

/// Searches past conversation events by time range.
pub struct ConversationSearchDateTool {
    log: Arc<EventLog>,
}

impl ConversationSearchDateTool {
    pub fn new(log: Arc<EventLog>) -> Self {
        Self { log }
    }
}

#[async_trait]
impl Tool for ConversationSearchDateTool {
    fn name(&self) -> &str {
        "conversation_search_date"
    }

    fn description(&self) -> &str {
        "Search your full conversation history (recall memory) for events between \
         two RFC 3339 timestamps."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "start": { "type": "string", "description": "Range start, RFC 3339" },
                "end": { "type": "string", "description": "Range end, RFC 3339" },
                "limit": {
                    "type": "integer",
                    "description": "Maximum number of events to return (default 10)"
                }
            },
            "required": ["start", "end"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolOutput, ToolError> {
        let start = parse_timestamp(&arguments, "start")?;
        let end = parse_timestamp(&arguments, "end")?;
        let limit = limit_arg(&arguments);

        let hits = self.log.search_range(start, end, limit).await;
        if hits.is_empty() {
            Ok(ToolOutput::ok("No past events found in that time range.".to_string()))
        } else {
            Ok(ToolOutput::ok(format_events(&hits)))
        }
    }
}

fn parse_timestamp(arguments: &serde_json::Value, key: &str) -> Result<DateTime<Utc>, ToolError> {
    let raw = arguments[key]
        .as_str()
        .ok_or_else(|| ToolError::InvalidArguments(format!("missing '{key}' argument")))?;
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| ToolError::InvalidArguments(format!("'{key}' is not an RFC 3339 timestamp: {e}")))
}
