//! Tool trait and registry — the agent's callable surface.
//!
//! Tools are what let the model act on its own memory tiers (and send
//! messages to the human). Every tool carries a JSON Schema for its
//! arguments; the registry validates a call against that schema before
//! the handler runs.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::ToolError;
use crate::provider::ToolDefinition;

/// A request to execute a tool, as decoded from model output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    /// Name of the tool to execute.
    pub name: String,

    /// Arguments as a JSON object.
    pub arguments: serde_json::Value,

    /// The outer heartbeat flag from the model output.
    #[serde(default)]
    pub request_heartbeat: bool,
}

/// What a tool handler returns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolOutput {
    /// Whether the tool accomplished what it was asked.
    pub success: bool,

    /// The text fed back to the model as a function result.
    pub output: String,
}

impl ToolOutput {
    pub fn ok(output: impl Into<String>) -> Self {
        Self {
            success: true,
            output: output.into(),
        }
    }

    pub fn failure(output: impl Into<String>) -> Self {
        Self {
            success: false,
            output: output.into(),
        }
    }
}

/// The outcome of a dispatched call, heartbeat decision included.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    pub success: bool,
    pub output: String,

    /// The call's heartbeat request ANDed with the tool's own
    /// `allows_heartbeat()`. This is what the controller reads.
    pub requested_heartbeat: bool,
}

/// The core Tool trait.
///
/// Each memory-tier adapter (core memory edits, archival insert/search,
/// recall search) and the message-mode switch implements this trait.
#[async_trait]
pub trait Tool: Send + Sync {
    /// The unique name of this tool (e.g., "core_memory_append").
    fn name(&self) -> &str;

    /// A description of what this tool does (rendered into the system
    /// prompt's tool documentation).
    fn description(&self) -> &str;

    /// JSON Schema describing this tool's parameters.
    fn parameters_schema(&self) -> serde_json::Value;

    /// Whether this tool may request another heartbeat. Tools that end
    /// the chain they run in (message mode) return false.
    fn allows_heartbeat(&self) -> bool {
        true
    }

    /// Execute the tool with validated arguments.
    async fn execute(
        &self,
        arguments: serde_json::Value,
    ) -> std::result::Result<ToolOutput, ToolError>;

    /// Convert this tool into a ToolDefinition for the provider.
    fn to_definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters_schema(),
        }
    }
}

/// Check `arguments` against a JSON Schema's `required` list and the
/// declared primitive property types. Deliberately shallow: nested
/// schemas are accepted as long as the value is an object/array.
pub fn validate_arguments(
    schema: &serde_json::Value,
    arguments: &serde_json::Value,
) -> std::result::Result<(), ToolError> {
    let Some(args) = arguments.as_object() else {
        return Err(ToolError::InvalidArguments(
            "arguments must be a JSON object".into(),
        ));
    };

    if let Some(required) = schema.get("required").and_then(|r| r.as_array()) {
        for name in required.iter().filter_map(|n| n.as_str()) {
            if !args.contains_key(name) {
                return Err(ToolError::InvalidArguments(format!(
                    "missing required argument '{name}'"
                )));
            }
        }
    }

    if let Some(properties) = schema.get("properties").and_then(|p| p.as_object()) {
        for (name, value) in args {
            let Some(expected) = properties
                .get(name)
                .and_then(|p| p.get("type"))
                .and_then(|t| t.as_str())
            else {
                continue;
            };
            let matches = match expected {
                "string" => value.is_string(),
                "integer" => value.is_i64() || value.is_u64(),
                "number" => value.is_number(),
                "boolean" => value.is_boolean(),
                "array" => value.is_array(),
                "object" => value.is_object(),
                _ => true,
            };
            if !matches {
                return Err(ToolError::InvalidArguments(format!(
                    "argument '{name}' must be of type {expected}"
                )));
            }
        }
    }

    Ok(())
}

/// A registry of available tools.
///
/// Registration order is preserved: `documentation()` and
/// `definitions()` list tools in the order they were registered, so the
/// rendered system prompt is stable across runs.
pub struct ToolRegistry {
    tools: Vec<Box<dyn Tool>>,
    by_name: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: Vec::new(),
            by_name: HashMap::new(),
        }
    }

    /// Register a tool. Names are unique for the lifetime of the agent.
    pub fn register(&mut self, tool: Box<dyn Tool>) -> std::result::Result<(), ToolError> {
        let name = tool.name().to_string();
        if self.by_name.contains_key(&name) {
            return Err(ToolError::DuplicateName(name));
        }
        self.by_name.insert(name, self.tools.len());
        self.tools.push(tool);
        Ok(())
    }

    /// Get a tool by name.
    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.by_name.get(name).map(|&i| self.tools[i].as_ref())
    }

    /// All tool definitions, in registration order.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(|t| t.to_definition()).collect()
    }

    /// Human/model-readable listing of every registered tool, in
    /// registration order. Injected into the system prompt.
    pub fn documentation(&self) -> String {
        let mut doc = String::new();
        for tool in &self.tools {
            doc.push_str(tool.name());
            doc.push_str(":\n  description: ");
            doc.push_str(tool.description());
            doc.push_str("\n  parameters: ");
            doc.push_str(&tool.parameters_schema().to_string());
            doc.push_str("\n\n");
        }
        doc.trim_end().to_string()
    }

    /// Number of registered tools.
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Dispatch a call: look the tool up, validate arguments against its
    /// schema, run the handler, and fold the outcome together with the
    /// heartbeat decision.
    ///
    /// Handler failures are wrapped into a failed `ToolResult` so the
    /// model can react to them; only unknown names and schema violations
    /// are dispatch errors.
    pub async fn dispatch(&self, call: &ToolCall) -> std::result::Result<ToolResult, ToolError> {
        let tool = self
            .get(&call.name)
            .ok_or_else(|| ToolError::UnknownTool(call.name.clone()))?;

        validate_arguments(&tool.parameters_schema(), &call.arguments)?;

        let requested_heartbeat = call.request_heartbeat && tool.allows_heartbeat();

        match tool.execute(call.arguments.clone()).await {
            Ok(output) => Ok(ToolResult {
                success: output.success,
                output: output.output,
                requested_heartbeat,
            }),
            Err(e) => Ok(ToolResult {
                success: false,
                output: e.to_string(),
                requested_heartbeat,
            }),
        }
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }
        fn description(&self) -> &str {
            "Echoes back the input"
        }
        fn parameters_schema(&self) -> serde_json::Value {
            json!({
                "type": "object",
                "properties": {
                    "text": { "type": "string" }
                },
                "required": ["text"]
            })
        }
        async fn execute(
            &self,
            arguments: serde_json::Value,
        ) -> std::result::Result<ToolOutput, ToolError> {
            let text = arguments["text"].as_str().unwrap_or("").to_string();
            Ok(ToolOutput::ok(text))
        }
    }

    struct TerminalTool;

    #[async_trait]
    impl Tool for TerminalTool {
        fn name(&self) -> &str {
            "terminal"
        }
        fn description(&self) -> &str {
            "Always ends the chain"
        }
        fn parameters_schema(&self) -> serde_json::Value {
            json!({ "type": "object", "properties": {} })
        }
        fn allows_heartbeat(&self) -> bool {
            false
        }
        async fn execute(
            &self,
            _arguments: serde_json::Value,
        ) -> std::result::Result<ToolOutput, ToolError> {
            Ok(ToolOutput::ok("done"))
        }
    }

    fn call(name: &str, arguments: serde_json::Value, heartbeat: bool) -> ToolCall {
        ToolCall {
            name: name.into(),
            arguments,
            request_heartbeat: heartbeat,
        }
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(EchoTool)).unwrap();
        let err = registry.register(Box::new(EchoTool)).unwrap_err();
        assert!(matches!(err, ToolError::DuplicateName(name) if name == "echo"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn documentation_preserves_registration_order() {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(TerminalTool)).unwrap();
        registry.register(Box::new(EchoTool)).unwrap();

        let doc = registry.documentation();
        let terminal_at = doc.find("terminal").unwrap();
        let echo_at = doc.find("echo").unwrap();
        assert!(terminal_at < echo_at);
        assert!(doc.contains("Echoes back the input"));
    }

    #[tokio::test]
    async fn dispatch_executes_and_honors_heartbeat() {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(EchoTool)).unwrap();

        let result = registry
            .dispatch(&call("echo", json!({"text": "hello"}), true))
            .await
            .unwrap();
        assert!(result.success);
        assert_eq!(result.output, "hello");
        assert!(result.requested_heartbeat);
    }

    #[tokio::test]
    async fn heartbeat_is_forced_off_by_the_tool() {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(TerminalTool)).unwrap();

        let result = registry
            .dispatch(&call("terminal", json!({}), true))
            .await
            .unwrap();
        assert!(!result.requested_heartbeat);
    }

    #[tokio::test]
    async fn unknown_tool_is_a_dispatch_error() {
        let registry = ToolRegistry::new();
        let err = registry
            .dispatch(&call("nonexistent_tool", json!({}), false))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::UnknownTool(_)));
    }

    #[tokio::test]
    async fn missing_required_argument_is_rejected_before_execution() {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(EchoTool)).unwrap();

        let err = registry
            .dispatch(&call("echo", json!({}), false))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }

    #[test]
    fn validate_arguments_checks_primitive_types() {
        let schema = json!({
            "type": "object",
            "properties": {
                "limit": { "type": "integer" },
                "query": { "type": "string" }
            },
            "required": ["query"]
        });

        assert!(validate_arguments(&schema, &json!({"query": "x", "limit": 3})).is_ok());
        assert!(validate_arguments(&schema, &json!({"query": "x"})).is_ok());
        assert!(validate_arguments(&schema, &json!({"query": 1})).is_err());
        assert!(validate_arguments(&schema, &json!({"query": "x", "limit": "three"})).is_err());
        assert!(validate_arguments(&schema, &json!("not an object")).is_err());
    }
}
