//! Decode raw model text into prose or a structured tool call.
//!
//! The tool protocol is JSON-in-text: a response that opens with a JSON
//! object is expected to be a tool call carrying a "function" (or
//! "name") field. Anything that looks like JSON but does not decode is
//! malformed; the controller retries that once with a corrective note.

use stratamind_core::error::ProviderError;
use stratamind_core::provider::{ModelOutput, ModelToolCall};

/// Parse raw completion text into a `ModelOutput`.
pub fn parse_model_output(raw: &str) -> Result<ModelOutput, ProviderError> {
    let trimmed = raw.trim();

    if !trimmed.starts_with('{') {
        return Ok(ModelOutput::Text(trimmed.to_string()));
    }

    match serde_json::from_str::<ModelToolCall>(trimmed) {
        Ok(call) if call.name.is_empty() => Err(ProviderError::MalformedOutput(
            "tool call has an empty function name".into(),
        )),
        Ok(call) => Ok(ModelOutput::ToolCall(call)),
        Err(e) => Err(ProviderError::MalformedOutput(format!(
            "{e}: {}",
            truncate(trimmed, 200)
        ))),
    }
}

fn truncate(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prose_is_text() {
        let output = parse_model_output("The harbor is quiet tonight.").unwrap();
        assert!(matches!(output, ModelOutput::Text(t) if t.contains("harbor")));
    }

    #[test]
    fn json_object_with_function_is_a_tool_call() {
        let output = parse_model_output(
            r#"{"function": "archival_memory_insert", "arguments": {"text": "note"}, "request_heartbeat": true}"#,
        )
        .unwrap();
        match output {
            ModelOutput::ToolCall(call) => {
                assert_eq!(call.name, "archival_memory_insert");
                assert_eq!(call.arguments["text"], "note");
                assert_eq!(call.request_heartbeat, Some(true));
            }
            ModelOutput::Text(_) => panic!("expected a tool call"),
        }
    }

    #[test]
    fn surrounding_whitespace_is_tolerated() {
        let output =
            parse_model_output("\n  {\"function\": \"conversation_search\", \"arguments\": {}}  \n")
                .unwrap();
        assert!(matches!(output, ModelOutput::ToolCall(_)));
    }

    #[test]
    fn broken_json_is_malformed() {
        let err = parse_model_output(r#"{"function": "x", "arguments":"#).unwrap_err();
        assert!(matches!(err, ProviderError::MalformedOutput(_)));
    }

    #[test]
    fn json_without_function_name_is_malformed() {
        let err = parse_model_output(r#"{"arguments": {"text": "note"}}"#).unwrap_err();
        assert!(matches!(err, ProviderError::MalformedOutput(_)));
    }
}
