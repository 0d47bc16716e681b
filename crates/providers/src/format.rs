//! Minimal chat-markup formatter for raw-prompt backends.
//!
//! The llama server takes one rendered prompt string, so the message
//! window has to be flattened into role-labeled blocks. The trailing
//! primer is the important part: in tool mode the prompt ends with the
//! function-call marker so the model continues with a structured call;
//! in free-text mode it ends with the assistant marker so the model
//! writes prose for the human.

use stratamind_core::message::{ChatMessage, ChatRole};
use stratamind_core::provider::OutputConstraint;

/// Role markers and stop sequences for one chat dialect.
#[derive(Debug, Clone)]
pub struct PromptFormat {
    pub system_prefix: String,
    pub user_prefix: String,
    pub assistant_prefix: String,
    pub function_result_prefix: String,
    /// The tool-call continuation marker appended in tool mode.
    pub function_call_prefix: String,
    /// Stop sequences implied by the markers themselves.
    pub stop_sequences: Vec<String>,
}

impl Default for PromptFormat {
    fn default() -> Self {
        Self {
            system_prefix: "### Instructions:\n".into(),
            user_prefix: "### User:\n".into(),
            assistant_prefix: "### Assistant:\n".into(),
            function_result_prefix: "### Function Result:\n".into(),
            function_call_prefix: "### Function Call:\n".into(),
            stop_sequences: vec![
                "### User:".into(),
                "### Instructions:".into(),
                "### Function Call:".into(),
                "### Function Result:".into(),
            ],
        }
    }
}

impl PromptFormat {
    /// Flatten the system prompt and window into one prompt string,
    /// ending with the primer implied by the constraint.
    pub fn render(
        &self,
        system_prompt: &str,
        window: &[ChatMessage],
        constraint: &OutputConstraint,
    ) -> String {
        let mut prompt = String::new();
        prompt.push_str(&self.system_prefix);
        prompt.push_str(system_prompt);
        prompt.push('\n');

        for message in window {
            let prefix = match message.role {
                ChatRole::System => &self.system_prefix,
                ChatRole::User => &self.user_prefix,
                ChatRole::Assistant => &self.assistant_prefix,
                ChatRole::Tool => &self.function_result_prefix,
            };
            prompt.push_str(prefix);
            prompt.push_str(&message.content);
            prompt.push('\n');
        }

        let primer = match constraint {
            OutputConstraint::ToolSchema(_) => &self.function_call_prefix,
            OutputConstraint::FreeText => &self.assistant_prefix,
        };
        prompt.push_str(primer.trim_end());
        prompt.push('\n');
        prompt
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window() -> Vec<ChatMessage> {
        vec![
            ChatMessage::new(ChatRole::User, "hello"),
            ChatMessage::new(ChatRole::Assistant, "{\"function\": \"x\"}"),
            ChatMessage::new(ChatRole::Tool, "done"),
        ]
    }

    #[test]
    fn tool_mode_ends_with_function_call_marker() {
        let format = PromptFormat::default();
        let prompt = format.render("sys", &window(), &OutputConstraint::ToolSchema(vec![]));
        assert!(prompt.trim_end().ends_with("### Function Call:"));
        assert!(prompt.contains("### User:\nhello"));
        assert!(prompt.contains("### Function Result:\ndone"));
    }

    #[test]
    fn free_text_mode_ends_with_assistant_marker() {
        let format = PromptFormat::default();
        let prompt = format.render("sys", &window(), &OutputConstraint::FreeText);
        assert!(prompt.trim_end().ends_with("### Assistant:"));
    }

    #[test]
    fn system_prompt_comes_first() {
        let format = PromptFormat::default();
        let prompt = format.render("you are an agent", &[], &OutputConstraint::FreeText);
        assert!(prompt.starts_with("### Instructions:\nyou are an agent"));
    }
}
