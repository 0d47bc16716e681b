//! OpenAI-compatible chat provider.
//!
//! Works with any endpoint exposing `/v1/chat/completions` (OpenAI,
//! OpenRouter, vLLM, Ollama). The tool protocol stays JSON-in-text: the
//! assistant's reply is decoded with the same parser as the llama
//! backend, so both kinds behave identically from the controller's
//! point of view.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use stratamind_core::error::ProviderError;
use stratamind_core::message::{ChatMessage, ChatRole};
use stratamind_core::provider::{
    CompletionProvider, CompletionRequest, ModelOutput, OutputConstraint,
};
use tracing::{debug, warn};

use crate::parse::parse_model_output;

/// An OpenAI-compatible chat backend.
pub struct OpenAiCompatProvider {
    base_url: String,
    api_key: String,
    model: String,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct ApiMessage {
    role: &'static str,
    content: String,
}

#[derive(Deserialize)]
struct ApiResponse {
    choices: Vec<ApiChoice>,
}

#[derive(Deserialize)]
struct ApiChoice {
    message: ApiChoiceMessage,
}

#[derive(Deserialize)]
struct ApiChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

impl OpenAiCompatProvider {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .map_err(|e| ProviderError::NotConfigured(format!("HTTP client: {e}")))?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: model.into(),
            client,
        })
    }

    fn to_api_messages(system_prompt: &str, window: &[ChatMessage]) -> Vec<ApiMessage> {
        let mut messages = vec![ApiMessage {
            role: "system",
            content: system_prompt.to_string(),
        }];
        for message in window {
            messages.push(ApiMessage {
                role: match message.role {
                    ChatRole::User => "user",
                    ChatRole::Assistant => "assistant",
                    ChatRole::System => "system",
                    // No native tool-call ids in the JSON-in-text
                    // protocol, so results ride along as user turns.
                    ChatRole::Tool => "user",
                },
                content: message.content.clone(),
            });
        }
        messages
    }
}

#[async_trait]
impl CompletionProvider for OpenAiCompatProvider {
    fn name(&self) -> &str {
        "openai_compat"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<ModelOutput, ProviderError> {
        let url = format!("{}/chat/completions", self.base_url);
        let free_text = matches!(request.constraint, OutputConstraint::FreeText);

        let mut body = serde_json::json!({
            "model": self.model,
            "messages": Self::to_api_messages(&request.system_prompt, &request.window),
            "temperature": request.settings.temperature,
            "top_p": request.settings.top_p,
            "max_tokens": request.settings.max_tokens,
            "stream": false,
        });
        if !request.stop.is_empty() {
            body["stop"] = serde_json::json!(request.stop);
        }

        debug!(url = %url, model = %self.model, "Sending chat completion request");

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Timeout(e.to_string())
                } else {
                    ProviderError::Network(e.to_string())
                }
            })?;

        let status = response.status().as_u16();
        if status != 200 {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "Chat endpoint returned error");
            return Err(ProviderError::ApiError {
                status_code: status,
                message: error_body,
            });
        }

        let payload: ApiResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Network(format!("invalid chat payload: {e}")))?;

        let content = payload
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| ProviderError::MalformedOutput("empty choices in response".into()))?;

        if free_text {
            Ok(ModelOutput::Text(content.trim().to_string()))
        } else {
            parse_model_output(&content)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_roles_map_to_api_roles() {
        let window = vec![
            ChatMessage::new(ChatRole::User, "hi"),
            ChatMessage::new(ChatRole::Assistant, "{\"function\":\"x\"}"),
            ChatMessage::new(ChatRole::Tool, "ok"),
        ];
        let messages = OpenAiCompatProvider::to_api_messages("sys", &window);
        assert_eq!(messages.len(), 4);
        assert_eq!(messages[0].role, "system");
        assert_eq!(messages[1].role, "user");
        assert_eq!(messages[2].role, "assistant");
        assert_eq!(messages[3].role, "user");
    }

    #[test]
    fn base_url_is_normalized() {
        let provider =
            OpenAiCompatProvider::new("https://api.example.com/v1/", "key", "model").unwrap();
        assert_eq!(provider.base_url, "https://api.example.com/v1");
    }
}
