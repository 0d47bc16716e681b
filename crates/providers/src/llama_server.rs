//! llama.cpp server provider.
//!
//! Talks to a llama.cpp server's `/completion` endpoint: the message
//! window is flattened into one prompt by `PromptFormat`, the sampler
//! settings map straight onto the server's fields, and an optional
//! grammar string constrains generation to the tool-call shape when the
//! request carries a tool schema.

use async_trait::async_trait;
use serde::Deserialize;
use stratamind_core::error::ProviderError;
use stratamind_core::provider::{
    CompletionProvider, CompletionRequest, ModelOutput, OutputConstraint,
};
use tracing::{debug, warn};

use crate::format::PromptFormat;
use crate::parse::parse_model_output;

/// A llama.cpp server backend.
pub struct LlamaServerProvider {
    endpoint_url: String,
    client: reqwest::Client,
    format: PromptFormat,
    grammar: Option<String>,
    api_key: Option<String>,
}

#[derive(Deserialize)]
struct CompletionPayload {
    content: String,
}

impl LlamaServerProvider {
    pub fn new(endpoint_url: impl Into<String>) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(300))
            .build()
            .map_err(|e| ProviderError::NotConfigured(format!("HTTP client: {e}")))?;
        Ok(Self {
            endpoint_url: endpoint_url.into().trim_end_matches('/').to_string(),
            client,
            format: PromptFormat::default(),
            grammar: None,
            api_key: None,
        })
    }

    /// Set a grammar string to constrain tool-mode generation.
    pub fn with_grammar(mut self, grammar: impl Into<String>) -> Self {
        self.grammar = Some(grammar.into());
        self
    }

    /// Set a bearer token for servers that require one.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Override the prompt format.
    pub fn with_format(mut self, format: PromptFormat) -> Self {
        self.format = format;
        self
    }

    fn build_body(&self, request: &CompletionRequest) -> serde_json::Value {
        let prompt = self
            .format
            .render(&request.system_prompt, &request.window, &request.constraint);

        let mut stop: Vec<String> = self.format.stop_sequences.clone();
        stop.extend(request.stop.iter().cloned());

        let settings = &request.settings;
        let mut body = serde_json::json!({
            "prompt": prompt,
            "temperature": settings.temperature,
            "top_p": settings.top_p,
            "n_predict": settings.max_tokens,
            "stop": stop,
        });

        if let Some(top_k) = settings.top_k {
            body["top_k"] = serde_json::json!(top_k);
        }
        if let Some(min_p) = settings.min_p {
            body["min_p"] = serde_json::json!(min_p);
        }
        if let Some(tfs_z) = settings.tfs_z {
            body["tfs_z"] = serde_json::json!(tfs_z);
        }
        if let Some(repeat_penalty) = settings.repeat_penalty {
            body["repeat_penalty"] = serde_json::json!(repeat_penalty);
        }
        if let Some(repeat_last_n) = settings.repeat_last_n {
            body["repeat_last_n"] = serde_json::json!(repeat_last_n);
        }

        if matches!(request.constraint, OutputConstraint::ToolSchema(_)) {
            if let Some(grammar) = &self.grammar {
                body["grammar"] = serde_json::json!(grammar);
            }
        }

        body
    }
}

#[async_trait]
impl CompletionProvider for LlamaServerProvider {
    fn name(&self) -> &str {
        "llama_server"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<ModelOutput, ProviderError> {
        let url = format!("{}/completion", self.endpoint_url);
        let free_text = matches!(request.constraint, OutputConstraint::FreeText);
        let body = self.build_body(&request);

        debug!(url = %url, window = request.window.len(), "Sending completion request");

        let mut http = self.client.post(&url).json(&body);
        if let Some(key) = &self.api_key {
            http = http.header("Authorization", format!("Bearer {key}"));
        }

        let response = http.send().await.map_err(|e| {
            if e.is_timeout() {
                ProviderError::Timeout(e.to_string())
            } else {
                ProviderError::Network(e.to_string())
            }
        })?;

        let status = response.status().as_u16();
        if status != 200 {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "llama server returned error");
            return Err(ProviderError::ApiError {
                status_code: status,
                message: error_body,
            });
        }

        let payload: CompletionPayload = response
            .json()
            .await
            .map_err(|e| ProviderError::Network(format!("invalid completion payload: {e}")))?;

        if free_text {
            Ok(ModelOutput::Text(payload.content.trim().to_string()))
        } else {
            parse_model_output(&payload.content)
        }
    }
}
