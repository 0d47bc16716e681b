//! CompletionProvider trait — the abstraction over text-generation backends.
//!
//! A provider accepts a fully rendered system prompt plus the message
//! window and returns either plain prose or a structured tool call. The
//! agent loop calls `complete()` without knowing which backend is being
//! used.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;
use crate::message::ChatMessage;

/// Sampling and length settings for one generation call.
///
/// The optional sampler fields (top_k, min_p, tfs_z, repeat_penalty,
/// repeat_last_n) are only honored by llama-server style backends;
/// `stratamind_providers::validate_pairing` rejects them for other kinds
/// before anything is constructed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationSettings {
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_top_p")]
    pub top_p: f32,

    /// Maximum tokens to generate.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_p: Option<f32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tfs_z: Option<f32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repeat_penalty: Option<f32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repeat_last_n: Option<u32>,
}

fn default_temperature() -> f32 {
    0.75
}
fn default_top_p() -> f32 {
    0.85
}
fn default_max_tokens() -> u32 {
    1024
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            temperature: default_temperature(),
            top_p: default_top_p(),
            max_tokens: default_max_tokens(),
            top_k: None,
            min_p: None,
            tfs_z: None,
            repeat_penalty: None,
            repeat_last_n: None,
        }
    }
}

impl GenerationSettings {
    /// True when any llama-server-only sampler is set.
    pub fn uses_extended_samplers(&self) -> bool {
        self.top_k.is_some()
            || self.min_p.is_some()
            || self.tfs_z.is_some()
            || self.repeat_penalty.is_some()
            || self.repeat_last_n.is_some()
    }
}

/// A tool definition sent to the model so it knows what it can call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    /// JSON Schema describing the tool's parameters.
    pub parameters: serde_json::Value,
}

/// How the model's output is constrained for one generation call.
#[derive(Debug, Clone)]
pub enum OutputConstraint {
    /// Constrain generation to the registered tool schemas. The backend
    /// decides how (grammar, native tool calling, prompt marker).
    ToolSchema(Vec<ToolDefinition>),
    /// Free-form prose, no tool-call continuation marker. Used by the
    /// message mode so the next output is meant for the human.
    FreeText,
}

/// A request for one generation round-trip.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    /// The rendered system prompt (re-rendered before every call).
    pub system_prompt: String,

    /// The message window, rebuilt from the event log.
    pub window: Vec<ChatMessage>,

    pub settings: GenerationSettings,

    pub constraint: OutputConstraint,

    /// Additional stop sequences for this call.
    pub stop: Vec<String>,
}

/// A structured tool invocation emitted by the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelToolCall {
    /// The tool name.
    #[serde(alias = "function")]
    pub name: String,

    /// Arguments as a JSON object.
    #[serde(default = "empty_arguments", alias = "params")]
    pub arguments: serde_json::Value,

    /// The outer heartbeat request: true asks the runtime to hand
    /// control straight back after the tool runs.
    #[serde(default)]
    pub request_heartbeat: Option<bool>,

    /// The model's step-by-step planning text, if it emitted any.
    #[serde(default, alias = "thoughts_and_reasoning")]
    pub reasoning: Option<String>,
}

fn empty_arguments() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}

/// What the model produced: prose or a structured call.
#[derive(Debug, Clone)]
pub enum ModelOutput {
    Text(String),
    ToolCall(ModelToolCall),
}

/// A single chunk in a streaming response.
#[derive(Debug, Clone)]
pub struct StreamChunk {
    /// Partial content delta.
    pub content: String,
    /// Whether this is the final chunk.
    pub done: bool,
}

/// The completion provider boundary.
///
/// Implementations live in `stratamind-providers`; tests use scripted
/// in-process fakes.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// A human-readable name for this provider (e.g., "llama_server").
    fn name(&self) -> &str;

    /// Send a request and get the complete output.
    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> std::result::Result<ModelOutput, ProviderError>;

    /// Send a request and get a stream of chunks.
    ///
    /// Default implementation calls `complete()` and emits the result as
    /// one chunk; tool calls are streamed as their JSON serialization.
    async fn stream(
        &self,
        request: CompletionRequest,
    ) -> std::result::Result<
        tokio::sync::mpsc::Receiver<std::result::Result<StreamChunk, ProviderError>>,
        ProviderError,
    > {
        let output = self.complete(request).await?;
        let content = match output {
            ModelOutput::Text(text) => text,
            ModelOutput::ToolCall(call) => serde_json::to_string(&call)
                .map_err(|e| ProviderError::MalformedOutput(e.to_string()))?,
        };
        let (tx, rx) = tokio::sync::mpsc::channel(1);
        let _ = tx.send(Ok(StreamChunk { content, done: true })).await;
        Ok(rx)
    }
}
