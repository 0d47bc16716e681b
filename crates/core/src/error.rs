//! Error types for the stratamind domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant.

use thiserror::Error;

/// The top-level error type for all stratamind operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Provider errors ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    // --- Memory errors ---
    #[error("Memory error: {0}")]
    Memory(#[from] MemoryError),

    // --- Tool errors ---
    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    // --- Configuration errors ---
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    /// The model produced output that is neither plain text nor a
    /// parseable tool call. The controller retries this once with a
    /// corrective note before failing the turn.
    #[error("Model output is not plain text or a valid tool call: {0}")]
    MalformedOutput(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),
}

#[derive(Debug, Error)]
pub enum MemoryError {
    #[error("Storage error: {0}")]
    Storage(String),

    /// A core memory edit referenced text that is not present in the
    /// target section.
    #[error("Text not found in section '{section}': {text}")]
    NotFound { section: String, text: String },

    #[error("Similarity backend unavailable: {0}")]
    BackendUnavailable(String),
}

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Duplicate tool name: {0}")]
    DuplicateName(String),

    #[error("Invalid tool arguments: {0}")]
    InvalidArguments(String),

    #[error("Tool execution failed: {tool_name}: {reason}")]
    ExecutionFailed { tool_name: String, reason: String },
}

#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    #[error("Incompatible generation settings for provider kind '{kind}': {reason}")]
    IncompatibleSettings { kind: String, reason: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
