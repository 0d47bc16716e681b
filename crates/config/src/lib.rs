//! Configuration loading, validation, and management for stratamind.
//!
//! Loads configuration from `~/.stratamind/config.toml` with
//! environment variable overrides. Validates all settings at startup,
//! before any component is constructed.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use stratamind_core::error::ConfigError;
use stratamind_core::provider::GenerationSettings;

/// The root configuration structure.
///
/// Maps directly to `~/.stratamind/config.toml`.
#[derive(Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    /// Completion provider configuration
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Settings for tool-mode generation rounds
    #[serde(default)]
    pub generation: GenerationSettings,

    /// Settings for the nested message-mode generation; falls back to
    /// the controller defaults when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_generation: Option<GenerationSettings>,

    /// Heartbeat loop configuration
    #[serde(default)]
    pub heartbeat: HeartbeatConfig,

    /// State persistence configuration
    #[serde(default)]
    pub state: StateConfig,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Provider kind: "llama_server" or "openai_compat"
    #[serde(default = "default_provider_kind")]
    pub kind: String,

    /// Endpoint base URL
    #[serde(default = "default_endpoint_url")]
    pub endpoint_url: String,

    /// API key, if the endpoint needs one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Model name, used by openai_compat endpoints
    #[serde(default = "default_model")]
    pub model: String,

    /// Optional grammar string constraining tool-mode generation
    /// (llama_server only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grammar: Option<String>,
}

fn default_provider_kind() -> String {
    "llama_server".into()
}
fn default_endpoint_url() -> String {
    "http://127.0.0.1:8080".into()
}
fn default_model() -> String {
    "local".into()
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            kind: default_provider_kind(),
            endpoint_url: default_endpoint_url(),
            api_key: None,
            model: default_model(),
            grammar: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeartbeatConfig {
    /// Maximum generation rounds per turn before the loop yields
    #[serde(default = "default_max_heartbeats")]
    pub max_heartbeats: u32,
}

fn default_max_heartbeats() -> u32 {
    16
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            max_heartbeats: default_max_heartbeats(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StateConfig {
    /// Directory holding the persisted stores; defaults to
    /// `~/.stratamind/state`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
}

/// Redact a secret for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("provider", &self.provider)
            .field("generation", &self.generation)
            .field("message_generation", &self.message_generation)
            .field("heartbeat", &self.heartbeat)
            .field("state", &self.state)
            .finish()
    }
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("kind", &self.kind)
            .field("endpoint_url", &self.endpoint_url)
            .field("api_key", &redact(&self.api_key))
            .field("model", &self.model)
            .field("grammar", &self.grammar.as_deref().map(|_| "..."))
            .finish()
    }
}

impl AppConfig {
    /// The configuration directory: `~/.stratamind`.
    pub fn config_dir() -> PathBuf {
        let home = std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string());
        PathBuf::from(home).join(".stratamind")
    }

    pub fn config_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// Where the persisted stores live.
    pub fn state_dir(&self) -> PathBuf {
        self.state
            .dir
            .clone()
            .unwrap_or_else(|| Self::config_dir().join("state"))
    }

    pub fn event_log_path(&self) -> PathBuf {
        self.state_dir().join("events.json")
    }

    pub fn core_memory_path(&self) -> PathBuf {
        self.state_dir().join("core_memory.json")
    }

    /// Load from the default path, falling back to defaults when no
    /// file exists, then apply environment overrides and validate.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::config_path())
    }

    /// Load from an explicit path (missing file = defaults).
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let mut config = match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content)
                .map_err(|e| ConfigError::Invalid(format!("{}: {e}", path.display())))?,
            Err(_) => Self::default(),
        };
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(kind) = std::env::var("STRATAMIND_PROVIDER") {
            self.provider.kind = kind;
        }
        if let Ok(url) = std::env::var("STRATAMIND_ENDPOINT_URL") {
            self.provider.endpoint_url = url;
        }
        if let Ok(key) = std::env::var("STRATAMIND_API_KEY") {
            self.provider.api_key = Some(key);
        }
    }

    /// Structural validation. The provider/settings pairing check lives
    /// in `stratamind_providers::validate_pairing` and runs next.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !matches!(self.provider.kind.as_str(), "llama_server" | "openai_compat") {
            return Err(ConfigError::Invalid(format!(
                "unknown provider kind '{}'",
                self.provider.kind
            )));
        }
        if self.provider.endpoint_url.is_empty() {
            return Err(ConfigError::Invalid("provider.endpoint_url is empty".into()));
        }
        if self.heartbeat.max_heartbeats == 0 {
            return Err(ConfigError::Invalid(
                "heartbeat.max_heartbeats must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Write the current configuration to `path`.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| ConfigError::Invalid(format!("create config dir: {e}")))?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::Invalid(format!("serialize config: {e}")))?;
        std::fs::write(path, content)
            .map_err(|e| ConfigError::Invalid(format!("write config: {e}")))?;
        Ok(())
    }
}
