//! Provider kinds and the settings-pairing check.
//!
//! Generation settings carry optional samplers that only the llama
//! server honors. Pairing them with another provider kind is a
//! configuration mistake, caught once here before any component is
//! constructed instead of ad hoc in constructors.

use serde::{Deserialize, Serialize};
use stratamind_core::error::ConfigError;
use stratamind_core::provider::GenerationSettings;

/// Which completion backend to talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    /// llama.cpp server `/completion` endpoint, raw prompt in.
    LlamaServer,
    /// Any OpenAI-compatible `/v1/chat/completions` endpoint.
    OpenAiCompat,
}

impl ProviderKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "llama_server" => Some(Self::LlamaServer),
            "openai_compat" => Some(Self::OpenAiCompat),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LlamaServer => "llama_server",
            Self::OpenAiCompat => "openai_compat",
        }
    }
}

/// Validate that `settings` make sense for `kind`.
///
/// Returns a tagged error instead of panicking or deferring to the
/// backend; call this before constructing the provider.
pub fn validate_pairing(
    kind: ProviderKind,
    settings: &GenerationSettings,
) -> Result<(), ConfigError> {
    match kind {
        ProviderKind::LlamaServer => Ok(()),
        ProviderKind::OpenAiCompat => {
            if settings.uses_extended_samplers() {
                Err(ConfigError::IncompatibleSettings {
                    kind: kind.as_str().into(),
                    reason: "top_k/min_p/tfs_z/repeat_penalty are llama-server-only samplers"
                        .into(),
                })
            } else {
                Ok(())
            }
        }
    }
}
