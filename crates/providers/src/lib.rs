//! Completion provider implementations for stratamind.
//!
//! All providers implement `stratamind_core::CompletionProvider`. The
//! settings-pairing check runs once, before construction; the output
//! parser is shared so every backend reports the same taxonomy of
//! malformed output.

pub mod format;
pub mod llama_server;
pub mod openai_compat;
pub mod parse;
pub mod settings;

pub use format::PromptFormat;
pub use llama_server::LlamaServerProvider;
pub use openai_compat::OpenAiCompatProvider;
pub use parse::parse_model_output;
pub use settings::{validate_pairing, ProviderKind};
