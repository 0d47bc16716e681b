//! # stratamind Core
//!
//! Domain types, traits, and error definitions for the stratamind
//! tiered-memory agent runtime. This crate carries no framework
//! dependencies; it defines the domain model that all other crates
//! implement against.
//!
//! ## Design Philosophy
//!
//! Every external seam is defined as a trait here: the completion
//! provider, the tool surface, the similarity index behind the archival
//! tier. Implementations live in their respective crates; all crates
//! depend inward on core.

pub mod error;
pub mod event;
pub mod memory;
pub mod message;
pub mod provider;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use error::{ConfigError, Error, MemoryError, ProviderError, Result, ToolError};
pub use event::{Event, EventKind};
pub use memory::{ArchivalEntry, SimilarityIndex};
pub use message::{ChatMessage, ChatRole};
pub use provider::{
    CompletionProvider, CompletionRequest, GenerationSettings, ModelOutput, ModelToolCall,
    OutputConstraint, StreamChunk, ToolDefinition,
};
pub use tool::{Tool, ToolCall, ToolOutput, ToolRegistry, ToolResult};
