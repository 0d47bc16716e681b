//! The stratamind agent loop.
//!
//! Two pieces: [`PromptAssembler`], which renders the live system
//! prompt from the memory tiers, and [`ConversationController`], the
//! heartbeat state machine that drives generation and tool dispatch
//! for one turn at a time:
//!
//! 1. **Receive** a user message, append it to the event log
//! 2. **Render** the system prompt from live tier state and rebuild the
//!    window from the log
//! 3. **Generate** with the tool-schema constraint
//! 4. **Dispatch** the resulting tool call; if it requests a heartbeat,
//!    loop back to step 2 without returning control
//! 5. **Yield** on a tool-free response, a non-heartbeat tool, message
//!    mode, cancellation, or the heartbeat limit

pub mod controller;
pub mod prompt;

pub use controller::{AbortReason, ConversationController, TurnOutcome, TurnPhase};
pub use prompt::{PromptAssembler, PromptInputs, DEFAULT_SYSTEM_TEMPLATE};
