//! The message-mode switch.
//!
//! Everything the agent does is invisible to the human except what it
//! sends through message mode. Dispatching this tool tells the
//! controller to run one free-form generation addressed to the user and
//! then end the turn; it can never request another heartbeat, so the
//! agent cannot chain narrative generations forever.

use async_trait::async_trait;
use serde_json::json;
use stratamind_core::error::ToolError;
use stratamind_core::tool::{Tool, ToolOutput};

/// Name the controller matches on to trigger the nested generation.
pub const ACTIVATE_MESSAGE_MODE: &str = "activate_message_mode";

pub struct ActivateMessageModeTool;

#[async_trait]
impl Tool for ActivateMessageModeTool {
    fn name(&self) -> &str {
        ACTIVATE_MESSAGE_MODE
    }

    fn description(&self) -> &str {
        "Activate the message mode. Your next output will be free-form prose sent \
         directly to the user; this always ends the current chain of actions."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({ "type": "object", "properties": {} })
    }

    fn allows_heartbeat(&self) -> bool {
        false
    }

    async fn execute(&self, _arguments: serde_json::Value) -> Result<ToolOutput, ToolError> {
        Ok(ToolOutput::ok("Message mode activated."))
    }
}
