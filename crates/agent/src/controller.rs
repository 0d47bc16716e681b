//! The heartbeat conversation loop.
//!
//! One inbound message drives one turn. Within a turn the controller
//! cycles Generating -> DispatchingTool as long as dispatched tools
//! keep requesting heartbeats, then yields control back to the caller.
//! The loop is iterative, checks a cancellation flag between rounds,
//! and is bounded by a configurable heartbeat limit.
//!
//! Event bookkeeping per round: the raw model output is appended as an
//! AgentMessage, the tool outcome (or the raw text of a tool-free
//! response) as a FunctionMessage. All tier mutations a tool makes are
//! visible to the next round because the window and system prompt are
//! rebuilt from the stores every time.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use tracing::{debug, info, warn};

use stratamind_core::error::{Error, ProviderError};
use stratamind_core::event::EventKind;
use stratamind_core::provider::{
    CompletionProvider, CompletionRequest, GenerationSettings, ModelOutput, OutputConstraint,
};
use stratamind_core::tool::{ToolCall, ToolRegistry};
use stratamind_memory::{ArchivalMemoryStore, CoreMemoryStore, EventLog};
use stratamind_tools::ACTIVATE_MESSAGE_MODE;

use crate::prompt::{PromptAssembler, PromptInputs};

/// The phases a turn moves through. Terminal phase is always Yielded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnPhase {
    AwaitingInput,
    Generating,
    DispatchingTool,
    Yielded,
}

/// Why a turn ended early.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbortReason {
    /// The configured heartbeat limit was reached.
    HeartbeatLimit,
    /// The caller cancelled between heartbeats.
    Cancelled,
}

/// What a completed turn looked like.
#[derive(Debug)]
pub struct TurnOutcome {
    /// Number of generation rounds performed.
    pub rounds: u32,
    /// The user-facing reply, if the turn produced one.
    pub reply: Option<String>,
    /// Set when the turn was aborted rather than finishing naturally.
    pub aborted: Option<AbortReason>,
}

type UserCallback = Arc<dyn Fn(&str) + Send + Sync>;

/// The conversation controller. One instance owns one conversation's
/// tiers; turns run one at a time.
pub struct ConversationController {
    provider: Arc<dyn CompletionProvider>,
    tools: Arc<ToolRegistry>,
    assembler: PromptAssembler,
    event_log: Arc<EventLog>,
    core_memory: Arc<CoreMemoryStore>,
    archival: Arc<ArchivalMemoryStore>,
    settings: GenerationSettings,
    message_settings: GenerationSettings,
    stop: Vec<String>,
    max_heartbeats: u32,
    user_callback: Option<UserCallback>,
    cancel: Arc<AtomicBool>,
}

const DEFAULT_MAX_HEARTBEATS: u32 = 16;

const CORRECTIVE_NOTE: &str = "Your previous output could not be parsed. Respond with either \
plain text or a single JSON object of the form {\"function\": ..., \"arguments\": ...}.";

impl ConversationController {
    pub fn new(
        provider: Arc<dyn CompletionProvider>,
        tools: Arc<ToolRegistry>,
        event_log: Arc<EventLog>,
        core_memory: Arc<CoreMemoryStore>,
        archival: Arc<ArchivalMemoryStore>,
    ) -> Self {
        Self {
            provider,
            tools,
            assembler: PromptAssembler::default(),
            event_log,
            core_memory,
            archival,
            settings: GenerationSettings::default(),
            message_settings: GenerationSettings {
                temperature: 1.0,
                max_tokens: 4096,
                ..GenerationSettings::default()
            },
            stop: vec!["<|endoftext|>".into()],
            max_heartbeats: DEFAULT_MAX_HEARTBEATS,
            user_callback: None,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Override the prompt assembler.
    pub fn with_assembler(mut self, assembler: PromptAssembler) -> Self {
        self.assembler = assembler;
        self
    }

    /// Settings for tool-mode generation rounds.
    pub fn with_settings(mut self, settings: GenerationSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Settings for the nested message-mode generation.
    pub fn with_message_settings(mut self, settings: GenerationSettings) -> Self {
        self.message_settings = settings;
        self
    }

    /// Cap the number of generation rounds per turn.
    pub fn with_max_heartbeats(mut self, max: u32) -> Self {
        self.max_heartbeats = max;
        self
    }

    /// Callback invoked with every user-facing message. Defaults to a
    /// console write when unset.
    pub fn with_user_callback(mut self, callback: UserCallback) -> Self {
        self.user_callback = Some(callback);
        self
    }

    /// A flag the caller can set to abort the turn at the next
    /// heartbeat boundary. Cleared when the abort is taken.
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        self.cancel.clone()
    }

    /// Run one turn for an inbound user message. Returns once the
    /// heartbeat chain yields.
    pub async fn run_turn(&self, message: &str) -> Result<TurnOutcome, Error> {
        let mut phase = TurnPhase::AwaitingInput;
        info!(len = message.len(), ?phase, "Turn started");

        // Counts injected into the prompt describe the state the turn
        // started from; the user message itself is not "previous".
        let recall_baseline = self.event_log.count().await;

        self.event_log
            .append(EventKind::UserMessage, message, serde_json::Map::new())
            .await;

        let definitions = self.tools.definitions();
        let mut rounds: u32 = 0;
        let mut reply = None;
        let mut aborted = None;

        loop {
            if self.cancel.swap(false, Ordering::SeqCst) {
                warn!(rounds, "Turn cancelled between heartbeats");
                aborted = Some(AbortReason::Cancelled);
                break;
            }
            if rounds >= self.max_heartbeats {
                warn!(max = self.max_heartbeats, "Heartbeat limit reached, yielding");
                aborted = Some(AbortReason::HeartbeatLimit);
                break;
            }

            rounds += 1;
            phase = TurnPhase::Generating;
            debug!(round = rounds, ?phase, "Generation round");

            let output = self
                .generate(
                    OutputConstraint::ToolSchema(definitions.clone()),
                    &self.settings,
                    recall_baseline,
                )
                .await?;

            match output {
                ModelOutput::Text(text) => {
                    // Tool-free output is an implicit message to the
                    // user and always ends the chain.
                    self.event_log
                        .append(EventKind::AgentMessage, &text, serde_json::Map::new())
                        .await;
                    self.event_log
                        .append(EventKind::FunctionMessage, &text, serde_json::Map::new())
                        .await;
                    self.deliver(&text);
                    reply = Some(text);
                    break;
                }
                ModelOutput::ToolCall(call) => {
                    let raw = serde_json::to_string(&call)?;
                    self.event_log
                        .append(EventKind::AgentMessage, raw, serde_json::Map::new())
                        .await;

                    phase = TurnPhase::DispatchingTool;
                    debug!(tool = %call.name, ?phase, "Dispatching tool");

                    let tool_call = ToolCall {
                        name: call.name.clone(),
                        arguments: if call.arguments.is_null() {
                            json!({})
                        } else {
                            call.arguments.clone()
                        },
                        request_heartbeat: call.request_heartbeat.unwrap_or(false),
                    };

                    match self.tools.dispatch(&tool_call).await {
                        Ok(result) => {
                            let mut metadata = serde_json::Map::new();
                            metadata.insert("tool".into(), json!(tool_call.name));
                            metadata.insert("success".into(), json!(result.success));
                            metadata.insert(
                                "timestamp".into(),
                                json!(Utc::now().format("%d/%m/%Y, %H:%M:%S").to_string()),
                            );
                            self.event_log
                                .append(EventKind::FunctionMessage, &result.output, metadata)
                                .await;

                            if tool_call.name == ACTIVATE_MESSAGE_MODE {
                                let prose = self.message_mode(recall_baseline).await?;
                                reply = Some(prose);
                                break;
                            }

                            if result.requested_heartbeat {
                                continue;
                            }
                            break;
                        }
                        Err(e) => {
                            // Unknown names and schema violations feed
                            // back to the model as ordinary function
                            // results; they never kill the turn.
                            warn!(tool = %tool_call.name, error = %e, "Tool dispatch failed");
                            self.event_log
                                .append(
                                    EventKind::FunctionMessage,
                                    format!("Tool call failed: {e}"),
                                    serde_json::Map::new(),
                                )
                                .await;
                            if tool_call.request_heartbeat {
                                continue;
                            }
                            break;
                        }
                    }
                }
            }
        }

        phase = TurnPhase::Yielded;
        info!(rounds, ?phase, aborted = ?aborted, "Turn complete");
        Ok(TurnOutcome {
            rounds,
            reply,
            aborted,
        })
    }

    /// One provider round-trip with the prompt rendered from live tier
    /// state. Unparseable output is retried once after a corrective
    /// note; a second failure is a hard turn failure.
    async fn generate(
        &self,
        constraint: OutputConstraint,
        settings: &GenerationSettings,
        recall_baseline: usize,
    ) -> Result<ModelOutput, Error> {
        let request = self
            .build_request(constraint.clone(), settings, recall_baseline)
            .await;

        match self.provider.complete(request).await {
            Ok(output) => Ok(output),
            Err(ProviderError::MalformedOutput(detail)) => {
                warn!(%detail, "Unparseable model output, retrying once");
                self.event_log
                    .append(
                        EventKind::SystemMessage,
                        CORRECTIVE_NOTE,
                        serde_json::Map::new(),
                    )
                    .await;
                let retry = self
                    .build_request(constraint, settings, recall_baseline)
                    .await;
                self.provider.complete(retry).await.map_err(Error::from)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn build_request(
        &self,
        constraint: OutputConstraint,
        settings: &GenerationSettings,
        recall_baseline: usize,
    ) -> CompletionRequest {
        let archival_count = match self.archival.count().await {
            Ok(count) => count,
            Err(e) => {
                warn!(error = %e, "Archival count unavailable, rendering 0");
                0
            }
        };

        let inputs = PromptInputs {
            documentation: self.tools.documentation(),
            core_content: self.core_memory.render().await,
            last_modified: self.core_memory.last_modified().await,
            archival_count,
            recall_count: recall_baseline,
            current_time: Utc::now(),
        };

        CompletionRequest {
            system_prompt: self.assembler.render(&inputs),
            window: self.event_log.window().await,
            settings: settings.clone(),
            constraint,
            stop: self.stop.clone(),
        }
    }

    /// The nested message-mode generation: one free-text round whose
    /// output goes to the human. Never chains.
    async fn message_mode(&self, recall_baseline: usize) -> Result<String, Error> {
        let output = self
            .generate(
                OutputConstraint::FreeText,
                &self.message_settings,
                recall_baseline,
            )
            .await?;

        let text = match output {
            ModelOutput::Text(text) => text,
            // Free-text mode should not produce a call; keep the raw
            // form rather than dropping it.
            ModelOutput::ToolCall(call) => serde_json::to_string(&call)?,
        };

        self.event_log
            .append(EventKind::AgentMessage, &text, serde_json::Map::new())
            .await;
        self.deliver(&text);
        Ok(text)
    }

    fn deliver(&self, text: &str) {
        match &self.user_callback {
            Some(callback) => callback(text),
            None => println!("{text}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use stratamind_core::event::Event;
    use stratamind_core::provider::ModelToolCall;

    /// A provider that replays a fixed script and records every request
    /// it received.
    struct ScriptedProvider {
        script: Mutex<VecDeque<Result<ModelOutput, ProviderError>>>,
        requests: Mutex<Vec<CompletionRequest>>,
    }

    impl ScriptedProvider {
        fn new(steps: Vec<Result<ModelOutput, ProviderError>>) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(steps.into()),
                requests: Mutex::new(Vec::new()),
            })
        }

        fn requests(&self) -> Vec<CompletionRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl CompletionProvider for ScriptedProvider {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn complete(
            &self,
            request: CompletionRequest,
        ) -> Result<ModelOutput, ProviderError> {
            self.requests.lock().unwrap().push(request);
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(ModelOutput::Text("script exhausted".into())))
        }
    }

    fn text(s: &str) -> Result<ModelOutput, ProviderError> {
        Ok(ModelOutput::Text(s.into()))
    }

    fn tool_call(
        name: &str,
        arguments: serde_json::Value,
        heartbeat: bool,
    ) -> Result<ModelOutput, ProviderError> {
        Ok(ModelOutput::ToolCall(ModelToolCall {
            name: name.into(),
            arguments,
            request_heartbeat: Some(heartbeat),
            reasoning: None,
        }))
    }

    struct Harness {
        controller: ConversationController,
        provider: Arc<ScriptedProvider>,
        log: Arc<EventLog>,
        sent: Arc<Mutex<Vec<String>>>,
    }

    fn harness(steps: Vec<Result<ModelOutput, ProviderError>>) -> Harness {
        let provider = ScriptedProvider::new(steps);
        let log = Arc::new(EventLog::new());
        let core = Arc::new(CoreMemoryStore::new());
        let archival = Arc::new(ArchivalMemoryStore::in_memory());
        let tools = Arc::new(
            stratamind_tools::memory_registry(core.clone(), archival.clone(), log.clone())
                .unwrap(),
        );

        let sent = Arc::new(Mutex::new(Vec::new()));
        let sent_clone = sent.clone();
        let controller = ConversationController::new(
            provider.clone(),
            tools,
            log.clone(),
            core,
            archival,
        )
        .with_user_callback(Arc::new(move |text: &str| {
            sent_clone.lock().unwrap().push(text.to_string());
        }));

        Harness {
            controller,
            provider,
            log,
            sent,
        }
    }

    fn kinds(events: &[Event]) -> Vec<EventKind> {
        events.iter().map(|e| e.kind).collect()
    }

    #[tokio::test]
    async fn hello_on_empty_log_renders_zero_counts() {
        let h = harness(vec![text("Hello! How can I help?")]);

        let outcome = h.controller.run_turn("Hello").await.unwrap();
        assert_eq!(outcome.rounds, 1);
        assert!(outcome.aborted.is_none());
        assert_eq!(outcome.reply.as_deref(), Some("Hello! How can I help?"));

        // Exactly one provider invocation before any dispatch
        let requests = h.provider.requests();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].system_prompt.contains("0 previous messages"));
        assert!(requests[0].system_prompt.contains("0 total memories"));

        // UserMessage first, then the raw output and its echo as a
        // function result
        let events = h.log.all().await;
        assert_eq!(
            kinds(&events),
            vec![
                EventKind::UserMessage,
                EventKind::AgentMessage,
                EventKind::FunctionMessage,
            ]
        );
        assert_eq!(h.sent.lock().unwrap().as_slice(), ["Hello! How can I help?"]);
    }

    #[tokio::test]
    async fn heartbeat_chain_runs_exactly_n_rounds() {
        let note = serde_json::json!({"section": "progress", "text": "step"});
        let h = harness(vec![
            tool_call("core_memory_append", note.clone(), true),
            tool_call("core_memory_append", note.clone(), true),
            tool_call("core_memory_append", note, false),
        ]);

        let outcome = h.controller.run_turn("work on it").await.unwrap();
        assert_eq!(outcome.rounds, 3);
        assert!(outcome.aborted.is_none());
        assert_eq!(h.provider.requests().len(), 3);

        // User + 3 x (AgentMessage + FunctionMessage)
        assert_eq!(h.log.count().await, 7);
    }

    #[tokio::test]
    async fn tier_mutations_are_visible_to_the_next_round() {
        let h = harness(vec![
            tool_call(
                "archival_memory_insert",
                serde_json::json!({"text": "the keeper hums at dusk"}),
                true,
            ),
            text("noted"),
        ]);

        h.controller.run_turn("remember this").await.unwrap();

        let requests = h.provider.requests();
        assert_eq!(requests.len(), 2);
        assert!(requests[0].system_prompt.contains("0 total memories"));
        assert!(requests[1].system_prompt.contains("1 total memories"));
        // The window for round two carries the function result
        assert!(requests[1]
            .window
            .iter()
            .any(|m| m.content.contains("archival memory")));
    }

    #[tokio::test]
    async fn message_mode_yields_after_one_nested_generation() {
        // Heartbeat requested on the call, but the tool forces it off
        let h = harness(vec![
            tool_call(ACTIVATE_MESSAGE_MODE, serde_json::json!({}), true),
            text("The harbor is quiet tonight."),
        ]);

        let outcome = h.controller.run_turn("talk to me").await.unwrap();
        assert_eq!(outcome.rounds, 1);
        assert_eq!(
            outcome.reply.as_deref(),
            Some("The harbor is quiet tonight.")
        );

        let requests = h.provider.requests();
        assert_eq!(requests.len(), 2);
        assert!(matches!(
            requests[1].constraint,
            OutputConstraint::FreeText
        ));

        // The prose lands in the log and reaches the user
        let events = h.log.all().await;
        assert_eq!(
            kinds(&events),
            vec![
                EventKind::UserMessage,
                EventKind::AgentMessage,
                EventKind::FunctionMessage,
                EventKind::AgentMessage,
            ]
        );
        assert_eq!(events[2].content, "Message mode activated.");
        assert_eq!(
            h.sent.lock().unwrap().as_slice(),
            ["The harbor is quiet tonight."]
        );
    }

    #[tokio::test]
    async fn unknown_tool_becomes_a_function_event_not_a_crash() {
        let provider = ScriptedProvider::new(vec![tool_call(
            "nonexistent_tool",
            serde_json::json!({}),
            false,
        )]);
        let log = Arc::new(EventLog::new());
        let core = Arc::new(CoreMemoryStore::new());
        let archival = Arc::new(ArchivalMemoryStore::in_memory());

        // Registry containing only the message-mode switch
        let mut registry = ToolRegistry::new();
        registry
            .register(Box::new(stratamind_tools::ActivateMessageModeTool))
            .unwrap();

        let controller = ConversationController::new(
            provider,
            Arc::new(registry),
            log.clone(),
            core,
            archival,
        );

        let outcome = controller.run_turn("hi").await.unwrap();
        assert_eq!(outcome.rounds, 1);

        let events = log.all().await;
        let function_event = events
            .iter()
            .find(|e| e.kind == EventKind::FunctionMessage)
            .unwrap();
        assert!(function_event.content.contains("Unknown tool"));
    }

    #[tokio::test]
    async fn invalid_arguments_continue_the_chain_when_heartbeat_requested() {
        let h = harness(vec![
            // Missing the required 'text' argument
            tool_call(
                "core_memory_append",
                serde_json::json!({"section": "progress"}),
                true,
            ),
            text("recovered"),
        ]);

        let outcome = h.controller.run_turn("go").await.unwrap();
        assert_eq!(outcome.rounds, 2);
        assert_eq!(outcome.reply.as_deref(), Some("recovered"));

        let events = h.log.all().await;
        assert!(events
            .iter()
            .any(|e| e.kind == EventKind::FunctionMessage
                && e.content.contains("Invalid tool arguments")));
    }

    #[tokio::test]
    async fn malformed_output_is_retried_once_with_a_corrective_note() {
        let h = harness(vec![
            Err(ProviderError::MalformedOutput("not json".into())),
            text("recovered"),
        ]);

        let outcome = h.controller.run_turn("hi").await.unwrap();
        assert_eq!(outcome.rounds, 1);
        assert_eq!(outcome.reply.as_deref(), Some("recovered"));
        assert_eq!(h.provider.requests().len(), 2);

        let events = h.log.all().await;
        assert!(events
            .iter()
            .any(|e| e.kind == EventKind::SystemMessage
                && e.content.contains("could not be parsed")));
    }

    #[tokio::test]
    async fn second_malformed_output_fails_the_turn() {
        let h = harness(vec![
            Err(ProviderError::MalformedOutput("still broken".into())),
            Err(ProviderError::MalformedOutput("still broken".into())),
        ]);

        let err = h.controller.run_turn("hi").await.unwrap_err();
        assert!(matches!(
            err,
            Error::Provider(ProviderError::MalformedOutput(_))
        ));
    }

    #[tokio::test]
    async fn heartbeat_limit_aborts_the_turn() {
        let note = serde_json::json!({"section": "progress", "text": "again"});
        let steps: Vec<_> = (0..10)
            .map(|_| tool_call("core_memory_append", note.clone(), true))
            .collect();

        let h = harness(steps);
        let controller = h.controller.with_max_heartbeats(3);

        let outcome = controller.run_turn("loop forever").await.unwrap();
        assert_eq!(outcome.rounds, 3);
        assert_eq!(outcome.aborted, Some(AbortReason::HeartbeatLimit));
        assert_eq!(h.provider.requests().len(), 3);
    }

    #[tokio::test]
    async fn cancellation_is_taken_at_the_loop_boundary() {
        let h = harness(vec![text("never reached")]);
        let flag = h.controller.cancel_flag();
        flag.store(true, Ordering::SeqCst);

        let outcome = h.controller.run_turn("hi").await.unwrap();
        assert_eq!(outcome.rounds, 0);
        assert_eq!(outcome.aborted, Some(AbortReason::Cancelled));
        assert!(h.provider.requests().is_empty());

        // Flag is consumed; the next turn runs normally
        let outcome = h.controller.run_turn("hi again").await.unwrap();
        assert!(outcome.aborted.is_none());
    }

    #[tokio::test]
    async fn recall_count_reflects_history_from_prior_turns() {
        let h = harness(vec![text("first reply"), text("second reply")]);

        h.controller.run_turn("first").await.unwrap();
        h.controller.run_turn("second").await.unwrap();

        let requests = h.provider.requests();
        assert_eq!(requests.len(), 2);
        // Turn one left 3 events behind
        assert!(requests[1].system_prompt.contains("3 previous messages"));
    }
}
