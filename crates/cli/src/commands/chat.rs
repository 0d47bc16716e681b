//! `stratamind chat` — interactive read loop or single-message mode.
//!
//! Builds the full agent from configuration: provider, memory tiers
//! (restored from the state directory when present), tool registry, and
//! the conversation controller. The event log and core memory are saved
//! back on exit so the next session resumes with the same memory.

use std::io::Write as _;
use std::sync::Arc;

use stratamind_agent::ConversationController;
use stratamind_config::AppConfig;
use stratamind_core::provider::CompletionProvider;
use stratamind_memory::{ArchivalMemoryStore, CoreMemoryStore, EventLog};
use stratamind_providers::{
    validate_pairing, LlamaServerProvider, OpenAiCompatProvider, ProviderKind,
};
use tracing::info;

pub async fn run(message: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;

    let kind = ProviderKind::parse(&config.provider.kind)
        .ok_or_else(|| format!("unknown provider kind '{}'", config.provider.kind))?;
    validate_pairing(kind, &config.generation)?;
    if let Some(message_settings) = &config.message_generation {
        validate_pairing(kind, message_settings)?;
    }

    let provider: Arc<dyn CompletionProvider> = match kind {
        ProviderKind::LlamaServer => {
            let mut provider = LlamaServerProvider::new(&config.provider.endpoint_url)?;
            if let Some(grammar) = &config.provider.grammar {
                provider = provider.with_grammar(grammar);
            }
            if let Some(api_key) = &config.provider.api_key {
                provider = provider.with_api_key(api_key);
            }
            Arc::new(provider)
        }
        ProviderKind::OpenAiCompat => {
            let api_key = config
                .provider
                .api_key
                .clone()
                .ok_or("provider.api_key is required for openai_compat")?;
            Arc::new(OpenAiCompatProvider::new(
                &config.provider.endpoint_url,
                api_key,
                &config.provider.model,
            )?)
        }
    };

    // Restore persisted tiers when present
    let event_log_path = config.event_log_path();
    let event_log = Arc::new(if event_log_path.exists() {
        EventLog::load(&event_log_path)?
    } else {
        EventLog::new()
    });

    let core_memory_path = config.core_memory_path();
    let core_memory = Arc::new(if core_memory_path.exists() {
        CoreMemoryStore::load(&core_memory_path)?
    } else {
        CoreMemoryStore::new()
    });

    let archival = Arc::new(ArchivalMemoryStore::in_memory());
    let tools = Arc::new(stratamind_tools::memory_registry(
        core_memory.clone(),
        archival.clone(),
        event_log.clone(),
    )?);

    let recall_events = event_log.count().await;
    info!(
        provider = provider.name(),
        recall = recall_events,
        tools = tools.len(),
        "Agent assembled"
    );

    let mut controller = ConversationController::new(
        provider,
        tools,
        event_log.clone(),
        core_memory.clone(),
        archival,
    )
    .with_settings(config.generation.clone())
    .with_max_heartbeats(config.heartbeat.max_heartbeats);
    if let Some(message_settings) = config.message_generation.clone() {
        controller = controller.with_message_settings(message_settings);
    }

    if let Some(text) = message {
        controller.run_turn(&text).await?;
    } else {
        println!();
        println!("  stratamind — interactive mode");
        println!("  Provider: {} ({})", config.provider.kind, config.provider.endpoint_url);
        println!("  Recall events: {recall_events}");
        println!("  Type a message and press Enter. 'exit' to quit.");
        println!();

        let stdin = std::io::stdin();
        loop {
            print!("> ");
            std::io::stdout().flush()?;

            let mut line = String::new();
            if stdin.read_line(&mut line)? == 0 {
                break; // EOF
            }
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if line == "exit" || line == "quit" {
                break;
            }

            if let Err(e) = controller.run_turn(line).await {
                eprintln!("turn failed: {e}");
            }
        }
    }

    event_log.save(&event_log_path).await?;
    core_memory.save(&core_memory_path).await?;
    info!("Session state saved");

    Ok(())
}
