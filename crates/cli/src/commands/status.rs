//! `stratamind status` — show memory tier counts and configuration.

use stratamind_config::AppConfig;
use stratamind_memory::{CoreMemoryStore, EventLog};

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;

    println!("stratamind status");
    println!("  config:   {}", AppConfig::config_path().display());
    println!("  provider: {} ({})", config.provider.kind, config.provider.endpoint_url);
    println!("  max heartbeats per turn: {}", config.heartbeat.max_heartbeats);

    let event_log_path = config.event_log_path();
    match EventLog::load(&event_log_path) {
        Ok(log) => {
            let count = log.count().await;
            println!("  recall events: {count}");
        }
        Err(_) => println!("  recall events: 0 (no saved log at {})", event_log_path.display()),
    }

    let core_memory_path = config.core_memory_path();
    match CoreMemoryStore::load(&core_memory_path) {
        Ok(store) => {
            let size = store.size().await;
            let last_modified = store.last_modified().await;
            println!("  core memory size: {size} chars");
            println!("  core memory last modified: {last_modified}");
        }
        Err(_) => println!(
            "  core memory: empty (no saved store at {})",
            core_memory_path.display()
        ),
    }

    Ok(())
}
