//! `stratamind onboard` — write a default config and state directory.

use stratamind_config::AppConfig;

pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = AppConfig::config_path();

    if config_path.exists() {
        println!("Config already exists at {}", config_path.display());
    } else {
        let config = AppConfig::default();
        config.save_to(&config_path)?;
        println!("Wrote default config to {}", config_path.display());
    }

    let config = AppConfig::load()?;
    std::fs::create_dir_all(config.state_dir())?;
    println!("State directory: {}", config.state_dir().display());
    println!();
    println!("Point provider.endpoint_url at a llama.cpp server (default");
    println!("http://127.0.0.1:8080) or an OpenAI-compatible endpoint, then run:");
    println!("  stratamind chat");

    Ok(())
}
