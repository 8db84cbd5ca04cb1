//! CLI subcommand implementations.

pub mod config_cmd;
pub mod route;
pub mod session;
pub mod turn;

use briefing_config::BriefingConfig;
use briefing_core::AdapterRegistry;
use briefing_pipeline::BriefingPipeline;
use std::path::Path;

/// Load configuration from `path`, or from the default location.
pub fn load_config(path: Option<&Path>) -> Result<BriefingConfig, Box<dyn std::error::Error>> {
    let config = match path {
        Some(path) => {
            let mut config = BriefingConfig::load_from(path)
                .map_err(|e| format!("Failed to load config: {e}"))?;
            config.apply_env(|key| std::env::var(key).ok());
            config
                .validate()
                .map_err(|e| format!("Failed to load config: {e}"))?;
            config
        }
        None => BriefingConfig::load().map_err(|e| format!("Failed to load config: {e}"))?,
    };
    Ok(config)
}

/// The session to act on. Without one, a fresh id is generated and
/// reported on stderr so the caller can pass it back next time.
pub fn session_id(session: Option<String>) -> String {
    match session.filter(|s| !s.trim().is_empty()) {
        Some(id) => id,
        None => {
            let id = uuid::Uuid::new_v4().to_string();
            eprintln!("session: {id}");
            id
        }
    }
}

/// A pipeline with no adapters, for the state-only commands.
pub fn stateful_pipeline(config_path: Option<&Path>) -> Result<BriefingPipeline, Box<dyn std::error::Error>> {
    let config = load_config(config_path)?;
    Ok(BriefingPipeline::new(config, AdapterRegistry::new()))
}
