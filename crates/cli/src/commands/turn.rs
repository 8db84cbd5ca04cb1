//! `briefing turn` — Produce the briefing for a prompt.
//!
//! The briefing text goes to stdout; everything else to stderr.

use super::{load_config, session_id};
use crate::adapters::registry_from_dir;
use briefing_core::AdapterRegistry;
use briefing_pipeline::{BriefingPipeline, TurnOutcome};
use std::path::Path;
use tracing::debug;

pub async fn run(
    config_path: Option<&Path>,
    session: Option<String>,
    sources: Option<&Path>,
    prompt: &str,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(config_path)?;
    let session = session_id(session);

    let registry = match sources {
        Some(dir) => registry_from_dir(dir)
            .map_err(|e| format!("Failed to read sources from {}: {e}", dir.display()))?,
        None => AdapterRegistry::new(),
    };
    debug!(adapters = ?registry.names(), "Adapters registered");

    let pipeline = BriefingPipeline::new(config, registry);
    let outcome = pipeline.on_turn(&session, prompt).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
        return Ok(());
    }

    match &outcome {
        TurnOutcome::Skipped { reason } => {
            eprintln!("skipped ({})", reason.as_str());
        }
        TurnOutcome::Briefed {
            briefing, metadata, ..
        } => {
            println!("{briefing}");
            eprintln!(
                "tier={} latency={}ms selected={} dropped={} failed=[{}]",
                metadata.tier_used,
                metadata.latency_ms,
                metadata.items_selected,
                metadata.items_dropped,
                metadata.sources_failed.join(",")
            );
        }
    }
    Ok(())
}
