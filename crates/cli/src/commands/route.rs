//! `briefing route` — Show how a prompt would be routed.

use super::load_config;
use briefing_core::PressureLevel;
use briefing_pipeline::{RouteDecision, Router};
use std::path::Path;

pub fn run(
    config_path: Option<&Path>,
    prompt: &str,
    pressure: &str,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(config_path)?;
    let pressure = parse_pressure(pressure)?;
    let decision = Router::new(config.router).classify(prompt, pressure);

    if json {
        println!("{}", serde_json::to_string_pretty(&decision)?);
        return Ok(());
    }

    match decision {
        RouteDecision::Skip { reason } => println!("skip ({})", reason.as_str()),
        RouteDecision::Assemble(plan) => {
            let a = &plan.analysis;
            println!("Intent:     {} ({:.2})", a.intent_type.as_str(), a.confidence);
            if let Some(runner_up) = a.runner_up {
                println!("Runner-up:  {} ({} competing)", runner_up.as_str(), a.competing_intents);
            }
            println!("Tier:       {}", plan.tier);
            println!("Pressure:   {}", plan.pressure);
            println!("Sources:    {}", plan.sources.join(", "));
            if !a.entities.is_empty() {
                println!("Entities:   {}", a.entities.join(", "));
            }
            if a.is_compound || a.requires_history {
                println!(
                    "Flags:      {}{}",
                    if a.is_compound { "compound " } else { "" },
                    if a.requires_history { "history" } else { "" }
                );
            }
        }
    }
    Ok(())
}

pub fn parse_pressure(name: &str) -> Result<PressureLevel, String> {
    match name.trim().to_ascii_lowercase().as_str() {
        "low" => Ok(PressureLevel::Low),
        "medium" => Ok(PressureLevel::Medium),
        "high" => Ok(PressureLevel::High),
        "critical" => Ok(PressureLevel::Critical),
        other => Err(format!(
            "Unknown pressure level '{other}' (expected low, medium, high or critical)"
        )),
    }
}
