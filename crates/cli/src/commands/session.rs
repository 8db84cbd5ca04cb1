//! Session lifecycle commands: `start`, `respond`, `compact`, `end`, `status`.

use super::{session_id, stateful_pipeline};
use std::path::Path;

pub fn start(config_path: Option<&Path>, session: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    let pipeline = stateful_pipeline(config_path)?;
    let session = session_id(session);
    pipeline.on_session_start(&session);
    println!("{session}");
    Ok(())
}

pub fn respond(
    config_path: Option<&Path>,
    session: Option<String>,
    user: &str,
    assistant: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let pipeline = stateful_pipeline(config_path)?;
    let session = session_id(session);
    pipeline.on_response(&session, user, assistant);
    Ok(())
}

pub fn compact(config_path: Option<&Path>, session: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    let pipeline = stateful_pipeline(config_path)?;
    let session = session_id(session);
    let after = pipeline.on_compaction(&session);
    println!("{after}");
    Ok(())
}

pub fn end(config_path: Option<&Path>, session: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    let pipeline = stateful_pipeline(config_path)?;
    let session = session_id(session);
    let meta = pipeline
        .on_session_end(&session)
        .ok_or_else(|| format!("Failed to persist metadata for session {session}"))?;
    println!("{}", serde_json::to_string_pretty(&meta)?);
    Ok(())
}

pub fn status(
    config_path: Option<&Path>,
    session: Option<String>,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let pipeline = stateful_pipeline(config_path)?;
    let session = session_id(session);
    let pressure = pipeline.pressure(&session);
    let history = pipeline.history(&session);

    if json {
        let status = serde_json::json!({
            "session_id": session,
            "pressure": pressure,
            "history": history,
            "meta": pipeline.session_meta(&session),
        });
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    println!("Session {session}");
    println!();
    println!("  Pressure:   {}", pressure.level);
    println!(
        "  Bytes:      {} (peak {})",
        pressure.state.cumulative_bytes, pressure.state.peak_bytes
    );
    println!(
        "  Turns:      {}{}",
        pressure.state.turn_count,
        if pressure.long_session { " (long session)" } else { "" }
    );
    if pressure.state.last_compacted {
        println!("  Compacted:  just now");
    }
    println!();

    if history.is_empty() {
        println!("  No history recorded");
        return Ok(());
    }
    println!("  Recorded:   {} turns", history.turns_recorded);
    if !history.current_task.is_empty() {
        println!("  Task:       {}", history.current_task);
    }
    if !history.file_scope.is_empty() {
        println!("  Files:      {}", history.file_scope.join(", "));
    }
    if !history.topics.is_empty() {
        println!("  Topics:     {}", history.topics.join(", "));
    }
    for decision in &history.decisions {
        println!("  Decision:   {decision}");
    }
    if !history.summary.is_empty() {
        println!();
        for line in history.summary.lines() {
            println!("  {line}");
        }
    }
    Ok(())
}
