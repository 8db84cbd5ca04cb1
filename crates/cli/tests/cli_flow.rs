//! End-to-end tests for the `briefing` binary.
//!
//! Each test runs the real executable against a temporary state directory
//! and a temporary directory of JSON sources.

use std::path::Path;
use std::process::{Command, Output};

fn briefing(home: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_briefing"))
        .args(args)
        .arg("--config")
        .arg(home.join("config.toml"))
        .env("HOME", home)
        .env("BRIEFING_STATE_DIR", home.join("state"))
        .env_remove("BRIEFING_SESSION")
        .env_remove("BRIEFING_SOURCES")
        .env_remove("RUST_LOG")
        .output()
        .expect("binary runs")
}

fn stdout(output: &Output) -> String {
    assert!(
        output.status.success(),
        "command failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn write_sources(dir: &Path) {
    std::fs::create_dir_all(dir).unwrap();
    std::fs::write(
        dir.join("search.json"),
        r#"[{"title": "parser.py:88", "summary": "parser recursion on unary minus", "relevance": 0.9}]"#,
    )
    .unwrap();
    std::fs::write(
        dir.join("mem.json"),
        r#"[{"title": "Parser decision", "summary": "We use a Pratt parser", "relevance": 0.8}]"#,
    )
    .unwrap();
}

#[test]
fn route_reports_skip_and_plan() {
    let home = tempfile::tempdir().unwrap();

    let skip = stdout(&briefing(home.path(), &["route", "/help"]));
    assert_eq!(skip.trim(), "skip (command)");

    let json = stdout(&briefing(
        home.path(),
        &["route", "fix the bug in parser.py", "--json"],
    ));
    let decision: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(decision["decision"], "assemble");
    assert_eq!(decision["tier"], "fast");
    assert_eq!(decision["sources"][0], "search");

    let slow = stdout(&briefing(
        home.path(),
        &["route", "fix the bug in parser.py", "--pressure", "high", "--json"],
    ));
    let decision: serde_json::Value = serde_json::from_str(&slow).unwrap();
    assert_eq!(decision["tier"], "slow");
}

#[test]
fn unknown_pressure_level_fails() {
    let home = tempfile::tempdir().unwrap();
    let output = briefing(home.path(), &["route", "hello there", "--pressure", "extreme"]);
    assert!(!output.status.success());
}

#[test]
fn session_lifecycle_round_trips_through_disk() {
    let home = tempfile::tempdir().unwrap();
    let sources = home.path().join("sources");
    write_sources(&sources);
    let sources = sources.to_str().unwrap();

    stdout(&briefing(home.path(), &["start", "--session", "cli"]));

    let text = stdout(&briefing(
        home.path(),
        &[
            "turn",
            "fix the bug in parser.py",
            "--session",
            "cli",
            "--sources",
            sources,
        ],
    ));
    assert!(text.contains("## Code Search"));
    assert!(text.contains("unary minus"));
    assert!(text.contains("## Memory"));

    stdout(&briefing(
        home.path(),
        &[
            "respond",
            "--session",
            "cli",
            "--user",
            "fix the bug in parser.py",
            "--assistant",
            "Switched to a Pratt parser.",
        ],
    ));

    let status = stdout(&briefing(home.path(), &["status", "--session", "cli", "--json"]));
    let status: serde_json::Value = serde_json::from_str(&status).unwrap();
    assert_eq!(status["pressure"]["turn_count"], 1);
    assert_eq!(status["pressure"]["level"], "LOW");
    assert_eq!(status["history"]["turns_recorded"], 1);
    assert_eq!(status["history"]["decisions"][0], "Switched to a Pratt parser.");

    let before = status["pressure"]["cumulative_bytes"].as_u64().unwrap();
    let after = stdout(&briefing(home.path(), &["compact", "--session", "cli"]));
    assert_eq!(after.trim().parse::<u64>().unwrap(), before * 3 / 10);

    let meta = stdout(&briefing(home.path(), &["end", "--session", "cli"]));
    let meta: serde_json::Value = serde_json::from_str(&meta).unwrap();
    assert_eq!(meta["session_id"], "cli");
    assert_eq!(meta["turns_recorded"], 1);
}

#[test]
fn config_defaults_parse_as_toml_sections() {
    let home = tempfile::tempdir().unwrap();
    let defaults = stdout(&briefing(home.path(), &["config", "--defaults"]));
    assert!(defaults.contains("[router]"));
    assert!(defaults.contains("[pressure]"));

    let invalid = home.path().join("config.toml");
    std::fs::write(&invalid, "[pressure]\nmedium_kb = 500\nhigh_kb = 100\n").unwrap();
    let output = briefing(home.path(), &["config", "--validate"]);
    assert!(!output.status.success());
}
