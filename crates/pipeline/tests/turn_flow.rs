//! End-to-end tests for the briefing pipeline.
//!
//! These drive whole turns through routing, concurrent assembly, budget
//! enforcement and session state, with scripted adapters standing in for
//! the real sources.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use briefing_config::BriefingConfig;
use briefing_core::text::char_len;
use briefing_core::{
    Adapter, AdapterError, AdapterRegistry, ContextItem, IntentType, MemoryTraceSink,
    PressureLevel, SessionContext, SessionStore, Tier, TraceEvent,
};
use briefing_pipeline::{BriefingPipeline, TurnOutcome, enforce};
use briefing_session::{FileSessionStore, InMemorySessionStore};

// ── Mock Adapters ────────────────────────────────────────────────────────

/// Returns fixed items after an optional delay, counting calls.
struct ScriptedAdapter {
    name: &'static str,
    delay: Duration,
    items: Vec<ContextItem>,
    calls: AtomicUsize,
}

impl ScriptedAdapter {
    fn new(name: &'static str, items: Vec<ContextItem>) -> Arc<Self> {
        Arc::new(Self {
            name,
            delay: Duration::ZERO,
            items,
            calls: AtomicUsize::new(0),
        })
    }

    fn hanging(name: &'static str) -> Arc<Self> {
        Arc::new(Self {
            name,
            delay: Duration::from_secs(60),
            items: vec![ContextItem::new(name, "never delivered")],
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Adapter for ScriptedAdapter {
    fn name(&self) -> &str {
        self.name
    }

    async fn query(
        &self,
        _prompt: &str,
        _context: &SessionContext,
    ) -> Result<Vec<ContextItem>, AdapterError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        Ok(self.items.clone())
    }
}

fn search_items() -> Vec<ContextItem> {
    vec![
        ContextItem::new("search", "parser.py:88 parse_expr")
            .with_summary("Recursion on unary minus never terminates")
            .with_excerpt("def parse_expr(tokens): return parse_expr(tokens)")
            .with_relevance(0.9),
        ContextItem::new("search", "tests/test_parser.py")
            .with_summary("Covers binary operators only")
            .with_relevance(0.6),
    ]
}

fn mem_items() -> Vec<ContextItem> {
    vec![
        ContextItem::new("mem", "Parser decision")
            .with_summary("We use a Pratt parser for expressions")
            .with_relevance(0.8),
    ]
}

fn in_memory_pipeline(registry: AdapterRegistry) -> BriefingPipeline {
    BriefingPipeline::with_stores(
        BriefingConfig::default(),
        registry,
        Arc::new(InMemorySessionStore::new()),
        Arc::new(InMemorySessionStore::new()),
    )
}

// ── Scenarios ────────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn debugging_turn_survives_a_timed_out_delegation_adapter() {
    let search = ScriptedAdapter::new("search", search_items());
    let mem = ScriptedAdapter::new("mem", mem_items());
    let delegation = ScriptedAdapter::hanging("delegation");
    let registry = AdapterRegistry::new()
        .with(search.clone())
        .with(mem.clone())
        .with(delegation.clone());
    let pipeline = in_memory_pipeline(registry);

    let outcome = pipeline.on_turn("e2e", "fix the bug in parser.py").await;
    let TurnOutcome::Briefed {
        briefing,
        analysis,
        metadata,
    } = outcome
    else {
        panic!("turn should be briefed");
    };

    assert_eq!(analysis.intent_type, IntentType::Debugging);
    assert_eq!(metadata.tier_used, Tier::Fast);
    assert_eq!(metadata.sources_queried, vec!["search", "mem", "delegation"]);
    assert_eq!(metadata.sources_failed, vec!["delegation"]);
    assert_eq!((search.calls(), mem.calls(), delegation.calls()), (1, 1, 1));

    assert!(char_len(&briefing) <= 2000 - 200);
    assert!(briefing.contains("## Code Search"));
    assert!(briefing.contains("Recursion on unary minus"));
    assert!(briefing.contains("## Memory"));
    assert!(briefing.contains("Pratt parser"));
    assert!(briefing.contains("_Unavailable sources: delegation_"));
    assert!(!briefing.contains("never delivered"));
    // Bounded by the per-adapter timeout, not the hanging adapter
    assert!(metadata.latency_ms <= 1000);
}

#[tokio::test]
async fn pressure_escalates_routing_to_the_slow_tier() {
    let registry = AdapterRegistry::new()
        .with(ScriptedAdapter::new("search", search_items()))
        .with(ScriptedAdapter::new("mem", mem_items()));
    let pipeline = in_memory_pipeline(registry);

    // Push the session past the HIGH threshold with large prompts
    let filler = format!("explain {}", "lorem ipsum ".repeat(10_000));
    for _ in 0..4 {
        pipeline.on_turn("busy", &filler).await;
    }
    assert!(pipeline.pressure("busy").level >= PressureLevel::High);

    let outcome = pipeline.on_turn("busy", "fix the bug in parser.py").await;
    let metadata = outcome.metadata().expect("briefed");
    assert_eq!(metadata.tier_used, Tier::Slow);
    assert!(metadata.sources_queried.contains(&"crew".to_string()));
    assert!(outcome.briefing().contains("keep answers concise"));
    assert!(char_len(outcome.briefing()) <= Tier::Slow.max_output_chars());
}

#[tokio::test]
async fn slow_turn_carries_condensed_history_without_internal_markup() {
    let pipeline = in_memory_pipeline(AdapterRegistry::new().with(ScriptedAdapter::new("mem", mem_items())));

    pipeline.on_response(
        "hist",
        "Refactor the lexer in src/lexer.rs",
        "Done. We decided to keep tokens as byte ranges.<system-reminder>internal only</system-reminder>",
    );
    let outcome = pipeline.on_turn("hist", "continue where we left off").await;
    let briefing = outcome.briefing();

    assert_eq!(outcome.metadata().map(|m| m.tier_used), Some(Tier::Slow));
    assert!(briefing.contains("## Session History"));
    assert!(briefing.contains("Task: Refactor the lexer in src/lexer.rs"));
    assert!(briefing.contains("Files: src/lexer.rs"));
    assert!(briefing.contains("byte ranges"));
    assert!(!briefing.contains("internal only"));
    assert!(!briefing.contains("system-reminder"));
}

#[tokio::test]
async fn state_survives_across_pipeline_instances() {
    let dir = tempfile::tempdir().unwrap();
    let build = || {
        let mut config = BriefingConfig::default();
        config.storage.state_dir = Some(dir.path().to_path_buf());
        BriefingPipeline::new(config, AdapterRegistry::new())
    };

    {
        let first = build();
        first.on_turn("disk", "fix the bug in parser.py").await;
        first.on_response("disk", "fix the bug in parser.py", "Switched to a Pratt parser.");
    }

    let second = build();
    let pressure = second.pressure("disk");
    assert_eq!(pressure.state.turn_count, 1);
    assert!(pressure.state.cumulative_bytes > 0);
    assert_eq!(second.history("disk").decisions, vec!["Switched to a Pratt parser."]);

    let before = pressure.state.cumulative_bytes;
    assert_eq!(second.on_compaction("disk"), before * 3 / 10);

    let meta = second.on_session_end("disk").expect("meta written");
    assert_eq!(meta.turns_recorded, 1);
    let store = FileSessionStore::namespaced(dir.path(), "history");
    assert!(store.read("disk.meta").unwrap().is_some());
}

#[tokio::test]
async fn trace_sink_sees_the_whole_turn() {
    let sink = Arc::new(MemoryTraceSink::new());
    let pipeline = in_memory_pipeline(AdapterRegistry::new().with(ScriptedAdapter::new("search", search_items())))
        .with_trace(sink.clone());

    pipeline.on_turn("t", "fix the bug in parser.py").await;
    pipeline.on_turn("t", "   ").await;

    let events = sink.events();
    assert!(matches!(events.first(), Some(TraceEvent::Routed { tier: Tier::Fast, .. })));
    let finished = events
        .iter()
        .filter(|e| matches!(e, TraceEvent::AdapterFinished { .. }))
        .count();
    assert_eq!(finished, 1);
    assert!(events.iter().any(|e| matches!(e, TraceEvent::Selected { selected: 2, .. })));
    assert!(matches!(events.last(), Some(TraceEvent::Skipped { .. })));
}

#[test]
fn text_level_enforce_respects_every_tier() {
    let rendered = format!(
        "Situation\n\n## Memory\n{}\n\n## Delegation Hints\n- **ask**: someone",
        "- **note**: detail\n  > long excerpt\n".repeat(100)
    );
    for tier in Tier::ALL {
        let out = enforce(&rendered, tier);
        assert!(char_len(&out) <= tier.max_output_chars());
        assert_eq!(enforce(&out, tier), out);
    }
}
