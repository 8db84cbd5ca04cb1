//! Assembler — concurrent adapter fan-out and briefing construction.
//!
//! One assembly:
//!
//! 1. Query every routed source at once (bounded by a semaphore), each call
//!    under the tier's per-adapter timeout, all of them under the tier's
//!    total deadline. Calls still running at the deadline are aborted.
//! 2. Validate and cap what came back; anything that failed, timed out,
//!    panicked or was never registered is recorded as a failed source.
//! 3. Select items within the budget left after the situation line and
//!    (on the slow tier) the session history.
//! 4. Build the structured briefing in a fixed section order and pass it
//!    through the post-format safety net.
//!
//! Assembly never fails; the worst case is a situation line and an
//! "unavailable sources" line.

use crate::briefing::{Briefing, Section, SectionKind};
use crate::budget::select_items;
use crate::enforce::enforce_briefing;
use crate::router::RoutePlan;
use briefing_config::TimeoutConfig;
use briefing_core::text::{char_len, truncate_chars};
use briefing_core::{
    AdapterError, AdapterRegistry, ContextItem, IntentType, ItemsBySource, PressureLevel,
    PromptAnalysis, SessionContext, Tier, TraceEvent, TraceSink, strip_internal_markup,
};
use briefing_session::SessionSnapshot;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};
use tokio::time::Instant;
use tracing::{debug, warn};

/// Chars kept for the situation line.
const SITUATION_CHARS: usize = 200;
/// Entities named in the situation line.
const SITUATION_ENTITIES: usize = 4;
/// Summary lines copied into the history section.
const HISTORY_SUMMARY_LINES: usize = 6;
/// Chars kept per history line.
const HISTORY_LINE_CHARS: usize = 240;

/// Structured metadata returned alongside the briefing text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BriefingMetadata {
    pub tier_used: Tier,
    pub latency_ms: u64,
    pub sources_queried: Vec<String>,
    pub sources_failed: Vec<String>,
    pub items_selected: usize,
    pub items_dropped: usize,
}

/// A finished briefing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assembled {
    pub text: String,
    pub metadata: BriefingMetadata,
}

/// What the fan-out collected.
#[derive(Debug, Default)]
struct FanOut {
    items: ItemsBySource,
    failed: Vec<String>,
}

/// Stateless apart from its configuration; reuse across turns.
#[derive(Clone)]
pub struct Assembler {
    registry: AdapterRegistry,
    timeouts: TimeoutConfig,
    history_lines: usize,
    trace: Option<Arc<dyn TraceSink>>,
}

impl Assembler {
    pub fn new(registry: AdapterRegistry, timeouts: TimeoutConfig) -> Self {
        Self {
            registry,
            timeouts,
            history_lines: crate::enforce::DEFAULT_HISTORY_LINES,
            trace: None,
        }
    }

    /// History lines kept when a briefing has to be degraded.
    pub fn with_history_lines(mut self, lines: usize) -> Self {
        self.history_lines = lines;
        self
    }

    pub fn with_trace(mut self, sink: Arc<dyn TraceSink>) -> Self {
        self.trace = Some(sink);
        self
    }

    pub fn registry(&self) -> &AdapterRegistry {
        &self.registry
    }

    /// Assemble the briefing for a routed turn. `history` is consulted on
    /// the slow tier only.
    pub async fn assemble(
        &self,
        plan: &RoutePlan,
        session: &SessionContext,
        history: Option<&SessionSnapshot>,
    ) -> Assembled {
        let started = Instant::now();
        let tier = plan.tier;
        let analysis = &plan.analysis;

        let fan_out = self.fan_out(&analysis.prompt, &plan.sources, tier, session).await;

        let mut lead = Briefing::new();
        lead.push(Section::situation(situation_line(plan)));
        let history_section = match (tier, history) {
            (Tier::Slow, Some(snapshot)) => history_section(snapshot),
            _ => None,
        };
        if let Some(section) = &history_section {
            lead.push(section.clone());
        }
        // Separators between lead sections and the first item section
        let reserved = char_len(&lead.render()) + 2;

        let selected = select_items(&fan_out.items, tier, reserved);
        let total = fan_out.items.item_count();
        let items_selected = selected.item_count();
        self.record(&TraceEvent::Selected {
            tier,
            usable_chars: tier.usable_chars(reserved),
            selected: items_selected,
            dropped: total - items_selected,
        });

        let mut briefing = Briefing::new();
        briefing.push(Section::situation(situation_line(plan)));
        for (source, items) in selected.iter() {
            briefing.push(Section::source(source, items));
        }
        if let Some(section) = history_section {
            briefing.push(section);
        }
        briefing.push(suggestion_section(analysis, plan.pressure));
        if !fan_out.failed.is_empty() {
            briefing.push(Section::unavailable(&fan_out.failed));
        }

        let enforced = enforce_briefing(briefing, tier, self.history_lines);
        for step in &enforced.steps {
            self.record(&TraceEvent::Degraded {
                tier,
                step: step.to_string(),
                chars: char_len(&enforced.text),
            });
        }

        let metadata = BriefingMetadata {
            tier_used: tier,
            latency_ms: elapsed_ms(started),
            sources_queried: plan.sources.clone(),
            sources_failed: fan_out.failed,
            items_selected,
            items_dropped: total - items_selected,
        };
        debug!(
            session = %session.session_id,
            tier = %tier,
            latency_ms = metadata.latency_ms,
            selected = metadata.items_selected,
            failed = ?metadata.sources_failed,
            chars = char_len(&enforced.text),
            "Briefing assembled"
        );

        Assembled {
            text: enforced.text,
            metadata,
        }
    }

    /// Query all sources concurrently under the tier's deadlines. Results
    /// are grouped in route order, not completion order.
    async fn fan_out(
        &self,
        prompt: &str,
        sources: &[String],
        tier: Tier,
        session: &SessionContext,
    ) -> FanOut {
        let limits = self.timeouts.for_tier(tier);
        let per_adapter = limits.per_adapter();
        let deadline = Instant::now() + limits.total();
        let semaphore = Arc::new(Semaphore::new(self.timeouts.max_concurrency.max(1)));

        let mut outcomes: Vec<Option<Result<Vec<ContextItem>, AdapterError>>> =
            (0..sources.len()).map(|_| None).collect();
        let mut tasks = JoinSet::new();

        for (idx, source) in sources.iter().enumerate() {
            let Some(adapter) = self.registry.get(source) else {
                warn!(source = %source, "No adapter registered for source");
                outcomes[idx] = Some(Err(AdapterError::NotRegistered(source.clone())));
                continue;
            };
            let semaphore = semaphore.clone();
            let prompt = prompt.to_string();
            let context = session.clone();
            let name = source.clone();

            tasks.spawn(async move {
                let _permit = semaphore.acquire_owned().await;
                let started = Instant::now();
                let result = match tokio::time::timeout(per_adapter, adapter.query(&prompt, &context)).await {
                    Ok(result) => result,
                    Err(_) => Err(AdapterError::Timeout {
                        source_name: name,
                        timeout_ms: per_adapter.as_millis() as u64,
                    }),
                };
                (idx, result, elapsed_ms(started))
            });
        }

        loop {
            match tokio::time::timeout_at(deadline, tasks.join_next()).await {
                Ok(Some(joined)) => self.absorb(sources, &mut outcomes, joined),
                Ok(None) => break,
                Err(_) => {
                    // Keep whatever completed in the same tick as the deadline
                    for joined in drain_finished(&mut tasks) {
                        self.absorb(sources, &mut outcomes, joined);
                    }
                    warn!(tier = %tier, pending = tasks.len(), "Tier deadline reached, abandoning adapters");
                    tasks.abort_all();
                    break;
                }
            }
        }

        let mut fan_out = FanOut::default();
        let cap = self.timeouts.max_items_per_source;
        for (source, outcome) in sources.iter().zip(outcomes) {
            match outcome {
                Some(Ok(items)) => {
                    let items: Vec<ContextItem> = items
                        .into_iter()
                        .map(|item| item.validated(source))
                        .filter(|item| !(item.title.is_empty() && item.summary.is_empty()))
                        .take(cap)
                        .collect();
                    fan_out.items.extend_source(source, items);
                }
                _ => fan_out.failed.push(source.clone()),
            }
        }
        fan_out
    }

    fn absorb(
        &self,
        sources: &[String],
        outcomes: &mut [Option<Result<Vec<ContextItem>, AdapterError>>],
        joined: Result<AdapterOutcome, JoinError>,
    ) {
        let (idx, result, elapsed) = match joined {
            Ok(done) => done,
            Err(e) => {
                // Panicked adapter; its slot stays empty and counts as failed
                warn!(error = %e, "Adapter task aborted");
                return;
            }
        };
        let source = &sources[idx];
        match &result {
            Ok(items) => {
                debug!(source = %source, items = items.len(), elapsed_ms = elapsed, "Adapter finished")
            }
            Err(e) => warn!(source = %source, error = %e, elapsed_ms = elapsed, "Adapter failed"),
        }
        self.record(&TraceEvent::AdapterFinished {
            source: source.clone(),
            ok: result.is_ok(),
            items: result.as_ref().map(Vec::len).unwrap_or(0),
            elapsed_ms: elapsed,
        });
        outcomes[idx] = Some(result);
    }

    fn record(&self, event: &TraceEvent) {
        if let Some(sink) = &self.trace {
            sink.record(event);
        }
    }
}

impl std::fmt::Debug for Assembler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Assembler")
            .field("registry", &self.registry)
            .field("timeouts", &self.timeouts)
            .field("trace", &self.trace.is_some())
            .finish()
    }
}

/// Slot index, adapter result, elapsed milliseconds.
type AdapterOutcome = (usize, Result<Vec<ContextItem>, AdapterError>, u64);

/// Join every task that has already completed, without waiting.
fn drain_finished<T: 'static>(tasks: &mut JoinSet<T>) -> Vec<Result<T, JoinError>> {
    std::iter::from_fn(|| tasks.try_join_next()).collect()
}

fn elapsed_ms(since: Instant) -> u64 {
    since.elapsed().as_millis() as u64
}

fn situation_line(plan: &RoutePlan) -> String {
    let analysis = &plan.analysis;
    let mut line = format!(
        "Context for a {} request ({} tier, pressure {})",
        analysis.intent_type,
        plan.tier,
        plan.pressure.as_str().to_lowercase()
    );
    if !analysis.entities.is_empty() {
        let named: Vec<&str> = analysis
            .entities
            .iter()
            .take(SITUATION_ENTITIES)
            .map(String::as_str)
            .collect();
        line.push_str("; focus: ");
        line.push_str(&named.join(", "));
    }
    truncate_chars(&line, SITUATION_CHARS)
}

/// The condensed session state, sanitized. `None` for an empty session.
fn history_section(snapshot: &SessionSnapshot) -> Option<Section> {
    if snapshot.is_empty() {
        return None;
    }
    let clean = |text: &str| truncate_chars(&strip_internal_markup(text), HISTORY_LINE_CHARS);

    let mut section = Section::new(SectionKind::SessionHistory);
    if !snapshot.current_task.is_empty() {
        section = section.with_text(format!("Task: {}", clean(&snapshot.current_task)));
    }
    if !snapshot.file_scope.is_empty() {
        section = section.with_text(format!("Files: {}", clean(&snapshot.file_scope.join(", "))));
    }
    for decision in snapshot.decisions.iter().rev().take(3) {
        section = section.with_text(format!("Decision: {}", clean(decision)));
    }
    let summary: Vec<&str> = snapshot.summary.lines().collect();
    for line in &summary[summary.len().saturating_sub(HISTORY_SUMMARY_LINES)..] {
        section = section.with_text(clean(line));
    }
    if let Some(turn) = &snapshot.last_turn {
        section = section.with_text(format!(
            "Last turn: {} -> {}",
            clean(&turn.user),
            clean(&turn.assistant)
        ));
    }
    (!section.is_empty()).then_some(section)
}

fn suggestion_section(analysis: &PromptAnalysis, pressure: PressureLevel) -> Section {
    let mut section = Section::new(SectionKind::Suggestion);
    if pressure.is_elevated() {
        section = section.with_text(format!(
            "Context pressure is {}: keep answers concise, a compaction is likely soon.",
            pressure.as_str().to_lowercase()
        ));
    }
    if analysis.is_compound {
        section = section.with_text("Several asks are bundled here; address them one at a time.");
    }
    if analysis.intent_type == IntentType::Debugging {
        if let Some(first) = analysis.entities.first() {
            section = section.with_text(format!(
                "Start from {first} and reproduce the failure before changing code."
            ));
        }
    }
    section
}
