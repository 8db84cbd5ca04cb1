//! # Briefing Pipeline
//!
//! Decides, per user turn, what background context to inject into the
//! assistant's prompt:
//!
//! ```text
//! prompt ─▶ Router ─▶ Assembler ─▶ select_items ─▶ Briefing ─▶ enforce ─▶ text
//!             │        (fan-out)                                  │
//!             └── PressureTracker ◀──────── prompt + briefing bytes ┘
//! ```
//!
//! - [`Router`] classifies the prompt and picks a tier and sources
//! - [`Assembler`] queries adapters concurrently under tier deadlines
//! - [`select_items`] fits items into the tier's char budget
//! - [`enforce`] / [`enforce_briefing`] guarantee the rendered size
//! - [`BriefingPipeline`] ties them to the host's turn-boundary signals

pub mod assembler;
pub mod briefing;
pub mod budget;
pub mod enforce;
pub mod pipeline;
pub mod router;
pub mod sources;

pub use assembler::{Assembled, Assembler, BriefingMetadata};
pub use briefing::{Briefing, Line, Section, SectionKind};
pub use budget::select_items;
pub use enforce::{DegradeStep, Enforced, enforce, enforce_briefing, enforce_named};
pub use pipeline::{BriefingPipeline, TurnOutcome};
pub use router::{RouteDecision, RoutePlan, Router, SkipReason};
pub use sources::source_priority;
