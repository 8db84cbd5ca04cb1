//! # Briefing Core
//!
//! Domain types, traits, and error definitions for the briefing pipeline:
//! the per-turn decision of which background context to inject into an
//! assistant prompt, under a hard character budget and a latency tier.
//! This crate performs **no I/O** — it defines the domain model that the
//! session, pipeline, and CLI crates implement against.
//!
//! ## Seams
//!
//! Every external collaborator is a trait here:
//! - [`Adapter`] — a read-only source of [`ContextItem`]s
//! - [`SessionStore`] — a keyed, atomically written state blob store
//! - [`TraceSink`] — an optional diagnostics sink
//!
//! Implementations live in their respective crates (or in the host).

pub mod adapter;
pub mod analysis;
pub mod error;
pub mod item;
pub mod pressure;
pub mod sanitize;
pub mod store;
pub mod text;
pub mod tier;
pub mod trace;

// Re-export key types at crate root for ergonomics
pub use adapter::{Adapter, AdapterRegistry, SessionContext};
pub use analysis::{IntentType, PromptAnalysis};
pub use error::{AdapterError, Error, Result, StorageError};
pub use item::{ContextItem, ItemsBySource};
pub use pressure::PressureLevel;
pub use sanitize::strip_internal_markup;
pub use store::{SessionStore, decode_state};
pub use tier::{OVERHEAD_CHARS, Tier};
pub use trace::{LogTraceSink, MemoryTraceSink, TraceEvent, TraceSink};
