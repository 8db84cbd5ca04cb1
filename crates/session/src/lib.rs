//! Session-scoped state for the briefing pipeline.
//!
//! Two components own all mutable per-session state:
//!
//! | Component | State | Persisted |
//! |-----------|-------|-----------|
//! | [`PressureTracker`] | cumulative/peak bytes, turn count | after every mutation |
//! | [`HistoryCondenser`] | recent turns, rolling summary, topics, decisions, files | on save |
//!
//! Both read and write through a [`SessionStore`](briefing_core::SessionStore);
//! the stores here replace blobs atomically. A missing or unreadable blob
//! always yields a fresh state, never an error.

pub mod history;
pub mod in_memory;
pub mod pressure;
pub mod store;

pub use history::{HistoryCondenser, SessionHistoryState, SessionMeta, SessionSnapshot, Turn};
pub use in_memory::InMemorySessionStore;
pub use pressure::{PressureSnapshot, PressureState, PressureTracker};
pub use store::FileSessionStore;
