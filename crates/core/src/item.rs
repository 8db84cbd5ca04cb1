//! Context items — one retrievable nugget from one external source.

use crate::sanitize::strip_internal_markup;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Relevance assumed when an adapter does not provide one.
pub const DEFAULT_RELEVANCE: f32 = 0.5;

fn default_relevance() -> f32 {
    DEFAULT_RELEVANCE
}

/// A single item produced by an adapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextItem {
    /// Key of the originating adapter ("mem", "search", "kanban", ...).
    #[serde(default)]
    pub source: String,

    /// Short heading for the item.
    pub title: String,

    /// Short, already-bounded text.
    #[serde(default)]
    pub summary: String,

    /// Optional longer text. Empty means "no excerpt".
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub excerpt: String,

    /// Relevance score (0.0–1.0).
    #[serde(default = "default_relevance")]
    pub relevance: f32,

    /// Age of the underlying fact, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age_days: Option<u32>,
}

impl ContextItem {
    pub fn new(source: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            title: title.into(),
            summary: String::new(),
            excerpt: String::new(),
            relevance: DEFAULT_RELEVANCE,
            age_days: None,
        }
    }

    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = summary.into();
        self
    }

    pub fn with_excerpt(mut self, excerpt: impl Into<String>) -> Self {
        self.excerpt = excerpt.into();
        self
    }

    pub fn with_relevance(mut self, relevance: f32) -> Self {
        self.relevance = relevance;
        self
    }

    pub fn with_age_days(mut self, age_days: u32) -> Self {
        self.age_days = Some(age_days);
        self
    }

    pub fn has_excerpt(&self) -> bool {
        !self.excerpt.trim().is_empty()
    }

    /// Normalize an item at the adapter boundary.
    ///
    /// The source key is forced to the adapter that produced the item,
    /// internal markup is stripped from every text field before trimming,
    /// and relevance is clamped to `[0, 1]` (non-finite values become the
    /// default).
    pub fn validated(mut self, adapter: &str) -> Self {
        self.source = adapter.to_string();
        self.title = strip_internal_markup(&self.title).trim().to_string();
        self.summary = strip_internal_markup(&self.summary).trim().to_string();
        self.excerpt = strip_internal_markup(&self.excerpt).trim().to_string();
        self.relevance = if self.relevance.is_finite() {
            self.relevance.clamp(0.0, 1.0)
        } else {
            DEFAULT_RELEVANCE
        };
        self
    }
}

/// Items grouped by source key. Iteration order is insertion order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemsBySource {
    groups: IndexMap<String, Vec<ContextItem>>,
}

impl ItemsBySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an item under its own `source` key.
    pub fn push(&mut self, item: ContextItem) {
        self.groups.entry(item.source.clone()).or_default().push(item);
    }

    /// Append a batch of items under an explicit source key.
    pub fn extend_source(&mut self, source: &str, items: Vec<ContextItem>) {
        self.groups.entry(source.to_string()).or_default().extend(items);
    }

    pub fn get(&self, source: &str) -> Option<&[ContextItem]> {
        self.groups.get(source).map(Vec::as_slice)
    }

    /// Iterate `(source, items)` in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[ContextItem])> {
        self.groups.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub fn sources(&self) -> impl Iterator<Item = &str> {
        self.groups.keys().map(String::as_str)
    }

    /// Number of source groups (including empty ones).
    pub fn source_count(&self) -> usize {
        self.groups.len()
    }

    /// Total number of items across all sources.
    pub fn item_count(&self) -> usize {
        self.groups.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.item_count() == 0
    }
}

impl FromIterator<ContextItem> for ItemsBySource {
    fn from_iter<I: IntoIterator<Item = ContextItem>>(iter: I) -> Self {
        let mut out = Self::new();
        for item in iter {
            out.push(item);
        }
        out
    }
}
