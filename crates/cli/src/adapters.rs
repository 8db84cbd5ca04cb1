//! JSON-directory adapters: each `<dir>/<source>.json` file (an array of
//! context items) is served as the adapter for `<source>`.
//!
//! Items are filtered by word overlap with the prompt and ordered by it,
//! so a directory of notes behaves like a very small search index.

use async_trait::async_trait;
use briefing_core::{Adapter, AdapterError, AdapterRegistry, ContextItem, SessionContext};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Prompt words shorter than this are ignored for matching.
const MIN_WORD_LEN: usize = 3;

pub struct JsonDirAdapter {
    name: String,
    path: PathBuf,
}

impl JsonDirAdapter {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
        }
    }
}

#[async_trait]
impl Adapter for JsonDirAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    async fn query(
        &self,
        prompt: &str,
        context: &SessionContext,
    ) -> Result<Vec<ContextItem>, AdapterError> {
        let bytes = tokio::fs::read(&self.path)
            .await
            .map_err(|e| AdapterError::failed(&self.name, e.to_string()))?;
        let items: Vec<ContextItem> = serde_json::from_slice(&bytes)
            .map_err(|e| AdapterError::failed(&self.name, format!("invalid JSON: {e}")))?;

        let mut words = words_of(prompt);
        for entity in &context.entities {
            words.insert(entity.to_lowercase());
        }
        if words.is_empty() {
            return Ok(items);
        }

        let mut scored: Vec<(usize, ContextItem)> = items
            .into_iter()
            .map(|item| {
                let haystack = format!("{} {} {}", item.title, item.summary, item.excerpt).to_lowercase();
                let overlap = words.iter().filter(|w| haystack.contains(w.as_str())).count();
                (overlap, item)
            })
            .filter(|(overlap, _)| *overlap > 0)
            .collect();
        scored.sort_by(|a, b| b.0.cmp(&a.0));

        debug!(source = %self.name, matched = scored.len(), "JSON source queried");
        Ok(scored.into_iter().map(|(_, item)| item).collect())
    }
}

fn words_of(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric() && c != '_')
        .filter(|w| w.chars().count() >= MIN_WORD_LEN)
        .map(str::to_lowercase)
        .collect()
}

/// One adapter per `*.json` file in `dir`, keyed by file stem.
pub fn registry_from_dir(dir: &Path) -> std::io::Result<AdapterRegistry> {
    let mut registry = AdapterRegistry::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        registry.register(std::sync::Arc::new(JsonDirAdapter::new(stem, path.clone())));
    }
    Ok(registry)
}
