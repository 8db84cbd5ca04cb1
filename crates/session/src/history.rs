//! History condenser — progressively compressed turn history for a session.
//!
//! The newest turns are kept verbatim. Older turns are condensed into
//! one-line digests appended to a rolling summary; once the summary grows
//! past its cap, the oldest digests fold into a single "Earlier" head line.
//! Alongside, each turn feeds small bounded lists (topics, decisions, file
//! scope) and the current task.
//!
//! Every list is a bounded FIFO: pushing past the cap evicts the oldest
//! entry. Internal annotation markup is stripped before anything is stored,
//! so nothing read back from here can re-inject it.

use briefing_config::HistoryConfig;
use briefing_core::text::{char_len, file_mentions, first_sentence, sentences, truncate_chars, word_count};
use briefing_core::{SessionStore, decode_state, strip_internal_markup};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tracing::{debug, warn};

/// Chars kept per side of a summary digest line.
const DIGEST_SIDE_CHARS: usize = 100;
/// Chars kept for a decision or the current task.
const NOTE_CHARS: usize = 160;
/// Topics extracted from one user message.
const TOPICS_PER_TURN: usize = 3;

const DECISION_MARKERS: [&str; 9] = [
    "decided",
    "we'll use",
    "we will use",
    "going with",
    "chose ",
    "switched to",
    "settled on",
    "decision:",
    "let's use",
];

const STOPWORDS: [&str; 40] = [
    "about", "above", "after", "again", "against", "because", "before", "being", "below",
    "between", "could", "doing", "during", "every", "first", "having", "other", "should",
    "their", "there", "these", "thing", "things", "those", "through", "under", "until",
    "where", "which", "while", "would", "please", "still", "really", "maybe", "something",
    "anything", "right", "think", "works",
];

/// One user/assistant exchange.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub user: String,
    pub assistant: String,
}

/// Persisted per-session history.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionHistoryState {
    #[serde(default)]
    pub recent_turns: VecDeque<Turn>,
    /// Digest lines of condensed turns, oldest first.
    #[serde(default)]
    pub summary_lines: VecDeque<String>,
    /// Digests folded away into the "Earlier" head line.
    #[serde(default)]
    pub folded_turns: u64,
    #[serde(default)]
    pub topics: VecDeque<String>,
    #[serde(default)]
    pub decisions: VecDeque<String>,
    #[serde(default)]
    pub file_scope: VecDeque<String>,
    #[serde(default)]
    pub current_task: String,
    #[serde(default)]
    pub turns_recorded: u64,
}

/// Sanitized view of a session's history, for briefings and the CLI.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub current_task: String,
    pub topics: Vec<String>,
    pub decisions: Vec<String>,
    pub file_scope: Vec<String>,
    /// The rolling summary, rendered.
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_turn: Option<Turn>,
    pub turns_recorded: u64,
}

impl SessionSnapshot {
    pub fn is_empty(&self) -> bool {
        self.turns_recorded == 0
    }
}

/// Session metadata written at session end.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionMeta {
    pub session_id: String,
    pub turns_recorded: u64,
    pub current_task: String,
    pub topics: Vec<String>,
    pub file_scope: Vec<String>,
    pub saved_at: DateTime<Utc>,
}

/// Maintains the condensed history of one session.
pub struct HistoryCondenser {
    session_id: String,
    store: Arc<dyn SessionStore>,
    config: HistoryConfig,
    state: SessionHistoryState,
}

impl HistoryCondenser {
    /// Load the session's history, or start empty if none is stored or it
    /// cannot be read.
    pub fn load(
        session_id: impl Into<String>,
        store: Arc<dyn SessionStore>,
        config: HistoryConfig,
    ) -> Self {
        let session_id = session_id.into();
        let key = Self::state_key(&session_id);
        let state = match store.read(&key) {
            Ok(Some(bytes)) => decode_state(&key, &bytes).unwrap_or_else(|e| {
                warn!(session = %session_id, error = %e, "History state corrupt, starting fresh");
                SessionHistoryState::default()
            }),
            Ok(None) => SessionHistoryState::default(),
            Err(e) => {
                warn!(session = %session_id, error = %e, "History state unreadable, starting fresh");
                SessionHistoryState::default()
            }
        };
        Self {
            session_id,
            store,
            config,
            state,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn state(&self) -> &SessionHistoryState {
        &self.state
    }

    /// Fold one exchange into the history.
    pub fn record_turn(&mut self, user_text: &str, assistant_text: &str) {
        let user = strip_internal_markup(user_text);
        let assistant = strip_internal_markup(assistant_text);
        if user.is_empty() && assistant.is_empty() {
            return;
        }

        self.extract_notes(&user, &assistant);

        let max_turn = self.config.max_turn_chars;
        self.state.recent_turns.push_back(Turn {
            user: truncate_chars(&user, max_turn),
            assistant: truncate_chars(&assistant, max_turn),
        });
        self.state.turns_recorded += 1;

        while self.state.recent_turns.len() > self.config.max_recent_turns {
            if let Some(evicted) = self.state.recent_turns.pop_front() {
                self.state.summary_lines.push_back(digest(&evicted));
            }
        }
        self.compress_summary();

        debug!(
            session = %self.session_id,
            turns = self.state.turns_recorded,
            digests = self.state.summary_lines.len(),
            folded = self.state.folded_turns,
            "Turn recorded"
        );
    }

    /// The sanitized state surfaced to briefings.
    pub fn get_session_state(&self) -> SessionSnapshot {
        let clean = |items: &VecDeque<String>| -> Vec<String> {
            items
                .iter()
                .map(|s| strip_internal_markup(s))
                .filter(|s| !s.is_empty())
                .collect()
        };

        SessionSnapshot {
            current_task: strip_internal_markup(&self.state.current_task),
            topics: clean(&self.state.topics),
            decisions: clean(&self.state.decisions),
            file_scope: clean(&self.state.file_scope),
            summary: strip_internal_markup(&self.render_summary()),
            last_turn: self.state.recent_turns.back().map(|t| Turn {
                user: strip_internal_markup(&t.user),
                assistant: strip_internal_markup(&t.assistant),
            }),
            turns_recorded: self.state.turns_recorded,
        }
    }

    /// The rolling summary: the "Earlier" head line, then digests.
    pub fn render_summary(&self) -> String {
        let mut lines: Vec<String> = Vec::with_capacity(self.state.summary_lines.len() + 1);
        if self.state.folded_turns > 0 {
            lines.push(self.head_line());
        }
        lines.extend(self.state.summary_lines.iter().cloned());
        truncate_chars(&lines.join("\n"), self.config.max_summary_chars)
    }

    /// Snapshot the state to the store. Safe with no recorded turns.
    pub fn save(&self) -> briefing_core::Result<()> {
        let bytes = serde_json::to_vec(&self.state)?;
        self.store.write(&Self::state_key(&self.session_id), &bytes)?;
        debug!(session = %self.session_id, bytes = bytes.len(), "History saved");
        Ok(())
    }

    /// Write the session's metadata blob next to its state.
    pub fn persist_session_meta(&self) -> briefing_core::Result<SessionMeta> {
        let snapshot = self.get_session_state();
        let meta = SessionMeta {
            session_id: self.session_id.clone(),
            turns_recorded: snapshot.turns_recorded,
            current_task: snapshot.current_task,
            topics: snapshot.topics,
            file_scope: snapshot.file_scope,
            saved_at: Utc::now(),
        };
        let bytes = serde_json::to_vec_pretty(&meta)?;
        self.store.write(&Self::meta_key(&self.session_id), &bytes)?;
        Ok(meta)
    }

    /// Read back a session's metadata, if any was persisted.
    pub fn load_session_meta(store: &dyn SessionStore, session_id: &str) -> Option<SessionMeta> {
        let key = Self::meta_key(session_id);
        let bytes = store.read(&key).ok().flatten()?;
        match decode_state(&key, &bytes) {
            Ok(meta) => Some(meta),
            Err(e) => {
                warn!(session = %session_id, error = %e, "Session metadata corrupt, ignoring");
                None
            }
        }
    }

    /// Session-start signal: forget everything, including stored blobs.
    pub fn clear(&mut self) -> briefing_core::Result<()> {
        self.state = SessionHistoryState::default();
        self.store.remove(&Self::state_key(&self.session_id))?;
        self.store.remove(&Self::meta_key(&self.session_id))?;
        Ok(())
    }

    // State and metadata keys carry distinct suffixes so no session id
    // can name another session's blob.
    fn state_key(session_id: &str) -> String {
        format!("{session_id}.state")
    }

    fn meta_key(session_id: &str) -> String {
        format!("{session_id}.meta")
    }

    fn head_line(&self) -> String {
        let topics: Vec<&str> = self.state.topics.iter().take(3).map(String::as_str).collect();
        if topics.is_empty() {
            format!("Earlier: {} turns condensed", self.state.folded_turns)
        } else {
            format!(
                "Earlier: {} turns condensed ({})",
                self.state.folded_turns,
                topics.join(", ")
            )
        }
    }

    fn compress_summary(&mut self) {
        let max = self.config.max_summary_chars;
        while !self.state.summary_lines.is_empty() && self.summary_chars() > max {
            self.state.summary_lines.pop_front();
            self.state.folded_turns += 1;
        }
    }

    fn summary_chars(&self) -> usize {
        let head = if self.state.folded_turns > 0 {
            char_len(&self.head_line()) + 1
        } else {
            0
        };
        let body: usize = self.state.summary_lines.iter().map(|l| char_len(l) + 1).sum();
        (head + body).saturating_sub(1)
    }

    fn extract_notes(&mut self, user: &str, assistant: &str) {
        let cfg = &self.config;

        for file in file_mentions(user)
            .into_iter()
            .chain(file_mentions(assistant))
        {
            push_bounded(&mut self.state.file_scope, file, cfg.max_files);
        }

        for sentence in sentences(assistant) {
            let lower = sentence.to_lowercase();
            if DECISION_MARKERS.iter().any(|m| lower.contains(m)) {
                push_bounded(
                    &mut self.state.decisions,
                    truncate_chars(sentence, NOTE_CHARS),
                    cfg.max_decisions,
                );
            }
        }

        for topic in extract_topics(user) {
            push_bounded(&mut self.state.topics, topic, cfg.max_topics);
        }

        if word_count(user) >= 3 {
            self.state.current_task = truncate_chars(first_sentence(user), NOTE_CHARS);
        }
    }
}

impl std::fmt::Debug for HistoryCondenser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HistoryCondenser")
            .field("session_id", &self.session_id)
            .field("store", &self.store.name())
            .field("turns_recorded", &self.state.turns_recorded)
            .finish()
    }
}

/// Push to a bounded FIFO. A repeated entry moves to the newest position.
fn push_bounded(list: &mut VecDeque<String>, item: String, cap: usize) {
    if item.is_empty() {
        return;
    }
    list.retain(|existing| existing != &item);
    list.push_back(item);
    while list.len() > cap {
        list.pop_front();
    }
}

fn digest(turn: &Turn) -> String {
    let user = truncate_chars(first_sentence(&turn.user), DIGEST_SIDE_CHARS);
    let assistant = truncate_chars(first_sentence(&turn.assistant), DIGEST_SIDE_CHARS);
    match (user.is_empty(), assistant.is_empty()) {
        (false, false) => format!("- {user} -> {assistant}"),
        (false, true) => format!("- {user}"),
        _ => format!("- (assistant) {assistant}"),
    }
}

/// Most frequent non-stopword terms of at least five letters.
fn extract_topics(text: &str) -> Vec<String> {
    let mut counts: HashMap<String, (usize, usize)> = HashMap::new();
    for (position, word) in text
        .split(|c: char| !c.is_alphanumeric() && c != '_')
        .filter(|w| w.chars().count() >= 5 && w.chars().all(|c| c.is_alphabetic() || c == '_'))
        .map(str::to_lowercase)
        .filter(|w| !STOPWORDS.contains(&w.as_str()))
        .enumerate()
    {
        counts.entry(word).or_insert((0, position)).0 += 1;
    }

    let mut ranked: Vec<(String, (usize, usize))> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.0.cmp(&a.1.0).then(a.1.1.cmp(&b.1.1)));
    ranked
        .into_iter()
        .take(TOPICS_PER_TURN)
        .map(|(word, _)| word)
        .collect()
}
