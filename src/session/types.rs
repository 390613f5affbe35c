//! Session state model for the reflection workbook.
//!
//! The persisted form is a flat string mapping (`"problem.challenge" -> "..."`)
//! in which three reserved keys carry JSON-encoded sequences. In memory those
//! sequences are kept as typed fields so nothing downstream has to re-parse them.
//! A reserved value written through [`SessionState::set`] is also kept verbatim
//! and handed back unchanged until the typed sequence is modified.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::error::StoreError;

/// Flat key holding the "ask my own question" log.
pub const ASK_LOG_KEY: &str = "prompt.ask";
/// Flat key holding the "clarifying questions" log.
pub const CLARIFY_LOG_KEY: &str = "prompt.clarify";
/// Flat key holding the loaded prompt library rows.
pub const PROMPT_ROWS_KEY: &str = "csv.prompts";

/// Which prompt log an entry belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PromptMode {
    Ask,
    Clarify,
}

impl PromptMode {
    /// All modes, in the order they appear in exports.
    pub const ALL: [PromptMode; 2] = [PromptMode::Ask, PromptMode::Clarify];

    pub fn as_str(&self) -> &'static str {
        match self {
            PromptMode::Ask => "ask",
            PromptMode::Clarify => "clarify",
        }
    }

    /// The flat storage key of this mode's log.
    pub fn key(&self) -> &'static str {
        match self {
            PromptMode::Ask => ASK_LOG_KEY,
            PromptMode::Clarify => CLARIFY_LOG_KEY,
        }
    }

    /// Heading used when the log is listed in an export.
    pub fn heading(&self) -> &'static str {
        match self {
            PromptMode::Ask => "Asked Questions",
            PromptMode::Clarify => "Clarifying Inputs",
        }
    }

    /// Text shown when asking the user for a new entry.
    pub fn input_prompt(&self) -> &'static str {
        match self {
            PromptMode::Ask => "Type your question:",
            PromptMode::Clarify => {
                "Tell me a bit more, and I'll suggest the next clarifying questions:"
            }
        }
    }
}

impl fmt::Display for PromptMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PromptMode {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ask" => Ok(PromptMode::Ask),
            "clarify" => Ok(PromptMode::Clarify),
            _ => Err(StoreError::invalid_prompt_mode(s)),
        }
    }
}

/// A timestamped note logged from an "ask" or "clarify" action.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PromptEntry {
    /// Milliseconds since the Unix epoch. Entries saved without one read as
    /// the current time.
    #[serde(rename = "t", alias = "timestamp", default = "now_millis")]
    pub timestamp: i64,
    #[serde(default)]
    pub text: String,
}

impl PromptEntry {
    pub fn new(timestamp: i64, text: impl Into<String>) -> Self {
        Self {
            timestamp,
            text: text.into(),
        }
    }
}

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// One record of the prompt/completion library.
///
/// Columns other than `prompt` and `completion` are kept for the preview table
/// but are otherwise ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct PromptRow {
    columns: BTreeMap<String, String>,
}

impl PromptRow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a row from `(column, value)` pairs.
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            columns: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Set a single column value.
    pub fn with_column(mut self, column: impl Into<String>, value: impl Into<String>) -> Self {
        self.columns.insert(column.into(), value.into());
        self
    }

    pub fn get(&self, column: &str) -> Option<&str> {
        self.columns.get(column).map(String::as_str)
    }

    /// The `prompt` column, or empty if the row has none.
    pub fn prompt(&self) -> &str {
        self.get("prompt").unwrap_or("")
    }

    /// The `completion` column, or empty if the row has none.
    pub fn completion(&self) -> &str {
        self.get("completion").unwrap_or("")
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// A flat key classified by what it stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionKey<'a> {
    /// A `stepId.fieldKey` answer (or any unknown plain key).
    Answer(&'a str),
    PromptLog(PromptMode),
    PromptRows,
}

impl<'a> SessionKey<'a> {
    pub fn parse(key: &'a str) -> Self {
        match key {
            ASK_LOG_KEY => SessionKey::PromptLog(PromptMode::Ask),
            CLARIFY_LOG_KEY => SessionKey::PromptLog(PromptMode::Clarify),
            PROMPT_ROWS_KEY => SessionKey::PromptRows,
            other => SessionKey::Answer(other),
        }
    }
}

/// Whether a key lives in one of the reserved `prompt.*` / `csv.*` namespaces.
pub fn is_reserved_namespace(key: &str) -> bool {
    key.starts_with("prompt.") || key.starts_with("csv.")
}

/// Split an answer key into `(stage id, field key)`.
///
/// Only the first `.` separates; a key without one is its own stage with an
/// empty field key.
pub fn split_answer_key(key: &str) -> (&str, &str) {
    key.split_once('.').unwrap_or((key, ""))
}

/// The complete state of one workbook session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    /// Answers keyed by `stepId.fieldKey`.
    pub answers: BTreeMap<String, String>,
    pub ask_log: Vec<PromptEntry>,
    pub clarify_log: Vec<PromptEntry>,
    pub prompt_rows: Vec<PromptRow>,
    /// Reserved values exactly as they were last set, keyed by flat key.
    raw_reserved: BTreeMap<String, String>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.answers.is_empty()
            && self.ask_log.is_empty()
            && self.clarify_log.is_empty()
            && self.prompt_rows.is_empty()
            && self.raw_reserved.is_empty()
    }

    /// Current value for a flat key, or an empty string.
    ///
    /// Reserved keys return the value they were last set to, or else their
    /// JSON-encoded sequence (empty when the sequence is empty).
    pub fn get(&self, key: &str) -> String {
        if let Some(raw) = self.raw_reserved.get(key) {
            return raw.clone();
        }
        match SessionKey::parse(key) {
            SessionKey::Answer(k) => self.answers.get(k).cloned().unwrap_or_default(),
            SessionKey::PromptLog(mode) => encode_non_empty(self.log(mode))
                .ok()
                .flatten()
                .unwrap_or_default(),
            SessionKey::PromptRows => encode_non_empty(&self.prompt_rows)
                .ok()
                .flatten()
                .unwrap_or_default(),
        }
    }

    /// Overwrite or create the value for a flat key.
    ///
    /// Values for reserved keys are kept verbatim and decoded into the typed
    /// sequence; malformed data decodes to an empty sequence.
    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        let value = value.into();
        match SessionKey::parse(key) {
            SessionKey::Answer(k) => {
                self.answers.insert(k.to_string(), value);
                return;
            }
            SessionKey::PromptLog(mode) => *self.log_mut(mode) = decode_or_empty(key, &value),
            SessionKey::PromptRows => self.set_prompt_rows(decode_or_empty(key, &value)),
        }
        self.raw_reserved.insert(key.to_string(), value);
    }

    /// The log for a prompt mode.
    pub fn log(&self, mode: PromptMode) -> &[PromptEntry] {
        match mode {
            PromptMode::Ask => &self.ask_log,
            PromptMode::Clarify => &self.clarify_log,
        }
    }

    /// Mutable log for a prompt mode. The verbatim value, if any, is dropped
    /// so the log is re-encoded on the next read.
    pub fn log_mut(&mut self, mode: PromptMode) -> &mut Vec<PromptEntry> {
        self.raw_reserved.remove(mode.key());
        match mode {
            PromptMode::Ask => &mut self.ask_log,
            PromptMode::Clarify => &mut self.clarify_log,
        }
    }

    /// Replace the prompt library rows.
    pub fn set_prompt_rows(&mut self, rows: Vec<PromptRow>) {
        self.raw_reserved.remove(PROMPT_ROWS_KEY);
        self.prompt_rows = rows;
    }

    /// Trimmed answer, or `None` when missing or blank.
    pub fn answer(&self, key: &str) -> Option<&str> {
        self.answers
            .get(key)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    /// Encode as the flat mapping used for persistence and JSON export.
    ///
    /// Reserved keys carry their verbatim value when one was set, otherwise
    /// they are only present while their sequence is non-empty.
    pub fn to_flat_map(&self) -> Result<BTreeMap<String, String>, StoreError> {
        let mut map = self.answers.clone();
        for mode in PromptMode::ALL {
            if let Some(encoded) = encode_non_empty(self.log(mode))? {
                map.insert(mode.key().to_string(), encoded);
            }
        }
        if let Some(encoded) = encode_non_empty(&self.prompt_rows)? {
            map.insert(PROMPT_ROWS_KEY.to_string(), encoded);
        }
        map.extend(self.raw_reserved.clone());
        Ok(map)
    }

    /// Decode a flat mapping. Never fails: malformed reserved values are
    /// treated as empty.
    pub fn from_flat_map(map: BTreeMap<String, String>) -> Self {
        let mut state = Self::new();
        for (key, value) in map {
            state.set(&key, value);
        }
        state
    }
}

fn encode_non_empty<T: Serialize>(items: &[T]) -> Result<Option<String>, StoreError> {
    if items.is_empty() {
        return Ok(None);
    }
    serde_json::to_string(items)
        .map(Some)
        .map_err(|e| StoreError::serialize_error("sequence", e))
}

fn decode_or_empty<T: DeserializeOwned>(key: &str, raw: &str) -> Vec<T> {
    if raw.trim().is_empty() {
        return Vec::new();
    }
    match serde_json::from_str(raw) {
        Ok(items) => items,
        Err(e) => {
            tracing::debug!(key, error = %e, "ignoring malformed reserved value");
            Vec::new()
        }
    }
}
