//! The session store: in-memory state with write-through persistence.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;

use super::error::StoreError;
use super::storage::Storage;
use super::types::{PromptEntry, PromptMode, PromptRow, SessionState};

/// Storage key of the session document.
pub const SESSION_STORAGE_KEY: &str = "delta_session";

/// Holds the current session and persists every mutation immediately.
///
/// Each write serializes the whole flat mapping; there is no incremental or
/// debounced persistence.
pub struct SessionStore {
    storage: Arc<dyn Storage>,
    state: SessionState,
}

impl SessionStore {
    /// Load the persisted session from `storage`.
    ///
    /// A missing document yields an empty session. A document that is not a
    /// string mapping is discarded with a warning rather than reported.
    pub fn open(storage: Arc<dyn Storage>) -> Result<Self, StoreError> {
        let state = match storage.get_item(SESSION_STORAGE_KEY)? {
            Some(raw) => match serde_json::from_str::<BTreeMap<String, String>>(&raw) {
                Ok(map) => SessionState::from_flat_map(map),
                Err(e) => {
                    tracing::warn!(error = %e, "stored session is unreadable, starting empty");
                    SessionState::new()
                }
            },
            None => SessionState::new(),
        };

        tracing::debug!(
            answers = state.answers.len(),
            asked = state.ask_log.len(),
            clarified = state.clarify_log.len(),
            prompt_rows = state.prompt_rows.len(),
            "session loaded"
        );

        Ok(Self { storage, state })
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Current value for a key, or an empty string if absent.
    pub fn get(&self, key: &str) -> String {
        self.state.get(key)
    }

    /// Overwrite or create `key`, then persist the whole session.
    pub fn set(&mut self, key: &str, value: impl Into<String>) -> Result<(), StoreError> {
        self.state.set(key, value);
        self.persist()
    }

    /// Append a new entry to the log for `mode` and persist.
    ///
    /// Timestamps never decrease within a log, even if the clock steps back.
    pub fn append_prompt_entry(
        &mut self,
        mode: PromptMode,
        text: impl Into<String>,
    ) -> Result<PromptEntry, StoreError> {
        let log = self.state.log_mut(mode);
        let now = Utc::now().timestamp_millis();
        let timestamp = log.last().map_or(now, |last| now.max(last.timestamp));
        let entry = PromptEntry::new(timestamp, text);
        log.push(entry.clone());

        tracing::debug!(mode = %mode, count = log.len(), "prompt entry appended");
        self.persist()?;
        Ok(entry)
    }

    /// Replace the prompt library rows and persist.
    pub fn set_prompt_rows(&mut self, rows: Vec<PromptRow>) -> Result<(), StoreError> {
        self.state.set_prompt_rows(rows);
        self.persist()
    }

    /// Drop the prompt library rows and persist.
    pub fn clear_prompt_rows(&mut self) -> Result<(), StoreError> {
        self.state.set_prompt_rows(Vec::new());
        self.persist()
    }

    /// Erase the persisted session and start over empty.
    ///
    /// Irreversible; callers are expected to have confirmed with the user.
    pub fn reset(&mut self) -> Result<(), StoreError> {
        self.storage.remove_item(SESSION_STORAGE_KEY)?;
        self.state = SessionState::new();
        tracing::info!("session reset");
        Ok(())
    }

    /// The flat mapping as it is persisted.
    pub fn flat_map(&self) -> Result<BTreeMap<String, String>, StoreError> {
        self.state.to_flat_map()
    }

    fn persist(&self) -> Result<(), StoreError> {
        let map = self.state.to_flat_map()?;
        let json = serde_json::to_string(&map)
            .map_err(|e| StoreError::serialize_error(SESSION_STORAGE_KEY, e))?;
        self.storage.set_item(SESSION_STORAGE_KEY, &json)
    }
}
