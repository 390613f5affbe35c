//! Session state, its storage backends, and the write-through store.
//!
//! A session is the set of answers a user has typed into the workbook plus
//! the "ask"/"clarify" prompt logs and the loaded prompt library. It is
//! persisted under a single storage key as a flat string mapping.

mod error;
mod storage;
mod store;
mod types;

pub use error::StoreError;
pub use storage::{default_data_dir, FileStorage, MemoryStorage, Storage};
pub use store::{SessionStore, SESSION_STORAGE_KEY};
pub use types::{
    is_reserved_namespace, split_answer_key, PromptEntry, PromptMode, PromptRow, SessionKey,
    SessionState, ASK_LOG_KEY, CLARIFY_LOG_KEY, PROMPT_ROWS_KEY,
};
