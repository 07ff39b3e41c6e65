//! Conversation history persistence and management
//!
//! The orchestrator never keeps history between turns; the caller loads it
//! from a `HistoryStore`, trims it with `HistoryManager`, runs the turn and
//! saves the returned history back.
//!
//! ```text
//! HistoryStore::load ──► SessionRecord::history ──► HistoryManager::manage
//!                                                          │
//!  HistoryStore::save ◄── SessionRecord::new ◄── run_turn ◄┘
//! ```

mod codec;
mod error;
mod manager;
mod store;

pub use codec::{deserialize_history, serialize_history};
pub use error::{HistoryError, HistoryResult};
pub use manager::{
    HistoryManager, HistorySettings, DEFAULT_CACHE_DIR, DEFAULT_MAX_HISTORY_TOKENS,
    DEFAULT_TARGET_SUMMARY_TOKENS,
};
pub use store::{
    DisplayEntry, DisplayKind, FileHistoryStore, HistoryStore, MemoryHistoryStore, SessionRecord,
};
