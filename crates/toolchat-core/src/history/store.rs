//! Per-session history storage
//!
//! A session keeps two things: the model-facing history (as JSON records)
//! and the display log shown to the user. Loading never fails; a missing or
//! unreadable session comes back empty.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::logging::{Logger, SharedLogger};
use crate::types::Content;

use super::codec::{deserialize_history, serialize_history};
use super::error::{HistoryError, HistoryResult};

/// Kind of a display log line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayKind {
    User,
    Model,
    Error,
}

/// One line of the user-facing transcript
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayEntry {
    #[serde(rename = "type")]
    pub kind: DisplayKind,
    pub text: String,
}

impl DisplayEntry {
    pub fn new(kind: DisplayKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }
}

/// Everything stored for one session
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    #[serde(default)]
    pub history: Vec<Value>,
    #[serde(default)]
    pub display: Vec<DisplayEntry>,
}

impl SessionRecord {
    /// Serialize `history` into a record; entries that fail to serialize are dropped
    pub fn new(history: &[Content], display: Vec<DisplayEntry>, logger: &dyn Logger) -> Self {
        let (records, dropped) = serialize_history(history, logger);
        if dropped {
            logger.warn("[History] Some entries could not be serialized and were not saved");
        }
        Self {
            history: records,
            display,
        }
    }

    /// Rebuild the model-facing history; a corrupt history comes back empty
    pub fn history(&self, logger: &dyn Logger) -> Vec<Content> {
        deserialize_history(&self.history, logger).unwrap_or_else(|| {
            logger.warn("[History] Stored history is unreadable, starting fresh");
            Vec::new()
        })
    }

    fn reset(error_message: Option<&str>) -> Self {
        Self {
            history: Vec::new(),
            display: error_message
                .map(|m| vec![DisplayEntry::new(DisplayKind::Error, m)])
                .unwrap_or_default(),
        }
    }

    /// Lenient parse: a malformed field is treated as empty
    fn from_value(value: Value) -> Self {
        let history = match value.get("history") {
            Some(Value::Array(items)) => items.clone(),
            _ => Vec::new(),
        };
        let display = value
            .get("display")
            .cloned()
            .and_then(|v| serde_json::from_value(v).ok())
            .unwrap_or_default();
        Self { history, display }
    }
}

/// Session history persistence
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Stored record for `session_id`, or an empty one
    async fn load(&self, session_id: &str) -> SessionRecord;

    async fn save(&self, session_id: &str, record: &SessionRecord) -> HistoryResult<()>;

    /// Clear the session, optionally leaving an error line in the display log
    async fn reset(&self, session_id: &str, error_message: Option<&str>) -> HistoryResult<()> {
        self.save(session_id, &SessionRecord::reset(error_message))
            .await
    }

    async fn delete(&self, session_id: &str) -> HistoryResult<()>;
}

/// In-memory store for tests and single-process use
#[derive(Debug, Default)]
pub struct MemoryHistoryStore {
    sessions: Mutex<HashMap<String, SessionRecord>>,
}

impl MemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.lock().is_empty()
    }
}

#[async_trait]
impl HistoryStore for MemoryHistoryStore {
    async fn load(&self, session_id: &str) -> SessionRecord {
        self.sessions
            .lock()
            .get(session_id)
            .cloned()
            .unwrap_or_default()
    }

    async fn save(&self, session_id: &str, record: &SessionRecord) -> HistoryResult<()> {
        self.sessions
            .lock()
            .insert(session_id.to_string(), record.clone());
        Ok(())
    }

    async fn delete(&self, session_id: &str) -> HistoryResult<()> {
        self.sessions
            .lock()
            .remove(session_id)
            .map(|_| ())
            .ok_or_else(|| HistoryError::NotFound(session_id.to_string()))
    }
}

/// One JSON file per session under a cache directory
pub struct FileHistoryStore {
    dir: PathBuf,
    logger: SharedLogger,
}

impl FileHistoryStore {
    pub fn new(dir: impl Into<PathBuf>, logger: SharedLogger) -> Self {
        let dir = dir.into();
        logger.debug(&format!(
            "[FileHistoryStore] Using cache directory {}",
            dir.display()
        ));
        Self { dir, logger }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File backing `session_id`
    pub fn session_path(&self, session_id: &str) -> PathBuf {
        self.dir.join(format!("{}.json", file_stem(session_id)))
    }
}

/// Filesystem-safe, collision-free stem: unsafe bytes become `%XX`
fn file_stem(session_id: &str) -> String {
    if session_id.is_empty() {
        return "%".to_string();
    }
    let mut stem = String::with_capacity(session_id.len());
    for byte in session_id.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'_' {
            stem.push(byte as char);
        } else {
            stem.push_str(&format!("%{:02X}", byte));
        }
    }
    stem
}

impl std::fmt::Debug for FileHistoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileHistoryStore")
            .field("dir", &self.dir)
            .finish()
    }
}

#[async_trait]
impl HistoryStore for FileHistoryStore {
    async fn load(&self, session_id: &str) -> SessionRecord {
        let path = self.session_path(session_id);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                self.logger.debug(&format!(
                    "[FileHistoryStore:{}] No stored session",
                    session_id
                ));
                return SessionRecord::default();
            }
            Err(e) => {
                self.logger.error(&format!(
                    "[FileHistoryStore:{}] Error reading {}: {}",
                    session_id,
                    path.display(),
                    e
                ));
                return SessionRecord::default();
            }
        };

        match serde_json::from_str::<Value>(&content) {
            Ok(value) if value.is_object() => SessionRecord::from_value(value),
            Ok(_) | Err(_) => {
                self.logger.warn(&format!(
                    "[FileHistoryStore:{}] Stored session is corrupt, returning empty record",
                    session_id
                ));
                SessionRecord::default()
            }
        }
    }

    async fn save(&self, session_id: &str, record: &SessionRecord) -> HistoryResult<()> {
        fs::create_dir_all(&self.dir)?;
        let path = self.session_path(session_id);
        let tmp = path.with_extension("json.tmp");

        fs::write(&tmp, serde_json::to_vec(record)?)?;
        fs::rename(&tmp, &path)?;

        self.logger.debug(&format!(
            "[FileHistoryStore:{}] Saved {} entries",
            session_id,
            record.history.len()
        ));
        Ok(())
    }

    async fn delete(&self, session_id: &str) -> HistoryResult<()> {
        match fs::remove_file(self.session_path(session_id)) {
            Ok(()) => {
                self.logger
                    .debug(&format!("[FileHistoryStore:{}] Deleted", session_id));
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(HistoryError::NotFound(session_id.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }
}
