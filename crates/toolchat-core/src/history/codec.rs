//! History <-> JSON records
//!
//! One record per entry, parts tagged by `kind`:
//!
//! ```json
//! {"role": "model", "parts": [{"kind": "function_call", "name": "list_dir", "args": {"path": "/tmp"}}]}
//! ```

use serde_json::Value;

use crate::logging::Logger;
use crate::types::Content;

/// Serialize every entry. An entry that fails is logged and left out; the
/// flag reports whether that happened.
pub fn serialize_history(history: &[Content], logger: &dyn Logger) -> (Vec<Value>, bool) {
    let mut records = Vec::with_capacity(history.len());
    let mut dropped = false;

    for (i, entry) in history.iter().enumerate() {
        match serde_json::to_value(entry) {
            Ok(record) => records.push(record),
            Err(e) => {
                dropped = true;
                logger.error(&format!("[History] Error serializing entry #{}: {}", i, e));
            }
        }
    }

    (records, dropped)
}

/// Rebuild a history. Any malformed record fails the whole history.
pub fn deserialize_history(records: &[Value], logger: &dyn Logger) -> Option<Vec<Content>> {
    let mut history = Vec::with_capacity(records.len());
    for (i, record) in records.iter().enumerate() {
        match serde_json::from_value::<Content>(record.clone()) {
            Ok(entry) => history.push(entry),
            Err(e) => {
                logger.error(&format!(
                    "[History] Error deserializing record #{}: {}",
                    i, e
                ));
                return None;
            }
        }
    }
    Some(history)
}
