//! Durable read/write of the history log.
//!
//! The whole log is serialized to JSON under a single key and overwritten on
//! every save. Nothing here returns an error: unreadable data loads as an empty
//! log and failed writes are logged and dropped.

use std::collections::HashSet;

use crate::storage::KeyValueStore;
use crate::types::{HistoryEntry, HistoryLog};

/// Key the serialized log is stored under.
pub const HISTORY_KEY: &str = "weatherHistory";

/// Persistence adapter between the history store and a key-value store.
pub struct HistoryPersistence {
    backend: Box<dyn KeyValueStore>,
}

impl HistoryPersistence {
    pub fn new(backend: Box<dyn KeyValueStore>) -> Self {
        Self { backend }
    }

    /// Read the persisted log. Empty when nothing was saved or the data is corrupt.
    pub fn load(&self) -> HistoryLog {
        let raw = match self.backend.get(HISTORY_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                tracing::debug!("No saved history found");
                return Vec::new();
            }
            Err(e) => {
                tracing::warn!("Failed to read history from storage: {}", e);
                return Vec::new();
            }
        };

        match serde_json::from_str::<HistoryLog>(&raw) {
            Ok(entries) => {
                let entries = dedup_by_id(entries);
                tracing::debug!("Loaded {} history entries", entries.len());
                entries
            }
            Err(e) => {
                tracing::warn!("Discarding unreadable history: {}", e);
                Vec::new()
            }
        }
    }

    /// Overwrite the persisted log with `history`.
    pub fn save(&self, history: &[HistoryEntry]) {
        let serialized = match serde_json::to_string(history) {
            Ok(s) => s,
            Err(e) => {
                tracing::error!("Failed to serialize history: {}", e);
                return;
            }
        };

        if let Err(e) = self.backend.set(HISTORY_KEY, &serialized) {
            tracing::warn!("Failed to save history ({} entries): {}", history.len(), e);
        }
    }
}

/// Keep the first (newest) entry for each id.
fn dedup_by_id(entries: HistoryLog) -> HistoryLog {
    let mut seen = HashSet::with_capacity(entries.len());
    let before = entries.len();
    let kept: HistoryLog = entries.into_iter().filter(|e| seen.insert(e.id)).collect();
    if kept.len() != before {
        tracing::warn!(
            "Dropped {} history entries with duplicate ids",
            before - kept.len()
        );
    }
    kept
}
