use std::sync::Arc;

use crate::models::SearchHistoryEntry;
use crate::services::cache::{CacheError, KeyValueStore};

pub const DEFAULT_MAX_ENTRIES: usize = 5;

/// Recent anchor searches, most recent first, persisted as one JSON blob
pub struct SearchHistoryStore {
    store: Arc<dyn KeyValueStore>,
    key: String,
    max_entries: usize,
    // Serializes read-modify-write cycles on the blob
    write_lock: tokio::sync::Mutex<()>,
}

impl SearchHistoryStore {
    pub fn new(store: Arc<dyn KeyValueStore>, key: String, max_entries: usize) -> Self {
        Self {
            store,
            key,
            max_entries: max_entries.max(1),
            write_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Stored entries; a missing or unreadable blob reads as empty
    pub async fn list(&self) -> Vec<SearchHistoryEntry> {
        match self.store.get(&self.key).await {
            Ok(Some(blob)) => decode(&blob, &self.key),
            Ok(None) => Vec::new(),
            Err(e) => {
                tracing::warn!("Failed to read search history {}: {}", self.key, e);
                Vec::new()
            }
        }
    }

    /// Prepend `entry`, dropping any older entry for the same address
    pub async fn record(&self, entry: SearchHistoryEntry) -> Result<Vec<SearchHistoryEntry>, CacheError> {
        let _guard = self.write_lock.lock().await;

        let entries = push_entry(self.list().await, entry, self.max_entries);
        let blob = serde_json::to_string(&entries)?;
        self.store.set(&self.key, &blob).await?;

        Ok(entries)
    }
}

/// Dedup by exact address, prepend, then cap the list
pub fn push_entry(
    mut entries: Vec<SearchHistoryEntry>,
    entry: SearchHistoryEntry,
    max_entries: usize,
) -> Vec<SearchHistoryEntry> {
    entries.retain(|e| e.address != entry.address);
    entries.insert(0, entry);
    entries.truncate(max_entries);
    entries
}

fn decode(blob: &str, key: &str) -> Vec<SearchHistoryEntry> {
    if blob.trim().is_empty() {
        return Vec::new();
    }
    serde_json::from_str(blob).unwrap_or_else(|e| {
        tracing::warn!("Discarding corrupt search history {}: {}", key, e);
        Vec::new()
    })
}
