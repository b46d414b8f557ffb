//! Capped list of past weather lookups, one entry per location.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::{
    error::StoreError,
    model::{HistoryEntry, Location, WeatherSnapshot},
    store::{KeyValueStore, load_json, save_json},
};

pub const HISTORY_KEY: &str = "weather-app-history";
pub const HISTORY_LIMIT: usize = 5;

#[derive(Debug, Default, Serialize, Deserialize)]
struct HistoryDocument {
    #[serde(default)]
    history: Vec<HistoryEntry>,
}

#[derive(Debug, Clone)]
pub struct HistoryRecorder {
    store: Arc<dyn KeyValueStore>,
    // Serializes read-modify-write of the persisted list.
    write_lock: Arc<Mutex<()>>,
}

impl HistoryRecorder {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store, write_lock: Arc::new(Mutex::new(())) }
    }

    pub async fn record(
        &self,
        location: &Location,
        snapshot: &WeatherSnapshot,
    ) -> Result<HistoryEntry, StoreError> {
        self.record_at(location, snapshot, Utc::now()).await
    }

    pub async fn record_at(
        &self,
        location: &Location,
        snapshot: &WeatherSnapshot,
        now: DateTime<Utc>,
    ) -> Result<HistoryEntry, StoreError> {
        let entry = HistoryEntry::from_snapshot(location, snapshot, now);

        let _guard = self.write_lock.lock().await;
        let mut doc = self.load().await?;
        insert_entry(&mut doc.history, entry.clone(), HISTORY_LIMIT);
        save_json(self.store.as_ref(), HISTORY_KEY, &doc).await?;

        tracing::debug!(location = %entry.location.id, entries = doc.history.len(), "history updated");
        Ok(entry)
    }

    /// All entries, newest first.
    pub async fn list(&self) -> Result<Vec<HistoryEntry>, StoreError> {
        let mut history = self.load().await?.history;
        history.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(history)
    }

    pub async fn clear(&self) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        save_json(self.store.as_ref(), HISTORY_KEY, &HistoryDocument::default()).await
    }

    async fn load(&self) -> Result<HistoryDocument, StoreError> {
        Ok(load_json(self.store.as_ref(), HISTORY_KEY).await?.unwrap_or_default())
    }
}

/// Puts `entry` at the front, dropping any older entry for the same location,
/// then keeps the `limit` most recently touched entries.
fn insert_entry(history: &mut Vec<HistoryEntry>, entry: HistoryEntry, limit: usize) {
    history.retain(|existing| existing.location.id != entry.location.id);
    history.insert(0, entry);
    history.truncate(limit);
}
