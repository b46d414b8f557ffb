//! Timestamped cache entries stored in the key-value store.
//!
//! Freshness is decided by the reader. Nothing is ever evicted here, so an
//! expired entry is still available as a fallback.

use chrono::{DateTime, Utc};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};
use std::{sync::Arc, time::Duration};

use crate::{
    error::StoreError,
    model::{Location, WeatherSnapshot, coord_key},
    store::KeyValueStore,
};

/// A payload type that can be cached, and the document field it lives under.
pub trait CachePayload: Serialize + DeserializeOwned {
    const FIELD: &'static str;
}

impl CachePayload for Vec<Location> {
    const FIELD: &'static str = "results";
}

impl CachePayload for WeatherSnapshot {
    const FIELD: &'static str = "data";
}

#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry<T> {
    pub payload: T,
    pub captured_at: DateTime<Utc>,
}

impl<T> CacheEntry<T> {
    pub fn age(&self, now: DateTime<Utc>) -> chrono::Duration {
        now - self.captured_at
    }

    /// Entries stamped in the future count as fresh.
    pub fn is_fresh(&self, max_age: Duration, now: DateTime<Utc>) -> bool {
        match self.age(now).to_std() {
            Ok(age) => age <= max_age,
            Err(_) => true,
        }
    }
}

pub fn normalize_query(query: &str) -> String {
    query.trim().to_lowercase()
}

pub fn search_key(query: &str) -> String {
    format!("location_search_{}", normalize_query(query))
}

pub fn weather_key(lat: f64, lon: f64) -> String {
    format!("weather_{}", coord_key(lat, lon))
}

/// Best-effort JSON cache over a [`KeyValueStore`].
#[derive(Debug, Clone)]
pub struct JsonCache {
    store: Arc<dyn KeyValueStore>,
}

impl JsonCache {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Read an entry regardless of age. Read failures are logged and count as a miss.
    pub async fn read<T: CachePayload>(&self, key: &str) -> Option<CacheEntry<T>> {
        match self.try_read(key).await {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(key, error = %e, "cache read failed, treating as miss");
                None
            }
        }
    }

    /// Write an entry. Failures are logged and swallowed; returns whether it was stored.
    pub async fn write<T: CachePayload>(&self, key: &str, payload: &T, now: DateTime<Utc>) -> bool {
        match self.try_write(key, payload, now).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(key, error = %e, "cache write failed");
                false
            }
        }
    }

    async fn try_read<T: CachePayload>(&self, key: &str) -> Result<Option<CacheEntry<T>>, StoreError> {
        let Some(raw) = self.store.get(key).await? else {
            return Ok(None);
        };
        let json_err = |source| StoreError::Json { key: key.to_string(), source };

        let mut doc: Map<String, Value> = serde_json::from_str(&raw).map_err(json_err)?;
        let payload = doc.remove(T::FIELD).unwrap_or(Value::Null);
        let payload: T = serde_json::from_value(payload).map_err(json_err)?;

        let millis = doc.get("timestamp").and_then(Value::as_i64);
        let Some(captured_at) = millis.and_then(DateTime::<Utc>::from_timestamp_millis) else {
            tracing::warn!(key, "cache entry has no usable timestamp, treating as miss");
            return Ok(None);
        };

        Ok(Some(CacheEntry { payload, captured_at }))
    }

    async fn try_write<T: CachePayload>(
        &self,
        key: &str,
        payload: &T,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let json_err = |source| StoreError::Json { key: key.to_string(), source };

        let mut doc = Map::new();
        doc.insert(T::FIELD.to_string(), serde_json::to_value(payload).map_err(json_err)?);
        doc.insert("timestamp".to_string(), Value::from(now.timestamp_millis()));

        let raw = serde_json::to_string(&doc).map_err(json_err)?;
        self.store.set(key, raw).await
    }
}
