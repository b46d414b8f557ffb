use anyhow::anyhow;
use chrono::{DateTime, Utc};
use std::{sync::Arc, time::Duration};

use crate::{
    cache::{JsonCache, search_key},
    config::DEFAULT_TIMEOUT_SECS,
    error::WeatherError,
    model::Location,
    provider::WeatherProvider,
    store::KeyValueStore,
};

/// Cached search results are reused for a day.
pub const SEARCH_TTL: Duration = Duration::from_secs(24 * 60 * 60);

pub const SEARCH_LIMIT: usize = 5;

/// Shortest query callers should send. The client itself does not check it.
pub const MIN_QUERY_LEN: usize = 3;

/// Geocoding search with a per-query cache. No stale fallback on failure.
#[derive(Debug, Clone)]
pub struct LocationSearchClient {
    provider: Arc<dyn WeatherProvider>,
    cache: JsonCache,
    timeout: Duration,
}

impl LocationSearchClient {
    pub fn new(provider: Arc<dyn WeatherProvider>, store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            provider,
            cache: JsonCache::new(store),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    /// Bound on each geocoding call. Expiry is reported as `SearchFailed`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub async fn search(&self, query: &str) -> Result<Vec<Location>, WeatherError> {
        self.search_at(query, Utc::now()).await
    }

    pub async fn search_at(
        &self,
        query: &str,
        now: DateTime<Utc>,
    ) -> Result<Vec<Location>, WeatherError> {
        let key = search_key(query);

        if let Some(entry) = self.cache.read::<Vec<Location>>(&key).await {
            if entry.is_fresh(SEARCH_TTL, now) {
                tracing::debug!(key, "location search served from cache");
                return Ok(entry.payload);
            }
            tracing::debug!(key, "cached location search expired");
        }

        let places = match tokio::time::timeout(self.timeout, self.provider.geocode(query, SEARCH_LIMIT)).await {
            Ok(result) => result,
            Err(_) => Err(anyhow!("location search timed out after {:?}", self.timeout)),
        }
        .map_err(|source| WeatherError::SearchFailed { query: query.to_string(), source })?;

        let locations: Vec<Location> =
            places.into_iter().take(SEARCH_LIMIT).map(Location::from).collect();

        self.cache.write(&key, &locations, now).await;

        Ok(locations)
    }
}
