use anyhow::anyhow;
use chrono::{DateTime, Utc};
use std::{sync::Arc, time::Duration};
use tokio_util::task::TaskTracker;

use crate::{
    cache::{CacheEntry, JsonCache, weather_key},
    error::WeatherError,
    history::HistoryRecorder,
    model::WeatherSnapshot,
    provider::WeatherProvider,
    state::LocationState,
    store::KeyValueStore,
};

/// Age after which cached weather is reported as stale. It is still served
/// when the network is unavailable.
pub const WEATHER_TTL: Duration = Duration::from_secs(60 * 60);

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DataOrigin {
    Network,
    Cache { captured_at: DateTime<Utc>, fresh: bool },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Forecast {
    pub snapshot: WeatherSnapshot,
    pub origin: DataOrigin,
}

impl Forecast {
    /// True when the network failed and cached data was served instead.
    pub fn is_degraded(&self) -> bool {
        matches!(self.origin, DataOrigin::Cache { .. })
    }
}

/// Fetches weather by coordinate, writing through to the cache and falling
/// back to any cached copy when the network call fails.
#[derive(Debug, Clone)]
pub struct WeatherFetchClient {
    provider: Arc<dyn WeatherProvider>,
    cache: JsonCache,
    history: HistoryRecorder,
    locations: Arc<LocationState>,
    timeout: Duration,
    tasks: TaskTracker,
}

impl WeatherFetchClient {
    pub fn new(
        provider: Arc<dyn WeatherProvider>,
        store: Arc<dyn KeyValueStore>,
        history: HistoryRecorder,
        locations: Arc<LocationState>,
        timeout: Duration,
    ) -> Self {
        Self {
            provider,
            cache: JsonCache::new(store),
            history,
            locations,
            timeout,
            tasks: TaskTracker::new(),
        }
    }

    pub async fn fetch(&self, lat: f64, lon: f64) -> Result<WeatherSnapshot, WeatherError> {
        self.fetch_detailed(lat, lon).await.map(|forecast| forecast.snapshot)
    }

    pub async fn fetch_detailed(&self, lat: f64, lon: f64) -> Result<Forecast, WeatherError> {
        self.fetch_with_clock(lat, lon, Utc::now).await
    }

    /// Like [`fetch_detailed`](Self::fetch_detailed) with a fixed clock.
    pub async fn fetch_at(
        &self,
        lat: f64,
        lon: f64,
        now: DateTime<Utc>,
    ) -> Result<Forecast, WeatherError> {
        self.fetch_with_clock(lat, lon, move || now).await
    }

    // The clock is read once the request has finished, so capture times
    // reflect when the data arrived.
    async fn fetch_with_clock(
        &self,
        lat: f64,
        lon: f64,
        clock: impl Fn() -> DateTime<Utc>,
    ) -> Result<Forecast, WeatherError> {
        let key = weather_key(lat, lon);

        let failure = match tokio::time::timeout(self.timeout, self.provider.one_call(lat, lon)).await {
            Ok(Ok(snapshot)) => {
                let captured_at = clock();
                self.cache.write(&key, &snapshot, captured_at).await;
                self.record_in_background(&key, snapshot.clone(), captured_at).await;
                return Ok(Forecast { snapshot, origin: DataOrigin::Network });
            }
            Ok(Err(e)) => e,
            Err(_) => anyhow!("weather request timed out after {:?}", self.timeout),
        };

        tracing::warn!(lat, lon, error = %format!("{failure:#}"), "weather fetch failed, trying cache");

        let now = clock();
        match self.cache.read::<WeatherSnapshot>(&key).await {
            Some(entry) => {
                let fresh = entry.is_fresh(WEATHER_TTL, now);
                if !fresh {
                    tracing::info!(
                        key,
                        age_minutes = entry.age(now).num_minutes(),
                        "cached weather is older than an hour, serving it anyway"
                    );
                }
                Ok(Forecast {
                    snapshot: entry.payload,
                    origin: DataOrigin::Cache { captured_at: entry.captured_at, fresh },
                })
            }
            None => Err(WeatherError::FetchFailed { lat, lon, source: failure }),
        }
    }

    /// Cached weather for a coordinate, whatever its age. Never touches the network.
    pub async fn cached(&self, lat: f64, lon: f64) -> Option<CacheEntry<WeatherSnapshot>> {
        self.cache.read(&weather_key(lat, lon)).await
    }

    /// Waits for pending history writes.
    pub async fn settle(&self) {
        self.tasks.close();
        self.tasks.wait().await;
        self.tasks.reopen();
    }

    /// Files the snapshot under the selected location, if the fetched
    /// coordinate is that location. The write itself is detached.
    async fn record_in_background(&self, key: &str, snapshot: WeatherSnapshot, at: DateTime<Utc>) {
        let Some(location) = self.locations.current().await else {
            tracing::debug!("no location selected, history not recorded");
            return;
        };
        if weather_key(location.lat, location.lon) != key {
            tracing::debug!(key, selected = %location.id, "fetched coordinate is not the selected location, history not recorded");
            return;
        }

        let history = self.history.clone();
        self.tasks.spawn(async move {
            if let Err(e) = history.record_at(&location, &snapshot, at).await {
                tracing::warn!(error = %e, "failed to record weather history");
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        history::HISTORY_KEY,
        model::Location,
        store::MemoryStore,
        testing::{FailingStore, FakeProvider, sample_snapshot},
    };
    use chrono::TimeDelta;

    const LAT: f64 = -19.1851;
    const LON: f64 = -46.2481;

    struct Harness {
        client: WeatherFetchClient,
        provider: Arc<FakeProvider>,
        locations: Arc<LocationState>,
        history: HistoryRecorder,
    }

    async fn harness(store: Arc<dyn KeyValueStore>) -> Harness {
        let provider = Arc::new(FakeProvider::with_snapshot(sample_snapshot(21.5)));
        let history = HistoryRecorder::new(store.clone());
        let locations = Arc::new(LocationState::load(store.clone()).await.unwrap());
        let client = WeatherFetchClient::new(
            provider.clone(),
            store,
            history.clone(),
            locations.clone(),
            Duration::from_secs(5),
        );
        Harness { client, provider, locations, history }
    }

    fn here() -> Location {
        Location::new("Rio Paranaíba", None, "BR", LAT, LON)
    }

    #[tokio::test]
    async fn network_result_is_returned_and_cached_verbatim() {
        let h = harness(Arc::new(MemoryStore::new())).await;

        let forecast = h.client.fetch_detailed(LAT, LON).await.unwrap();
        assert_eq!(forecast.origin, DataOrigin::Network);
        assert_eq!(forecast.snapshot, sample_snapshot(21.5));

        let cached = h.client.cached(LAT, LON).await.expect("written through");
        assert_eq!(cached.payload, forecast.snapshot);
        assert_eq!(h.provider.weather_calls(), 1);
    }

    #[tokio::test]
    async fn failure_serves_cache_regardless_of_age() {
        let h = harness(Arc::new(MemoryStore::new())).await;
        let t0 = Utc::now();
        h.client.fetch_at(LAT, LON, t0).await.unwrap();

        h.provider.set_failing(true);
        h.provider.set_snapshot(sample_snapshot(-5.0));
        let later = t0 + TimeDelta::days(3);

        let forecast = h.client.fetch_at(LAT, LON, later).await.unwrap();
        assert_eq!(forecast.snapshot, sample_snapshot(21.5));
        assert_eq!(forecast.origin, DataOrigin::Cache { captured_at: truncate_ms(t0), fresh: false });
        assert!(forecast.is_degraded());
    }

    #[tokio::test]
    async fn failure_within_the_hour_reports_fresh_cache() {
        let h = harness(Arc::new(MemoryStore::new())).await;
        let t0 = Utc::now();
        h.client.fetch_at(LAT, LON, t0).await.unwrap();
        h.provider.set_failing(true);

        let forecast = h.client.fetch_at(LAT, LON, t0 + TimeDelta::minutes(30)).await.unwrap();
        assert!(matches!(forecast.origin, DataOrigin::Cache { fresh: true, .. }));
    }

    #[tokio::test]
    async fn failure_without_cache_is_fetch_failed() {
        let h = harness(Arc::new(MemoryStore::new())).await;
        h.provider.set_failing(true);

        let err = h.client.fetch(LAT, LON).await.unwrap_err();
        assert!(matches!(err, WeatherError::FetchFailed { lat, lon, .. } if lat == LAT && lon == LON));
    }

    #[tokio::test]
    async fn cache_for_other_coordinates_is_not_used() {
        let h = harness(Arc::new(MemoryStore::new())).await;
        h.client.fetch(LAT, LON).await.unwrap();
        h.provider.set_failing(true);

        assert!(h.client.fetch(LAT, LON + 0.0001).await.is_err());
    }

    #[tokio::test]
    async fn success_records_history_for_current_location() {
        let h = harness(Arc::new(MemoryStore::new())).await;
        h.locations.set_current(here()).await.unwrap();

        h.client.fetch(LAT, LON).await.unwrap();
        h.client.settle().await;

        let entries = h.history.list().await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].location, here());
        assert_eq!(entries[0].temperature, 21.5);
    }

    #[tokio::test]
    async fn other_coordinate_is_not_filed_under_the_selected_location() {
        let h = harness(Arc::new(MemoryStore::new())).await;
        h.locations.set_current(here()).await.unwrap();

        h.client.fetch(64.1, -21.9).await.unwrap();
        h.client.settle().await;

        assert!(h.history.list().await.unwrap().is_empty());
        assert!(h.client.cached(64.1, -21.9).await.is_some());
    }

    #[tokio::test]
    async fn history_uses_the_location_selected_when_the_fetch_succeeded() {
        let h = harness(Arc::new(MemoryStore::new())).await;
        h.locations.set_current(here()).await.unwrap();

        h.client.fetch(LAT, LON).await.unwrap();
        let elsewhere = Location::new("Lisbon", None, "PT", 38.7223, -9.1393);
        h.locations.set_current(elsewhere).await.unwrap();
        h.client.settle().await;

        let entries = h.history.list().await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].location, here());
    }

    #[tokio::test]
    async fn capture_time_is_taken_after_the_response() {
        let h = harness(Arc::new(MemoryStore::new())).await;
        h.locations.set_current(here()).await.unwrap();
        h.provider.set_delay(Duration::from_millis(300));

        let before = Utc::now();
        h.client.fetch(LAT, LON).await.unwrap();
        h.client.settle().await;

        let earliest = truncate_ms(before) + TimeDelta::milliseconds(300);
        assert!(h.client.cached(LAT, LON).await.unwrap().captured_at >= earliest);
        assert!(h.history.list().await.unwrap()[0].timestamp >= earliest);
    }

    #[tokio::test]
    async fn no_selected_location_skips_history() {
        let h = harness(Arc::new(MemoryStore::new())).await;

        h.client.fetch(LAT, LON).await.unwrap();
        h.client.settle().await;

        assert!(h.history.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn served_from_cache_does_not_touch_history() {
        let h = harness(Arc::new(MemoryStore::new())).await;
        h.client.fetch(LAT, LON).await.unwrap();
        h.client.settle().await;

        h.locations.set_current(here()).await.unwrap();
        h.provider.set_failing(true);
        h.client.fetch(LAT, LON).await.unwrap();
        h.client.settle().await;

        assert!(h.history.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn history_failure_does_not_reach_the_caller() {
        let h = harness(Arc::new(FailingStore::failing_key(HISTORY_KEY))).await;
        h.locations.set_current(here()).await.unwrap();

        let snapshot = h.client.fetch(LAT, LON).await.unwrap();
        h.client.settle().await;

        assert_eq!(snapshot, sample_snapshot(21.5));
        assert!(h.history.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn cache_write_failure_does_not_reach_the_caller() {
        let h = harness(Arc::new(FailingStore::failing_all())).await;

        assert!(h.client.fetch(LAT, LON).await.is_ok());
        assert!(h.client.cached(LAT, LON).await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_falls_back_to_cache() {
        let h = harness(Arc::new(MemoryStore::new())).await;
        h.client.fetch(LAT, LON).await.unwrap();

        h.provider.set_delay(Duration::from_secs(60));
        let forecast = h.client.fetch_detailed(LAT, LON).await.unwrap();
        assert!(forecast.is_degraded());
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_without_cache_is_fetch_failed() {
        let h = harness(Arc::new(MemoryStore::new())).await;
        h.provider.set_delay(Duration::from_secs(60));

        let err = h.client.fetch(LAT, LON).await.unwrap_err();
        assert!(format!("{err:#}").contains("timed out"));
    }

    fn truncate_ms(t: DateTime<Utc>) -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp_millis(t.timestamp_millis()).unwrap()
    }
}
