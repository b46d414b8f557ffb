//! Fakes shared by the unit tests.

use anyhow::anyhow;
use async_trait::async_trait;
use std::{
    collections::HashSet,
    sync::{
        Mutex,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
    time::Duration,
};

use crate::{
    error::StoreError,
    model::{GeocodedPlace, WeatherSnapshot},
    provider::WeatherProvider,
    store::{KeyValueStore, MemoryStore},
};

/// One Call payload modelled on a real OpenWeatherMap response.
pub fn sample_snapshot_json(temp: f64) -> serde_json::Value {
    serde_json::json!({
        "lat": -19.1851,
        "lon": -46.2481,
        "timezone": "America/Sao_Paulo",
        "timezone_offset": -10800,
        "current": {
            "dt": 1619432400,
            "sunrise": 1619411980,
            "sunset": 1619458869,
            "temp": temp,
            "feels_like": 20.8,
            "pressure": 1014,
            "humidity": 56,
            "dew_point": 12.32,
            "uvi": 6.7,
            "clouds": 0,
            "visibility": 10000,
            "wind_speed": 3.6,
            "wind_deg": 150,
            "weather": [
                { "id": 800, "main": "Clear", "description": "clear sky", "icon": "01d" }
            ]
        },
        "hourly": [
            {
                "dt": 1619432400,
                "temp": temp,
                "feels_like": 20.8,
                "pressure": 1014,
                "humidity": 56,
                "dew_point": 12.32,
                "uvi": 6.7,
                "clouds": 0,
                "visibility": 10000,
                "wind_speed": 3.6,
                "wind_deg": 150,
                "weather": [
                    { "id": 800, "main": "Clear", "description": "clear sky", "icon": "01d" }
                ],
                "pop": 0
            },
            {
                "dt": 1619436000,
                "temp": 22.1,
                "feels_like": 21.4,
                "pressure": 1013,
                "humidity": 52,
                "dew_point": 11.9,
                "uvi": 5.2,
                "clouds": 20,
                "wind_speed": 4.1,
                "wind_deg": 160,
                "wind_gust": 6.3,
                "weather": [
                    { "id": 801, "main": "Clouds", "description": "few clouds", "icon": "02d" }
                ],
                "pop": 0.1
            }
        ],
        "daily": [
            {
                "dt": 1619438400,
                "sunrise": 1619411980,
                "sunset": 1619458869,
                "moonrise": 1619412600,
                "moonset": 1619466600,
                "moon_phase": 0.97,
                "temp": { "day": 21.5, "min": 11.21, "max": 22.71, "night": 15.84, "eve": 21.23, "morn": 11.21 },
                "feels_like": { "day": 20.8, "night": 15.11, "eve": 20.43, "morn": 10.26 },
                "pressure": 1014,
                "humidity": 56,
                "dew_point": 12.32,
                "wind_speed": 3.6,
                "wind_deg": 150,
                "weather": [
                    { "id": 800, "main": "Clear", "description": "clear sky", "icon": "01d" }
                ],
                "clouds": 0,
                "pop": 0,
                "uvi": 6.7
            }
        ]
    })
}

pub fn sample_snapshot(temp: f64) -> WeatherSnapshot {
    serde_json::from_value(sample_snapshot_json(temp)).expect("sample snapshot is valid")
}

pub fn place(name: &str, lat: f64, lon: f64) -> GeocodedPlace {
    GeocodedPlace {
        name: name.to_string(),
        state: None,
        country: "BR".to_string(),
        lat,
        lon,
    }
}

/// Scripted provider that counts calls.
#[derive(Debug, Default)]
pub struct FakeProvider {
    pub places: Mutex<Vec<GeocodedPlace>>,
    pub snapshot: Mutex<Option<WeatherSnapshot>>,
    pub fail: AtomicBool,
    pub delay: Mutex<Option<Duration>>,
    pub geocode_calls: AtomicUsize,
    pub weather_calls: AtomicUsize,
}

impl FakeProvider {
    pub fn with_places(places: Vec<GeocodedPlace>) -> Self {
        Self { places: Mutex::new(places), ..Self::default() }
    }

    pub fn with_snapshot(snapshot: WeatherSnapshot) -> Self {
        Self { snapshot: Mutex::new(Some(snapshot)), ..Self::default() }
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn set_snapshot(&self, snapshot: WeatherSnapshot) {
        *self.snapshot.lock().unwrap() = Some(snapshot);
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    pub fn geocode_calls(&self) -> usize {
        self.geocode_calls.load(Ordering::SeqCst)
    }

    pub fn weather_calls(&self) -> usize {
        self.weather_calls.load(Ordering::SeqCst)
    }

    async fn pause(&self) {
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl WeatherProvider for FakeProvider {
    // Ignores `limit` so callers' own truncation is exercised.
    async fn geocode(&self, _query: &str, _limit: usize) -> anyhow::Result<Vec<GeocodedPlace>> {
        self.geocode_calls.fetch_add(1, Ordering::SeqCst);
        self.pause().await;
        if self.fail.load(Ordering::SeqCst) {
            return Err(anyhow!("simulated geocoding outage"));
        }
        Ok(self.places.lock().unwrap().clone())
    }

    async fn one_call(&self, _lat: f64, _lon: f64) -> anyhow::Result<WeatherSnapshot> {
        self.weather_calls.fetch_add(1, Ordering::SeqCst);
        self.pause().await;
        if self.fail.load(Ordering::SeqCst) {
            return Err(anyhow!("simulated network outage"));
        }
        self.snapshot
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| anyhow!("no snapshot scripted"))
    }
}

/// Memory store whose writes fail for selected keys (or all keys).
#[derive(Debug, Default)]
pub struct FailingStore {
    inner: MemoryStore,
    fail_all: AtomicBool,
    failing_keys: Mutex<HashSet<String>>,
}

impl FailingStore {
    pub fn failing_all() -> Self {
        let store = Self::default();
        store.fail_all.store(true, Ordering::SeqCst);
        store
    }

    pub fn failing_key(key: &str) -> Self {
        let store = Self::default();
        store.failing_keys.lock().unwrap().insert(key.to_string());
        store
    }

    fn should_fail(&self, key: &str) -> bool {
        self.fail_all.load(Ordering::SeqCst) || self.failing_keys.lock().unwrap().contains(key)
    }

    fn denied(key: &str) -> StoreError {
        StoreError::Io {
            key: key.to_string(),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only storage"),
        }
    }
}

#[async_trait]
impl KeyValueStore for FailingStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: String) -> Result<(), StoreError> {
        if self.should_fail(key) {
            return Err(Self::denied(key));
        }
        self.inner.set(key, value).await
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        if self.should_fail(key) {
            return Err(Self::denied(key));
        }
        self.inner.remove(key).await
    }
}
