//! Core library for the `skywatch` weather app.
//!
//! This crate defines:
//! - Location search and weather fetching over OpenWeatherMap
//! - A timestamped cache with stale-serving fallback
//! - A capped history of past lookups
//! - Persisted settings and location selection
//!
//! It is used by `skywatch-cli`, but carries no front-end of its own.

pub mod app;
pub mod cache;
pub mod config;
pub mod error;
pub mod forecast;
pub mod format;
pub mod history;
pub mod model;
pub mod provider;
pub mod search;
pub mod state;
pub mod store;

#[cfg(test)]
mod testing;

pub use app::WeatherApp;
pub use cache::CacheEntry;
pub use config::Config;
pub use error::{StoreError, WeatherError};
pub use forecast::{DataOrigin, Forecast, WeatherFetchClient};
pub use history::HistoryRecorder;
pub use model::{HistoryEntry, Location, WeatherSnapshot};
pub use provider::WeatherProvider;
pub use search::LocationSearchClient;
pub use store::{FileStore, KeyValueStore, MemoryStore};
