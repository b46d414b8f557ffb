use anyhow::{Context, Result};
use std::{sync::Arc, time::Duration};

use crate::{
    config::Config,
    error::{StoreError, WeatherError},
    forecast::{Forecast, WeatherFetchClient},
    history::HistoryRecorder,
    provider::{WeatherProvider, provider_from_config},
    search::LocationSearchClient,
    state::{LocationState, SettingsState},
    store::{FileStore, KeyValueStore},
};

/// All data-layer services, built once at start-up and handed to the front-end.
#[derive(Debug)]
pub struct WeatherApp {
    pub settings: Arc<SettingsState>,
    pub locations: Arc<LocationState>,
    pub history: HistoryRecorder,
    pub search: LocationSearchClient,
    pub weather: WeatherFetchClient,
}

impl WeatherApp {
    /// Opens the file-backed store from `config` and the OpenWeatherMap provider.
    pub async fn open(config: &Config) -> Result<Self> {
        let provider = provider_from_config(config)?;
        let data_dir = config.data_dir()?;
        let store = FileStore::open(data_dir.clone())
            .await
            .with_context(|| format!("Failed to open data directory: {}", data_dir.display()))?;

        tracing::debug!(data_dir = %data_dir.display(), "opened store");
        Self::from_parts(Arc::new(store), provider, config.request_timeout())
            .await
            .context("Failed to load persisted state")
    }

    pub async fn from_parts(
        store: Arc<dyn KeyValueStore>,
        provider: Arc<dyn WeatherProvider>,
        timeout: Duration,
    ) -> Result<Self, StoreError> {
        let settings = Arc::new(SettingsState::load(store.clone()).await?);
        let locations = Arc::new(LocationState::load(store.clone()).await?);
        let history = HistoryRecorder::new(store.clone());
        let search = LocationSearchClient::new(provider.clone(), store.clone()).with_timeout(timeout);
        let weather =
            WeatherFetchClient::new(provider, store, history.clone(), locations.clone(), timeout);

        Ok(Self { settings, locations, history, search, weather })
    }

    /// Weather for the selected location, selecting the default one first if needed.
    pub async fn current_forecast(&self) -> Result<Forecast, WeatherError> {
        let location = match self.locations.initialize().await {
            Ok(location) => location,
            Err(e) => {
                tracing::warn!(error = %e, "could not persist initial location");
                self.locations.current().await.unwrap_or_else(crate::state::default_location)
            }
        };
        self.weather.fetch_detailed(location.lat, location.lon).await
    }

    /// Waits for background work to finish. Call before exiting.
    pub async fn shutdown(&self) {
        self.weather.settle().await;
    }
}
