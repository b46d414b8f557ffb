use crate::{
    Config,
    model::{GeocodedPlace, WeatherSnapshot},
    provider::openweather::OpenWeatherProvider,
};
use async_trait::async_trait;
use std::{fmt::Debug, sync::Arc};

pub mod openweather;

/// Remote source of geocoding results and weather snapshots.
#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    /// Free-text place search, at most `limit` results.
    async fn geocode(&self, query: &str, limit: usize) -> anyhow::Result<Vec<GeocodedPlace>>;

    /// Current, hourly and daily weather for a coordinate in metric units.
    async fn one_call(&self, lat: f64, lon: f64) -> anyhow::Result<WeatherSnapshot>;
}

/// Construct the OpenWeatherMap provider from config.
pub fn provider_from_config(config: &Config) -> anyhow::Result<Arc<dyn WeatherProvider>> {
    let api_key = config.api_key()?;

    let provider = OpenWeatherProvider::builder(api_key.to_owned())
        .geocoding_url(&config.geocoding_url)
        .weather_url(&config.weather_url)
        .timeout(config.request_timeout())
        .build()?;

    Ok(Arc::new(provider))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_from_config_errors_when_missing_api_key() {
        let cfg = Config::default();
        let err = provider_from_config(&cfg).unwrap_err();
        assert!(err.to_string().contains("No OpenWeatherMap API key configured"));
    }

    #[test]
    fn provider_from_config_works_when_configured() {
        let mut cfg = Config::default();
        cfg.set_api_key("KEY".to_string());

        let provider = provider_from_config(&cfg);
        assert!(provider.is_ok());
    }
}
