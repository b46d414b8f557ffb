use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::time::Duration;

use crate::{
    config::{DEFAULT_GEOCODING_URL, DEFAULT_TIMEOUT_SECS, DEFAULT_WEATHER_URL},
    model::{GeocodedPlace, WeatherSnapshot},
};

use super::WeatherProvider;

#[derive(Debug, Clone)]
pub struct OpenWeatherProvider {
    api_key: String,
    geocoding_url: String,
    weather_url: String,
    http: Client,
}

#[derive(Debug, Clone)]
pub struct OpenWeatherProviderBuilder {
    api_key: String,
    geocoding_url: String,
    weather_url: String,
    timeout: Duration,
}

impl OpenWeatherProviderBuilder {
    pub fn geocoding_url(mut self, url: &str) -> Self {
        self.geocoding_url = url.trim_end_matches('/').to_string();
        self
    }

    pub fn weather_url(mut self, url: &str) -> Self {
        self.weather_url = url.trim_end_matches('/').to_string();
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn build(self) -> Result<OpenWeatherProvider> {
        let http = Client::builder()
            .timeout(self.timeout)
            .build()
            .context("Failed to build HTTP client for OpenWeather")?;

        Ok(OpenWeatherProvider {
            api_key: self.api_key,
            geocoding_url: self.geocoding_url,
            weather_url: self.weather_url,
            http,
        })
    }
}

impl OpenWeatherProvider {
    pub fn builder(api_key: String) -> OpenWeatherProviderBuilder {
        OpenWeatherProviderBuilder {
            api_key,
            geocoding_url: DEFAULT_GEOCODING_URL.to_string(),
            weather_url: DEFAULT_WEATHER_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
        what: &str,
    ) -> Result<T> {
        let res = self
            .http
            .get(url)
            .query(query)
            .query(&[("appid", self.api_key.as_str())])
            .send()
            .await
            .with_context(|| format!("Failed to send request to OpenWeather ({what})"))?;

        let status = res.status();
        let body = res
            .text()
            .await
            .with_context(|| format!("Failed to read OpenWeather {what} response body"))?;

        if !status.is_success() {
            return Err(anyhow!(
                "OpenWeather {} request failed with status {}: {}",
                what,
                status,
                truncate_body(&body),
            ));
        }

        serde_json::from_str(&body).with_context(|| format!("Failed to parse OpenWeather {what} JSON"))
    }
}

#[async_trait]
impl WeatherProvider for OpenWeatherProvider {
    async fn geocode(&self, query: &str, limit: usize) -> Result<Vec<GeocodedPlace>> {
        let url = format!("{}/direct", self.geocoding_url);
        let limit_s = limit.to_string();

        tracing::info!(query, "searching locations");
        let mut places: Vec<GeocodedPlace> = self
            .get_json(&url, &[("q", query), ("limit", limit_s.as_str())], "geocoding")
            .await?;

        places.truncate(limit);
        Ok(places)
    }

    async fn one_call(&self, lat: f64, lon: f64) -> Result<WeatherSnapshot> {
        let url = format!("{}/onecall", self.weather_url);
        let (lat_s, lon_s) = (lat.to_string(), lon.to_string());

        tracing::info!(lat, lon, "fetching one call weather");
        self.get_json(
            &url,
            &[
                ("lat", lat_s.as_str()),
                ("lon", lon_s.as_str()),
                ("units", "metric"),
                ("exclude", "minutely"),
            ],
            "one call",
        )
        .await
    }
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}
