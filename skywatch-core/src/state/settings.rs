use serde::{Deserialize, Serialize};
use std::{ops::RangeInclusive, sync::Arc};
use tokio::sync::RwLock;

use crate::{
    error::StoreError,
    store::{KeyValueStore, load_json, save_json},
};

pub const SETTINGS_KEY: &str = "weather-app-settings";

pub const SPEECH_RATE_RANGE: RangeInclusive<f32> = 0.5..=3.0;
pub const FONT_SCALE_RANGE: RangeInclusive<f32> = 0.8..=2.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TemperatureUnit {
    #[default]
    Celsius,
    Fahrenheit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum WindSpeedUnit {
    #[default]
    Kmh,
    Mph,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub temperature_unit: TemperatureUnit,
    pub wind_speed_unit: WindSpeedUnit,
    pub high_contrast: bool,
    pub font_scale: f32,
    pub speech_rate: f32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            temperature_unit: TemperatureUnit::Celsius,
            wind_speed_unit: WindSpeedUnit::Kmh,
            high_contrast: false,
            font_scale: 1.0,
            speech_rate: 1.0,
        }
    }
}

fn clamp(value: f32, range: &RangeInclusive<f32>) -> f32 {
    if value.is_nan() {
        return 1.0;
    }
    value.clamp(*range.start(), *range.end())
}

#[derive(Debug)]
pub struct SettingsState {
    store: Arc<dyn KeyValueStore>,
    current: RwLock<Settings>,
}

impl SettingsState {
    /// Load persisted settings. A missing or unreadable document yields defaults.
    pub async fn load(store: Arc<dyn KeyValueStore>) -> Result<Self, StoreError> {
        let settings = match load_json::<Settings>(store.as_ref(), SETTINGS_KEY).await {
            Ok(found) => found.unwrap_or_default(),
            Err(StoreError::Json { source, .. }) => {
                tracing::warn!(error = %source, "stored settings are corrupt, using defaults");
                Settings::default()
            }
            Err(e) => return Err(e),
        };

        Ok(Self { store, current: RwLock::new(settings) })
    }

    pub async fn get(&self) -> Settings {
        self.current.read().await.clone()
    }

    pub async fn set_temperature_unit(&self, unit: TemperatureUnit) -> Result<Settings, StoreError> {
        self.update(|s| s.temperature_unit = unit).await
    }

    pub async fn set_wind_speed_unit(&self, unit: WindSpeedUnit) -> Result<Settings, StoreError> {
        self.update(|s| s.wind_speed_unit = unit).await
    }

    pub async fn set_high_contrast(&self, enabled: bool) -> Result<Settings, StoreError> {
        self.update(|s| s.high_contrast = enabled).await
    }

    /// Clamped to [`FONT_SCALE_RANGE`].
    pub async fn set_font_scale(&self, scale: f32) -> Result<Settings, StoreError> {
        self.update(|s| s.font_scale = clamp(scale, &FONT_SCALE_RANGE)).await
    }

    /// Clamped to [`SPEECH_RATE_RANGE`].
    pub async fn set_speech_rate(&self, rate: f32) -> Result<Settings, StoreError> {
        self.update(|s| s.speech_rate = clamp(rate, &SPEECH_RATE_RANGE)).await
    }

    async fn update(&self, apply: impl FnOnce(&mut Settings)) -> Result<Settings, StoreError> {
        let mut current = self.current.write().await;
        let mut next = current.clone();
        apply(&mut next);

        save_json(self.store.as_ref(), SETTINGS_KEY, &next).await?;
        *current = next.clone();
        Ok(next)
    }
}
