use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Canonical text form of a coordinate pair, `"<lat>_<lon>"`.
///
/// Uses the shortest representation that round-trips to the same `f64`, so
/// equal values always produce equal text and distinct values never collide.
/// `-0.0` is folded into `0`.
pub fn coord_key(lat: f64, lon: f64) -> String {
    format!("{}_{}", canonical_coord(lat), canonical_coord(lon))
}

fn canonical_coord(value: f64) -> String {
    let value = if value == 0.0 { 0.0 } else { value };
    format!("{value}")
}

/// A place the user can pick. The id is derived from the coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    pub country: String,
    pub lat: f64,
    pub lon: f64,
}

impl Location {
    pub fn new(
        name: impl Into<String>,
        state: Option<String>,
        country: impl Into<String>,
        lat: f64,
        lon: f64,
    ) -> Self {
        Self {
            id: coord_key(lat, lon),
            name: name.into(),
            state: state.filter(|s| !s.trim().is_empty()),
            country: country.into(),
            lat,
            lon,
        }
    }

    /// "Name, State, CC" with empty parts left out.
    pub fn display_name(&self) -> String {
        let mut parts = vec![self.name.as_str()];
        if let Some(state) = self.state.as_deref() {
            parts.push(state);
        }
        if !self.country.is_empty() {
            parts.push(self.country.as_str());
        }
        parts.join(", ")
    }
}

/// One result of the geocoding endpoint, as the provider returns it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeocodedPlace {
    pub name: String,
    #[serde(default)]
    pub state: Option<String>,
    pub country: String,
    pub lat: f64,
    pub lon: f64,
}

impl From<GeocodedPlace> for Location {
    fn from(place: GeocodedPlace) -> Self {
        Location::new(place.name, place.state, place.country, place.lat, place.lon)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherCondition {
    pub id: u32,
    pub main: String,
    pub description: String,
    pub icon: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentWeather {
    pub dt: i64,
    pub sunrise: i64,
    pub sunset: i64,
    pub temp: f64,
    pub feels_like: f64,
    pub pressure: u32,
    pub humidity: u8,
    pub dew_point: f64,
    pub uvi: f64,
    pub clouds: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visibility: Option<u32>,
    pub wind_speed: f64,
    pub wind_deg: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wind_gust: Option<f64>,
    pub weather: Vec<WeatherCondition>,
}

impl CurrentWeather {
    pub fn condition(&self) -> Option<&WeatherCondition> {
        self.weather.first()
    }

    pub fn observed_at(&self) -> Option<DateTime<Utc>> {
        unix_to_utc(self.dt)
    }

    pub fn sunrise_at(&self) -> Option<DateTime<Utc>> {
        unix_to_utc(self.sunrise)
    }

    pub fn sunset_at(&self) -> Option<DateTime<Utc>> {
        unix_to_utc(self.sunset)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourlyWeather {
    pub dt: i64,
    pub temp: f64,
    pub feels_like: f64,
    pub pressure: u32,
    pub humidity: u8,
    pub dew_point: f64,
    pub uvi: f64,
    pub clouds: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visibility: Option<u32>,
    pub wind_speed: f64,
    pub wind_deg: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wind_gust: Option<f64>,
    pub weather: Vec<WeatherCondition>,
    /// Probability of precipitation, 0.0..=1.0.
    pub pop: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyTemperature {
    pub day: f64,
    pub min: f64,
    pub max: f64,
    pub night: f64,
    pub eve: f64,
    pub morn: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyFeelsLike {
    pub day: f64,
    pub night: f64,
    pub eve: f64,
    pub morn: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyWeather {
    pub dt: i64,
    pub sunrise: i64,
    pub sunset: i64,
    pub moonrise: i64,
    pub moonset: i64,
    pub moon_phase: f64,
    pub temp: DailyTemperature,
    pub feels_like: DailyFeelsLike,
    pub pressure: u32,
    pub humidity: u8,
    pub dew_point: f64,
    pub wind_speed: f64,
    pub wind_deg: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wind_gust: Option<f64>,
    pub weather: Vec<WeatherCondition>,
    pub clouds: u8,
    pub pop: f64,
    pub uvi: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rain: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snow: Option<f64>,
}

/// Everything a single one-call fetch returns for a coordinate.
///
/// `hourly` runs forward in time; `daily[0]` is today.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    pub lat: f64,
    pub lon: f64,
    pub timezone: String,
    pub timezone_offset: i64,
    pub current: CurrentWeather,
    #[serde(default)]
    pub hourly: Vec<HourlyWeather>,
    #[serde(default)]
    pub daily: Vec<DailyWeather>,
}

impl WeatherSnapshot {
    pub fn today(&self) -> Option<&DailyWeather> {
        self.daily.first()
    }

    pub fn next_hours(&self, count: usize) -> &[HourlyWeather] {
        &self.hourly[..count.min(self.hourly.len())]
    }
}

/// A past lookup. The location is copied at write time, not joined later.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub location: Location,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
    pub temperature: f64,
    pub feels_like: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weather: Option<WeatherCondition>,
}

impl HistoryEntry {
    pub fn from_snapshot(
        location: &Location,
        snapshot: &WeatherSnapshot,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            location: location.clone(),
            timestamp,
            temperature: snapshot.current.temp,
            feels_like: snapshot.current.feels_like,
            weather: snapshot.current.condition().cloned(),
        }
    }
}

pub(crate) fn unix_to_utc(ts: i64) -> Option<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp(ts, 0)
}
