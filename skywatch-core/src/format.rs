//! Text helpers shared by front-ends: unit conversion, icons, readouts.

use chrono::{DateTime, Utc};

use crate::{
    model::{Location, WeatherSnapshot},
    state::{TemperatureUnit, WindSpeedUnit},
};

const MS_TO_KMH: f64 = 3.6;
const MS_TO_MPH: f64 = 2.237;

/// Formats a Celsius temperature in the requested unit, rounded to whole degrees.
pub fn format_temperature(celsius: f64, unit: TemperatureUnit, include_unit: bool) -> String {
    let (value, suffix) = match unit {
        TemperatureUnit::Celsius => (celsius, "°C"),
        TemperatureUnit::Fahrenheit => (celsius * 9.0 / 5.0 + 32.0, "°F"),
    };
    with_suffix(value, suffix, include_unit)
}

/// Formats a wind speed given in m/s.
pub fn format_wind_speed(meters_per_sec: f64, unit: WindSpeedUnit, include_unit: bool) -> String {
    let (value, suffix) = match unit {
        WindSpeedUnit::Kmh => (meters_per_sec * MS_TO_KMH, " km/h"),
        WindSpeedUnit::Mph => (meters_per_sec * MS_TO_MPH, " mph"),
    };
    with_suffix(value, suffix, include_unit)
}

fn with_suffix(value: f64, suffix: &str, include_unit: bool) -> String {
    // `+ 0.0` turns a rounded -0 into 0.
    let rounded = value.round() + 0.0;
    if include_unit {
        format!("{rounded}{suffix}")
    } else {
        format!("{rounded}")
    }
}

/// Compass point for a wind direction in degrees.
pub fn compass_direction(degrees: u16) -> &'static str {
    const POINTS: [&str; 8] = ["N", "NE", "E", "SE", "S", "SW", "W", "NW"];
    let index = ((f64::from(degrees % 360) + 22.5) / 45.0) as usize % 8;
    POINTS[index]
}

pub fn icon_url(icon: &str) -> String {
    format!("https://openweathermap.org/img/wn/{icon}@2x.png")
}

/// Accent colour for an OpenWeatherMap condition code.
pub fn condition_color(condition_id: u32) -> &'static str {
    match condition_id {
        200..=299 => "#9333EA",
        300..=399 => "#60A5FA",
        500..=599 => "#3B82F6",
        600..=699 => "#E5E7EB",
        700..=799 => "#9CA3AF",
        800 => "#FBBF24",
        801.. => "#94A3B8",
        _ => "#3B82F6",
    }
}

/// "Just now", "5 minutes ago", "Yesterday", ...
pub fn relative_time(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let diff = now - then;
    let (days, hours, minutes) = (diff.num_days(), diff.num_hours(), diff.num_minutes());

    match (days, hours, minutes) {
        (1, _, _) => "Yesterday".to_string(),
        (d, _, _) if d > 1 => format!("{d} days ago"),
        (_, 1, _) => "1 hour ago".to_string(),
        (_, h, _) if h > 1 => format!("{h} hours ago"),
        (_, _, 1) => "1 minute ago".to_string(),
        (_, _, m) if m > 1 => format!("{m} minutes ago"),
        _ => "Just now".to_string(),
    }
}

/// The sentence read aloud on the home screen.
pub fn readout_message(location: &Location, snapshot: &WeatherSnapshot) -> String {
    let current = &snapshot.current;
    let description = current
        .condition()
        .map(|c| c.description.as_str())
        .unwrap_or("unknown conditions");

    let mut message = format!(
        "Current weather in {} is {} degrees Celsius, with {}. It feels like {} degrees. Humidity is at {} percent.",
        location.name, current.temp, description, current.feels_like, current.humidity,
    );
    if let Some(today) = snapshot.today() {
        message.push_str(&format!(
            " Today's forecast shows a high of {} and a low of {} degrees.",
            today.temp.max, today.temp.min,
        ));
    }
    message
}

/// Short text for sharing the current conditions.
pub fn share_message(location: &Location, snapshot: &WeatherSnapshot) -> String {
    let current = &snapshot.current;
    let description = current.condition().map(|c| c.description.as_str()).unwrap_or("unknown");
    format!(
        "Current weather in {}: {}°C, {}. Feels like: {}°C",
        location.name, current.temp, description, current.feels_like,
    )
}
