//! Human-readable rendering of data-layer results.

use chrono::{DateTime, FixedOffset, Offset, Utc};
use skywatch_core::{
    DataOrigin, Forecast, HistoryEntry, Location,
    format::{compass_direction, format_temperature, format_wind_speed, relative_time},
    model::WeatherSnapshot,
    state::Settings,
};

pub fn print_locations(results: &[Location], favorites: &[Location]) {
    if results.is_empty() {
        println!("No locations found.");
        return;
    }
    for (i, loc) in results.iter().enumerate() {
        let star = if favorites.iter().any(|f| f.id == loc.id) { " *" } else { "" };
        println!("{:>2}. {}{star}  [{}]", i + 1, loc.display_name(), loc.id);
    }
}

pub fn print_favorites(favorites: &[Location], current: Option<&Location>) {
    if favorites.is_empty() {
        println!("No favorites yet.");
        return;
    }
    for loc in favorites {
        let marker = if current.is_some_and(|c| c.id == loc.id) { ">" } else { " " };
        println!("{marker} {}  [{}]", loc.display_name(), loc.id);
    }
}

pub fn print_forecast(title: &str, forecast: &Forecast, settings: &Settings, hours: usize, days: usize) {
    let snapshot = &forecast.snapshot;
    let temp = |c: f64| format_temperature(c, settings.temperature_unit, true);
    let offset = local_offset(snapshot);

    println!("{title}");
    if let DataOrigin::Cache { captured_at, fresh } = forecast.origin {
        let age = relative_time(captured_at, Utc::now());
        let note = if fresh { "offline" } else { "offline, data may be outdated" };
        println!("({note}: showing data from {})", age.to_lowercase());
    }
    println!();

    let current = &snapshot.current;
    let description = current.condition().map(|c| c.description.as_str()).unwrap_or("unknown");
    println!("  {}  {description}", temp(current.temp));
    println!("  Feels like {}", temp(current.feels_like));
    if let Some(today) = snapshot.today() {
        println!("  High {} / Low {}", temp(today.temp.max), temp(today.temp.min));
    }
    println!(
        "  Wind {} {}  Humidity {}%  UV {:.1}",
        format_wind_speed(current.wind_speed, settings.wind_speed_unit, true),
        compass_direction(current.wind_deg),
        current.humidity,
        current.uvi,
    );
    if let (Some(rise), Some(set)) = (current.sunrise_at(), current.sunset_at()) {
        println!("  Sunrise {}  Sunset {}", local(rise, offset, "%H:%M"), local(set, offset, "%H:%M"));
    }

    let hourly = snapshot.next_hours(hours);
    if !hourly.is_empty() {
        println!();
        println!("Hourly");
        for hour in hourly {
            let when = DateTime::from_timestamp(hour.dt, 0)
                .map(|t| local(t, offset, "%H:%M"))
                .unwrap_or_else(|| "--:--".to_string());
            println!("  {when}  {:>6}  {:>3.0}% rain", temp(hour.temp), hour.pop * 100.0);
        }
    }

    let daily = &snapshot.daily[..days.min(snapshot.daily.len())];
    if !daily.is_empty() {
        println!();
        println!("Daily");
        for day in daily {
            let when = DateTime::from_timestamp(day.dt, 0)
                .map(|t| local(t, offset, "%a %d %b"))
                .unwrap_or_else(|| "?".to_string());
            let summary = day.weather.first().map(|w| w.description.as_str()).unwrap_or("");
            println!(
                "  {when}  {:>6} / {:<6}  {summary}",
                temp(day.temp.max),
                temp(day.temp.min)
            );
        }
    }
}

pub fn print_history(entries: &[HistoryEntry], settings: &Settings) {
    if entries.is_empty() {
        println!("No lookups yet.");
        return;
    }
    let now = Utc::now();
    for entry in entries {
        let description = entry.weather.as_ref().map(|w| w.description.as_str()).unwrap_or("");
        println!(
            "{:<14} {}  {} (feels {})  {description}",
            relative_time(entry.timestamp, now),
            entry.location.display_name(),
            format_temperature(entry.temperature, settings.temperature_unit, true),
            format_temperature(entry.feels_like, settings.temperature_unit, true),
        );
    }
}

pub fn print_settings(settings: &Settings) {
    println!("temperature    {:?}", settings.temperature_unit);
    println!("wind           {:?}", settings.wind_speed_unit);
    println!("high contrast  {}", settings.high_contrast);
    println!("font scale     {:.2}", settings.font_scale);
    println!("speech rate    {:.2}", settings.speech_rate);
}

fn local_offset(snapshot: &WeatherSnapshot) -> FixedOffset {
    i32::try_from(snapshot.timezone_offset)
        .ok()
        .and_then(FixedOffset::east_opt)
        .unwrap_or_else(|| Utc.fix())
}

fn local(at: DateTime<Utc>, offset: FixedOffset, fmt: &str) -> String {
    at.with_timezone(&offset).format(fmt).to_string()
}
