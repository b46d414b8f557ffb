use anyhow::{Context, Result, anyhow, bail};
use clap::{Args, Parser, Subcommand, ValueEnum};
use inquire::{Password, PasswordDisplayMode, Select};
use skywatch_core::{
    Config, DataOrigin, Location, WeatherApp, WeatherError,
    format::{readout_message, share_message},
    search::MIN_QUERY_LEN,
    state::{TemperatureUnit, WindSpeedUnit},
};
use std::fmt;

use crate::output;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "skywatch", version, about = "Weather forecasts that keep working offline")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Store the OpenWeatherMap API key.
    Configure {
        /// Key to store; prompted for when absent.
        #[arg(long)]
        api_key: Option<String>,
    },

    /// Search locations by name.
    Search {
        /// At least three characters.
        query: String,
    },

    /// Search and make one of the results the current location.
    Select {
        query: String,

        /// 1-based result number; prompted for when absent.
        #[arg(long)]
        pick: Option<usize>,
    },

    /// Show weather for the current location or for explicit coordinates.
    Show {
        #[arg(long, requires = "lon", allow_negative_numbers = true)]
        lat: Option<f64>,

        #[arg(long, requires = "lat", allow_negative_numbers = true)]
        lon: Option<f64>,

        /// Hourly entries to print.
        #[arg(long, default_value_t = 6)]
        hours: usize,

        /// Daily entries to print.
        #[arg(long, default_value_t = 7)]
        days: usize,
    },

    /// Print the spoken summary for the current location.
    Speak,

    /// Print a one-line summary suitable for sharing.
    Share,

    /// Manage favorite locations (at most three).
    Favorites {
        #[command(subcommand)]
        action: FavoritesCommand,
    },

    /// Show recent lookups.
    History {
        /// Remove all entries instead.
        #[arg(long)]
        clear: bool,
    },

    /// Show or change preferences.
    Settings {
        #[command(subcommand)]
        action: Option<SettingsCommand>,
    },
}

#[derive(Debug, Subcommand)]
pub enum FavoritesCommand {
    List,
    /// Search and add one of the results.
    Add {
        query: String,
        #[arg(long)]
        pick: Option<usize>,
    },
    /// Remove a favorite by id.
    Remove { id: String },
    /// Make a favorite the current location.
    Use { id: String },
}

#[derive(Debug, Subcommand)]
pub enum SettingsCommand {
    Show,
    Set(SetArgs),
}

#[derive(Debug, Args)]
pub struct SetArgs {
    #[arg(long, value_enum)]
    temperature: Option<TemperatureArg>,

    #[arg(long, value_enum)]
    wind: Option<WindArg>,

    #[arg(long)]
    high_contrast: Option<bool>,

    /// 0.8 to 2.0
    #[arg(long)]
    font_scale: Option<f32>,

    /// 0.5 to 3.0
    #[arg(long)]
    speech_rate: Option<f32>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum TemperatureArg {
    Celsius,
    Fahrenheit,
}

impl From<TemperatureArg> for TemperatureUnit {
    fn from(arg: TemperatureArg) -> Self {
        match arg {
            TemperatureArg::Celsius => TemperatureUnit::Celsius,
            TemperatureArg::Fahrenheit => TemperatureUnit::Fahrenheit,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum WindArg {
    Kmh,
    Mph,
}

impl From<WindArg> for WindSpeedUnit {
    fn from(arg: WindArg) -> Self {
        match arg {
            WindArg::Kmh => WindSpeedUnit::Kmh,
            WindArg::Mph => WindSpeedUnit::Mph,
        }
    }
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        match self.command {
            Command::Configure { api_key } => configure(api_key),
            command => {
                tracing::debug!(?command, "running command");
                let config = Config::load()?;
                let app = WeatherApp::open(&config).await?;
                let result = execute(&app, command).await;
                app.shutdown().await;
                result
            }
        }
    }
}

fn configure(api_key: Option<String>) -> Result<()> {
    let mut config = Config::load()?;

    let key = match api_key {
        Some(key) => key,
        None => Password::new("OpenWeatherMap API key:")
            .with_display_mode(PasswordDisplayMode::Masked)
            .without_confirmation()
            .prompt()
            .context("Failed to read API key")?,
    };
    if key.trim().is_empty() {
        bail!("API key must not be empty");
    }

    config.set_api_key(key);
    config.save()?;

    println!("Saved configuration to {}", Config::config_file_path()?.display());
    Ok(())
}

async fn execute(app: &WeatherApp, command: Command) -> Result<()> {
    match command {
        Command::Configure { api_key } => configure(api_key)?,

        Command::Search { query } => {
            let results = search(app, &query).await?;
            let favorites = app.locations.favorites().await;
            output::print_locations(&results, &favorites);
        }

        Command::Select { query, pick } => {
            let results = search(app, &query).await?;
            let location = choose(results, pick)?;
            app.locations.set_current(location.clone()).await?;
            println!("Current location: {}", location.display_name());
        }

        Command::Show { lat, lon, hours, days } => {
            let forecast = match (lat, lon) {
                (Some(lat), Some(lon)) => app.weather.fetch_detailed(lat, lon).await,
                _ => app.current_forecast().await,
            }
            .map_err(alert)?;
            if let DataOrigin::Cache { captured_at, fresh } = forecast.origin {
                tracing::debug!(%captured_at, fresh, "showing cached forecast");
            }

            let current = app.locations.current().await;
            let title = forecast_title(lat.zip(lon), current);
            let settings = app.settings.get().await;
            output::print_forecast(&title, &forecast, &settings, hours, days);
        }

        Command::Speak => {
            let forecast = app.current_forecast().await.map_err(alert)?;
            let location = selected(app).await?;
            let settings = app.settings.get().await;
            println!("{}", readout_message(&location, &forecast.snapshot));
            println!("(speech rate {:.1}x)", settings.speech_rate);
        }

        Command::Share => {
            let forecast = app.current_forecast().await.map_err(alert)?;
            let location = selected(app).await?;
            println!("{}", share_message(&location, &forecast.snapshot));
        }

        Command::Favorites { action } => favorites(app, action).await?,

        Command::History { clear } => {
            if clear {
                app.history.clear().await?;
                println!("History cleared.");
            } else {
                let entries = app.history.list().await?;
                let settings = app.settings.get().await;
                output::print_history(&entries, &settings);
            }
        }

        Command::Settings { action } => {
            if let Some(SettingsCommand::Set(args)) = action {
                apply_settings(app, args).await?;
            }
            output::print_settings(&app.settings.get().await);
        }
    }

    Ok(())
}

async fn favorites(app: &WeatherApp, action: FavoritesCommand) -> Result<()> {
    match action {
        FavoritesCommand::List => {
            let favorites = app.locations.favorites().await;
            let current = app.locations.current().await;
            output::print_favorites(&favorites, current.as_ref());
        }
        FavoritesCommand::Add { query, pick } => {
            let location = choose(search(app, &query).await?, pick)?;
            if app.locations.add_favorite(location.clone()).await? {
                println!("Added {} to favorites.", location.display_name());
            } else if app.locations.is_favorite(&location.id).await {
                println!("{} is already a favorite.", location.display_name());
            } else {
                println!(
                    "Favorites are full ({} max). Remove one first.",
                    skywatch_core::state::MAX_FAVORITES
                );
            }
        }
        FavoritesCommand::Remove { id } => {
            if app.locations.remove_favorite(&id).await? {
                println!("Removed {id} from favorites.");
            } else {
                println!("No favorite with id {id}.");
            }
        }
        FavoritesCommand::Use { id } => {
            let location = app
                .locations
                .favorites()
                .await
                .into_iter()
                .find(|f| f.id == id)
                .ok_or_else(|| anyhow!("No favorite with id {id}"))?;
            app.locations.set_current(location.clone()).await?;
            println!("Current location: {}", location.display_name());
        }
    }
    Ok(())
}

async fn apply_settings(app: &WeatherApp, args: SetArgs) -> Result<()> {
    let settings = &app.settings;
    if let Some(unit) = args.temperature {
        settings.set_temperature_unit(unit.into()).await?;
    }
    if let Some(unit) = args.wind {
        settings.set_wind_speed_unit(unit.into()).await?;
    }
    if let Some(enabled) = args.high_contrast {
        settings.set_high_contrast(enabled).await?;
    }
    if let Some(scale) = args.font_scale {
        settings.set_font_scale(scale).await?;
    }
    if let Some(rate) = args.speech_rate {
        settings.set_speech_rate(rate).await?;
    }
    Ok(())
}

async fn search(app: &WeatherApp, query: &str) -> Result<Vec<Location>> {
    if query.trim().chars().count() < MIN_QUERY_LEN {
        bail!("Search query must be at least {MIN_QUERY_LEN} characters.");
    }
    app.search.search(query).await.map_err(alert)
}

async fn selected(app: &WeatherApp) -> Result<Location> {
    app.locations
        .current()
        .await
        .ok_or_else(|| anyhow!("No location selected.\nHint: run `skywatch select <place>`."))
}

/// The selected location's name when it is what was fetched, else the coordinates.
fn forecast_title(coords: Option<(f64, f64)>, current: Option<Location>) -> String {
    match coords {
        Some((lat, lon)) => current
            .filter(|loc| loc.lat == lat && loc.lon == lon)
            .map(|loc| loc.display_name())
            .unwrap_or_else(|| format!("{lat}, {lon}")),
        None => current
            .map(|loc| loc.display_name())
            .unwrap_or_else(|| "Unknown location".to_string()),
    }
}

struct Choice(Location);

impl fmt::Display for Choice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:.4}, {:.4})", self.0.display_name(), self.0.lat, self.0.lon)
    }
}

fn choose(mut results: Vec<Location>, pick: Option<usize>) -> Result<Location> {
    if results.is_empty() {
        bail!("No locations found.");
    }

    match pick {
        Some(n) if (1..=results.len()).contains(&n) => Ok(results.swap_remove(n - 1)),
        Some(n) => bail!("Pick must be between 1 and {}, got {n}", results.len()),
        None if results.len() == 1 => Ok(results.remove(0)),
        None => {
            let options = results.into_iter().map(Choice).collect();
            let Choice(location) = Select::new("Which location?", options)
                .prompt()
                .context("No location chosen")?;
            Ok(location)
        }
    }
}

/// Puts the actionable alert text in front of the underlying cause.
fn alert(err: WeatherError) -> anyhow::Error {
    let message = err.user_message();
    anyhow::Error::new(err).context(message)
}
