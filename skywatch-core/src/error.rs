use thiserror::Error;

/// Errors surfaced to callers of the search and weather clients.
///
/// Cache and history failures never show up here: they are logged and the
/// optional step is treated as skipped.
#[derive(Debug, Error)]
pub enum WeatherError {
    #[error("Location search for '{query}' failed: {source}")]
    SearchFailed {
        query: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Weather fetch for ({lat}, {lon}) failed and no cached data is available: {source}")]
    FetchFailed {
        lat: f64,
        lon: f64,
        #[source]
        source: anyhow::Error,
    },
}

impl WeatherError {
    /// Text for the alert shown to the user.
    pub fn user_message(&self) -> String {
        match self {
            Self::SearchFailed { query, .. } => {
                format!("Could not search for \"{query}\". Check your connection and try again.")
            }
            Self::FetchFailed { .. } => {
                "No weather data available. Please check your connection or select a location."
                    .to_string()
            }
        }
    }
}

/// Errors from the persistent key-value layer.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Storage I/O error for key '{key}': {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON stored under key '{key}': {source}")]
    Json {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}
