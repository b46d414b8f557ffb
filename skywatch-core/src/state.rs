//! Small persisted stores read by the front-end.
//!
//! Each store keeps its document in memory behind a lock and writes it back
//! whole on every change. The in-memory copy only changes once the write
//! succeeded.

pub mod location;
pub mod settings;

pub use location::{LocationSelection, LocationState, MAX_FAVORITES, default_location};
pub use settings::{Settings, SettingsState, TemperatureUnit, WindSpeedUnit};
