//! `PollenWatch` - Google Pollen API poller
//!
//! This library fetches current pollen conditions for configured locations,
//! refreshes them on a schedule and exposes the readings as sensors.

pub mod api;
pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod pollen;
pub mod web;

// Re-export core types for public API
pub use config::PollenWatchConfig;
pub use error::PollenWatchError;
pub use models::{Location, PollenSnapshot, PollenTypeReading};
pub use pollen::{
    FetchError, GooglePollenClient, PollenFetcher, PollenSensor, PollenService,
    RefreshCoordinator, SensorKind, SensorValue, UpdateFailed,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
