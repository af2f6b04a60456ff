//! Pollen module
//!
//! - Fetching and tolerant parsing of Google Pollen `currentConditions` responses
//! - Per-location refresh coordination and scheduling
//! - Sensor projection of the cached readings

pub mod client;
pub mod coordinator;
pub mod error;
pub mod parser;
pub mod scheduler;
pub mod sensor;
pub mod service;

pub use client::{GooglePollenClient, PollenFetcher};
pub use coordinator::{CoordinatorState, RefreshCoordinator, RefreshStats};
pub use error::{FetchError, UpdateFailed};
pub use scheduler::{RefreshScheduler, SchedulerHandle, UPDATE_INTERVAL};
pub use sensor::{PollenSensor, SensorKind, SensorValue};
pub use service::{LocationRuntime, PollenService};
