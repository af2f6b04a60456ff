//! Data models for PollenWatch
//!
//! - Location: a configured coordinate pair
//! - Snapshot: one parsed pollen reading

pub mod location;
pub mod snapshot;

pub use location::Location;
pub use snapshot::{PollenSnapshot, PollenTypeReading};
