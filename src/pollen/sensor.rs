//! Sensor projection of pollen snapshots
//!
//! The set of sensors is a fixed enumeration. Each kind is a pure function from
//! a snapshot to a display value, so presentation stays independent of how and
//! when snapshots are refreshed.

use serde::Serialize;
use std::fmt;
use tokio::sync::watch;

use super::CoordinatorState;
use crate::models::location::format_coordinate;
use crate::models::{Location, PollenSnapshot};

pub const ATTRIBUTION: &str = "Data provided by Google Pollen";
pub const STATE_UNKNOWN: &str = "unknown";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorKind {
    PollenIndex,
    PollenCategory,
    TreePollen,
    GrassPollen,
    WeedPollen,
}

impl SensorKind {
    pub const ALL: [SensorKind; 5] = [
        SensorKind::PollenIndex,
        SensorKind::PollenCategory,
        SensorKind::TreePollen,
        SensorKind::GrassPollen,
        SensorKind::WeedPollen,
    ];

    #[must_use]
    pub fn key(self) -> &'static str {
        match self {
            SensorKind::PollenIndex => "pollen_index",
            SensorKind::PollenCategory => "pollen_category",
            SensorKind::TreePollen => "tree_pollen",
            SensorKind::GrassPollen => "grass_pollen",
            SensorKind::WeedPollen => "weed_pollen",
        }
    }

    /// Pollen type key read by the per-type sensors
    #[must_use]
    pub fn pollen_type(self) -> Option<&'static str> {
        match self {
            SensorKind::TreePollen => Some("tree"),
            SensorKind::GrassPollen => Some("grass"),
            SensorKind::WeedPollen => Some("weed"),
            SensorKind::PollenIndex | SensorKind::PollenCategory => None,
        }
    }

    /// Only the overall index is a numeric measurement
    #[must_use]
    pub fn state_class(self) -> Option<&'static str> {
        match self {
            SensorKind::PollenIndex => Some("measurement"),
            _ => None,
        }
    }

    /// Whether this sensor should be exposed for the given snapshot
    #[must_use]
    pub fn exists(self, snapshot: &PollenSnapshot) -> bool {
        self.pollen_type().is_none_or(|t| snapshot.has_type(t))
    }

    #[must_use]
    pub fn value(self, snapshot: Option<&PollenSnapshot>) -> SensorValue {
        let Some(snapshot) = snapshot else {
            return SensorValue::Unknown;
        };

        match self {
            SensorKind::PollenIndex => snapshot.index.map_or(SensorValue::Unknown, SensorValue::Integer),
            SensorKind::PollenCategory => snapshot
                .category
                .clone()
                .map_or(SensorValue::Unknown, SensorValue::Text),
            kind => kind
                .pollen_type()
                .and_then(|t| snapshot.type_reading(t))
                .and_then(|reading| reading.value)
                .map_or(SensorValue::Unknown, SensorValue::Number),
        }
    }
}

/// Sensors exposed for a location, decided once from its first snapshot.
///
/// Without a snapshot only the overall index and category are exposed; a type
/// that shows up in a later refresh is not added retroactively.
#[must_use]
pub fn available_sensors(snapshot: Option<&PollenSnapshot>) -> Vec<SensorKind> {
    SensorKind::ALL
        .into_iter()
        .filter(|kind| match snapshot {
            Some(snapshot) => kind.exists(snapshot),
            None => kind.pollen_type().is_none(),
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub enum SensorValue {
    Integer(i64),
    Number(f64),
    Text(String),
    Unknown,
}

impl Serialize for SensorValue {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            SensorValue::Integer(v) => serializer.serialize_i64(*v),
            SensorValue::Number(v) => serializer.serialize_f64(*v),
            SensorValue::Text(v) => serializer.serialize_str(v),
            SensorValue::Unknown => serializer.serialize_str(STATE_UNKNOWN),
        }
    }
}

impl SensorValue {
    #[must_use]
    pub fn is_unknown(&self) -> bool {
        matches!(self, SensorValue::Unknown)
    }
}

impl fmt::Display for SensorValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SensorValue::Integer(v) => write!(f, "{v}"),
            SensorValue::Number(v) => write!(f, "{v}"),
            SensorValue::Text(v) => f.write_str(v),
            SensorValue::Unknown => f.write_str(STATE_UNKNOWN),
        }
    }
}

/// A sensor bound to one location's coordinator
#[derive(Debug, Clone)]
pub struct PollenSensor {
    kind: SensorKind,
    unique_id: String,
    state: watch::Receiver<CoordinatorState>,
}

impl PollenSensor {
    #[must_use]
    pub fn new(kind: SensorKind, location: &Location, state: watch::Receiver<CoordinatorState>) -> Self {
        Self {
            kind,
            unique_id: format!(
                "{}_{}_{}",
                kind.key(),
                format_coordinate(location.latitude),
                format_coordinate(location.longitude)
            ),
            state,
        }
    }

    #[must_use]
    pub fn kind(&self) -> SensorKind {
        self.kind
    }

    #[must_use]
    pub fn key(&self) -> &'static str {
        self.kind.key()
    }

    #[must_use]
    pub fn unique_id(&self) -> &str {
        &self.unique_id
    }

    #[must_use]
    pub fn attribution(&self) -> &'static str {
        ATTRIBUTION
    }

    /// Value derived from the coordinator's last good snapshot
    #[must_use]
    pub fn native_value(&self) -> SensorValue {
        let state = self.state.borrow();
        self.kind.value(state.snapshot.as_deref())
    }
}
