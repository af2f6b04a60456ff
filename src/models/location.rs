//! Location model for a tracked coordinate pair

use serde::{Deserialize, Serialize};

/// A user-configured coordinate tracked independently of other locations.
///
/// Locations are immutable once created; reconfiguring one means building a new value.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Location {
    /// Stable identifier from the configuration
    pub id: String,
    /// Display name (defaults to the formatted coordinates)
    pub name: String,
    /// Latitude in decimal degrees
    pub latitude: f64,
    /// Longitude in decimal degrees
    pub longitude: f64,
}

impl Location {
    /// Create a new location
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>, latitude: f64, longitude: f64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            latitude,
            longitude,
        }
    }

    /// Create a location named after its coordinates
    #[must_use]
    pub fn unnamed(id: impl Into<String>, latitude: f64, longitude: f64) -> Self {
        let mut location = Self::new(id, String::new(), latitude, longitude);
        location.name = location.format_coordinates();
        location
    }

    /// Format location as coordinates string
    #[must_use]
    pub fn format_coordinates(&self) -> String {
        format!("{:.4}, {:.4}", self.latitude, self.longitude)
    }

    /// Whether both coordinates are within their valid ranges
    #[must_use]
    pub fn has_valid_coordinates(&self) -> bool {
        (-90.0..=90.0).contains(&self.latitude) && (-180.0..=180.0).contains(&self.longitude)
    }
}

/// Render a coordinate the way it appears in requests and sensor ids.
///
/// Whole numbers keep one decimal place (`8.0`, not `8`).
#[must_use]
pub fn format_coordinate(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 {
        format!("{value:.1}")
    } else {
        value.to_string()
    }
}

/// `"<lat>,<lon>"` as sent in the `location` query parameter
#[must_use]
pub fn coordinate_query(latitude: f64, longitude: f64) -> String {
    format!("{},{}", format_coordinate(latitude), format_coordinate(longitude))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unnamed_location_uses_coordinates() {
        let location = Location::unnamed("home", 37.7749, -122.4194);
        assert_eq!(location.name, "37.7749, -122.4194");
        assert_eq!(location.format_coordinates(), "37.7749, -122.4194");
    }

    #[test]
    fn test_whole_number_coordinates_keep_decimal() {
        assert_eq!(format_coordinate(8.0), "8.0");
        assert_eq!(format_coordinate(-90.0), "-90.0");
        assert_eq!(format_coordinate(46.5), "46.5");
        assert_eq!(coordinate_query(46.5, 8.0), "46.5,8.0");
        assert_eq!(coordinate_query(37.7749, -122.4194), "37.7749,-122.4194");
    }

    #[test]
    fn test_coordinate_ranges() {
        assert!(Location::unnamed("a", 90.0, 180.0).has_valid_coordinates());
        assert!(!Location::unnamed("b", 91.0, 0.0).has_valid_coordinates());
        assert!(!Location::unnamed("c", 0.0, -180.5).has_valid_coordinates());
    }
}
