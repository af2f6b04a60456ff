//! Configuration management for `PollenWatch`
//!
//! Handles loading configuration from a TOML file and environment variables,
//! and validates credentials, locations and polling settings.

use crate::PollenWatchError;
use crate::models::Location;
use crate::models::location::format_coordinate;
use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration structure for the `PollenWatch` application
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PollenWatchConfig {
    /// Google Pollen API credentials and endpoint
    #[serde(default)]
    pub api: ApiConfig,
    /// Tracked locations
    #[serde(default)]
    pub locations: Vec<LocationConfig>,
    /// Refresh cadence
    #[serde(default)]
    pub polling: PollingConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
    /// HTTP server configuration
    #[serde(default)]
    pub web: WebConfig,
}

/// Google Pollen API settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// API key (required)
    #[serde(default)]
    pub api_key: String,
    /// Value sent as the `Referer` header for referrer-restricted keys
    #[serde(default)]
    pub referrer: Option<String>,
    /// Base URL of the pollen API
    #[serde(default = "default_api_base_url")]
    pub base_url: String,
    /// Request timeout in seconds
    #[serde(default = "default_api_timeout")]
    pub timeout_seconds: u32,
}

/// A configured location
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationConfig {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
}

/// Polling settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollingConfig {
    /// Seconds between scheduled refreshes
    #[serde(default = "default_polling_interval")]
    pub interval_seconds: u64,
}

/// Logging configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (pretty or json)
    #[serde(default = "default_log_format")]
    pub format: String,
}

/// HTTP server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebConfig {
    #[serde(default = "default_web_enabled")]
    pub enabled: bool,
    #[serde(default = "default_web_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_web_port")]
    pub port: u16,
}

// Default value functions
fn default_api_base_url() -> String {
    crate::pollen::client::DEFAULT_BASE_URL.to_string()
}

fn default_api_timeout() -> u32 {
    20
}

fn default_polling_interval() -> u64 {
    60 * 60
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_web_enabled() -> bool {
    true
}

fn default_web_bind_address() -> String {
    "127.0.0.1".to_string()
}

fn default_web_port() -> u16 {
    8787
}

const MIN_POLLING_INTERVAL: u64 = 60;
const MAX_API_TIMEOUT: u32 = 300;

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            referrer: None,
            base_url: default_api_base_url(),
            timeout_seconds: default_api_timeout(),
        }
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_seconds: default_polling_interval(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            enabled: default_web_enabled(),
            bind_address: default_web_bind_address(),
            port: default_web_port(),
        }
    }
}

impl LocationConfig {
    /// Build the runtime location, naming it after its coordinates when unnamed
    #[must_use]
    pub fn to_location(&self) -> Location {
        match self.name.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
            Some(name) => Location::new(self.id.clone(), name, self.latitude, self.longitude),
            None => Location::unnamed(self.id.clone(), self.latitude, self.longitude),
        }
    }
}

impl PollenWatchConfig {
    /// Load configuration from file and environment variables
    pub fn load() -> Result<Self> {
        Self::load_from_path(None)
    }

    /// Load configuration from specified path
    pub fn load_from_path(config_path: Option<PathBuf>) -> Result<Self> {
        let mut builder = Config::builder();

        let config_file = config_path.unwrap_or_else(|| {
            Self::get_config_path().unwrap_or_else(|| PathBuf::from("config.toml"))
        });

        if config_file.exists() {
            builder = builder.add_source(
                File::from(config_file.clone())
                    .required(false)
                    .format(config::FileFormat::Toml),
            );
        }

        // POLLENWATCH_API__API_KEY -> api.api_key
        builder = builder.add_source(
            Environment::with_prefix("POLLENWATCH")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let settings = builder
            .build()
            .with_context(|| format!("Failed to build configuration from {}", config_file.display()))?;

        let mut config: PollenWatchConfig = settings
            .try_deserialize()
            .with_context(|| "Failed to deserialize configuration")?;

        config.apply_defaults();
        config.validate()?;

        Ok(config)
    }

    /// Get the default configuration file path
    #[must_use]
    pub fn get_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("pollenwatch").join("config.toml"))
    }

    /// Apply default values to missing configuration fields
    pub fn apply_defaults(&mut self) {
        if self.api.base_url.is_empty() {
            self.api.base_url = default_api_base_url();
        }
        if self.api.timeout_seconds == 0 {
            self.api.timeout_seconds = default_api_timeout();
        }
        if self.api.referrer.as_deref().is_some_and(|r| r.trim().is_empty()) {
            self.api.referrer = None;
        }
        if self.polling.interval_seconds == 0 {
            self.polling.interval_seconds = default_polling_interval();
        }
        if self.logging.level.is_empty() {
            self.logging.level = default_log_level();
        }
        if self.logging.format.is_empty() {
            self.logging.format = default_log_format();
        }
        if self.web.bind_address.is_empty() {
            self.web.bind_address = default_web_bind_address();
        }
    }

    /// Validate all configuration settings
    pub fn validate(&self) -> Result<()> {
        self.validate_api_keys()?;
        self.validate_locations()?;
        self.validate_numeric_ranges()?;
        self.validate_string_values()?;
        Ok(())
    }

    /// Validate API keys and credentials
    pub fn validate_api_keys(&self) -> Result<()> {
        if self.api.api_key.trim().is_empty() {
            return Err(PollenWatchError::config(
                "Google Pollen API key is missing. Set api.api_key or POLLENWATCH_API__API_KEY.",
            )
            .into());
        }

        Ok(())
    }

    /// Ids must be unique, and so must coordinates: sensor ids are derived from them
    fn validate_locations(&self) -> Result<()> {
        let mut seen_ids = HashSet::new();
        let mut seen_coordinates = HashSet::new();
        for location in &self.locations {
            if location.id.trim().is_empty() {
                return Err(PollenWatchError::config("Location id cannot be empty").into());
            }
            if !seen_ids.insert(location.id.as_str()) {
                return Err(PollenWatchError::config(format!(
                    "Duplicate location id '{}'",
                    location.id
                ))
                .into());
            }
            let coordinates = (
                format_coordinate(location.latitude),
                format_coordinate(location.longitude),
            );
            if !seen_coordinates.insert(coordinates) {
                return Err(PollenWatchError::config(format!(
                    "Location '{}' is already configured at ({}, {})",
                    location.id, location.latitude, location.longitude
                ))
                .into());
            }
            if !location.to_location().has_valid_coordinates() {
                return Err(PollenWatchError::config(format!(
                    "Location '{}' has invalid coordinates ({}, {}). Latitude must be within ±90 and longitude within ±180.",
                    location.id, location.latitude, location.longitude
                ))
                .into());
            }
        }

        Ok(())
    }

    /// Validate numeric configuration ranges
    fn validate_numeric_ranges(&self) -> Result<()> {
        if self.api.timeout_seconds > MAX_API_TIMEOUT {
            return Err(PollenWatchError::config(format!(
                "API timeout cannot exceed {MAX_API_TIMEOUT} seconds"
            ))
            .into());
        }

        if self.polling.interval_seconds < MIN_POLLING_INTERVAL {
            return Err(PollenWatchError::config(format!(
                "Polling interval must be at least {MIN_POLLING_INTERVAL} seconds"
            ))
            .into());
        }

        Ok(())
    }

    /// Validate string configuration values
    fn validate_string_values(&self) -> Result<()> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.logging.level.as_str()) {
            return Err(PollenWatchError::config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.logging.level,
                valid_log_levels.join(", ")
            ))
            .into());
        }

        let valid_log_formats = ["pretty", "json"];
        if !valid_log_formats.contains(&self.logging.format.as_str()) {
            return Err(PollenWatchError::config(format!(
                "Invalid log format '{}'. Must be one of: {}",
                self.logging.format,
                valid_log_formats.join(", ")
            ))
            .into());
        }

        if !self.api.base_url.starts_with("http://") && !self.api.base_url.starts_with("https://") {
            return Err(PollenWatchError::config(
                "Pollen API base URL must be a valid HTTP or HTTPS URL",
            )
            .into());
        }

        Ok(())
    }

    /// Runtime locations in configuration order
    #[must_use]
    pub fn to_locations(&self) -> Vec<Location> {
        self.locations.iter().map(LocationConfig::to_location).collect()
    }

    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(u64::from(self.api.timeout_seconds))
    }

    #[must_use]
    pub fn polling_interval(&self) -> Duration {
        Duration::from_secs(self.polling.interval_seconds)
    }

    /// Address the HTTP server binds to
    #[must_use]
    pub fn web_address(&self) -> String {
        format!("{}:{}", self.web.bind_address, self.web.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::io::Write;

    fn valid_config() -> PollenWatchConfig {
        PollenWatchConfig {
            api: ApiConfig {
                api_key: "test_api_key_123".to_string(),
                ..ApiConfig::default()
            },
            locations: vec![LocationConfig {
                id: "home".to_string(),
                name: Some("Home".to_string()),
                latitude: 37.7749,
                longitude: -122.4194,
            }],
            ..PollenWatchConfig::default()
        }
    }

    #[test]
    fn test_default_config() {
        let config = PollenWatchConfig::default();
        assert_eq!(config.api.base_url, "https://maps.googleapis.com/maps/api/pollen/v1");
        assert_eq!(config.api.timeout_seconds, 20);
        assert_eq!(config.polling.interval_seconds, 3600);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.web.port, 8787);
        assert!(config.web.enabled);
        assert!(config.locations.is_empty());
    }

    #[test]
    fn test_config_validation_missing_api_key() {
        let config = PollenWatchConfig::default();
        let result = config.validate_api_keys();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("API key is missing"));
    }

    #[test]
    fn test_valid_config_passes() {
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn test_config_validation_allows_no_locations() {
        let mut config = valid_config();
        config.locations.clear();
        assert!(config.validate().is_ok());
        assert!(config.to_locations().is_empty());
    }

    #[test]
    fn test_config_validation_duplicate_ids() {
        let mut config = valid_config();
        let duplicate = config.locations[0].clone();
        config.locations.push(duplicate);
        let result = config.validate();
        assert!(result.unwrap_err().to_string().contains("Duplicate location id"));
    }

    #[test]
    fn test_config_validation_duplicate_coordinates() {
        let mut config = valid_config();
        let mut same_place = config.locations[0].clone();
        same_place.id = "office".to_string();
        config.locations.push(same_place);
        let result = config.validate();
        assert!(result.unwrap_err().to_string().contains("already configured"));

        config.locations[1].longitude = 8.5;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation_invalid_coordinates() {
        let mut config = valid_config();
        config.locations[0].latitude = 91.0;
        let result = config.validate();
        assert!(result.unwrap_err().to_string().contains("invalid coordinates"));
    }

    #[test]
    fn test_config_validation_invalid_log_level() {
        let mut config = valid_config();
        config.logging.level = "invalid".to_string();
        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("Invalid log level"));
    }

    #[test]
    fn test_config_validation_numeric_ranges() {
        let mut config = valid_config();
        config.api.timeout_seconds = 500;
        let result = config.validate();
        assert!(result.unwrap_err().to_string().contains("timeout cannot exceed"));

        let mut config = valid_config();
        config.polling.interval_seconds = 10;
        let result = config.validate();
        assert!(result.unwrap_err().to_string().contains("at least 60 seconds"));
    }

    #[test]
    fn test_apply_defaults_clears_empty_referrer() {
        let mut config = valid_config();
        config.api.referrer = Some("  ".to_string());
        config.api.timeout_seconds = 0;
        config.apply_defaults();
        assert!(config.api.referrer.is_none());
        assert_eq!(config.api.timeout_seconds, 20);
    }

    #[test]
    fn test_unnamed_location_uses_coordinates() {
        let mut config = valid_config();
        config.locations[0].name = None;
        let locations = config.to_locations();
        assert_eq!(locations[0].name, "37.7749, -122.4194");
        assert_eq!(locations[0].id, "home");
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[api]
api_key = "file_key_123"
referrer = "https://example.com"

[[locations]]
id = "home"
latitude = 37.7749
longitude = -122.4194

[[locations]]
id = "work"
name = "Office"
latitude = 40.7128
longitude = -74.006

[web]
port = 9000
"#
        )
        .unwrap();

        let config = PollenWatchConfig::load_from_path(Some(file.path().to_path_buf())).unwrap();
        assert_eq!(config.api.api_key, "file_key_123");
        assert_eq!(config.api.referrer.as_deref(), Some("https://example.com"));
        assert_eq!(config.api.timeout_seconds, 20);
        assert_eq!(config.locations.len(), 2);
        assert_eq!(config.to_locations()[1].name, "Office");
        assert_eq!(config.web_address(), "127.0.0.1:9000");
    }

    #[test]
    fn test_load_from_file_rejects_missing_key() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[[locations]]
id = "home"
latitude = 1.0
longitude = 2.0
"#
        )
        .unwrap();

        let result = PollenWatchConfig::load_from_path(Some(file.path().to_path_buf()));
        assert!(result.is_err());
    }

    #[test]
    fn test_environment_variable_override() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[api]
api_key = "file_key_123"

[[locations]]
id = "home"
latitude = 1.0
longitude = 2.0
"#
        )
        .unwrap();

        // SAFETY: Test environment, setting test values only
        unsafe {
            env::set_var("POLLENWATCH_LOGGING__FORMAT", "json");
        }

        let result = PollenWatchConfig::load_from_path(Some(file.path().to_path_buf()));

        // SAFETY: Test cleanup
        unsafe {
            env::remove_var("POLLENWATCH_LOGGING__FORMAT");
        }

        let config = result.unwrap();
        assert_eq!(config.logging.format, "json");
    }

    #[test]
    fn test_config_path_generation() {
        let path = PollenWatchConfig::get_config_path();
        assert!(path.is_some());
        let path = path.unwrap();
        assert!(path.to_string_lossy().contains("pollenwatch"));
        assert!(path.to_string_lossy().contains("config.toml"));
    }
}
