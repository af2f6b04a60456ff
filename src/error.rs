//! Application-level errors for `PollenWatch`
//!
//! Fetch failures stay in [`crate::pollen::FetchError`]; this type covers
//! what stops the process from starting.

use thiserror::Error;

use crate::pollen::FetchError;

#[derive(Error, Debug)]
pub enum PollenWatchError {
    /// Missing or invalid settings
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// The pollen API client could not be built
    #[error("Client error: {source}")]
    Client {
        #[from]
        source: FetchError,
    },

    /// Binding or serving the HTTP API failed
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
}

impl PollenWatchError {
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Message shown on the terminal when startup fails
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            PollenWatchError::Config { message } => {
                format!("Configuration error: {message}. Please check your config file and API key.")
            }
            PollenWatchError::Client { source } => {
                format!("Unable to set up the pollen API client ({source}). Please check api.base_url.")
            }
            PollenWatchError::Io { source } => {
                format!("Unable to start the web server: {source}. Please check web.bind_address and web.port.")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_message() {
        let err = PollenWatchError::config("api.api_key is empty");
        assert!(matches!(err, PollenWatchError::Config { .. }));
        assert!(err.user_message().contains("api.api_key is empty"));
    }

    #[test]
    fn test_conversions() {
        let io_err = std::io::Error::new(std::io::ErrorKind::AddrInUse, "address in use");
        let err: PollenWatchError = io_err.into();
        assert!(matches!(err, PollenWatchError::Io { .. }));
        assert!(err.user_message().contains("web.port"));

        let fetch_err = FetchError::InvalidEndpoint {
            url: "nope/currentConditions".to_string(),
            reason: "relative URL without a base".to_string(),
        };
        let err: PollenWatchError = fetch_err.into();
        assert!(matches!(err, PollenWatchError::Client { .. }));
        assert!(err.user_message().contains("api.base_url"));
    }
}
