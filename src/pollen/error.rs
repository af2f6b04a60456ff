use reqwest::StatusCode;
use thiserror::Error;

/// Failure of a single fetch against the pollen API.
///
/// Every transport, status, timeout and decode failure is wrapped here; raw
/// `reqwest` errors never leave the client.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Request timed out: {source}")]
    Timeout {
        #[source]
        source: reqwest::Error,
    },

    #[error("Network error: {source}")]
    Transport {
        #[source]
        source: reqwest::Error,
    },

    #[error("API returned {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("Invalid JSON body: {source}")]
    Decode {
        #[source]
        source: serde_json::Error,
    },

    #[error("Unexpected response shape: expected a JSON object, got {found}")]
    UnexpectedShape { found: &'static str },

    #[error("Invalid endpoint '{url}': {reason}")]
    InvalidEndpoint { url: String, reason: String },
}

impl FetchError {
    /// Wrap a transport error. The request URL carries the api key, so it is stripped.
    pub(crate) fn from_reqwest(err: reqwest::Error) -> Self {
        let err = err.without_url();
        if err.is_timeout() {
            FetchError::Timeout { source: err }
        } else {
            FetchError::Transport { source: err }
        }
    }

    /// Short machine-friendly label used in logs
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::Timeout { .. } => "timeout",
            FetchError::Transport { .. } => "transport",
            FetchError::Status { .. } => "status",
            FetchError::Decode { .. } => "decode",
            FetchError::UnexpectedShape { .. } => "shape",
            FetchError::InvalidEndpoint { .. } => "endpoint",
        }
    }
}

/// A refresh cycle did not produce new data.
///
/// The coordinator keeps whatever snapshot it had before the attempt.
#[derive(Error, Debug)]
#[error("Unable to fetch pollen data for location '{location_id}'")]
pub struct UpdateFailed {
    pub location_id: String,
    #[source]
    pub source: FetchError,
}
