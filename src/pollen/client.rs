use async_trait::async_trait;
use reqwest::header::REFERER;
use reqwest::{Client, Url};
use std::time::{Duration, Instant};
use tracing::{debug, instrument, warn};

use super::{FetchError, parser};
use crate::models::PollenSnapshot;
use crate::models::location::coordinate_query;

pub const DEFAULT_BASE_URL: &str = "https://maps.googleapis.com/maps/api/pollen/v1";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);
const CURRENT_CONDITIONS_PATH: &str = "currentConditions";
const MAX_ERROR_BODY_LEN: usize = 500;

/// Source of pollen snapshots for a coordinate pair
#[async_trait]
pub trait PollenFetcher: Send + Sync {
    async fn fetch(&self, latitude: f64, longitude: f64) -> Result<PollenSnapshot, FetchError>;
}

/// HTTP client for the Google Pollen `currentConditions` endpoint.
///
/// One client is shared by every location of an integration instance; it
/// carries the credentials, the coordinators carry the coordinates.
#[derive(Clone)]
pub struct GooglePollenClient {
    client: Client,
    api_key: String,
    referrer: Option<String>,
    endpoint: Url,
}

impl std::fmt::Debug for GooglePollenClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GooglePollenClient")
            .field("referrer", &self.referrer)
            .field("endpoint", &self.endpoint.as_str())
            .finish_non_exhaustive()
    }
}

impl GooglePollenClient {
    /// Create a client against the public endpoint with the default 20s timeout
    pub fn new(api_key: impl Into<String>, referrer: Option<String>) -> Result<Self, FetchError> {
        Self::with_options(api_key, referrer, DEFAULT_BASE_URL, DEFAULT_TIMEOUT)
    }

    /// Create a client with an explicit base URL and timeout
    pub fn with_options(
        api_key: impl Into<String>,
        referrer: Option<String>,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("PollenWatch/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(FetchError::from_reqwest)?;

        let base_url = base_url.into();
        let endpoint = format!("{}/{CURRENT_CONDITIONS_PATH}", base_url.trim_end_matches('/'));
        let endpoint = Url::parse(&endpoint).map_err(|e| FetchError::InvalidEndpoint {
            url: endpoint.clone(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            referrer: referrer.filter(|r| !r.is_empty()),
            endpoint,
        })
    }

    #[must_use]
    pub fn referrer(&self) -> Option<&str> {
        self.referrer.as_deref()
    }

    #[must_use]
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    fn request_url(&self, latitude: f64, longitude: f64) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("key", &self.api_key)
            .append_pair("location", &coordinate_query(latitude, longitude));
        url
    }
}

#[async_trait]
impl PollenFetcher for GooglePollenClient {
    #[instrument(name = "fetch_pollen", level = "debug", skip(self))]
    async fn fetch(&self, latitude: f64, longitude: f64) -> Result<PollenSnapshot, FetchError> {
        let start = Instant::now();
        let mut request = self.client.get(self.request_url(latitude, longitude));
        if let Some(referrer) = &self.referrer {
            request = request.header(REFERER, referrer);
        }

        let response = request.send().await.map_err(FetchError::from_reqwest)?;
        let status = response.status();
        debug!("Pollen API responded {} in {:.3}s", status, start.elapsed().as_secs_f64());

        if !status.is_success() {
            let mut body = response.text().await.unwrap_or_default();
            truncate_on_char_boundary(&mut body, MAX_ERROR_BODY_LEN);
            return Err(FetchError::Status { status, body });
        }

        let bytes = response.bytes().await.map_err(FetchError::from_reqwest)?;
        let snapshot = parser::parse_body(&bytes)?;

        if start.elapsed() > Duration::from_secs(5) {
            warn!("Slow pollen API response: {:.3}s", start.elapsed().as_secs_f64());
        }
        Ok(snapshot)
    }
}

fn truncate_on_char_boundary(text: &mut String, max_len: usize) {
    if text.len() <= max_len {
        return;
    }
    let mut cut = max_len;
    while !text.is_char_boundary(cut) {
        cut -= 1;
    }
    text.truncate(cut);
}
