//! USGS earthquake feed client
//!
//! Builds time-windowed queries against the FDSN event endpoint and decodes
//! the GeoJSON response into `Quake` records.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, Url};
use serde::{de, Deserialize, Deserializer};
use thiserror::Error;
use tracing::debug;

use super::{Location, Quake, QueryWindow};

/// USGS FDSN event query endpoint
pub const USGS_QUERY_URL: &str = "https://earthquake.usgs.gov/fdsnws/event/1/query";

/// Default per-request timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Errors that can occur when fetching quakes
#[derive(Debug, Error)]
pub enum FetchError {
    /// Base URL and query parameters did not form a valid URL
    #[error("Invalid feed URL: {0}")]
    InvalidUrl(String),

    /// The request succeeded but the body was empty
    #[error("Feed returned no data")]
    NoDataReturned,

    /// The query window could not be computed
    #[error("Date math error: {0}")]
    DateMath(String),

    /// The body did not match the expected GeoJSON shape
    #[error("Failed to decode feed response: {0}")]
    Decode(#[from] serde_json::Error),

    /// Transport failure or non-success HTTP status
    #[error("Network request failed: {0}")]
    Network(#[from] reqwest::Error),

    /// The fetch task ended without producing a result
    #[error("Fetch task ended before delivering a result")]
    Aborted,
}

/// A source of quake records for a time window
///
/// `FeedClient` is the HTTP implementation; tests substitute canned feeds.
#[async_trait]
pub trait QuakeFeed: Send + Sync {
    /// Fetches all events inside `window`, in feed order
    async fn fetch(&self, window: &QueryWindow) -> Result<Vec<Quake>, FetchError>;
}

/// Client for the USGS event feed
#[derive(Debug, Clone)]
pub struct FeedClient {
    /// HTTP client for making requests
    http_client: Client,
    /// Query endpoint (allows override for testing)
    base_url: String,
}

impl Default for FeedClient {
    fn default() -> Self {
        Self::new()
    }
}

impl FeedClient {
    /// Creates a client for the public USGS endpoint
    pub fn new() -> Self {
        Self::with_base_url(USGS_QUERY_URL)
    }

    /// Creates a client for a custom endpoint with the default timeout
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            http_client: build_http_client(Duration::from_secs(DEFAULT_TIMEOUT_SECS)),
            base_url: base_url.into(),
        }
    }

    /// Creates a client with a preconfigured HTTP client
    pub fn with_client(http_client: Client, base_url: impl Into<String>) -> Self {
        Self {
            http_client,
            base_url: base_url.into(),
        }
    }

    /// Replaces the per-request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.http_client = build_http_client(timeout);
        self
    }

    /// The configured query endpoint
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Builds the full request URL for a window
    ///
    /// # Returns
    /// * `Ok(Url)` - `<base>?starttime=..&endtime=..&format=geojson`
    /// * `Err(FetchError::InvalidUrl)` - if the base does not parse as http(s)
    pub fn request_url(&self, window: &QueryWindow) -> Result<Url, FetchError> {
        let mut url = parse_base_url(&self.base_url)?;
        url.query_pairs_mut()
            .append_pair("starttime", &window.start_param())
            .append_pair("endtime", &window.end_param())
            .append_pair("format", "geojson");
        Ok(url)
    }
}

#[async_trait]
impl QuakeFeed for FeedClient {
    async fn fetch(&self, window: &QueryWindow) -> Result<Vec<Quake>, FetchError> {
        let url = self.request_url(window)?;
        debug!(%url, "requesting quake feed");

        let response = self.http_client.get(url).send().await?.error_for_status()?;
        let body = response.bytes().await?;
        debug!(bytes = body.len(), "received quake feed response");

        decode_feed(&body)
    }
}

/// Parses and validates a feed endpoint
///
/// Only `http` and `https` endpoints are accepted.
pub fn parse_base_url(base_url: &str) -> Result<Url, FetchError> {
    let url = Url::parse(base_url)
        .map_err(|e| FetchError::InvalidUrl(format!("{}: {}", base_url, e)))?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        scheme => Err(FetchError::InvalidUrl(format!(
            "{}: unsupported scheme '{}'",
            base_url, scheme
        ))),
    }
}

/// Decodes a feed response body into quakes
///
/// # Returns
/// * `Ok(Vec<Quake>)` - events in the order the feed listed them
/// * `Err(FetchError::NoDataReturned)` - if the body is empty or whitespace
/// * `Err(FetchError::Decode)` - if the body is not a valid feature collection
pub fn decode_feed(body: &[u8]) -> Result<Vec<Quake>, FetchError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(FetchError::NoDataReturned);
    }

    let collection: FeatureCollection = serde_json::from_slice(body)?;
    Ok(collection.features.into_iter().map(Quake::from).collect())
}

fn build_http_client(timeout: Duration) -> Client {
    Client::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_else(|_| Client::new())
}

/// Top-level GeoJSON response
#[derive(Debug, Deserialize)]
struct FeatureCollection {
    features: Vec<Feature>,
}

/// A single event in the response
#[derive(Debug, Deserialize)]
struct Feature {
    properties: Properties,
    geometry: Geometry,
}

#[derive(Debug, Deserialize)]
struct Properties {
    mag: f64,
    place: Option<String>,
    /// Milliseconds since the Unix epoch
    #[serde(with = "chrono::serde::ts_milliseconds")]
    time: DateTime<Utc>,
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    #[serde(deserialize_with = "deserialize_lon_lat")]
    coordinates: Location,
}

/// Decodes `[longitude, latitude]`; any other length is an error
fn deserialize_lon_lat<'de, D>(deserializer: D) -> Result<Location, D::Error>
where
    D: Deserializer<'de>,
{
    let coordinates = Vec::<f64>::deserialize(deserializer)?;
    match coordinates.as_slice() {
        [longitude, latitude] => Ok(Location {
            latitude: *latitude,
            longitude: *longitude,
        }),
        other => Err(de::Error::invalid_length(
            other.len(),
            &"a [longitude, latitude] pair",
        )),
    }
}

impl From<Feature> for Quake {
    fn from(feature: Feature) -> Self {
        let Feature {
            properties,
            geometry,
        } = feature;

        Quake {
            magnitude: properties.mag,
            place: properties.place,
            occurred_at: properties.time,
            detail_url: properties.url,
            location: geometry.coordinates,
        }
    }
}
