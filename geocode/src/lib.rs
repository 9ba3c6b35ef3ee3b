//! Free-text place search.
//!
//! [`NominatimClient`] queries a Nominatim-compatible `/search` endpoint and
//! turns the ranked candidates into [`PlaceResult`]s. The session core only
//! sees the [`PlaceSearch`] trait, so any other geocoder can be swapped in.

#![warn(missing_docs)]

use std::future::Future;
use std::time::Duration;

use log::{debug, warn};
use reqwest::header::USER_AGENT;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use trailmap_location::Coordinate;

/// Display name used when the service returns a candidate without one.
pub const UNKNOWN_PLACE: &str = "Unknown";

/// One place candidate returned by a search.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlaceResult {
    name: String,
    coordinate: Coordinate,
}

impl PlaceResult {
    /// Creates a candidate; a blank name is replaced by [`UNKNOWN_PLACE`].
    #[must_use]
    pub fn new(name: impl Into<String>, coordinate: Coordinate) -> Self {
        let name = name.into();
        let name = if name.trim().is_empty() {
            UNKNOWN_PLACE.to_owned()
        } else {
            name
        };
        Self { name, coordinate }
    }

    /// Human-readable name of the place.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Where the place is.
    #[must_use]
    pub const fn coordinate(&self) -> Coordinate {
        self.coordinate
    }
}

/// Errors that can occur during a place search.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    /// The service answered with a non-success status.
    #[error("HTTP {0}")]
    Status(u16),
    /// The request could not be sent or the body could not be read.
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    /// The body was not a JSON array of places.
    #[error("malformed response: {0}")]
    Decode(#[from] serde_json::Error),
    /// No answer arrived in time.
    #[error("timed out after {0:?}")]
    Timeout(Duration),
}

/// A geocoding backend.
pub trait PlaceSearch: Send + Sync {
    /// Looks up `query` and returns candidates in the service's ranking order.
    fn search(
        &self,
        query: &str,
    ) -> impl Future<Output = Result<Vec<PlaceResult>, SearchError>> + Send;
}

/// Where and how to reach the geocoding service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeocodeConfig {
    /// Full URL of the search endpoint.
    pub endpoint: String,
    /// Value of the `User-Agent` header identifying this client.
    pub user_agent: String,
    /// Maximum number of candidates to ask for.
    pub limit: usize,
    /// Longest wait for one search, in milliseconds.
    pub timeout_ms: u64,
}

impl GeocodeConfig {
    /// The per-search timeout as a [`Duration`].
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for GeocodeConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://nominatim.openstreetmap.org/search".to_owned(),
            user_agent: concat!("trailmap/", env!("CARGO_PKG_VERSION")).to_owned(),
            limit: 5,
            timeout_ms: 10_000,
        }
    }
}

/// Client for Nominatim-compatible search endpoints.
#[derive(Debug, Clone)]
pub struct NominatimClient {
    http: reqwest::Client,
    config: GeocodeConfig,
}

impl NominatimClient {
    /// Creates a client with its own connection pool.
    ///
    /// # Errors
    /// Returns [`SearchError::Request`] if the HTTP client cannot be built.
    pub fn new(config: GeocodeConfig) -> Result<Self, SearchError> {
        let http = reqwest::Client::builder().timeout(config.timeout()).build()?;
        Ok(Self::with_http(http, config))
    }

    /// Creates a client sharing an existing connection pool.
    #[must_use]
    pub const fn with_http(http: reqwest::Client, config: GeocodeConfig) -> Self {
        Self { http, config }
    }

    fn request(&self, query: &str) -> reqwest::RequestBuilder {
        let limit = self.config.limit.to_string();
        self.http
            .get(&self.config.endpoint)
            .query(&[("q", query), ("format", "json"), ("limit", limit.as_str())])
            .header(USER_AGENT, &self.config.user_agent)
            .timeout(self.config.timeout())
    }
}

impl PlaceSearch for NominatimClient {
    async fn search(&self, query: &str) -> Result<Vec<PlaceResult>, SearchError> {
        debug!("searching places for {query:?}");
        let response = self.request(query).send().await?;

        let status = response.status();
        if !status.is_success() {
            warn!("place search for {query:?} failed with {status}");
            return Err(SearchError::Status(status.as_u16()));
        }

        let body = response.text().await?;
        parse_places(&body)
    }
}

#[derive(Deserialize)]
struct RawPlace {
    lat: Option<Value>,
    lon: Option<Value>,
    display_name: Option<Value>,
}

/// Parses a search response body.
///
/// Candidates without a numeric latitude and longitude, or with one out of
/// range, are skipped. Services send the numbers as text, but plain JSON
/// numbers are accepted too.
///
/// # Errors
/// Returns [`SearchError::Decode`] if the body is not a JSON array of objects.
pub fn parse_places(body: &str) -> Result<Vec<PlaceResult>, SearchError> {
    let raw: Vec<RawPlace> = serde_json::from_str(body)?;
    let total = raw.len();

    let places: Vec<PlaceResult> = raw
        .into_iter()
        .filter_map(|place| {
            let coordinate =
                Coordinate::new(component(place.lat.as_ref())?, component(place.lon.as_ref())?)?;
            let name = place
                .display_name
                .as_ref()
                .and_then(Value::as_str)
                .unwrap_or(UNKNOWN_PLACE);
            Some(PlaceResult::new(name, coordinate))
        })
        .collect();

    if places.len() < total {
        debug!("skipped {} candidates without coordinates", total - places.len());
    }
    Ok(places)
}

fn component(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::String(text) => text.trim().parse().ok(),
        Value::Number(number) => number.as_f64(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_text_coordinates_and_display_name() {
        let places =
            parse_places(r#"[{"lat": "23.81", "lon": "90.41", "display_name": "X"}]"#).unwrap();
        assert_eq!(places.len(), 1);
        assert_eq!(places[0].name(), "X");
        assert_eq!(places[0].coordinate(), Coordinate::new(23.81, 90.41).unwrap());
    }

    #[test]
    fn skips_candidates_without_usable_coordinates() {
        let body = r#"[
            {"lon": "90.41", "display_name": "no latitude"},
            {"lat": "north", "lon": "90.41", "display_name": "not a number"},
            {"lat": "95.0", "lon": "90.41", "display_name": "out of range"},
            {"lat": 51.5, "lon": -0.12, "display_name": "London"}
        ]"#;
        let places = parse_places(body).unwrap();
        assert_eq!(places.len(), 1);
        assert_eq!(places[0].name(), "London");
    }

    #[test]
    fn missing_or_blank_name_defaults_to_unknown() {
        let places =
            parse_places(r#"[{"lat": "1", "lon": "2"}, {"lat": "3", "lon": "4", "display_name": " "}]"#)
                .unwrap();
        assert!(places.iter().all(|place| place.name() == UNKNOWN_PLACE));
    }

    #[test]
    fn empty_array_is_not_an_error() {
        assert!(parse_places("[]").unwrap().is_empty());
    }

    #[test]
    fn non_array_body_is_a_decode_error() {
        let err = parse_places(r#"{"error": "Unable to geocode"}"#).unwrap_err();
        assert!(matches!(err, SearchError::Decode(_)));
    }

    #[test]
    fn request_carries_query_limit_and_user_agent() {
        let client = NominatimClient::new(GeocodeConfig::default()).unwrap();
        let request = client.request("Dhaka city").build().unwrap();

        let query = request.url().query().unwrap();
        assert!(query.contains("q=Dhaka+city"));
        assert!(query.contains("format=json"));
        assert!(query.contains("limit=5"));
        assert_eq!(request.url().path(), "/search");

        let agent = request.headers().get(USER_AGENT).unwrap().to_str().unwrap();
        assert!(agent.starts_with("trailmap/"));
        assert_eq!(request.timeout(), Some(&Duration::from_secs(10)));
    }
}
