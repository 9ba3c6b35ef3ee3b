//! Road routes between two coordinates.
//!
//! [`OsrmClient`] asks an OSRM-compatible `/route/v1` endpoint for the full
//! GeoJSON geometry of the best route. The wire format is longitude-first;
//! everything this crate hands out is latitude-first [`Coordinate`]s.

#![warn(missing_docs)]

use std::future::Future;
use std::time::Duration;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

pub use trailmap_location::Coordinate;

/// A road route as an ordered polyline.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Route {
    points: Vec<Coordinate>,
    distance_m: Option<f64>,
    duration_s: Option<f64>,
}

impl Route {
    /// Creates a route from its polyline and optional summary figures.
    #[must_use]
    pub const fn new(points: Vec<Coordinate>, distance_m: Option<f64>, duration_s: Option<f64>) -> Self {
        Self {
            points,
            distance_m,
            duration_s,
        }
    }

    /// The polyline, origin first.
    #[must_use]
    pub fn points(&self) -> &[Coordinate] {
        &self.points
    }

    /// Consumes the route, returning its polyline.
    #[must_use]
    pub fn into_points(self) -> Vec<Coordinate> {
        self.points
    }

    /// Road distance in meters, if the service reported it.
    #[must_use]
    pub const fn distance_m(&self) -> Option<f64> {
        self.distance_m
    }

    /// Expected travel time in seconds, if the service reported it.
    #[must_use]
    pub const fn duration_s(&self) -> Option<f64> {
        self.duration_s
    }
}

/// Errors that can occur while fetching a route.
#[derive(Debug, thiserror::Error)]
pub enum RouteError {
    /// The service answered with a non-success status.
    #[error("HTTP {0}")]
    Status(u16),
    /// The request could not be sent or the body could not be read.
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    /// The body was not a routing response.
    #[error("malformed response: {0}")]
    Decode(#[from] serde_json::Error),
    /// The response held no usable route.
    #[error("no route: {0}")]
    NoRoute(String),
    /// No answer arrived in time.
    #[error("timed out after {0:?}")]
    Timeout(Duration),
}

/// A routing backend.
pub trait RouteService: Send + Sync {
    /// Finds a road route from `origin` to `destination`.
    fn route(
        &self,
        origin: Coordinate,
        destination: Coordinate,
    ) -> impl Future<Output = Result<Route, RouteError>> + Send;
}

/// Where and how to reach the routing service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutingConfig {
    /// Base URL of the service, without the `/route/v1` part.
    pub endpoint: String,
    /// Routing profile, e.g. `driving`.
    pub profile: String,
    /// Longest wait for one route, in milliseconds.
    pub timeout_ms: u64,
}

impl RoutingConfig {
    /// The per-route timeout as a [`Duration`].
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://router.project-osrm.org".to_owned(),
            profile: "driving".to_owned(),
            timeout_ms: 10_000,
        }
    }
}

/// Client for OSRM-compatible route endpoints.
#[derive(Debug, Clone)]
pub struct OsrmClient {
    http: reqwest::Client,
    config: RoutingConfig,
}

impl OsrmClient {
    /// Creates a client with its own connection pool.
    ///
    /// # Errors
    /// Returns [`RouteError::Request`] if the HTTP client cannot be built.
    pub fn new(config: RoutingConfig) -> Result<Self, RouteError> {
        let http = reqwest::Client::builder().timeout(config.timeout()).build()?;
        Ok(Self::with_http(http, config))
    }

    /// Creates a client sharing an existing connection pool.
    #[must_use]
    pub const fn with_http(http: reqwest::Client, config: RoutingConfig) -> Self {
        Self { http, config }
    }

    fn route_url(&self, origin: Coordinate, destination: Coordinate) -> String {
        format!(
            "{}/route/v1/{}/{},{};{},{}?overview=full&geometries=geojson",
            self.config.endpoint.trim_end_matches('/'),
            self.config.profile,
            origin.longitude(),
            origin.latitude(),
            destination.longitude(),
            destination.latitude(),
        )
    }
}

impl RouteService for OsrmClient {
    async fn route(&self, origin: Coordinate, destination: Coordinate) -> Result<Route, RouteError> {
        let url = self.route_url(origin, destination);
        debug!("requesting route {origin} -> {destination}");
        let response = self
            .http
            .get(&url)
            .timeout(self.config.timeout())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            warn!("route request {url} failed with {status}");
            return Err(RouteError::Status(status.as_u16()));
        }

        let body = response.text().await?;
        parse_route(&body)
    }
}

#[derive(Deserialize)]
struct RawResponse {
    code: Option<String>,
    message: Option<String>,
    #[serde(default)]
    routes: Vec<RawRoute>,
}

#[derive(Deserialize)]
struct RawRoute {
    geometry: Option<RawGeometry>,
    distance: Option<f64>,
    duration: Option<f64>,
}

#[derive(Deserialize)]
struct RawGeometry {
    #[serde(default)]
    coordinates: Vec<Vec<f64>>,
}

/// Parses a route response body, reordering `[lon, lat]` positions.
///
/// # Errors
/// Returns [`RouteError::Decode`] for a body that is not a routing response
/// and [`RouteError::NoRoute`] when it holds no route with at least two valid
/// positions.
pub fn parse_route(body: &str) -> Result<Route, RouteError> {
    let response: RawResponse = serde_json::from_str(body)?;

    if let Some(code) = response.code.as_deref().filter(|code| *code != "Ok") {
        let reason = response.message.unwrap_or_else(|| code.to_owned());
        return Err(RouteError::NoRoute(reason));
    }

    let Some(route) = response.routes.into_iter().next() else {
        return Err(RouteError::NoRoute("response has no routes".to_owned()));
    };
    let Some(geometry) = route.geometry else {
        return Err(RouteError::NoRoute("route has no geometry".to_owned()));
    };

    let points = geometry
        .coordinates
        .iter()
        .map(|position| match position.as_slice() {
            [longitude, latitude, ..] => Coordinate::new(*latitude, *longitude),
            _ => None,
        })
        .collect::<Option<Vec<_>>>()
        .ok_or_else(|| RouteError::NoRoute("geometry has an invalid position".to_owned()))?;

    if points.len() < 2 {
        return Err(RouteError::NoRoute(format!(
            "geometry has {} position(s)",
            points.len()
        )));
    }

    Ok(Route::new(points, route.distance, route.duration))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coord(latitude: f64, longitude: f64) -> Coordinate {
        Coordinate::new(latitude, longitude).unwrap()
    }

    #[test]
    fn reorders_positions_to_latitude_first() {
        let route =
            parse_route(r#"{"routes":[{"geometry":{"coordinates":[[90.0,23.0],[90.1,23.1]]}}]}"#)
                .unwrap();
        assert_eq!(route.points(), &[coord(23.0, 90.0), coord(23.1, 90.1)]);
        assert_eq!(route.distance_m(), None);
    }

    #[test]
    fn keeps_summary_figures() {
        let body = r#"{"code":"Ok","routes":[{"distance":1520.4,"duration":210.0,
            "geometry":{"type":"LineString","coordinates":[[90.0,23.0,4.0],[90.1,23.1,5.0]]}}]}"#;
        let route = parse_route(body).unwrap();
        assert_eq!(route.distance_m(), Some(1520.4));
        assert_eq!(route.duration_s(), Some(210.0));
        assert_eq!(route.points().len(), 2);
    }

    #[test]
    fn error_code_is_no_route() {
        let err = parse_route(r#"{"code":"NoRoute","message":"Impossible route","routes":[]}"#)
            .unwrap_err();
        assert!(matches!(err, RouteError::NoRoute(reason) if reason == "Impossible route"));
    }

    #[test]
    fn empty_or_degenerate_geometry_is_no_route() {
        assert!(matches!(
            parse_route(r#"{"code":"Ok","routes":[]}"#),
            Err(RouteError::NoRoute(_))
        ));
        assert!(matches!(
            parse_route(r#"{"routes":[{"geometry":{"coordinates":[[90.0,23.0]]}}]}"#),
            Err(RouteError::NoRoute(_))
        ));
        assert!(matches!(
            parse_route(r#"{"routes":[{"geometry":{"coordinates":[[90.0],[90.1,23.1]]}}]}"#),
            Err(RouteError::NoRoute(_))
        ));
    }

    #[test]
    fn garbage_is_a_decode_error() {
        assert!(matches!(parse_route("<html>"), Err(RouteError::Decode(_))));
    }

    #[test]
    fn url_is_longitude_first() {
        let client = OsrmClient::new(RoutingConfig {
            endpoint: "https://osrm.example/".to_owned(),
            ..RoutingConfig::default()
        })
        .unwrap();
        let url = client.route_url(coord(23.0, 90.0), coord(23.5, 90.5));
        assert_eq!(
            url,
            "https://osrm.example/route/v1/driving/90,23;90.5,23.5?overview=full&geometries=geojson"
        );
    }

    #[test]
    fn timeout_defaults_to_ten_seconds() {
        let config: RoutingConfig = serde_json::from_str(r#"{ "profile": "foot" }"#).unwrap();
        assert_eq!(config.timeout(), Duration::from_secs(10));
        assert_eq!(
            RouteError::Timeout(config.timeout()).to_string(),
            "timed out after 10s"
        );
    }
}
