//! Session state as seen by the presentation layer.

use serde::Serialize;
use trailmap_geocode::PlaceResult;
use trailmap_location::Coordinate;
use trailmap_routing::Route;

/// Which part of the screen an error belongs to.
///
/// A successful operation only clears errors of its own category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Location service or permission problems.
    Permission,
    /// Position fetch or stream failures.
    Location,
    /// Place search failures, including an empty result set.
    Search,
    /// Routing failures.
    Route,
}

/// The message shown in the error banner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorText {
    /// What failed.
    pub category: ErrorCategory,
    /// User-facing text.
    pub message: String,
}

/// Where the map is looking.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MapView {
    /// View center; `None` until there is anything to look at.
    pub center: Option<Coordinate>,
    /// Zoom level.
    pub zoom: f64,
}

/// A snapshot of everything the map screen renders.
///
/// Only the session's coordinator mutates the live copy; everyone else gets
/// clones.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionState {
    /// Last known device position.
    pub current_location: Option<Coordinate>,
    /// Every position observed this session, oldest first. Never shrinks.
    pub trail: Vec<Coordinate>,
    /// Whether the view recenters on each position update.
    pub follow_mode: bool,
    /// Candidates from the latest search, in ranking order.
    pub search_results: Vec<PlaceResult>,
    /// The place being routed to.
    pub selected_destination: Option<Coordinate>,
    /// Polyline from the current location to the destination.
    pub route_geometry: Vec<Coordinate>,
    /// Road distance of the current route in meters, when known.
    pub route_distance_m: Option<f64>,
    /// Travel time of the current route in seconds, when known.
    pub route_duration_s: Option<f64>,
    /// Latest surfaced failure.
    pub error: Option<ErrorText>,
    /// True while the latest search is in flight.
    pub searching: bool,
    /// Map camera.
    pub view: MapView,
}

impl SessionState {
    pub(crate) const fn new(follow_mode: bool, zoom: f64) -> Self {
        Self {
            current_location: None,
            trail: Vec::new(),
            follow_mode,
            search_results: Vec::new(),
            selected_destination: None,
            route_geometry: Vec::new(),
            route_distance_m: None,
            route_duration_s: None,
            error: None,
            searching: false,
            view: MapView { center: None, zoom },
        }
    }

    /// The error message, if one is showing.
    #[must_use]
    pub fn error_message(&self) -> Option<&str> {
        self.error.as_ref().map(|error| error.message.as_str())
    }

    pub(crate) fn set_error(&mut self, category: ErrorCategory, message: impl Into<String>) {
        self.error = Some(ErrorText {
            category,
            message: message.into(),
        });
    }

    pub(crate) fn clear_error(&mut self, category: ErrorCategory) {
        if self.error.as_ref().is_some_and(|error| error.category == category) {
            self.error = None;
        }
    }

    pub(crate) fn set_route(&mut self, route: Route) {
        self.route_distance_m = route.distance_m();
        self.route_duration_s = route.duration_s();
        self.route_geometry = route.into_points();
    }

    pub(crate) fn clear_route(&mut self) {
        self.route_geometry.clear();
        self.route_distance_m = None;
        self.route_duration_s = None;
    }
}
