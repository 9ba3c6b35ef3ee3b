//! The session's state machine.
//!
//! [`Coordinator::handle`] applies one [`Event`] to the [`SessionState`] and
//! returns the [`Effect`]s the runtime must carry out. It never awaits and
//! never touches the network, so every rule linking location, search and
//! routing can be exercised directly.

use log::{debug, warn};
use trailmap_geocode::{PlaceResult, SearchError};
use trailmap_location::{Coordinate, Location, LocationError};
use trailmap_routing::{Route, RouteError};

use crate::config::SessionConfig;
use crate::gate::GateError;
use crate::state::{ErrorCategory, SessionState};

/// Banner text when a search returns nothing usable.
pub const NO_RESULTS: &str = "No results found.";

/// Endpoints of one route lookup.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RouteRequest {
    /// Device position when the lookup was triggered.
    pub origin: Coordinate,
    /// Destination when the lookup was triggered.
    pub destination: Coordinate,
}

/// Everything that can change the session.
#[derive(Debug)]
pub enum Event {
    /// The permission gate finished.
    PermissionResolved(Result<(), GateError>),
    /// The one-shot position fetch finished.
    FirstFix(Result<Location, LocationError>),
    /// The position stream emitted a sample.
    PositionUpdated(Location),
    /// The position stream reported an error.
    StreamFailed(LocationError),
    /// The user submitted a search.
    SearchRequested(String),
    /// A search lookup finished.
    SearchFinished {
        /// Which search this answers.
        generation: u64,
        /// Candidates or failure.
        result: Result<Vec<PlaceResult>, SearchError>,
    },
    /// The user picked a candidate from the result list.
    ResultSelected(PlaceResult),
    /// A route lookup finished.
    RouteFinished {
        /// What was asked for.
        request: RouteRequest,
        /// Route or failure.
        result: Result<Route, RouteError>,
    },
    /// The user toggled follow mode.
    FollowModeChanged(bool),
    /// The user asked to center on the device.
    RecenterRequested,
    /// The user closed the result list.
    ResultsDismissed,
    /// The user closed the error banner.
    ErrorDismissed,
    /// The user dropped the destination.
    DestinationCleared,
}

impl Event {
    const fn name(&self) -> &'static str {
        match self {
            Self::PermissionResolved(_) => "permission-resolved",
            Self::FirstFix(_) => "first-fix",
            Self::PositionUpdated(_) => "position-updated",
            Self::StreamFailed(_) => "stream-failed",
            Self::SearchRequested(_) => "search-requested",
            Self::SearchFinished { .. } => "search-finished",
            Self::ResultSelected(_) => "result-selected",
            Self::RouteFinished { .. } => "route-finished",
            Self::FollowModeChanged(_) => "follow-mode-changed",
            Self::RecenterRequested => "recenter-requested",
            Self::ResultsDismissed => "results-dismissed",
            Self::ErrorDismissed => "error-dismissed",
            Self::DestinationCleared => "destination-cleared",
        }
    }
}

/// Work the runtime must start on the coordinator's behalf.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Run a place search.
    Search {
        /// Tag to hand back in [`Event::SearchFinished`].
        generation: u64,
        /// Trimmed query text.
        query: String,
    },
    /// Queue a route lookup.
    Route(RouteRequest),
}

/// Owner of the live [`SessionState`].
#[derive(Debug)]
pub struct Coordinator {
    state: SessionState,
    initial_zoom: f64,
    place_zoom: f64,
    search_generation: u64,
    disposed: bool,
}

impl Coordinator {
    /// Creates a coordinator with empty state.
    #[must_use]
    pub const fn new(config: &SessionConfig) -> Self {
        Self {
            state: SessionState::new(config.follow_mode, config.initial_zoom),
            initial_zoom: config.initial_zoom,
            place_zoom: config.place_zoom,
            search_generation: 0,
            disposed: false,
        }
    }

    /// Read access to the live state.
    #[must_use]
    pub const fn state(&self) -> &SessionState {
        &self.state
    }

    /// Consumes the coordinator, returning its final state.
    #[must_use]
    pub fn into_state(self) -> SessionState {
        self.state
    }

    /// Whether [`dispose`](Self::dispose) has been called.
    #[must_use]
    pub const fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Stops accepting events. Returns `false` if already disposed.
    pub const fn dispose(&mut self) -> bool {
        let was_live = !self.disposed;
        self.disposed = true;
        was_live
    }

    /// Applies `event` and returns the work it triggers.
    pub fn handle(&mut self, event: Event) -> Vec<Effect> {
        if self.disposed {
            debug!("ignoring {} after dispose", event.name());
            return Vec::new();
        }
        debug!("handling {}", event.name());

        match event {
            Event::PermissionResolved(Ok(())) => {
                self.state.clear_error(ErrorCategory::Permission);
                Vec::new()
            }
            Event::PermissionResolved(Err(err)) => {
                warn!("location unavailable: {err}");
                self.state.set_error(ErrorCategory::Permission, err.to_string());
                Vec::new()
            }
            Event::FirstFix(Ok(location)) => self.first_fix(&location),
            Event::FirstFix(Err(err)) => {
                warn!("first position fix failed: {err}");
                self.state
                    .set_error(ErrorCategory::Location, format!("Could not get current location: {err}"));
                Vec::new()
            }
            Event::PositionUpdated(location) => self.position_updated(&location),
            Event::StreamFailed(err) => {
                warn!("position stream error: {err}");
                self.state
                    .set_error(ErrorCategory::Location, format!("Location stream error: {err}"));
                Vec::new()
            }
            Event::SearchRequested(query) => self.search_requested(&query),
            Event::SearchFinished { generation, result } => self.search_finished(generation, result),
            Event::ResultSelected(place) => {
                self.state.search_results.clear();
                self.choose_destination(place.coordinate())
            }
            Event::RouteFinished { request, result } => {
                self.route_finished(request, result);
                Vec::new()
            }
            Event::FollowModeChanged(follow) => {
                self.state.follow_mode = follow;
                if follow {
                    self.recenter();
                }
                Vec::new()
            }
            Event::RecenterRequested => {
                self.recenter();
                Vec::new()
            }
            Event::ResultsDismissed => {
                self.state.search_results.clear();
                Vec::new()
            }
            Event::ErrorDismissed => {
                self.state.error = None;
                Vec::new()
            }
            Event::DestinationCleared => {
                self.state.selected_destination = None;
                self.rebuild_route().into_iter().collect()
            }
        }
    }

    fn first_fix(&mut self, location: &Location) -> Vec<Effect> {
        let Some(coordinate) = location.coordinate() else {
            warn!("dropping first fix with invalid coordinates {location:?}");
            return Vec::new();
        };

        self.state.current_location = Some(coordinate);
        self.state.trail.push(coordinate);
        self.state.view.center = Some(coordinate);
        self.state.view.zoom = self.initial_zoom;
        self.state.clear_error(ErrorCategory::Location);

        if self.state.selected_destination.is_some() {
            self.rebuild_route().into_iter().collect()
        } else {
            Vec::new()
        }
    }

    fn position_updated(&mut self, location: &Location) -> Vec<Effect> {
        let Some(coordinate) = location.coordinate() else {
            warn!("dropping position with invalid coordinates {location:?}");
            return Vec::new();
        };

        self.state.current_location = Some(coordinate);
        self.state.trail.push(coordinate);
        self.state.clear_error(ErrorCategory::Location);
        if self.state.follow_mode {
            self.state.view.center = Some(coordinate);
        }

        if self.state.selected_destination.is_some() {
            self.rebuild_route().into_iter().collect()
        } else {
            Vec::new()
        }
    }

    fn search_requested(&mut self, query: &str) -> Vec<Effect> {
        let query = query.trim();
        if query.is_empty() {
            return Vec::new();
        }

        self.search_generation += 1;
        self.state.searching = true;
        self.state.search_results.clear();
        self.state.error = None;

        vec![Effect::Search {
            generation: self.search_generation,
            query: query.to_owned(),
        }]
    }

    fn search_finished(
        &mut self,
        generation: u64,
        result: Result<Vec<PlaceResult>, SearchError>,
    ) -> Vec<Effect> {
        if generation != self.search_generation {
            debug!(
                "discarding results of superseded search {generation} (latest {})",
                self.search_generation
            );
            return Vec::new();
        }
        self.state.searching = false;

        let places = match result {
            Ok(places) => places,
            Err(err) => {
                warn!("search failed: {err}");
                self.state
                    .set_error(ErrorCategory::Search, format!("Search failed: {err}"));
                return Vec::new();
            }
        };

        let Some(first) = places.first().map(PlaceResult::coordinate) else {
            self.state.search_results.clear();
            self.state.set_error(ErrorCategory::Search, NO_RESULTS);
            return Vec::new();
        };

        self.state.search_results = places;
        self.state.clear_error(ErrorCategory::Search);
        self.choose_destination(first)
    }

    fn choose_destination(&mut self, destination: Coordinate) -> Vec<Effect> {
        self.state.selected_destination = Some(destination);
        self.state.view.center = Some(destination);
        self.state.view.zoom = self.place_zoom;
        self.rebuild_route().into_iter().collect()
    }

    fn route_finished(&mut self, request: RouteRequest, result: Result<Route, RouteError>) {
        if self.state.current_location.is_none()
            || self.state.selected_destination != Some(request.destination)
        {
            debug!("discarding route to {} which is no longer wanted", request.destination);
            return;
        }

        match result {
            Ok(route) => {
                self.state.set_route(route);
                self.state.clear_error(ErrorCategory::Route);
            }
            Err(err) => {
                warn!("routing failed, falling back to a straight line: {err}");
                self.state
                    .set_error(ErrorCategory::Route, format!("Could not find a route: {err}"));
                self.state
                    .set_route(Route::new(vec![request.origin, request.destination], None, None));
            }
        }
    }

    fn rebuild_route(&mut self) -> Option<Effect> {
        if let (Some(origin), Some(destination)) =
            (self.state.current_location, self.state.selected_destination)
        {
            Some(Effect::Route(RouteRequest {
                origin,
                destination,
            }))
        } else {
            self.state.clear_route();
            None
        }
    }

    fn recenter(&mut self) {
        if let Some(current) = self.state.current_location {
            self.state.view.center = Some(current);
        }
    }
}
