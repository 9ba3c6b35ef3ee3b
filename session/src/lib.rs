//! Coordination core for a map screen.
//!
//! This crate links three sources of change into one [`SessionState`]:
//!
//! - the device position, gated by [`ensure_location_permission`] and then
//!   streamed from a [`LocationProvider`](trailmap_location::LocationProvider);
//! - free-text place search through a
//!   [`PlaceSearch`](trailmap_geocode::PlaceSearch) backend;
//! - road routes through a [`RouteService`](trailmap_routing::RouteService)
//!   backend, rebuilt whenever the position or destination changes.
//!
//! The rules live in [`Coordinator`], a synchronous state machine. [`Session`]
//! is the async runtime around it: it owns the coordinator, runs the
//! background work and publishes snapshots to whoever renders the screen.
//!
//! # Usage
//!
//! ```ignore
//! let (session, handle) = Session::new(provider, search, router, SessionConfig::default());
//! let updates = handle.subscribe();
//! let session = tokio::spawn(session.run());
//!
//! handle.search("Dhaka");
//! while let Ok(state) = updates.recv().await {
//!     render(&state);
//! }
//! ```

#![warn(missing_docs)]

mod config;
pub mod coordinator;
mod gate;
mod session;
mod state;

pub use config::SessionConfig;
pub use coordinator::{Coordinator, Effect, Event, NO_RESULTS, RouteRequest};
pub use gate::{GateError, ensure_location_permission};
pub use session::{Session, SessionHandle};
pub use state::{ErrorCategory, ErrorText, MapView, SessionState};

pub use trailmap_geocode::PlaceResult;
pub use trailmap_location::Coordinate;
