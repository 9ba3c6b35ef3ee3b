//! # Trailmap
//!
//! The non-visual core of a single-screen map viewer: live device-location
//! tracking, free-text place search and on-demand road routing.
//!
//! A presentation layer (whatever draws the tiles, markers and polylines)
//! drives a [`session::Session`] through a [`session::SessionHandle`] and
//! renders the [`session::SessionState`] snapshots it publishes.
//!
//! ## Features
//!
//! Every component lives in its own crate and can be enabled separately.
//!
//! - `permission`: Platform location-permission checks and requests.
//! - `location`: One-shot and streaming device location.
//! - `geocode`: Free-text place search over a Nominatim-compatible service.
//! - `routing`: Road routes over an OSRM-compatible service.
//! - `session`: The coordination core tying all of the above together.
//!
//! Use the `full` feature to enable everything.
//!
//! ## Example
//!
//! ```toml
//! [dependencies]
//! trailmap = { version = "0.1", features = ["session"] }
//! ```
//!
//! ```rust,ignore
//! use trailmap::geocode::NominatimClient;
//! use trailmap::location::LocationManager;
//! use trailmap::routing::OsrmClient;
//! use trailmap::session::{Session, SessionConfig};
//!
//! async fn open_map() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = SessionConfig::default();
//!     let (session, handle) = Session::new(
//!         LocationManager,
//!         NominatimClient::new(config.geocode.clone())?,
//!         OsrmClient::new(config.routing.clone())?,
//!         config,
//!     );
//!     let updates = handle.subscribe();
//!     tokio::spawn(session.run());
//!     handle.search("Dhaka");
//!     while let Ok(state) = updates.recv().await {
//!         println!("route has {} points", state.route_geometry.len());
//!     }
//!     Ok(())
//! }
//! ```

#[cfg(feature = "geocode")]
pub use trailmap_geocode as geocode;

#[cfg(feature = "location")]
pub use trailmap_location as location;

#[cfg(feature = "permission")]
pub use trailmap_permission as permission;

#[cfg(feature = "routing")]
pub use trailmap_routing as routing;

#[cfg(feature = "session")]
pub use trailmap_session as session;
