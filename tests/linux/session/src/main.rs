//! Live test binary for trailmap-session.
//!
//! Run with: cargo run -p trailmap-session-test -- "Brandenburg Gate"
//!
//! Needs GeoClue2 on the system bus and network access to the public
//! Nominatim and OSRM services.

use std::time::Duration;

use trailmap_geocode::NominatimClient;
use trailmap_location::LocationManager;
use trailmap_routing::OsrmClient;
use trailmap_session::{Session, SessionConfig, SessionState};

#[tokio::main]
async fn main() {
    env_logger::init();
    println!("=== Trailmap Session Test (Linux) ===\n");

    let query = std::env::args().nth(1).unwrap_or_else(|| "Alexanderplatz, Berlin".to_owned());
    let config = SessionConfig::default();
    let places = match NominatimClient::new(config.geocode.clone()) {
        Ok(client) => client,
        Err(e) => {
            println!("✗ Could not build search client: {e}");
            return;
        }
    };
    let roads = match OsrmClient::new(config.routing.clone()) {
        Ok(client) => client,
        Err(e) => {
            println!("✗ Could not build routing client: {e}");
            return;
        }
    };
    let (session, handle) = Session::new(LocationManager, places, roads, config);
    let updates = handle.subscribe();
    let running = tokio::spawn(session.run());

    println!("Searching for {query:?}...\n");
    handle.search(query);

    let watch = async {
        while let Ok(state) = updates.recv().await {
            report(&state);
        }
    };
    if tokio::time::timeout(Duration::from_secs(30), watch).await.is_err() {
        println!("\nStopping after 30 s");
    }

    handle.close();
    match running.await {
        Ok(state) => {
            println!("\n✓ Session closed");
            println!("  Trail points: {}", state.trail.len());
            println!("  Route points: {}", state.route_geometry.len());
        }
        Err(e) => println!("\n✗ Session task failed: {e}"),
    }
}

fn report(state: &SessionState) {
    if let Some(location) = state.current_location {
        println!("  Location:    {location}");
    }
    if state.searching {
        println!("  Searching...");
    }
    for place in &state.search_results {
        println!("  Result:      {} {}", place.name(), place.coordinate());
    }
    if !state.route_geometry.is_empty() {
        let km = state.route_distance_m.map_or(0.0, |m| m / 1000.0);
        println!(
            "  Route:       {} points, {km:.1} km",
            state.route_geometry.len()
        );
    }
    if let Some(message) = state.error_message() {
        println!("  ✗ {message}");
    }
}
