//! Session configuration.

use serde::{Deserialize, Serialize};
use trailmap_geocode::GeocodeConfig;
use trailmap_location::LocationSettings;
use trailmap_routing::RoutingConfig;

/// Everything a [`Session`](crate::Session) needs to know up front.
///
/// Every field has a default, so a host application can embed this in its
/// own configuration file and only spell out what it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Position fetch and subscription options.
    pub location: LocationSettings,
    /// Place search service.
    pub geocode: GeocodeConfig,
    /// Routing service.
    pub routing: RoutingConfig,
    /// Zoom applied when the first position fix arrives.
    pub initial_zoom: f64,
    /// Close-up zoom applied when a place is chosen.
    pub place_zoom: f64,
    /// Whether the view starts out following the device.
    pub follow_mode: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            location: LocationSettings::default(),
            geocode: GeocodeConfig::default(),
            routing: RoutingConfig::default(),
            initial_zoom: 15.0,
            place_zoom: 16.0,
            follow_mode: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_config_keeps_defaults() {
        let config: SessionConfig = serde_json::from_str(
            r#"{ "place_zoom": 14.0, "routing": { "endpoint": "http://localhost:5000" } }"#,
        )
        .unwrap();
        assert!((config.place_zoom - 14.0).abs() < f64::EPSILON);
        assert_eq!(config.routing.endpoint, "http://localhost:5000");
        assert_eq!(config.routing.profile, "driving");
        assert_eq!(config.geocode.limit, 5);
        assert_eq!(config.location.distance_filter_m, 5);
        assert!(config.follow_mode);
    }
}
