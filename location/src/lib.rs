//! Device location access.
//!
//! This crate provides the geolocation side of trailmap: a validated
//! [`Coordinate`] value type, the raw [`Location`] samples a platform reports,
//! and the [`LocationProvider`] trait the session core talks to. The platform
//! implementation is [`LocationManager`]; tests and embedders can supply their
//! own provider.

#![warn(missing_docs)]

/// Platform-specific implementations.
pub mod sys;

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use futures::Stream;
use serde::{Deserialize, Serialize};

pub use trailmap_permission::{Permission, PermissionError, PermissionStatus};

/// A validated latitude/longitude pair in degrees.
///
/// Both components are finite; latitude lies in `[-90, 90]` and longitude in
/// `[-180, 180]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Coordinate {
    latitude: f64,
    longitude: f64,
}

impl Coordinate {
    /// Creates a coordinate, or `None` if either component is out of range.
    #[must_use]
    pub fn new(latitude: f64, longitude: f64) -> Option<Self> {
        let valid = latitude.is_finite()
            && longitude.is_finite()
            && (-90.0..=90.0).contains(&latitude)
            && (-180.0..=180.0).contains(&longitude);
        valid.then_some(Self {
            latitude,
            longitude,
        })
    }

    /// Latitude in degrees.
    #[must_use]
    pub const fn latitude(&self) -> f64 {
        self.latitude
    }

    /// Longitude in degrees.
    #[must_use]
    pub const fn longitude(&self) -> f64 {
        self.longitude
    }
}

impl std::fmt::Display for Coordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.6}, {:.6})", self.latitude, self.longitude)
    }
}

/// A geographic location with coordinates and metadata.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Location {
    /// Latitude in degrees (-90 to 90).
    pub latitude: f64,
    /// Longitude in degrees (-180 to 180).
    pub longitude: f64,
    /// Altitude in meters above sea level, if available.
    pub altitude: Option<f64>,
    /// Horizontal accuracy in meters, if available.
    pub horizontal_accuracy: Option<f64>,
    /// Vertical accuracy in meters, if available.
    pub vertical_accuracy: Option<f64>,
    /// Timestamp as Unix epoch milliseconds.
    pub timestamp: u64,
}

impl Location {
    /// Creates a sample with only a position and a timestamp.
    #[must_use]
    pub const fn at(latitude: f64, longitude: f64, timestamp: u64) -> Self {
        Self {
            latitude,
            longitude,
            altitude: None,
            horizontal_accuracy: None,
            vertical_accuracy: None,
            timestamp,
        }
    }

    /// The sample's position, if the platform reported a valid one.
    #[must_use]
    pub fn coordinate(&self) -> Option<Coordinate> {
        Coordinate::new(self.latitude, self.longitude)
    }
}

/// How precise the platform should try to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Accuracy {
    /// City-level precision; cheapest on power.
    Low,
    /// Street-level precision.
    Balanced,
    /// Best the hardware can do (GPS when available).
    #[default]
    High,
}

/// Options for position fetches and subscriptions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocationSettings {
    /// Requested precision.
    pub accuracy: Accuracy,
    /// Movement in meters below which the platform suppresses updates.
    pub distance_filter_m: u32,
    /// How long a one-shot fetch may wait for a first fix, in milliseconds.
    pub timeout_ms: u64,
}

impl LocationSettings {
    /// The one-shot fetch timeout as a [`Duration`].
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for LocationSettings {
    fn default() -> Self {
        Self {
            accuracy: Accuracy::High,
            distance_filter_m: 5,
            timeout_ms: 30_000,
        }
    }
}

/// Errors that can occur when accessing location.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LocationError {
    /// Location permission was not granted.
    #[error("location permission denied")]
    PermissionDenied,
    /// Location services are disabled on the device.
    #[error("location services disabled")]
    ServiceDisabled,
    /// Location request timed out.
    #[error("location request timed out")]
    Timeout,
    /// Location is not available.
    #[error("location not available")]
    NotAvailable,
    /// An unknown error occurred.
    #[error("unknown error: {0}")]
    Unknown(String),
}

/// A boxed stream of location samples. Dropping it ends the subscription.
pub type LocationStream = Pin<Box<dyn Stream<Item = Result<Location, LocationError>> + Send>>;

/// Source of device positions and of the permission state guarding them.
pub trait LocationProvider: Send + Sync {
    /// Whether the device's location service is switched on.
    fn service_enabled(&self) -> impl Future<Output = bool> + Send;

    /// Current permission status, without prompting.
    fn check_permission(
        &self,
    ) -> impl Future<Output = Result<PermissionStatus, PermissionError>> + Send;

    /// Prompts for permission if the platform still can.
    fn request_permission(
        &self,
    ) -> impl Future<Output = Result<PermissionStatus, PermissionError>> + Send;

    /// Fetches a single position fix.
    fn current_position(
        &self,
        settings: &LocationSettings,
    ) -> impl Future<Output = Result<Location, LocationError>> + Send;

    /// Subscribes to continuous position updates.
    ///
    /// Errors are delivered in-band; the stream keeps going after an error
    /// for as long as the platform keeps emitting.
    fn watch_position(&self, settings: &LocationSettings) -> LocationStream;
}

/// The platform location provider.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocationManager;

impl LocationProvider for LocationManager {
    async fn service_enabled(&self) -> bool {
        sys::service_enabled().await
    }

    async fn check_permission(&self) -> Result<PermissionStatus, PermissionError> {
        trailmap_permission::check(Permission::Location).await
    }

    async fn request_permission(&self) -> Result<PermissionStatus, PermissionError> {
        trailmap_permission::request(Permission::Location).await
    }

    async fn current_position(&self, settings: &LocationSettings) -> Result<Location, LocationError> {
        sys::get_location(settings).await
    }

    fn watch_position(&self, settings: &LocationSettings) -> LocationStream {
        sys::watch_location(settings.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn platform_manager_is_the_provider() {
        fn provider<P: LocationProvider + Copy + Default>() -> P {
            P::default()
        }
        let _manager: LocationManager = provider();
    }

    #[test]
    fn coordinate_rejects_out_of_range_and_non_finite() {
        assert!(Coordinate::new(90.0, 180.0).is_some());
        assert!(Coordinate::new(-90.0, -180.0).is_some());
        assert!(Coordinate::new(90.5, 0.0).is_none());
        assert!(Coordinate::new(0.0, -180.1).is_none());
        assert!(Coordinate::new(f64::NAN, 0.0).is_none());
        assert!(Coordinate::new(0.0, f64::INFINITY).is_none());
    }

    #[test]
    fn location_sample_validates_into_coordinate() {
        let sample = Location::at(23.81, 90.41, 0);
        let coordinate = sample.coordinate().unwrap();
        assert!((coordinate.latitude() - 23.81).abs() < f64::EPSILON);
        assert!((coordinate.longitude() - 90.41).abs() < f64::EPSILON);
        assert!(Location::at(123.0, 0.0, 0).coordinate().is_none());
    }

    #[test]
    fn settings_fill_missing_fields_with_defaults() {
        let settings: LocationSettings =
            serde_json::from_str(r#"{ "distance_filter_m": 20 }"#).unwrap();
        assert_eq!(settings.distance_filter_m, 20);
        assert_eq!(settings.accuracy, Accuracy::High);
        assert_eq!(settings.timeout(), Duration::from_secs(30));
    }

    #[test]
    fn default_settings_use_a_five_meter_filter() {
        assert_eq!(LocationSettings::default().distance_filter_m, 5);
    }
}
