//! Platform-specific location implementations.

#[cfg(target_os = "linux")]
mod linux;

#[cfg(target_os = "linux")]
pub(crate) use linux::{get_location, service_enabled, watch_location};

// Fallback for platforms without a location backend
#[cfg(not(target_os = "linux"))]
pub(crate) async fn service_enabled() -> bool {
    false
}

#[cfg(not(target_os = "linux"))]
pub(crate) async fn get_location(
    _settings: &crate::LocationSettings,
) -> Result<crate::Location, crate::LocationError> {
    Err(crate::LocationError::NotAvailable)
}

#[cfg(not(target_os = "linux"))]
pub(crate) fn watch_location(_settings: crate::LocationSettings) -> crate::LocationStream {
    Box::pin(futures::stream::iter([Err(
        crate::LocationError::NotAvailable,
    )]))
}
