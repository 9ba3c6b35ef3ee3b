//! Location permission gate.

use trailmap_location::{LocationProvider, PermissionError, PermissionStatus};

/// Why the session may not read the device position.
///
/// The display text is what the error banner shows.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GateError {
    /// The device's location service is switched off.
    #[error("Location services are disabled. Turn them on and try again.")]
    ServiceDisabled,
    /// The user refused, now or permanently.
    #[error("Location permission denied. Allow location access in the system settings.")]
    PermissionDenied,
    /// The app never declared the capability.
    #[error(
        "Location permission is not declared. Add the fine and coarse location permissions \
         to the application manifest and rebuild."
    )]
    NotDeclared,
    /// Anything else the platform reported.
    #[error("Could not check location permission: {0}")]
    Other(String),
}

impl From<PermissionError> for GateError {
    fn from(err: PermissionError) -> Self {
        match err {
            PermissionError::NotDeclared => Self::NotDeclared,
            err => Self::Other(err.to_string()),
        }
    }
}

/// Makes sure the provider may be read, prompting once if undecided.
///
/// # Errors
/// Returns a [`GateError`] describing the first check that failed.
pub async fn ensure_location_permission<P: LocationProvider>(provider: &P) -> Result<(), GateError> {
    if !provider.service_enabled().await {
        return Err(GateError::ServiceDisabled);
    }

    let mut status = provider.check_permission().await?;
    if status == PermissionStatus::NotDetermined {
        status = provider.request_permission().await?;
    }

    if status.is_granted() {
        Ok(())
    } else {
        Err(GateError::PermissionDenied)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use futures::executor::block_on;
    use trailmap_location::{Location, LocationError, LocationSettings, LocationStream};

    use super::*;

    struct FakeProvider {
        enabled: bool,
        status: Result<PermissionStatus, PermissionError>,
        after_request: PermissionStatus,
        requests: AtomicUsize,
    }

    impl FakeProvider {
        fn new(status: Result<PermissionStatus, PermissionError>) -> Self {
            Self {
                enabled: true,
                status,
                after_request: PermissionStatus::Granted,
                requests: AtomicUsize::new(0),
            }
        }
    }

    impl LocationProvider for FakeProvider {
        async fn service_enabled(&self) -> bool {
            self.enabled
        }

        async fn check_permission(&self) -> Result<PermissionStatus, PermissionError> {
            self.status.clone()
        }

        async fn request_permission(&self) -> Result<PermissionStatus, PermissionError> {
            self.requests.fetch_add(1, Ordering::SeqCst);
            Ok(self.after_request)
        }

        async fn current_position(&self, _: &LocationSettings) -> Result<Location, LocationError> {
            Err(LocationError::NotAvailable)
        }

        fn watch_position(&self, _: &LocationSettings) -> LocationStream {
            Box::pin(futures::stream::empty())
        }
    }

    #[test]
    fn disabled_service_wins_over_everything() {
        let provider = FakeProvider {
            enabled: false,
            ..FakeProvider::new(Ok(PermissionStatus::Granted))
        };
        assert_eq!(
            block_on(ensure_location_permission(&provider)),
            Err(GateError::ServiceDisabled)
        );
    }

    #[test]
    fn granted_passes_without_prompting() {
        let provider = FakeProvider::new(Ok(PermissionStatus::Granted));
        assert_eq!(block_on(ensure_location_permission(&provider)), Ok(()));
        assert_eq!(provider.requests.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn undetermined_prompts_once() {
        let provider = FakeProvider::new(Ok(PermissionStatus::NotDetermined));
        assert_eq!(block_on(ensure_location_permission(&provider)), Ok(()));
        assert_eq!(provider.requests.load(Ordering::SeqCst), 1);

        let refused = FakeProvider {
            after_request: PermissionStatus::Denied,
            ..FakeProvider::new(Ok(PermissionStatus::NotDetermined))
        };
        assert_eq!(
            block_on(ensure_location_permission(&refused)),
            Err(GateError::PermissionDenied)
        );
    }

    #[test]
    fn every_refusal_is_permission_denied() {
        for status in [
            PermissionStatus::Denied,
            PermissionStatus::DeniedForever,
            PermissionStatus::Restricted,
        ] {
            let provider = FakeProvider::new(Ok(status));
            assert_eq!(
                block_on(ensure_location_permission(&provider)),
                Err(GateError::PermissionDenied)
            );
            assert_eq!(provider.requests.load(Ordering::SeqCst), 0);
        }
    }

    #[test]
    fn undeclared_permission_is_a_configuration_error() {
        let provider = FakeProvider::new(Err(PermissionError::NotDeclared));
        let err = block_on(ensure_location_permission(&provider)).unwrap_err();
        assert_eq!(err, GateError::NotDeclared);
        assert!(err.to_string().contains("fine and coarse location"));
    }

    #[test]
    fn other_failures_embed_the_cause() {
        let provider = FakeProvider::new(Err(PermissionError::Unknown("bus hung up".into())));
        let err = block_on(ensure_location_permission(&provider)).unwrap_err();
        assert!(err.to_string().contains("bus hung up"));
    }
}
