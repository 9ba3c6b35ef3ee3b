//! Location permission handling.
//!
//! This crate answers one question for the rest of the workspace: may this
//! process read the device position, and if not, why not. Platform details
//! live in [`sys`]; callers only see [`PermissionStatus`] and
//! [`PermissionError`].

#![warn(missing_docs)]

/// Platform-specific implementations.
pub mod sys;

/// Types of permissions that can be requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum Permission {
    /// Access to the device position while the app is in use.
    Location,
}

/// The current status of a permission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PermissionStatus {
    /// Permission has been granted by the user.
    Granted,
    /// Permission has been denied, but may be requested again.
    Denied,
    /// Permission has been denied and the platform will not prompt again.
    DeniedForever,
    /// Permission is restricted by policy (parental controls, MDM, sandbox).
    Restricted,
    /// Permission has not been requested yet.
    NotDetermined,
}

impl PermissionStatus {
    /// Whether the status allows reading the device position.
    #[must_use]
    pub const fn is_granted(self) -> bool {
        matches!(self, Self::Granted)
    }
}

/// Errors that can occur when checking or requesting permissions.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PermissionError {
    /// The permission type is not supported on this platform.
    #[error("permission not supported on this platform")]
    NotSupported,
    /// The app never declared the capability it is asking for.
    #[error("permission not declared in the application manifest")]
    NotDeclared,
    /// An unknown error occurred.
    #[error("unknown error: {0}")]
    Unknown(String),
}

/// Check the current status of a permission without requesting it.
///
/// # Errors
/// Returns a [`PermissionError`] if the platform cannot report a status.
pub async fn check(permission: Permission) -> Result<PermissionStatus, PermissionError> {
    sys::check(permission).await
}

/// Request a permission from the user.
///
/// If the permission has already been granted or denied, this returns
/// the current status without showing a prompt.
///
/// # Errors
/// Returns a `PermissionError` if:
/// - The permission type is not supported on this platform.
/// - The application did not declare the capability.
/// - An underlying platform error occurs.
pub async fn request(permission: Permission) -> Result<PermissionStatus, PermissionError> {
    sys::request(permission).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_granted_allows_reading() {
        assert!(PermissionStatus::Granted.is_granted());
        for status in [
            PermissionStatus::Denied,
            PermissionStatus::DeniedForever,
            PermissionStatus::Restricted,
            PermissionStatus::NotDetermined,
        ] {
            assert!(!status.is_granted(), "{status:?}");
        }
    }

    #[test]
    fn not_declared_message_names_the_manifest() {
        assert!(PermissionError::NotDeclared.to_string().contains("manifest"));
    }
}
