//! Platform-specific permission implementations.

#[cfg(target_os = "linux")]
mod linux;

#[cfg(target_os = "linux")]
pub(crate) use linux::{check, request};

// Fallback for platforms without a location backend (compile-time stub)
#[cfg(not(target_os = "linux"))]
pub(crate) async fn check(
    _permission: crate::Permission,
) -> Result<crate::PermissionStatus, crate::PermissionError> {
    Err(crate::PermissionError::NotSupported)
}

#[cfg(not(target_os = "linux"))]
pub(crate) async fn request(
    _permission: crate::Permission,
) -> Result<crate::PermissionStatus, crate::PermissionError> {
    Err(crate::PermissionError::NotSupported)
}
