//! Linux permission implementation.
//!
//! There is no runtime permission prompt on a traditional Linux desktop.
//! Location goes through GeoClue2, which applies its own per-application
//! policy when a client is started. Sandboxed apps (Flatpak/Snap) reach it
//! through the location portal instead, and the portal is where a refusal
//! shows up.

use log::debug;
use zbus::Connection;

use crate::{Permission, PermissionError, PermissionStatus};

const PORTAL_BUS: &str = "org.freedesktop.portal.Desktop";
const PORTAL_PATH: &str = "/org/freedesktop/portal/desktop";
const PROPERTIES_IFACE: &str = "org.freedesktop.DBus.Properties";
const LOCATION_PORTAL_IFACE: &str = "org.freedesktop.portal.Location";

pub(crate) async fn check(permission: Permission) -> Result<PermissionStatus, PermissionError> {
    match permission {
        Permission::Location => {
            if !is_sandboxed() {
                return Ok(PermissionStatus::Granted);
            }
            // Inside a sandbox the portal must exist, otherwise the manifest
            // never asked for it.
            if portal_available().await {
                Ok(PermissionStatus::NotDetermined)
            } else {
                Err(PermissionError::NotDeclared)
            }
        }
    }
}

pub(crate) async fn request(permission: Permission) -> Result<PermissionStatus, PermissionError> {
    // The portal prompts lazily when the session starts; nothing to do up front.
    match check(permission).await? {
        PermissionStatus::NotDetermined => Ok(PermissionStatus::Granted),
        status => Ok(status),
    }
}

fn is_sandboxed() -> bool {
    std::path::Path::new("/.flatpak-info").exists() || std::env::var_os("SNAP").is_some()
}

async fn portal_available() -> bool {
    let Ok(connection) = Connection::session().await else {
        return false;
    };
    let reply = connection
        .call_method(
            Some(PORTAL_BUS),
            PORTAL_PATH,
            Some(PROPERTIES_IFACE),
            "Get",
            &(LOCATION_PORTAL_IFACE, "version"),
        )
        .await;
    debug!("location portal probe: {}", if reply.is_ok() { "ok" } else { "missing" });
    reply.is_ok()
}
