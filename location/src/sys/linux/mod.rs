//! Linux location implementation using the GeoClue2 D-Bus service.
//!
//! Each fetch or subscription gets its own GeoClue client on its own system
//! bus connection. GeoClue stops a client when the owning connection goes
//! away, so dropping the stream is enough to end a subscription.

use futures::future::{self, Either};
use futures::{StreamExt, stream};
use log::{debug, info};
use zbus::zvariant::{OwnedObjectPath, OwnedValue, Value};
use zbus::{Connection, Proxy};

use crate::{Accuracy, Location, LocationError, LocationSettings, LocationStream};

const GEOCLUE_BUS: &str = "org.freedesktop.GeoClue2";
const MANAGER_PATH: &str = "/org/freedesktop/GeoClue2/Manager";
const MANAGER_IFACE: &str = "org.freedesktop.GeoClue2.Manager";
const CLIENT_IFACE: &str = "org.freedesktop.GeoClue2.Client";
const LOCATION_IFACE: &str = "org.freedesktop.GeoClue2.Location";
const PROPERTIES_IFACE: &str = "org.freedesktop.DBus.Properties";
const PEER_IFACE: &str = "org.freedesktop.DBus.Peer";
const DESKTOP_ID: &str = "trailmap";

pub(crate) async fn service_enabled() -> bool {
    let Ok(connection) = Connection::system().await else {
        return false;
    };
    connection
        .call_method(Some(GEOCLUE_BUS), MANAGER_PATH, Some(PEER_IFACE), "Ping", &())
        .await
        .is_ok()
}

pub(crate) async fn get_location(settings: &LocationSettings) -> Result<Location, LocationError> {
    let mut updates = open_updates(settings).await?;
    let first = updates.next();
    let timeout = futures_timer::Delay::new(settings.timeout());

    match future::select(first, timeout).await {
        Either::Left((Some(location), _)) => location,
        Either::Left((None, _)) => Err(LocationError::NotAvailable),
        Either::Right(_) => Err(LocationError::Timeout),
    }
}

pub(crate) fn watch_location(settings: LocationSettings) -> LocationStream {
    let opened = async move {
        match open_updates(&settings).await {
            Ok(updates) => {
                info!(
                    "GeoClue subscription started (threshold {} m)",
                    settings.distance_filter_m
                );
                updates
            }
            Err(e) => Box::pin(stream::iter([Err(e)])) as LocationStream,
        }
    };
    Box::pin(stream::once(opened).flatten())
}

/// GeoClue accuracy levels: 4 = city, 6 = street, 8 = exact.
const fn accuracy_level(accuracy: Accuracy) -> u32 {
    match accuracy {
        Accuracy::Low => 4,
        Accuracy::Balanced => 6,
        Accuracy::High => 8,
    }
}

async fn open_updates(settings: &LocationSettings) -> Result<LocationStream, LocationError> {
    let connection = Connection::system()
        .await
        .map_err(|e| LocationError::Unknown(format!("D-Bus connection failed: {e}")))?;

    // Call GeoClue2 Manager to get a client
    let (client_path,): (OwnedObjectPath,) = connection
        .call_method(
            Some(GEOCLUE_BUS),
            MANAGER_PATH,
            Some(MANAGER_IFACE),
            "GetClient",
            &(),
        )
        .await
        .map_err(|_| LocationError::ServiceDisabled)?
        .body()
        .deserialize()
        .map_err(|e| LocationError::Unknown(format!("Failed to parse response: {e}")))?;

    // DesktopId is required before Start
    set_client_property(&connection, &client_path, "DesktopId", Value::from(DESKTOP_ID)).await?;
    set_client_property(
        &connection,
        &client_path,
        "DistanceThreshold",
        Value::from(settings.distance_filter_m),
    )
    .await?;
    set_client_property(
        &connection,
        &client_path,
        "RequestedAccuracyLevel",
        Value::from(accuracy_level(settings.accuracy)),
    )
    .await?;

    // Subscribe before starting so the first fix is not missed
    let proxy = Proxy::new(
        &connection,
        GEOCLUE_BUS,
        client_path.as_str().to_owned(),
        CLIENT_IFACE,
    )
    .await
    .map_err(|e| LocationError::Unknown(format!("Failed to create client proxy: {e}")))?;
    let signals = proxy
        .receive_signal("LocationUpdated")
        .await
        .map_err(|e| LocationError::Unknown(format!("Failed to subscribe: {e}")))?;

    connection
        .call_method(
            Some(GEOCLUE_BUS),
            client_path.as_str(),
            Some(CLIENT_IFACE),
            "Start",
            &(),
        )
        .await
        .map_err(|e| match e {
            zbus::Error::MethodError(name, _, _) if name.as_str().ends_with("AccessDenied") => {
                LocationError::PermissionDenied
            }
            e => LocationError::Unknown(format!("Failed to start GeoClue client: {e}")),
        })?;
    debug!("GeoClue client {} started", client_path.as_str());

    let updates = signals.then(move |message| {
        let connection = connection.clone();
        async move {
            let (_old, new): (OwnedObjectPath, OwnedObjectPath) =
                message.body().deserialize().map_err(|e| {
                    LocationError::Unknown(format!("Failed to parse location update: {e}"))
                })?;
            read_location(&connection, &new).await
        }
    });
    Ok(Box::pin(updates))
}

async fn set_client_property(
    connection: &Connection,
    client_path: &OwnedObjectPath,
    name: &str,
    value: Value<'_>,
) -> Result<(), LocationError> {
    connection
        .call_method(
            Some(GEOCLUE_BUS),
            client_path.as_str(),
            Some(PROPERTIES_IFACE),
            "Set",
            &(CLIENT_IFACE, name, value),
        )
        .await
        .map_err(|e| LocationError::Unknown(format!("Failed to set {name}: {e}")))?;
    Ok(())
}

async fn location_property(
    connection: &Connection,
    location_path: &OwnedObjectPath,
    name: &str,
) -> Result<f64, zbus::Error> {
    let reply: OwnedValue = connection
        .call_method(
            Some(GEOCLUE_BUS),
            location_path.as_str(),
            Some(PROPERTIES_IFACE),
            "Get",
            &(LOCATION_IFACE, name),
        )
        .await?
        .body()
        .deserialize()?;
    Ok(f64::try_from(reply)?)
}

async fn read_location(
    connection: &Connection,
    location_path: &OwnedObjectPath,
) -> Result<Location, LocationError> {
    let latitude = location_property(connection, location_path, "Latitude")
        .await
        .map_err(|e| LocationError::Unknown(format!("Failed to get latitude: {e}")))?;
    let longitude = location_property(connection, location_path, "Longitude")
        .await
        .map_err(|e| LocationError::Unknown(format!("Failed to get longitude: {e}")))?;
    // GeoClue reports -DBL_MAX when altitude is unknown
    let altitude = location_property(connection, location_path, "Altitude")
        .await
        .ok()
        .filter(|altitude| *altitude > f64::MIN);
    let accuracy = location_property(connection, location_path, "Accuracy")
        .await
        .ok();

    Ok(Location {
        latitude,
        longitude,
        altitude,
        horizontal_accuracy: accuracy,
        vertical_accuracy: None,
        timestamp: timestamp_now(),
    })
}

fn timestamp_now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}
