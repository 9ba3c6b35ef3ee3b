//! The session runtime.
//!
//! [`Session::run`] is the one task that owns the [`Coordinator`]. Everything
//! else (the location subscription, searches, the route worker, the user)
//! talks to it through channels, so state is only ever mutated from that task.

use std::future::Future;
use std::pin::pin;
use std::sync::Arc;
use std::time::Duration;

use async_channel::{Receiver, Sender, bounded, unbounded};
use futures::StreamExt;
use futures::future::{self, Either};
use futures_timer::Delay;
use log::{debug, info, warn};
use tokio::task::JoinHandle;
use trailmap_geocode::{PlaceResult, PlaceSearch, SearchError};
use trailmap_location::{LocationProvider, LocationSettings};
use trailmap_routing::{RouteError, RouteService};

use crate::config::SessionConfig;
use crate::coordinator::{Coordinator, Effect, Event, RouteRequest};
use crate::gate::ensure_location_permission;
use crate::state::SessionState;

#[derive(Debug)]
enum Command {
    Apply(Event),
    Subscribe(Sender<SessionState>),
    RetryLocation,
    Close,
}

/// Cloneable remote control for a running [`Session`].
///
/// Every method returns immediately; the session applies commands in the
/// order they were sent. Dropping the last handle closes the session.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    commands: Sender<Command>,
}

impl SessionHandle {
    /// Searches for places matching `query`. Blank queries are ignored.
    pub fn search(&self, query: impl Into<String>) {
        self.send(Command::Apply(Event::SearchRequested(query.into())));
    }

    /// Makes `place` the destination and hides the result list.
    pub fn select_result(&self, place: PlaceResult) {
        self.send(Command::Apply(Event::ResultSelected(place)));
    }

    /// Turns follow mode on or off.
    pub fn set_follow_mode(&self, follow: bool) {
        self.send(Command::Apply(Event::FollowModeChanged(follow)));
    }

    /// Centers the view on the device, if its position is known.
    pub fn recenter(&self) {
        self.send(Command::Apply(Event::RecenterRequested));
    }

    /// Hides the result list.
    pub fn dismiss_results(&self) {
        self.send(Command::Apply(Event::ResultsDismissed));
    }

    /// Hides the error banner.
    pub fn dismiss_error(&self) {
        self.send(Command::Apply(Event::ErrorDismissed));
    }

    /// Drops the destination and its route.
    pub fn clear_destination(&self) {
        self.send(Command::Apply(Event::DestinationCleared));
    }

    /// Runs the permission gate and location tracking again.
    ///
    /// Does nothing while a subscription is still live. Use it after the
    /// user switched location services on or granted access.
    pub fn retry_location(&self) {
        self.send(Command::RetryLocation);
    }

    /// Returns a receiver of state snapshots.
    ///
    /// The current state is delivered first, then one snapshot per change.
    /// Only the newest unread snapshot is kept, so a slow reader skips ahead.
    /// The receiver closes when the session ends.
    #[must_use]
    pub fn subscribe(&self) -> Receiver<SessionState> {
        let (sender, receiver) = bounded(1);
        self.send(Command::Subscribe(sender));
        receiver
    }

    /// Ends the session and releases the location subscription.
    pub fn close(&self) {
        self.send(Command::Close);
    }

    fn send(&self, command: Command) {
        if let Err(err) = self.commands.try_send(command) {
            warn!("session is closed, dropping command: {err}");
        }
    }
}

/// A map screen's session: location tracking, search and routing.
#[derive(Debug)]
pub struct Session<P, S, R> {
    coordinator: Coordinator,
    provider: Arc<P>,
    search: Arc<S>,
    router: Arc<R>,
    settings: LocationSettings,
    search_timeout: Duration,
    route_timeout: Duration,
    commands: Receiver<Command>,
}

impl<P, S, R> Session<P, S, R>
where
    P: LocationProvider + 'static,
    S: PlaceSearch + 'static,
    R: RouteService + 'static,
{
    /// Creates a session and the handle that drives it.
    ///
    /// Nothing happens until [`run`](Self::run) is polled.
    pub fn new(provider: P, search: S, router: R, config: SessionConfig) -> (Self, SessionHandle) {
        let (sender, commands) = unbounded();
        let session = Self {
            coordinator: Coordinator::new(&config),
            provider: Arc::new(provider),
            search: Arc::new(search),
            router: Arc::new(router),
            settings: config.location,
            search_timeout: config.geocode.timeout(),
            route_timeout: config.routing.timeout(),
            commands,
        };
        (session, SessionHandle { commands: sender })
    }

    /// Runs the session until it is closed, returning the final state.
    ///
    /// Must be called from within a Tokio runtime; the location subscription,
    /// searches and route lookups run as spawned tasks.
    pub async fn run(mut self) -> SessionState {
        let (events, inbox) = unbounded();
        let (routes, route_queue) = unbounded();

        let mut location = tokio::spawn(track_location(
            Arc::clone(&self.provider),
            self.settings.clone(),
            events.clone(),
        ));
        let route_worker = tokio::spawn(route_worker(
            Arc::clone(&self.router),
            self.route_timeout,
            route_queue,
            events.clone(),
        ));
        let mut searches: Vec<JoinHandle<()>> = Vec::new();
        let mut subscribers: Vec<Sender<SessionState>> = Vec::new();
        let mut published = self.coordinator.state().clone();

        loop {
            let event = tokio::select! {
                command = self.commands.recv() => match command {
                    Ok(Command::Apply(event)) => event,
                    Ok(Command::Subscribe(subscriber)) => {
                        if subscriber.force_send(published.clone()).is_ok() {
                            subscribers.push(subscriber);
                        }
                        continue;
                    }
                    Ok(Command::RetryLocation) => {
                        if location.is_finished() {
                            info!("retrying location tracking");
                            location = tokio::spawn(track_location(
                                Arc::clone(&self.provider),
                                self.settings.clone(),
                                events.clone(),
                            ));
                        } else {
                            debug!("location tracking is still live, ignoring retry");
                        }
                        continue;
                    }
                    Ok(Command::Close) | Err(_) => break,
                },
                Ok(event) = inbox.recv() => event,
            };

            for effect in self.coordinator.handle(event) {
                match effect {
                    Effect::Search { generation, query } => {
                        searches.retain(|task| !task.is_finished());
                        searches.push(tokio::spawn(run_search(
                            Arc::clone(&self.search),
                            self.search_timeout,
                            generation,
                            query,
                            events.clone(),
                        )));
                    }
                    Effect::Route(request) => {
                        if routes.try_send(request).is_err() {
                            warn!("route worker is gone, dropping request");
                        }
                    }
                }
            }

            if self.coordinator.state() != &published {
                published = self.coordinator.state().clone();
                subscribers.retain(|subscriber| subscriber.force_send(published.clone()).is_ok());
            }
        }

        self.coordinator.dispose();
        location.abort();
        // Wait for the task to be dropped so the subscription is gone on return.
        let _ = location.await;
        info!("location subscription released");

        route_worker.abort();
        for search in searches {
            search.abort();
        }
        self.coordinator.into_state()
    }
}

async fn track_location<P: LocationProvider>(
    provider: Arc<P>,
    settings: LocationSettings,
    events: Sender<Event>,
) {
    let gate = ensure_location_permission(provider.as_ref()).await;
    let ready = gate.is_ok();
    if events.send(Event::PermissionResolved(gate)).await.is_err() || !ready {
        return;
    }

    let fix = provider.current_position(&settings).await;
    if events.send(Event::FirstFix(fix)).await.is_err() {
        return;
    }

    let mut updates = provider.watch_position(&settings);
    info!(
        "location subscription started (filter {} m, {:?} accuracy)",
        settings.distance_filter_m, settings.accuracy
    );
    while let Some(update) = updates.next().await {
        let event = match update {
            Ok(location) => Event::PositionUpdated(location),
            Err(err) => Event::StreamFailed(err),
        };
        if events.send(event).await.is_err() {
            return;
        }
    }
    debug!("location stream ended");
}

async fn run_search<S: PlaceSearch>(
    search: Arc<S>,
    limit: Duration,
    generation: u64,
    query: String,
    events: Sender<Event>,
) {
    let result = within(limit, search.search(&query))
        .await
        .unwrap_or_else(|| {
            warn!("search for {query:?} gave no answer within {limit:?}");
            Err(SearchError::Timeout(limit))
        });
    let _ = events
        .send(Event::SearchFinished { generation, result })
        .await;
}

async fn route_worker<R: RouteService>(
    router: Arc<R>,
    limit: Duration,
    requests: Receiver<RouteRequest>,
    events: Sender<Event>,
) {
    while let Ok(mut request) = requests.recv().await {
        // Only the newest queued request still matters
        while let Ok(newer) = requests.try_recv() {
            request = newer;
        }
        let result = within(limit, router.route(request.origin, request.destination))
            .await
            .unwrap_or_else(|| {
                warn!("route to {} gave no answer within {limit:?}", request.destination);
                Err(RouteError::Timeout(limit))
            });
        if events
            .send(Event::RouteFinished { request, result })
            .await
            .is_err()
        {
            return;
        }
    }
}

/// Resolves to `None` if `work` is still pending after `limit`.
async fn within<T>(limit: Duration, work: impl Future<Output = T>) -> Option<T> {
    let work = pin!(work);
    match future::select(work, Delay::new(limit)).await {
        Either::Left((output, _)) => Some(output),
        Either::Right(_) => None,
    }
}
