//! Device location
//!
//! `LocationSource` owns the single current coordinate and the authorization
//! state. A platform `LocationProvider` reports fixes, authorization changes
//! and failures back through a `LocationFeed`; consumers register typed
//! handlers and get a `Subscription` that unregisters on drop.
//!
//! Handlers run synchronously on the delivering thread, in arrival order.
//! Deliveries from different threads are serialized, so update handlers see
//! fixes in the same order `current_coordinate` records them. Apart from the
//! delivery lock no internal lock is held while a handler or the provider
//! runs, so either may call back into the source. An update handler must not
//! deliver a fix itself.

pub mod providers;

use crate::config::defaults::DEFAULT_SEARCH_RADIUS;
use crate::coord::{BoundingRegion, Coordinate};
use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use tracing::{debug, info, warn};

/// Location permission state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthorizationState {
    #[default]
    Undetermined,
    Granted,
    Denied,
    /// Blocked by policy; handled like `Denied`
    Restricted,
}

impl AuthorizationState {
    pub fn is_granted(self) -> bool {
        self == Self::Granted
    }

    pub fn is_refused(self) -> bool {
        matches!(self, Self::Denied | Self::Restricted)
    }
}

impl std::fmt::Display for AuthorizationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Undetermined => write!(f, "undetermined"),
            Self::Granted => write!(f, "granted"),
            Self::Denied => write!(f, "denied"),
            Self::Restricted => write!(f, "restricted"),
        }
    }
}

/// Platform side of location: permission prompts and fix delivery
///
/// Implementations report results through the `LocationFeed` they are
/// handed, either synchronously or later from their own task.
pub trait LocationProvider: Send + Sync {
    /// Ask for permission; the outcome arrives via `feed.authorization_changed`
    fn request_authorization(&self, feed: LocationFeed);

    /// Begin delivering fixes via `feed.deliver`
    fn start_updates(&self, feed: LocationFeed);

    /// Stop delivering fixes
    fn stop_updates(&self);
}

type Handler<T> = Arc<dyn Fn(&T) + Send + Sync>;

struct Registry<T: ?Sized> {
    next_id: u64,
    handlers: Vec<(u64, Handler<T>)>,
}

impl<T: ?Sized> Registry<T> {
    fn new() -> Self {
        Self {
            next_id: 0,
            handlers: Vec::new(),
        }
    }

    fn add(&mut self, handler: Handler<T>) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.handlers.push((id, handler));
        id
    }

    fn remove(&mut self, id: u64) {
        self.handlers.retain(|(hid, _)| *hid != id);
    }

    fn snapshot(&self) -> Vec<Handler<T>> {
        self.handlers.iter().map(|(_, h)| h.clone()).collect()
    }
}

#[derive(Debug, Default)]
struct SourceState {
    current: Option<Coordinate>,
    authorization: AuthorizationState,
    started: bool,
    updating: bool,
    single_fix: bool,
    last_error: Option<String>,
}

struct Shared {
    provider: Arc<dyn LocationProvider>,
    state: Mutex<SourceState>,
    delivery: Mutex<()>,
    updates: Mutex<Registry<Coordinate>>,
    authorization: Mutex<Registry<AuthorizationState>>,
    errors: Mutex<Registry<Error>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl Shared {
    fn feed(self: &Arc<Self>) -> LocationFeed {
        LocationFeed {
            shared: Arc::downgrade(self),
        }
    }

    fn dispatch<T: ?Sized>(registry: &Mutex<Registry<T>>, value: &T) {
        let handlers = lock(registry).snapshot();
        for handler in handlers {
            handler(value);
        }
    }

    fn begin_updates(self: &Arc<Self>) {
        let should_start = {
            let mut state = lock(&self.state);
            let go = state.started && !state.updating && state.authorization.is_granted();
            if go {
                state.updating = true;
            }
            go
        };
        if should_start {
            debug!("Starting location updates");
            self.provider.start_updates(self.feed());
        }
    }

    fn refuse(self: &Arc<Self>) {
        {
            let mut state = lock(&self.state);
            state.updating = false;
            state.last_error = Some(Error::PermissionDenied.to_string());
        }
        warn!("Location authorization denied");
        self.provider.stop_updates();
        Self::dispatch(&self.errors, &Error::PermissionDenied);
    }

    fn authorization_changed(self: &Arc<Self>, new_state: AuthorizationState) {
        let started = {
            let mut state = lock(&self.state);
            state.authorization = new_state;
            state.started
        };
        Self::dispatch(&self.authorization, &new_state);

        match new_state {
            AuthorizationState::Granted => {
                info!("Location authorization granted");
                self.begin_updates();
            }
            AuthorizationState::Denied | AuthorizationState::Restricted => self.refuse(),
            AuthorizationState::Undetermined => {
                debug!("Location authorization not determined yet");
                if started {
                    self.provider.request_authorization(self.feed());
                }
            }
        }
    }

    fn deliver(self: &Arc<Self>, fixes: &[Coordinate]) {
        let Some(latest) = fixes.last().copied() else {
            return;
        };

        let _delivering = lock(&self.delivery);
        let stop_after = {
            let mut state = lock(&self.state);
            if !state.updating {
                debug!("Dropping fix {} delivered while updates are off", latest);
                return;
            }
            state.current = Some(latest);
            if state.single_fix {
                state.updating = false;
            }
            state.single_fix
        };

        info!("Location updated to {}", latest);
        Self::dispatch(&self.updates, &latest);

        if stop_after {
            debug!("Single fix received, stopping location updates");
            self.provider.stop_updates();
        }
    }

    fn failed(&self, message: String) {
        warn!("Location provider error: {}", message);
        lock(&self.state).last_error = Some(message.clone());
        Self::dispatch(&self.errors, &Error::Provider(message));
    }
}

/// Handle a `LocationProvider` uses to report back to its source
///
/// Holds only a weak reference; reports after the source is dropped are
/// ignored.
#[derive(Clone)]
pub struct LocationFeed {
    shared: Weak<Shared>,
}

impl LocationFeed {
    /// Report one or more fixes; only the last one is kept
    pub fn deliver(&self, fixes: &[Coordinate]) {
        if let Some(shared) = self.shared.upgrade() {
            shared.deliver(fixes);
        }
    }

    /// Report a permission state change
    pub fn authorization_changed(&self, state: AuthorizationState) {
        if let Some(shared) = self.shared.upgrade() {
            shared.authorization_changed(state);
        }
    }

    /// Report a transient failure such as signal loss; updates continue
    pub fn failed(&self, message: impl Into<String>) {
        if let Some(shared) = self.shared.upgrade() {
            shared.failed(message.into());
        }
    }

    /// True once the source has been dropped
    pub fn is_closed(&self) -> bool {
        self.shared.strong_count() == 0
    }
}

/// Registration returned by the `on_*` methods; unregisters on drop
#[must_use = "dropping a Subscription unregisters its handler"]
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    /// Unregister now
    pub fn cancel(mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.cancel.is_some())
            .finish()
    }
}

/// The device's location: latest fix, permission state and notifications
///
/// Cloning yields another handle to the same source.
#[derive(Clone)]
pub struct LocationSource {
    shared: Arc<Shared>,
}

impl LocationSource {
    /// Create a source backed by the given provider; call `start` to begin
    pub fn new(provider: impl LocationProvider + 'static) -> Self {
        Self::from_arc(Arc::new(provider))
    }

    pub fn from_arc(provider: Arc<dyn LocationProvider>) -> Self {
        Self {
            shared: Arc::new(Shared {
                provider,
                state: Mutex::new(SourceState::default()),
                delivery: Mutex::new(()),
                updates: Mutex::new(Registry::new()),
                authorization: Mutex::new(Registry::new()),
                errors: Mutex::new(Registry::new()),
            }),
        }
    }

    /// Stop updates automatically after the first fix
    pub fn with_single_fix(self, single_fix: bool) -> Self {
        lock(&self.shared.state).single_fix = single_fix;
        self
    }

    /// Request permission and, once granted, start receiving fixes
    pub fn start(&self) {
        let authorization = {
            let mut state = lock(&self.shared.state);
            state.started = true;
            state.authorization
        };

        match authorization {
            AuthorizationState::Undetermined => {
                debug!("Requesting location authorization");
                self.shared.provider.request_authorization(self.feed());
            }
            AuthorizationState::Granted => self.shared.begin_updates(),
            AuthorizationState::Denied | AuthorizationState::Restricted => self.shared.refuse(),
        }
    }

    /// Stop receiving fixes; the last known coordinate is kept
    pub fn stop(&self) {
        let was_updating = {
            let mut state = lock(&self.shared.state);
            state.started = false;
            std::mem::replace(&mut state.updating, false)
        };
        if was_updating {
            debug!("Stopping location updates");
            self.shared.provider.stop_updates();
        }
    }

    /// Feed handle for driving this source from platform glue
    pub fn feed(&self) -> LocationFeed {
        self.shared.feed()
    }

    /// Latest delivered fix, if any
    pub fn current_coordinate(&self) -> Option<Coordinate> {
        lock(&self.shared.state).current
    }

    pub fn authorization(&self) -> AuthorizationState {
        lock(&self.shared.state).authorization
    }

    pub fn is_updating(&self) -> bool {
        lock(&self.shared.state).updating
    }

    /// Advisory message from the most recent failure
    pub fn last_error(&self) -> Option<String> {
        lock(&self.shared.state).last_error.clone()
    }

    /// Region of `radius_meters` around the current fix
    ///
    /// `None` when no fix is known yet or the radius is not a valid distance.
    pub fn region_around(&self, radius_meters: f64) -> Option<BoundingRegion> {
        let center = self.current_coordinate()?;
        match BoundingRegion::around(center, radius_meters) {
            Ok(region) => Some(region),
            Err(e) => {
                warn!("{}", e);
                None
            }
        }
    }

    /// Region of the default search radius around the current fix
    pub fn default_region(&self) -> Option<BoundingRegion> {
        self.region_around(DEFAULT_SEARCH_RADIUS)
    }

    /// Call `handler` with every new fix
    pub fn on_update<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&Coordinate) + Send + Sync + 'static,
    {
        let id = lock(&self.shared.updates).add(Arc::new(handler));
        self.subscription(move |shared| lock(&shared.updates).remove(id))
    }

    /// Call `handler` with every authorization change
    pub fn on_authorization_change<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&AuthorizationState) + Send + Sync + 'static,
    {
        let id = lock(&self.shared.authorization).add(Arc::new(handler));
        self.subscription(move |shared| lock(&shared.authorization).remove(id))
    }

    /// Call `handler` with permission refusals and provider failures
    pub fn on_error<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&Error) + Send + Sync + 'static,
    {
        let id = lock(&self.shared.errors).add(Arc::new(handler));
        self.subscription(move |shared| lock(&shared.errors).remove(id))
    }

    fn subscription<F>(&self, remove: F) -> Subscription
    where
        F: FnOnce(&Shared) + Send + Sync + 'static,
    {
        let weak = Arc::downgrade(&self.shared);
        Subscription {
            cancel: Some(Box::new(move || {
                if let Some(shared) = weak.upgrade() {
                    remove(&shared);
                }
            })),
        }
    }
}

impl std::fmt::Debug for LocationSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = lock(&self.shared.state);
        f.debug_struct("LocationSource")
            .field("current", &state.current)
            .field("authorization", &state.authorization)
            .field("updating", &state.updating)
            .finish()
    }
}
