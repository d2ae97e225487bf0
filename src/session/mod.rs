//! Place lookup session
//!
//! Resolves one initial place from the earliest known coordinate, then lets
//! the user override it. The selected place is always replaced whole.
//!
//! An automatic lookup can finish after a manual pick. With
//! `SelectionPolicy::LastWriteWins` (the default) whichever write lands last
//! is kept; `ManualWins` makes any manual pick final.

use crate::coord::Coordinate;
use crate::error::{Error, Result};
use crate::geo::GeocodingService;
use crate::location::{LocationSource, Subscription};
use crate::place::PlaceRecord;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Who wins when an automatic lookup and a manual pick race
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionPolicy {
    /// The write that completes last is kept
    #[default]
    LastWriteWins,
    /// Once the user picks a place, automatic results are dropped
    ManualWins,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

struct SessionInner<G> {
    location: LocationSource,
    geocoder: Arc<G>,
    policy: SelectionPolicy,
    selected: watch::Sender<Option<PlaceRecord>>,
    advisory: Mutex<Option<String>>,
    started: AtomicBool,
    auto_claimed: AtomicBool,
    manual_selected: AtomicBool,
    subscription: Mutex<Option<Subscription>>,
    resolution: Mutex<Option<JoinHandle<()>>>,
}

impl<G: GeocodingService + 'static> SessionInner<G> {
    /// Claim the single automatic lookup for `coordinate`
    fn trigger(self: &Arc<Self>, coordinate: Coordinate, runtime: &Handle) {
        if self.auto_claimed.swap(true, Ordering::SeqCst) {
            return;
        }
        // only the first fix matters; stop listening
        drop(lock(&self.subscription).take());

        debug!("Resolving initial place for {}", coordinate);
        let inner = Arc::clone(self);
        let task = runtime.spawn(async move { inner.resolve(coordinate).await });
        *lock(&self.resolution) = Some(task);
    }

    async fn resolve(&self, coordinate: Coordinate) {
        match self.geocoder.resolve(coordinate).await {
            Ok(place) => {
                self.apply_automatic(place);
            }
            Err(e) => {
                warn!("Geocoding {} failed: {}", coordinate, e);
                *lock(&self.advisory) = Some(e.to_string());
            }
        }
    }

    /// Store an automatic result unless policy says a manual pick is final
    ///
    /// The flag check and the write both happen under the channel's write
    /// lock, which `select_manually` also takes.
    fn apply_automatic(&self, place: PlaceRecord) -> bool {
        let manual_wins = self.policy == SelectionPolicy::ManualWins;
        let applied = self.selected.send_if_modified(|slot| {
            if manual_wins && self.manual_selected.load(Ordering::SeqCst) {
                return false;
            }
            *slot = Some(place.clone());
            true
        });
        if applied {
            info!("Initial place resolved: {}", place.name());
        } else {
            debug!("Keeping manual selection over automatic result {}", place.name());
        }
        applied
    }

    fn apply_manual(&self, place: PlaceRecord) {
        info!("Place selected: {}", place.name());
        self.selected.send_modify(|slot| {
            self.manual_selected.store(true, Ordering::SeqCst);
            *slot = Some(place);
        });
    }

    fn dispose(&self) {
        drop(lock(&self.subscription).take());
        if let Some(task) = lock(&self.resolution).take() {
            task.abort();
        }
    }
}

/// Owns the currently selected place for one interaction
pub struct PlaceLookupSession<G: GeocodingService + 'static> {
    inner: Arc<SessionInner<G>>,
}

impl<G: GeocodingService + 'static> PlaceLookupSession<G> {
    pub fn new(location: LocationSource, geocoder: Arc<G>) -> Self {
        Self::with_policy(location, geocoder, SelectionPolicy::default())
    }

    pub fn with_policy(
        location: LocationSource,
        geocoder: Arc<G>,
        policy: SelectionPolicy,
    ) -> Self {
        let (selected, _) = watch::channel(None);
        Self {
            inner: Arc::new(SessionInner {
                location,
                geocoder,
                policy,
                selected,
                advisory: Mutex::new(None),
                started: AtomicBool::new(false),
                auto_claimed: AtomicBool::new(false),
                manual_selected: AtomicBool::new(false),
                subscription: Mutex::new(None),
                resolution: Mutex::new(None),
            }),
        }
    }

    /// Begin the automatic lookup
    ///
    /// Uses the already-known coordinate if there is one, otherwise the first
    /// fix delivered afterwards. Calling it again has no effect. Must be
    /// called from within a Tokio runtime.
    pub fn start(&self) -> Result<()> {
        let runtime = Handle::try_current().map_err(|e| Error::Runtime(e.to_string()))?;
        if self.inner.started.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        let weak: Weak<SessionInner<G>> = Arc::downgrade(&self.inner);
        let handler_runtime = runtime.clone();
        let subscription = self.inner.location.on_update(move |coordinate| {
            if let Some(inner) = weak.upgrade() {
                inner.trigger(*coordinate, &handler_runtime);
            }
        });
        *lock(&self.inner.subscription) = Some(subscription);

        // a fix may have claimed the lookup before the subscription was stored
        if self.inner.auto_claimed.load(Ordering::SeqCst) {
            drop(lock(&self.inner.subscription).take());
        } else if let Some(coordinate) = self.inner.location.current_coordinate() {
            self.inner.trigger(coordinate, &runtime);
        }

        Ok(())
    }

    /// Replace the selected place with the user's pick
    pub fn select_manually(&self, place: PlaceRecord) {
        self.inner.apply_manual(place);
    }

    pub fn selected_place(&self) -> Option<PlaceRecord> {
        self.inner.selected.borrow().clone()
    }

    /// Observe selected place changes
    pub fn subscribe(&self) -> watch::Receiver<Option<PlaceRecord>> {
        self.inner.selected.subscribe()
    }

    /// Message from the last failed automatic lookup
    pub fn advisory(&self) -> Option<String> {
        lock(&self.inner.advisory).clone()
    }

    pub fn policy(&self) -> SelectionPolicy {
        self.inner.policy
    }

    pub fn location(&self) -> &LocationSource {
        &self.inner.location
    }

    /// Stop listening for fixes and abandon an unfinished automatic lookup
    pub fn dispose(&self) {
        self.inner.dispose();
    }
}

impl<G: GeocodingService + 'static> Drop for PlaceLookupSession<G> {
    fn drop(&mut self) {
        self.inner.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::mock::{place, MockGeocoder, Outcome};
    use crate::location::tests::{granted, scripted};
    use crate::location::AuthorizationState;
    use std::time::Duration;

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_known_coordinate_resolves_once() {
        let (source, _provider) = granted();
        source.feed().deliver(&[Coordinate::new(37.0, -122.0)]);

        let geocoder = Arc::new(MockGeocoder::new(Outcome::Ok(place("Home"))));
        let session = PlaceLookupSession::new(source.clone(), geocoder.clone());
        session.start().unwrap();

        source.feed().deliver(&[Coordinate::new(38.0, -122.0)]);
        source.feed().deliver(&[Coordinate::new(39.0, -122.0)]);
        settle().await;

        assert_eq!(geocoder.calls(), vec![Coordinate::new(37.0, -122.0)]);
        assert_eq!(session.selected_place().unwrap().name(), "Home");
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_pushed_coordinate_resolves_once() {
        let (source, _provider) = granted();
        let geocoder = Arc::new(MockGeocoder::new(Outcome::Ok(place("Park"))));
        let session = PlaceLookupSession::new(source.clone(), geocoder.clone());
        session.start().unwrap();
        settle().await;
        assert!(geocoder.calls().is_empty());

        for lat in [10.0, 11.0, 12.0, 13.0] {
            source.feed().deliver(&[Coordinate::new(lat, 0.0)]);
        }
        settle().await;

        assert_eq!(geocoder.calls(), vec![Coordinate::new(10.0, 0.0)]);
        assert_eq!(session.selected_place().unwrap().name(), "Park");
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_twice_is_noop() {
        let (source, _provider) = granted();
        source.feed().deliver(&[Coordinate::new(1.0, 1.0)]);
        let geocoder = Arc::new(MockGeocoder::new(Outcome::Ok(place("Home"))));
        let session = PlaceLookupSession::new(source, geocoder.clone());
        session.start().unwrap();
        session.start().unwrap();
        settle().await;
        assert_eq!(geocoder.calls().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_geocode_failure_leaves_selection_empty() {
        let (source, _provider) = granted();
        source.feed().deliver(&[Coordinate::new(37.0, -122.0)]);
        let geocoder = Arc::new(MockGeocoder::new(Outcome::Fail("upstream 503".to_string())));
        let session = PlaceLookupSession::new(source, geocoder);
        session.start().unwrap();
        settle().await;

        assert!(session.selected_place().is_none());
        assert_eq!(session.advisory().as_deref(), Some("Provider error: upstream 503"));

        session.select_manually(place("Cafe A"));
        assert_eq!(session.selected_place().unwrap().name(), "Cafe A");
    }

    #[tokio::test(start_paused = true)]
    async fn test_geocode_not_found() {
        let (source, _provider) = granted();
        source.feed().deliver(&[Coordinate::new(0.0, 0.0)]);
        let geocoder = Arc::new(MockGeocoder::new(Outcome::NotFound));
        let session = PlaceLookupSession::new(source, geocoder);
        session.start().unwrap();
        settle().await;
        assert!(session.selected_place().is_none());
        assert!(session.advisory().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_late_automatic_result_overwrites_by_default() {
        let (source, _provider) = granted();
        source.feed().deliver(&[Coordinate::new(1.0, 1.0)]);
        let geocoder = Arc::new(
            MockGeocoder::new(Outcome::Ok(place("Auto"))).with_delay(Duration::from_millis(500)),
        );
        let session = PlaceLookupSession::new(source, geocoder);
        session.start().unwrap();

        tokio::time::sleep(Duration::from_millis(100)).await;
        session.select_manually(place("Manual"));
        tokio::time::sleep(Duration::from_millis(500)).await;

        assert_eq!(session.selected_place().unwrap().name(), "Auto");
    }

    #[tokio::test(start_paused = true)]
    async fn test_manual_wins_policy() {
        let (source, _provider) = granted();
        source.feed().deliver(&[Coordinate::new(1.0, 1.0)]);
        let geocoder = Arc::new(
            MockGeocoder::new(Outcome::Ok(place("Auto"))).with_delay(Duration::from_millis(500)),
        );
        let session =
            PlaceLookupSession::with_policy(source, geocoder, SelectionPolicy::ManualWins);
        session.start().unwrap();

        tokio::time::sleep(Duration::from_millis(100)).await;
        session.select_manually(place("Manual"));
        tokio::time::sleep(Duration::from_millis(500)).await;

        assert_eq!(session.selected_place().unwrap().name(), "Manual");
    }

    #[tokio::test(start_paused = true)]
    async fn test_manual_selection_after_denial() {
        let (source, _provider) = scripted();
        source.start();
        source.feed().authorization_changed(AuthorizationState::Denied);

        let geocoder = Arc::new(MockGeocoder::new(Outcome::Ok(place("Auto"))));
        let session = PlaceLookupSession::new(source.clone(), geocoder.clone());
        session.start().unwrap();
        source.feed().deliver(&[Coordinate::new(1.0, 1.0)]);
        settle().await;

        assert!(geocoder.calls().is_empty());
        assert_eq!(source.last_error(), Some(Error::PermissionDenied.to_string()));

        session.select_manually(place("Cafe B"));
        assert_eq!(session.selected_place().unwrap().name(), "Cafe B");
    }

    #[tokio::test(start_paused = true)]
    async fn test_dispose_abandons_pending_lookup() {
        let (source, _provider) = granted();
        source.feed().deliver(&[Coordinate::new(1.0, 1.0)]);
        let geocoder = Arc::new(
            MockGeocoder::new(Outcome::Ok(place("Auto"))).with_delay(Duration::from_millis(200)),
        );
        let session = PlaceLookupSession::new(source, geocoder);
        session.start().unwrap();
        settle().await;
        session.dispose();
        tokio::time::sleep(Duration::from_millis(500)).await;

        assert!(session.selected_place().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_subscribers_see_each_replacement() {
        let (source, _provider) = granted();
        let geocoder = Arc::new(MockGeocoder::new(Outcome::NotFound));
        let session = PlaceLookupSession::new(source, geocoder);
        let mut rx = session.subscribe();

        session.select_manually(place("First"));
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow_and_update().as_ref().unwrap().name(), "First");

        session.select_manually(place("Second"));
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow().as_ref().unwrap().name(), "Second");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_manual_pick_is_final_under_concurrent_automatic_writes() {
        for round in 0..200 {
            let (source, _provider) = granted();
            let geocoder = Arc::new(MockGeocoder::new(Outcome::NotFound));
            let session =
                PlaceLookupSession::with_policy(source, geocoder, SelectionPolicy::ManualWins);
            let inner = Arc::clone(&session.inner);

            let auto = tokio::spawn(async move {
                let mut applied_after_manual = false;
                for _ in 0..50 {
                    let manual_seen = inner.manual_selected.load(Ordering::SeqCst);
                    if inner.apply_automatic(place("Auto")) && manual_seen {
                        applied_after_manual = true;
                    }
                    tokio::task::yield_now().await;
                }
                applied_after_manual
            });
            tokio::task::yield_now().await;
            session.select_manually(place("Manual"));

            assert!(!auto.await.unwrap(), "round {}", round);
            assert_eq!(session.selected_place().unwrap().name(), "Manual", "round {}", round);
        }
    }

    #[test]
    fn test_automatic_result_after_manual_pick_is_rejected() {
        let (source, _provider) = granted();
        let geocoder = Arc::new(MockGeocoder::new(Outcome::NotFound));
        let session =
            PlaceLookupSession::with_policy(source, geocoder, SelectionPolicy::ManualWins);
        let mut rx = session.subscribe();

        assert!(session.inner.apply_automatic(place("Auto")));
        session.select_manually(place("Manual"));
        rx.borrow_and_update();

        assert!(!session.inner.apply_automatic(place("Late Auto")));
        assert!(!rx.has_changed().unwrap());
        assert_eq!(session.selected_place().unwrap().name(), "Manual");
    }

    #[test]
    fn test_start_outside_runtime_fails() {
        let (source, _provider) = granted();
        let geocoder = Arc::new(MockGeocoder::new(Outcome::NotFound));
        let session = PlaceLookupSession::new(source, geocoder);
        assert!(matches!(session.start(), Err(Error::Runtime(_))));
    }
}
