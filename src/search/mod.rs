//! Debounced place search
//!
//! Turns a fast stream of query edits into at most one in-flight search.
//! Each edit creates a fresh `SearchQuery`; the controller remembers the
//! current one by identity (`Arc::ptr_eq`), so two edits with the same text
//! are still different queries. Every resumption point (after the settle
//! delay, after the provider returns) checks that its query is still current
//! before touching visible state.

use crate::config::defaults::DEFAULT_SETTLE_DELAY_MS;
use crate::coord::BoundingRegion;
use crate::error::{Error, Result};
use crate::geo::{SearchQuery, SearchService};
use crate::location::LocationSource;
use crate::place::PlaceRecord;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Where the controller is in its debounce cycle
#[derive(Debug, Clone)]
pub enum SearchPhase {
    Idle,
    /// Waiting for the settle delay to pass
    Pending {
        query: Arc<SearchQuery>,
        deadline: Instant,
    },
    /// The provider has been called and not yet answered
    InFlight { query: Arc<SearchQuery> },
    /// The last query finished; results (possibly empty) are published
    Completed,
}

impl SearchPhase {
    fn query(&self) -> Option<&Arc<SearchQuery>> {
        match self {
            Self::Pending { query, .. } | Self::InFlight { query } => Some(query),
            Self::Idle | Self::Completed => None,
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending { .. })
    }

    pub fn is_in_flight(&self) -> bool {
        matches!(self, Self::InFlight { .. })
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

struct ControllerState {
    phase: SearchPhase,
    text: String,
    region: BoundingRegion,
    task: Option<JoinHandle<()>>,
    advisory: Option<String>,
    disposed: bool,
}

impl ControllerState {
    fn is_current(&self, query: &Arc<SearchQuery>) -> bool {
        self.phase.query().is_some_and(|q| Arc::ptr_eq(q, query))
    }

    fn cancel_outstanding(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
        if let Some(query) = self.phase.query() {
            debug!("Cancelling search for '{}'", query.text);
        }
        self.phase = SearchPhase::Idle;
    }
}

struct ControllerInner<S> {
    service: Arc<S>,
    runtime: Handle,
    settle_delay: Duration,
    state: Mutex<ControllerState>,
    results: watch::Sender<Vec<PlaceRecord>>,
}

impl<S> ControllerInner<S> {
    fn lock(&self) -> MutexGuard<'_, ControllerState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl<S: SearchService + 'static> ControllerInner<S> {
    async fn run(&self, query: Arc<SearchQuery>) {
        {
            let mut state = self.lock();
            if !state.is_current(&query) || state.text != query.text {
                debug!("Query '{}' superseded before it settled", query.text);
                return;
            }
            debug!("Searching for '{}'", query.text);
            state.phase = SearchPhase::InFlight {
                query: Arc::clone(&query),
            };
        }

        let outcome = self.service.search(&query).await;

        // publish under the lock so a newer edit cannot slip in between
        let mut state = self.lock();
        if !state.is_current(&query) {
            debug!("Discarding stale results for '{}'", query.text);
            return;
        }
        state.phase = SearchPhase::Completed;
        match outcome {
            Ok(places) => {
                info!("Search for '{}' returned {} places", query.text, places.len());
                state.advisory = None;
                self.results.send_replace(places);
            }
            Err(e) => {
                warn!("Search for '{}' failed: {}", query.text, e);
                state.advisory = Some(e.to_string());
                self.results.send_replace(Vec::new());
            }
        }
    }
}

/// Debounces query edits into searches and publishes the latest results
pub struct DebouncedSearchController<S: SearchService + 'static> {
    inner: Arc<ControllerInner<S>>,
}

impl<S: SearchService + 'static> DebouncedSearchController<S> {
    /// Controller with the default settle delay and an unbounded region
    ///
    /// Must be built inside a Tokio runtime; searches are spawned onto it.
    pub fn new(service: Arc<S>) -> Result<Self> {
        Self::with_settle_delay(service, Duration::from_millis(DEFAULT_SETTLE_DELAY_MS))
    }

    pub fn with_settle_delay(service: Arc<S>, settle_delay: Duration) -> Result<Self> {
        let runtime = Handle::try_current().map_err(|e| Error::Runtime(e.to_string()))?;
        let (results, _) = watch::channel(Vec::new());
        Ok(Self {
            inner: Arc::new(ControllerInner {
                service,
                runtime,
                settle_delay,
                state: Mutex::new(ControllerState {
                    phase: SearchPhase::Idle,
                    text: String::new(),
                    region: BoundingRegion::default(),
                    task: None,
                    advisory: None,
                    disposed: false,
                }),
                results,
            }),
        })
    }

    /// Controller scoped to `radius_meters` around the source's current fix
    ///
    /// Without a fix the region stays unbounded.
    pub fn for_location(
        service: Arc<S>,
        location: &LocationSource,
        radius_meters: f64,
        settle_delay: Duration,
    ) -> Result<Self> {
        let controller = Self::with_settle_delay(service, settle_delay)?;
        match location.region_around(radius_meters) {
            Some(region) => controller.set_region(region),
            None => debug!("No location fix yet, searching without a region"),
        }
        Ok(controller)
    }

    /// Feed a new edit of the query text
    ///
    /// Any outstanding work for the previous edit is cancelled. Empty text
    /// clears the results immediately and issues no search.
    pub fn set_query_text(&self, text: impl Into<String>) {
        let text = text.into();
        let mut state = self.inner.lock();
        if state.disposed {
            debug!("Ignoring edit on disposed search controller");
            return;
        }

        state.cancel_outstanding();
        state.text = text.clone();

        if text.is_empty() {
            state.advisory = None;
            self.inner.results.send_replace(Vec::new());
            return;
        }

        let query = Arc::new(SearchQuery::new(text, state.region));
        let deadline = Instant::now() + self.inner.settle_delay;
        state.phase = SearchPhase::Pending {
            query: Arc::clone(&query),
            deadline,
        };

        let inner = Arc::clone(&self.inner);
        state.task = Some(self.inner.runtime.spawn(async move {
            tokio::time::sleep_until(deadline).await;
            inner.run(query).await;
        }));
    }

    /// Region used for queries created by later edits
    pub fn set_region(&self, region: BoundingRegion) {
        self.inner.lock().region = region;
    }

    pub fn region(&self) -> BoundingRegion {
        self.inner.lock().region
    }

    pub fn query_text(&self) -> String {
        self.inner.lock().text.clone()
    }

    pub fn settle_delay(&self) -> Duration {
        self.inner.settle_delay
    }

    pub fn phase(&self) -> SearchPhase {
        self.inner.lock().phase.clone()
    }

    /// Latest published results
    pub fn results(&self) -> Vec<PlaceRecord> {
        self.inner.results.borrow().clone()
    }

    /// Observe published results
    pub fn subscribe(&self) -> watch::Receiver<Vec<PlaceRecord>> {
        self.inner.results.subscribe()
    }

    /// Message from the last failed search, cleared by the next success
    pub fn advisory(&self) -> Option<String> {
        self.inner.lock().advisory.clone()
    }

    /// Cancel outstanding work; later edits are ignored
    pub fn dispose(&self) {
        let mut state = self.inner.lock();
        state.cancel_outstanding();
        state.disposed = true;
    }
}

impl<S: SearchService + 'static> Drop for DebouncedSearchController<S> {
    fn drop(&mut self) {
        self.dispose();
    }
}
