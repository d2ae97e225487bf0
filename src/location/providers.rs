//! Concrete location providers
//!
//! - `FixedLocationProvider`: a single known coordinate (e.g. from `--lat/--lng`)
//! - `IpLocationProvider`: polls IP geolocation on an interval

use crate::coord::Coordinate;
use crate::geo::ip_location::IpLocator;
use crate::location::{AuthorizationState, LocationFeed, LocationProvider};
use std::sync::Mutex;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::debug;

/// Provider reporting one fixed coordinate as soon as updates start
#[derive(Debug, Clone, Copy)]
pub struct FixedLocationProvider {
    coordinate: Coordinate,
}

impl FixedLocationProvider {
    pub fn new(coordinate: Coordinate) -> Self {
        Self { coordinate }
    }
}

impl LocationProvider for FixedLocationProvider {
    fn request_authorization(&self, feed: LocationFeed) {
        feed.authorization_changed(AuthorizationState::Granted);
    }

    fn start_updates(&self, feed: LocationFeed) {
        feed.deliver(&[self.coordinate]);
    }

    fn stop_updates(&self) {}
}

/// Provider polling ip-api.com; there is no permission prompt for IP lookup
pub struct IpLocationProvider {
    locator: IpLocator,
    interval: Duration,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl IpLocationProvider {
    pub fn new(locator: IpLocator, interval: Duration) -> Self {
        Self {
            locator,
            interval: interval.max(Duration::from_secs(1)),
            task: Mutex::new(None),
        }
    }

    fn replace_task(&self, task: Option<JoinHandle<()>>) {
        let mut slot = self.task.lock().unwrap_or_else(|p| p.into_inner());
        if let Some(previous) = std::mem::replace(&mut *slot, task) {
            previous.abort();
        }
    }
}

impl LocationProvider for IpLocationProvider {
    fn request_authorization(&self, feed: LocationFeed) {
        feed.authorization_changed(AuthorizationState::Granted);
    }

    fn start_updates(&self, feed: LocationFeed) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            feed.failed("IP location polling requires a Tokio runtime");
            return;
        };

        let locator = self.locator.clone();
        let interval = self.interval;
        let task = runtime.spawn(async move {
            loop {
                match locator.locate().await {
                    Ok(fix) => {
                        debug!("IP fix: {} {}", fix.label, fix.coordinate);
                        feed.deliver(&[fix.coordinate]);
                    }
                    Err(e) => feed.failed(e.to_string()),
                }
                if feed.is_closed() {
                    break;
                }
                tokio::time::sleep(interval).await;
            }
        });
        self.replace_task(Some(task));
    }

    fn stop_updates(&self) {
        self.replace_task(None);
    }
}

impl Drop for IpLocationProvider {
    fn drop(&mut self) {
        self.replace_task(None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location::LocationSource;

    #[test]
    fn test_fixed_provider_grants_and_delivers() {
        let coord = Coordinate::new(37.0, -122.0);
        let source = LocationSource::new(FixedLocationProvider::new(coord));
        source.start();
        assert_eq!(source.authorization(), AuthorizationState::Granted);
        assert_eq!(source.current_coordinate(), Some(coord));
    }

    #[test]
    fn test_ip_provider_without_runtime_reports_failure() {
        let provider = IpLocationProvider::new(IpLocator::without_cache(), Duration::from_secs(60));
        let source = LocationSource::new(provider);
        source.start();
        assert_eq!(source.authorization(), AuthorizationState::Granted);
        assert!(source.last_error().unwrap().contains("Tokio runtime"));
        assert_eq!(source.current_coordinate(), None);
    }
}
