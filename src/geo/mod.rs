//! Geocoding and place search providers
//!
//! Defines the two provider contracts the core depends on, plus
//! IP-based positioning used as a location fix source.

pub mod ip_location;
pub mod nominatim;

#[cfg(test)]
pub(crate) mod mock;

use crate::coord::{BoundingRegion, Coordinate};
use crate::error::Result;
use crate::place::PlaceRecord;
use serde::{Deserialize, Serialize};
use std::future::Future;

/// A text query scoped to a region
///
/// One is created per debounce cycle; the controller tracks the current one
/// by identity, not by text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchQuery {
    pub text: String,
    pub region: BoundingRegion,
}

impl SearchQuery {
    pub fn new(text: impl Into<String>, region: BoundingRegion) -> Self {
        Self {
            text: text.into(),
            region,
        }
    }
}

/// One-shot coordinate to place resolution
pub trait GeocodingService: Send + Sync {
    /// Resolve a coordinate to the best matching place
    ///
    /// Fails with `Error::NotFound` when nothing maps to the coordinate and
    /// `Error::Provider` on transport or provider failure.
    fn resolve(&self, coordinate: Coordinate) -> impl Future<Output = Result<PlaceRecord>> + Send;
}

/// Text + region to places resolution
pub trait SearchService: Send + Sync {
    /// Search for places matching the query, in provider ranking order
    ///
    /// Fails with `Error::NoResults` on an empty result set and
    /// `Error::Provider` otherwise.
    fn search(&self, query: &SearchQuery) -> impl Future<Output = Result<Vec<PlaceRecord>>> + Send;
}

/// Get the default geocoding and search backend
pub fn get_geocoder(
    base_url: &str,
    user_agent: &str,
    max_results: usize,
) -> Result<nominatim::NominatimBackend> {
    nominatim::NominatimBackend::new(base_url, user_agent, max_results)
}

/// Get the IP location service
pub fn get_ip_locator() -> ip_location::IpLocator {
    ip_location::IpLocator::new()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_query_serialization() {
        let query = SearchQuery::new("Coffee", BoundingRegion::default());
        let json = serde_json::to_string(&query).unwrap();
        let parsed: SearchQuery = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, query);
    }
}
