//! place-lookup: current place lookup with debounced nearby search
//!
//! Binds three asynchronous sources into one consistent selected place:
//!
//! - [`location::LocationSource`]: stream of device fixes and permission state
//! - [`session::PlaceLookupSession`]: resolves the first fix to a place once,
//!   then lets the user override it
//! - [`search::DebouncedSearchController`]: turns rapid query edits into at
//!   most one in-flight search, never publishing superseded results
//!
//! ## Quick Start
//!
//! ```no_run
//! use place_lookup::coord::Coordinate;
//! use place_lookup::geo::nominatim::NominatimBackend;
//! use place_lookup::location::{providers::FixedLocationProvider, LocationSource};
//! use place_lookup::search::DebouncedSearchController;
//! use place_lookup::session::PlaceLookupSession;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # async fn demo() -> place_lookup::Result<()> {
//! let service = Arc::new(NominatimBackend::new(
//!     "https://nominatim.openstreetmap.org",
//!     "demo/0.1",
//!     10,
//! )?);
//! let here = Coordinate::new(37.7955, -122.3937);
//! let location = LocationSource::new(FixedLocationProvider::new(here));
//!
//! let session = PlaceLookupSession::new(location.clone(), service.clone());
//! session.start()?;
//! location.start();
//!
//! let search = DebouncedSearchController::for_location(
//!     service,
//!     &location,
//!     10_000.0,
//!     Duration::from_millis(300),
//! )?;
//! search.set_query_text("Coffee");
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod constants;
pub mod coord;
pub mod error;
pub mod format;
pub mod geo;
pub mod location;
pub mod place;
pub mod search;
pub mod session;

// Re-export commonly used types
pub use config::Config;
pub use coord::{BoundingRegion, Coordinate};
pub use error::{Error, Result};
pub use location::{AuthorizationState, LocationSource};
pub use place::PlaceRecord;
pub use search::DebouncedSearchController;
pub use session::PlaceLookupSession;
