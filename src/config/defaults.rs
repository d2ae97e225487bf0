//! Default configuration values
//!
//! Named constants for all tunable parameters

use crate::constants::api::{NOMINATIM_URL, USER_AGENT};

/// Debounce settle delay in milliseconds
pub const DEFAULT_SETTLE_DELAY_MS: u64 = 300;

/// Default search radius in meters
pub const DEFAULT_SEARCH_RADIUS: f64 = 10_000.0;

/// Default maximum number of search results requested from the provider
pub const DEFAULT_MAX_RESULTS: usize = 10;

/// Default IP location polling interval in seconds
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 60;

/// Default geocoding provider base URL
pub const DEFAULT_PROVIDER_URL: &str = NOMINATIM_URL;

/// Default provider user agent
pub const DEFAULT_USER_AGENT: &str = USER_AGENT;

/// Default URL provider
pub const DEFAULT_URL_PROVIDER: &str = "openstreetmap";

/// Config file name
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Application directory name (for XDG paths)
pub const APP_DIR_NAME: &str = "place-lookup";
