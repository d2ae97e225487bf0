//! IP-based positioning
//!
//! Approximates the device position from its public IP using ip-api.com.
//! Fixes are cached on disk so repeated runs don't hit the API.

use crate::constants::api::IP_API_URL;
use crate::constants::cache::{IP_LOCATION_CACHE_FILE, IP_LOCATION_TTL_SECS};
use crate::coord::Coordinate;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::{Duration, SystemTime};
use tracing::debug;

/// An approximate fix derived from the public IP
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IpFix {
    pub coordinate: Coordinate,
    /// City, region, country as reported by the API
    pub label: String,
}

/// IP location service with caching
#[derive(Debug, Clone)]
pub struct IpLocator {
    client: reqwest::Client,
    cache_path: Option<PathBuf>,
}

/// ip-api.com response
#[derive(Debug, Deserialize)]
struct IpApiResponse {
    status: String,
    lat: Option<f64>,
    lon: Option<f64>,
    city: Option<String>,
    #[serde(rename = "regionName")]
    region_name: Option<String>,
    country: Option<String>,
    message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CachedFix {
    fix: IpFix,
    timestamp: u64,
}

fn now_secs() -> Option<u64> {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .ok()
        .map(|d| d.as_secs())
}

impl IpLocator {
    /// Create an IP locator caching under the user cache directory
    pub fn new() -> Self {
        let cache_path = dirs::cache_dir()
            .map(|p| p.join("place-lookup").join(IP_LOCATION_CACHE_FILE));

        Self {
            client: reqwest::Client::new(),
            cache_path,
        }
    }

    /// Create an IP locator with a specific cache path
    pub fn with_cache_path(cache_path: PathBuf) -> Self {
        Self {
            client: reqwest::Client::new(),
            cache_path: Some(cache_path),
        }
    }

    /// Create an IP locator without caching
    pub fn without_cache() -> Self {
        Self {
            client: reqwest::Client::new(),
            cache_path: None,
        }
    }

    /// Current approximate position, from cache when still fresh
    pub async fn locate(&self) -> Result<IpFix> {
        if let Some(cached) = self.load_cache() {
            debug!("Using cached IP fix: {}", cached.label);
            return Ok(cached);
        }

        let fix = self.fetch().await?;
        self.save_cache(&fix);
        Ok(fix)
    }

    async fn fetch(&self) -> Result<IpFix> {
        let response = self
            .client
            .get(IP_API_URL)
            .send()
            .await
            .map_err(|e| Error::Provider(format!("IP location request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(Error::Provider(format!(
                "IP location API returned status: {}",
                response.status()
            )));
        }

        let data: IpApiResponse = response
            .json()
            .await
            .map_err(|e| Error::Provider(format!("Failed to parse IP location response: {}", e)))?;

        Self::to_fix(data)
    }

    fn to_fix(data: IpApiResponse) -> Result<IpFix> {
        if data.status != "success" {
            return Err(Error::Provider(format!(
                "IP location lookup failed: {}",
                data.message.unwrap_or_else(|| data.status.clone())
            )));
        }

        let (Some(lat), Some(lng)) = (data.lat, data.lon) else {
            return Err(Error::Provider("No coordinates in IP location response".to_string()));
        };
        let coordinate = Coordinate::new(lat, lng);
        coordinate.validate()?;

        let label = [data.city, data.region_name, data.country]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(", ");

        Ok(IpFix {
            coordinate,
            label: if label.is_empty() {
                "Unknown Location".to_string()
            } else {
                label
            },
        })
    }

    fn load_cache(&self) -> Option<IpFix> {
        let cache_path = self.cache_path.as_ref()?;
        let content = fs::read_to_string(cache_path).ok()?;
        let cached: CachedFix = serde_json::from_str(&content).ok()?;

        let age = now_secs()?.checked_sub(cached.timestamp)?;
        (age < IP_LOCATION_TTL_SECS).then_some(cached.fix)
    }

    fn save_cache(&self, fix: &IpFix) {
        let Some(cache_path) = &self.cache_path else {
            return;
        };

        if let Some(parent) = cache_path.parent() {
            let _ = fs::create_dir_all(parent);
        }

        let cached = CachedFix {
            fix: fix.clone(),
            timestamp: now_secs().unwrap_or(0),
        };

        if let Ok(content) = serde_json::to_string_pretty(&cached) {
            let _ = fs::write(cache_path, content);
        }
    }

    /// Clear the cache
    pub fn clear_cache(&self) {
        if let Some(cache_path) = &self.cache_path {
            let _ = fs::remove_file(cache_path);
        }
    }

    /// Get cache duration
    pub fn cache_duration() -> Duration {
        Duration::from_secs(IP_LOCATION_TTL_SECS)
    }
}

impl Default for IpLocator {
    fn default() -> Self {
        Self::new()
    }
}
