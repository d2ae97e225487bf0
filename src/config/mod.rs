//! Configuration management
//!
//! Loads and saves configuration from XDG-compliant paths.
//! Config location: ~/.config/place-lookup/config.toml

pub mod defaults;

use crate::error::{Error, Result};
use crate::session::SelectionPolicy;
use defaults::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Debounced search settings
    #[serde(default)]
    pub search: SearchConfig,

    /// Location source settings
    #[serde(default)]
    pub location: LocationConfig,

    /// Place lookup session settings
    #[serde(default)]
    pub session: SessionConfig,

    /// Geocoding/search provider settings
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Map URL settings
    #[serde(default)]
    pub url: UrlConfig,
}

/// Debounced search settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Quiet period before a query is sent, in milliseconds
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,

    /// Search radius around the current location, in meters
    #[serde(default = "default_radius")]
    pub radius: f64,

    /// Maximum results requested per search
    #[serde(default = "default_max_results")]
    pub max_results: usize,
}

/// Location source settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationConfig {
    /// Stop location updates after the first fix
    #[serde(default)]
    pub single_fix: bool,

    /// IP location polling interval in seconds
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
}

/// Place lookup session settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionConfig {
    /// A manual pick is never overwritten by a late automatic lookup
    #[serde(default)]
    pub manual_selection_wins: bool,
}

/// Geocoding/search provider settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Nominatim-compatible base URL
    #[serde(default = "default_provider_url")]
    pub nominatim_url: String,

    /// User agent sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

/// URL generation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UrlConfig {
    /// Default URL provider
    #[serde(default = "default_url_provider")]
    pub default: String,

    /// URL provider templates
    #[serde(default = "default_url_providers")]
    pub providers: HashMap<String, String>,
}

// Default value functions for serde
fn default_settle_delay_ms() -> u64 {
    DEFAULT_SETTLE_DELAY_MS
}
fn default_radius() -> f64 {
    DEFAULT_SEARCH_RADIUS
}
fn default_max_results() -> usize {
    DEFAULT_MAX_RESULTS
}
fn default_poll_interval_secs() -> u64 {
    DEFAULT_POLL_INTERVAL_SECS
}
fn default_provider_url() -> String {
    DEFAULT_PROVIDER_URL.to_string()
}
fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}
fn default_url_provider() -> String {
    DEFAULT_URL_PROVIDER.to_string()
}
fn default_url_providers() -> HashMap<String, String> {
    let mut providers = HashMap::new();
    providers.insert(
        "google".to_string(),
        "https://www.google.com/maps/@{lat},{lng},15z".to_string(),
    );
    providers.insert(
        "openstreetmap".to_string(),
        "https://www.openstreetmap.org/#map=18/{lat}/{lng}".to_string(),
    );
    providers.insert(
        "apple".to_string(),
        "https://maps.apple.com/?ll={lat},{lng}".to_string(),
    );
    providers
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            settle_delay_ms: default_settle_delay_ms(),
            radius: default_radius(),
            max_results: default_max_results(),
        }
    }
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            single_fix: false,
            poll_interval_secs: default_poll_interval_secs(),
        }
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            nominatim_url: default_provider_url(),
            user_agent: default_user_agent(),
        }
    }
}

impl Default for UrlConfig {
    fn default() -> Self {
        Self {
            default: default_url_provider(),
            providers: default_url_providers(),
        }
    }
}

fn parse<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| Error::Config(format!("Invalid value for {}: {}", key, value)))
}

impl Config {
    /// Get the config directory path
    pub fn config_dir() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|p| p.join(APP_DIR_NAME))
            .ok_or_else(|| Error::Config("Could not determine config directory".to_string()))
    }

    /// Get the config file path
    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join(CONFIG_FILE_NAME))
    }

    /// Load configuration from the default path
    ///
    /// Creates default config if file doesn't exist
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load configuration from a specific path, creating it if missing
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = fs::read_to_string(path)
                .map_err(|e| Error::Config(format!("Failed to read config file: {}", e)))?;

            let config: Config = toml::from_str(&content)
                .map_err(|e| Error::Config(format!("Failed to parse config file: {}", e)))?;
            config.validate()?;
            Ok(config)
        } else {
            let config = Config::default();
            config.save_to(path)?;
            Ok(config)
        }
    }

    /// Save configuration to the default path
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    /// Save configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                Error::Config(format!("Failed to create config directory: {}", e))
            })?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;

        fs::write(path, content)
            .map_err(|e| Error::Config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    /// Reject values no component can work with
    pub fn validate(&self) -> Result<()> {
        if !self.search.radius.is_finite() || self.search.radius <= 0.0 {
            return Err(Error::Config(format!(
                "search.radius must be positive, got {}",
                self.search.radius
            )));
        }
        if self.search.max_results == 0 {
            return Err(Error::Config("search.max_results must be at least 1".to_string()));
        }
        if self.location.poll_interval_secs == 0 {
            return Err(Error::Config(
                "location.poll_interval_secs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Debounce settle delay
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.search.settle_delay_ms)
    }

    /// IP polling interval
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.location.poll_interval_secs)
    }

    /// Write-conflict policy for the selected place
    pub fn selection_policy(&self) -> SelectionPolicy {
        if self.session.manual_selection_wins {
            SelectionPolicy::ManualWins
        } else {
            SelectionPolicy::LastWriteWins
        }
    }

    /// Get a configuration value by key path
    ///
    /// Key format: "section.key"
    /// Returns the value as a string, or None if not found
    pub fn get(&self, key: &str) -> Option<String> {
        let parts: Vec<&str> = key.split('.').collect();

        match parts.as_slice() {
            ["search", "settle_delay_ms"] => Some(self.search.settle_delay_ms.to_string()),
            ["search", "radius"] => Some(self.search.radius.to_string()),
            ["search", "max_results"] => Some(self.search.max_results.to_string()),

            ["location", "single_fix"] => Some(self.location.single_fix.to_string()),
            ["location", "poll_interval_secs"] => {
                Some(self.location.poll_interval_secs.to_string())
            }

            ["session", "manual_selection_wins"] => {
                Some(self.session.manual_selection_wins.to_string())
            }

            ["provider", "nominatim_url"] => Some(self.provider.nominatim_url.clone()),
            ["provider", "user_agent"] => Some(self.provider.user_agent.clone()),

            ["url", "default"] => Some(self.url.default.clone()),

            _ => None,
        }
    }

    /// Set a configuration value by key path
    ///
    /// Returns error if key is invalid or value type is wrong; the config
    /// is left unchanged on error.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let parts: Vec<&str> = key.split('.').collect();
        let mut updated = self.clone();

        match parts.as_slice() {
            ["search", "settle_delay_ms"] => updated.search.settle_delay_ms = parse(key, value)?,
            ["search", "radius"] => updated.search.radius = parse(key, value)?,
            ["search", "max_results"] => updated.search.max_results = parse(key, value)?,

            ["location", "single_fix"] => updated.location.single_fix = parse(key, value)?,
            ["location", "poll_interval_secs"] => {
                updated.location.poll_interval_secs = parse(key, value)?
            }

            ["session", "manual_selection_wins"] => {
                updated.session.manual_selection_wins = parse(key, value)?
            }

            ["provider", "nominatim_url"] => updated.provider.nominatim_url = value.to_string(),
            ["provider", "user_agent"] => updated.provider.user_agent = value.to_string(),

            ["url", "default"] => {
                if !updated.url.providers.contains_key(value) {
                    return Err(Error::Config(format!("Unknown URL provider: {}", value)));
                }
                updated.url.default = value.to_string();
            }

            _ => {
                return Err(Error::Config(format!("Unknown config key: {}", key)));
            }
        }

        updated.validate()?;
        *self = updated;
        Ok(())
    }

    /// List all available config keys
    pub fn available_keys() -> Vec<&'static str> {
        vec![
            "search.settle_delay_ms",
            "search.radius",
            "search.max_results",
            "location.single_fix",
            "location.poll_interval_secs",
            "session.manual_selection_wins",
            "provider.nominatim_url",
            "provider.user_agent",
            "url.default",
        ]
    }

    /// Format a URL using the specified provider
    ///
    /// Replaces {lat} and {lng} placeholders with actual values
    pub fn format_url(&self, provider: Option<&str>, lat: f64, lng: f64) -> Result<String> {
        let provider_name = provider.unwrap_or(&self.url.default);

        let template = self.url.providers.get(provider_name).ok_or_else(|| {
            Error::Config(format!("Unknown URL provider: {}", provider_name))
        })?;

        Ok(template
            .replace("{lat}", &lat.to_string())
            .replace("{lng}", &lng.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::defaults::*;
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.search.settle_delay_ms, 300);
        assert_eq!(config.search.radius, 10_000.0);
        assert!(!config.location.single_fix);
        assert_eq!(config.selection_policy(), SelectionPolicy::LastWriteWins);
        assert_eq!(config.settle_delay(), Duration::from_millis(300));
    }

    #[test]
    fn test_get_set() {
        let mut config = Config::default();

        assert_eq!(config.get("search.settle_delay_ms"), Some("300".to_string()));

        config.set("search.settle_delay_ms", "150").unwrap();
        assert_eq!(config.settle_delay(), Duration::from_millis(150));

        config.set("search.radius", "5000").unwrap();
        assert_eq!(config.get("search.radius"), Some("5000".to_string()));

        config.set("session.manual_selection_wins", "true").unwrap();
        assert_eq!(config.selection_policy(), SelectionPolicy::ManualWins);
    }

    #[test]
    fn test_get_invalid_key() {
        let config = Config::default();
        assert_eq!(config.get("invalid.key"), None);
    }

    #[test]
    fn test_set_invalid_key() {
        let mut config = Config::default();
        assert!(config.set("invalid.key", "value").is_err());
    }

    #[test]
    fn test_set_invalid_value_leaves_config_unchanged() {
        let mut config = Config::default();
        assert!(config.set("search.radius", "not_a_number").is_err());
        assert!(config.set("search.radius", "-10").is_err());
        assert!(config.set("search.max_results", "0").is_err());
        assert!(config.set("url.default", "mapquest").is_err());
        assert_eq!(config.search.radius, 10_000.0);
        assert_eq!(config.search.max_results, DEFAULT_MAX_RESULTS);
    }

    #[test]
    fn test_format_url() {
        let config = Config::default();

        let url = config.format_url(Some("google"), 40.7128, -74.0060).unwrap();
        assert_eq!(url, "https://www.google.com/maps/@40.7128,-74.006,15z");

        let url = config.format_url(None, 40.7128, -74.0060).unwrap();
        assert_eq!(url, "https://www.openstreetmap.org/#map=18/40.7128/-74.006");

        assert!(config.format_url(Some("unknown"), 0.0, 0.0).is_err());
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("place-lookup").join("config.toml");

        // first load creates the file
        let created = Config::load_from(&path).unwrap();
        assert!(path.exists());
        assert_eq!(created.search.settle_delay_ms, 300);

        let mut config = created;
        config.set("search.settle_delay_ms", "500").unwrap();
        config.set("location.single_fix", "true").unwrap();
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.search.settle_delay_ms, 500);
        assert!(loaded.location.single_fix);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        fs::write(&path, "[search]\nradius = 2500.0\n").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.search.radius, 2500.0);
        assert_eq!(config.search.settle_delay_ms, 300);
        assert_eq!(config.provider.nominatim_url, DEFAULT_PROVIDER_URL);
    }

    #[test]
    fn test_invalid_file_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        fs::write(&path, "[search]\nradius = 0.0\n").unwrap();
        assert!(matches!(Config::load_from(&path), Err(Error::Config(_))));
    }

    #[test]
    fn test_serialization_format() {
        let toml = toml::to_string_pretty(&Config::default()).unwrap();
        assert!(toml.contains("[search]"));
        assert!(toml.contains("[location]"));
        assert!(toml.contains("[session]"));
        assert!(toml.contains("[url.providers]"));
    }

    #[test]
    fn test_available_keys_are_gettable() {
        let config = Config::default();
        for key in Config::available_keys() {
            assert!(config.get(key).is_some(), "missing key {}", key);
        }
    }
}
