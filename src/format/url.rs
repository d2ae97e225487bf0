//! URL output formatter

use crate::config::Config;
use crate::error::Result;
use crate::format::OutputFormatter;
use crate::place::PlaceRecord;

/// URL formatter - outputs a map URL for the place
pub struct UrlFormatter;

impl UrlFormatter {
    /// Format URL with optional provider override
    pub fn format_with_provider(
        &self,
        place: &PlaceRecord,
        config: &Config,
        provider: Option<&str>,
    ) -> Result<String> {
        config.format_url(provider, place.latitude(), place.longitude())
    }
}

impl OutputFormatter for UrlFormatter {
    fn name(&self) -> &str {
        "url"
    }

    fn description(&self) -> &str {
        "Map URL for the place"
    }

    fn format(&self, place: &PlaceRecord, config: &Config) -> Result<String> {
        self.format_with_provider(place, config, None)
    }
}
