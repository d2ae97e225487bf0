//! Human-readable text output formatter

use crate::config::Config;
use crate::error::Result;
use crate::format::OutputFormatter;
use crate::place::PlaceRecord;

/// Text formatter - name, address and coordinate on separate lines
pub struct TextFormatter;

impl OutputFormatter for TextFormatter {
    fn name(&self) -> &str {
        "text"
    }

    fn description(&self) -> &str {
        "Human-readable text"
    }

    fn format(&self, place: &PlaceRecord, _config: &Config) -> Result<String> {
        let mut output = String::new();
        output.push_str(if place.name().is_empty() { "(unnamed place)" } else { place.name() });
        output.push('\n');
        if !place.address().is_empty() {
            output.push_str(place.address());
            output.push('\n');
        }
        output.push_str(&place.coordinate().to_string());
        Ok(output)
    }
}
