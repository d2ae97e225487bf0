//! JSON output formatter

use crate::config::Config;
use crate::error::Result;
use crate::format::OutputFormatter;
use crate::place::PlaceRecord;

/// JSON formatter - outputs the place as pretty-printed JSON
pub struct JsonFormatter;

impl OutputFormatter for JsonFormatter {
    fn name(&self) -> &str {
        "json"
    }

    fn description(&self) -> &str {
        "Place as JSON"
    }

    fn format(&self, place: &PlaceRecord, _config: &Config) -> Result<String> {
        Ok(serde_json::to_string_pretty(place)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coord::Coordinate;

    #[test]
    fn test_json_format() {
        let place = PlaceRecord::new("Cafe B", "2 Main St", Coordinate::new(37.0, -122.0));
        let output = JsonFormatter.format(&place, &Config::default()).unwrap();

        let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(parsed["name"], "Cafe B");
        assert_eq!(parsed["address"], "2 Main St");
        assert_eq!(parsed["coordinate"]["latitude"], 37.0);
        assert!(parsed.get("id").is_some());
    }
}
