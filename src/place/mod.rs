//! Resolved places
//!
//! A `PlaceRecord` is an immutable snapshot produced by a geocoding or
//! search provider. It is replaced wholesale, never edited.

use crate::coord::Coordinate;
use serde::{Deserialize, Serialize};

/// A resolved place: name, single-line address and coordinate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaceRecord {
    /// Opaque unique token, distinct even for identical places
    id: String,
    name: String,
    address: String,
    coordinate: Coordinate,
}

impl PlaceRecord {
    /// Create a place with a fresh id
    pub fn new(
        name: impl Into<String>,
        address: impl Into<String>,
        coordinate: Coordinate,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            address: address.into(),
            coordinate,
        }
    }

    /// Create a place from address lines, joining them into one line
    ///
    /// Lines may themselves contain newlines (multi-line postal formats);
    /// empty fragments are dropped.
    pub fn from_address_lines<I, S>(
        name: impl Into<String>,
        lines: I,
        coordinate: Coordinate,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::new(name, join_address(lines), coordinate)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Single-line, comma-joined address
    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn coordinate(&self) -> Coordinate {
        self.coordinate
    }

    pub fn latitude(&self) -> f64 {
        self.coordinate.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.coordinate.longitude
    }
}

/// Join address fragments into a single comma-separated line
pub fn join_address<I, S>(lines: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    lines
        .into_iter()
        .flat_map(|line| {
            line.as_ref()
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(str::to_string)
                .collect::<Vec<_>>()
        })
        .collect::<Vec<_>>()
        .join(", ")
}
