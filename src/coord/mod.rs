//! Coordinates and search regions
//!
//! A `Coordinate` is a single WGS84 fix. A `BoundingRegion` is a center plus
//! north-south / east-west extents in meters, used to scope place searches.

use crate::constants::geo::METERS_PER_DEGREE_LAT;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// A geographic coordinate (latitude, longitude)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    /// Create new coordinates
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Validate that coordinates are within valid ranges
    ///
    /// Latitude: -90 to 90
    /// Longitude: -180 to 180
    pub fn validate(&self) -> Result<()> {
        if !(-90.0..=90.0).contains(&self.latitude) {
            return Err(Error::InvalidCoordinates(format!(
                "Latitude {} is out of range [-90, 90]",
                self.latitude
            )));
        }
        if !(-180.0..=180.0).contains(&self.longitude) {
            return Err(Error::InvalidCoordinates(format!(
                "Longitude {} is out of range [-180, 180]",
                self.longitude
            )));
        }
        Ok(())
    }
}

impl std::fmt::Display for Coordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.6}, {:.6})", self.latitude, self.longitude)
    }
}

/// A center coordinate plus extents used to scope a search
///
/// The default region is centered on (0, 0) with zero extent, which
/// providers treat as "unbounded".
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BoundingRegion {
    pub center: Coordinate,
    /// North-south extent in meters
    pub latitudinal_meters: f64,
    /// East-west extent in meters
    pub longitudinal_meters: f64,
}

impl Default for Coordinate {
    fn default() -> Self {
        Self::new(0.0, 0.0)
    }
}

impl BoundingRegion {
    /// Create a square region of `meters` on each side around `center`
    pub fn around(center: Coordinate, meters: f64) -> Result<Self> {
        if !meters.is_finite() || meters < 0.0 {
            return Err(Error::InvalidRadius(format!(
                "Radius must be a non-negative number of meters, got {}",
                meters
            )));
        }
        Ok(Self {
            center,
            latitudinal_meters: meters,
            longitudinal_meters: meters,
        })
    }

    /// True when the region has no extent
    pub fn is_empty(&self) -> bool {
        self.latitudinal_meters <= 0.0 || self.longitudinal_meters <= 0.0
    }

    /// Extents in degrees as (latitude delta, longitude delta)
    pub fn span_degrees(&self) -> (f64, f64) {
        let lat_delta = self.latitudinal_meters / METERS_PER_DEGREE_LAT;
        let cos_lat = self.center.latitude.to_radians().cos().abs().max(1e-6);
        let lng_delta = self.longitudinal_meters / (METERS_PER_DEGREE_LAT * cos_lat);
        (lat_delta, lng_delta.min(360.0))
    }

    /// Bounds as (west, north, east, south), clamped to valid ranges
    pub fn bounds(&self) -> (f64, f64, f64, f64) {
        let (lat_delta, lng_delta) = self.span_degrees();
        let half_lat = lat_delta / 2.0;
        let half_lng = lng_delta / 2.0;
        (
            (self.center.longitude - half_lng).max(-180.0),
            (self.center.latitude + half_lat).min(90.0),
            (self.center.longitude + half_lng).min(180.0),
            (self.center.latitude - half_lat).max(-90.0),
        )
    }

    /// Whether a coordinate falls inside the region bounds
    pub fn contains(&self, coord: &Coordinate) -> bool {
        let (west, north, east, south) = self.bounds();
        coord.latitude >= south
            && coord.latitude <= north
            && coord.longitude >= west
            && coord.longitude <= east
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_validate() {
        assert!(Coordinate::new(37.0, -122.0).validate().is_ok());
        assert!(Coordinate::new(91.0, 0.0).validate().is_err());
        assert!(Coordinate::new(0.0, -181.0).validate().is_err());
    }

    #[test]
    fn test_region_around() {
        let center = Coordinate::new(40.7128, -74.0060);
        let region = BoundingRegion::around(center, 10_000.0).unwrap();
        assert_eq!(region.center, center);
        assert_eq!(region.latitudinal_meters, 10_000.0);
        assert!(!region.is_empty());
    }

    #[test]
    fn test_region_rejects_negative_radius() {
        let center = Coordinate::new(0.0, 0.0);
        assert!(BoundingRegion::around(center, -1.0).is_err());
        assert!(BoundingRegion::around(center, f64::NAN).is_err());
    }

    #[test]
    fn test_span_degrees_at_equator() {
        let region =
            BoundingRegion::around(Coordinate::new(0.0, 0.0), METERS_PER_DEGREE_LAT).unwrap();
        let (lat, lng) = region.span_degrees();
        assert_relative_eq!(lat, 1.0, epsilon = 1e-9);
        assert_relative_eq!(lng, 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_span_widens_with_latitude() {
        let region = BoundingRegion::around(Coordinate::new(60.0, 10.0), 10_000.0).unwrap();
        let (lat, lng) = region.span_degrees();
        // cos(60°) = 0.5, so longitude span doubles
        assert_relative_eq!(lng, lat * 2.0, epsilon = 1e-9);
    }

    #[test]
    fn test_bounds_and_contains() {
        let center = Coordinate::new(37.0, -122.0);
        let region = BoundingRegion::around(center, 10_000.0).unwrap();
        let (west, north, east, south) = region.bounds();
        assert!(west < -122.0 && east > -122.0);
        assert!(south < 37.0 && north > 37.0);
        assert!(region.contains(&center));
        assert!(!region.contains(&Coordinate::new(38.0, -122.0)));
    }

    #[test]
    fn test_default_region_is_empty() {
        assert!(BoundingRegion::default().is_empty());
    }
}
