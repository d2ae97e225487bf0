//! Nominatim geocoding backend (OpenStreetMap)
//!
//! Uses the free Nominatim API for both reverse geocoding and nearby search.
//! Rate limit: 1 request per second (enforced by User-Agent requirement)

use crate::coord::Coordinate;
use crate::error::{Error, Result};
use crate::geo::{GeocodingService, SearchQuery, SearchService};
use crate::place::{join_address, PlaceRecord};
use serde::Deserialize;
use tracing::{debug, warn};

/// Nominatim geocoding backend
#[derive(Debug, Clone)]
pub struct NominatimBackend {
    client: reqwest::Client,
    base_url: String,
    max_results: usize,
}

/// Nominatim place (jsonv2 format)
#[derive(Debug, Deserialize)]
struct NominatimPlace {
    lat: String,
    lon: String,
    display_name: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    address: Option<NominatimAddress>,
}

/// Structured address returned with `addressdetails=1`
#[derive(Debug, Default, Deserialize)]
struct NominatimAddress {
    house_number: Option<String>,
    road: Option<String>,
    city: Option<String>,
    town: Option<String>,
    village: Option<String>,
    hamlet: Option<String>,
    state: Option<String>,
    postcode: Option<String>,
    country: Option<String>,
}

/// Reverse lookups return either a place or an error object with status 200
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ReverseResponse {
    Failed { error: String },
    Found(NominatimPlace),
}

impl NominatimBackend {
    /// Create a new Nominatim backend
    pub fn new(base_url: &str, user_agent: &str, max_results: usize) -> Result<Self> {
        let client = reqwest::Client::builder().user_agent(user_agent).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            max_results: max_results.max(1),
        })
    }

    fn reverse_url(&self, coordinate: Coordinate) -> String {
        format!(
            "{}/reverse?lat={}&lon={}&format=jsonv2&addressdetails=1",
            self.base_url, coordinate.latitude, coordinate.longitude
        )
    }

    fn search_url(&self, query: &SearchQuery) -> String {
        let mut url = format!(
            "{}/search?q={}&format=jsonv2&addressdetails=1&limit={}",
            self.base_url,
            urlencoding::encode(&query.text),
            self.max_results
        );
        if !query.region.is_empty() {
            let (west, north, east, south) = query.region.bounds();
            url.push_str(&format!(
                "&viewbox={},{},{},{}&bounded=1",
                west, north, east, south
            ));
        }
        url
    }

    /// Parse lat/lng strings to f64
    fn parse_coords(lat: &str, lng: &str) -> Result<Coordinate> {
        let lat: f64 = lat
            .parse()
            .map_err(|_| Error::Provider(format!("Invalid latitude: {}", lat)))?;
        let lng: f64 = lng
            .parse()
            .map_err(|_| Error::Provider(format!("Invalid longitude: {}", lng)))?;
        Ok(Coordinate::new(lat, lng))
    }

    fn to_place(result: NominatimPlace) -> Result<PlaceRecord> {
        let coordinate = Self::parse_coords(&result.lat, &result.lon)?;

        let name = result
            .name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| {
                result
                    .display_name
                    .split(',')
                    .next()
                    .unwrap_or_default()
                    .trim()
                    .to_string()
            });

        let address = result
            .address
            .map(|a| a.lines())
            .map(join_address)
            .filter(|a| !a.is_empty())
            .unwrap_or(result.display_name);

        Ok(PlaceRecord::new(name, address, coordinate))
    }

    /// Convert search hits, skipping entries with unusable coordinates
    fn to_places(results: Vec<NominatimPlace>) -> Result<Vec<PlaceRecord>> {
        let places: Vec<PlaceRecord> = results
            .into_iter()
            .filter_map(|result| {
                let label = result.display_name.clone();
                match Self::to_place(result) {
                    Ok(place) => Some(place),
                    Err(e) => {
                        warn!("Skipping Nominatim result '{}': {}", label, e);
                        None
                    }
                }
            })
            .collect();

        if places.is_empty() {
            return Err(Error::NoResults);
        }
        Ok(places)
    }

    async fn get(&self, url: &str) -> Result<reqwest::Response> {
        debug!("Nominatim GET {}", url);
        self.client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::Provider(format!("Nominatim request failed: {}", e)))
    }
}

impl NominatimAddress {
    /// Postal-style lines: street, locality, region + postcode, country
    fn lines(self) -> Vec<String> {
        let join = |parts: [Option<String>; 2]| {
            parts.into_iter().flatten().collect::<Vec<_>>().join(" ")
        };
        let locality = self.city.or(self.town).or(self.village).or(self.hamlet);
        vec![
            join([self.house_number, self.road]),
            locality.unwrap_or_default(),
            join([self.state, self.postcode]),
            self.country.unwrap_or_default(),
        ]
    }
}

impl GeocodingService for NominatimBackend {
    async fn resolve(&self, coordinate: Coordinate) -> Result<PlaceRecord> {
        let response = self.get(&self.reverse_url(coordinate)).await?;

        if !response.status().is_success() {
            if response.status() == reqwest::StatusCode::NOT_FOUND {
                return Err(Error::NotFound);
            }
            return Err(Error::Provider(format!(
                "Nominatim returned status: {}",
                response.status()
            )));
        }

        let result: ReverseResponse = response
            .json()
            .await
            .map_err(|e| Error::Provider(format!("Failed to parse Nominatim response: {}", e)))?;

        match result {
            ReverseResponse::Found(place) => Self::to_place(place),
            ReverseResponse::Failed { error } => {
                debug!("Nominatim reverse lookup found nothing: {}", error);
                Err(Error::NotFound)
            }
        }
    }
}

impl SearchService for NominatimBackend {
    async fn search(&self, query: &SearchQuery) -> Result<Vec<PlaceRecord>> {
        let response = self.get(&self.search_url(query)).await?;

        if !response.status().is_success() {
            return Err(Error::Provider(format!(
                "Nominatim returned status: {}",
                response.status()
            )));
        }

        let results: Vec<NominatimPlace> = response
            .json()
            .await
            .map_err(|e| Error::Provider(format!("Failed to parse Nominatim response: {}", e)))?;

        Self::to_places(results)
    }
}
