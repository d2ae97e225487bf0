//! In-memory providers for tests

use crate::coord::Coordinate;
use crate::error::{Error, Result};
use crate::geo::{GeocodingService, SearchQuery, SearchService};
use crate::place::PlaceRecord;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

/// Canned provider outcome
#[derive(Debug, Clone)]
pub enum Outcome<T> {
    Ok(T),
    NotFound,
    NoResults,
    Fail(String),
}

impl<T: Clone> Outcome<T> {
    fn to_result(&self) -> Result<T> {
        match self {
            Outcome::Ok(value) => Ok(value.clone()),
            Outcome::NotFound => Err(Error::NotFound),
            Outcome::NoResults => Err(Error::NoResults),
            Outcome::Fail(msg) => Err(Error::Provider(msg.clone())),
        }
    }
}

pub fn place(name: &str) -> PlaceRecord {
    PlaceRecord::new(name, format!("{} Street", name), Coordinate::new(37.0, -122.0))
}

/// Geocoder returning the same outcome after an optional delay
pub struct MockGeocoder {
    outcome: Outcome<PlaceRecord>,
    delay: Duration,
    calls: Mutex<Vec<Coordinate>>,
}

impl MockGeocoder {
    pub fn new(outcome: Outcome<PlaceRecord>) -> Self {
        Self {
            outcome,
            delay: Duration::ZERO,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> Vec<Coordinate> {
        self.calls.lock().unwrap().clone()
    }
}

impl GeocodingService for MockGeocoder {
    async fn resolve(&self, coordinate: Coordinate) -> Result<PlaceRecord> {
        self.calls.lock().unwrap().push(coordinate);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.outcome.to_result()
    }
}

/// Search service keyed by query text; unknown text yields `NoResults`
#[derive(Default)]
pub struct MockSearch {
    responses: HashMap<String, (Duration, Outcome<Vec<PlaceRecord>>)>,
    calls: Mutex<Vec<SearchQuery>>,
}

impl MockSearch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(
        mut self,
        text: &str,
        delay: Duration,
        outcome: Outcome<Vec<PlaceRecord>>,
    ) -> Self {
        self.responses.insert(text.to_string(), (delay, outcome));
        self
    }

    pub fn calls(&self) -> Vec<SearchQuery> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_texts(&self) -> Vec<String> {
        self.calls().into_iter().map(|q| q.text).collect()
    }
}

impl SearchService for MockSearch {
    async fn search(&self, query: &SearchQuery) -> Result<Vec<PlaceRecord>> {
        self.calls.lock().unwrap().push(query.clone());
        let Some((delay, outcome)) = self.responses.get(&query.text).cloned() else {
            return Err(Error::NoResults);
        };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        outcome.to_result()
    }
}
