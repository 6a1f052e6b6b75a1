//! Side-by-side current conditions for a handful of places.

use serde::Serialize;
use thiserror::Error;

use crate::model::{CurrentConditions, Location, Unit};
use crate::provider::WeatherService;

pub const MAX_COMPARED: usize = 4;
pub const MIN_COMPARED: usize = 2;

#[derive(Debug, Error, PartialEq)]
pub enum CompareError {
    #[error("{0} is already in the comparison")]
    AlreadyAdded(String),
    #[error("at most 4 locations can be compared")]
    Full,
    #[error("add at least 2 locations to compare")]
    TooFew,
    #[error("no location at position {0}")]
    NoSuchIndex(usize),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComparisonSet {
    locations: Vec<Location>,
}

impl ComparisonSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, location: Location) -> Result<(), CompareError> {
        if self.locations.iter().any(|l| l.same_coordinates(&location)) {
            return Err(CompareError::AlreadyAdded(location.address));
        }
        if self.locations.len() >= MAX_COMPARED {
            return Err(CompareError::Full);
        }
        self.locations.push(location);
        Ok(())
    }

    pub fn remove(&mut self, index: usize) -> Result<Location, CompareError> {
        if index >= self.locations.len() {
            return Err(CompareError::NoSuchIndex(index));
        }
        Ok(self.locations.remove(index))
    }

    pub fn locations(&self) -> &[Location] {
        &self.locations
    }

    pub fn len(&self) -> usize {
        self.locations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }

    pub fn ready(&self) -> bool {
        self.locations.len() >= MIN_COMPARED
    }

    /// Fetches every location in parallel and returns the rows of those
    /// that answered.
    pub async fn fetch(
        &self,
        service: &WeatherService,
        unit: Unit,
    ) -> Result<Vec<ComparisonRow>, CompareError> {
        if !self.ready() {
            return Err(CompareError::TooFew);
        }
        let results = service.compare(&self.locations, unit).await;
        Ok(comparison_rows(&self.locations, &results))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonRow {
    pub name: String,
    pub temp: f64,
    pub feels_like: f64,
    pub min: f64,
    pub max: f64,
    pub humidity: f64,
    pub wind: f64,
    pub pressure: f64,
    pub clouds: f64,
}

/// Short display name: the first part of the address, or `City N`.
pub fn short_name(location: &Location, index: usize) -> String {
    location
        .address
        .split(", ")
        .next()
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| format!("City {}", index + 1))
}

/// Pairs each location with its result, skipping the ones that failed.
pub fn comparison_rows(
    locations: &[Location],
    results: &[Option<CurrentConditions>],
) -> Vec<ComparisonRow> {
    locations
        .iter()
        .zip(results)
        .enumerate()
        .filter_map(|(i, (location, result))| {
            let c = result.as_ref()?;
            Some(ComparisonRow {
                name: short_name(location, i),
                temp: c.temp,
                feels_like: c.feels_like,
                min: c.temp_min,
                max: c.temp_max,
                humidity: c.humidity,
                wind: c.wind_speed,
                pressure: c.pressure,
                clouds: c.clouds,
            })
        })
        .collect()
}
