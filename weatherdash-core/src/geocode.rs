//! Forward and reverse geocoding.
//!
//! [`GeocodingProvider`] is the raw HTTP seam and reports failures.
//! [`LocationResolver`] sits on top of it, builds display addresses and
//! turns every failure into "no result".

use std::fmt::Debug;
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::model::{GeocodeCandidate, Location};
use crate::provider::truncate_body;

/// Forward lookups shorter than this many characters are not sent.
pub const MIN_QUERY_CHARS: usize = 4;

/// Result cap passed to the forward geocoder.
pub const SEARCH_LIMIT: usize = 15;

pub const GEOAPIFY_BASE_URL: &str = "https://api.geoapify.com";

/// Address parts of one geocoder hit.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct GeoFeature {
    #[serde(default)]
    pub suburb: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lon: Option<f64>,
}

impl GeoFeature {
    pub fn address(&self) -> String {
        format_address(
            self.suburb.as_deref(),
            self.city.as_deref(),
            self.state.as_deref(),
            self.country.as_deref(),
        )
    }

    /// `None` when the hit has no coordinates.
    pub fn to_location(&self) -> Option<Location> {
        Some(Location {
            address: self.address(),
            lat: self.lat?,
            lon: self.lon?,
        })
    }
}

/// Joins suburb, city, state and country with `", "`, leaving out any part
/// that is missing or blank.
pub fn format_address(
    suburb: Option<&str>,
    city: Option<&str>,
    state: Option<&str>,
    country: Option<&str>,
) -> String {
    [suburb, city, state, country]
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
}

#[async_trait]
pub trait GeocodingProvider: Send + Sync + Debug {
    async fn search(&self, text: &str, limit: usize) -> Result<Vec<GeoFeature>>;

    async fn reverse(&self, lat: f64, lon: f64) -> Result<Vec<GeoFeature>>;
}

#[derive(Debug, Clone)]
pub struct GeoapifyProvider {
    api_key: String,
    base_url: String,
    http: Client,
}

impl GeoapifyProvider {
    pub fn new(api_key: String) -> Self {
        Self::with_base_url(api_key, GEOAPIFY_BASE_URL)
    }

    /// Points the provider at another host, e.g. a local mock server.
    pub fn with_base_url(api_key: String, base_url: &str) -> Self {
        Self {
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            http: Client::new(),
        }
    }

    async fn fetch(&self, endpoint: &str, query: &[(&str, String)]) -> Result<Vec<GeoFeature>> {
        let url = format!("{}/v1/geocode/{endpoint}", self.base_url);

        tracing::debug!(%url, "geocoding request");

        let res = self
            .http
            .get(&url)
            .query(query)
            .query(&[("apiKey", self.api_key.as_str())])
            .send()
            .await
            .with_context(|| format!("Failed to send request to Geoapify ({endpoint})"))?;

        let status = res.status();
        let body = res
            .text()
            .await
            .with_context(|| format!("Failed to read Geoapify {endpoint} response body"))?;

        if !status.is_success() {
            return Err(anyhow!(
                "Geoapify {} request failed with status {}: {}",
                endpoint,
                status,
                truncate_body(&body),
            ));
        }

        let parsed: GaResponse = serde_json::from_str(&body)
            .with_context(|| format!("Failed to parse Geoapify {endpoint} JSON"))?;

        Ok(parsed.features.into_iter().map(|f| f.properties).collect())
    }
}

#[derive(Debug, Deserialize)]
struct GaFeature {
    properties: GeoFeature,
}

#[derive(Debug, Deserialize)]
struct GaResponse {
    #[serde(default)]
    features: Vec<GaFeature>,
}

#[async_trait]
impl GeocodingProvider for GeoapifyProvider {
    async fn search(&self, text: &str, limit: usize) -> Result<Vec<GeoFeature>> {
        self.fetch(
            "search",
            &[("text", text.to_string()), ("limit", limit.to_string())],
        )
        .await
    }

    async fn reverse(&self, lat: f64, lon: f64) -> Result<Vec<GeoFeature>> {
        self.fetch("reverse", &[("lat", lat.to_string()), ("lon", lon.to_string())])
            .await
    }
}

/// Turns text or coordinates into locations. Never fails: lookups that
/// go wrong are logged and come back empty.
#[derive(Debug, Clone)]
pub struct LocationResolver {
    provider: Arc<dyn GeocodingProvider>,
}

impl LocationResolver {
    pub fn new(provider: Arc<dyn GeocodingProvider>) -> Self {
        Self { provider }
    }

    /// Candidates for `text`, in the order the geocoder ranks them.
    pub async fn search(&self, text: &str) -> Vec<GeocodeCandidate> {
        if text.chars().count() < MIN_QUERY_CHARS {
            return Vec::new();
        }

        match self.provider.search(text, SEARCH_LIMIT).await {
            Ok(features) => features
                .iter()
                .filter_map(located)
                .map(|value| GeocodeCandidate {
                    label: value.address.clone(),
                    value,
                })
                .collect(),
            Err(err) => {
                tracing::warn!(query = text, "location search failed: {err:#}");
                Vec::new()
            }
        }
    }

    /// The place at `lat`/`lon`, or `None` when the geocoder knows nothing there.
    pub async fn reverse(&self, lat: f64, lon: f64) -> Option<Location> {
        match self.provider.reverse(lat, lon).await {
            Ok(features) => features.iter().find_map(located),
            Err(err) => {
                tracing::warn!(lat, lon, "reverse geocoding failed: {err:#}");
                None
            }
        }
    }
}

fn located(feature: &GeoFeature) -> Option<Location> {
    let location = feature.to_location();
    if location.is_none() {
        tracing::debug!(address = %feature.address(), "skipping geocoder hit without coordinates");
    }
    location
}
