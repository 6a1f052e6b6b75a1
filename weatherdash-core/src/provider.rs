use crate::{
    Config,
    geocode::{GeoapifyProvider, GeocodingProvider},
    model::{CurrentConditions, Forecast, Location, Unit},
    provider::openweather::OpenWeatherProvider,
};
use async_trait::async_trait;
use std::{convert::TryFrom, fmt::Debug, sync::Arc};

pub mod openweather;

/// External services that need an API key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderId {
    OpenWeather,
    Geoapify,
}

impl ProviderId {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderId::OpenWeather => "openweather",
            ProviderId::Geoapify => "geoapify",
        }
    }

    /// Environment variable that overrides the configured key.
    pub fn env_var(&self) -> &'static str {
        match self {
            ProviderId::OpenWeather => "OPENWEATHER_API_KEY",
            ProviderId::Geoapify => "GEOAPIFY_API_KEY",
        }
    }

    pub const fn all() -> &'static [ProviderId] {
        &[ProviderId::OpenWeather, ProviderId::Geoapify]
    }
}

impl std::fmt::Display for ProviderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for ProviderId {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let lower = value.to_lowercase();

        match lower.as_str() {
            "openweather" => Ok(ProviderId::OpenWeather),
            "geoapify" => Ok(ProviderId::Geoapify),
            _ => Err(anyhow::anyhow!(
                "Unknown provider '{value}'. Supported providers: openweather, geoapify."
            )),
        }
    }
}

#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    async fn current(&self, location: &Location, unit: Unit) -> anyhow::Result<CurrentConditions>;

    async fn forecast(&self, location: &Location, unit: Unit) -> anyhow::Result<Forecast>;
}

/// Weather lookups that degrade to "no data" instead of failing.
#[derive(Debug, Clone)]
pub struct WeatherService {
    provider: Arc<dyn WeatherProvider>,
}

impl WeatherService {
    pub fn new(provider: Arc<dyn WeatherProvider>) -> Self {
        Self { provider }
    }

    pub async fn current(&self, location: &Location, unit: Unit) -> Option<CurrentConditions> {
        match self.provider.current(location, unit).await {
            Ok(current) => Some(current),
            Err(err) => {
                tracing::warn!(address = %location.address, "current weather unavailable: {err:#}");
                None
            }
        }
    }

    pub async fn forecast(&self, location: &Location, unit: Unit) -> Option<Forecast> {
        match self.provider.forecast(location, unit).await {
            Ok(forecast) => Some(forecast),
            Err(err) => {
                tracing::warn!(address = %location.address, "forecast unavailable: {err:#}");
                None
            }
        }
    }

    /// Current conditions for every location, fetched in parallel. Results
    /// line up with `locations`; a failed fetch only blanks its own slot.
    pub async fn compare(&self, locations: &[Location], unit: Unit) -> Vec<Option<CurrentConditions>> {
        let fetches = locations.iter().map(|loc| self.current(loc, unit));
        futures::future::join_all(fetches).await
    }
}

/// Resolve the API key for `id`: environment first, then the config file.
pub fn api_key(id: ProviderId, config: &Config) -> anyhow::Result<String> {
    if let Ok(key) = std::env::var(id.env_var()) {
        if !key.trim().is_empty() {
            return Ok(key);
        }
    }

    config.provider_api_key(id).map(str::to_owned).ok_or_else(|| {
        anyhow::anyhow!(
            "No API key configured for provider '{id}'.\n\
                 Hint: run `weatherdash configure` or set {}.",
            id.env_var()
        )
    })
}

pub fn weather_provider_from_config(config: &Config) -> anyhow::Result<Arc<dyn WeatherProvider>> {
    let key = api_key(ProviderId::OpenWeather, config)?;
    Ok(Arc::new(OpenWeatherProvider::new(key)))
}

pub fn geocoder_from_config(config: &Config) -> anyhow::Result<Arc<dyn GeocodingProvider>> {
    let key = api_key(ProviderId::Geoapify, config)?;
    Ok(Arc::new(GeoapifyProvider::new(key)))
}

pub(crate) fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    if body.len() > MAX {
        let cut = (0..=MAX).rev().find(|&i| body.is_char_boundary(i)).unwrap_or(0);
        format!("{}...", &body[..cut])
    } else {
        body.to_string()
    }
}
