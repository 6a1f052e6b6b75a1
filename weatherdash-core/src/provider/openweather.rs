use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;

use crate::model::{Clouds, Condition, CurrentConditions, Forecast, Location, SampleMain, Unit, Wind};

use super::{WeatherProvider, truncate_body};

pub const OPENWEATHER_BASE_URL: &str = "https://api.openweathermap.org/data/2.5";

#[derive(Debug, Clone)]
pub struct OpenWeatherProvider {
    api_key: String,
    base_url: String,
    http: Client,
}

impl OpenWeatherProvider {
    pub fn new(api_key: String) -> Self {
        Self::with_base_url(api_key, OPENWEATHER_BASE_URL)
    }

    pub fn with_base_url(api_key: String, base_url: &str) -> Self {
        Self {
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            http: Client::new(),
        }
    }

    async fn get_json(&self, endpoint: &str, location: &Location, unit: Unit) -> Result<String> {
        let url = format!("{}/{endpoint}", self.base_url);

        tracing::debug!(%url, lat = location.lat, lon = location.lon, units = unit.as_query(), "weather request");

        let res = self
            .http
            .get(&url)
            .query(&[
                ("lat", location.lat.to_string()),
                ("lon", location.lon.to_string()),
                ("units", unit.as_query().to_string()),
                ("appid", self.api_key.clone()),
            ])
            .send()
            .await
            .with_context(|| format!("Failed to send request to OpenWeather ({endpoint})"))?;

        let status = res.status();
        let body = res
            .text()
            .await
            .with_context(|| format!("Failed to read OpenWeather {endpoint} response body"))?;

        if !status.is_success() {
            return Err(anyhow!(
                "OpenWeather {} request failed with status {}: {}",
                endpoint,
                status,
                truncate_body(&body),
            ));
        }

        Ok(body)
    }
}

#[derive(Debug, Deserialize)]
struct OwSys {
    sunrise: Option<i64>,
    sunset: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct OwCurrentResponse {
    #[serde(default)]
    name: String,
    dt: i64,
    main: SampleMain,
    #[serde(default)]
    weather: Vec<Condition>,
    #[serde(default)]
    wind: Wind,
    #[serde(default)]
    clouds: Clouds,
    visibility: Option<f64>,
    sys: Option<OwSys>,
}

impl From<OwCurrentResponse> for CurrentConditions {
    fn from(parsed: OwCurrentResponse) -> Self {
        let condition = parsed.weather.into_iter().next();
        let (sunrise, sunset) = parsed
            .sys
            .map(|s| (s.sunrise.and_then(unix_to_utc), s.sunset.and_then(unix_to_utc)))
            .unwrap_or((None, None));

        CurrentConditions {
            name: parsed.name,
            observed_at: unix_to_utc(parsed.dt).unwrap_or_else(Utc::now),
            temp: parsed.main.temp,
            feels_like: parsed.main.feels_like,
            temp_min: parsed.main.temp_min,
            temp_max: parsed.main.temp_max,
            humidity: parsed.main.humidity,
            pressure: parsed.main.pressure,
            wind_speed: parsed.wind.speed,
            clouds: parsed.clouds.all,
            visibility: parsed.visibility,
            sunrise,
            sunset,
            condition: condition.as_ref().map(|c| c.main.clone()),
            description: condition.as_ref().map(|c| c.description.clone()),
            icon: condition.map(|c| c.icon),
        }
    }
}

#[async_trait]
impl WeatherProvider for OpenWeatherProvider {
    async fn current(&self, location: &Location, unit: Unit) -> Result<CurrentConditions> {
        let body = self.get_json("weather", location, unit).await?;

        let parsed: OwCurrentResponse =
            serde_json::from_str(&body).context("Failed to parse OpenWeather current JSON")?;

        Ok(parsed.into())
    }

    async fn forecast(&self, location: &Location, unit: Unit) -> Result<Forecast> {
        let body = self.get_json("forecast", location, unit).await?;

        let parsed: Forecast =
            serde_json::from_str(&body).context("Failed to parse OpenWeather forecast JSON")?;

        tracing::debug!(samples = parsed.list.len(), "forecast received");
        Ok(parsed)
    }
}

fn unix_to_utc(ts: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(ts, 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn current_response_maps_to_conditions() {
        let parsed: OwCurrentResponse = serde_json::from_value(serde_json::json!({
            "name": "Delhi",
            "dt": 1700000000,
            "main": {
                "temp": 25.3, "feels_like": 26.0, "temp_min": 24.0,
                "temp_max": 27.0, "pressure": 1011, "humidity": 40
            },
            "weather": [{ "main": "Haze", "description": "haze", "icon": "50d" }],
            "wind": { "speed": 1.5 },
            "clouds": { "all": 0 },
            "visibility": 3000,
            "sys": { "sunrise": 1699922000, "sunset": 1699961000 }
        }))
        .unwrap();

        let current = CurrentConditions::from(parsed);
        assert_eq!(current.name, "Delhi");
        assert_eq!(current.observed_at.timestamp(), 1700000000);
        assert_eq!(current.condition.as_deref(), Some("Haze"));
        assert_eq!(current.icon.as_deref(), Some("50d"));
        assert_eq!(current.visibility, Some(3000.0));
        assert_eq!(current.sunrise.map(|t| t.timestamp()), Some(1699922000));
    }

    #[test]
    fn current_response_without_optional_blocks() {
        let parsed: OwCurrentResponse = serde_json::from_value(serde_json::json!({
            "dt": 1700000000,
            "main": {
                "temp": 1.0, "feels_like": 1.0, "temp_min": 1.0,
                "temp_max": 1.0, "pressure": 1000, "humidity": 90
            }
        }))
        .unwrap();

        let current = CurrentConditions::from(parsed);
        assert_eq!(current.condition, None);
        assert_eq!(current.sunrise, None);
        assert_eq!(current.wind_speed, 0.0);
    }
}
