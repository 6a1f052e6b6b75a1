//! Integration tests for the OpenWeather provider, end to end through the
//! aggregator.

use std::sync::Arc;

use chrono::Utc;
use weatherdash_core::provider::openweather::OpenWeatherProvider;
use weatherdash_core::{Location, Unit, WeatherProvider, WeatherService, bucket_by_day};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn delhi() -> Location {
    Location::fallback()
}

fn entry(dt: i64, temp: f64, main: &str, icon: &str) -> serde_json::Value {
    serde_json::json!({
        "dt": dt,
        "main": {
            "temp": temp, "feels_like": temp, "temp_min": temp, "temp_max": temp,
            "pressure": 1010, "humidity": 50
        },
        "weather": [{ "main": main, "description": main.to_lowercase(), "icon": icon }],
        "clouds": { "all": 75 },
        "wind": { "speed": 4.2 },
        "pop": 0.5
    })
}

#[tokio::test]
async fn test_current_requests_metric_units() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/weather"))
        .and(query_param("units", "metric"))
        .and(query_param("appid", "OW"))
        .and(query_param("lat", "28.6138954"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "name": "New Delhi",
            "dt": 1700000000,
            "main": {
                "temp": 22.5, "feels_like": 22.0, "temp_min": 21.0,
                "temp_max": 24.0, "pressure": 1015, "humidity": 45
            },
            "weather": [{ "main": "Smoke", "description": "smoke", "icon": "50n" }],
            "wind": { "speed": 2.1 },
            "clouds": { "all": 10 },
            "visibility": 1500,
            "sys": { "sunrise": 1699922000, "sunset": 1699961000 }
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let provider = OpenWeatherProvider::with_base_url("OW".to_string(), &mock_server.uri());
    let current = provider.current(&delhi(), Unit::Celsius).await.unwrap();

    assert_eq!(current.name, "New Delhi");
    assert_eq!(current.temp, 22.5);
    assert_eq!(current.condition.as_deref(), Some("Smoke"));
    assert_eq!(current.visibility, Some(1500.0));
}

#[tokio::test]
async fn test_forecast_imperial_feeds_aggregator() {
    let mock_server = MockServer::start().await;
    let start = 1_704_067_200; // 2024-01-01T00:00:00Z

    let list: Vec<serde_json::Value> = [10.0, 12.0, 15.0, 18.0, 17.0, 14.0, 11.0, 9.0, 8.0]
        .iter()
        .enumerate()
        .map(|(i, &t)| entry(start + i as i64 * 10_800, t, "Clouds", "04d"))
        .collect();

    Mock::given(method("GET"))
        .and(path("/forecast"))
        .and(query_param("units", "imperial"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "city": { "name": "New Delhi", "country": "IN", "timezone": 19800 },
            "list": list
        })))
        .mount(&mock_server)
        .await;

    let provider = OpenWeatherProvider::with_base_url("OW".to_string(), &mock_server.uri());
    let forecast = provider.forecast(&delhi(), Unit::Fahrenheit).await.unwrap();
    assert_eq!(forecast.list.len(), 9);
    assert_eq!(forecast.city.timezone, 19800);

    let buckets = bucket_by_day(&forecast.list, &Utc);
    assert_eq!(buckets.len(), 2);
    assert_eq!(buckets[0].samples.len(), 8);
    assert_eq!(buckets[0].avg_temp, 13.3);
    assert_eq!(buckets[0].avg_pop, 50);
    assert_eq!(buckets[0].dominant_weather.as_deref(), Some("Clouds"));
    assert_eq!(buckets[1].min_temp, 8.0);
}

#[tokio::test]
async fn test_service_degrades_http_errors() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
            "cod": 401, "message": "Invalid API key"
        })))
        .mount(&mock_server)
        .await;

    let provider = OpenWeatherProvider::with_base_url("BAD".to_string(), &mock_server.uri());

    let err = provider.forecast(&delhi(), Unit::Celsius).await.unwrap_err();
    assert!(err.to_string().contains("401"));

    let service = WeatherService::new(Arc::new(provider));
    assert!(service.current(&delhi(), Unit::Celsius).await.is_none());
    assert!(service.forecast(&delhi(), Unit::Celsius).await.is_none());
}
