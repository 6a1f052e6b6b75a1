//! Core library for the `weatherdash` dashboard.
//!
//! This crate defines:
//! - Location resolution (forward/reverse geocoding, debounced search)
//! - Forecast aggregation into daily buckets and chart rows
//! - Weather providers and the degrade-to-empty service around them
//! - Configuration and the persisted session selection
//!
//! It is used by `weatherdash-cli`, but can also be reused by other front ends.

pub mod aggregate;
pub mod compare;
pub mod config;
pub mod debounce;
pub mod geocode;
pub mod model;
pub mod provider;
pub mod state;

pub use aggregate::{DailyBucket, HourlyRow, WeeklyRow, bucket_by_day, hourly_view, weekly_overview};
pub use compare::{CompareError, ComparisonRow, ComparisonSet};
pub use config::{Config, ProviderConfig};
pub use debounce::{DebouncedSearch, Debouncer, SEARCH_DEBOUNCE};
pub use geocode::{GeoapifyProvider, GeocodingProvider, LocationResolver};
pub use model::{CurrentConditions, Forecast, ForecastSample, GeocodeCandidate, Location, Theme, Unit};
pub use provider::{ProviderId, WeatherProvider, WeatherService};
pub use state::{AppState, LocationStore, Selection};
