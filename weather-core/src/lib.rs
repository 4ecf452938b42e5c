//! Core library for the weather dashboard.
//!
//! This crate defines:
//! - The OpenWeather client and IP geolocation lookup
//! - Forecast aggregation from the 3-hour feed into daily summaries
//! - Shared domain models and typed errors
//! - Configuration & credentials handling
//!
//! It is used by `weather-dash`, but can also be reused by other binaries or services.

pub mod config;
pub mod error;
pub mod forecast;
pub mod geolocation;
pub mod model;
pub mod provider;

pub use config::{Config, ServerConfig};
pub use error::{ForecastError, ProviderError};
pub use forecast::{MAX_FORECAST_DAYS, aggregate, aggregate_in};
pub use geolocation::{GeoLocator, IpApiLocator, LocationLookup, locate_or_fallback};
pub use model::{
    Coordinates, CurrentWeather, DailyForecast, DaySummary, ForecastEntry, ForecastReport,
    Location,
};
pub use provider::{WeatherProvider, openweather::OpenWeatherProvider, provider_from_config};
