use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, Utc};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use crate::{
    error::ProviderError,
    model::{Coordinates, CurrentWeather, ForecastEntry, ForecastReport},
};

use super::{WeatherProvider, fetch_json};

pub const DEFAULT_BASE_URL: &str = "https://api.openweathermap.org/data/2.5";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// OpenWeather client for current conditions and the 5-day/3-hour forecast, in metric units.
#[derive(Debug, Clone)]
pub struct OpenWeatherProvider {
    api_key: Option<String>,
    base_url: String,
    timeout: Duration,
    http: Client,
}

impl OpenWeatherProvider {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            api_key: api_key.filter(|key| !key.trim().is_empty()),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: REQUEST_TIMEOUT,
            http: Client::new(),
        }
    }

    /// Point the client at another server, e.g. a mock in tests.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Per-request timeout, 10 seconds unless overridden.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    async fn get<T: serde::de::DeserializeOwned>(
        &self,
        endpoint: &str,
        coords: Coordinates,
    ) -> Result<T, ProviderError> {
        let api_key = self.api_key.as_deref().ok_or(ProviderError::MissingApiKey)?;
        let url = format!("{}/{endpoint}", self.base_url);

        debug!(%url, lat = coords.latitude, lon = coords.longitude, "requesting OpenWeather");

        let request = self
            .http
            .get(&url)
            .query(&[
                ("lat", coords.latitude.to_string().as_str()),
                ("lon", coords.longitude.to_string().as_str()),
                ("appid", api_key),
                ("units", "metric"),
            ])
            .timeout(self.timeout);

        fetch_json(request, "OpenWeather").await
    }
}

#[derive(Debug, Deserialize)]
struct OwMain {
    temp: f64,
    feels_like: f64,
    humidity: u8,
    pressure: u32,
}

#[derive(Debug, Deserialize)]
struct OwForecastMain {
    temp: f64,
    humidity: u8,
}

#[derive(Debug, Deserialize)]
struct OwWeather {
    description: String,
    icon: String,
}

#[derive(Debug, Deserialize)]
struct OwWind {
    speed: f64,
    #[serde(default)]
    deg: u16,
}

#[derive(Debug, Deserialize)]
struct OwSys {
    country: String,
    sunrise: i64,
    sunset: i64,
}

#[derive(Debug, Deserialize)]
struct OwCurrentResponse {
    name: String,
    main: OwMain,
    weather: Vec<OwWeather>,
    wind: OwWind,
    #[serde(default)]
    visibility: u32,
    sys: OwSys,
}

#[derive(Debug, Deserialize)]
struct OwCity {
    name: String,
    country: String,
    /// Shift from UTC in seconds.
    #[serde(default)]
    timezone: i32,
}

#[derive(Debug, Deserialize)]
struct OwForecastEntry {
    dt: i64,
    main: OwForecastMain,
    weather: Vec<OwWeather>,
    wind: OwWind,
    #[serde(default)]
    pop: f64,
}

#[derive(Debug, Deserialize)]
struct OwForecastResponse {
    city: OwCity,
    list: Vec<OwForecastEntry>,
}

impl OwCurrentResponse {
    fn into_current(self) -> Result<CurrentWeather, ProviderError> {
        let condition = self
            .weather
            .into_iter()
            .next()
            .ok_or_else(|| unexpected("current weather has no condition"))?;

        Ok(CurrentWeather {
            location: self.name,
            country: self.sys.country,
            temperature: self.main.temp,
            feels_like: self.main.feels_like,
            humidity: self.main.humidity,
            pressure: self.main.pressure,
            description: condition.description,
            icon: condition.icon,
            wind_speed: self.wind.speed,
            wind_direction: self.wind.deg,
            visibility_km: f64::from(self.visibility) / 1000.0,
            sunrise: unix_to_utc(self.sys.sunrise)?,
            sunset: unix_to_utc(self.sys.sunset)?,
            timestamp: Utc::now(),
        })
    }
}

impl OwForecastResponse {
    fn into_report(self) -> Result<ForecastReport, ProviderError> {
        let offset = self.city.timezone;
        let utc_offset = FixedOffset::east_opt(offset)
            .ok_or_else(|| unexpected(format!("timezone offset {offset} out of range")))?;

        let entries = self
            .list
            .into_iter()
            .enumerate()
            .map(|(index, item)| item.into_entry(index))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(ForecastReport {
            location: self.city.name,
            country: self.city.country,
            utc_offset,
            entries,
        })
    }
}

impl OwForecastEntry {
    fn into_entry(self, index: usize) -> Result<ForecastEntry, ProviderError> {
        let condition = self
            .weather
            .into_iter()
            .next()
            .ok_or_else(|| unexpected(format!("forecast item #{index} has no condition")))?;

        Ok(ForecastEntry {
            timestamp: unix_to_utc(self.dt)?,
            temperature: self.main.temp,
            condition_description: condition.description,
            condition_icon: condition.icon,
            humidity: self.main.humidity,
            wind_speed: self.wind.speed,
            precipitation_probability: self.pop,
        })
    }
}

#[async_trait]
impl WeatherProvider for OpenWeatherProvider {
    async fn current(&self, coords: Coordinates) -> Result<CurrentWeather, ProviderError> {
        let parsed: OwCurrentResponse = self.get("weather", coords).await?;
        parsed.into_current()
    }

    async fn forecast(&self, coords: Coordinates) -> Result<ForecastReport, ProviderError> {
        let parsed: OwForecastResponse = self.get("forecast", coords).await?;
        let report = parsed.into_report()?;
        debug!(location = %report.location, entries = report.entries.len(), "forecast received");
        Ok(report)
    }
}

fn unix_to_utc(ts: i64) -> Result<DateTime<Utc>, ProviderError> {
    DateTime::from_timestamp(ts, 0)
        .ok_or_else(|| unexpected(format!("timestamp {ts} out of range")))
}

fn unexpected(msg: impl Into<String>) -> ProviderError {
    ProviderError::UnexpectedResponse(msg.into())
}
