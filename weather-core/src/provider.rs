use crate::{
    Config,
    error::ProviderError,
    model::{Coordinates, CurrentWeather, DailyForecast, ForecastReport},
    provider::openweather::OpenWeatherProvider,
};
use async_trait::async_trait;
use reqwest::RequestBuilder;
use serde::de::DeserializeOwned;
use std::fmt::Debug;
use tracing::warn;

pub mod openweather;

#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    async fn current(&self, coords: Coordinates) -> Result<CurrentWeather, ProviderError>;

    /// Raw 3-hour forecast feed, in the provider's chronological order.
    async fn forecast(&self, coords: Coordinates) -> Result<ForecastReport, ProviderError>;

    /// Forecast feed folded into a daily outlook.
    async fn daily_forecast(&self, coords: Coordinates) -> Result<DailyForecast, ProviderError> {
        let report = self.forecast(coords).await?;
        Ok(DailyForecast::from_report(report)?)
    }
}

/// Construct the OpenWeather client from config. A missing API key is reported on first use.
pub fn provider_from_config(config: &Config) -> OpenWeatherProvider {
    OpenWeatherProvider::new(config.api_key.clone())
}

/// Send a request and decode its JSON body, mapping each failure to its `ProviderError`.
pub(crate) async fn fetch_json<T: DeserializeOwned>(
    request: RequestBuilder,
    what: &str,
) -> Result<T, ProviderError> {
    let res = request.send().await.inspect_err(|e| warn!(error = %e, "{what} request failed"))?;

    let status = res.status();
    let body = res.text().await?;

    if !status.is_success() {
        warn!(%status, "{what} request returned an error status");
        return Err(ProviderError::Status { status, body: truncate_body(&body) });
    }

    serde_json::from_str(&body).map_err(|e| {
        warn!(error = %e, "{what} response did not match the expected shape");
        ProviderError::UnexpectedResponse(e.to_string())
    })
}

pub(crate) fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((cut, _)) => format!("{}...", &body[..cut]),
        None => body.to_string(),
    }
}
