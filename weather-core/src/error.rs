use reqwest::StatusCode;
use thiserror::Error;

/// Failure while turning forecast entries into daily summaries.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ForecastError {
    #[error("malformed forecast entry #{index}: {reason}")]
    MalformedEntry { index: usize, reason: String },
}

impl ForecastError {
    pub(crate) fn malformed(index: usize, reason: impl Into<String>) -> Self {
        ForecastError::MalformedEntry { index, reason: reason.into() }
    }
}

/// Errors surfaced by the weather and geolocation clients.
///
/// The `Display` text is what the dashboard shows to the user, so it is kept short.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("API key not configured")]
    MissingApiKey,

    #[error("API request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("API request failed with status {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("Unexpected API response format: {0}")]
    UnexpectedResponse(String),

    #[error("invalid coordinates: latitude {latitude}, longitude {longitude}")]
    InvalidCoordinates { latitude: f64, longitude: f64 },

    #[error(transparent)]
    Forecast(#[from] ForecastError),
}

impl ProviderError {
    /// Transport failures, timeouts and non-2xx answers. The caller may try again later;
    /// nothing in this crate retries on its own.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, ProviderError::Request(_) | ProviderError::Status { .. })
    }
}
