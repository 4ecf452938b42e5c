//! Caller location detection through IP geolocation (ipapi.co).

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::{fmt::Debug, time::Duration};
use tracing::{debug, warn};

use crate::{error::ProviderError, model::Location, provider::fetch_json};

pub const IPAPI_URL: &str = "https://ipapi.co/json/";

const LOOKUP_TIMEOUT: Duration = Duration::from_secs(5);

#[async_trait]
pub trait GeoLocator: Send + Sync + Debug {
    async fn locate(&self) -> Result<Location, ProviderError>;
}

#[derive(Debug, Clone)]
pub struct IpApiLocator {
    url: String,
    http: Client,
}

impl IpApiLocator {
    pub fn new() -> Self {
        Self::with_url(IPAPI_URL)
    }

    pub fn with_url(url: impl Into<String>) -> Self {
        Self { url: url.into(), http: Client::new() }
    }
}

impl Default for IpApiLocator {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Deserialize)]
struct IpApiResponse {
    latitude: f64,
    longitude: f64,
    city: String,
    region: String,
    country_name: String,
}

#[async_trait]
impl GeoLocator for IpApiLocator {
    async fn locate(&self) -> Result<Location, ProviderError> {
        debug!(url = %self.url, "detecting location");

        let request = self.http.get(&self.url).timeout(LOOKUP_TIMEOUT);
        let parsed: IpApiResponse = fetch_json(request, "Geolocation").await?;

        Ok(Location {
            latitude: parsed.latitude,
            longitude: parsed.longitude,
            city: parsed.city,
            region: parsed.region,
            country: parsed.country_name,
        })
    }
}

/// Result of a location lookup that never fails: `error` is set when the fallback was used.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocationLookup {
    #[serde(flatten)]
    pub location: Location,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub async fn locate_or_fallback(locator: &dyn GeoLocator, fallback: &Location) -> LocationLookup {
    match locator.locate().await {
        Ok(location) => LocationLookup { location, error: None },
        Err(e) => {
            warn!(error = %e, city = %fallback.city, "location detection failed, using fallback");
            LocationLookup {
                location: fallback.clone(),
                error: Some(format!("Could not detect location: {e}")),
            }
        }
    }
}
