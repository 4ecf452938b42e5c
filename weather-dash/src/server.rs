//! HTTP layer: JSON endpoints plus the HTML dashboard.

use anyhow::Context;
use axum::{
    Json, Router,
    extract::{Query, State, rejection::QueryRejection},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::get,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use weather_core::{
    Config, Coordinates, CurrentWeather, DailyForecast, GeoLocator, IpApiLocator, Location,
    LocationLookup, ProviderError, WeatherProvider, locate_or_fallback, provider_from_config,
};

use crate::render;

const SERVICE_NAME: &str = "weather_dash";

/// Shared state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub provider: Arc<dyn WeatherProvider>,
    pub locator: Arc<dyn GeoLocator>,
    pub fallback: Location,
}

/// Query params for weather endpoints. Both or neither must be given.
#[derive(Debug, Default, Deserialize)]
pub struct CoordsQuery {
    pub lat: Option<f64>,
    pub lon: Option<f64>,
}

/// Error surfaced to clients as `{"error": "<message>"}`.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Provider(ProviderError),
}

impl From<ProviderError> for ApiError {
    fn from(e: ProviderError) -> Self {
        ApiError::Provider(e)
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Provider(e) => {
                let status = match &e {
                    ProviderError::MissingApiKey => StatusCode::SERVICE_UNAVAILABLE,
                    ProviderError::InvalidCoordinates { .. } => StatusCode::BAD_REQUEST,
                    _ => StatusCode::BAD_GATEWAY,
                };
                warn!(error = %e, %status, "weather request failed");
                (status, e.to_string())
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(dashboard))
        .route("/health", get(health))
        .route("/api", get(api_docs))
        .route("/api/location", get(location))
        .route("/api/weather", get(current_weather))
        .route("/api/forecast", get(forecast))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind and serve until Ctrl-C.
pub async fn serve(config: Config) -> anyhow::Result<()> {
    if !config.has_api_key() {
        warn!("no OpenWeather API key configured, weather endpoints will report an error");
    }

    let state = AppState {
        provider: Arc::new(provider_from_config(&config)),
        locator: Arc::new(IpApiLocator::new()),
        fallback: config.fallback_location.clone(),
    };

    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    info!(%addr, "weather dashboard listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("shutdown requested"),
        Err(e) => {
            warn!(error = %e, "cannot listen for Ctrl-C, running until killed");
            std::future::pending::<()>().await;
        }
    }
}

/// Explicit coordinates win; otherwise the detected (or fallback) location is used.
async fn resolve(state: &AppState, query: &CoordsQuery) -> Result<Coordinates, ApiError> {
    match (query.lat, query.lon) {
        (Some(lat), Some(lon)) => Ok(Coordinates::new(lat, lon)?),
        (None, None) => {
            let lookup = locate_or_fallback(state.locator.as_ref(), &state.fallback).await;
            Ok(lookup.location.coordinates()?)
        }
        _ => Err(ApiError::BadRequest("both lat and lon are required".to_string())),
    }
}

/// GET /health
async fn health() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": SERVICE_NAME,
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

/// GET /api
async fn api_docs() -> Json<Value> {
    Json(json!({
        "name": "Weather dashboard API",
        "version": env!("CARGO_PKG_VERSION"),
        "description": env!("CARGO_PKG_DESCRIPTION"),
        "endpoints": [
            { "path": "/", "method": "GET", "description": "Dashboard page" },
            { "path": "/health", "method": "GET", "description": "Health check" },
            { "path": "/api", "method": "GET", "description": "API documentation" },
            { "path": "/api/location", "method": "GET", "description": "Detected location" },
            {
                "path": "/api/weather",
                "method": "GET",
                "description": "Current weather, optional lat/lon",
            },
            {
                "path": "/api/forecast",
                "method": "GET",
                "description": "Daily forecast, optional lat/lon",
            },
        ],
    }))
}

/// GET /api/location
async fn location(State(state): State<AppState>) -> Json<LocationLookup> {
    Json(locate_or_fallback(state.locator.as_ref(), &state.fallback).await)
}

/// GET /api/weather
async fn current_weather(
    State(state): State<AppState>,
    query: Result<Query<CoordsQuery>, QueryRejection>,
) -> Result<Json<CurrentWeather>, ApiError> {
    let Query(query) = query?;
    let coords = resolve(&state, &query).await?;
    Ok(Json(state.provider.current(coords).await?))
}

/// GET /api/forecast
async fn forecast(
    State(state): State<AppState>,
    query: Result<Query<CoordsQuery>, QueryRejection>,
) -> Result<Json<DailyForecast>, ApiError> {
    let Query(query) = query?;
    let coords = resolve(&state, &query).await?;
    Ok(Json(state.provider.daily_forecast(coords).await?))
}

/// GET /
async fn dashboard(State(state): State<AppState>) -> Html<String> {
    let lookup = locate_or_fallback(state.locator.as_ref(), &state.fallback).await;

    let (current, daily) = match lookup.location.coordinates() {
        Ok(coords) => {
            tokio::join!(state.provider.current(coords), state.provider.daily_forecast(coords))
        }
        Err(_) => {
            let invalid = || ProviderError::InvalidCoordinates {
                latitude: lookup.location.latitude,
                longitude: lookup.location.longitude,
            };
            (Err(invalid()), Err(invalid()))
        }
    };

    Html(render::dashboard_page(&lookup, &current, &daily))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use chrono::{DateTime, FixedOffset};
    use std::sync::Mutex;
    use tower::ServiceExt;
    use weather_core::{ForecastEntry, ForecastReport};

    #[derive(Debug, Default)]
    struct StubProvider {
        missing_key: bool,
        seen: Mutex<Vec<Coordinates>>,
    }

    fn entry(ts: i64, temp: f64, desc: &str, humidity: u8, pop: f64) -> ForecastEntry {
        ForecastEntry {
            timestamp: DateTime::from_timestamp(ts, 0).unwrap(),
            temperature: temp,
            condition_description: desc.to_string(),
            condition_icon: "01d".to_string(),
            humidity,
            wind_speed: 2.0,
            precipitation_probability: pop,
        }
    }

    #[async_trait]
    impl WeatherProvider for StubProvider {
        async fn current(&self, coords: Coordinates) -> Result<CurrentWeather, ProviderError> {
            if self.missing_key {
                return Err(ProviderError::MissingApiKey);
            }
            self.seen.lock().unwrap().push(coords);

            Ok(CurrentWeather {
                location: "Springfield".into(),
                country: "US".into(),
                temperature: 21.0,
                feels_like: 20.0,
                humidity: 40,
                pressure: 1015,
                description: "clear sky".into(),
                icon: "01d".into(),
                wind_speed: 3.0,
                wind_direction: 90,
                visibility_km: 10.0,
                sunrise: DateTime::from_timestamp(1714556000, 0).unwrap(),
                sunset: DateTime::from_timestamp(1714607000, 0).unwrap(),
                timestamp: Utc::now(),
            })
        }

        async fn forecast(&self, coords: Coordinates) -> Result<ForecastReport, ProviderError> {
            if self.missing_key {
                return Err(ProviderError::MissingApiKey);
            }
            self.seen.lock().unwrap().push(coords);

            // 2024-05-01 03:00Z, 06:00Z, then 2024-05-02 01:00Z.
            Ok(ForecastReport {
                location: "Springfield".into(),
                country: "US".into(),
                utc_offset: FixedOffset::east_opt(0).unwrap(),
                entries: vec![
                    entry(1714532400, 10.0, "clear", 50, 0.0),
                    entry(1714543200, 20.0, "clear", 60, 0.2),
                    entry(1714611600, 5.0, "rain", 70, 0.9),
                ],
            })
        }
    }

    #[derive(Debug)]
    struct StubLocator(Option<Location>);

    #[async_trait]
    impl GeoLocator for StubLocator {
        async fn locate(&self) -> Result<Location, ProviderError> {
            self.0
                .clone()
                .ok_or_else(|| ProviderError::UnexpectedResponse("no location".into()))
        }
    }

    fn lyon() -> Location {
        Location {
            latitude: 45.75,
            longitude: 4.85,
            city: "Lyon".into(),
            region: "Auvergne-Rhone-Alpes".into(),
            country: "France".into(),
        }
    }

    fn app_with(provider: Arc<StubProvider>, located: Option<Location>) -> Router {
        app_with_fallback(provider, located, Location::default())
    }

    fn app_with_fallback(
        provider: Arc<StubProvider>,
        located: Option<Location>,
        fallback: Location,
    ) -> Router {
        router(AppState { provider, locator: Arc::new(StubLocator(located)), fallback })
    }

    async fn get(app: Router, uri: &str) -> (StatusCode, Vec<u8>) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, body.to_vec())
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
        let (status, body) = get(app, uri).await;
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn health_reports_service() {
        let (status, body) = get_json(app_with(Arc::default(), None), "/health").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["service"], SERVICE_NAME);
        assert!(body["timestamp"].is_string());
    }

    #[tokio::test]
    async fn api_docs_list_endpoints() {
        let (_, body) = get_json(app_with(Arc::default(), None), "/api").await;

        let paths: Vec<_> = body["endpoints"]
            .as_array()
            .unwrap()
            .iter()
            .map(|e| e["path"].as_str().unwrap().to_string())
            .collect();
        assert!(paths.contains(&"/api/forecast".to_string()));
        assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    }

    #[tokio::test]
    async fn location_falls_back_with_error() {
        let (status, body) = get_json(app_with(Arc::default(), None), "/api/location").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["city"], "Montreal");
        assert!(body["latitude"].is_number());
        assert!(body["error"].as_str().unwrap().starts_with("Could not detect location"));
    }

    #[tokio::test]
    async fn location_reports_detected_place() {
        let (_, body) = get_json(app_with(Arc::default(), Some(lyon())), "/api/location").await;

        assert_eq!(body["city"], "Lyon");
        assert!(body.get("error").is_none());
    }

    #[tokio::test]
    async fn missing_key_is_reported_as_error_json() {
        let provider = Arc::new(StubProvider { missing_key: true, ..Default::default() });

        for uri in ["/api/weather", "/api/forecast"] {
            let (status, body) = get_json(app_with(provider.clone(), None), uri).await;
            assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
            assert_eq!(body, json!({ "error": "API key not configured" }));
        }
    }

    #[tokio::test]
    async fn forecast_returns_daily_summaries() {
        let provider = Arc::new(StubProvider::default());
        let (status, body) =
            get_json(app_with(provider.clone(), None), "/api/forecast?lat=39.8&lon=-89.6").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["location"], "Springfield");

        let days = body["forecasts"].as_array().unwrap();
        assert_eq!(days.len(), 2);
        assert_eq!(
            days[0],
            json!({
                "date": "2024-05-01",
                "temp_high": 20.0,
                "temp_low": 10.0,
                "description": "clear",
                "icon": "01d",
                "humidity": 55,
                "wind_speed": 2.0,
                "rain_chance": 20.0
            })
        );
        assert_eq!(days[1]["rain_chance"], 90.0);

        let seen = provider.seen.lock().unwrap();
        assert_eq!(seen.as_slice(), &[Coordinates::new(39.8, -89.6).unwrap()]);
    }

    #[tokio::test]
    async fn weather_uses_detected_location_without_coordinates() {
        let provider = Arc::new(StubProvider::default());
        let app = app_with(provider.clone(), Some(lyon()));
        let (status, body) = get_json(app, "/api/weather").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["description"], "clear sky");
        assert_eq!(provider.seen.lock().unwrap()[0], lyon().coordinates().unwrap());
    }

    #[tokio::test]
    async fn lone_coordinate_is_bad_request() {
        let (status, body) = get_json(app_with(Arc::default(), None), "/api/forecast?lat=10").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "both lat and lon are required");
    }

    #[tokio::test]
    async fn out_of_range_coordinates_are_bad_request() {
        let (status, body) =
            get_json(app_with(Arc::default(), None), "/api/weather?lat=95&lon=10").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("invalid coordinates"));
    }

    #[tokio::test]
    async fn unparsable_coordinates_are_bad_request_json() {
        let uris = ["/api/forecast?lat=abc&lon=1", "/api/weather?lat=&lon=", "/api/weather?lon=x"];
        for uri in uris {
            let (status, body) = get(app_with(Arc::default(), None), uri).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");

            let json: Value = serde_json::from_slice(&body).expect("error body is JSON");
            let error = json["error"].as_str().expect("error field is a string");
            assert!(!error.is_empty(), "{uri}");
        }
    }

    #[tokio::test]
    async fn dashboard_renders_html() {
        let (status, body) = get(app_with(Arc::default(), Some(lyon())), "/").await;
        let html = String::from_utf8(body).unwrap();

        assert_eq!(status, StatusCode::OK);
        assert!(html.contains("Weather App"));
        assert!(html.contains("Lyon"));
        assert!(html.contains("<table>"));
    }

    #[tokio::test]
    async fn dashboard_shows_provider_error_inline() {
        let provider = Arc::new(StubProvider { missing_key: true, ..Default::default() });
        let (status, body) = get(app_with(provider, None), "/").await;
        let html = String::from_utf8(body).unwrap();

        assert_eq!(status, StatusCode::OK);
        assert!(html.contains("API key not configured"));
        assert!(html.contains("Could not detect location"));
    }

    #[tokio::test]
    async fn dashboard_reports_invalid_fallback_coordinates() {
        let fallback = Location { latitude: 120.0, ..Location::default() };
        let (status, body) = get(app_with_fallback(Arc::default(), None, fallback), "/").await;
        let html = String::from_utf8(body).unwrap();

        assert_eq!(status, StatusCode::OK);
        assert_eq!(html.matches("invalid coordinates: latitude 120").count(), 2);
        // Only the failed location lookup mentions the provider response.
        assert_eq!(html.matches("Unexpected API response format").count(), 1);
    }
}
