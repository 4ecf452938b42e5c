use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;

/// A validated latitude/longitude pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, ProviderError> {
        if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
            return Err(ProviderError::InvalidCoordinates { latitude, longitude });
        }

        Ok(Self { latitude, longitude })
    }
}

/// A named place, as reported by IP geolocation or configured as fallback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
    pub city: String,
    pub region: String,
    pub country: String,
}

impl Location {
    pub fn coordinates(&self) -> Result<Coordinates, ProviderError> {
        Coordinates::new(self.latitude, self.longitude)
    }
}

impl Default for Location {
    /// Montreal, used whenever the caller's location cannot be detected.
    fn default() -> Self {
        Self {
            latitude: 45.5017,
            longitude: -73.5673,
            city: "Montreal".to_string(),
            region: "Quebec".to_string(),
            country: "Canada".to_string(),
        }
    }
}

/// Current conditions at a location, in metric units.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CurrentWeather {
    pub location: String,
    pub country: String,
    pub temperature: f64,
    pub feels_like: f64,
    pub humidity: u8,
    pub pressure: u32,
    pub description: String,
    pub icon: String,
    pub wind_speed: f64,
    pub wind_direction: u16,
    pub visibility_km: f64,
    pub sunrise: DateTime<Utc>,
    pub sunset: DateTime<Utc>,
    pub timestamp: DateTime<Utc>,
}

/// One 3-hour slice of the provider's forecast feed.
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastEntry {
    pub timestamp: DateTime<Utc>,
    pub temperature: f64,
    pub condition_description: String,
    pub condition_icon: String,
    pub humidity: u8,
    pub wind_speed: f64,
    /// Chance of precipitation in [0, 1].
    pub precipitation_probability: f64,
}

/// Aggregated outlook for one calendar day.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DaySummary {
    pub date: NaiveDate,
    pub temp_high: f64,
    pub temp_low: f64,
    pub description: String,
    pub icon: String,
    pub humidity: u8,
    pub wind_speed: f64,
    /// Highest precipitation probability of the day, as a percentage.
    pub rain_chance: f64,
}

/// Raw forecast feed for one location, ordered by time.
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastReport {
    pub location: String,
    pub country: String,
    /// Local time offset of the location; calendar days are cut in this zone.
    pub utc_offset: FixedOffset,
    pub entries: Vec<ForecastEntry>,
}

/// Daily outlook served to the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyForecast {
    pub location: String,
    pub country: String,
    pub forecasts: Vec<DaySummary>,
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coordinates_reject_out_of_range_values() {
        assert!(Coordinates::new(45.5, -73.5).is_ok());
        assert!(Coordinates::new(90.0, 180.0).is_ok());
        assert!(Coordinates::new(90.1, 0.0).is_err());
        assert!(Coordinates::new(0.0, -180.5).is_err());
        assert!(Coordinates::new(f64::NAN, 0.0).is_err());
    }

    #[test]
    fn default_location_is_montreal() {
        let loc = Location::default();
        assert_eq!(loc.city, "Montreal");
        let coords = loc.coordinates().expect("fallback coordinates are valid");
        assert_eq!(coords.latitude, 45.5017);
    }

    #[test]
    fn day_summary_serializes_plain_date() {
        let day = DaySummary {
            date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            temp_high: 20.0,
            temp_low: 10.0,
            description: "clear sky".into(),
            icon: "01d".into(),
            humidity: 55,
            wind_speed: 2.0,
            rain_chance: 20.0,
        };

        let json = serde_json::to_value(&day).unwrap();
        assert_eq!(json["date"], "2024-05-01");
        assert_eq!(json["humidity"], 55);
        assert_eq!(json["rain_chance"], 20.0);
    }
}
