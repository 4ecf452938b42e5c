//! Daily outlook built from the provider's 3-hour forecast feed.
//!
//! Entries are grouped by contiguous runs of the same calendar date (no re-sorting),
//! each run is folded into a [`DaySummary`], and only the first
//! [`MAX_FORECAST_DAYS`] days are kept.

use chrono::{NaiveDate, TimeZone, Utc};

use crate::{
    error::ForecastError,
    model::{DailyForecast, DaySummary, ForecastEntry, ForecastReport},
};

/// Number of days kept in an outlook.
pub const MAX_FORECAST_DAYS: usize = 7;

/// Aggregate entries into daily summaries, cutting calendar days in UTC.
pub fn aggregate(entries: &[ForecastEntry]) -> Result<Vec<DaySummary>, ForecastError> {
    aggregate_in(entries, &Utc)
}

/// Aggregate entries into daily summaries, cutting calendar days in `tz`.
///
/// `entries` must already be in non-decreasing timestamp order. A single malformed
/// entry fails the whole call; empty input yields an empty outlook.
pub fn aggregate_in<Tz: TimeZone>(
    entries: &[ForecastEntry],
    tz: &Tz,
) -> Result<Vec<DaySummary>, ForecastError> {
    for (index, entry) in entries.iter().enumerate() {
        validate(index, entry)?;
    }

    let mut days = Vec::new();
    let mut bucket: Option<DayBucket<'_>> = None;

    for entry in entries {
        let date = entry.timestamp.with_timezone(tz).date_naive();

        let same_day = bucket.as_ref().is_some_and(|open| open.date == date);
        if !same_day {
            if let Some(done) = bucket.take() {
                days.push(done.finish());
            }
        }

        bucket.get_or_insert_with(|| DayBucket::new(date)).push(entry);
    }

    if let Some(done) = bucket {
        days.push(done.finish());
    }

    days.truncate(MAX_FORECAST_DAYS);
    Ok(days)
}

impl DailyForecast {
    /// Build the dashboard outlook, cutting days in the location's own time zone.
    pub fn from_report(report: ForecastReport) -> Result<Self, ForecastError> {
        let forecasts = aggregate_in(&report.entries, &report.utc_offset)?;

        Ok(Self {
            location: report.location,
            country: report.country,
            forecasts,
            timestamp: Utc::now(),
        })
    }
}

fn validate(index: usize, entry: &ForecastEntry) -> Result<(), ForecastError> {
    if !entry.temperature.is_finite() {
        return Err(ForecastError::malformed(index, "temperature is not a finite number"));
    }
    if entry.humidity > 100 {
        return Err(ForecastError::malformed(
            index,
            format!("humidity {} exceeds 100", entry.humidity),
        ));
    }
    if !entry.wind_speed.is_finite() || entry.wind_speed < 0.0 {
        return Err(ForecastError::malformed(
            index,
            format!("wind speed {} is not a non-negative number", entry.wind_speed),
        ));
    }
    let pop = entry.precipitation_probability;
    if !(0.0..=1.0).contains(&pop) {
        return Err(ForecastError::malformed(
            index,
            format!("precipitation probability {pop} is outside [0, 1]"),
        ));
    }

    Ok(())
}

/// Accumulators for the calendar day currently being scanned.
struct DayBucket<'a> {
    date: NaiveDate,
    temps: Vec<f64>,
    descriptions: Vec<&'a str>,
    icons: Vec<&'a str>,
    humidity: Vec<u8>,
    wind_speeds: Vec<f64>,
    rain_chance: f64,
}

impl<'a> DayBucket<'a> {
    fn new(date: NaiveDate) -> Self {
        Self {
            date,
            temps: Vec::new(),
            descriptions: Vec::new(),
            icons: Vec::new(),
            humidity: Vec::new(),
            wind_speeds: Vec::new(),
            rain_chance: 0.0,
        }
    }

    fn push(&mut self, entry: &'a ForecastEntry) {
        self.temps.push(entry.temperature);
        self.descriptions.push(&entry.condition_description);
        self.icons.push(&entry.condition_icon);
        self.humidity.push(entry.humidity);
        self.wind_speeds.push(entry.wind_speed);
        self.rain_chance = self.rain_chance.max(entry.precipitation_probability * 100.0);
    }

    /// Only called on a bucket holding at least one entry.
    fn finish(self) -> DaySummary {
        let count = self.temps.len();

        let temp_high = self.temps.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let temp_low = self.temps.iter().copied().fold(f64::INFINITY, f64::min);

        let humidity_sum: u32 = self.humidity.iter().map(|&h| u32::from(h)).sum();
        // Floor division; every value is <= 100 so the mean fits.
        let humidity = (humidity_sum / count as u32) as u8;

        let wind_speed = self.wind_speeds.iter().sum::<f64>() / count as f64;

        DaySummary {
            date: self.date,
            temp_high,
            temp_low,
            description: most_common(&self.descriptions).unwrap_or_default().to_string(),
            icon: most_common(&self.icons).unwrap_or_default().to_string(),
            humidity,
            wind_speed,
            rain_chance: self.rain_chance,
        }
    }
}

/// Most frequent value; on a tie the value seen first wins.
fn most_common<'a>(values: &[&'a str]) -> Option<&'a str> {
    let mut counts: Vec<(&'a str, usize)> = Vec::new();

    for &value in values {
        match counts.iter_mut().find(|(seen, _)| *seen == value) {
            Some((_, n)) => *n += 1,
            None => counts.push((value, 1)),
        }
    }

    // `counts` is in first-occurrence order, so only a strictly higher count may replace
    // the current leader.
    counts
        .into_iter()
        .reduce(|best, candidate| if candidate.1 > best.1 { candidate } else { best })
        .map(|(value, _)| value)
}
