//! Sunrise/sunset lookup for Mauritius with a per-date memo.
//!
//! A successful lookup is cached for the life of the service. A failed lookup
//! returns fixed defaults and is *not* cached, so the next call retries.

use crate::domain::model::SunTimes;
use crate::utils::error::{OutageError, Result};
use chrono::NaiveDate;
use regex::Regex;
use reqwest::Client;
use serde::Deserialize;
use std::collections::{HashMap, VecDeque};
use std::sync::{LazyLock, Mutex};
use std::time::Duration;
use url::Url;

pub const DEFAULT_SUN_API: &str = "https://api.sunrisesunset.io/json";
pub const DEFAULT_SUNRISE: f64 = 6.0;
pub const DEFAULT_SUNSET: f64 = 18.0;
/// One entry per civil date; a year's worth covers any realistic session.
pub const DEFAULT_CACHE_CAPACITY: usize = 366;

static TIME_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d{1,2}):(\d{1,2}):(\d{1,2})\s*(AM|PM)").expect("sun time pattern")
});

#[derive(Debug, Clone, PartialEq)]
pub struct SunLocation {
    pub latitude: f64,
    pub longitude: f64,
    pub timezone: String,
}

impl Default for SunLocation {
    fn default() -> Self {
        Self {
            latitude: -20.3484,
            longitude: 57.5522,
            timezone: "Indian/Mauritius".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SunTimesConfig {
    pub endpoint: String,
    pub location: SunLocation,
    pub cache_capacity: usize,
    pub timeout: Duration,
}

impl Default for SunTimesConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_SUN_API.to_string(),
            location: SunLocation::default(),
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SunTimesResponse {
    status: String,
    results: Option<SunTimesResult>,
}

#[derive(Debug, Deserialize)]
struct SunTimesResult {
    sunrise: String,
    sunset: String,
    #[serde(default)]
    golden_hour: String,
    #[serde(default)]
    day_length: String,
}

/// `"6:15:30 AM"` to decimal hours (6.2583..). Unparseable input degrades to 0.0.
pub fn parse_time_to_hours(value: &str) -> f64 {
    let parsed = TIME_PATTERN.captures(value).and_then(|caps| {
        let hours: u32 = caps[1].parse().ok()?;
        let minutes: u32 = caps[2].parse().ok()?;
        let seconds: u32 = caps[3].parse().ok()?;
        if !(1..=12).contains(&hours) || minutes > 59 || seconds > 59 {
            return None;
        }

        let hours = match (caps[4].to_ascii_uppercase().as_str(), hours) {
            ("AM", 12) => 0,
            ("PM", 12) => 12,
            ("PM", h) => h + 12,
            (_, h) => h,
        };
        Some(hours as f64 + minutes as f64 / 60.0 + seconds as f64 / 3600.0)
    });

    parsed.unwrap_or_else(|| {
        tracing::warn!("Failed to parse sun time string: {:?}", value);
        0.0
    })
}

/// Decimal hours to a 12-hour clock string: 6.25 becomes `"6:15 AM"`.
pub fn format_hours(hours: f64) -> String {
    let total_minutes = (hours * 60.0).round() as i64;
    let h = total_minutes.div_euclid(60).rem_euclid(24);
    let m = total_minutes.rem_euclid(60);
    let period = if h >= 12 { "PM" } else { "AM" };
    let display_hour = match h % 12 {
        0 => 12,
        other => other,
    };
    format!("{}:{:02} {}", display_hour, m, period)
}

pub fn default_sun_times() -> SunTimes {
    SunTimes {
        sunrise: DEFAULT_SUNRISE,
        sunset: DEFAULT_SUNSET,
        sunrise_formatted: format_hours(DEFAULT_SUNRISE),
        sunset_formatted: format_hours(DEFAULT_SUNSET),
        golden_hour: String::new(),
        day_length: String::new(),
    }
}

/// Insertion-ordered map that drops the oldest date once full.
#[derive(Debug)]
struct SunTimesCache {
    capacity: usize,
    entries: HashMap<NaiveDate, SunTimes>,
    order: VecDeque<NaiveDate>,
}

impl SunTimesCache {
    fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: HashMap::new(),
            order: VecDeque::new(),
        }
    }

    fn get(&self, date: &NaiveDate) -> Option<SunTimes> {
        self.entries.get(date).cloned()
    }

    fn insert(&mut self, date: NaiveDate, times: SunTimes) {
        if self.entries.insert(date, times).is_some() {
            return;
        }
        self.order.push_back(date);
        while self.order.len() > self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.entries.remove(&oldest);
            }
        }
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

pub struct SunTimeService {
    client: Client,
    config: SunTimesConfig,
    cache: Mutex<SunTimesCache>,
}

impl SunTimeService {
    pub fn new(config: SunTimesConfig) -> Self {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!("Falling back to default HTTP client: {}", e);
                Client::new()
            });
        Self::with_client(client, config)
    }

    pub fn with_client(client: Client, config: SunTimesConfig) -> Self {
        let cache = Mutex::new(SunTimesCache::new(config.cache_capacity));
        Self {
            client,
            config,
            cache,
        }
    }

    /// Never fails: falls back to [`default_sun_times`] when the lookup does.
    pub async fn get(&self, date: NaiveDate) -> SunTimes {
        if let Some(hit) = self.cached(&date) {
            tracing::debug!("Sun times cache hit for {}", date);
            return hit;
        }

        match self.lookup(date).await {
            Ok(times) => {
                self.cache
                    .lock()
                    .unwrap_or_else(|poisoned| poisoned.into_inner())
                    .insert(date, times.clone());
                times
            }
            Err(e) => {
                tracing::warn!("Using default sun times for {}: {}", date, e);
                default_sun_times()
            }
        }
    }

    pub fn cached_len(&self) -> usize {
        self.cache
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    fn cached(&self, date: &NaiveDate) -> Option<SunTimes> {
        self.cache
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(date)
    }

    fn request_url(&self, date: NaiveDate) -> Result<Url> {
        let location = &self.config.location;
        Url::parse_with_params(
            &self.config.endpoint,
            &[
                ("lat", location.latitude.to_string()),
                ("lng", location.longitude.to_string()),
                ("timezone", location.timezone.clone()),
                ("date", date.format("%Y-%m-%d").to_string()),
            ],
        )
        .map_err(|e| OutageError::SunTimeLookupFailed {
            message: format!("invalid endpoint {}: {}", self.config.endpoint, e),
        })
    }

    async fn lookup(&self, date: NaiveDate) -> Result<SunTimes> {
        let url = self.request_url(date)?;
        tracing::debug!("Fetching sun times: {}", url);

        let lookup_failed = |message: String| OutageError::SunTimeLookupFailed { message };

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| lookup_failed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(lookup_failed(format!("HTTP status {}", response.status())));
        }

        let body: SunTimesResponse = response
            .json()
            .await
            .map_err(|e| lookup_failed(format!("invalid response body: {}", e)))?;

        if body.status != "OK" {
            return Err(lookup_failed(format!("API returned status: {}", body.status)));
        }
        let result = body
            .results
            .ok_or_else(|| lookup_failed("response has no results".to_string()))?;

        Ok(SunTimes {
            sunrise: parse_time_to_hours(&result.sunrise),
            sunset: parse_time_to_hours(&result.sunset),
            sunrise_formatted: result.sunrise,
            sunset_formatted: result.sunset,
            golden_hour: result.golden_hour,
            day_length: result.day_length,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_parse_twelve_hour_times() {
        assert!(close(parse_time_to_hours("9:00:00 AM"), 9.0));
        assert!(close(parse_time_to_hours("12:00:00 PM"), 12.0));
        assert!(close(parse_time_to_hours("12:00:00 AM"), 0.0));
        assert!(close(parse_time_to_hours("6:15:00 PM"), 18.25));
        assert!(close(parse_time_to_hours("6:15:36 am"), 6.26));
    }

    #[test]
    fn test_unparseable_time_is_zero() {
        assert_eq!(parse_time_to_hours(""), 0.0);
        assert_eq!(parse_time_to_hours("06:15"), 0.0);
        assert_eq!(parse_time_to_hours("13:00:00 PM"), 0.0);
        assert_eq!(parse_time_to_hours("sunrise"), 0.0);
    }

    #[test]
    fn test_format_hours() {
        assert_eq!(format_hours(6.0), "6:00 AM");
        assert_eq!(format_hours(18.0), "6:00 PM");
        assert_eq!(format_hours(6.25), "6:15 AM");
        assert_eq!(format_hours(0.5), "12:30 AM");
        assert_eq!(format_hours(12.0), "12:00 PM");
        assert_eq!(format_hours(5.9999), "6:00 AM");
    }

    #[test]
    fn test_defaults() {
        let defaults = default_sun_times();
        assert_eq!(defaults.sunrise, 6.0);
        assert_eq!(defaults.sunset, 18.0);
        assert_eq!(defaults.sunrise_formatted, "6:00 AM");
        assert!(defaults.golden_hour.is_empty());
        assert!(defaults.day_length.is_empty());
    }

    #[test]
    fn test_cache_evicts_oldest_date() {
        let mut cache = SunTimesCache::new(2);
        let day = |d| NaiveDate::from_ymd_opt(2024, 6, d).unwrap();
        cache.insert(day(1), default_sun_times());
        cache.insert(day(2), default_sun_times());
        cache.insert(day(2), default_sun_times());
        assert_eq!(cache.len(), 2);

        cache.insert(day(3), default_sun_times());
        assert_eq!(cache.len(), 2);
        assert!(cache.get(&day(1)).is_none());
        assert!(cache.get(&day(2)).is_some());
        assert!(cache.get(&day(3)).is_some());
    }
}
