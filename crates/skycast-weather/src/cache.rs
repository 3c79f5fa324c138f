//! On-disk copy of the last forecast.
//!
//! Stale data is still shown while a refresh runs; expired data is not shown at all.

use crate::types::{Location, WeatherData, WeatherError};
use chrono::{Duration, Utc};
use std::path::{Path, PathBuf};

const CACHE_FILE: &str = "weather_cache.json";
const DEFAULT_REFRESH_MINUTES: i64 = 15;
const EXPIRE_AFTER_HOURS: i64 = 24;

#[derive(Debug)]
pub struct WeatherCache {
    cache_path: PathBuf,
    data: Option<WeatherData>,
    stale_after: Duration,
    expire_after: Duration,
}

impl WeatherCache {
    pub fn new(config_dir: &Path) -> Self {
        Self {
            cache_path: config_dir.join(CACHE_FILE),
            data: None,
            stale_after: Duration::minutes(DEFAULT_REFRESH_MINUTES),
            expire_after: Duration::hours(EXPIRE_AFTER_HOURS),
        }
    }

    /// Treat data older than `minutes` as due for a refresh.
    pub fn with_refresh_minutes(mut self, minutes: u32) -> Self {
        self.stale_after = Duration::minutes(i64::from(minutes.max(1)));
        self
    }

    pub fn path(&self) -> &Path {
        &self.cache_path
    }

    /// Read the cache file. A missing file leaves the cache empty.
    pub fn load(&mut self) -> Result<(), WeatherError> {
        if !self.cache_path.exists() {
            self.data = None;
            return Ok(());
        }
        let content = std::fs::read_to_string(&self.cache_path)
            .map_err(|e| WeatherError::Cache(e.to_string()))?;
        let data: WeatherData =
            serde_json::from_str(&content).map_err(|e| WeatherError::Cache(e.to_string()))?;
        tracing::debug!("Loaded weather cache from {}", data.fetched_at);
        self.data = Some(data);
        Ok(())
    }

    pub fn save(&self) -> Result<(), WeatherError> {
        let Some(data) = &self.data else {
            return Ok(());
        };
        if let Some(parent) = self.cache_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| WeatherError::Cache(e.to_string()))?;
        }
        let content =
            serde_json::to_string(data).map_err(|e| WeatherError::Cache(e.to_string()))?;
        std::fs::write(&self.cache_path, content).map_err(|e| WeatherError::Cache(e.to_string()))
    }

    pub fn get(&self) -> Option<&WeatherData> {
        self.data.as_ref()
    }

    /// Cached data for `location`, unless it has expired.
    pub fn get_for(&self, location: &Location) -> Option<&WeatherData> {
        self.data
            .as_ref()
            .filter(|d| d.location.is_near(location) && !self.is_expired())
    }

    pub fn update(&mut self, data: WeatherData) {
        self.data = Some(data);
    }

    pub fn clear(&mut self) -> Result<(), WeatherError> {
        self.data = None;
        match std::fs::remove_file(&self.cache_path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(WeatherError::Cache(e.to_string())),
        }
    }

    pub fn age(&self) -> Option<Duration> {
        self.data.as_ref().map(|d| Utc::now() - d.fetched_at)
    }

    /// Due for a refresh. An empty cache is stale.
    pub fn is_stale(&self) -> bool {
        self.age().map_or(true, |age| age > self.stale_after)
    }

    /// Too old to show. An empty cache is expired.
    pub fn is_expired(&self) -> bool {
        self.age().map_or(true, |age| age > self.expire_after)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;
    use crate::types::{CurrentWeather, TemperatureUnit, WeatherCondition};
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn sample(age: Duration) -> WeatherData {
        let time = NaiveDate::from_ymd_opt(2026, 10, 16)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        WeatherData {
            current: CurrentWeather {
                time,
                temperature: 18.0,
                feels_like: 17.0,
                humidity: 60,
                wind_speed: 12.0,
                wind_direction: 270.0,
                pressure: 1012.0,
                precipitation: 0.0,
                is_day: true,
                weather_code: 2,
                condition: WeatherCondition::PartlyCloudy,
            },
            forecast: Vec::new(),
            location: Location::from_coordinates(47.6062, -122.3321).unwrap(),
            timezone: "America/Los_Angeles".into(),
            unit: TemperatureUnit::Celsius,
            fetched_at: Utc::now() - age,
        }
    }

    #[test]
    fn empty_cache_is_stale_and_expired() {
        let dir = TempDir::new().unwrap();
        let mut cache = WeatherCache::new(dir.path());
        cache.load().unwrap();
        assert!(cache.get().is_none());
        assert!(cache.is_stale());
        assert!(cache.is_expired());
    }

    #[test]
    fn freshness_windows() {
        let dir = TempDir::new().unwrap();
        let mut cache = WeatherCache::new(dir.path()).with_refresh_minutes(30);

        cache.update(sample(Duration::minutes(5)));
        assert!(!cache.is_stale());

        cache.update(sample(Duration::hours(2)));
        assert!(cache.is_stale());
        assert!(!cache.is_expired());

        cache.update(sample(Duration::hours(25)));
        assert!(cache.is_expired());
    }

    #[test]
    fn save_and_reload() {
        let dir = TempDir::new().unwrap();
        let mut cache = WeatherCache::new(dir.path());
        cache.update(sample(Duration::minutes(1)));
        cache.save().unwrap();

        let mut reloaded = WeatherCache::new(dir.path());
        reloaded.load().unwrap();
        let data = reloaded.get().unwrap();
        assert_eq!(data.current.weather_code, 2);
        assert_eq!(data.timezone, "America/Los_Angeles");
    }

    #[test]
    fn other_location_misses() {
        let dir = TempDir::new().unwrap();
        let mut cache = WeatherCache::new(dir.path());
        cache.update(sample(Duration::minutes(1)));

        let here = Location::from_coordinates(47.6062, -122.3321).unwrap();
        let elsewhere = Location::from_coordinates(40.71, -74.0).unwrap();
        assert!(cache.get_for(&here).is_some());
        assert!(cache.get_for(&elsewhere).is_none());
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let mut cache = WeatherCache::new(dir.path());
        std::fs::write(cache.path(), "garbage").unwrap();
        assert!(matches!(cache.load(), Err(WeatherError::Cache(_))));

        cache.clear().unwrap();
        assert!(!cache.path().exists());
    }
}
