use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use skycast_core::{NetworkError, ReqwestErrorExt};

/// Temperature unit requested from the provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TemperatureUnit {
    /// Provider default (Celsius)
    #[default]
    Auto,
    Celsius,
    Fahrenheit,
}

impl TemperatureUnit {
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Fahrenheit => "°F",
            Self::Auto | Self::Celsius => "°C",
        }
    }
}

/// Weather condition categories mapped from WMO codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum WeatherCondition {
    #[default]
    Clear,
    PartlyCloudy,
    Cloudy,
    Fog,
    Drizzle,
    Rain,
    HeavyRain,
    Snow,
    Sleet,
    Thunderstorm,
}

impl WeatherCondition {
    /// Category for a WMO weather interpretation code.
    /// See: https://open-meteo.com/en/docs#weathervariables
    pub fn from_wmo_code(code: i32) -> Self {
        match code {
            0 => Self::Clear,
            1 | 2 => Self::PartlyCloudy,
            3 => Self::Cloudy,
            45 | 48 => Self::Fog,
            51 | 53 | 55 => Self::Drizzle,
            56 | 57 | 66 | 67 => Self::Sleet,
            61 | 63 | 80 => Self::Rain,
            65 | 81 | 82 => Self::HeavyRain,
            71 | 73 | 75 | 77 | 85 | 86 => Self::Snow,
            95 | 96 | 99 => Self::Thunderstorm,
            _ => Self::Clear,
        }
    }

    pub fn icon_name(&self, is_day: bool) -> &'static str {
        match self {
            Self::Clear if is_day => "sun",
            Self::Clear => "moon",
            Self::PartlyCloudy if is_day => "cloud_sun",
            Self::PartlyCloudy => "cloud_moon",
            Self::Cloudy => "cloud",
            Self::Fog => "cloud_fog",
            Self::Drizzle | Self::Rain | Self::HeavyRain => "cloud_rain",
            Self::Snow | Self::Sleet => "cloud_snow",
            Self::Thunderstorm => "cloud_lightning",
        }
    }
}

/// Text for a WMO code, finer grained than [`WeatherCondition`].
pub fn wmo_description(code: i32) -> &'static str {
    match code {
        0 => "Clear sky",
        1 => "Mainly clear",
        2 => "Partly cloudy",
        3 => "Overcast",
        45 => "Fog",
        48 => "Depositing rime fog",
        51 => "Light drizzle",
        53 => "Moderate drizzle",
        55 => "Dense drizzle",
        56 => "Light freezing drizzle",
        57 => "Dense freezing drizzle",
        61 => "Slight rain",
        63 => "Moderate rain",
        65 => "Heavy rain",
        66 => "Light freezing rain",
        67 => "Heavy freezing rain",
        71 => "Slight snow fall",
        73 => "Moderate snow fall",
        75 => "Heavy snow fall",
        77 => "Snow grains",
        80 => "Slight rain showers",
        81 => "Moderate rain showers",
        82 => "Violent rain showers",
        85 => "Slight snow showers",
        86 => "Heavy snow showers",
        95 => "Thunderstorm",
        96 => "Thunderstorm with slight hail",
        99 => "Thunderstorm with heavy hail",
        _ => "Unknown",
    }
}

/// Geographic location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
    pub accuracy_meters: Option<f64>,
    pub city_name: Option<String>,
}

impl Location {
    /// A bare coordinate pair. Rejects values outside the valid lat/lon ranges.
    pub fn from_coordinates(latitude: f64, longitude: f64) -> Result<Self, LocationError> {
        let location = Self {
            latitude,
            longitude,
            accuracy_meters: None,
            city_name: None,
        };
        if location.is_valid() {
            Ok(location)
        } else {
            Err(LocationError::InvalidCoordinates {
                latitude,
                longitude,
            })
        }
    }

    pub fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.latitude) && (-180.0..=180.0).contains(&self.longitude)
    }

    /// True if both points are within roughly a kilometre of each other.
    pub fn is_near(&self, other: &Location) -> bool {
        const EPSILON_DEGREES: f64 = 0.01;
        (self.latitude - other.latitude).abs() < EPSILON_DEGREES
            && (self.longitude - other.longitude).abs() < EPSILON_DEGREES
    }
}

/// Current conditions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentWeather {
    /// Local time at the location
    pub time: NaiveDateTime,
    pub temperature: f64,
    pub feels_like: f64,
    pub humidity: u8,
    /// km/h
    pub wind_speed: f64,
    /// Degrees from north
    pub wind_direction: f64,
    /// Mean sea level pressure, hPa
    pub pressure: f64,
    /// mm
    pub precipitation: f64,
    pub is_day: bool,
    pub weather_code: i32,
    pub condition: WeatherCondition,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HourlyForecast {
    pub time: NaiveDateTime,
    pub temperature: f64,
    pub feels_like: f64,
    pub humidity: u8,
    pub wind_speed: f64,
    pub pressure: f64,
    pub precipitation: f64,
    pub precipitation_chance: u8,
    pub uv_index: Option<f64>,
    pub is_day: bool,
    pub condition: WeatherCondition,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DayForecast {
    pub date: NaiveDate,
    pub high: f64,
    pub low: f64,
    pub weather_code: i32,
    pub condition: WeatherCondition,
    pub precipitation_chance: u8,
    pub sunrise: Option<NaiveTime>,
    pub sunset: Option<NaiveTime>,
    pub daylight_duration_secs: f64,
    pub sunshine_duration_secs: f64,
    pub hourly: Vec<HourlyForecast>,
}

/// Everything one forecast request returns
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherData {
    pub current: CurrentWeather,
    pub forecast: Vec<DayForecast>,
    pub location: Location,
    pub timezone: String,
    pub unit: TemperatureUnit,
    pub fetched_at: DateTime<Utc>,
}

impl WeatherData {
    pub fn today(&self) -> Option<&DayForecast> {
        self.forecast.first()
    }

    /// The next sun event worth showing: sunset while it's day, sunrise at night.
    pub fn next_sun_event(&self) -> Option<(&'static str, NaiveTime)> {
        let today = self.today()?;
        if self.current.is_day {
            today.sunset.map(|t| ("Sunset", t))
        } else {
            today.sunrise.map(|t| ("Sunrise", t))
        }
    }
}

/// Location service errors
#[derive(Debug, thiserror::Error)]
pub enum LocationError {
    #[error("No saved location")]
    NotSet,
    #[error("Invalid coordinates: {latitude}, {longitude}")]
    InvalidCoordinates { latitude: f64, longitude: f64 },
    #[error("Location service unavailable")]
    ServiceUnavailable,
    #[error("Location lookup failed: {0}")]
    Lookup(String),
    #[error("Location lookup failed: {0}")]
    Network(#[from] NetworkError),
    #[error("Location store error: {0}")]
    Store(String),
}

/// Weather provider errors
#[derive(Debug, thiserror::Error)]
pub enum WeatherError {
    #[error("Network error: {0}")]
    Network(#[from] NetworkError),
    #[error("Weather API returned {status}: {reason}")]
    Api { status: u16, reason: String },
    #[error("Location error: {0}")]
    Location(#[from] LocationError),
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Cache error: {0}")]
    Cache(String),
}

impl From<reqwest::Error> for WeatherError {
    fn from(e: reqwest::Error) -> Self {
        WeatherError::Network(e.into_network_error())
    }
}

impl From<reqwest::Error> for LocationError {
    fn from(e: reqwest::Error) -> Self {
        LocationError::Network(e.into_network_error())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;

    #[test]
    fn wmo_codes_map_to_categories() {
        let cases = [
            (0, WeatherCondition::Clear),
            (2, WeatherCondition::PartlyCloudy),
            (3, WeatherCondition::Cloudy),
            (48, WeatherCondition::Fog),
            (53, WeatherCondition::Drizzle),
            (57, WeatherCondition::Sleet),
            (63, WeatherCondition::Rain),
            (66, WeatherCondition::Sleet),
            (82, WeatherCondition::HeavyRain),
            (86, WeatherCondition::Snow),
            (99, WeatherCondition::Thunderstorm),
        ];
        for (code, expected) in cases {
            assert_eq!(WeatherCondition::from_wmo_code(code), expected, "code {}", code);
        }
    }

    #[test]
    fn unknown_codes_are_clear() {
        assert_eq!(WeatherCondition::from_wmo_code(999), WeatherCondition::Clear);
        assert_eq!(WeatherCondition::from_wmo_code(-1), WeatherCondition::Clear);
        assert_eq!(wmo_description(4), "Unknown");
    }

    #[test]
    fn descriptions_are_specific() {
        assert_eq!(wmo_description(1), "Mainly clear");
        assert_eq!(wmo_description(96), "Thunderstorm with slight hail");
    }

    #[test]
    fn icons_follow_daylight() {
        assert_eq!(WeatherCondition::Clear.icon_name(true), "sun");
        assert_eq!(WeatherCondition::Clear.icon_name(false), "moon");
        assert_eq!(WeatherCondition::Rain.icon_name(false), "cloud_rain");
    }

    #[test]
    fn coordinates_are_range_checked() {
        assert!(Location::from_coordinates(47.6, -122.3).is_ok());
        assert!(matches!(
            Location::from_coordinates(91.0, 0.0),
            Err(LocationError::InvalidCoordinates { .. })
        ));
        assert!(Location::from_coordinates(0.0, -180.5).is_err());
    }

    #[test]
    fn nearby_locations() {
        let a = Location::from_coordinates(47.6062, -122.3321).unwrap();
        let b = Location::from_coordinates(47.6100, -122.3300).unwrap();
        let c = Location::from_coordinates(45.5, -122.6).unwrap();
        assert!(a.is_near(&b));
        assert!(!a.is_near(&c));
    }
}
