//! Open-Meteo forecast client.

use crate::types::{
    CurrentWeather, DayForecast, HourlyForecast, Location, TemperatureUnit, WeatherCondition,
    WeatherData, WeatherError,
};
use chrono::{NaiveDate, NaiveDateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

pub const OPEN_METEO_URL: &str = "https://api.open-meteo.com/v1/forecast";
const REQUEST_TIMEOUT_SECS: u64 = 10;
const MAX_FORECAST_DAYS: u8 = 16;

const CURRENT_FIELDS: &str = "temperature_2m,is_day,apparent_temperature,wind_speed_10m,\
precipitation,pressure_msl,wind_direction_10m,relative_humidity_2m,weather_code";
const HOURLY_FIELDS: &str = "temperature_2m,apparent_temperature,wind_speed_10m,\
precipitation_probability,is_day,relative_humidity_2m,pressure_msl,precipitation,uv_index,\
weather_code";
const DAILY_FIELDS: &str = "sunrise,sunset,weather_code,temperature_2m_max,temperature_2m_min,\
daylight_duration,sunshine_duration,precipitation_probability_max";

/// Local timestamps as Open-Meteo returns them with `timezone=auto`
const TIME_FORMAT: &str = "%Y-%m-%dT%H:%M";

#[derive(Debug, Clone)]
pub struct WeatherProvider {
    client: Arc<Client>,
    api_url: String,
    unit: TemperatureUnit,
    forecast_days: u8,
}

impl WeatherProvider {
    pub fn new(unit: TemperatureUnit) -> Result<Self, WeatherError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client: Arc::new(client),
            api_url: OPEN_METEO_URL.to_string(),
            unit,
            forecast_days: 1,
        })
    }

    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    /// Days of forecast to request, clamped to what the API serves.
    pub fn with_forecast_days(mut self, days: u8) -> Self {
        self.forecast_days = days.clamp(1, MAX_FORECAST_DAYS);
        self
    }

    pub fn unit(&self) -> TemperatureUnit {
        self.unit
    }

    fn query(&self, location: &Location) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("latitude", location.latitude.to_string()),
            ("longitude", location.longitude.to_string()),
            ("current", CURRENT_FIELDS.to_string()),
            ("hourly", HOURLY_FIELDS.to_string()),
            ("daily", DAILY_FIELDS.to_string()),
            ("timezone", "auto".to_string()),
            ("forecast_days", self.forecast_days.to_string()),
        ];
        if self.unit == TemperatureUnit::Fahrenheit {
            params.push(("temperature_unit", "fahrenheit".to_string()));
        }
        params
    }

    /// Fetch current conditions and the forecast for `location`.
    pub async fn fetch(&self, location: &Location) -> Result<WeatherData, WeatherError> {
        tracing::debug!(
            "Fetching forecast for {}, {}",
            location.latitude,
            location.longitude
        );

        let response = self
            .client
            .get(&self.api_url)
            .query(&self.query(location))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let reason = serde_json::from_str::<ApiErrorBody>(&body)
                .map(|e| e.reason)
                .unwrap_or(body);
            return Err(WeatherError::Api {
                status: status.as_u16(),
                reason,
            });
        }

        let body: ForecastResponse = response
            .json()
            .await
            .map_err(|e| WeatherError::Parse(e.to_string()))?;

        let data = parse_forecast(body, location.clone(), self.unit)?;
        tracing::info!(
            "Forecast fetched: {} day(s), {:.1}{} now",
            data.forecast.len(),
            data.current.temperature,
            self.unit.symbol()
        );
        Ok(data)
    }
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    reason: String,
}

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    #[serde(default)]
    timezone: String,
    current: CurrentBlock,
    #[serde(default)]
    hourly: HourlyBlock,
    #[serde(default)]
    daily: DailyBlock,
}

#[derive(Debug, Deserialize)]
struct CurrentBlock {
    time: String,
    temperature_2m: Option<f64>,
    apparent_temperature: Option<f64>,
    relative_humidity_2m: Option<f64>,
    wind_speed_10m: Option<f64>,
    wind_direction_10m: Option<f64>,
    pressure_msl: Option<f64>,
    precipitation: Option<f64>,
    is_day: Option<u8>,
    weather_code: Option<i32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct HourlyBlock {
    time: Vec<String>,
    temperature_2m: Vec<Option<f64>>,
    apparent_temperature: Vec<Option<f64>>,
    relative_humidity_2m: Vec<Option<f64>>,
    wind_speed_10m: Vec<Option<f64>>,
    pressure_msl: Vec<Option<f64>>,
    precipitation: Vec<Option<f64>>,
    precipitation_probability: Vec<Option<f64>>,
    uv_index: Vec<Option<f64>>,
    is_day: Vec<Option<u8>>,
    weather_code: Vec<Option<i32>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct DailyBlock {
    time: Vec<String>,
    sunrise: Vec<Option<String>>,
    sunset: Vec<Option<String>>,
    weather_code: Vec<Option<i32>>,
    temperature_2m_max: Vec<Option<f64>>,
    temperature_2m_min: Vec<Option<f64>>,
    daylight_duration: Vec<Option<f64>>,
    sunshine_duration: Vec<Option<f64>>,
    precipitation_probability_max: Vec<Option<f64>>,
}

fn at<T: Copy>(series: &[Option<T>], i: usize) -> Option<T> {
    series.get(i).copied().flatten()
}

fn percent(value: Option<f64>) -> u8 {
    value.unwrap_or(0.0).round().clamp(0.0, 100.0) as u8
}

fn parse_time(value: &str) -> Result<NaiveDateTime, WeatherError> {
    NaiveDateTime::parse_from_str(value, TIME_FORMAT)
        .map_err(|e| WeatherError::Parse(format!("bad timestamp {:?}: {}", value, e)))
}

fn parse_forecast(
    body: ForecastResponse,
    location: Location,
    unit: TemperatureUnit,
) -> Result<WeatherData, WeatherError> {
    let current = parse_current(&body.current)?;
    let hourly = parse_hourly(&body.hourly)?;
    let forecast = parse_daily(&body.daily, hourly)?;

    Ok(WeatherData {
        current,
        forecast,
        location,
        timezone: body.timezone,
        unit,
        fetched_at: Utc::now(),
    })
}

fn parse_current(block: &CurrentBlock) -> Result<CurrentWeather, WeatherError> {
    let temperature = block
        .temperature_2m
        .ok_or_else(|| WeatherError::Parse("current temperature missing".into()))?;
    let weather_code = block.weather_code.unwrap_or(0);

    Ok(CurrentWeather {
        time: parse_time(&block.time)?,
        temperature,
        feels_like: block.apparent_temperature.unwrap_or(temperature),
        humidity: percent(block.relative_humidity_2m),
        wind_speed: block.wind_speed_10m.unwrap_or(0.0),
        wind_direction: block.wind_direction_10m.unwrap_or(0.0),
        pressure: block.pressure_msl.unwrap_or(0.0),
        precipitation: block.precipitation.unwrap_or(0.0),
        is_day: block.is_day.unwrap_or(1) == 1,
        weather_code,
        condition: WeatherCondition::from_wmo_code(weather_code),
    })
}

fn parse_hourly(block: &HourlyBlock) -> Result<Vec<HourlyForecast>, WeatherError> {
    let mut hours = Vec::with_capacity(block.time.len());
    for (i, time) in block.time.iter().enumerate() {
        // Hours past the model horizon come back as nulls
        let Some(temperature) = at(&block.temperature_2m, i) else {
            continue;
        };
        let code = at(&block.weather_code, i).unwrap_or(0);
        hours.push(HourlyForecast {
            time: parse_time(time)?,
            temperature,
            feels_like: at(&block.apparent_temperature, i).unwrap_or(temperature),
            humidity: percent(at(&block.relative_humidity_2m, i)),
            wind_speed: at(&block.wind_speed_10m, i).unwrap_or(0.0),
            pressure: at(&block.pressure_msl, i).unwrap_or(0.0),
            precipitation: at(&block.precipitation, i).unwrap_or(0.0),
            precipitation_chance: percent(at(&block.precipitation_probability, i)),
            uv_index: at(&block.uv_index, i),
            is_day: at(&block.is_day, i).unwrap_or(1) == 1,
            condition: WeatherCondition::from_wmo_code(code),
        });
    }
    Ok(hours)
}

fn parse_daily(
    block: &DailyBlock,
    mut hourly: Vec<HourlyForecast>,
) -> Result<Vec<DayForecast>, WeatherError> {
    let sun_time = |series: &[Option<String>], i: usize| {
        series
            .get(i)
            .and_then(Option::as_deref)
            .and_then(|s| NaiveDateTime::parse_from_str(s, TIME_FORMAT).ok())
            .map(|t| t.time())
    };

    let mut days = Vec::with_capacity(block.time.len());
    for (i, date) in block.time.iter().enumerate() {
        let date = NaiveDate::parse_from_str(date, "%Y-%m-%d")
            .map_err(|e| WeatherError::Parse(format!("bad date {:?}: {}", date, e)))?;
        let (Some(high), Some(low)) = (
            at(&block.temperature_2m_max, i),
            at(&block.temperature_2m_min, i),
        ) else {
            tracing::debug!("No temperature range for {}, skipping", date);
            continue;
        };

        let (today, rest): (Vec<_>, Vec<_>) =
            hourly.into_iter().partition(|h| h.time.date() == date);
        hourly = rest;

        let code = at(&block.weather_code, i).unwrap_or(0);
        let precipitation_chance = match at(&block.precipitation_probability_max, i) {
            Some(p) => percent(Some(p)),
            None => today.iter().map(|h| h.precipitation_chance).max().unwrap_or(0),
        };

        days.push(DayForecast {
            date,
            high,
            low,
            weather_code: code,
            condition: WeatherCondition::from_wmo_code(code),
            precipitation_chance,
            sunrise: sun_time(&block.sunrise, i),
            sunset: sun_time(&block.sunset, i),
            daylight_duration_secs: at(&block.daylight_duration, i).unwrap_or(0.0),
            sunshine_duration_secs: at(&block.sunshine_duration, i).unwrap_or(0.0),
            hourly: today,
        });
    }
    Ok(days)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;
    use chrono::NaiveTime;
    use serde_json::json;
    use skycast_core::NetworkError;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn seattle() -> Location {
        Location::from_coordinates(47.6062, -122.3321).unwrap()
    }

    fn sample_body() -> serde_json::Value {
        json!({
            "latitude": 47.6,
            "longitude": -122.33,
            "timezone": "America/Los_Angeles",
            "utc_offset_seconds": -25200,
            "current": {
                "time": "2026-10-16T14:15",
                "interval": 900,
                "temperature_2m": 13.4,
                "is_day": 1,
                "apparent_temperature": 11.9,
                "wind_speed_10m": 9.7,
                "precipitation": 0.2,
                "pressure_msl": 1016.3,
                "wind_direction_10m": 204.0,
                "relative_humidity_2m": 81,
                "weather_code": 61
            },
            "hourly": {
                "time": ["2026-10-16T00:00", "2026-10-16T01:00", "2026-10-17T00:00"],
                "temperature_2m": [10.1, 9.8, null],
                "apparent_temperature": [8.7, 8.2, null],
                "wind_speed_10m": [5.0, 4.1, null],
                "precipitation_probability": [20, 55, null],
                "is_day": [0, 0, null],
                "relative_humidity_2m": [90, 92, null],
                "pressure_msl": [1017.0, 1016.8, null],
                "precipitation": [0.0, 0.4, null],
                "uv_index": [0.0, null, null],
                "weather_code": [3, 61, null]
            },
            "daily": {
                "time": ["2026-10-16"],
                "sunrise": ["2026-10-16T07:28"],
                "sunset": ["2026-10-16T18:21"],
                "weather_code": [61],
                "temperature_2m_max": [14.2],
                "temperature_2m_min": [8.9],
                "daylight_duration": [39180.0],
                "sunshine_duration": [12000.0],
                "precipitation_probability_max": [null]
            }
        })
    }

    #[test]
    fn parses_forecast_body() {
        let body: ForecastResponse = serde_json::from_value(sample_body()).unwrap();
        let data = parse_forecast(body, seattle(), TemperatureUnit::Celsius).unwrap();

        assert_eq!(data.timezone, "America/Los_Angeles");
        assert_eq!(data.current.humidity, 81);
        assert_eq!(data.current.condition, WeatherCondition::Rain);
        assert!(data.current.is_day);
        assert_eq!(data.current.wind_direction, 204.0);

        let today = data.today().unwrap();
        assert_eq!(today.high, 14.2);
        assert_eq!(today.sunset, NaiveTime::from_hms_opt(18, 21, 0));
        // Null hours are dropped and the daily max falls back to the hourly series
        assert_eq!(today.hourly.len(), 2);
        assert_eq!(today.precipitation_chance, 55);
        assert_eq!(today.hourly[0].uv_index, Some(0.0));
        assert_eq!(today.hourly[1].uv_index, None);

        assert_eq!(
            data.next_sun_event(),
            Some(("Sunset", NaiveTime::from_hms_opt(18, 21, 0).unwrap()))
        );
    }

    #[test]
    fn missing_current_temperature_is_an_error() {
        let mut body = sample_body();
        body["current"]["temperature_2m"] = json!(null);
        let body: ForecastResponse = serde_json::from_value(body).unwrap();
        assert!(matches!(
            parse_forecast(body, seattle(), TemperatureUnit::Auto),
            Err(WeatherError::Parse(_))
        ));
    }

    #[test]
    fn forecast_days_are_clamped() {
        let provider = WeatherProvider::new(TemperatureUnit::Auto)
            .unwrap()
            .with_forecast_days(40);
        let params = provider.query(&seattle());
        assert!(params.contains(&("forecast_days", "16".to_string())));
        assert!(!params.iter().any(|(k, _)| *k == "temperature_unit"));
    }

    #[tokio::test]
    async fn fetches_from_api() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/forecast"))
            .and(query_param("latitude", "47.6062"))
            .and(query_param("timezone", "auto"))
            .and(query_param("temperature_unit", "fahrenheit"))
            .respond_with(ResponseTemplate::new(200).set_body_json(sample_body()))
            .expect(1)
            .mount(&server)
            .await;

        let provider = WeatherProvider::new(TemperatureUnit::Fahrenheit)
            .unwrap()
            .with_api_url(format!("{}/v1/forecast", server.uri()));
        let data = provider.fetch(&seattle()).await.unwrap();

        assert_eq!(data.unit, TemperatureUnit::Fahrenheit);
        assert_eq!(data.forecast.len(), 1);
        assert_eq!(data.location, seattle());
    }

    #[tokio::test]
    async fn unreachable_provider_is_network_error() {
        let server = MockServer::start().await;
        let uri = server.uri();
        drop(server);

        let provider = WeatherProvider::new(TemperatureUnit::Auto)
            .unwrap()
            .with_api_url(uri);
        let err = provider.fetch(&seattle()).await.unwrap_err();

        assert!(matches!(
            err,
            WeatherError::Network(NetworkError::ConnectionFailed(_))
        ));
    }

    #[tokio::test]
    async fn api_error_reason_is_surfaced() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": true,
                "reason": "Latitude must be in range of -90 to 90°."
            })))
            .mount(&server)
            .await;

        let provider = WeatherProvider::new(TemperatureUnit::Auto)
            .unwrap()
            .with_api_url(server.uri());
        let err = provider.fetch(&seattle()).await.unwrap_err();

        match err {
            WeatherError::Api { status, reason } => {
                assert_eq!(status, 400);
                assert!(reason.starts_with("Latitude"));
            }
            other => panic!("unexpected error: {}", other),
        }
    }
}
