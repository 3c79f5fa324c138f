//! Reverse geocoding: coordinates to a place name for the dashboard header.
//!
//! Talks to any Nominatim-compatible `reverse` endpoint. Hosted mirrors such as geocode.maps.co
//! want an `api_key` query parameter; OpenStreetMap's own instance does not.

use crate::types::{Location, WeatherError};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

pub const NOMINATIM_URL: &str = "https://nominatim.openstreetmap.org/reverse";
const REQUEST_TIMEOUT_SECS: u64 = 10;
const USER_AGENT: &str = concat!("Skycast/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Deserialize)]
struct ReverseResponse {
    address: Option<Address>,
}

#[derive(Debug, Default, Deserialize)]
struct Address {
    county: Option<String>,
    city: Option<String>,
    town: Option<String>,
    village: Option<String>,
    municipality: Option<String>,
    state: Option<String>,
    country: Option<String>,
}

impl Address {
    /// The area name shown above the temperature. County first, then the settlement.
    fn place_name(self) -> Option<String> {
        [
            self.county,
            self.city,
            self.town,
            self.village,
            self.municipality,
            self.state,
            self.country,
        ]
        .into_iter()
        .flatten()
        .map(|name| name.trim().to_string())
        .find(|name| !name.is_empty())
    }
}

#[derive(Debug, Clone)]
pub struct ReverseGeocoder {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl ReverseGeocoder {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Result<Self, WeatherError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into(),
            api_key: api_key.filter(|k| !k.is_empty()),
        })
    }

    /// Look up a place name. Returns `None` on any failure; callers show coordinates instead.
    pub async fn place_name(&self, location: &Location) -> Option<String> {
        if let Some(name) = &location.city_name {
            return Some(name.clone());
        }

        let mut query = vec![
            ("lat", location.latitude.to_string()),
            ("lon", location.longitude.to_string()),
            ("format", "json".to_string()),
            ("addressdetails", "1".to_string()),
            ("zoom", "10".to_string()),
        ];
        if let Some(key) = &self.api_key {
            query.push(("api_key", key.clone()));
        }

        let response = match self.client.get(&self.base_url).query(&query).send().await {
            Ok(r) => r,
            Err(e) => {
                tracing::debug!("Reverse geocode request failed: {}", e);
                return None;
            }
        };

        if !response.status().is_success() {
            tracing::debug!("Reverse geocode returned status {}", response.status());
            return None;
        }

        let body: ReverseResponse = match response.json().await {
            Ok(b) => b,
            Err(e) => {
                tracing::debug!("Reverse geocode parse error: {}", e);
                return None;
            }
        };

        let name = body.address?.place_name()?;
        tracing::info!("Reverse geocoded to: {}", name);
        Some(name)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn location() -> Location {
        Location::from_coordinates(47.6062, -122.3321).unwrap()
    }

    #[test]
    fn county_wins_over_city() {
        let address = Address {
            county: Some("King County".into()),
            city: Some("Seattle".into()),
            ..Address::default()
        };
        assert_eq!(address.place_name().as_deref(), Some("King County"));
    }

    #[test]
    fn blank_names_are_skipped() {
        let address = Address {
            county: Some("  ".into()),
            town: Some("Issaquah".into()),
            ..Address::default()
        };
        assert_eq!(address.place_name().as_deref(), Some("Issaquah"));
        assert_eq!(Address::default().place_name(), None);
    }

    #[tokio::test]
    async fn existing_city_skips_lookup() {
        let geocoder = ReverseGeocoder::new("http://127.0.0.1:9", None).unwrap();
        let mut loc = location();
        loc.city_name = Some("Seattle".into());
        assert_eq!(geocoder.place_name(&loc).await.as_deref(), Some("Seattle"));
    }

    #[tokio::test]
    async fn sends_api_key_when_configured() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("lat", "47.6062"))
            .and(query_param("api_key", "secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "display_name": "Seattle, King County, Washington, United States",
                "address": {
                    "city": "Seattle",
                    "county": "King County",
                    "state": "Washington",
                    "country": "United States"
                }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let geocoder = ReverseGeocoder::new(server.uri(), Some("secret".into())).unwrap();
        assert_eq!(
            geocoder.place_name(&location()).await.as_deref(),
            Some("King County")
        );
    }

    #[tokio::test]
    async fn failures_yield_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let geocoder = ReverseGeocoder::new(server.uri(), Some(String::new())).unwrap();
        assert_eq!(geocoder.place_name(&location()).await, None);
    }
}
