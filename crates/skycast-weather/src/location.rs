//! Where to fetch weather for.
//!
//! Saved coordinates win. Without them the public IP is geolocated; that guess is city-level at
//! best and is never written back to the store.

use crate::types::{Location, LocationError};
use reqwest::Client;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const IPAPI_URL: &str = "https://ipapi.co/json/";
const REQUEST_TIMEOUT_SECS: u64 = 5;
const STORE_FILE: &str = "location.json";

/// Last known coordinates, persisted as JSON next to the config file.
#[derive(Debug, Clone)]
pub struct LocationStore {
    path: PathBuf,
}

impl LocationStore {
    pub fn new(config_dir: &Path) -> Self {
        Self {
            path: config_dir.join(STORE_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The saved location, if there is a readable one.
    pub fn load(&self) -> Option<Location> {
        let content = std::fs::read_to_string(&self.path).ok()?;
        match serde_json::from_str::<Location>(&content) {
            Ok(location) if location.is_valid() => Some(location),
            Ok(_) => {
                tracing::warn!("Ignoring out-of-range saved location in {:?}", self.path);
                None
            }
            Err(e) => {
                tracing::warn!("Ignoring unreadable saved location: {}", e);
                None
            }
        }
    }

    pub fn save(&self, location: &Location) -> Result<(), LocationError> {
        if !location.is_valid() {
            return Err(LocationError::InvalidCoordinates {
                latitude: location.latitude,
                longitude: location.longitude,
            });
        }
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| LocationError::Store(e.to_string()))?;
        }
        let content = serde_json::to_string_pretty(location)
            .map_err(|e| LocationError::Store(e.to_string()))?;
        std::fs::write(&self.path, content).map_err(|e| LocationError::Store(e.to_string()))?;
        tracing::debug!("Saved location to {:?}", self.path);
        Ok(())
    }

    pub fn clear(&self) -> Result<(), LocationError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(LocationError::Store(e.to_string())),
        }
    }
}

#[derive(Debug, Deserialize)]
struct IpLookupResponse {
    latitude: Option<f64>,
    longitude: Option<f64>,
    city: Option<String>,
    country_name: Option<String>,
    #[serde(default)]
    error: bool,
    reason: Option<String>,
}

/// Coarse location from the caller's public IP (ipapi.co response shape).
#[derive(Debug, Clone)]
pub struct IpLocator {
    client: Client,
    url: String,
}

impl IpLocator {
    pub fn new(url: impl Into<String>) -> Result<Self, LocationError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    pub async fn locate(&self) -> Result<Location, LocationError> {
        let response = self.client.get(&self.url).send().await?;

        if !response.status().is_success() {
            return Err(LocationError::Lookup(format!(
                "IP lookup returned {}",
                response.status()
            )));
        }

        let body: IpLookupResponse = response.json().await?;

        if body.error {
            return Err(LocationError::Lookup(
                body.reason.unwrap_or_else(|| "unknown error".to_string()),
            ));
        }

        let (Some(latitude), Some(longitude)) = (body.latitude, body.longitude) else {
            return Err(LocationError::ServiceUnavailable);
        };

        let mut location = Location::from_coordinates(latitude, longitude)?;
        location.city_name = match (body.city, body.country_name) {
            (Some(city), Some(country)) => Some(format!("{}, {}", city, country)),
            (city, country) => city.or(country),
        };
        tracing::info!(
            "IP location: {}",
            location.city_name.as_deref().unwrap_or("unnamed")
        );
        Ok(location)
    }
}

/// Saved coordinates if present, otherwise the IP fallback.
pub async fn get_current_location(
    store: &LocationStore,
    ip: &IpLocator,
) -> Result<Location, LocationError> {
    if let Some(location) = store.load() {
        return Ok(location);
    }
    tracing::debug!("No saved location, falling back to IP lookup");
    ip.locate().await
}
