//! Weather data for Skycast
//!
//! Forecasts from the Open-Meteo API, a place name from a Nominatim-compatible reverse
//! geocoder, saved or IP-derived coordinates, and an on-disk cache of the last forecast.

pub mod cache;
pub mod geocode;
pub mod location;
pub mod provider;
pub mod types;

pub use cache::WeatherCache;
pub use geocode::ReverseGeocoder;
pub use location::{get_current_location, IpLocator, LocationStore};
pub use provider::WeatherProvider;
pub use types::*;
