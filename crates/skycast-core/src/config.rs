use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

use crate::error::ConfigError;

/// Prefix for environment overrides, e.g. `SKYCAST__LAUNCH__AUTO_TRY_UNKNOWN=true`.
const ENV_PREFIX: &str = "SKYCAST";
const ENV_SEPARATOR: &str = "__";

/// Configuration validation errors
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Result of config validation
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationResult {
    /// Returns true if there are no errors (warnings are OK)
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Add an error
    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Add a warning
    pub fn add_warning(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Get a user-friendly message summarizing all errors
    pub fn error_summary(&self) -> String {
        if self.errors.is_empty() {
            return String::new();
        }
        self.errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Application configuration directory
    pub config_dir: PathBuf,

    /// Companion app handoff settings
    pub launch: LaunchConfig,

    /// Weather settings
    pub weather: WeatherConfig,

    /// Reverse geocoding settings
    pub geocode: GeocodeConfig,

    /// Location fallback settings
    pub location: LocationConfig,
}

/// Settings for handing the page off to the installed companion app.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LaunchConfig {
    /// Custom URL scheme registered by the companion app
    pub scheme: String,

    /// How long a scheme probe waits for the page to be backgrounded
    pub open_timeout_ms: u64,

    /// Also probe automatically when the platform can't tell whether the app is installed.
    ///
    /// Every first-time visitor gets an unsolicited navigation attempt with this on.
    pub auto_try_unknown: bool,

    /// Name shown in banner copy
    pub app_name: String,
}

pub const DEFAULT_SCHEME: &str = "web+weather";
pub const DEFAULT_OPEN_TIMEOUT_MS: u64 = 1200;

impl Default for LaunchConfig {
    fn default() -> Self {
        Self {
            scheme: DEFAULT_SCHEME.to_string(),
            open_timeout_ms: DEFAULT_OPEN_TIMEOUT_MS,
            auto_try_unknown: false,
            app_name: "Weather".to_string(),
        }
    }
}

impl LaunchConfig {
    pub fn open_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.open_timeout_ms)
    }
}

/// Temperature unit preference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TemperatureUnit {
    #[default]
    Auto,
    Celsius,
    Fahrenheit,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WeatherConfig {
    /// Temperature unit preference
    pub temperature_unit: TemperatureUnit,

    /// Refresh interval in minutes
    pub refresh_minutes: u32,

    /// Number of forecast days to request
    pub forecast_days: u8,

    /// Forecast endpoint
    pub api_url: String,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            temperature_unit: TemperatureUnit::Auto,
            refresh_minutes: 15,
            forecast_days: 1,
            api_url: "https://api.open-meteo.com/v1/forecast".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeocodeConfig {
    /// Nominatim-compatible reverse geocoding endpoint
    pub base_url: String,

    /// API key, for hosted endpoints that require one
    pub api_key: Option<String>,
}

impl Default for GeocodeConfig {
    fn default() -> Self {
        Self {
            base_url: "https://nominatim.openstreetmap.org/reverse".to_string(),
            api_key: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LocationConfig {
    /// IP geolocation endpoint used when no coordinates are stored
    pub ip_lookup_url: String,
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            ip_lookup_url: "https://ipapi.co/json/".to_string(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("skycast");

        Self {
            config_dir,
            launch: LaunchConfig::default(),
            weather: WeatherConfig::default(),
            geocode: GeocodeConfig::default(),
            location: LocationConfig::default(),
        }
    }
}

/// Returns true for schemes a web page may register a handler for (`web+` and lowercase letters).
pub fn is_web_scheme(scheme: &str) -> bool {
    scheme
        .strip_prefix("web+")
        .is_some_and(|rest| !rest.is_empty() && rest.chars().all(|c| c.is_ascii_lowercase()))
}

fn is_plain_scheme(scheme: &str) -> bool {
    let mut chars = scheme.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

impl Config {
    /// Load configuration from the default location, creating it if it doesn't exist
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        Self::load_from(&config_path)
    }

    /// Load configuration from `path` with `SKYCAST__*` environment overrides.
    ///
    /// A missing file is created with defaults first.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            let mut config = Self::default();
            if let Some(parent) = path.parent() {
                config.config_dir = parent.to_path_buf();
            }
            config.save_to(path)?;
        }

        let settings = config::Config::builder()
            .add_source(config::File::from(path).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator(ENV_SEPARATOR)
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| ConfigError::ParseError(e.to_string()))
            .with_context(|| format!("Failed to read {}", path.display()))?;

        let config: Config = settings
            .try_deserialize()
            .map_err(|e| ConfigError::ParseError(e.to_string()))
            .with_context(|| format!("Failed to parse {}", path.display()))?;

        Ok(config)
    }

    /// Load configuration and validate it
    ///
    /// Returns the config along with any validation warnings.
    /// Returns an error if validation fails with critical errors.
    pub fn load_validated() -> Result<(Self, ValidationResult)> {
        let config = Self::load()?;
        let validation = config.validate();

        if !validation.is_valid() {
            return Err(ConfigError::Invalid(validation.error_summary()).into());
        }

        for warning in &validation.warnings {
            tracing::warn!("Config warning: {}", warning);
        }

        Ok((config, validation))
    }

    /// Validate the configuration
    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        let scheme = self.launch.scheme.as_str();
        if scheme.is_empty() {
            result.add_error("launch.scheme", "Scheme must not be empty");
        } else if !is_plain_scheme(scheme) {
            result.add_error("launch.scheme", format!("Invalid URL scheme: {}", scheme));
        } else if !is_web_scheme(scheme) {
            result.add_warning(
                "launch.scheme",
                format!(
                    "Scheme {} cannot be registered from a web page (expected web+<letters>)",
                    scheme
                ),
            );
        }

        if self.launch.open_timeout_ms == 0 {
            result.add_error("launch.open_timeout_ms", "Open timeout must be greater than 0");
        } else if self.launch.open_timeout_ms > 10_000 {
            result.add_warning(
                "launch.open_timeout_ms",
                "Open timeout is unusually long (>10s)",
            );
        }

        if self.launch.auto_try_unknown {
            result.add_warning(
                "launch.auto_try_unknown",
                "Automatic open attempts are enabled for visitors without an installed-app hint",
            );
        }

        if self.weather.refresh_minutes == 0 {
            result.add_warning(
                "weather.refresh_minutes",
                "Weather refresh disabled (0 minutes)",
            );
        } else if self.weather.refresh_minutes > 1440 {
            result.add_warning(
                "weather.refresh_minutes",
                "Weather refresh interval is more than 24 hours",
            );
        }

        if !(1..=16).contains(&self.weather.forecast_days) {
            result.add_error("weather.forecast_days", "Forecast days must be between 1 and 16");
        }

        self.validate_url(&self.weather.api_url, "weather.api_url", &mut result);
        self.validate_url(&self.geocode.base_url, "geocode.base_url", &mut result);
        self.validate_url(
            &self.location.ip_lookup_url,
            "location.ip_lookup_url",
            &mut result,
        );

        result
    }

    /// Validate a URL field
    fn validate_url(&self, url_str: &str, field_name: &str, result: &mut ValidationResult) {
        match Url::parse(url_str) {
            Ok(url) => {
                if url.scheme() != "http" && url.scheme() != "https" {
                    result.add_error(
                        field_name,
                        format!("URL must use http or https scheme, got: {}", url.scheme()),
                    );
                }

                if url.host().is_none() {
                    result.add_error(field_name, "URL must have a host");
                }

                if url.port() == Some(0) {
                    result.add_error(field_name, "Port cannot be 0");
                }
            }
            Err(e) => {
                result.add_error(field_name, format!("Invalid URL: {}", e));
            }
        }
    }

    /// Save configuration to the default location
    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;
        self.save_to(&config_path)
    }

    fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(config_path, contents).context("Failed to write config file")?;

        Ok(())
    }

    /// Get the path to the configuration file
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get config directory")?
            .join("skycast");

        Ok(config_dir.join("config.toml"))
    }
}
