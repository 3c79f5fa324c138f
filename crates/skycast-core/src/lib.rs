pub mod config;
pub mod error;

pub use config::{
    Config, GeocodeConfig, LaunchConfig, LocationConfig, TemperatureUnit, ValidationResult,
    WeatherConfig,
};
pub use error::{AppError, ConfigError, LaunchError, NetworkError, ReqwestErrorExt};

use anyhow::Result;

/// Initialize logging for the process.
///
/// Logs go to stderr so command output stays parseable. Safe to call more than once; later
/// calls keep the first subscriber.
pub fn init() -> Result<()> {
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .try_init();

    tracing::debug!("Skycast core initialized");
    Ok(())
}
