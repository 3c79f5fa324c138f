mod cli;

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands, ForecastArgs, LaunchArgs};
use skycast_core::{AppError, Config};
use skycast_launch::{HeadlessHost, RelatedApps, SchemeHandler, ScriptedPrompt, SessionReport};
use skycast_weather::{
    get_current_location, IpLocator, Location, LocationStore, ReverseGeocoder, WeatherCache,
    WeatherData, WeatherProvider,
};

/// Slack added to every wait so the session's own timers fire first
const SETTLE_MARGIN: Duration = Duration::from_millis(100);

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!("{:#}", err);
            eprintln!("error: {}", AppError::classify(err).user_message());
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    skycast_core::init()?;

    match cli.command {
        Commands::Launch(args) => {
            let (config, _) = Config::load_validated()?;
            let report = launch(&config, args).await;
            print_launch(&report, cli.json)?;
        }
        Commands::Forecast(args) => {
            let (config, _) = Config::load_validated()?;
            let (data, place, stale) = forecast(&config, args).await?;
            print_forecast(&data, place.as_deref(), stale, cli.json)?;
        }
        Commands::Config => {
            let config = Config::load()?;
            print_config(&config, &config.validate(), cli.json)?;
        }
    }

    Ok(())
}

async fn launch(config: &Config, args: LaunchArgs) -> SessionReport {
    let mut launch_config = config.launch.clone();
    if args.auto_try_unknown {
        launch_config.auto_try_unknown = true;
    }
    if let Some(ms) = args.timeout_ms {
        launch_config.open_timeout_ms = ms;
    }

    let install_prompt = args.install_prompt;
    let clicks = args.clicks;
    let related_delay = Duration::from_millis(args.related_apps_delay_ms);
    let mut host = HeadlessHost::new(args.url)
        .with_standalone(args.standalone)
        .with_related_apps(match args.related_apps {
            Some(count) => RelatedApps::installed(count),
            None => RelatedApps::Unsupported,
        })
        .with_related_apps_delay(related_delay);
    if args.handler {
        host = host.with_scheme_handler(
            SchemeHandler::new(launch_config.scheme.clone())
                .with_launch_delay(Duration::from_millis(args.handler_delay_ms)),
        );
    }

    // Long enough for one probe to run to its timer
    let probe_window = launch_config.open_timeout() + SETTLE_MARGIN;
    let (handle, session) = skycast_launch::start(Arc::new(host), launch_config);

    let page = async move {
        if let Some(answer) = install_prompt {
            handle.offer_install(ScriptedPrompt::new(answer.into()));
        }
        tokio::time::sleep(related_delay + probe_window).await;
        for click in clicks {
            tracing::info!("User pressed {:?}", click);
            handle.click(click.into());
            tokio::time::sleep(probe_window).await;
        }
        tracing::debug!("Closing page with {:?} banner", handle.banner().kind);
        drop(handle);
    };

    let (report, ()) = tokio::join!(session, page);
    report
}

fn print_launch(report: &SessionReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    let negotiation = &report.negotiation;
    println!("Launch source: {:?}", report.context.source());
    println!("Resolution:    {:?}", report.resolution);
    println!(
        "State:         {:?}, installed={:?}, suppressed={}, probe={:?}",
        negotiation.state.display_mode,
        negotiation.state.installed_hint,
        negotiation.state.suppressed,
        negotiation.state.probe_status
    );
    for attempt in &negotiation.attempts {
        println!(
            "Attempt:       {:?} {} -> {:?} ({} ms)",
            attempt.trigger,
            attempt.target_url,
            attempt.resolution,
            attempt
                .elapsed_ms
                .map_or_else(|| "-".to_string(), |ms| ms.to_string())
        );
    }
    for outcome in &negotiation.install_outcomes {
        println!("Install:       {:?}", outcome);
    }

    let banner = &negotiation.banner;
    if banner.is_visible() {
        println!("Banner:        {} ({:?})", banner.title, banner.kind);
        println!("               {}", banner.message);
        let buttons: Vec<_> = banner
            .actions
            .iter()
            .map(|b| {
                if b.enabled {
                    format!("[{}]", b.label)
                } else {
                    format!("({})", b.label)
                }
            })
            .collect();
        println!("               {}", buttons.join(" "));
    } else {
        println!("Banner:        hidden");
    }
    Ok(())
}

fn weather_unit(config: &Config) -> skycast_weather::TemperatureUnit {
    match config.weather.temperature_unit {
        skycast_core::TemperatureUnit::Celsius => skycast_weather::TemperatureUnit::Celsius,
        skycast_core::TemperatureUnit::Fahrenheit => skycast_weather::TemperatureUnit::Fahrenheit,
        skycast_core::TemperatureUnit::Auto => skycast_weather::TemperatureUnit::Auto,
    }
}

/// Returns the forecast, the place name if one was found, and whether the data is stale.
async fn forecast(
    config: &Config,
    args: ForecastArgs,
) -> Result<(WeatherData, Option<String>, bool)> {
    let store = LocationStore::new(&config.config_dir);
    let location = match (args.lat, args.lon) {
        (Some(lat), Some(lon)) => {
            let location = Location::from_coordinates(lat, lon)?;
            if args.save {
                store.save(&location)?;
                tracing::info!("Saved location to {}", store.path().display());
            }
            location
        }
        _ => {
            let ip = IpLocator::new(config.location.ip_lookup_url.clone())?;
            get_current_location(&store, &ip)
                .await
                .context("Could not determine a location; pass --lat and --lon")?
        }
    };

    let mut cache =
        WeatherCache::new(&config.config_dir).with_refresh_minutes(config.weather.refresh_minutes);
    if let Err(e) = cache.load() {
        tracing::warn!("Ignoring weather cache: {}", e);
    }

    let geocoder = ReverseGeocoder::new(
        config.geocode.base_url.clone(),
        config.geocode.api_key.clone(),
    )?;

    if !args.refresh && !cache.is_stale() {
        if let Some(cached) = cache.get_for(&location) {
            tracing::info!("Using cached weather data");
            let place = geocoder.place_name(&location).await;
            return Ok((cached.clone(), place, false));
        }
    }

    let provider = WeatherProvider::new(weather_unit(config))?
        .with_api_url(config.weather.api_url.clone())
        .with_forecast_days(config.weather.forecast_days);

    let (data, stale) = match provider.fetch(&location).await {
        Ok(data) => {
            cache.update(data.clone());
            if let Err(e) = cache.save() {
                tracing::warn!("Failed to save weather cache: {}", e);
            }
            (data, false)
        }
        Err(e) => match cache.get_for(&location) {
            Some(cached) => {
                tracing::warn!("Failed to fetch weather ({}), showing cached data", e);
                (cached.clone(), true)
            }
            None => return Err(e).context("Failed to fetch weather"),
        },
    };

    let place = geocoder.place_name(&location).await;
    Ok((data, place, stale))
}

fn print_forecast(data: &WeatherData, place: Option<&str>, stale: bool, json: bool) -> Result<()> {
    if json {
        let value = serde_json::json!({
            "place": place,
            "stale": stale,
            "weather": data,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    let symbol = data.unit.symbol();
    let current = &data.current;
    let heading = place.map(str::to_string).unwrap_or_else(|| {
        format!(
            "{:.3}, {:.3}",
            data.location.latitude, data.location.longitude
        )
    });

    println!("{}{}", heading, if stale { " (stale)" } else { "" });
    print!(
        "{:.0}{}  {}",
        current.temperature,
        symbol,
        skycast_weather::wmo_description(current.weather_code)
    );
    if let Some(today) = data.today() {
        print!("  {:.0}°/{:.0}°", today.high, today.low);
    }
    println!();
    if let Some((label, time)) = data.next_sun_event() {
        println!("{} at {}", label, time.format("%H:%M"));
    }
    Ok(())
}

fn print_config(
    config: &Config,
    validation: &skycast_core::ValidationResult,
    json: bool,
) -> Result<()> {
    if json {
        let value = serde_json::json!({
            "path": Config::config_path()?,
            "config": config,
            "errors": validation.errors.iter().map(ToString::to_string).collect::<Vec<_>>(),
            "warnings": validation.warnings.iter().map(ToString::to_string).collect::<Vec<_>>(),
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    println!("# {}", Config::config_path()?.display());
    println!("{}", toml::to_string_pretty(config)?);
    for error in &validation.errors {
        println!("error: {}", error);
    }
    for warning in &validation.warnings {
        println!("warning: {}", warning);
    }
    Ok(())
}
