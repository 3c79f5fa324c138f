use clap::{Parser, Subcommand, ValueEnum};
use skycast_launch::{InstallChoice, UserAction};
use url::Url;

#[derive(Parser, Debug)]
#[command(name = "skycast", version, about = "Skycast weather dashboard tools")]
pub struct Cli {
    #[arg(long, global = true, help = "Output machine-readable JSON")]
    pub json: bool,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Simulate a page load at URL against a headless browser
    Launch(LaunchArgs),
    /// Fetch the forecast for the saved, given, or IP-derived location
    Forecast(ForecastArgs),
    /// Show the effective configuration and validate it
    Config,
}

#[derive(clap::Args, Debug)]
pub struct LaunchArgs {
    /// Page URL, including any `source`/`payload` launch parameters
    pub url: Url,

    #[arg(long, help = "Page is running as an installed app")]
    pub standalone: bool,

    #[arg(
        long,
        value_name = "N",
        help = "Related-apps query reports N installed apps (omit: query unsupported)"
    )]
    pub related_apps: Option<usize>,

    #[arg(long, default_value_t = 0, help = "Delay before the related-apps answer, ms")]
    pub related_apps_delay_ms: u64,

    #[arg(long, value_enum, help = "Platform offers an install prompt that the user answers")]
    pub install_prompt: Option<PromptAnswer>,

    #[arg(long, help = "A companion app is registered for the launch scheme")]
    pub handler: bool,

    #[arg(long, default_value_t = 300, help = "How long the registered app takes to open, ms")]
    pub handler_delay_ms: u64,

    #[arg(long, help = "Probe automatically even when installation is unknown")]
    pub auto_try_unknown: bool,

    #[arg(long, help = "Override the probe timeout, ms")]
    pub timeout_ms: Option<u64>,

    #[arg(long = "click", value_enum, help = "Banner buttons to press, in order")]
    pub clicks: Vec<Click>,
}

#[derive(clap::Args, Debug)]
pub struct ForecastArgs {
    #[arg(long, allow_hyphen_values = true, requires = "lon")]
    pub lat: Option<f64>,

    #[arg(long, allow_hyphen_values = true, requires = "lat")]
    pub lon: Option<f64>,

    #[arg(long, requires = "lat", help = "Remember the given coordinates")]
    pub save: bool,

    #[arg(long, help = "Ignore the cached forecast")]
    pub refresh: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PromptAnswer {
    Accept,
    Dismiss,
}

impl From<PromptAnswer> for InstallChoice {
    fn from(answer: PromptAnswer) -> Self {
        match answer {
            PromptAnswer::Accept => InstallChoice::Accepted,
            PromptAnswer::Dismiss => InstallChoice::Dismissed,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Click {
    Open,
    Install,
    Help,
}

impl From<Click> for UserAction {
    fn from(click: Click) -> Self {
        match click {
            Click::Open => UserAction::OpenApp,
            Click::Install => UserAction::Install,
            Click::Help => UserAction::Help,
        }
    }
}
