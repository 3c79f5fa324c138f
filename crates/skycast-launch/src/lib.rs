//! Launch negotiation between the Skycast web page and its installed companion app.
//!
//! Two halves run on every page load:
//! - the inbound [`resolver`] reads a `source`/`payload` marker left by a scheme handoff and
//!   moves the page to the intended destination;
//! - the outbound [`negotiator`] decides whether to try opening the installed app, runs the
//!   [`probe`], and keeps the open/install [`banner`] current.
//!
//! [`session::start`] wires both together in the required order. The page itself is reached
//! through the traits in [`host`]; [`headless::HeadlessHost`] implements them in memory.

pub mod banner;
pub mod context;
pub mod headless;
pub mod host;
pub mod install;
pub mod negotiator;
pub mod probe;
pub mod resolver;
pub mod scheme;
pub mod session;
pub mod state;

pub use banner::{Banner, BannerKind, UserAction};
pub use context::{LaunchContext, LaunchSource};
pub use headless::{HeadlessHost, NavigationRecord, RelatedApps, SchemeHandler, ScriptedPrompt};
pub use host::{
    ActivitySignal, ActivitySource, InstallChoice, InstallPrompt, Navigator, PageHost, RelatedApp,
};
pub use negotiator::{
    AttemptRecord, AttemptTrigger, InstallOutcome, NegotiationReport, Negotiator, PageEvent,
};
pub use probe::{probe, ProbeAttempt, ProbeResolution};
pub use resolver::Resolution;
pub use session::{start, SessionHandle, SessionReport};
pub use state::{DisplayMode, InstalledHint, NegotiationState, ProbeStatus};
