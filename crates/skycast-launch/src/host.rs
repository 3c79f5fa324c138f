//! The seam between launch negotiation and the page it runs in.
//!
//! A browser binding implements these over `window`/`document`/`navigator`; [`crate::headless`]
//! implements them in memory.

use std::future::Future;

use serde::Serialize;
use skycast_core::LaunchError;
use tokio::sync::broadcast;
use url::Url;

use crate::state::DisplayMode;

/// Page-level activity that may follow a successful scheme handoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivitySignal {
    /// Document visibility changed; `hidden` is the new state
    Visibility { hidden: bool },
    /// The page is being unloaded
    PageHide,
    /// The window lost focus
    Blur,
}

impl ActivitySignal {
    /// True if this signal counts as evidence that another app took over.
    pub fn suggests_handoff(self) -> bool {
        match self {
            ActivitySignal::Visibility { hidden } => hidden,
            ActivitySignal::PageHide | ActivitySignal::Blur => true,
        }
    }

    /// True if the page actually left the foreground, as opposed to only losing focus.
    pub fn page_left(self) -> bool {
        matches!(
            self,
            ActivitySignal::Visibility { hidden: true } | ActivitySignal::PageHide
        )
    }
}

/// An installed application related to this site, as reported by the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RelatedApp {
    pub platform: String,
    pub id: Option<String>,
    pub url: Option<String>,
}

/// The user's answer to a native install prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InstallChoice {
    Accepted,
    Dismissed,
}

/// Page navigation.
pub trait Navigator: Send + Sync {
    /// The page's current URL.
    fn current_url(&self) -> Url;

    /// Client-side route change replacing the current history entry.
    fn replace_route(&self, route: &str) -> Result<(), LaunchError>;

    /// Full navigation replacing the current history entry.
    fn replace_location(&self, url: &Url) -> Result<(), LaunchError>;

    /// Full navigation to `url`. For an unhandled custom scheme the platform may silently ignore it.
    fn assign_location(&self, url: &str) -> Result<(), LaunchError>;
}

/// Source of [`ActivitySignal`]s.
pub trait ActivitySource: Send + Sync {
    /// Start listening. Only signals emitted after this call are delivered;
    /// dropping the receiver detaches the listener.
    fn subscribe_activity(&self) -> broadcast::Receiver<ActivitySignal>;
}

/// A deferred, platform-provided install prompt.
pub trait InstallPrompt: Send + 'static {
    /// Stop the platform from showing its own prompt automatically.
    fn defer(&mut self);

    /// Show the prompt and wait for the user's choice. Consumes the prompt.
    fn prompt(self) -> impl Future<Output = Result<InstallChoice, LaunchError>> + Send;
}

/// Everything the negotiator needs from the page.
pub trait PageHost: Navigator + ActivitySource {
    type Prompt: InstallPrompt;

    /// Whether the `(display-mode: standalone)` media query currently matches.
    fn display_mode_standalone(&self) -> bool;

    /// The legacy `navigator.standalone` flag, where the platform has one.
    fn legacy_standalone(&self) -> Option<bool>;

    /// Standalone display: the display-mode query matches, or the legacy flag is set.
    fn is_standalone(&self) -> bool {
        self.display_mode(self.display_mode_standalone()) == DisplayMode::Standalone
    }

    /// Combine a display-mode query result with the legacy flag.
    fn display_mode(&self, display_mode_standalone: bool) -> DisplayMode {
        DisplayMode::detect(display_mode_standalone, self.legacy_standalone())
    }

    /// Ask the platform for related installed apps.
    ///
    /// `Err(LaunchError::Unsupported(_))` when the platform has no such query.
    fn installed_related_apps(
        &self,
    ) -> impl Future<Output = Result<Vec<RelatedApp>, LaunchError>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn visible_is_not_handoff() {
        assert!(!ActivitySignal::Visibility { hidden: false }.suggests_handoff());
        assert!(ActivitySignal::Visibility { hidden: true }.suggests_handoff());
        assert!(ActivitySignal::PageHide.suggests_handoff());
        assert!(ActivitySignal::Blur.suggests_handoff());
    }

    #[test]
    fn blur_does_not_leave_page() {
        assert!(!ActivitySignal::Blur.page_left());
        assert!(ActivitySignal::PageHide.page_left());
    }
}
