//! Outbound negotiation state machine.
//!
//! Pure transitions; the async side lives in [`crate::negotiator`].

use serde::Serialize;

use crate::host::RelatedApp;
use crate::probe::ProbeResolution;
use skycast_core::LaunchError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayMode {
    Standalone,
    #[default]
    Browser,
}

impl DisplayMode {
    /// Standalone if the display-mode query matches or the legacy flag is set.
    pub fn detect(display_mode_standalone: bool, legacy_standalone: Option<bool>) -> Self {
        if display_mode_standalone || legacy_standalone == Some(true) {
            DisplayMode::Standalone
        } else {
            DisplayMode::Browser
        }
    }
}

/// Best-effort signal that the companion app is installed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InstalledHint {
    Yes,
    No,
    #[default]
    Unknown,
}

impl InstalledHint {
    /// Read a related-apps query result.
    ///
    /// An empty list is indistinguishable from "can't tell", so it maps to `Unknown`, as does
    /// a missing or failing query. This never yields `No`.
    pub fn from_related_apps(result: &Result<Vec<RelatedApp>, LaunchError>) -> Self {
        match result {
            Ok(apps) if !apps.is_empty() => InstalledHint::Yes,
            _ => InstalledHint::Unknown,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ProbeStatus {
    #[default]
    Idle,
    InFlight,
    /// `handoff` is true when the page was hidden or unloaded, false when it only lost focus
    Succeeded { handoff: bool },
    TimedOut,
}

impl ProbeStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, ProbeStatus::Succeeded { .. } | ProbeStatus::TimedOut)
    }
}

/// What the negotiator should do after a state change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Running as the app, or opened by it: render nothing, never probe
    StayQuiet,
    /// Probe automatically now
    AutoProbe,
    /// Render an affordance and wait for the user
    Offer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct NegotiationState {
    pub display_mode: DisplayMode,
    pub installed_hint: InstalledHint,
    pub suppressed: bool,
    pub probe_status: ProbeStatus,
    pub attempted: bool,
}

impl NegotiationState {
    pub fn new(display_mode: DisplayMode, suppressed: bool) -> Self {
        Self {
            display_mode,
            suppressed,
            ..Self::default()
        }
    }

    /// Apply the decision policy.
    pub fn decide(&self, auto_try_unknown: bool) -> Decision {
        if self.display_mode == DisplayMode::Standalone || self.suppressed {
            return Decision::StayQuiet;
        }
        if self.attempted {
            return Decision::Offer;
        }
        match self.installed_hint {
            InstalledHint::Yes => Decision::AutoProbe,
            InstalledHint::Unknown if auto_try_unknown => Decision::AutoProbe,
            _ => Decision::Offer,
        }
    }

    /// Set the one-shot attempt flag. Returns false if it was already set.
    pub fn mark_attempted(&mut self) -> bool {
        if self.attempted {
            return false;
        }
        self.attempted = true;
        true
    }

    /// True if a new probe can start.
    pub fn can_start_probe(&self) -> bool {
        self.probe_status != ProbeStatus::InFlight
    }

    /// Enter `InFlight`. Returns false while another probe is running.
    pub fn begin_probe(&mut self) -> bool {
        if !self.can_start_probe() {
            return false;
        }
        self.probe_status = ProbeStatus::InFlight;
        true
    }

    /// Record the end of the running probe. Ignored unless a probe is in flight.
    pub fn finish_probe(&mut self, resolution: ProbeResolution) {
        if self.probe_status != ProbeStatus::InFlight {
            return;
        }
        self.probe_status = match resolution {
            ProbeResolution::Pending => return,
            ProbeResolution::Success(signal) => ProbeStatus::Succeeded {
                handoff: signal.page_left(),
            },
            ProbeResolution::Failure => ProbeStatus::TimedOut,
        };
    }

    pub fn set_display_mode(&mut self, mode: DisplayMode) {
        self.display_mode = mode;
    }

    pub fn set_installed_hint(&mut self, hint: InstalledHint) {
        self.installed_hint = hint;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::ActivitySignal;

    fn browser() -> NegotiationState {
        NegotiationState::new(DisplayMode::Browser, false)
    }

    #[test]
    fn standalone_stays_quiet() {
        let mut s = NegotiationState::new(DisplayMode::Standalone, false);
        s.set_installed_hint(InstalledHint::Yes);
        assert_eq!(s.decide(true), Decision::StayQuiet);
    }

    #[test]
    fn suppressed_stays_quiet() {
        let mut s = NegotiationState::new(DisplayMode::Browser, true);
        s.set_installed_hint(InstalledHint::Yes);
        assert_eq!(s.decide(true), Decision::StayQuiet);
    }

    #[test]
    fn installed_probes_once() {
        let mut s = browser();
        s.set_installed_hint(InstalledHint::Yes);
        assert_eq!(s.decide(false), Decision::AutoProbe);

        assert!(s.mark_attempted());
        assert!(!s.mark_attempted());
        assert_eq!(s.decide(false), Decision::Offer);
    }

    #[test]
    fn unknown_needs_opt_in() {
        let s = browser();
        assert_eq!(s.decide(false), Decision::Offer);
        assert_eq!(s.decide(true), Decision::AutoProbe);
    }

    #[test]
    fn no_hint_never_probes() {
        let mut s = browser();
        s.set_installed_hint(InstalledHint::No);
        assert_eq!(s.decide(true), Decision::Offer);
    }

    #[test]
    fn related_apps_mapping() {
        let app = RelatedApp {
            platform: "webapp".into(),
            id: None,
            url: Some("https://weather.example/manifest.json".into()),
        };
        assert_eq!(InstalledHint::from_related_apps(&Ok(vec![app])), InstalledHint::Yes);
        assert_eq!(InstalledHint::from_related_apps(&Ok(vec![])), InstalledHint::Unknown);
        assert_eq!(
            InstalledHint::from_related_apps(&Err(LaunchError::Unsupported(
                "getInstalledRelatedApps"
            ))),
            InstalledHint::Unknown
        );
    }

    #[test]
    fn legacy_flag_counts_as_standalone() {
        assert_eq!(DisplayMode::detect(false, Some(true)), DisplayMode::Standalone);
        assert_eq!(DisplayMode::detect(true, None), DisplayMode::Standalone);
        assert_eq!(DisplayMode::detect(false, Some(false)), DisplayMode::Browser);
        assert_eq!(DisplayMode::detect(false, None), DisplayMode::Browser);
    }

    #[test]
    fn probe_status_moves_forward_only() {
        let mut s = browser();
        s.finish_probe(ProbeResolution::Failure);
        assert_eq!(s.probe_status, ProbeStatus::Idle);

        assert!(s.begin_probe());
        assert!(!s.begin_probe());
        s.finish_probe(ProbeResolution::Success(ActivitySignal::PageHide));
        assert_eq!(s.probe_status, ProbeStatus::Succeeded { handoff: true });

        s.finish_probe(ProbeResolution::Failure);
        assert_eq!(s.probe_status, ProbeStatus::Succeeded { handoff: true });
    }

    #[test]
    fn blur_is_success_without_handoff() {
        let mut s = browser();
        assert!(s.begin_probe());
        s.finish_probe(ProbeResolution::Success(ActivitySignal::Blur));
        assert_eq!(s.probe_status, ProbeStatus::Succeeded { handoff: false });
        assert!(s.probe_status.is_terminal());
    }

    #[test]
    fn retry_after_timeout() {
        let mut s = browser();
        assert!(s.begin_probe());
        s.finish_probe(ProbeResolution::Failure);
        assert_eq!(s.probe_status, ProbeStatus::TimedOut);
        assert!(s.can_start_probe());
    }
}
