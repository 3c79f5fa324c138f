//! The open/install affordance shown at the bottom of the page.

use serde::Serialize;

use crate::state::{DisplayMode, InstalledHint, NegotiationState, ProbeStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BannerKind {
    Hidden,
    OpenApp,
    Install,
    ManualInstall,
}

/// Something the user can trigger from the banner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UserAction {
    OpenApp,
    Install,
    Help,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionButton {
    pub action: UserAction,
    pub label: &'static str,
    pub enabled: bool,
}

impl ActionButton {
    fn new(action: UserAction, label: &'static str) -> Self {
        Self {
            action,
            label,
            enabled: true,
        }
    }

    fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Banner {
    pub kind: BannerKind,
    pub title: String,
    pub message: String,
    pub actions: Vec<ActionButton>,
}

impl Banner {
    pub fn hidden() -> Self {
        Self {
            kind: BannerKind::Hidden,
            title: String::new(),
            message: String::new(),
            actions: Vec::new(),
        }
    }

    pub fn is_visible(&self) -> bool {
        self.kind != BannerKind::Hidden
    }

    pub fn has_action(&self, action: UserAction) -> bool {
        self.actions.iter().any(|b| b.action == action && b.enabled)
    }
}

impl Default for Banner {
    fn default() -> Self {
        Self::hidden()
    }
}

/// Messages shown in the banner.
pub mod copy {
    pub const INSTALL_DEFAULT: &str = "Install this app to your home screen.";
    pub const MANUAL_INSTALL: &str = "Install via browser menu → Add to Home screen.";
    pub const AUTO_FAILED_INSTALLED: &str =
        "It looks like the app is installed. Tap Open app to launch it.";
    pub const AUTO_FAILED_UNKNOWN: &str = "Tap Open app to launch the installed app.";
    pub const OPEN_FAILED: &str = "Couldn't open the app. Try reinstalling or open it manually.";
    pub const HELP: &str =
        "If you don't have the app, tap Install (or use browser menu → Add to Home screen).";
    pub const NO_INSTALL_PROMPT: &str =
        "No install prompt available. Use the browser menu → Add to Home screen.";
    pub const INSTALL_ACCEPTED: &str = "Thanks! The app is installed or installing.";
    pub const INSTALL_DISMISSED: &str = "Install dismissed.";
    pub const INSTALL_FAILED: &str = "Install failed or dismissed.";

    pub fn open_default(app_name: &str) -> String {
        format!(
            "Open the installed {} app for a faster, offline-capable experience.",
            app_name
        )
    }
}

/// Inputs to [`render`] that live outside [`NegotiationState`].
#[derive(Debug, Clone, Copy)]
pub struct RenderInputs<'a> {
    pub app_name: &'a str,
    pub install_available: bool,
    pub message: Option<&'a str>,
}

/// Compute the banner for the current state.
pub fn render(state: &NegotiationState, inputs: RenderInputs<'_>) -> Banner {
    if state.display_mode == DisplayMode::Standalone || state.suppressed {
        return Banner::hidden();
    }

    let message = |fallback: String| inputs.message.map(str::to_string).unwrap_or(fallback);
    let install = ActionButton::new(UserAction::Install, "Install");
    let help = ActionButton::new(UserAction::Help, "Help");

    match state.probe_status {
        ProbeStatus::Succeeded { .. } => Banner::hidden(),
        ProbeStatus::InFlight => Banner {
            kind: BannerKind::OpenApp,
            title: format!("Open {}?", inputs.app_name),
            message: message(copy::open_default(inputs.app_name)),
            actions: vec![
                ActionButton::new(UserAction::OpenApp, "Opening…").disabled(),
                help,
            ],
        },
        ProbeStatus::TimedOut => {
            let mut actions = vec![ActionButton::new(UserAction::OpenApp, "Open app"), help];
            if inputs.install_available {
                actions.push(install);
            }
            Banner {
                kind: BannerKind::OpenApp,
                title: format!("Open {}?", inputs.app_name),
                message: message(copy::OPEN_FAILED.to_string()),
                actions,
            }
        }
        ProbeStatus::Idle if state.installed_hint == InstalledHint::Yes => Banner {
            kind: BannerKind::OpenApp,
            title: format!("Open {}?", inputs.app_name),
            message: message(copy::open_default(inputs.app_name)),
            actions: vec![ActionButton::new(UserAction::OpenApp, "Open app"), help],
        },
        ProbeStatus::Idle if inputs.install_available => Banner {
            kind: BannerKind::Install,
            title: format!("Install {}", inputs.app_name),
            message: message(copy::INSTALL_DEFAULT.to_string()),
            actions: vec![install, ActionButton::new(UserAction::OpenApp, "Open app")],
        },
        ProbeStatus::Idle => Banner {
            kind: BannerKind::ManualInstall,
            title: format!("Install {}", inputs.app_name),
            message: message(copy::MANUAL_INSTALL.to_string()),
            actions: vec![
                ActionButton::new(UserAction::OpenApp, "Open app"),
                ActionButton::new(UserAction::Help, "How to install"),
            ],
        },
    }
}
