//! Outbound launch negotiator.
//!
//! Owns the [`NegotiationState`] for the lifetime of the page. Combines standalone detection,
//! the captured install offer, the installed-app hint and the resolver's suppression into one
//! decision, runs at most one automatic scheme probe, and publishes the banner over a
//! `watch` channel.

use std::sync::Arc;

use serde::Serialize;
use skycast_core::LaunchConfig;
use tokio::sync::{mpsc, watch};

use crate::banner::{copy, render, Banner, RenderInputs, UserAction};
use crate::context::LaunchContext;
use crate::host::{InstallChoice, InstallPrompt, PageHost};
use crate::install::InstallOffer;
use crate::probe::{self, ProbeAttempt, ProbeResolution};
use crate::scheme;
use crate::state::{Decision, InstalledHint, NegotiationState};

/// Something that happened on the page.
#[derive(Debug)]
pub enum PageEvent<P> {
    /// The display-mode media query changed; carries whether it now matches `standalone`
    DisplayModeChanged(bool),
    /// The platform offered a deferred install prompt
    InstallOffered(P),
    /// The user pressed a banner button
    User(UserAction),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AttemptTrigger {
    Automatic,
    User,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttemptRecord {
    pub trigger: AttemptTrigger,
    pub target_url: String,
    pub resolution: ProbeResolution,
    pub elapsed_ms: Option<u64>,
}

impl AttemptRecord {
    fn new(trigger: AttemptTrigger, attempt: &ProbeAttempt) -> Self {
        Self {
            trigger,
            target_url: attempt.target_url().to_string(),
            resolution: attempt.resolution(),
            elapsed_ms: attempt.elapsed().map(|d| d.as_millis() as u64),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InstallOutcome {
    Accepted,
    Dismissed,
    Failed,
    /// No captured offer was available
    Unavailable,
}

/// What happened during one page load.
#[derive(Debug, Clone, Serialize)]
pub struct NegotiationReport {
    pub state: NegotiationState,
    pub attempts: Vec<AttemptRecord>,
    pub install_outcomes: Vec<InstallOutcome>,
    pub banner: Banner,
    /// Number of distinct banners published
    pub renders: usize,
}

impl NegotiationReport {
    pub fn automatic_attempts(&self) -> usize {
        self.attempts
            .iter()
            .filter(|a| a.trigger == AttemptTrigger::Automatic)
            .count()
    }
}

pub struct Negotiator<H: PageHost> {
    host: Arc<H>,
    config: LaunchConfig,
    state: NegotiationState,
    offer: InstallOffer<H::Prompt>,
    message: Option<String>,
    attempts: Vec<AttemptRecord>,
    install_outcomes: Vec<InstallOutcome>,
    banner_tx: watch::Sender<Banner>,
    renders: usize,
}

impl<H: PageHost> Negotiator<H> {
    /// Build the negotiator from the resolver's context. The resolver must have run already.
    pub fn new(
        host: Arc<H>,
        config: LaunchConfig,
        context: &LaunchContext,
        banner_tx: watch::Sender<Banner>,
    ) -> Self {
        if let Err(e) = scheme::ensure_web_scheme(&config.scheme) {
            tracing::warn!("{}; handoff attempts will likely be ignored", e);
        }

        let display_mode = host.display_mode(host.display_mode_standalone());
        let state = NegotiationState::new(display_mode, context.suppresses_negotiation());
        tracing::debug!(
            "Negotiator starting: {:?}, suppressed={}",
            state.display_mode,
            state.suppressed
        );

        Self {
            host,
            config,
            state,
            offer: InstallOffer::default(),
            message: None,
            attempts: Vec::new(),
            install_outcomes: Vec::new(),
            banner_tx,
            renders: 0,
        }
    }

    pub fn state(&self) -> &NegotiationState {
        &self.state
    }

    /// The banner for the current state.
    pub fn banner(&self) -> Banner {
        render(
            &self.state,
            RenderInputs {
                app_name: &self.config.app_name,
                install_available: self.offer.is_available(),
                message: self.message.as_deref(),
            },
        )
    }

    /// Drive the negotiator until the event channel closes.
    ///
    /// The related-apps query runs alongside event handling; its answer may arrive before or
    /// after an install offer.
    pub async fn run(mut self, mut events: mpsc::UnboundedReceiver<PageEvent<H::Prompt>>) -> NegotiationReport {
        self.publish();
        self.evaluate().await;

        let host = Arc::clone(&self.host);
        let related = host.installed_related_apps();
        tokio::pin!(related);
        let mut awaiting_related = true;

        loop {
            tokio::select! {
                result = &mut related, if awaiting_related => {
                    awaiting_related = false;
                    if let Err(e) = &result {
                        tracing::debug!("Related apps query: {}", e);
                    }
                    self.on_installed_hint(InstalledHint::from_related_apps(&result)).await;
                }
                event = events.recv() => match event {
                    Some(event) => self.handle(event).await,
                    None => break,
                },
            }
        }

        self.report()
    }

    pub async fn handle(&mut self, event: PageEvent<H::Prompt>) {
        match event {
            PageEvent::DisplayModeChanged(matches) => {
                let mode = self.host.display_mode(matches);
                tracing::debug!("Display mode query changed to {}: {:?}", matches, mode);
                self.state.set_display_mode(mode);
                self.publish();
                self.evaluate().await;
            }
            PageEvent::InstallOffered(prompt) => {
                tracing::debug!("Install offer captured");
                self.offer.capture(prompt);
                self.publish();
            }
            PageEvent::User(action) => self.on_user_action(action).await,
        }
    }

    pub async fn on_installed_hint(&mut self, hint: InstalledHint) {
        tracing::debug!("Installed hint: {:?}", hint);
        self.state.set_installed_hint(hint);
        self.publish();
        self.evaluate().await;
    }

    /// Run the automatic attempt if the policy allows it and it hasn't happened yet.
    async fn evaluate(&mut self) {
        if self.state.decide(self.config.auto_try_unknown) != Decision::AutoProbe {
            return;
        }
        if !self.state.mark_attempted() {
            return;
        }

        let failure_message = match self.state.installed_hint {
            InstalledHint::Yes => copy::AUTO_FAILED_INSTALLED,
            _ => copy::AUTO_FAILED_UNKNOWN,
        };
        self.attempt(AttemptTrigger::Automatic, failure_message).await;
    }

    async fn on_user_action(&mut self, action: UserAction) {
        if self.state.decide(self.config.auto_try_unknown) == Decision::StayQuiet {
            tracing::debug!("Ignoring {:?} while the banner is hidden", action);
            return;
        }
        // Install without a held offer only reports it unavailable, so it is always let through.
        let offered = self.banner().has_action(action)
            || (action == UserAction::Install && !self.offer.is_available());
        if !offered {
            tracing::debug!("Ignoring {:?}, not offered by the current banner", action);
            return;
        }

        match action {
            UserAction::OpenApp => {
                self.state.mark_attempted();
                self.attempt(AttemptTrigger::User, copy::OPEN_FAILED).await;
            }
            UserAction::Help => {
                self.message = Some(copy::HELP.to_string());
                self.publish();
            }
            UserAction::Install => self.install().await,
        }
    }

    async fn attempt(&mut self, trigger: AttemptTrigger, failure_message: &str) {
        if !self.state.begin_probe() {
            tracing::debug!("Probe already in flight, ignoring {:?} attempt", trigger);
            return;
        }
        self.message = None;
        self.publish();

        let target = scheme::outbound_url(&self.config.scheme, &self.host.current_url());
        let attempt = probe::probe(&*self.host, &target, self.config.open_timeout()).await;

        self.state.finish_probe(attempt.resolution());
        if attempt.outcome() == Some(false) {
            self.message = Some(failure_message.to_string());
        }
        self.attempts.push(AttemptRecord::new(trigger, &attempt));
        self.publish();
    }

    async fn install(&mut self) {
        let Some(prompt) = self.offer.take() else {
            tracing::info!("Install requested without a captured offer");
            self.install_outcomes.push(InstallOutcome::Unavailable);
            self.message = Some(copy::NO_INSTALL_PROMPT.to_string());
            self.publish();
            return;
        };

        let (outcome, message) = match prompt.prompt().await {
            Ok(InstallChoice::Accepted) => (InstallOutcome::Accepted, copy::INSTALL_ACCEPTED),
            Ok(InstallChoice::Dismissed) => (InstallOutcome::Dismissed, copy::INSTALL_DISMISSED),
            Err(e) => {
                tracing::warn!("Install prompt failed: {}", e);
                (InstallOutcome::Failed, copy::INSTALL_FAILED)
            }
        };
        tracing::info!("Install outcome: {:?}", outcome);
        self.install_outcomes.push(outcome);
        self.message = Some(message.to_string());
        self.publish();
    }

    /// Publish the banner if it differs from the last one.
    fn publish(&mut self) {
        let banner = self.banner();
        let changed = self.banner_tx.send_if_modified(|current| {
            if *current == banner {
                false
            } else {
                *current = banner;
                true
            }
        });
        if changed {
            self.renders += 1;
        }
    }

    fn report(&self) -> NegotiationReport {
        NegotiationReport {
            state: self.state,
            attempts: self.attempts.clone(),
            install_outcomes: self.install_outcomes.clone(),
            banner: self.banner(),
            renders: self.renders,
        }
    }
}
