//! Scheme probe: best-effort handoff to an installed app.
//!
//! There is no acknowledgment for custom-scheme navigation. The page is navigated to the scheme
//! URL and success is inferred if the page is hidden, unloaded or loses focus before a timer
//! fires. A tab switch during the window reads as success; a slow app start reads as failure.

use std::time::Duration;

use serde::Serialize;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::time::Instant;

use crate::host::{ActivitySignal, ActivitySource, Navigator};

/// How a probe ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "signal", rename_all = "lowercase")]
pub enum ProbeResolution {
    Pending,
    /// An activity signal arrived before the timer
    Success(ActivitySignal),
    /// The timer elapsed first
    Failure,
}

/// One scheme-probe race.
#[derive(Debug, Clone)]
pub struct ProbeAttempt {
    target_url: String,
    started_at: Instant,
    timeout: Duration,
    resolution: ProbeResolution,
    resolved_at: Option<Instant>,
}

impl ProbeAttempt {
    pub fn new(target_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            target_url: target_url.into(),
            started_at: Instant::now(),
            timeout,
            resolution: ProbeResolution::Pending,
            resolved_at: None,
        }
    }

    /// Settle the attempt. Only the first call has an effect; returns whether it did.
    pub fn resolve(&mut self, resolution: ProbeResolution) -> bool {
        if self.resolution != ProbeResolution::Pending || resolution == ProbeResolution::Pending {
            return false;
        }
        self.resolution = resolution;
        self.resolved_at = Some(Instant::now());
        true
    }

    /// `Some(true)` if something suggests the handoff happened, `Some(false)` on timeout.
    pub fn outcome(&self) -> Option<bool> {
        match self.resolution {
            ProbeResolution::Pending => None,
            ProbeResolution::Success(_) => Some(true),
            ProbeResolution::Failure => Some(false),
        }
    }

    pub fn resolution(&self) -> ProbeResolution {
        self.resolution
    }

    pub fn target_url(&self) -> &str {
        &self.target_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Time from start to resolution, if resolved.
    pub fn elapsed(&self) -> Option<Duration> {
        self.resolved_at.map(|at| at.duration_since(self.started_at))
    }
}

/// Wait for the first signal that suggests a handoff.
///
/// Never completes if the source goes away; the timer decides then.
async fn next_handoff_signal(signals: &mut broadcast::Receiver<ActivitySignal>) -> ActivitySignal {
    loop {
        match signals.recv().await {
            Ok(signal) if signal.suggests_handoff() => return signal,
            Ok(signal) => tracing::trace!("Ignoring {:?} during probe", signal),
            Err(RecvError::Lagged(missed)) => {
                tracing::debug!("Probe listener lagged by {} signals", missed);
            }
            Err(RecvError::Closed) => std::future::pending::<()>().await,
        }
    }
}

/// Navigate to `target_url` and race `timeout` against the page's activity signals.
///
/// The listener is attached before navigating and dropped with the timer as soon as either
/// side wins, so nothing from this attempt can touch a later one.
pub async fn probe<H>(host: &H, target_url: &str, timeout: Duration) -> ProbeAttempt
where
    H: Navigator + ActivitySource + ?Sized,
{
    let mut attempt = ProbeAttempt::new(target_url, timeout);
    let mut signals = host.subscribe_activity();

    tracing::info!("Probing {} (timeout {:?})", target_url, timeout);
    if let Err(e) = host.assign_location(target_url) {
        tracing::debug!("Scheme navigation rejected: {}", e);
    }

    // A signal that is already waiting wins over a timer firing in the same tick
    let resolution = tokio::select! {
        biased;
        signal = next_handoff_signal(&mut signals) => ProbeResolution::Success(signal),
        _ = tokio::time::sleep(timeout) => ProbeResolution::Failure,
    };
    drop(signals);

    attempt.resolve(resolution);
    tracing::info!("Probe resolved: {:?}", attempt.resolution());
    attempt
}
