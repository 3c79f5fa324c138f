//! One page load: resolver first, then the negotiator.
//!
//! The negotiator is built from the resolver's [`LaunchContext`], so suppression is decided
//! before any automatic attempt can be considered.

use std::future::Future;
use std::sync::Arc;

use serde::Serialize;
use skycast_core::LaunchConfig;
use tokio::sync::{mpsc, watch};

use crate::banner::{Banner, UserAction};
use crate::context::LaunchContext;
use crate::host::PageHost;
use crate::negotiator::{NegotiationReport, Negotiator, PageEvent};
use crate::resolver::{self, Resolution};

#[derive(Debug, Clone, Serialize)]
pub struct SessionReport {
    pub context: LaunchContext,
    pub resolution: Resolution,
    pub negotiation: NegotiationReport,
}

/// Feeds page events into a running session and observes its banner.
///
/// Dropping the handle ends the session.
pub struct SessionHandle<P> {
    events: mpsc::UnboundedSender<PageEvent<P>>,
    banner: watch::Receiver<Banner>,
}

impl<P> SessionHandle<P> {
    /// Returns false if the session has already ended.
    pub fn send(&self, event: PageEvent<P>) -> bool {
        self.events.send(event).is_ok()
    }

    pub fn offer_install(&self, prompt: P) -> bool {
        self.send(PageEvent::InstallOffered(prompt))
    }

    pub fn click(&self, action: UserAction) -> bool {
        self.send(PageEvent::User(action))
    }

    /// The display-mode query now matches (`true`) or no longer matches `standalone`.
    pub fn display_mode_changed(&self, standalone: bool) -> bool {
        self.send(PageEvent::DisplayModeChanged(standalone))
    }

    /// The banner as last published.
    pub fn banner(&self) -> Banner {
        self.banner.borrow().clone()
    }

    /// A receiver that is notified on every banner change.
    pub fn banner_updates(&self) -> watch::Receiver<Banner> {
        self.banner.clone()
    }
}

/// Start a page session on `host`.
///
/// Nothing runs until the returned future is polled; it completes once the handle is dropped.
pub fn start<H: PageHost>(
    host: Arc<H>,
    config: LaunchConfig,
) -> (SessionHandle<H::Prompt>, impl Future<Output = SessionReport>) {
    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let (banner_tx, banner_rx) = watch::channel(Banner::hidden());

    let session = async move {
        let (context, resolution) = resolver::run(&*host);
        let negotiator = Negotiator::new(host, config, &context, banner_tx);
        let negotiation = negotiator.run(events_rx).await;
        tracing::debug!(
            "Session ended after {} attempt(s)",
            negotiation.attempts.len()
        );
        SessionReport {
            context,
            resolution,
            negotiation,
        }
    };

    (
        SessionHandle {
            events: events_tx,
            banner: banner_rx,
        },
        session,
    )
}
