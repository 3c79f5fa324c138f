//! Single-use holder for the platform's deferred install prompt.

use crate::host::InstallPrompt;

/// Written from the platform's offer signal, consumed once by a user action.
#[derive(Debug)]
pub enum InstallOffer<P> {
    /// The platform never offered installation
    Unavailable,
    /// An offer is held and can be shown
    Captured(P),
    /// The last offer was used; a fresh one has to arrive first
    Consumed,
}

impl<P> Default for InstallOffer<P> {
    fn default() -> Self {
        InstallOffer::Unavailable
    }
}

impl<P: InstallPrompt> InstallOffer<P> {
    /// Store a new offer from the platform, deferring the platform's own prompt.
    ///
    /// A newer offer replaces one that is still held.
    pub fn capture(&mut self, mut prompt: P) {
        prompt.defer();
        if matches!(self, InstallOffer::Captured(_)) {
            tracing::debug!("Replacing held install offer with a newer one");
        }
        *self = InstallOffer::Captured(prompt);
    }

    /// Take the held offer for use. Returns `None` unless one is captured.
    pub fn take(&mut self) -> Option<P> {
        match std::mem::replace(self, InstallOffer::Consumed) {
            InstallOffer::Captured(prompt) => Some(prompt),
            other => {
                *self = other;
                None
            }
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, InstallOffer::Captured(_))
    }

    pub fn is_consumed(&self) -> bool {
        matches!(self, InstallOffer::Consumed)
    }

    /// True if the platform offered installation at any point this page load.
    pub fn was_offered(&self) -> bool {
        !matches!(self, InstallOffer::Unavailable)
    }
}
