//! Launch parameters parsed from the page URL.

use serde::Serialize;
use url::Url;

pub const SOURCE_PARAM: &str = "source";
pub const PAYLOAD_PARAM: &str = "payload";

/// Who opened this page load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LaunchSource {
    /// Direct navigation
    #[default]
    None,
    /// The companion app handed a destination back through `?source=protocol&payload=...`
    Protocol,
    /// The companion app opened the page without a destination
    App,
}

impl LaunchSource {
    fn from_marker(marker: &str) -> Self {
        match marker {
            "protocol" => Self::Protocol,
            "app" => Self::App,
            _ => Self::None,
        }
    }
}

/// Parsed inbound parameters for one page load. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct LaunchContext {
    source: LaunchSource,
    payload: Option<String>,
}

impl LaunchContext {
    /// Read `source` and `payload` from the query string.
    ///
    /// The payload is kept as the query parser decoded it; the resolver decodes it once more.
    /// An empty payload counts as absent.
    pub fn from_url(url: &Url) -> Self {
        let mut source = LaunchSource::None;
        let mut payload = None;

        for (key, value) in url.query_pairs() {
            match key.as_ref() {
                SOURCE_PARAM if source == LaunchSource::None => {
                    source = LaunchSource::from_marker(&value);
                }
                PAYLOAD_PARAM if payload.is_none() && !value.is_empty() => {
                    payload = Some(value.into_owned());
                }
                _ => {}
            }
        }

        Self { source, payload }
    }

    pub fn source(&self) -> LaunchSource {
        self.source
    }

    pub fn payload(&self) -> Option<&str> {
        self.payload.as_deref()
    }

    /// True when the companion app opened this page, in which case outbound negotiation stays off.
    pub fn suppresses_negotiation(&self) -> bool {
        matches!(self.source, LaunchSource::Protocol | LaunchSource::App)
    }

    /// The payload to redirect to, if this is a protocol callback carrying one.
    pub fn redirect_payload(&self) -> Option<&str> {
        match self.source {
            LaunchSource::Protocol => self.payload(),
            _ => None,
        }
    }
}
