//! Inbound redirect resolver.
//!
//! Runs first on every load. When the companion app hands a destination back through
//! `?source=protocol&payload=...`, route there without leaving the app when possible.
//! Nothing here returns an error: every failure reduces to [`Resolution::Unrecognized`].

use serde::Serialize;
use url::Url;

use crate::context::LaunchContext;
use crate::host::Navigator;

/// What the resolver decided to do with this load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", content = "target", rename_all = "snake_case")]
pub enum Resolution {
    /// Not a protocol callback, or no payload
    NoAction,
    /// Client-side route change (path, query and fragment), replacing the history entry
    InAppRoute(String),
    /// Leave the app for another origin, replacing the history entry
    FullNavigation(Url),
    /// Payload could not be turned into a destination
    Unrecognized(String),
}

/// Percent-decode a payload, keeping the raw value if it doesn't decode.
pub fn decode_payload(payload: &str) -> String {
    match urlencoding::decode(payload) {
        Ok(decoded) => decoded.into_owned(),
        Err(e) => {
            tracing::debug!("Payload did not decode ({}), using raw value", e);
            payload.to_string()
        }
    }
}

fn route_of(url: &Url) -> String {
    let mut route = url.path().to_string();
    if let Some(query) = url.query() {
        route.push('?');
        route.push_str(query);
    }
    if let Some(fragment) = url.fragment() {
        route.push('#');
        route.push_str(fragment);
    }
    route
}

/// Decide where a decoded payload leads, relative to the current page.
pub fn resolve_payload(current: &Url, decoded: &str) -> Resolution {
    match current.join(decoded) {
        Ok(target) if target.origin() == current.origin() => {
            Resolution::InAppRoute(route_of(&target))
        }
        Ok(target) if matches!(target.scheme(), "http" | "https") => {
            Resolution::FullNavigation(target)
        }
        Ok(target) => {
            tracing::debug!("Refusing to navigate to {} payload", target.scheme());
            Resolution::Unrecognized(decoded.to_string())
        }
        Err(_) if decoded.starts_with('/') => Resolution::InAppRoute(decoded.to_string()),
        Err(e) => {
            tracing::debug!("Payload is not a URL: {}", e);
            Resolution::Unrecognized(decoded.to_string())
        }
    }
}

/// Parse the launch parameters of `current` and decide what to do.
pub fn resolve(current: &Url) -> (LaunchContext, Resolution) {
    let context = LaunchContext::from_url(current);
    let resolution = match context.redirect_payload() {
        Some(payload) => resolve_payload(current, &decode_payload(payload)),
        None => Resolution::NoAction,
    };
    (context, resolution)
}

/// Carry out a resolution on the page. Host failures are logged, never returned.
pub fn apply<N: Navigator + ?Sized>(navigator: &N, resolution: &Resolution) {
    let result = match resolution {
        Resolution::NoAction => return,
        Resolution::InAppRoute(route) => {
            tracing::info!("Protocol callback: routing to {}", route);
            navigator.replace_route(route)
        }
        Resolution::FullNavigation(url) => {
            tracing::info!("Protocol callback: leaving for {}", url);
            navigator.replace_location(url)
        }
        Resolution::Unrecognized(payload) => {
            tracing::warn!("Protocol callback: unrecognized payload: {}", payload);
            return;
        }
    };

    if let Err(e) = result {
        tracing::error!("Protocol callback navigation failed: {}", e);
    }
}

/// Resolve and apply the current page's launch parameters.
///
/// Returns the launch context for the negotiator; its suppression is set whenever the
/// companion app opened this page, whichever branch ran.
pub fn run<N: Navigator + ?Sized>(navigator: &N) -> (LaunchContext, Resolution) {
    let (context, resolution) = resolve(&navigator.current_url());
    apply(navigator, &resolution);
    if context.suppresses_negotiation() {
        tracing::debug!("Opened by companion app ({:?})", context.source());
    }
    (context, resolution)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;

    fn page() -> Url {
        Url::parse("https://weather.example/?source=protocol&payload=x").unwrap()
    }

    #[test]
    fn same_origin_absolute_is_route() {
        assert_eq!(
            resolve_payload(&page(), "https://weather.example/forecast/42?unit=c#hourly"),
            Resolution::InAppRoute("/forecast/42?unit=c#hourly".into())
        );
    }

    #[test]
    fn path_is_route() {
        assert_eq!(
            resolve_payload(&page(), "/forecast/42"),
            Resolution::InAppRoute("/forecast/42".into())
        );
    }

    #[test]
    fn protocol_params_do_not_leak_into_route() {
        let route = resolve_payload(&page(), "/today");
        assert_eq!(route, Resolution::InAppRoute("/today".into()));
    }

    #[test]
    fn cross_origin_is_full_navigation() {
        assert_eq!(
            resolve_payload(&page(), "https://other.example.com/x"),
            Resolution::FullNavigation(Url::parse("https://other.example.com/x").unwrap())
        );
    }

    #[test]
    fn different_port_is_cross_origin() {
        assert!(matches!(
            resolve_payload(&page(), "https://weather.example:8443/x"),
            Resolution::FullNavigation(_)
        ));
    }

    #[test]
    fn script_scheme_is_unrecognized() {
        assert!(matches!(
            resolve_payload(&page(), "javascript:alert(1)"),
            Resolution::Unrecognized(_)
        ));
    }

    #[test]
    fn unparseable_is_unrecognized() {
        assert!(matches!(
            resolve_payload(&page(), "http://exa mple.com/"),
            Resolution::Unrecognized(_)
        ));
    }

    #[test]
    fn decode_falls_back_to_raw() {
        // %FF is not valid UTF-8 on its own
        assert_eq!(decode_payload("%FF%2Fx"), "%FF%2Fx");
        assert_eq!(decode_payload("%2Fforecast%2F42"), "/forecast/42");
    }

    #[test]
    fn double_encoded_payload_is_decoded_twice() {
        let url = Url::parse(
            "https://weather.example/?source=protocol&payload=%252Fforecast%252F7",
        )
        .unwrap();
        let (_, resolution) = resolve(&url);
        assert_eq!(resolution, Resolution::InAppRoute("/forecast/7".into()));
    }

    #[test]
    fn no_marker_is_no_action() {
        let url = Url::parse("https://weather.example/?payload=%2Fx").unwrap();
        let (context, resolution) = resolve(&url);
        assert!(!context.suppresses_negotiation());
        assert_eq!(resolution, Resolution::NoAction);
    }

    #[test]
    fn app_marker_is_no_action_but_suppresses() {
        let url = Url::parse("https://weather.example/?source=app").unwrap();
        let (context, resolution) = resolve(&url);
        assert!(context.suppresses_negotiation());
        assert_eq!(resolution, Resolution::NoAction);
    }
}
