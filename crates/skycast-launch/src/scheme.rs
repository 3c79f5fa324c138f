//! Companion app scheme URLs.
//!
//! Outbound: `{scheme}://open?url={encoded page URL}`. The companion app answers with
//! `?source=protocol&payload={encoded url}`, which is what [`crate::resolver`] accepts.

use skycast_core::config::is_web_scheme;
use skycast_core::LaunchError;
use url::Url;

use crate::context::{PAYLOAD_PARAM, SOURCE_PARAM};

/// Build the URL that asks the companion app to open `page`.
pub fn outbound_url(scheme: &str, page: &Url) -> String {
    format!("{}://open?url={}", scheme, urlencoding::encode(page.as_str()))
}

/// Build the page URL the companion app uses to hand `destination` back to the site.
pub fn inbound_url(origin: &Url, destination: &str) -> Url {
    let mut url = origin.clone();
    url.set_path("/");
    url.set_fragment(None);
    url.set_query(Some(&format!(
        "{}=protocol&{}={}",
        SOURCE_PARAM,
        PAYLOAD_PARAM,
        urlencoding::encode(destination)
    )));
    url
}

/// Extract the page URL from an outbound scheme URL, as the companion app would.
pub fn parse_outbound(scheme: &str, outbound: &str) -> Option<String> {
    let query = outbound
        .strip_prefix(scheme)?
        .strip_prefix("://open?")?;
    query.split('&').find_map(|pair| {
        let value = pair.strip_prefix("url=")?;
        urlencoding::decode(value).ok().map(|v| v.into_owned())
    })
}

/// Reject schemes a web page cannot register a handler for.
pub fn ensure_web_scheme(scheme: &str) -> Result<(), LaunchError> {
    if is_web_scheme(scheme) {
        Ok(())
    } else {
        Err(LaunchError::InvalidScheme(scheme.to_string()))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;
    use crate::context::{LaunchContext, LaunchSource};

    #[test]
    fn outbound_encodes_page_url() {
        let page = Url::parse("https://weather.example/forecast?day=2#hourly").unwrap();
        assert_eq!(
            outbound_url("web+weather", &page),
            "web+weather://open?url=https%3A%2F%2Fweather.example%2Fforecast%3Fday%3D2%23hourly"
        );
    }

    #[test]
    fn outbound_round_trips_through_companion() {
        let page = Url::parse("https://weather.example/forecast/42?unit=c").unwrap();
        let outbound = outbound_url("web+weather", &page);

        let received = parse_outbound("web+weather", &outbound).unwrap();
        assert_eq!(received, page.as_str());

        let back = inbound_url(&page, &received);
        let ctx = LaunchContext::from_url(&back);
        assert_eq!(ctx.source(), LaunchSource::Protocol);
        assert_eq!(ctx.redirect_payload(), Some(page.as_str()));
    }

    #[test]
    fn parse_outbound_wrong_scheme() {
        assert_eq!(parse_outbound("web+weather", "web+other://open?url=x"), None);
    }

    #[test]
    fn web_scheme_check() {
        assert!(ensure_web_scheme("web+weather").is_ok());
        assert_eq!(
            ensure_web_scheme("weather"),
            Err(LaunchError::InvalidScheme("weather".into()))
        );
    }
}
