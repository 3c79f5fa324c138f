//! In-memory page host for the CLI and tests.
//!
//! Records every navigation, answers platform queries from a script, and can pretend a
//! companion app is registered for a scheme by emitting an activity signal shortly after the
//! page navigates to it.

use std::future::Future;
use std::time::Duration;

use parking_lot::Mutex;
use serde::Serialize;
use skycast_core::LaunchError;
use tokio::sync::broadcast;
use url::Url;

use crate::host::{
    ActivitySignal, ActivitySource, InstallChoice, InstallPrompt, Navigator, PageHost, RelatedApp,
};

const ACTIVITY_CAPACITY: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "target", rename_all = "snake_case")]
pub enum NavigationRecord {
    Route(String),
    Replace(String),
    Assign(String),
}

/// How the host answers the related-apps query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelatedApps {
    Unsupported,
    Reports(Vec<RelatedApp>),
    Fails(String),
}

impl RelatedApps {
    /// The query reports `count` installed apps.
    pub fn installed(count: usize) -> Self {
        RelatedApps::Reports(
            (0..count)
                .map(|i| RelatedApp {
                    platform: "webapp".to_string(),
                    id: Some(format!("companion-{}", i)),
                    url: None,
                })
                .collect(),
        )
    }
}

/// A registered handler for a custom scheme.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemeHandler {
    pub scheme: String,
    /// Delay between the navigation and the page reacting to the app opening
    pub launch_delay: Duration,
    pub signal: ActivitySignal,
}

impl SchemeHandler {
    pub fn new(scheme: impl Into<String>) -> Self {
        Self {
            scheme: scheme.into(),
            launch_delay: Duration::from_millis(300),
            signal: ActivitySignal::Visibility { hidden: true },
        }
    }

    pub fn with_launch_delay(mut self, delay: Duration) -> Self {
        self.launch_delay = delay;
        self
    }

    pub fn with_signal(mut self, signal: ActivitySignal) -> Self {
        self.signal = signal;
        self
    }

    fn handles(&self, url: &str) -> bool {
        url.strip_prefix(self.scheme.as_str())
            .is_some_and(|rest| rest.starts_with(':'))
    }
}

pub struct HeadlessHost {
    page: Mutex<Url>,
    display_mode_standalone: bool,
    legacy_standalone: Option<bool>,
    related_apps: RelatedApps,
    related_apps_delay: Duration,
    scheme_handler: Option<SchemeHandler>,
    activity: broadcast::Sender<ActivitySignal>,
    navigations: Mutex<Vec<NavigationRecord>>,
}

impl HeadlessHost {
    /// A browser tab at `url` with no related-apps support and no registered handler.
    pub fn new(url: Url) -> Self {
        let (activity, _) = broadcast::channel(ACTIVITY_CAPACITY);
        Self {
            page: Mutex::new(url),
            display_mode_standalone: false,
            legacy_standalone: None,
            related_apps: RelatedApps::Unsupported,
            related_apps_delay: Duration::ZERO,
            scheme_handler: None,
            activity,
            navigations: Mutex::new(Vec::new()),
        }
    }

    pub fn with_standalone(mut self, standalone: bool) -> Self {
        self.display_mode_standalone = standalone;
        self
    }

    pub fn with_legacy_standalone(mut self, standalone: bool) -> Self {
        self.legacy_standalone = Some(standalone);
        self
    }

    pub fn with_related_apps(mut self, related_apps: RelatedApps) -> Self {
        self.related_apps = related_apps;
        self
    }

    /// Delay before the related-apps query answers.
    pub fn with_related_apps_delay(mut self, delay: Duration) -> Self {
        self.related_apps_delay = delay;
        self
    }

    pub fn with_scheme_handler(mut self, handler: SchemeHandler) -> Self {
        self.scheme_handler = Some(handler);
        self
    }

    pub fn navigations(&self) -> Vec<NavigationRecord> {
        self.navigations.lock().clone()
    }

    /// Every URL the page was assigned to, in order.
    pub fn assigned_urls(&self) -> Vec<String> {
        self.navigations
            .lock()
            .iter()
            .filter_map(|n| match n {
                NavigationRecord::Assign(url) => Some(url.clone()),
                _ => None,
            })
            .collect()
    }

    /// Fire an activity signal; returns how many listeners received it.
    pub fn emit_activity(&self, signal: ActivitySignal) -> usize {
        self.activity.send(signal).unwrap_or(0)
    }

    /// Number of attached activity listeners.
    pub fn activity_listeners(&self) -> usize {
        self.activity.receiver_count()
    }

    fn record(&self, navigation: NavigationRecord) {
        self.navigations.lock().push(navigation);
    }
}

impl Navigator for HeadlessHost {
    fn current_url(&self) -> Url {
        self.page.lock().clone()
    }

    fn replace_route(&self, route: &str) -> Result<(), LaunchError> {
        let mut page = self.page.lock();
        let target = page
            .join(route)
            .map_err(|e| LaunchError::NavigationRejected(e.to_string()))?;
        if target.origin() != page.origin() {
            return Err(LaunchError::NavigationRejected(format!(
                "route {} leaves the app",
                route
            )));
        }
        *page = target;
        drop(page);
        self.record(NavigationRecord::Route(route.to_string()));
        Ok(())
    }

    fn replace_location(&self, url: &Url) -> Result<(), LaunchError> {
        *self.page.lock() = url.clone();
        self.record(NavigationRecord::Replace(url.to_string()));
        Ok(())
    }

    fn assign_location(&self, url: &str) -> Result<(), LaunchError> {
        Url::parse(url).map_err(|e| LaunchError::NavigationRejected(e.to_string()))?;
        self.record(NavigationRecord::Assign(url.to_string()));

        let Some(handler) = self.scheme_handler.as_ref().filter(|h| h.handles(url)) else {
            tracing::debug!("No handler for {}, navigation ignored", url);
            return Ok(());
        };

        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| LaunchError::NavigationRejected(e.to_string()))?;
        let activity = self.activity.clone();
        let delay = handler.launch_delay;
        let signal = handler.signal;
        runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = activity.send(signal);
        });
        Ok(())
    }
}

impl ActivitySource for HeadlessHost {
    fn subscribe_activity(&self) -> broadcast::Receiver<ActivitySignal> {
        self.activity.subscribe()
    }
}

impl PageHost for HeadlessHost {
    type Prompt = ScriptedPrompt;

    fn display_mode_standalone(&self) -> bool {
        self.display_mode_standalone
    }

    fn legacy_standalone(&self) -> Option<bool> {
        self.legacy_standalone
    }

    fn installed_related_apps(
        &self,
    ) -> impl Future<Output = Result<Vec<RelatedApp>, LaunchError>> + Send {
        let related_apps = self.related_apps.clone();
        let delay = self.related_apps_delay;
        async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            match related_apps {
                RelatedApps::Unsupported => Err(LaunchError::Unsupported("getInstalledRelatedApps")),
                RelatedApps::Reports(apps) => Ok(apps),
                RelatedApps::Fails(message) => Err(LaunchError::PlatformQuery(message)),
            }
        }
    }
}

/// An install prompt that answers with a fixed choice.
#[derive(Debug)]
pub struct ScriptedPrompt {
    answer: Result<InstallChoice, String>,
    delay: Duration,
    deferred: bool,
}

impl ScriptedPrompt {
    pub fn new(choice: InstallChoice) -> Self {
        Self {
            answer: Ok(choice),
            delay: Duration::ZERO,
            deferred: false,
        }
    }

    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            answer: Err(message.into()),
            delay: Duration::ZERO,
            deferred: false,
        }
    }

    /// Time the user takes to answer.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn is_deferred(&self) -> bool {
        self.deferred
    }
}

impl InstallPrompt for ScriptedPrompt {
    fn defer(&mut self) {
        self.deferred = true;
    }

    fn prompt(self) -> impl Future<Output = Result<InstallChoice, LaunchError>> + Send {
        async move {
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.answer.map_err(LaunchError::InstallPrompt)
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;
    use crate::probe::{probe, ProbeResolution};

    const TARGET: &str = "web+weather://open?url=https%3A%2F%2Fweather.example%2F";

    fn host() -> HeadlessHost {
        HeadlessHost::new(Url::parse("https://weather.example/").unwrap())
    }

    #[test]
    fn route_replaces_page_url() {
        let host = host();
        host.replace_route("/forecast/42?unit=c").unwrap();
        assert_eq!(
            host.current_url().as_str(),
            "https://weather.example/forecast/42?unit=c"
        );
        assert_eq!(
            host.navigations(),
            vec![NavigationRecord::Route("/forecast/42?unit=c".into())]
        );
    }

    #[test]
    fn route_cannot_leave_origin() {
        let host = host();
        assert!(host.replace_route("https://other.example.com/").is_err());
        assert!(host.navigations().is_empty());
    }

    #[test]
    fn assign_rejects_garbage() {
        let host = host();
        assert!(host.assign_location("not a url").is_err());
    }

    #[test]
    fn legacy_flag_is_standalone() {
        assert!(host().with_legacy_standalone(true).is_standalone());
        assert!(!host().is_standalone());
    }

    #[tokio::test]
    async fn related_apps_behaviors() {
        let unsupported = host().installed_related_apps().await;
        assert!(matches!(unsupported, Err(LaunchError::Unsupported(_))));

        let reports = host()
            .with_related_apps(RelatedApps::installed(2))
            .installed_related_apps()
            .await
            .unwrap();
        assert_eq!(reports.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn handler_makes_probe_succeed() {
        let host = host().with_scheme_handler(SchemeHandler::new("web+weather"));

        let attempt = probe(&host, TARGET, Duration::from_millis(1200)).await;

        assert_eq!(
            attempt.resolution(),
            ProbeResolution::Success(ActivitySignal::Visibility { hidden: true })
        );
        let elapsed = attempt.elapsed().unwrap();
        assert!(elapsed >= Duration::from_millis(300) && elapsed < Duration::from_millis(1200));
        assert_eq!(host.activity_listeners(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_handler_is_a_false_negative() {
        let host = host().with_scheme_handler(
            SchemeHandler::new("web+weather").with_launch_delay(Duration::from_secs(3)),
        );

        let attempt = probe(&host, TARGET, Duration::from_millis(1200)).await;

        assert_eq!(attempt.outcome(), Some(false));
    }

    #[tokio::test(start_paused = true)]
    async fn other_scheme_is_ignored() {
        let host = host().with_scheme_handler(SchemeHandler::new("web+maps"));

        let attempt = probe(&host, TARGET, Duration::from_millis(1200)).await;

        assert_eq!(attempt.resolution(), ProbeResolution::Failure);
        assert_eq!(host.assigned_urls(), vec![TARGET.to_string()]);
    }

    #[tokio::test]
    async fn scripted_prompt_answers() {
        let mut prompt = ScriptedPrompt::new(InstallChoice::Dismissed);
        prompt.defer();
        assert!(prompt.is_deferred());
        assert_eq!(prompt.prompt().await, Ok(InstallChoice::Dismissed));

        let failing = ScriptedPrompt::failing("blocked");
        assert_eq!(
            failing.prompt().await,
            Err(LaunchError::InstallPrompt("blocked".into()))
        );
    }
}
