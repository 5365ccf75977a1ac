//! Product analytics events.
//!
//! Events are fire-and-forget: delivery runs on a spawned task and failures are
//! only logged, so tracking never changes the outcome of a request.

use crate::APP_USER_AGENT;
use chrono::Utc;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use ulid::Ulid;

pub const LOGIN_FAILED: &str = "login_failed";
pub const LOGIN_SUCCESSFUL: &str = "login_successful";
pub const LOGIN_UNCONFIRMED_EMAIL: &str = "login_unconfirmed_email";

pub trait EventTracker: Send + Sync {
    fn track(&self, name: &str, props: Value);
}

/// Used when no analytics key is configured.
#[derive(Debug, Default)]
pub struct NoopTracker;

impl EventTracker for NoopTracker {
    fn track(&self, name: &str, _props: Value) {
        debug!("analytics disabled, dropping event {name}");
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SystemProps {
    is_debug: bool,
    locale: &'static str,
    app_version: &'static str,
    sdk_version: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Event<'a> {
    timestamp: String,
    session_id: String,
    event_name: &'a str,
    system_props: SystemProps,
    props: Value,
}

/// Aptabase event ingestion client.
#[derive(Clone, Debug)]
pub struct AptabaseTracker {
    http: Client,
    endpoint: String,
    app_key: String,
    session_id: String,
}

impl AptabaseTracker {
    /// Build a tracker for `app_key`, whose region selects the ingestion host.
    /// Returns `None` for keys of unknown regions.
    #[must_use]
    pub fn new(app_key: &str) -> Option<Self> {
        let host = match app_key.split('-').nth(1)? {
            "US" => "https://us.aptabase.com",
            "EU" => "https://eu.aptabase.com",
            "DEV" => "http://localhost:3000",
            _ => return None,
        };
        Self::with_host(host, app_key)
    }

    fn with_host(host: &str, app_key: &str) -> Option<Self> {
        let http = Client::builder()
            .user_agent(APP_USER_AGENT)
            .timeout(Duration::from_secs(5))
            .build()
            .ok()?;
        Some(Self {
            http,
            endpoint: format!("{}/api/v0/event", host.trim_end_matches('/')),
            app_key: app_key.to_string(),
            session_id: Ulid::new().to_string(),
        })
    }

    /// Deliver one event.
    ///
    /// # Errors
    /// Returns an error when the request fails or the service rejects the event.
    pub async fn send(&self, name: &str, props: Value) -> Result<(), reqwest::Error> {
        let event = Event {
            timestamp: Utc::now().to_rfc3339(),
            session_id: self.session_id.clone(),
            event_name: name,
            system_props: SystemProps {
                is_debug: cfg!(debug_assertions),
                locale: "en-US",
                app_version: env!("CARGO_PKG_VERSION"),
                sdk_version: APP_USER_AGENT,
            },
            props,
        };
        self.http
            .post(&self.endpoint)
            .header("App-Key", &self.app_key)
            .json(&event)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

impl EventTracker for AptabaseTracker {
    fn track(&self, name: &str, props: Value) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            debug!("no runtime, dropping event {name}");
            return;
        };
        let tracker = self.clone();
        let name = name.to_string();
        runtime.spawn(async move {
            if let Err(err) = tracker.send(&name, props).await {
                warn!("failed to send analytics event {name}: {err}");
            }
        });
    }
}

/// The tracker for an optional app key.
#[must_use]
pub fn tracker(app_key: Option<&str>) -> Arc<dyn EventTracker> {
    match app_key.and_then(AptabaseTracker::new) {
        Some(tracker) => Arc::new(tracker),
        None => Arc::new(NoopTracker),
    }
}
