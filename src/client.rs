use crate::fault::{Fault, StackFrame};
use crate::notification::{Notification, NotificationContext};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Error text a client reports when a notice was suppressed as a repeat.
pub const FILTERED_MESSAGE: &str = "airbrake: error is filtered";

/// Outcome reported by a [`NotifyClient`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NotifyResponse {
    /// Notice id assigned by the backend.
    pub id: Option<String>,
    /// Link to the notice on the backend, when provided.
    pub url: Option<String>,
    /// Error reported in-band by the client.
    pub error: Option<String>,
}

impl NotifyResponse {
    pub fn filtered() -> Self {
        NotifyResponse {
            error: Some(FILTERED_MESSAGE.to_string()),
            ..Default::default()
        }
    }

    pub fn is_filtered(&self) -> bool {
        self.error.as_deref() == Some(FILTERED_MESSAGE)
    }

    /// In-band error other than the filtered marker.
    pub fn unexpected_error(&self) -> Option<&str> {
        match self.error.as_deref() {
            Some(FILTERED_MESSAGE) | None => None,
            Some(other) => Some(other),
        }
    }

    fn from_body(body: &str) -> Self {
        let value: Value = serde_json::from_str(body).unwrap_or(Value::Null);
        let field = |key: &str| match value.get(key) {
            Some(Value::String(s)) => Some(s.clone()),
            Some(Value::Null) | None => None,
            Some(other) => Some(other.to_string()),
        };
        NotifyResponse {
            id: field("id"),
            url: field("url"),
            error: field("error"),
        }
    }
}

/// Failures surfaced by a [`NotifyClient`].
#[derive(thiserror::Error, Debug)]
pub enum NotifyError {
    #[cfg(feature = "airbrake")]
    #[error("request to Airbrake failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Airbrake responded with status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Airbrake rejected the notice: {0}")]
    Rejected(String),

    #[error("failed to encode notice: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Delivers notifications to an error-tracking backend.
#[async_trait]
pub trait NotifyClient: Send + Sync {
    /// Deliver one notification.
    ///
    /// **Returns**
    /// - `Ok(response)` when the backend accepted it, or when the client
    ///   suppressed it (in which case `response.error` carries
    ///   [`FILTERED_MESSAGE`]).
    /// - `Err(..)` on transport failure or a non-success status.
    async fn notify(&self, notification: &Notification) -> Result<NotifyResponse, NotifyError>;
}

/// Suppresses a notice identical to the last one accepted within a time
/// window.
pub struct DuplicateFilter {
    window: Duration,
    last: Mutex<Option<(String, Instant)>>,
}

impl DuplicateFilter {
    pub fn new(window: Duration) -> Self {
        DuplicateFilter {
            window,
            last: Mutex::new(None),
        }
    }

    /// Returns `true` when the notice identified by `key` should be sent.
    pub fn admit(&self, key: &str) -> bool {
        let mut last = self.last.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some((previous, at)) = last.as_ref() {
            if previous == key && at.elapsed() < self.window {
                return false;
            }
        }
        *last = Some((key.to_string(), Instant::now()));
        true
    }
}

impl Default for DuplicateFilter {
    fn default() -> Self {
        DuplicateFilter::new(Duration::from_secs(1))
    }
}

/// Configuration for [`AirbrakeClient`].
#[derive(Debug, Clone)]
pub struct AirbrakeConfig {
    /// Base URL, e.g. `https://api.airbrake.io`.
    pub host: String,
    pub project_id: u64,
    pub project_key: String,
    /// Environment label sent in `context.environment`.
    pub environment: String,
    /// Window of the duplicate filter.
    pub dedup_window: Duration,
}

impl AirbrakeConfig {
    pub fn new(host: impl Into<String>, project_key: impl Into<String>) -> Self {
        AirbrakeConfig {
            host: host.into(),
            project_id: 1,
            project_key: project_key.into(),
            environment: crate::env::DEFAULT_ENVIRONMENT_LABEL.to_string(),
            dedup_window: Duration::from_secs(1),
        }
    }
}

/// Airbrake v3 notice body.
#[derive(Debug, Serialize)]
pub struct Notice<'a> {
    pub errors: Vec<NoticeError<'a>>,
    pub context: NoticeContext<'a>,
    pub environment: &'a Map<String, Value>,
    pub params: &'a Map<String, Value>,
    pub session: &'a Map<String, Value>,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct NoticeError<'a> {
    #[serde(rename = "type")]
    pub kind: &'a str,
    pub message: &'a str,
    pub backtrace: &'a [StackFrame],
}

#[derive(Debug, Serialize)]
pub struct NoticeContext<'a> {
    #[serde(flatten)]
    pub base: &'a NotificationContext,
    pub environment: &'a str,
    pub notifier: NotifierInfo,
}

#[derive(Debug, Serialize)]
pub struct NotifierInfo {
    pub name: &'static str,
    pub version: &'static str,
    pub url: &'static str,
}

impl<'a> Notice<'a> {
    pub fn new(notification: &'a Notification, environment: &'a str) -> Self {
        Notice {
            errors: vec![notice_error(&notification.error)],
            context: NoticeContext {
                base: &notification.context,
                environment,
                notifier: NotifierInfo {
                    name: env!("CARGO_PKG_NAME"),
                    version: env!("CARGO_PKG_VERSION"),
                    url: "https://airbrake.io",
                },
            },
            environment: &notification.environment,
            params: &notification.params,
            session: &notification.session,
        }
    }

    /// Key identifying repeats of the same error.
    pub fn dedup_key(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.errors)
    }
}

fn notice_error(fault: &Fault) -> NoticeError<'_> {
    NoticeError {
        kind: fault.kind(),
        message: fault.message(),
        backtrace: fault.stack(),
    }
}

/// [`NotifyClient`] posting to the Airbrake v3 notices API over HTTP.
#[cfg(feature = "airbrake")]
pub struct AirbrakeClient {
    http: reqwest::Client,
    config: AirbrakeConfig,
    filter: DuplicateFilter,
}

#[cfg(feature = "airbrake")]
impl AirbrakeClient {
    pub fn new(config: AirbrakeConfig) -> Self {
        AirbrakeClient {
            http: reqwest::Client::new(),
            filter: DuplicateFilter::new(config.dedup_window),
            config,
        }
    }

    pub fn config(&self) -> &AirbrakeConfig {
        &self.config
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/api/v3/projects/{}/notices?key={}",
            self.config.host.trim_end_matches('/'),
            self.config.project_id,
            urlencoding::encode(&self.config.project_key)
        )
    }
}

#[cfg(feature = "airbrake")]
#[async_trait]
impl NotifyClient for AirbrakeClient {
    async fn notify(&self, notification: &Notification) -> Result<NotifyResponse, NotifyError> {
        let notice = Notice::new(notification, &self.config.environment);
        if !self.filter.admit(&notice.dedup_key()?) {
            return Ok(NotifyResponse::filtered());
        }

        let body = serde_json::to_vec(&notice)?;
        let resp = self
            .http
            .post(self.endpoint())
            .header("Content-Type", "application/json")
            .body(body)
            .send()
            .await?;

        let status = resp.status();
        let text = resp.text().await.unwrap_or_else(|_| "<no body>".to_string());
        if status.is_success() {
            Ok(NotifyResponse::from_body(&text))
        } else {
            Err(NotifyError::Status {
                status: status.as_u16(),
                body: text,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notification::build_notification;
    use serde_json::json;

    #[test]
    fn filter_drops_repeats_inside_the_window() {
        let filter = DuplicateFilter::new(Duration::from_secs(60));
        assert!(filter.admit("a"));
        assert!(!filter.admit("a"));
        assert!(filter.admit("b"));
        assert!(filter.admit("a"));
    }

    #[test]
    fn filter_readmits_after_the_window() {
        let filter = DuplicateFilter::new(Duration::ZERO);
        assert!(filter.admit("a"));
        assert!(filter.admit("a"));
    }

    #[test]
    fn response_marker_detection() {
        assert!(NotifyResponse::filtered().is_filtered());
        assert_eq!(NotifyResponse::filtered().unexpected_error(), None);
        let odd = NotifyResponse {
            error: Some("quota exceeded".into()),
            ..Default::default()
        };
        assert_eq!(odd.unexpected_error(), Some("quota exceeded"));
    }

    #[test]
    fn response_body_is_parsed_leniently() {
        let parsed = NotifyResponse::from_body(r#"{"id": 4242, "url": "https://x/4242"}"#);
        assert_eq!(parsed.id.as_deref(), Some("4242"));
        assert_eq!(parsed.url.as_deref(), Some("https://x/4242"));
        assert_eq!(parsed.error, None);
        assert_eq!(NotifyResponse::from_body("not json"), NotifyResponse::default());
    }

    #[test]
    fn notice_follows_v3_layout() {
        let fault = Fault::new("Broken").with_property("params", json!({"q": "1"}));
        let notification = build_notification("error", fault, "server");
        let notice = serde_json::to_value(Notice::new(&notification, "test")).unwrap();

        assert_eq!(notice["errors"][0]["type"], json!("Error"));
        assert_eq!(notice["errors"][0]["message"], json!("Broken"));
        assert!(notice["errors"][0]["backtrace"][0]["file"].as_str().unwrap().ends_with("client.rs"));
        assert_eq!(notice["context"]["severity"], json!("error"));
        assert_eq!(notice["context"]["component"], json!("server"));
        assert_eq!(notice["context"]["environment"], json!("test"));
        assert_eq!(notice["params"], json!({"q": "1"}));
        assert_eq!(notice["session"], json!({}));
    }
}
