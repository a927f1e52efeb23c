use crate::client::{NotifyClient, NotifyError, NotifyResponse};
use crate::env::{
    program_name, resolve_level, AIRBRAKE_HOST_ENV, AIRBRAKE_LOG_LEVEL_ENV, AIRBRAKE_PROJECT_KEY_ENV,
    DEFAULT_ENVIRONMENT_LABEL, NODE_ENV_ENV,
};
use crate::logger::LoggedEvent;
use crate::message::MessageValue;
use crate::normalize::{normalize_with, UNSPECIFIED_ERROR};
use crate::notification::build_notification;
use crate::reconstruct::FaultCloner;
use crate::record::{LogEntry, LogRecord};
use crate::severity::Severity;
use crate::sink::LogSink;
use async_trait::async_trait;
use std::error::Error;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

/// Level used when a log entry does not name one.
const DEFAULT_ENTRY_LEVEL: &str = "error";

/// Explicit Airbrake options. Every `None` falls back to the environment
/// and then to a built-in default.
#[derive(Debug, Clone, Default)]
pub struct AirbrakeOptions {
    pub host: Option<String>,
    pub project_key: Option<String>,
    pub level: Option<Severity>,
    pub environment: Option<String>,
    pub component: Option<String>,
    pub project_id: Option<u64>,
    pub dedup_window: Option<Duration>,
}

/// Fully resolved Airbrake settings.
#[derive(Debug, Clone, PartialEq)]
pub struct AirbrakeSettings {
    pub host: Option<String>,
    pub project_key: Option<String>,
    pub level: Severity,
    pub environment: String,
    pub component: String,
    pub project_id: u64,
    pub dedup_window: Duration,
}

impl AirbrakeSettings {
    /// Resolve options against `lookup` (explicit > lookup > default).
    ///
    /// Defaults: minimum level `error`, environment label
    /// `"NODE_ENV Not Set"`, project id `1`, duplicate window one second,
    /// component the running program's name.
    pub fn resolve<F>(options: &AirbrakeOptions, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        AirbrakeSettings {
            host: options.host.clone().or_else(|| lookup(AIRBRAKE_HOST_ENV)),
            project_key: options.project_key.clone().or_else(|| lookup(AIRBRAKE_PROJECT_KEY_ENV)),
            level: resolve_level(options.level, AIRBRAKE_LOG_LEVEL_ENV, &lookup, Severity::Error),
            environment: options
                .environment
                .clone()
                .or_else(|| lookup(NODE_ENV_ENV))
                .unwrap_or_else(|| DEFAULT_ENVIRONMENT_LABEL.to_string()),
            component: options.component.clone().unwrap_or_else(program_name),
            project_id: options.project_id.unwrap_or(1),
            dedup_window: options.dedup_window.unwrap_or(Duration::from_secs(1)),
        }
    }

    /// Resolve options against the process environment.
    pub fn from_env(options: &AirbrakeOptions) -> Self {
        AirbrakeSettings::resolve(options, crate::env::process_env)
    }

    /// Host and key are both present.
    pub fn is_complete(&self) -> bool {
        self.host.is_some() && self.project_key.is_some()
    }
}

/// Invokes the wrapped closure exactly once, when dropped.
struct OnComplete<F: FnOnce()>(Option<F>);

impl<F: FnOnce()> Drop for OnComplete<F> {
    fn drop(&mut self) {
        if let Some(callback) = self.0.take() {
            callback();
        }
    }
}

/// Sink reporting log entries to Airbrake.
///
/// Without both a host and a project key the transport is inert: no
/// client is built and every `log` call completes immediately. With them,
/// each call normalizes the message into one fault, builds a notification
/// and hands it to the client. Delivery failures are written to stderr
/// and never returned to the caller.
pub struct AirbrakeTransport {
    level: Severity,
    component: String,
    client: Option<Arc<dyn NotifyClient>>,
    cloner: FaultCloner,
    events: broadcast::Sender<LoggedEvent>,
}

impl AirbrakeTransport {
    pub const NAME: &'static str = "airbrake";

    /// Build from explicit options, filling gaps from the environment.
    pub fn new(options: AirbrakeOptions) -> Self {
        AirbrakeTransport::from_settings(AirbrakeSettings::from_env(&options))
    }

    pub fn from_settings(settings: AirbrakeSettings) -> Self {
        let client = build_client(&settings);
        AirbrakeTransport::assemble(settings.level, settings.component, client)
    }

    /// Build around an existing client, e.g. a test double.
    pub fn with_client(client: Arc<dyn NotifyClient>, level: Severity) -> Self {
        AirbrakeTransport::assemble(level, program_name(), Some(client))
    }

    fn assemble(level: Severity, component: String, client: Option<Arc<dyn NotifyClient>>) -> Self {
        let (events, _) = broadcast::channel(256);
        AirbrakeTransport {
            level,
            component,
            client,
            cloner: FaultCloner::default(),
            events,
        }
    }

    pub fn with_component(mut self, component: impl Into<String>) -> Self {
        self.component = component.into();
        self
    }

    /// Replace the registry used to clone faults before reporting them.
    pub fn with_cloner(mut self, cloner: FaultCloner) -> Self {
        self.cloner = cloner;
        self
    }

    pub fn level(&self) -> Severity {
        self.level
    }

    pub fn component(&self) -> &str {
        &self.component
    }

    /// Whether a client exists, i.e. whether `log` ever reaches the network.
    pub fn is_configured(&self) -> bool {
        self.client.is_some()
    }

    /// Observe delivery attempts.
    ///
    /// One event is published per `log` call that reaches a client, after
    /// the call has yielded and before the delivery resolves.
    pub fn subscribe(&self) -> broadcast::Receiver<LoggedEvent> {
        self.events.subscribe()
    }

    /// Report one entry.
    ///
    /// **Parameters**
    /// - `entry`: the entry to report. `None`, a missing message or a
    ///   missing level are all accepted; the level defaults to `error`.
    /// - `callback`: invoked exactly once when the call finishes, whatever
    ///   the outcome. It also runs if the future is dropped after its first
    ///   poll; a future dropped before it is ever polled never calls it.
    ///
    /// **Returns**
    /// - `Some(response)` when the client accepted or filtered the notice.
    /// - `None` when the transport is inert or delivery failed.
    pub async fn log<F>(&self, entry: Option<LogEntry>, callback: F) -> Option<NotifyResponse>
    where
        F: FnOnce() + Send,
    {
        let _complete = OnComplete(Some(callback));
        let client = self.client.as_deref()?;

        let entry = entry.unwrap_or_default();
        let level = entry.level.unwrap_or_else(|| DEFAULT_ENTRY_LEVEL.to_string());
        self.publish(LoggedEvent {
            transport: Self::NAME.to_string(),
            level: level.clone(),
            message: entry
                .message
                .as_ref()
                .map(MessageValue::render)
                .unwrap_or_else(|| UNSPECIFIED_ERROR.to_string()),
        });

        match self.deliver(client, &level, entry.message.as_ref()).await {
            Ok(response) => Some(response),
            Err(e) => {
                eprintln!("Failed to notify Airbrake: {}", e);
                None
            }
        }
    }

    async fn deliver(
        &self,
        client: &dyn NotifyClient,
        level: &str,
        message: Option<&MessageValue>,
    ) -> Result<NotifyResponse, NotifyError> {
        let error = normalize_with(&self.cloner, message);
        let notification = build_notification(level, error, &self.component);
        let response = client.notify(&notification).await?;
        if let Some(reason) = response.unexpected_error() {
            return Err(NotifyError::Rejected(reason.to_string()));
        }
        Ok(response)
    }

    /// Publish from a separate task so observers attached by the caller
    /// after this call still receive the event.
    fn publish(&self, event: LoggedEvent) {
        let events = self.events.clone();
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    let _ = events.send(event);
                });
            }
            Err(_) => {
                let _ = events.send(event);
            }
        }
    }
}

#[cfg(feature = "airbrake")]
fn build_client(settings: &AirbrakeSettings) -> Option<Arc<dyn NotifyClient>> {
    use crate::client::{AirbrakeClient, AirbrakeConfig};

    match (&settings.host, &settings.project_key) {
        (Some(host), Some(key)) => {
            let config = AirbrakeConfig {
                host: host.clone(),
                project_id: settings.project_id,
                project_key: key.clone(),
                environment: settings.environment.clone(),
                dedup_window: settings.dedup_window,
            };
            Some(Arc::new(AirbrakeClient::new(config)) as Arc<dyn NotifyClient>)
        }
        _ => None,
    }
}

#[cfg(not(feature = "airbrake"))]
fn build_client(settings: &AirbrakeSettings) -> Option<Arc<dyn NotifyClient>> {
    if settings.is_complete() {
        eprintln!("airbrake feature is not enabled; Airbrake reporting disabled");
    }
    None
}

#[async_trait]
impl LogSink for AirbrakeTransport {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn level(&self) -> Option<Severity> {
        Some(self.level)
    }

    async fn send(&self, record: &LogRecord) -> Result<(), Box<dyn Error + Send + Sync>> {
        self.log(Some(LogEntry::from(record)), || {}).await;
        Ok(())
    }
}
