use crate::fault::Fault;
use crate::severity::{backend_severity, BackendSeverity};
use serde::Serialize;
use serde_json::{Map, Value};

/// `context` block of a notification.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NotificationContext {
    /// Entry point of the reporting process.
    pub component: String,
    pub severity: BackendSeverity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(rename = "userAgent", skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    /// Remaining keys of the fault's own `context` property.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Payload handed to the error-tracking client.
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub error: Fault,
    pub context: NotificationContext,
    pub environment: Map<String, Value>,
    pub params: Map<String, Value>,
    pub session: Map<String, Value>,
}

/// Assemble a notification for an already-normalized fault.
///
/// **Parameters**
/// - `level`: raw level name of the log entry, mapped with
///   [`backend_severity`].
/// - `error`: the normalized fault. Its `context`, `environment`,
///   `params` and `session` properties (when they are objects) fill the
///   matching sections; missing ones default to empty maps.
/// - `component`: name of the invoking process entry point.
///
/// `component` and `severity` always come from the arguments, even if the
/// fault's own context carries keys with those names.
pub fn build_notification(level: &str, error: Fault, component: &str) -> Notification {
    let mut extra = error.object_property("context").cloned().unwrap_or_default();
    let action = take_string(&mut extra, "action");
    let user_agent = take_string(&mut extra, "userAgent");
    extra.remove("component");
    extra.remove("severity");

    let section = |key: &str| error.object_property(key).cloned().unwrap_or_default();
    let environment = section("environment");
    let params = section("params");
    let session = section("session");

    Notification {
        context: NotificationContext {
            component: component.to_string(),
            severity: backend_severity(level),
            action,
            user_agent,
            extra,
        },
        environment,
        params,
        session,
        error,
    }
}

fn take_string(map: &mut Map<String, Value>, key: &str) -> Option<String> {
    match map.remove(key) {
        Some(Value::String(s)) => Some(s),
        Some(Value::Null) | None => None,
        Some(other) => Some(other.to_string()),
    }
}
