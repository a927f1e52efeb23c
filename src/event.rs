use crate::fault::Fault;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Payload attached to `log`, `request` and custom events.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum EventPayload {
    #[default]
    None,
    Text(String),
    Value(Value),
    Fault(Fault),
}

impl From<&str> for EventPayload {
    fn from(text: &str) -> Self {
        EventPayload::Text(text.to_string())
    }
}

impl From<String> for EventPayload {
    fn from(text: String) -> Self {
        EventPayload::Text(text)
    }
}

impl From<Value> for EventPayload {
    fn from(value: Value) -> Self {
        EventPayload::Value(value)
    }
}

impl From<Fault> for EventPayload {
    fn from(fault: Fault) -> Self {
        EventPayload::Fault(fault)
    }
}

/// Request metadata supplied by the host server.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RequestContext {
    pub method: String,
    /// Path without the query string.
    pub path: String,
    pub query: Map<String, Value>,
    /// Header names are expected in lower case.
    pub headers: BTreeMap<String, String>,
    /// Cookie / session state.
    pub state: Map<String, Value>,
}

impl RequestContext {
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        RequestContext {
            method: method.into(),
            path: path.into(),
            ..Default::default()
        }
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.query.insert(key.into(), value.into());
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into().to_ascii_lowercase(), value.into());
        self
    }

    pub fn with_state(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.state.insert(key.into(), value.into());
        self
    }

    /// `"<METHOD> <path>"`, the action name reported for this request.
    pub fn action(&self) -> String {
        format!("{} {}", self.method.to_ascii_uppercase(), self.path)
    }

    pub fn user_agent(&self) -> Option<&str> {
        self.headers.get("user-agent").map(String::as_str)
    }
}

/// `server.log`-style event.
#[derive(Debug, Clone, PartialEq)]
pub struct LogEvent {
    pub timestamp: DateTime<Utc>,
    pub tags: Vec<String>,
    pub data: EventPayload,
}

impl LogEvent {
    pub fn new(tags: Vec<String>, data: impl Into<EventPayload>) -> Self {
        LogEvent {
            timestamp: Utc::now(),
            tags,
            data: data.into(),
        }
    }
}

/// Request-scoped log entry.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestEvent {
    pub timestamp: DateTime<Utc>,
    pub id: Option<String>,
    pub tags: Vec<String>,
    pub data: EventPayload,
    pub request: Option<RequestContext>,
    /// Whether the failure originated server side; `None` when the host
    /// cannot tell.
    pub is_server: Option<bool>,
}

impl RequestEvent {
    pub fn new(tags: Vec<String>, data: impl Into<EventPayload>) -> Self {
        RequestEvent {
            timestamp: Utc::now(),
            id: None,
            tags,
            data: data.into(),
            request: None,
            is_server: None,
        }
    }

    pub fn with_request(mut self, request: RequestContext) -> Self {
        self.request = Some(request);
        self
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_is_server(mut self, is_server: bool) -> Self {
        self.is_server = Some(is_server);
        self
    }
}

/// Completed HTTP exchange.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseEvent {
    pub timestamp: DateTime<Utc>,
    pub id: Option<String>,
    /// Server instance URI, e.g. `http://localhost:8000`.
    pub instance: String,
    pub method: String,
    pub path: String,
    pub query: Map<String, Value>,
    pub status_code: u16,
    /// Response time in milliseconds.
    pub response_time: u64,
}

/// Periodic process / OS metrics snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct OpsEvent {
    pub timestamp: DateTime<Utc>,
    /// Resident set size in bytes.
    pub rss: u64,
    /// Process uptime in seconds.
    pub uptime: u64,
    /// OS load averages.
    pub load: Vec<f64>,
}

/// Unhandled error raised while serving a request.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorEvent {
    pub timestamp: DateTime<Utc>,
    pub id: Option<String>,
    pub error: Fault,
    pub method: Option<String>,
    pub path: Option<String>,
    pub query: Map<String, Value>,
}

impl ErrorEvent {
    pub fn new(error: Fault) -> Self {
        ErrorEvent {
            timestamp: Utc::now(),
            id: None,
            error,
            method: None,
            path: None,
            query: Map::new(),
        }
    }

    /// Fill method, path and query from a request.
    pub fn with_request(mut self, request: &RequestContext) -> Self {
        self.method = Some(request.method.clone());
        self.path = Some(request.path.clone());
        self.query = request.query.clone();
        self
    }
}

/// Any event name this crate has no dedicated shape for.
#[derive(Debug, Clone, PartialEq)]
pub struct CustomEvent {
    pub timestamp: DateTime<Utc>,
    pub name: String,
    pub id: Option<String>,
    pub tags: Vec<String>,
    pub data: EventPayload,
}

impl CustomEvent {
    pub fn new(name: impl Into<String>, data: impl Into<EventPayload>) -> Self {
        CustomEvent {
            timestamp: Utc::now(),
            name: name.into(),
            id: None,
            tags: Vec::new(),
            data: data.into(),
        }
    }
}

/// Event emitted by the host server's event bus.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundEvent {
    Log(LogEvent),
    Request(RequestEvent),
    Response(ResponseEvent),
    Ops(OpsEvent),
    Error(ErrorEvent),
    Custom(CustomEvent),
}

impl InboundEvent {
    /// Event name as known on the host's bus.
    pub fn name(&self) -> &str {
        match self {
            InboundEvent::Log(_) => "log",
            InboundEvent::Request(_) => "request",
            InboundEvent::Response(_) => "response",
            InboundEvent::Ops(_) => "ops",
            InboundEvent::Error(_) => "error",
            InboundEvent::Custom(event) => &event.name,
        }
    }

    pub fn tags(&self) -> &[String] {
        match self {
            InboundEvent::Log(event) => &event.tags,
            InboundEvent::Request(event) => &event.tags,
            InboundEvent::Custom(event) => &event.tags,
            InboundEvent::Response(_) | InboundEvent::Ops(_) | InboundEvent::Error(_) => &[],
        }
    }

    pub fn id(&self) -> Option<&str> {
        match self {
            InboundEvent::Request(event) => event.id.as_deref(),
            InboundEvent::Response(event) => event.id.as_deref(),
            InboundEvent::Error(event) => event.id.as_deref(),
            InboundEvent::Custom(event) => event.id.as_deref(),
            InboundEvent::Log(_) | InboundEvent::Ops(_) => None,
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            InboundEvent::Log(event) => event.timestamp,
            InboundEvent::Request(event) => event.timestamp,
            InboundEvent::Response(event) => event.timestamp,
            InboundEvent::Ops(event) => event.timestamp,
            InboundEvent::Error(event) => event.timestamp,
            InboundEvent::Custom(event) => event.timestamp,
        }
    }
}
