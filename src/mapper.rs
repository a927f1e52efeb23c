use crate::event::{ErrorEvent, EventPayload, InboundEvent, OpsEvent, RequestContext, ResponseEvent};
use crate::fault::Fault;
use crate::format::{colorize_method, colorize_status, inspect};
use crate::message::MessageValue;
use crate::record::LogRecord;
use crate::severity::Severity;
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Query keys never echoed in response lines.
const REDACTED_QUERY_KEYS: &[&str] = &["os", "process"];

/// Severity used for each event name.
///
/// Faults always log at `error`; every other event takes the level
/// configured for its name, or `info` when the name is unknown.
#[derive(Debug, Clone, PartialEq)]
pub struct EventLevels {
    levels: HashMap<String, Severity>,
}

impl Default for EventLevels {
    fn default() -> Self {
        let levels = [
            ("log", Severity::Info),
            ("error", Severity::Error),
            ("ops", Severity::Debug),
            ("response", Severity::Info),
            ("request", Severity::Info),
        ]
        .into_iter()
        .map(|(name, level)| (name.to_string(), level))
        .collect();
        EventLevels { levels }
    }
}

impl EventLevels {
    /// Override the level used for `name`.
    pub fn set(&mut self, name: impl Into<String>, level: Severity) -> &mut Self {
        self.levels.insert(name.into(), level);
        self
    }

    pub fn with(mut self, name: impl Into<String>, level: Severity) -> Self {
        self.set(name, level);
        self
    }

    pub fn level_for(&self, name: &str) -> Severity {
        self.levels.get(name).copied().unwrap_or(Severity::Info)
    }
}

/// Formatted body of a mapped event.
#[derive(Debug, Clone, PartialEq)]
pub enum MappedBody {
    /// Single formatted line.
    Text(String),
    /// Faults pass through unformatted so sinks keep their backtrace.
    Fault(Fault),
}

impl From<MappedBody> for MessageValue {
    fn from(body: MappedBody) -> Self {
        match body {
            MappedBody::Text(text) => MessageValue::Text(text),
            MappedBody::Fault(fault) => MessageValue::Fault(fault),
        }
    }
}

/// Result of mapping one inbound event.
#[derive(Debug, Clone, PartialEq)]
pub struct MappedEvent {
    pub level: Severity,
    pub body: MappedBody,
}

/// Maps host server events to canonical log records.
#[derive(Debug, Clone, Default)]
pub struct EventMapper {
    levels: EventLevels,
}

impl EventMapper {
    pub fn new(levels: EventLevels) -> Self {
        EventMapper { levels }
    }

    pub fn levels(&self) -> &EventLevels {
        &self.levels
    }

    /// Select a level and format the event body.
    ///
    /// Text bodies have the shape ` (<id>) [<tags>] <body>`, where the id
    /// segment is omitted when the event has none and the tags are the
    /// event name followed by the event's own tags.
    pub fn map(&self, event: &InboundEvent) -> MappedEvent {
        let tags = event_tags(event);
        let id = event.id();

        match event {
            InboundEvent::Error(error) => MappedEvent {
                level: Severity::Error,
                body: MappedBody::Fault(format_error(error)),
            },
            InboundEvent::Request(request) => match &request.data {
                EventPayload::Fault(fault) => {
                    let fault = match &request.request {
                        Some(ctx) => format_error(&ErrorEvent::new(fault.clone()).with_request(ctx)),
                        None => fault.clone(),
                    };
                    MappedEvent {
                        level: Severity::Error,
                        body: MappedBody::Fault(fault),
                    }
                }
                data => self.default_mapping(event, id, &tags, data),
            },
            InboundEvent::Log(log) => self.default_mapping(event, id, &tags, &log.data),
            InboundEvent::Custom(custom) => self.default_mapping(event, id, &tags, &custom.data),
            InboundEvent::Response(response) => MappedEvent {
                level: self.levels.level_for(event.name()),
                body: MappedBody::Text(wrap(id, &tags, &format_response(response))),
            },
            InboundEvent::Ops(ops) => MappedEvent {
                level: self.levels.level_for(event.name()),
                body: MappedBody::Text(wrap(None, &tags, &format_ops(ops))),
            },
        }
    }

    /// Map the event and wrap it in a [`LogRecord`] carrying the event's
    /// tags, id and timestamp.
    pub fn to_record(&self, event: &InboundEvent) -> LogRecord {
        let mapped = self.map(event);
        let mut record = LogRecord::new(mapped.level, mapped.body)
            .with_tags(event_tags(event))
            .with_timestamp(event.timestamp());
        record.id = event.id().map(str::to_string);
        record
    }

    fn default_mapping(
        &self,
        event: &InboundEvent,
        id: Option<&str>,
        tags: &[String],
        data: &EventPayload,
    ) -> MappedEvent {
        match data {
            EventPayload::Fault(fault) => MappedEvent {
                level: Severity::Error,
                body: MappedBody::Fault(fault.clone()),
            },
            data => MappedEvent {
                level: self.levels.level_for(event.name()),
                body: MappedBody::Text(wrap(id, tags, &format!("data: {}", format_payload(data)))),
            },
        }
    }
}

fn event_tags(event: &InboundEvent) -> Vec<String> {
    let mut tags = Vec::with_capacity(event.tags().len() + 1);
    tags.push(event.name().to_string());
    tags.extend(event.tags().iter().cloned());
    tags
}

fn wrap(id: Option<&str>, tags: &[String], body: &str) -> String {
    let id = id.map(|id| format!(" ({})", id)).unwrap_or_default();
    format!("{} [{}] {}", id, tags.join(","), body)
}

/// Attach request details to a copy of the event's fault: `params` is the
/// query and, when the method is known, `context.action` is
/// `"<METHOD> <path>"`.
fn format_error(event: &ErrorEvent) -> Fault {
    let mut fault = event.error.clone();
    fault.insert_property("params", Value::Object(event.query.clone()));

    if let Some(method) = &event.method {
        let path = event.path.clone().unwrap_or_default();
        let action = RequestContext::new(method.as_str(), path).action();
        let mut context = fault.object_property("context").cloned().unwrap_or_default();
        context.insert("action".to_string(), Value::String(action));
        fault.insert_property("context", Value::Object(context));
    }
    fault
}

fn format_response(event: &ResponseEvent) -> String {
    let query: Map<String, Value> = event
        .query
        .iter()
        .filter(|(key, _)| !REDACTED_QUERY_KEYS.contains(&key.as_str()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();

    format!(
        "{}: {} {} {} {} ({}ms)",
        event.instance,
        colorize_method(&event.method),
        event.path,
        inspect(&Value::Object(query)),
        colorize_status(event.status_code),
        event.response_time
    )
}

fn format_ops(event: &OpsEvent) -> String {
    let memory = (event.rss as f64 / (1024.0 * 1024.0)).round() as u64;
    let load: Vec<String> = event.load.iter().map(|l| l.to_string()).collect();
    format!(
        "memory: {}Mb, uptime (seconds): {}, load: [{}]",
        memory,
        event.uptime,
        load.join(",")
    )
}

fn format_payload(data: &EventPayload) -> String {
    match data {
        EventPayload::None => "(none)".to_string(),
        EventPayload::Text(text) if text.is_empty() => "(none)".to_string(),
        EventPayload::Text(text) => text.clone(),
        EventPayload::Value(Value::Null) => "(none)".to_string(),
        EventPayload::Value(Value::String(text)) if text.is_empty() => "(none)".to_string(),
        EventPayload::Value(Value::String(text)) => text.clone(),
        EventPayload::Value(value) => inspect(value),
        EventPayload::Fault(fault) => fault.render_stack(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{CustomEvent, LogEvent, RequestEvent};
    use chrono::Utc;
    use serde_json::json;

    fn mapper() -> EventMapper {
        EventMapper::default()
    }

    fn text(mapped: MappedEvent) -> String {
        match mapped.body {
            MappedBody::Text(text) => text,
            MappedBody::Fault(fault) => panic!("expected text, got fault {fault}"),
        }
    }

    #[test]
    fn request_payload_uses_structured_formatter() {
        let event = InboundEvent::Request(RequestEvent::new(
            vec![],
            json!({"title": "Some data we want logged"}),
        ));
        let mapped = mapper().map(&event);
        assert_eq!(mapped.level, Severity::Info);
        assert_eq!(text(mapped), " [request] data: { title: 'Some data we want logged' }");
    }

    #[test]
    fn unknown_event_without_data() {
        let event = InboundEvent::Custom(CustomEvent::new("customEventName", EventPayload::None));
        let mapped = mapper().map(&event);
        assert_eq!(mapped.level, Severity::Info);
        assert_eq!(text(mapped), " [customEventName] data: (none)");
    }

    #[test]
    fn id_and_tags_are_prefixed() {
        let event = InboundEvent::Request(
            RequestEvent::new(vec!["auth".into(), "db".into()], "lookup failed").with_id("1234:abc"),
        );
        assert_eq!(text(mapper().map(&event)), " (1234:abc) [request,auth,db] data: lookup failed");
    }

    #[test]
    fn error_event_is_enriched_not_flattened() {
        let request = RequestContext::new("get", "/broken").with_query("withTestParameter", "true");
        let event = InboundEvent::Error(ErrorEvent::new(Fault::new("Broken")).with_request(&request));
        let mapped = mapper().map(&event);
        assert_eq!(mapped.level, Severity::Error);
        let MappedBody::Fault(fault) = mapped.body else {
            panic!("expected fault body");
        };
        assert_eq!(fault.message(), "Broken");
        assert_eq!(fault.property("params"), Some(&json!({"withTestParameter": "true"})));
        assert_eq!(fault.property("context"), Some(&json!({"action": "GET /broken"})));
    }

    #[test]
    fn error_without_method_has_no_action() {
        let event = InboundEvent::Error(ErrorEvent::new(Fault::new("Broken")));
        let MappedBody::Fault(fault) = mapper().map(&event).body else {
            panic!("expected fault body");
        };
        assert_eq!(fault.property("params"), Some(&json!({})));
        assert!(fault.property("context").is_none());
    }

    #[test]
    fn fault_payload_logs_at_error() {
        let event = InboundEvent::Log(LogEvent::new(vec!["error".into()], Fault::new("Testing error handling!")));
        let mapped = mapper().map(&event);
        assert_eq!(mapped.level, Severity::Error);
        assert!(MessageValue::from(mapped.body).render().contains("Error: Testing error handling!"));
    }

    #[test]
    fn response_line_is_coloured_and_redacted() {
        let mut query = Map::new();
        query.insert("withTestParameter".into(), json!("true"));
        query.insert("os".into(), json!("linux"));
        query.insert("process".into(), json!("1"));
        let event = InboundEvent::Response(ResponseEvent {
            timestamp: Utc::now(),
            id: None,
            instance: "http://localhost:8000".into(),
            method: "GET".into(),
            path: "/broken".into(),
            query,
            status_code: 500,
            response_time: 12,
        });
        let mapped = mapper().map(&event);
        assert_eq!(mapped.level, Severity::Info);
        assert_eq!(
            text(mapped),
            " [response] http://localhost:8000: \x1b[1;32mget\x1b[0m /broken { withTestParameter: 'true' } \x1b[31m500\x1b[0m (12ms)"
        );
    }

    #[test]
    fn ops_line_reports_memory_uptime_and_load() {
        let event = InboundEvent::Ops(OpsEvent {
            timestamp: Utc::now(),
            rss: 52 * 1024 * 1024 + 300_000,
            uptime: 42,
            load: vec![0.5, 0.25, 1.0],
        });
        let mapped = mapper().map(&event);
        assert_eq!(mapped.level, Severity::Debug);
        assert_eq!(text(mapped), " [ops] memory: 52Mb, uptime (seconds): 42, load: [0.5,0.25,1]");
    }

    #[test]
    fn level_overrides_apply_per_event_name() {
        let mapper = EventMapper::new(EventLevels::default().with("response", Severity::Warn));
        let event = InboundEvent::Response(ResponseEvent {
            timestamp: Utc::now(),
            id: None,
            instance: "i".into(),
            method: "post".into(),
            path: "/".into(),
            query: Map::new(),
            status_code: 201,
            response_time: 1,
        });
        assert_eq!(mapper.map(&event).level, Severity::Warn);
    }

    #[test]
    fn record_carries_tags_and_id() {
        let event = InboundEvent::Request(RequestEvent::new(vec!["x".into()], "hi").with_id("r1"));
        let record = mapper().to_record(&event);
        assert_eq!(record.tags, vec!["request".to_string(), "x".to_string()]);
        assert_eq!(record.id.as_deref(), Some("r1"));
        assert_eq!(record.timestamp, event.timestamp());
    }
}
