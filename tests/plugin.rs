mod common;

use common::{eventually, FakeHost, MemorySink};
use http_event_logger::event::{InboundEvent, LogEvent, RequestContext, RequestEvent};
use http_event_logger::mapper::EventLevels;
use http_event_logger::plugin::{register, PluginOptions, ServerEvent, Subscription, NOTIFY_METHOD};
use http_event_logger::sink::LogSink;
use http_event_logger::{Fault, LogRecord, Logger, MessageValue, Severity};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

fn setup(report_client_errors: bool) -> (Arc<MemorySink>, FakeHost) {
    let sink = Arc::new(MemorySink::default());
    let logger = Logger::with_sinks(vec![sink.clone() as Arc<dyn LogSink>], Severity::Debug);
    let mut host = FakeHost::default();
    register(
        &mut host,
        PluginOptions {
            logger: Some(logger),
            report_client_errors,
            event_levels: EventLevels::default(),
        },
    );
    (sink, host)
}

async fn wait_for(sink: &MemorySink, count: usize) -> Vec<LogRecord> {
    assert!(eventually(|| sink.records().len() >= count).await, "expected {} records", count);
    sink.records()
}

fn failing_request(is_server: bool) -> ServerEvent {
    ServerEvent::Request(
        RequestEvent::new(vec!["error".into()], Fault::new("Broken"))
            .with_request(RequestContext::new("GET", "/broken").with_query("q", "1"))
            .with_is_server(is_server),
    )
}

#[tokio::test]
async fn failing_handler_is_logged_as_error() {
    let (sink, host) = setup(false);
    host.emit(Subscription::Request, failing_request(true));

    let records = wait_for(&sink, 1).await;
    let record = &records[0];
    assert_eq!(record.level, Severity::Error);
    assert!(record.message.render().contains("Error: Broken"));

    let fault = record.message.as_fault().expect("fault message");
    assert_eq!(fault.property("params"), Some(&json!({"q": "1"})));
    assert_eq!(fault.property("context").unwrap()["action"], json!("GET /broken"));
}

#[tokio::test]
async fn client_errors_are_skipped_by_default() {
    let (sink, host) = setup(false);
    host.emit(Subscription::Request, failing_request(false));
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(sink.records().is_empty());
}

#[tokio::test]
async fn client_errors_can_be_reported() {
    let (sink, host) = setup(true);
    host.emit(Subscription::Request, failing_request(false));
    let records = wait_for(&sink, 1).await;
    assert_eq!(records[0].level, Severity::Error);
}

#[tokio::test]
async fn notify_method_logs_at_error() {
    let (sink, host) = setup(false);
    let notify = host.method(NOTIFY_METHOD).expect("notify method installed");
    notify(Fault::new("reported by hand"));

    let records = wait_for(&sink, 1).await;
    assert_eq!(records[0].level, Severity::Error);
    assert_eq!(records[0].message.as_fault().unwrap().message(), "reported by hand");
}

#[tokio::test]
async fn start_is_logged_at_debug() {
    let (sink, host) = setup(false);
    host.emit(Subscription::Start, ServerEvent::Start);
    let records = wait_for(&sink, 1).await;
    assert_eq!(records[0].level, Severity::Debug);
}

#[tokio::test]
async fn log_events_go_through_the_mapper() {
    let (sink, host) = setup(false);
    host.emit(
        Subscription::Log,
        ServerEvent::Log(InboundEvent::Log(LogEvent::new(vec!["cache".into()], "warmed up"))),
    );

    let records = wait_for(&sink, 1).await;
    assert_eq!(records[0].level, Severity::Info);
    assert_eq!(records[0].tags, vec!["log".to_string(), "cache".to_string()]);
    assert_eq!(records[0].message, MessageValue::Text(" [log,cache] data: warmed up".into()));
}

#[tokio::test]
async fn plain_request_events_go_through_the_mapper() {
    let (sink, host) = setup(false);
    host.emit(
        Subscription::Request,
        ServerEvent::Request(RequestEvent::new(vec![], json!({"title": "Some data we want logged"})).with_id("42:a")),
    );

    let records = wait_for(&sink, 1).await;
    assert_eq!(records[0].id.as_deref(), Some("42:a"));
    assert_eq!(
        records[0].message.render(),
        " (42:a) [request] data: { title: 'Some data we want logged' }"
    );
}
