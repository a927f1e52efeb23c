use std::sync::Arc;

use async_trait::async_trait;
use http_event_logger::event::{InboundEvent, RequestContext, RequestEvent};
use http_event_logger::plugin::{register, EventHandler, HostServer, PluginOptions, ServerEvent, ServerMethod, Subscription};
use http_event_logger::{record::LogRecord, sink::LogSink, Fault, Logger, Severity};

/// Example of plugging in a custom destination by implementing the
/// `LogSink` trait directly, next to the built-in console sink.
struct JsonLinesSink;

#[async_trait]
impl LogSink for JsonLinesSink {
    fn name(&self) -> &str {
        "json-lines"
    }

    async fn send(&self, record: &LogRecord) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let line = serde_json::json!({
            "timestamp": record.timestamp,
            "level": record.level,
            "tags": record.tags,
            "message": record.message.render(),
        });
        println!("{}", line);
        Ok(())
    }
}

/// Minimal host: keeps handlers and lets `main` fire events at them.
#[derive(Default)]
struct ToyServer {
    handlers: Vec<(Subscription, EventHandler)>,
    methods: Vec<(String, ServerMethod)>,
}

impl HostServer for ToyServer {
    fn subscribe(&mut self, subscription: Subscription, handler: EventHandler) {
        self.handlers.push((subscription, handler));
    }

    fn add_method(&mut self, name: &str, method: ServerMethod) {
        self.methods.push((name.to_string(), method));
    }
}

impl ToyServer {
    fn emit(&self, subscription: Subscription, event: ServerEvent) {
        for (sub, handler) in &self.handlers {
            if *sub == subscription {
                handler(event.clone());
            }
        }
    }
}

#[tokio::main]
async fn main() {
    let logger = Logger::with_sinks(vec![Arc::new(JsonLinesSink) as Arc<dyn LogSink>], Severity::Debug);

    let mut server = ToyServer::default();
    register(
        &mut server,
        PluginOptions {
            logger: Some(logger.clone()),
            ..Default::default()
        },
    );

    server.emit(Subscription::Start, ServerEvent::Start);
    server.emit(
        Subscription::Request,
        ServerEvent::Request(
            RequestEvent::new(vec![], Fault::new("Broken"))
                .with_request(RequestContext::new("GET", "/broken").with_query("page", "2")),
        ),
    );
    server.emit(
        Subscription::Log,
        ServerEvent::Log(InboundEvent::Log(http_event_logger::event::LogEvent::new(
            vec!["example".into()],
            "custom sink example started",
        ))),
    );

    tokio::time::sleep(std::time::Duration::from_millis(100)).await;
}
