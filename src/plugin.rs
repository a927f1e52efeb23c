//! Wiring into a host HTTP server.
//!
//! The host exposes its event bus through [`HostServer`]; [`register`]
//! subscribes to it and installs a `notify` server method.

use crate::adapter::StreamAdapter;
use crate::event::{EventPayload, InboundEvent, RequestContext, RequestEvent};
use crate::fault::Fault;
use crate::logger::{default_logger, Logger};
use crate::mapper::EventLevels;
use serde_json::Value;
use std::sync::Arc;

/// Name of the server method installed by [`register`].
pub const NOTIFY_METHOD: &str = "notify";

/// Handler invoked for each subscribed server event.
pub type EventHandler = Arc<dyn Fn(ServerEvent) + Send + Sync>;

/// Server-level method taking a fault.
pub type ServerMethod = Arc<dyn Fn(Fault) + Send + Sync>;

/// Event streams a plugin can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Subscription {
    Start,
    Log,
    Request,
}

/// Event delivered to a subscription handler.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerEvent {
    Start,
    Log(InboundEvent),
    Request(RequestEvent),
}

/// Event-subscription surface of a host HTTP server.
pub trait HostServer {
    fn subscribe(&mut self, subscription: Subscription, handler: EventHandler);

    fn add_method(&mut self, name: &str, method: ServerMethod);
}

/// Options for [`register`].
#[derive(Clone, Default)]
pub struct PluginOptions {
    /// Logger receiving the events; the process-wide default when `None`.
    pub logger: Option<Logger>,
    /// Also report faults the host attributes to the client.
    pub report_client_errors: bool,
    pub event_levels: EventLevels,
}

/// Subscribe to the host's `start`, `log` and `request` events and
/// install the `notify` method.
pub fn register<S: HostServer + ?Sized>(server: &mut S, options: PluginOptions) {
    let logger = options.logger.unwrap_or_else(|| default_logger().clone());
    let adapter = StreamAdapter::new(logger.clone(), options.event_levels);
    let report_client_errors = options.report_client_errors;

    let start_logger = logger.clone();
    server.subscribe(
        Subscription::Start,
        Arc::new(move |_| start_logger.debug("server started")),
    );

    let log_adapter = adapter.clone();
    server.subscribe(
        Subscription::Log,
        Arc::new(move |event| {
            if let ServerEvent::Log(event) = event {
                log_adapter.write(event);
            }
        }),
    );

    let request_logger = logger.clone();
    server.subscribe(
        Subscription::Request,
        Arc::new(move |event| {
            let ServerEvent::Request(event) = event else {
                return;
            };
            if let EventPayload::Fault(fault) = &event.data {
                if event.is_server == Some(false) && !report_client_errors {
                    return;
                }
                let fault = match &event.request {
                    Some(request) => decorate_error(fault.clone(), request),
                    None => fault.clone(),
                };
                request_logger.error(fault);
                return;
            }
            adapter.write(InboundEvent::Request(event));
        }),
    );

    server.add_method(NOTIFY_METHOD, Arc::new(move |fault| logger.error(fault)));
}

/// Attach request details to `fault`: `params` (the query),
/// `context.action`, `context.userAgent` and `session` (the request
/// state).
pub fn decorate_error(mut fault: Fault, request: &RequestContext) -> Fault {
    let mut context = serde_json::Map::new();
    context.insert("action".to_string(), Value::String(request.action()));
    if let Some(agent) = request.user_agent() {
        context.insert("userAgent".to_string(), Value::String(agent.to_string()));
    }

    fault.insert_property("params", Value::Object(request.query.clone()));
    fault.insert_property("context", Value::Object(context));
    fault.insert_property("session", Value::Object(request.state.clone()));
    fault
}
