#![allow(dead_code)]

use async_trait::async_trait;
use http_event_logger::client::{NotifyClient, NotifyError, NotifyResponse};
use http_event_logger::notification::Notification;
use http_event_logger::plugin::{EventHandler, HostServer, ServerEvent, ServerMethod, Subscription};
use http_event_logger::record::LogRecord;
use http_event_logger::sink::LogSink;
use std::collections::HashMap;
use std::error::Error;
use std::sync::Mutex;
use std::time::Duration;

/// How a [`RecordingClient`] answers.
#[derive(Debug, Clone)]
pub enum Reply {
    Accept,
    Status(u16),
    Filtered,
    InBand(String),
}

/// Notify client double that keeps every notification it is handed.
pub struct RecordingClient {
    reply: Reply,
    seen: Mutex<Vec<Notification>>,
}

impl RecordingClient {
    pub fn new(reply: Reply) -> Self {
        RecordingClient {
            reply,
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn accepting() -> Self {
        RecordingClient::new(Reply::Accept)
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.seen.lock().unwrap().clone()
    }

    pub fn last(&self) -> Notification {
        self.notifications().pop().expect("no notification recorded")
    }
}

#[async_trait]
impl NotifyClient for RecordingClient {
    async fn notify(&self, notification: &Notification) -> Result<NotifyResponse, NotifyError> {
        self.seen.lock().unwrap().push(notification.clone());
        match &self.reply {
            Reply::Accept => Ok(NotifyResponse {
                id: Some("1".into()),
                ..Default::default()
            }),
            Reply::Status(status) => Err(NotifyError::Status {
                status: *status,
                body: String::new(),
            }),
            Reply::Filtered => Ok(NotifyResponse::filtered()),
            Reply::InBand(reason) => Ok(NotifyResponse {
                error: Some(reason.clone()),
                ..Default::default()
            }),
        }
    }
}

/// Sink keeping every record it receives.
#[derive(Default)]
pub struct MemorySink {
    records: Mutex<Vec<LogRecord>>,
}

impl MemorySink {
    pub fn records(&self) -> Vec<LogRecord> {
        self.records.lock().unwrap().clone()
    }
}

#[async_trait]
impl LogSink for MemorySink {
    fn name(&self) -> &str {
        "memory"
    }

    async fn send(&self, record: &LogRecord) -> Result<(), Box<dyn Error + Send + Sync>> {
        self.records.lock().unwrap().push(record.clone());
        Ok(())
    }
}

/// In-memory host server.
#[derive(Default)]
pub struct FakeHost {
    handlers: HashMap<Subscription, Vec<EventHandler>>,
    methods: HashMap<String, ServerMethod>,
}

impl HostServer for FakeHost {
    fn subscribe(&mut self, subscription: Subscription, handler: EventHandler) {
        self.handlers.entry(subscription).or_default().push(handler);
    }

    fn add_method(&mut self, name: &str, method: ServerMethod) {
        self.methods.insert(name.to_string(), method);
    }
}

impl FakeHost {
    pub fn emit(&self, subscription: Subscription, event: ServerEvent) {
        for handler in self.handlers.get(&subscription).into_iter().flatten() {
            handler(event.clone());
        }
    }

    pub fn method(&self, name: &str) -> Option<ServerMethod> {
        self.methods.get(name).cloned()
    }
}

/// Poll `check` until it holds or two seconds pass.
pub async fn eventually<F: Fn() -> bool>(check: F) -> bool {
    for _ in 0..200 {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    check()
}
