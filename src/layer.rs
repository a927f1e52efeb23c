use crate::logger::Logger;
use crate::record::LogRecord;
use crate::severity::Severity;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};
use tokio::runtime::{Handle, TryCurrentError};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{Context, Layer};
use tracing_subscriber::registry::LookupSpan;

/// Targets never forwarded: this crate and the HTTP stack the Airbrake
/// client runs on. A delivery must not produce records that are delivered
/// in turn.
const EXCLUDED_TARGETS: &[&str] = &[
    env!("CARGO_CRATE_NAME"),
    "hyper",
    "hyper_util",
    "reqwest",
    "h2",
    "rustls",
    "tokio_rustls",
    "want",
];

/// Whether events from `target` reach the logger.
pub fn is_forwarded(target: &str) -> bool {
    !EXCLUDED_TARGETS.iter().any(|excluded| {
        target
            .strip_prefix(excluded)
            .map_or(false, |rest| rest.is_empty() || rest.starts_with("::"))
    })
}

/// `tracing_subscriber` layer that turns every `tracing` event into a
/// [`LogRecord`] and hands it to a [`Logger`].
///
/// Events are queued on a bounded channel and drained by a background
/// task, so the emitting thread never waits on a sink. When the channel
/// is full the event is dropped and counted.
pub struct LoggerLayer {
    sender: mpsc::Sender<LogRecord>,
    /// Events seen by the layer.
    pub total_events: Arc<AtomicU64>,
    /// Dropped because the channel was full.
    pub dropped_events: Arc<AtomicU64>,
}

impl LoggerLayer {
    /// Create a layer and spawn its forwarding task on the current Tokio
    /// runtime.
    ///
    /// The task ends once the layer (and with it the channel sender) is
    /// dropped.
    pub fn new(logger: Logger, buffer: usize) -> Result<(Self, JoinHandle<()>), TryCurrentError> {
        let handle = Handle::try_current()?;
        let (tx, mut rx) = mpsc::channel::<LogRecord>(buffer.max(16));

        let task = handle.spawn(async move {
            while let Some(record) = rx.recv().await {
                logger.log(record);
            }
        });

        Ok((
            LoggerLayer {
                sender: tx,
                total_events: Arc::new(AtomicU64::new(0)),
                dropped_events: Arc::new(AtomicU64::new(0)),
            },
            task,
        ))
    }
}

impl<S> Layer<S> for LoggerLayer
where
    S: Subscriber + for<'span> LookupSpan<'span>,
{
    fn on_event(&self, event: &Event, _ctx: Context<'_, S>) {
        let meta = event.metadata();
        if !is_forwarded(meta.target()) {
            return;
        }
        self.total_events.fetch_add(1, Ordering::Relaxed);

        let mut fields = BTreeMap::new();
        let mut message: Option<String> = None;
        let mut visitor = FieldVisitor {
            fields: &mut fields,
            message: &mut message,
        };
        event.record(&mut visitor);

        let record = LogRecord::new(Severity::from(*meta.level()), render_event(message, &fields))
            .with_tags(vec![meta.target().to_string()]);

        if self.sender.try_send(record).is_err() {
            self.dropped_events.fetch_add(1, Ordering::Relaxed);
            eprintln!("log channel full, dropping log record");
        }
    }
}

/// `message key=value key=value`, strings unquoted.
fn render_event(message: Option<String>, fields: &BTreeMap<String, Value>) -> String {
    let mut out = message.unwrap_or_default();
    for (key, value) in fields {
        if !out.is_empty() {
            out.push(' ');
        }
        match value {
            Value::String(s) => {
                let _ = write!(out, "{}={}", key, s);
            }
            other => {
                let _ = write!(out, "{}={}", key, other);
            }
        }
    }
    out
}

struct FieldVisitor<'a> {
    fields: &'a mut BTreeMap<String, Value>,
    message: &'a mut Option<String>,
}

impl<'a> Visit for FieldVisitor<'a> {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            *self.message = Some(value.to_string());
        } else {
            self.fields.insert(field.name().to_string(), Value::String(value.to_string()));
        }
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.fields.insert(field.name().to_string(), Value::from(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.fields.insert(field.name().to_string(), Value::from(value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.fields.insert(field.name().to_string(), Value::from(value));
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            *self.message = Some(format!("{:?}", value));
        } else {
            self.fields.insert(field.name().to_string(), Value::String(format!("{:?}", value)));
        }
    }
}
