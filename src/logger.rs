use crate::backend::{make_sink, parse_sink_kind, SinkSettings};
use crate::env::{process_env, resolve_level, LOG_LEVEL_ENV};
use crate::message::MessageValue;
use crate::record::LogRecord;
use crate::severity::Severity;
use crate::sink::LogSink;
use crate::transport::{AirbrakeOptions, AirbrakeSettings};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Instant;
use tokio::sync::broadcast;

/// Published whenever a record is handed to a sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggedEvent {
    /// Name of the sink, e.g. `console` or `airbrake`.
    pub transport: String,
    pub level: String,
    /// Rendered message text.
    pub message: String,
}

/// Options for [`Logger::new`].
#[derive(Debug, Clone)]
pub struct LoggerOptions {
    /// Minimum level for sinks without their own; falls back to
    /// `LOG_LEVEL`, then `info`.
    pub level: Option<Severity>,
    /// Sink names to activate. Unknown names are skipped.
    pub transports: Vec<String>,
    pub airbrake: AirbrakeOptions,
    pub console_colors: bool,
}

impl Default for LoggerOptions {
    fn default() -> Self {
        LoggerOptions {
            level: None,
            transports: vec!["console".to_string(), "airbrake".to_string()],
            airbrake: AirbrakeOptions::default(),
            console_colors: true,
        }
    }
}

/// Routes records to a fixed set of sinks.
///
/// Cloning is cheap and every clone shares the same sinks and
/// subscribers. Dispatch is fire-and-forget: each accepted
/// `(record, sink)` pair is sent from its own Tokio task, so delivery
/// order across calls is not guaranteed.
#[derive(Clone)]
pub struct Logger {
    inner: Arc<LoggerInner>,
}

struct LoggerInner {
    level: Severity,
    sinks: Vec<Arc<dyn LogSink>>,
    events: broadcast::Sender<LoggedEvent>,
    profiles: Mutex<HashMap<String, Instant>>,
}

impl Logger {
    /// Build sinks from `options`, filling gaps from the process
    /// environment.
    pub fn new(options: LoggerOptions) -> Self {
        Logger::resolve(options, process_env)
    }

    /// Logger with default options and the process environment.
    pub fn from_env() -> Self {
        Logger::new(LoggerOptions::default())
    }

    /// Build sinks from `options`, filling gaps from `lookup`.
    pub fn resolve<F>(options: LoggerOptions, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let level = resolve_level(options.level, LOG_LEVEL_ENV, &lookup, Severity::Info);
        let settings = SinkSettings {
            console_colors: options.console_colors,
            airbrake: AirbrakeSettings::resolve(&options.airbrake, &lookup),
        };

        let mut sinks = Vec::new();
        for name in &options.transports {
            match parse_sink_kind(name) {
                Ok(kind) => sinks.push(make_sink(kind, &settings)),
                Err(e) => eprintln!("skipping transport: {}", e),
            }
        }
        Logger::with_sinks(sinks, level)
    }

    /// Logger over an explicit sink list.
    pub fn with_sinks(sinks: Vec<Arc<dyn LogSink>>, level: Severity) -> Self {
        let (events, _) = broadcast::channel(1024);
        Logger {
            inner: Arc::new(LoggerInner {
                level,
                sinks,
                events,
                profiles: Mutex::new(HashMap::new()),
            }),
        }
    }

    pub fn level(&self) -> Severity {
        self.inner.level
    }

    pub fn sink_names(&self) -> Vec<&str> {
        self.inner.sinks.iter().map(|sink| sink.name()).collect()
    }

    /// Observe records as they are handed to sinks.
    pub fn subscribe(&self) -> broadcast::Receiver<LoggedEvent> {
        self.inner.events.subscribe()
    }

    /// Dispatch a record to every sink whose level admits it.
    ///
    /// Returns immediately. Outside a Tokio runtime the record is dropped
    /// with a diagnostic on stderr.
    pub fn log(&self, record: LogRecord) {
        let handle = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                eprintln!("no Tokio runtime available, dropping log record");
                return;
            }
        };

        let record = Arc::new(record);
        for sink in &self.inner.sinks {
            let threshold = sink.level().unwrap_or(self.inner.level);
            if !threshold.admits(record.level) {
                continue;
            }

            let sink = Arc::clone(sink);
            let record = Arc::clone(&record);
            let events = self.inner.events.clone();
            handle.spawn(async move {
                let _ = events.send(LoggedEvent {
                    transport: sink.name().to_string(),
                    level: record.level.as_str().to_string(),
                    message: record.message.render(),
                });
                if let Err(e) = sink.send(&record).await {
                    eprintln!("Unable to log to transport {}: {}", sink.name(), e);
                }
            });
        }
    }

    /// Log `message` at the named level; unknown names log at `info`.
    pub fn notify(&self, level: &str, message: impl Into<MessageValue>) {
        self.log(LogRecord::new(Severity::lenient(level), message));
    }

    pub fn debug(&self, message: impl Into<MessageValue>) {
        self.log(LogRecord::new(Severity::Debug, message));
    }

    pub fn info(&self, message: impl Into<MessageValue>) {
        self.log(LogRecord::new(Severity::Info, message));
    }

    pub fn warn(&self, message: impl Into<MessageValue>) {
        self.log(LogRecord::new(Severity::Warn, message));
    }

    pub fn error(&self, message: impl Into<MessageValue>) {
        self.log(LogRecord::new(Severity::Error, message));
    }

    /// Start or finish a named timer.
    ///
    /// The first call for `id` starts the timer and returns `false`. The
    /// next one logs `"<id> durationMs=<elapsed>"` at info and returns
    /// `true`.
    pub fn profile(&self, id: &str) -> bool {
        let started = {
            let mut profiles = self
                .inner
                .profiles
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            match profiles.remove(id) {
                Some(started) => Some(started),
                None => {
                    profiles.insert(id.to_string(), Instant::now());
                    None
                }
            }
        };

        match started {
            Some(started) => {
                let elapsed = started.elapsed().as_millis();
                self.info(format!("{} durationMs={}", id, elapsed));
                true
            }
            None => false,
        }
    }

    /// Flush every sink, reporting failures on stderr.
    pub async fn flush(&self) {
        for sink in &self.inner.sinks {
            if let Err(e) = sink.flush().await {
                eprintln!("Unable to flush transport {}: {}", sink.name(), e);
            }
        }
    }
}

/// Process-wide logger built from the environment on first use.
pub fn default_logger() -> &'static Logger {
    static LOGGER: OnceLock<Logger> = OnceLock::new();
    LOGGER.get_or_init(Logger::from_env)
}
