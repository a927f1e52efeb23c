//! Normalizes HTTP server events into one logging pipeline and reports
//! errors to Airbrake.

pub mod env;
pub mod severity;
pub mod fault;
pub mod reconstruct;
pub mod message;
pub mod format;
pub mod normalize;
pub mod record;
pub mod event;
pub mod mapper;
pub mod notification;
pub mod sink;
pub mod console;
pub mod noop_sink;
pub mod client;
pub mod transport;
pub mod logger;
pub mod backend;
pub mod layer;
pub mod init;
pub mod adapter;
pub mod plugin;

pub use fault::Fault;
pub use logger::{default_logger, LoggedEvent, Logger, LoggerOptions};
pub use message::{MessagePart, MessageValue};
pub use record::{LogEntry, LogRecord};
pub use severity::Severity;
pub use transport::{AirbrakeOptions, AirbrakeTransport};
