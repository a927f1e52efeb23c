use crate::message::MessageValue;
use crate::severity::Severity;
use chrono::{DateTime, Utc};

/// Canonical log record routed to every sink.
#[derive(Debug, Clone, PartialEq)]
pub struct LogRecord {
    pub timestamp: DateTime<Utc>,
    pub level: Severity,
    pub message: MessageValue,
    pub tags: Vec<String>,
    pub id: Option<String>,
}

impl LogRecord {
    pub fn new(level: Severity, message: impl Into<MessageValue>) -> Self {
        LogRecord {
            timestamp: Utc::now(),
            level,
            message: message.into(),
            tags: Vec::new(),
            id: None,
        }
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }
}

/// Loosely shaped input accepted by a transport's `log` call.
///
/// Either field may be missing; the transport fills in defaults
/// (`error` for the level, "Unspecified error" for the message).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LogEntry {
    pub level: Option<String>,
    pub message: Option<MessageValue>,
}

impl LogEntry {
    pub fn message(message: impl Into<MessageValue>) -> Self {
        LogEntry {
            level: None,
            message: Some(message.into()),
        }
    }

    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = Some(level.into());
        self
    }
}

impl From<&LogRecord> for LogEntry {
    fn from(record: &LogRecord) -> Self {
        LogEntry {
            level: Some(record.level.as_str().to_string()),
            message: Some(record.message.clone()),
        }
    }
}
