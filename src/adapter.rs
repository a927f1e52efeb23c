use crate::event::InboundEvent;
use crate::logger::Logger;
use crate::mapper::{EventLevels, EventMapper};
use crate::message::MessageValue;
use crate::record::LogRecord;
use crate::severity::Severity;

/// Something written to a [`StreamAdapter`].
#[derive(Debug, Clone, PartialEq)]
pub enum StreamItem {
    /// A host server event, mapped before logging.
    Event(InboundEvent),
    /// A bare message, logged at `info`.
    Raw(MessageValue),
}

impl From<InboundEvent> for StreamItem {
    fn from(event: InboundEvent) -> Self {
        StreamItem::Event(event)
    }
}

impl From<MessageValue> for StreamItem {
    fn from(message: MessageValue) -> Self {
        StreamItem::Raw(message)
    }
}

impl From<&str> for StreamItem {
    fn from(text: &str) -> Self {
        StreamItem::Raw(MessageValue::from(text))
    }
}

/// Feeds host server events into a [`Logger`].
#[derive(Clone)]
pub struct StreamAdapter {
    logger: Logger,
    mapper: EventMapper,
}

impl StreamAdapter {
    pub fn new(logger: Logger, levels: EventLevels) -> Self {
        StreamAdapter {
            logger,
            mapper: EventMapper::new(levels),
        }
    }

    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    pub fn mapper(&self) -> &EventMapper {
        &self.mapper
    }

    pub fn write(&self, item: impl Into<StreamItem>) {
        let record = match item.into() {
            StreamItem::Event(event) => self.mapper.to_record(&event),
            StreamItem::Raw(message) => LogRecord::new(Severity::Info, message),
        };
        self.logger.log(record);
    }
}
