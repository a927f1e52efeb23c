use crate::fault::Fault;
use crate::format::format_parts;
use serde_json::Value;

/// One element of a [`MessageValue::Sequence`].
#[derive(Debug, Clone, PartialEq)]
pub enum MessagePart {
    Text(String),
    Value(Value),
    Fault(Fault),
}

/// Message carried by a log record: plain text, a fault, or a sequence
/// mixing both (and arbitrary values) in printf style.
#[derive(Debug, Clone, PartialEq)]
pub enum MessageValue {
    Text(String),
    Fault(Fault),
    Sequence(Vec<MessagePart>),
}

impl MessageValue {
    /// Human-readable text for console-style sinks.
    ///
    /// Faults render with their backtrace; sequences are joined with
    /// [`format_parts`].
    pub fn render(&self) -> String {
        match self {
            MessageValue::Text(text) => text.clone(),
            MessageValue::Fault(fault) => fault.render_stack(),
            MessageValue::Sequence(parts) => format_parts(parts),
        }
    }

    pub fn as_fault(&self) -> Option<&Fault> {
        match self {
            MessageValue::Fault(fault) => Some(fault),
            _ => None,
        }
    }
}

impl From<&str> for MessageValue {
    fn from(text: &str) -> Self {
        MessageValue::Text(text.to_string())
    }
}

impl From<String> for MessageValue {
    fn from(text: String) -> Self {
        MessageValue::Text(text)
    }
}

impl From<Fault> for MessageValue {
    fn from(fault: Fault) -> Self {
        MessageValue::Fault(fault)
    }
}

impl From<Vec<MessagePart>> for MessageValue {
    fn from(parts: Vec<MessagePart>) -> Self {
        MessageValue::Sequence(parts)
    }
}

impl From<&str> for MessagePart {
    fn from(text: &str) -> Self {
        MessagePart::Text(text.to_string())
    }
}

impl From<String> for MessagePart {
    fn from(text: String) -> Self {
        MessagePart::Text(text)
    }
}

impl From<Fault> for MessagePart {
    fn from(fault: Fault) -> Self {
        MessagePart::Fault(fault)
    }
}

impl From<Value> for MessagePart {
    fn from(value: Value) -> Self {
        match value {
            Value::String(text) => MessagePart::Text(text),
            other => MessagePart::Value(other),
        }
    }
}

/// Build a [`MessageValue::Sequence`] from heterogeneous parts.
///
/// ```
/// use http_event_logger::{message, fault::Fault};
///
/// let msg = message!["count: %d", serde_json::json!(3), Fault::new("boom")];
/// assert!(matches!(msg, http_event_logger::message::MessageValue::Sequence(ref p) if p.len() == 3));
/// ```
#[macro_export]
macro_rules! message {
    ($($part:expr),* $(,)?) => {
        $crate::message::MessageValue::Sequence(vec![$($crate::message::MessagePart::from($part)),*])
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn renders_each_shape() {
        assert_eq!(MessageValue::from("plain").render(), "plain");
        assert!(MessageValue::from(Fault::new("Broken")).render().starts_with("Error: Broken\n"));
        let seq = crate::message!["%s has %d items", "cart", json!(2)];
        assert_eq!(seq.render(), "cart has 2 items");
    }

    #[test]
    fn json_strings_become_text_parts() {
        assert_eq!(MessagePart::from(json!("x")), MessagePart::Text("x".to_string()));
        assert_eq!(MessagePart::from(json!(1)), MessagePart::Value(json!(1)));
    }
}
