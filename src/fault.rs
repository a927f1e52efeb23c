use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::panic::Location;

/// Kind given to faults built from plain text.
pub const GENERIC_KIND: &str = "Error";

/// Kind given to faults built with [`Fault::assertion`].
pub const ASSERTION_KIND: &str = "AssertionError";

/// One frame of a fault's backtrace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StackFrame {
    pub file: String,
    pub line: u32,
    pub column: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub function: Option<String>,
}

impl StackFrame {
    pub fn new(file: impl Into<String>, line: u32, column: u32) -> Self {
        StackFrame {
            file: file.into(),
            line,
            column,
            function: None,
        }
    }

    pub fn with_function(mut self, function: impl Into<String>) -> Self {
        self.function = Some(function.into());
        self
    }

    fn from_location(location: &Location<'_>) -> Self {
        StackFrame::new(location.file(), location.line(), location.column())
    }
}

impl fmt::Display for StackFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.function {
            Some(function) => write!(f, "{} ({}:{}:{})", function, self.file, self.line, self.column),
            None => write!(f, "{}:{}:{}", self.file, self.line, self.column),
        }
    }
}

/// Structured failure value carried through the logging pipeline.
///
/// A fault has a kind (`Error`, `TypeError`, `AssertionError`, or any
/// application-defined name), a message, a backtrace whose first frame is
/// the site that raised it, and an open set of properties. Request
/// decoration stores `params`, `context`, `environment` and `session`
/// among those properties.
///
/// Values are owned outright, so a clone never shares state with its
/// source.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Fault {
    kind: String,
    message: String,
    stack: Vec<StackFrame>,
    properties: BTreeMap<String, Value>,
}

impl Fault {
    /// Create a generic `Error` fault raised at the caller's location.
    #[track_caller]
    pub fn new(message: impl Into<String>) -> Self {
        Fault::with_kind(GENERIC_KIND, message)
    }

    /// Create a fault of the given kind raised at the caller's location.
    #[track_caller]
    pub fn with_kind(kind: impl Into<String>, message: impl Into<String>) -> Self {
        let mut fault = Fault::bare(kind, message);
        fault.stack.push(StackFrame::from_location(Location::caller()));
        fault
    }

    /// Create an assertion fault carrying the compared values.
    #[track_caller]
    pub fn assertion(
        message: impl Into<String>,
        actual: impl Into<Value>,
        expected: impl Into<Value>,
        operator: impl Into<String>,
    ) -> Self {
        Fault::with_kind(ASSERTION_KIND, message)
            .with_property("actual", actual)
            .with_property("expected", expected)
            .with_property("operator", operator.into())
    }

    /// Adapt a Rust error.
    ///
    /// The kind is the error's type name without its module path, and the
    /// `source()` chain is kept under the `causes` property.
    #[track_caller]
    pub fn from_error<E: std::error::Error>(error: &E) -> Self {
        let mut fault = Fault::with_kind(short_type_name::<E>(), error.to_string());

        let mut causes = Vec::new();
        let mut source = error.source();
        while let Some(cause) = source {
            causes.push(Value::String(cause.to_string()));
            source = cause.source();
        }
        if !causes.is_empty() {
            fault.properties.insert("causes".to_string(), Value::Array(causes));
        }
        fault
    }

    /// Fault with no recorded frames. Reconstruction starts from this and
    /// copies the source's backtrace afterwards.
    pub(crate) fn bare(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Fault {
            kind: kind.into(),
            message: message.into(),
            stack: Vec::new(),
            properties: BTreeMap::new(),
        }
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn set_message(&mut self, message: impl Into<String>) {
        self.message = message.into();
    }

    pub fn stack(&self) -> &[StackFrame] {
        &self.stack
    }

    pub fn set_stack(&mut self, stack: Vec<StackFrame>) {
        self.stack = stack;
    }

    pub fn with_frame(mut self, frame: StackFrame) -> Self {
        self.stack.push(frame);
        self
    }

    pub fn properties(&self) -> &BTreeMap<String, Value> {
        &self.properties
    }

    pub fn property(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }

    /// Object-valued property, or `None` if absent or not an object.
    pub fn object_property(&self, key: &str) -> Option<&Map<String, Value>> {
        self.properties.get(key).and_then(Value::as_object)
    }

    pub fn insert_property(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.properties.insert(key.into(), value.into())
    }

    pub fn remove_property(&mut self, key: &str) -> Option<Value> {
        self.properties.remove(key)
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert_property(key, value);
        self
    }

    /// Multi-line rendering: the `kind: message` header followed by one
    /// `    at <frame>` line per backtrace frame.
    pub fn render_stack(&self) -> String {
        let mut out = self.to_string();
        for frame in &self.stack {
            out.push_str("\n    at ");
            out.push_str(&frame.to_string());
        }
        out
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.message.is_empty() {
            f.write_str(&self.kind)
        } else {
            write!(f, "{}: {}", self.kind, self.message)
        }
    }
}

impl std::error::Error for Fault {}

fn short_type_name<E>() -> &'static str {
    let full = std::any::type_name::<E>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, thiserror::Error)]
    #[error("outer failure")]
    struct Outer {
        #[source]
        inner: std::io::Error,
    }

    #[test]
    fn records_the_raising_site() {
        let fault = Fault::new("Broken");
        assert_eq!(fault.kind(), "Error");
        assert_eq!(fault.stack().len(), 1);
        assert!(fault.stack()[0].file.ends_with("fault.rs"));
        assert_eq!(fault.stack()[0].line, line!() - 4);
    }

    #[test]
    fn display_matches_kind_and_message() {
        assert_eq!(Fault::new("Broken").to_string(), "Error: Broken");
        assert_eq!(Fault::with_kind("TypeError", "").to_string(), "TypeError");
        assert!(Fault::new("Broken").render_stack().starts_with("Error: Broken\n    at "));
    }

    #[test]
    fn from_error_keeps_type_name_and_causes() {
        let error = Outer {
            inner: std::io::Error::new(std::io::ErrorKind::Other, "disk gone"),
        };
        let fault = Fault::from_error(&error);
        assert_eq!(fault.kind(), "Outer");
        assert_eq!(fault.message(), "outer failure");
        assert_eq!(fault.property("causes"), Some(&serde_json::json!(["disk gone"])));
    }

    #[test]
    fn assertion_carries_comparison() {
        let fault = Fault::assertion("values differ", false, true, "strictEqual");
        assert_eq!(fault.kind(), ASSERTION_KIND);
        assert_eq!(fault.property("actual"), Some(&Value::Bool(false)));
        assert_eq!(fault.property("operator"), Some(&Value::from("strictEqual")));
    }
}
