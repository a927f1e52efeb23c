use std::sync::Arc;

use crate::console::ConsoleSink;
use crate::sink::LogSink;
use crate::transport::{AirbrakeSettings, AirbrakeTransport};

/// Sink kinds that can be selected by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkKind {
    Console,
    Airbrake,
}

/// Settings shared by every sink built through [`make_sink`].
#[derive(Debug, Clone)]
pub struct SinkSettings {
    /// Colour console level names.
    pub console_colors: bool,
    pub airbrake: AirbrakeSettings,
}

/// Parse a transport name.
///
/// Examples: `"console"`, `"airbrake"` (case-insensitive).
pub fn parse_sink_kind(name: &str) -> Result<SinkKind, UnknownSinkError> {
    match name.trim().to_ascii_lowercase().as_str() {
        "console" => Ok(SinkKind::Console),
        "airbrake" => Ok(SinkKind::Airbrake),
        _ => Err(UnknownSinkError(name.to_string())),
    }
}

/// Error type returned when a transport name is not recognized.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown or unsupported transport `{0}`")]
pub struct UnknownSinkError(pub String);

/// Create a concrete [`LogSink`] for `kind`.
///
/// An Airbrake sink is always created; without a host and key it is
/// simply inert.
pub fn make_sink(kind: SinkKind, settings: &SinkSettings) -> Arc<dyn LogSink> {
    match kind {
        SinkKind::Console => {
            let sink = if settings.console_colors {
                ConsoleSink::stdout()
            } else {
                ConsoleSink::with_writer(Box::new(std::io::stdout()), false)
            };
            Arc::new(sink) as Arc<dyn LogSink>
        }
        SinkKind::Airbrake => {
            let sink = AirbrakeTransport::from_settings(settings.airbrake.clone());
            Arc::new(sink) as Arc<dyn LogSink>
        }
    }
}
