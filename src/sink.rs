use crate::record::LogRecord;
use crate::severity::Severity;
use async_trait::async_trait;
use std::error::Error;

/// Asynchronous destination for [`LogRecord`]s routed by the
/// [`Logger`](crate::logger::Logger).
///
/// Implementations transport records to a concrete backend (console,
/// Airbrake, etc). The logger calls `send` from a spawned task and never
/// awaits it on the caller's path.
#[async_trait]
pub trait LogSink: Send + Sync {
    /// Short name reported in [`LoggedEvent`](crate::logger::LoggedEvent)s.
    fn name(&self) -> &str;

    /// Minimum severity this sink accepts. `None` defers to the logger's
    /// own level.
    fn level(&self) -> Option<Severity> {
        None
    }

    /// Send a single log record to the underlying backend.
    ///
    /// **Parameters**
    /// - `record`: fully-populated [`LogRecord`] that already passed level
    ///   filtering.
    ///
    /// **Returns**
    /// - `Ok(())` if the record was accepted by the backend.
    /// - `Err(..)` if the backend failed. The logger reports the failure
    ///   on stderr and moves on; records are not retried.
    async fn send(&self, record: &LogRecord) -> Result<(), Box<dyn Error + Send + Sync>>;

    /// Flush any buffered records, if the backend implements buffering.
    ///
    /// Default implementation is a no-op.
    async fn flush(&self) -> Result<(), Box<dyn Error + Send + Sync>> {
        Ok(())
    }
}
