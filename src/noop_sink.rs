use crate::record::LogRecord;
use crate::sink::LogSink;
use async_trait::async_trait;
use std::error::Error;
use std::sync::atomic::{AtomicU64, Ordering};

/// A sink that counts records and drops them.
///
/// Useful for measuring the overhead of the dispatch path without any
/// I/O, and for tests that only care how many records got through.
#[derive(Default)]
pub struct NoopSink {
    received: AtomicU64,
}

impl NoopSink {
    /// Records accepted so far.
    pub fn received(&self) -> u64 {
        self.received.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl LogSink for NoopSink {
    fn name(&self) -> &str {
        "noop"
    }

    async fn send(&self, _record: &LogRecord) -> Result<(), Box<dyn Error + Send + Sync>> {
        self.received.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}
