use crate::record::LogRecord;
use crate::severity::Severity;
use crate::sink::LogSink;
use async_trait::async_trait;
use std::error::Error;
use std::io::Write;
use std::sync::Mutex;

/// Sink that prints `<level>: <message>` lines.
///
/// Faults are printed with their backtrace and message sequences are
/// joined printf-style, so what ends up on the terminal matches
/// [`MessageValue::render`](crate::message::MessageValue::render).
pub struct ConsoleSink {
    level: Option<Severity>,
    colors: bool,
    out: Mutex<Box<dyn Write + Send>>,
}

impl ConsoleSink {
    /// Coloured sink writing to stdout.
    pub fn stdout() -> Self {
        ConsoleSink::with_writer(Box::new(std::io::stdout()), true)
    }

    /// Sink writing to any writer, e.g. a buffer in tests.
    pub fn with_writer(out: Box<dyn Write + Send>, colors: bool) -> Self {
        ConsoleSink {
            level: None,
            colors,
            out: Mutex::new(out),
        }
    }

    pub fn with_level(mut self, level: Severity) -> Self {
        self.level = Some(level);
        self
    }

    fn format_line(&self, record: &LogRecord) -> String {
        let level = if self.colors {
            let color = match record.level {
                Severity::Error => 31,
                Severity::Warn => 33,
                Severity::Info => 32,
                Severity::Debug => 34,
            };
            format!("\x1b[{}m{}\x1b[39m", color, record.level)
        } else {
            record.level.to_string()
        };
        format!("{}: {}\n", level, record.message.render())
    }
}

#[async_trait]
impl LogSink for ConsoleSink {
    fn name(&self) -> &str {
        "console"
    }

    fn level(&self) -> Option<Severity> {
        self.level
    }

    async fn send(&self, record: &LogRecord) -> Result<(), Box<dyn Error + Send + Sync>> {
        let line = self.format_line(record);
        let mut out = self.out.lock().map_err(|_| "console writer lock poisoned")?;
        out.write_all(line.as_bytes())?;
        Ok(())
    }

    async fn flush(&self) -> Result<(), Box<dyn Error + Send + Sync>> {
        let mut out = self.out.lock().map_err(|_| "console writer lock poisoned")?;
        out.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fault::Fault;
    use std::sync::Arc;

    #[derive(Clone, Default)]
    struct Buffer(Arc<Mutex<Vec<u8>>>);

    impl Write for Buffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl Buffer {
        fn contents(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    #[tokio::test]
    async fn writes_plain_lines() {
        let buffer = Buffer::default();
        let sink = ConsoleSink::with_writer(Box::new(buffer.clone()), false);
        sink.send(&LogRecord::new(Severity::Warn, "Warning level logging")).await.unwrap();
        assert_eq!(buffer.contents(), "warn: Warning level logging\n");
    }

    #[tokio::test]
    async fn colours_the_level_and_prints_backtraces() {
        let buffer = Buffer::default();
        let sink = ConsoleSink::with_writer(Box::new(buffer.clone()), true);
        sink.send(&LogRecord::new(Severity::Error, Fault::new("Broken"))).await.unwrap();
        let out = buffer.contents();
        assert!(out.starts_with("\x1b[31merror\x1b[39m: Error: Broken\n    at "));
    }
}
