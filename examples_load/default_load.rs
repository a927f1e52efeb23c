use std::sync::Arc;
use std::time::Instant;
use tokio::time::{sleep, Duration};
use tracing::error;

use http_event_logger::init::init_tracing;
use http_event_logger::noop_sink::NoopSink;
use http_event_logger::sink::LogSink;
use http_event_logger::{Logger, Severity};

#[tokio::main]
async fn main() {
    let sink = Arc::new(NoopSink::default());
    let logger = Logger::with_sinks(vec![sink.clone() as Arc<dyn LogSink>], Severity::Debug);
    if let Err(e) = init_tracing(logger.clone()) {
        eprintln!("{}", e);
        return;
    }

    let n: u64 = 100_000;
    let start = Instant::now();

    for i in 0..n {
        if i % 2 == 0 {
            error!(iteration = i, "default load test error");
        } else {
            logger.error(format!("direct load test error {}", i));
        }
    }

    let elapsed = start.elapsed();
    println!(
        "default config: dispatched {} records in {:?} (~{:.0} rec/s)",
        n,
        elapsed,
        n as f64 / elapsed.as_secs_f64()
    );

    // Give background tasks a little time to drain
    sleep(Duration::from_secs(2)).await;
    println!("sink received {} records", sink.received());
}
