use std::sync::Arc;
use std::time::Instant;

use ingest_log_sink::noop_sink::NoopSink;
use ingest_log_sink::{Logger, Options};

#[tokio::main]
async fn main() {
    let logger = Logger::with_sink(Options::default(), "load-test", Arc::new(NoopSink))
        .expect("valid default options");

    let n: u64 = 100_000;
    let start = Instant::now();

    for i in 0..n {
        logger.info(format!("default load test line {i}"));
    }

    let elapsed = start.elapsed();
    println!("default config: buffered {} records in {:?} (~{:.0} rec/s)",
        n,
        elapsed,
        n as f64 / elapsed.as_secs_f64()
    );

    let handle = logger.handle();
    logger.close().await;
    println!("{:?}", handle.stats());
}
