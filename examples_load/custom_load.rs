use std::sync::Arc;
use std::time::Instant;
use tokio::time::Duration;

use ingest_log_sink::noop_sink::NoopSink;
use ingest_log_sink::{Logger, Options};

#[tokio::main]
async fn main() {
    let options = Options {
        max_buffer_len: 1_000,
        flush_interval: Duration::from_millis(200),
        ..Options::default()
    };
    let logger = Logger::with_sink(options, "load-test", Arc::new(NoopSink))
        .expect("valid options");

    let producers = 4;
    let per_producer: u64 = 25_000;
    let start = Instant::now();

    let threads: Vec<_> = (0..producers)
        .map(|p| {
            let handle = logger.handle();
            std::thread::spawn(move || {
                for i in 0..per_producer {
                    handle.add(ingest_log_sink::LogRecord::new(format!("producer {p} line {i}")));
                }
            })
        })
        .collect();
    for thread in threads {
        thread.join().expect("producer thread panicked");
    }

    let n = producers * per_producer;
    let elapsed = start.elapsed();
    println!("custom config: buffered {} records from {} threads in {:?} (~{:.0} rec/s)",
        n,
        producers,
        elapsed,
        n as f64 / elapsed.as_secs_f64()
    );

    let handle = logger.handle();
    logger.close().await;
    println!("{:?}", handle.stats());
}
