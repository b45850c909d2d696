use std::sync::Arc;

use async_trait::async_trait;
use ingest_log_sink::{LogRecord, LogSink, Logger, Options, SinkError};

/// Example of plugging a completely custom destination into the buffer by
/// implementing `LogSink` directly. Here every batch is printed.
struct StdoutSink;

#[async_trait]
impl LogSink for StdoutSink {
    async fn send(&self, batch: Vec<LogRecord>) -> Result<(), SinkError> {
        println!("[stdout-sink] batch of {}", batch.len());
        for record in batch {
            println!("  {} {}", record.level, record.body);
        }
        Ok(())
    }
}

#[tokio::main]
async fn main() {
    let options = Options {
        app: "custom-sink-example".into(),
        max_buffer_len: 2,
        ..Options::default()
    };
    let logger = Logger::with_sink(options, "unused", Arc::new(StdoutSink))
        .expect("valid options");

    logger.info("first");
    logger.info("second");
    logger.error("third");

    logger.close().await;
}
