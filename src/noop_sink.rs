use crate::record::LogRecord;
use crate::sink::{LogSink, SinkError};
use async_trait::async_trait;

/// A sink that simply drops every batch.
///
/// Useful for measuring the overhead of the buffer itself without any
/// network I/O, and for tests that don't care about delivery.
#[derive(Clone, Default)]
pub struct NoopSink;

#[async_trait]
impl LogSink for NoopSink {
    async fn send(&self, _batch: Vec<LogRecord>) -> Result<(), SinkError> {
        Ok(())
    }
}
