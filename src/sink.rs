use crate::delivery::DeliveryError;
use crate::payload::EncodeError;
use crate::record::LogRecord;
use async_trait::async_trait;
use std::error::Error;

/// Asynchronous destination for batches drained from the transport.
///
/// Implementations are responsible for turning a batch into whatever the
/// backend expects and shipping it. The transport calls `send` from a
/// spawned task and never awaits it on the producer's thread.
#[async_trait]
pub trait LogSink: Send + Sync {
    /// Send one batch of records, in order.
    ///
    /// **Parameters**
    /// - `batch`: records drained from the buffer in the order they were
    ///   added. Never empty.
    ///
    /// **Returns**
    /// - `Ok(())` if the backend accepted the batch.
    /// - `Err(..)` once the sink has given up on it. The transport reports
    ///   the error and drops the batch; it never retries on its own.
    async fn send(&self, batch: Vec<LogRecord>) -> Result<(), SinkError>;
}

/// Why a batch was dropped by a sink.
#[derive(thiserror::Error, Debug)]
pub enum SinkError {
    #[error(transparent)]
    Encode(#[from] EncodeError),

    #[error(transparent)]
    Delivery(#[from] DeliveryError),

    #[error("{0}")]
    Other(#[source] Box<dyn Error + Send + Sync>),
}

impl SinkError {
    pub fn other(err: impl Into<Box<dyn Error + Send + Sync>>) -> Self {
        SinkError::Other(err.into())
    }
}
