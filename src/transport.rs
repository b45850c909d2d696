//! Buffer and flush scheduler.
//!
//! Producers append records under a short-held lock. A batch is handed to
//! the [`LogSink`] when the buffer reaches `max_buffer_len`, when the flush
//! interval ticks, and once more on [`Transport::close`]. Every flush swaps
//! the buffer out for an empty one while holding the lock, so the critical
//! section never covers network I/O and a record can only ever end up in
//! one batch. Each batch is sent on its own task; the tasks are tracked so
//! that `close` can wait for all of them.

use crate::record::LogRecord;
use crate::sink::LogSink;
use std::mem;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::{CancellationToken, DropGuard};
use tokio_util::task::task_tracker::TaskTrackerToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, warn, Instrument};

const MIN_FLUSH_INTERVAL: Duration = Duration::from_millis(1);

/// Flush triggers for a [`Transport`].
#[derive(Clone, Debug)]
pub struct TransportConfig {
    /// Buffer length that triggers an immediate flush.
    pub max_buffer_len: usize,
    /// Period of the background flush, regardless of buffer occupancy.
    pub flush_interval: Duration,
}

#[derive(thiserror::Error, Debug)]
pub enum TransportError {
    #[error("transport must be created from within a Tokio runtime")]
    NoRuntime,
}

/// Point-in-time copy of a transport's counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TransportStats {
    /// Records accepted into the buffer.
    pub enqueued: u64,
    /// Records refused because the transport was already closed.
    pub rejected: u64,
    /// Batches the sink reported as delivered.
    pub batches_sent: u64,
    /// Batches the sink gave up on. Their records are lost.
    pub batches_failed: u64,
}

#[derive(Debug, Default)]
struct Counters {
    enqueued: AtomicU64,
    rejected: AtomicU64,
    batches_sent: AtomicU64,
    batches_failed: AtomicU64,
}

#[derive(Default)]
struct Buffer {
    records: Vec<LogRecord>,
    closed: bool,
}

/// Records taken out of the buffer, plus the tracker token that keeps
/// `close` waiting until they have been handed to the sink.
struct Batch {
    records: Vec<LogRecord>,
    token: TaskTrackerToken,
}

struct Shared {
    buffer: Mutex<Buffer>,
    max_buffer_len: usize,
    sink: Arc<dyn LogSink>,
    sends: TaskTracker,
    runtime: Handle,
    counters: Counters,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Buffer> {
        // The buffer is plain data; a panic elsewhere cannot leave it torn.
        self.buffer.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn add(self: &Arc<Self>, record: LogRecord) {
        let batch = {
            let mut buffer = self.lock();
            if buffer.closed {
                drop(buffer);
                self.counters.rejected.fetch_add(1, Ordering::Relaxed);
                warn!("log transport is closed, dropping record");
                return;
            }

            buffer.records.push(record);
            self.counters.enqueued.fetch_add(1, Ordering::Relaxed);
            if buffer.records.len() < self.max_buffer_len {
                return;
            }
            self.take(&mut buffer)
        };

        self.dispatch(batch);
    }

    fn flush(self: &Arc<Self>) {
        let batch = self.take(&mut self.lock());
        self.dispatch(batch);
    }

    /// Take whatever is left and refuse any further records.
    fn seal(self: &Arc<Self>) {
        let batch = {
            let mut buffer = self.lock();
            buffer.closed = true;
            self.take(&mut buffer)
        };
        self.dispatch(batch);
    }

    /// Swap the buffered records out and register their send with the
    /// tracker. Must be called with the buffer lock held: a batch that has
    /// left the buffer is always visible to `close` as an outstanding send.
    fn take(&self, buffer: &mut Buffer) -> Option<Batch> {
        if buffer.records.is_empty() {
            return None;
        }
        Some(Batch {
            records: mem::take(&mut buffer.records),
            token: self.sends.token(),
        })
    }

    fn dispatch(self: &Arc<Self>, batch: Option<Batch>) {
        let Some(Batch { records: batch, token }) = batch else {
            return;
        };

        let shared = Arc::clone(self);
        self.runtime.spawn(
            async move {
                let _token = token;
                let records = batch.len();
                match shared.sink.send(batch).await {
                    Ok(()) => {
                        shared.counters.batches_sent.fetch_add(1, Ordering::Relaxed);
                        debug!(records, "log batch sent");
                    }
                    Err(err) => {
                        shared.counters.batches_failed.fetch_add(1, Ordering::Relaxed);
                        error!(records, error = %err, "dropping log batch");
                    }
                }
            }
            .in_current_span(),
        );
    }

    fn stats(&self) -> TransportStats {
        TransportStats {
            enqueued: self.counters.enqueued.load(Ordering::Relaxed),
            rejected: self.counters.rejected.load(Ordering::Relaxed),
            batches_sent: self.counters.batches_sent.load(Ordering::Relaxed),
            batches_failed: self.counters.batches_failed.load(Ordering::Relaxed),
        }
    }
}

/// Owner of the buffer, the interval task and all in-flight sends.
///
/// Dropping a `Transport` without calling [`close`](Transport::close) stops
/// the interval task but abandons whatever is still buffered.
pub struct Transport {
    shared: Arc<Shared>,
    shutdown: CancellationToken,
    ticker: JoinHandle<()>,
    _ticker_guard: DropGuard,
}

impl Transport {
    /// Create a transport feeding `sink` and start its interval task.
    ///
    /// Must be called from within a Tokio runtime. The runtime is captured,
    /// so [`add`](Transport::add) may afterwards be called from any thread.
    /// A zero `max_buffer_len` is treated as 1.
    pub fn new(sink: Arc<dyn LogSink>, config: TransportConfig) -> Result<Self, TransportError> {
        let runtime = Handle::try_current().map_err(|_| TransportError::NoRuntime)?;
        let flush_interval = config.flush_interval.max(MIN_FLUSH_INTERVAL);

        let shared = Arc::new(Shared {
            buffer: Mutex::new(Buffer::default()),
            max_buffer_len: config.max_buffer_len.max(1),
            sink,
            sends: TaskTracker::new(),
            runtime,
            counters: Counters::default(),
        });

        let shutdown = CancellationToken::new();
        let ticker = shared.runtime.spawn(run_interval(
            Arc::clone(&shared),
            flush_interval,
            shutdown.clone(),
        ));

        Ok(Self {
            shared,
            _ticker_guard: shutdown.clone().drop_guard(),
            shutdown,
            ticker,
        })
    }

    /// Append a record, flushing if the buffer is now full.
    ///
    /// Never waits on the network: a full buffer is swapped out and its
    /// send is spawned in the background.
    pub fn add(&self, record: LogRecord) {
        self.shared.add(record);
    }

    /// Send whatever is buffered now. A no-op when the buffer is empty.
    pub fn flush(&self) {
        self.shared.flush();
    }

    /// A cloneable producer handle sharing this transport's buffer.
    pub fn handle(&self) -> TransportHandle {
        TransportHandle {
            shared: Arc::clone(&self.shared),
        }
    }

    pub fn stats(&self) -> TransportStats {
        self.shared.stats()
    }

    /// Number of records waiting for the next flush.
    pub fn pending(&self) -> usize {
        self.shared.lock().records.len()
    }

    /// Flush the remainder, stop the interval task and wait for every
    /// in-flight send to finish, successfully or not.
    pub async fn close(self) {
        self.shared.seal();

        self.shutdown.cancel();
        if let Err(err) = self.ticker.await {
            warn!(error = %err, "log flush interval task did not shut down cleanly");
        }

        self.shared.sends.close();
        self.shared.sends.wait().await;

        let stats = self.shared.stats();
        debug!(
            batches_sent = stats.batches_sent,
            batches_failed = stats.batches_failed,
            "log transport closed"
        );
    }
}

/// Producer-side handle to a [`Transport`].
///
/// Records added after the owning transport was closed are counted as
/// rejected and discarded.
#[derive(Clone)]
pub struct TransportHandle {
    shared: Arc<Shared>,
}

impl TransportHandle {
    pub fn add(&self, record: LogRecord) {
        self.shared.add(record);
    }

    pub fn stats(&self) -> TransportStats {
        self.shared.stats()
    }
}

async fn run_interval(shared: Arc<Shared>, period: Duration, shutdown: CancellationToken) {
    let mut interval = interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = interval.tick() => shared.flush(),
        }
    }
}
