//! Client-side log shipping buffer.
//!
//! Records are accumulated in memory and POSTed in JSON batches to an
//! ingestion endpoint. A batch goes out when the buffer is full, when the
//! flush interval ticks, and on [`Logger::close`]. Logging calls never wait
//! on the network; batches that still fail after retrying are dropped and
//! reported through `tracing`.
//!
//! ```no_run
//! use ingest_log_sink::{Logger, Options};
//!
//! #[tokio::main]
//! async fn main() {
//!     let options = Options {
//!         app: "billing".into(),
//!         hostname: "web-1".into(),
//!         ..Options::default()
//!     };
//!     let logger = Logger::new(options, "YOUR INGESTION KEY").expect("valid options");
//!
//!     logger.info("service started");
//!     logger.close().await;
//! }
//! ```

pub mod delivery;
pub mod env;
pub mod http_sink;
pub mod init;
pub mod layer;
pub mod logger;
pub mod noop_sink;
pub mod options;
pub mod payload;
pub mod record;
pub mod sink;
pub mod transport;

pub use crate::logger::{Logger, LoggerError};
pub use crate::options::{MessageOptions, Options, OptionsError};
pub use crate::record::{LogRecord, MetaEncoding};
pub use crate::sink::{LogSink, SinkError};
pub use crate::transport::{Transport, TransportConfig, TransportHandle, TransportStats};
