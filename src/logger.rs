use crate::delivery::{DeliveryError, RetryPolicy};
use crate::http_sink::{HttpSink, HttpSinkConfig};
use crate::layer::IngestLayer;
use crate::options::{MessageOptions, Options, OptionsError};
use crate::payload::Identity;
use crate::sink::LogSink;
use crate::transport::{Transport, TransportConfig, TransportError, TransportHandle, TransportStats};
use std::sync::Arc;
use tracing::Level;

#[derive(thiserror::Error, Debug)]
pub enum LoggerError {
    #[error(transparent)]
    Options(#[from] OptionsError),

    #[error(transparent)]
    Delivery(#[from] DeliveryError),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Entry point for applications: turns log calls into records and hands
/// them to a background [`Transport`].
///
/// Every logging call returns as soon as the record is buffered. Delivery
/// failures are reported through `tracing` and the transport's stats, never
/// to the caller. Call [`close`](Logger::close) before exiting, otherwise
/// buffered records are lost.
pub struct Logger {
    key: String,
    options: Options,
    transport: Transport,
}

impl Logger {
    /// Create a logger that ships to `options.ingest_url` over HTTP.
    ///
    /// **Parameters**
    /// - `options`: validated, then completed with defaults.
    /// - `key`: ingestion key, sent in the payload and the `apikey` header.
    ///
    /// **Returns**
    /// - `Err(..)` if the options are invalid, the key is not a valid
    ///   header value, or no Tokio runtime is running.
    pub fn new(options: Options, key: impl Into<String>) -> Result<Self, LoggerError> {
        let key = key.into();
        options.validate()?;
        let options = options.with_defaults();

        let sink = HttpSink::new(HttpSinkConfig {
            ingest_url: options.ingest_url.clone(),
            api_key: key.clone(),
            identity: Identity {
                hostname: options.hostname.clone(),
                ip_address: options.ip_address.clone(),
                mac_address: options.mac_address.clone(),
                tags: options.tags.clone(),
            },
            user_agent: crate::env::user_agent(),
            send_timeout: options.send_timeout,
            retry: RetryPolicy::default(),
        })?;

        Self::build(options, key, Arc::new(sink))
    }

    /// Create a logger that hands its batches to a custom [`LogSink`].
    ///
    /// Endpoint and identity options are ignored; buffering options apply.
    pub fn with_sink(
        options: Options,
        key: impl Into<String>,
        sink: Arc<dyn LogSink>,
    ) -> Result<Self, LoggerError> {
        options.validate()?;
        Self::build(options.with_defaults(), key.into(), sink)
    }

    fn build(options: Options, key: String, sink: Arc<dyn LogSink>) -> Result<Self, LoggerError> {
        let transport = Transport::new(
            sink,
            TransportConfig {
                max_buffer_len: options.max_buffer_len,
                flush_interval: options.flush_interval,
            },
        )?;

        Ok(Self {
            key,
            options,
            transport,
        })
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Options in effect, defaults included.
    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn stats(&self) -> TransportStats {
        self.transport.stats()
    }

    pub fn handle(&self) -> TransportHandle {
        self.transport.handle()
    }

    /// A `tracing` layer feeding this logger's buffer. Events at or below
    /// `max_level` verbosity become records using this logger's defaults.
    pub fn layer(&self, max_level: Level) -> IngestLayer {
        IngestLayer::new(self.transport.handle(), self.options.clone(), max_level)
    }

    pub fn log(&self, body: impl Into<String>) {
        self.send(body, &MessageOptions::default());
    }

    pub fn log_with_level(&self, body: impl Into<String>, level: &str) -> Result<(), OptionsError> {
        self.log_with_options(
            body,
            MessageOptions {
                level: level.to_string(),
                ..MessageOptions::default()
            },
        )
    }

    pub fn log_with_level_and_app(
        &self,
        body: impl Into<String>,
        level: &str,
        app: &str,
    ) -> Result<(), OptionsError> {
        self.log_with_options(
            body,
            MessageOptions {
                level: level.to_string(),
                app: app.to_string(),
                ..MessageOptions::default()
            },
        )
    }

    /// Log with per-message overrides. Nothing is buffered if they are
    /// invalid.
    pub fn log_with_options(
        &self,
        body: impl Into<String>,
        message: MessageOptions,
    ) -> Result<(), OptionsError> {
        message.validate()?;
        self.send(body, &message);
        Ok(())
    }

    pub fn info(&self, body: impl Into<String>) {
        self.send_level(body, "info");
    }

    pub fn warn(&self, body: impl Into<String>) {
        self.send_level(body, "warn");
    }

    pub fn debug(&self, body: impl Into<String>) {
        self.send_level(body, "debug");
    }

    pub fn error(&self, body: impl Into<String>) {
        self.send_level(body, "error");
    }

    pub fn fatal(&self, body: impl Into<String>) {
        self.send_level(body, "fatal");
    }

    pub fn critical(&self, body: impl Into<String>) {
        self.send_level(body, "critical");
    }

    fn send_level(&self, body: impl Into<String>, level: &str) {
        self.send(
            body,
            &MessageOptions {
                level: level.to_string(),
                ..MessageOptions::default()
            },
        );
    }

    fn send(&self, body: impl Into<String>, message: &MessageOptions) {
        self.transport.add(self.options.record(body, message));
    }

    /// Flush what is buffered and wait for every pending send.
    pub async fn close(self) {
        self.transport.close().await;
    }
}
