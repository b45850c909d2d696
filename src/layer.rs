use crate::options::Options;
use crate::record::{LogRecord, MetaEncoding};
use crate::transport::TransportHandle;
use chrono::Utc;
use serde_json::{Map, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer};
use tracing_subscriber::registry::LookupSpan;

/// Targets whose events are never shipped. Includes this crate and the
/// HTTP stack, so delivery diagnostics can't feed back into the buffer.
const INTERNAL_TARGETS: &[&str] = &[env!("CARGO_CRATE_NAME"), "reqwest", "hyper", "h2", "rustls", "mio"];

/// `tracing_subscriber` layer that turns events into [`LogRecord`]s and
/// appends them to a transport.
///
/// The event's `message` becomes the line body and its level the record
/// level. Any other fields are collected into a JSON object used as the
/// record's meta; events without fields fall back to the logger's meta.
/// Appending never blocks on I/O, so the layer is safe on request paths.
pub struct IngestLayer {
    transport: TransportHandle,
    defaults: Options,
    max_level: Level,
    /// Total events seen by the layer (before filtering by level).
    pub total_events: Arc<AtomicU64>,
    /// Events turned into records.
    pub shipped_events: Arc<AtomicU64>,
}

impl IngestLayer {
    pub fn new(transport: TransportHandle, defaults: Options, max_level: Level) -> Self {
        Self {
            transport,
            defaults,
            max_level,
            total_events: Arc::new(AtomicU64::new(0)),
            shipped_events: Arc::new(AtomicU64::new(0)),
        }
    }

    fn record_for(&self, event: &Event<'_>) -> LogRecord {
        let mut fields = Map::new();
        let mut message: Option<String> = None;
        event.record(&mut FieldVisitor {
            fields: &mut fields,
            message: &mut message,
        });

        let meta = if fields.is_empty() {
            Some(self.defaults.meta.clone()).filter(|m| !m.is_empty())
        } else {
            Some(Value::Object(fields).to_string())
        };

        LogRecord {
            body: message.unwrap_or_default(),
            app: self.defaults.app.clone(),
            env: self.defaults.env.clone(),
            level: event.metadata().level().as_str().to_ascii_lowercase(),
            meta,
            meta_encoding: MetaEncoding::from_indexed(self.defaults.index_meta),
            timestamp: Some(Utc::now()),
        }
    }
}

fn is_internal(target: &str) -> bool {
    INTERNAL_TARGETS.iter().any(|prefix| {
        target == *prefix
            || target
                .strip_prefix(prefix)
                .is_some_and(|rest| rest.starts_with("::"))
    })
}

impl<S> Layer<S> for IngestLayer
where
    S: Subscriber + for<'span> LookupSpan<'span>,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        self.total_events.fetch_add(1, Ordering::Relaxed);
        let meta = event.metadata();
        if *meta.level() > self.max_level || is_internal(meta.target()) {
            return;
        }

        self.transport.add(self.record_for(event));
        self.shipped_events.fetch_add(1, Ordering::Relaxed);
    }
}

pub struct FieldVisitor<'a> {
    pub fields: &'a mut Map<String, Value>,
    pub message: &'a mut Option<String>,
}

impl<'a> Visit for FieldVisitor<'a> {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            *self.message = Some(value.to_string());
        } else {
            self.fields.insert(field.name().to_string(), Value::String(value.to_string()));
        }
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.fields.insert(field.name().to_string(), Value::from(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.fields.insert(field.name().to_string(), Value::from(value));
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.fields.insert(field.name().to_string(), Value::from(value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.fields.insert(field.name().to_string(), Value::from(value));
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            *self.message = Some(format!("{:?}", value));
        } else {
            self.fields.insert(field.name().to_string(), Value::String(format!("{:?}", value)));
        }
    }
}
