//! Wire format for the ingestion endpoint.
//!
//! A batch of [`LogRecord`]s plus the client identity becomes one JSON body:
//!
//! ```json
//! {
//!   "apikey": "...", "hostname": "...", "ip": "...", "mac": "...", "tags": "...",
//!   "lines": [{ "line": "...", "timestamp": 1700000000000, "app": "...", "level": "...", "env": "...", "meta": ... }]
//! }
//! ```
//!
//! Empty identity and classification fields are left out entirely. `meta` is
//! either embedded verbatim (indexed) or as a JSON string (quoted); the
//! receiving service depends on that distinction.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::value::RawValue;

use crate::record::{LogRecord, MetaEncoding};

/// Host identity attached to every payload sent by one transport.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Identity {
    pub hostname: String,
    pub ip_address: String,
    pub mac_address: String,
    pub tags: String,
}

#[derive(Debug, Serialize)]
pub struct Payload<'a> {
    pub apikey: &'a str,
    #[serde(skip_serializing_if = "str::is_empty")]
    pub hostname: &'a str,
    #[serde(skip_serializing_if = "str::is_empty")]
    pub ip: &'a str,
    #[serde(skip_serializing_if = "str::is_empty")]
    pub mac: &'a str,
    #[serde(skip_serializing_if = "str::is_empty")]
    pub tags: &'a str,
    pub lines: Vec<Line<'a>>,
}

#[derive(Debug, Serialize)]
pub struct Line<'a> {
    pub line: &'a str,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
    #[serde(skip_serializing_if = "str::is_empty")]
    pub app: &'a str,
    #[serde(skip_serializing_if = "str::is_empty")]
    pub level: &'a str,
    #[serde(skip_serializing_if = "str::is_empty")]
    pub env: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<LineMeta>,
}

/// Resolved form of a record's meta text.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum LineMeta {
    Raw(Box<RawValue>),
    Quoted(String),
}

impl LineMeta {
    fn resolve(text: &str, encoding: MetaEncoding) -> Result<Self, EncodeError> {
        match encoding {
            MetaEncoding::Indexed => RawValue::from_string(text.to_string())
                .map(LineMeta::Raw)
                .map_err(EncodeError::InvalidMeta),
            MetaEncoding::Quoted => Ok(LineMeta::Quoted(text.to_string())),
        }
    }
}

/// Error returned when a batch cannot be turned into a request body.
#[derive(thiserror::Error, Debug)]
pub enum EncodeError {
    #[error("indexed meta is not valid JSON: {0}")]
    InvalidMeta(#[source] serde_json::Error),

    #[error("failed to serialize payload: {0}")]
    Serialize(#[source] serde_json::Error),
}

/// Build the JSON body for `batch`, preserving record order.
///
/// Records without a timestamp are stamped with `now`.
pub fn encode_batch(
    batch: &[LogRecord],
    apikey: &str,
    identity: &Identity,
    now: DateTime<Utc>,
) -> Result<Vec<u8>, EncodeError> {
    let lines = batch
        .iter()
        .map(|record| -> Result<Line, EncodeError> {
            let meta = record
                .meta_text()
                .map(|text| LineMeta::resolve(text, record.meta_encoding))
                .transpose()?;

            Ok(Line {
                line: &record.body,
                timestamp: record.timestamp.unwrap_or(now).timestamp_millis(),
                app: &record.app,
                level: &record.level,
                env: &record.env,
                meta,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let payload = Payload {
        apikey,
        hostname: &identity.hostname,
        ip: &identity.ip_address,
        mac: &identity.mac_address,
        tags: &identity.tags,
        lines,
    };

    serde_json::to_vec(&payload).map_err(EncodeError::Serialize)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::{json, Value};

    fn now() -> DateTime<Utc> {
        Utc.timestamp_millis_opt(1_700_000_000_123).unwrap()
    }

    fn decode(bytes: &[u8]) -> Value {
        serde_json::from_slice(bytes).unwrap()
    }

    #[test]
    fn identity_fields_are_omitted_when_empty() {
        let batch = vec![LogRecord::new("hello")];
        let body = decode(&encode_batch(&batch, "abc123", &Identity::default(), now()).unwrap());

        assert_eq!(
            body,
            json!({
                "apikey": "abc123",
                "lines": [{ "line": "hello", "timestamp": 1_700_000_000_123_i64 }]
            })
        );
    }

    #[test]
    fn identity_and_line_fields_are_populated() {
        let identity = Identity {
            hostname: "foo".into(),
            ip_address: "127.0.0.1".into(),
            mac_address: "C0:FF:EE:C0:FF:EE".into(),
            tags: "a,b".into(),
        };
        let stamped = Utc.timestamp_millis_opt(42).unwrap();
        let batch = vec![LogRecord::new("testing")
            .with_app("test")
            .with_env("production")
            .with_level("info")
            .with_timestamp(stamped)];

        let body = decode(&encode_batch(&batch, "abc123", &identity, now()).unwrap());

        assert_eq!(body["hostname"], "foo");
        assert_eq!(body["ip"], "127.0.0.1");
        assert_eq!(body["mac"], "C0:FF:EE:C0:FF:EE");
        assert_eq!(body["tags"], "a,b");
        assert_eq!(
            body["lines"][0],
            json!({ "line": "testing", "timestamp": 42, "app": "test", "level": "info", "env": "production" })
        );
    }

    #[test]
    fn lines_keep_batch_order() {
        let batch: Vec<_> = (1..=5).map(|i| LogRecord::new(format!("message {i}"))).collect();
        let body = decode(&encode_batch(&batch, "k", &Identity::default(), now()).unwrap());

        let lines: Vec<&str> = body["lines"]
            .as_array()
            .unwrap()
            .iter()
            .map(|l| l["line"].as_str().unwrap())
            .collect();
        assert_eq!(lines, ["message 1", "message 2", "message 3", "message 4", "message 5"]);
    }

    #[test]
    fn quoted_meta_is_a_json_string() {
        let meta = r#"{"key": "value", "key2": "value2"}"#;
        let batch = vec![LogRecord::new("testing").with_meta(meta, MetaEncoding::Quoted)];
        let body = decode(&encode_batch(&batch, "k", &Identity::default(), now()).unwrap());

        assert_eq!(body["lines"][0]["meta"], Value::String(meta.to_string()));
    }

    #[test]
    fn indexed_meta_is_embedded_raw() {
        let meta = r#"{"key": "value", "key2": "value2"}"#;
        let batch = vec![LogRecord::new("testing").with_meta(meta, MetaEncoding::Indexed)];
        let bytes = encode_batch(&batch, "k", &Identity::default(), now()).unwrap();

        // Raw text is passed through untouched, whitespace included.
        assert!(String::from_utf8_lossy(&bytes).contains(meta));
        let body = decode(&bytes);
        assert_eq!(body["lines"][0]["meta"], json!({ "key": "value", "key2": "value2" }));
    }

    #[test]
    fn empty_meta_is_omitted() {
        let batch = vec![LogRecord::new("testing").with_meta("", MetaEncoding::Indexed)];
        let body = decode(&encode_batch(&batch, "k", &Identity::default(), now()).unwrap());

        assert!(body["lines"][0].get("meta").is_none());
    }

    #[test]
    fn invalid_indexed_meta_fails_the_batch() {
        let batch = vec![
            LogRecord::new("fine"),
            LogRecord::new("broken").with_meta("{not json", MetaEncoding::Indexed),
        ];
        let err = encode_batch(&batch, "k", &Identity::default(), now()).unwrap_err();

        assert!(matches!(err, EncodeError::InvalidMeta(_)));
    }
}
