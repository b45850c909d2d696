use chrono::{DateTime, Utc};

/// How a record's `meta` text is embedded in the outgoing line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MetaEncoding {
    /// Embedded as a raw JSON value; the text must itself be valid JSON.
    Indexed,
    /// Embedded as a JSON string holding the text.
    #[default]
    Quoted,
}

impl MetaEncoding {
    pub fn from_indexed(indexed: bool) -> Self {
        if indexed {
            MetaEncoding::Indexed
        } else {
            MetaEncoding::Quoted
        }
    }
}

/// One log line plus its already-resolved attributes.
///
/// Records are built by the [`Logger`](crate::logger::Logger) or the tracing
/// layer and handed to the transport, which consumes each one exactly once.
#[derive(Debug, Clone, PartialEq)]
pub struct LogRecord {
    pub body: String,
    pub app: String,
    pub env: String,
    pub level: String,
    pub meta: Option<String>,
    pub meta_encoding: MetaEncoding,
    /// When `None` the encoder stamps the record with the send time.
    pub timestamp: Option<DateTime<Utc>>,
}

impl LogRecord {
    pub fn new(body: impl Into<String>) -> Self {
        LogRecord {
            body: body.into(),
            app: String::new(),
            env: String::new(),
            level: String::new(),
            meta: None,
            meta_encoding: MetaEncoding::default(),
            timestamp: None,
        }
    }

    pub fn with_app(mut self, app: impl Into<String>) -> Self {
        self.app = app.into();
        self
    }

    pub fn with_env(mut self, env: impl Into<String>) -> Self {
        self.env = env.into();
        self
    }

    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = level.into();
        self
    }

    pub fn with_meta(mut self, meta: impl Into<String>, encoding: MetaEncoding) -> Self {
        self.meta = Some(meta.into());
        self.meta_encoding = encoding;
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Meta text if present and non-empty.
    pub fn meta_text(&self) -> Option<&str> {
        self.meta.as_deref().filter(|m| !m.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_meta_counts_as_absent() {
        let record = LogRecord::new("hello").with_meta("", MetaEncoding::Indexed);
        assert_eq!(record.meta_text(), None);

        let record = LogRecord::new("hello").with_meta("{}", MetaEncoding::Indexed);
        assert_eq!(record.meta_text(), Some("{}"));
    }

    #[test]
    fn meta_encoding_from_flag() {
        assert_eq!(MetaEncoding::from_indexed(true), MetaEncoding::Indexed);
        assert_eq!(MetaEncoding::from_indexed(false), MetaEncoding::Quoted);
    }
}
