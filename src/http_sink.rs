use crate::delivery::{Delivery, DeliveryConfig, DeliveryError, RetryPolicy};
use crate::payload::{encode_batch, Identity};
use crate::record::LogRecord;
use crate::sink::{LogSink, SinkError};
use async_trait::async_trait;
use chrono::Utc;
use std::time::Duration;

/// Configuration for [`HttpSink`].
///
/// Everything here is fixed for the lifetime of the sink: the ingestion
/// key, the endpoint and the identity stamped onto every payload.
#[derive(Clone, Debug)]
pub struct HttpSinkConfig {
    /// Full ingestion URL, e.g. "https://logs.logdna.com/logs/ingest".
    pub ingest_url: String,
    pub api_key: String,
    pub identity: Identity,
    pub user_agent: String,
    pub send_timeout: Duration,
    pub retry: RetryPolicy,
}

/// [`LogSink`] that encodes each batch as one JSON payload and POSTs it.
#[derive(Clone, Debug)]
pub struct HttpSink {
    delivery: Delivery,
    api_key: String,
    identity: Identity,
}

impl HttpSink {
    /// Construct a new sink from the provided configuration.
    ///
    /// **Returns**
    /// - `Err(..)` if the key or user-agent cannot be sent as a header, or
    ///   the HTTP client cannot be built.
    pub fn new(config: HttpSinkConfig) -> Result<Self, DeliveryError> {
        let delivery = Delivery::new(DeliveryConfig {
            ingest_url: config.ingest_url,
            api_key: config.api_key.clone(),
            user_agent: config.user_agent,
            send_timeout: config.send_timeout,
            retry: config.retry,
        })?;

        Ok(Self {
            delivery,
            api_key: config.api_key,
            identity: config.identity,
        })
    }
}

#[async_trait]
impl LogSink for HttpSink {
    async fn send(&self, batch: Vec<LogRecord>) -> Result<(), SinkError> {
        let body = encode_batch(&batch, &self.api_key, &self.identity, Utc::now())?;
        self.delivery.deliver(body).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::EncodeError;
    use crate::record::MetaEncoding;

    fn config(url: String) -> HttpSinkConfig {
        HttpSinkConfig {
            ingest_url: url,
            api_key: "abc123".to_string(),
            identity: Identity {
                hostname: "foo".to_string(),
                ..Identity::default()
            },
            user_agent: "http-sink-test".to_string(),
            send_timeout: Duration::from_secs(5),
            retry: RetryPolicy {
                attempts: 2,
                delay: Duration::from_millis(1),
            },
        }
    }

    #[tokio::test]
    async fn posts_encoded_batch() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/")
            .match_header("apikey", "abc123")
            .match_body(mockito::Matcher::AllOf(vec![
                mockito::Matcher::PartialJsonString(r#"{"apikey":"abc123","hostname":"foo"}"#.to_string()),
                mockito::Matcher::Regex(r#""lines":\[\{"line":"one".*\{"line":"two""#.to_string()),
            ]))
            .with_status(200)
            .create_async()
            .await;

        let sink = HttpSink::new(config(server.url())).unwrap();
        sink.send(vec![LogRecord::new("one"), LogRecord::new("two")])
            .await
            .unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn encode_failure_never_reaches_the_network() {
        let mut server = mockito::Server::new_async().await;
        let mock = server.mock("POST", "/").expect(0).create_async().await;

        let sink = HttpSink::new(config(server.url())).unwrap();
        let err = sink
            .send(vec![LogRecord::new("x").with_meta("{", MetaEncoding::Indexed)])
            .await
            .unwrap_err();

        assert!(matches!(err, SinkError::Encode(EncodeError::InvalidMeta(_))));
        mock.assert_async().await;
    }
}
