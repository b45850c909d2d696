use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE, USER_AGENT};
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

/// Header carrying the ingestion key on every request.
pub const API_KEY_HEADER: &str = "apikey";

/// Bounded retry applied to a single batch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first one.
    pub attempts: u32,
    /// Pause between attempts.
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 2,
            delay: Duration::from_millis(100),
        }
    }
}

/// Endpoint settings for [`Delivery`].
#[derive(Clone, Debug)]
pub struct DeliveryConfig {
    pub ingest_url: String,
    pub api_key: String,
    pub user_agent: String,
    /// Applied to the whole request/response cycle of each attempt.
    pub send_timeout: Duration,
    pub retry: RetryPolicy,
}

#[derive(thiserror::Error, Debug)]
pub enum DeliveryError {
    #[error("failed to build HTTP client: {0}")]
    Build(#[source] reqwest::Error),

    #[error("invalid value for header {0}")]
    InvalidHeader(&'static str),

    #[error("request failed: {0}")]
    Request(#[source] reqwest::Error),

    #[error("server error: {0}")]
    Server(StatusCode),

    #[error("rejected by endpoint: {0}")]
    Client(StatusCode),
}

impl DeliveryError {
    /// Whether another attempt of the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, DeliveryError::Request(_) | DeliveryError::Server(_))
    }
}

/// POSTs serialized payloads to the ingestion endpoint.
#[derive(Clone, Debug)]
pub struct Delivery {
    client: Client,
    ingest_url: String,
    retry: RetryPolicy,
}

impl Delivery {
    pub fn new(config: DeliveryConfig) -> Result<Self, DeliveryError> {
        let headers = default_headers(&config.api_key, &config.user_agent)?;
        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.send_timeout)
            .build()
            .map_err(DeliveryError::Build)?;

        Ok(Self {
            client,
            ingest_url: config.ingest_url,
            retry: config.retry,
        })
    }

    /// Send `body`, retrying transport failures and 5xx responses until the
    /// attempt budget runs out. Returns the last error on failure.
    pub async fn deliver(&self, body: Vec<u8>) -> Result<(), DeliveryError> {
        let attempts = self.retry.attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            let err = match self.attempt(body.clone()).await {
                Ok(status) => {
                    debug!(%status, attempt, "log batch delivered");
                    return Ok(());
                }
                Err(err) => err,
            };

            if !err.is_retryable() || attempt >= attempts {
                return Err(err);
            }

            warn!(attempt, error = %err, "log batch delivery failed, retrying in {:?}", self.retry.delay);
            sleep(self.retry.delay).await;
        }
    }

    async fn attempt(&self, body: Vec<u8>) -> Result<StatusCode, DeliveryError> {
        let resp = self
            .client
            .post(&self.ingest_url)
            .body(body)
            .send()
            .await
            .map_err(DeliveryError::Request)?;

        let status = resp.status();
        if status.is_server_error() {
            Err(DeliveryError::Server(status))
        } else if status.is_client_error() {
            Err(DeliveryError::Client(status))
        } else {
            Ok(status)
        }
    }
}

fn default_headers(api_key: &str, user_agent: &str) -> Result<HeaderMap, DeliveryError> {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(
        API_KEY_HEADER,
        HeaderValue::from_str(api_key).map_err(|_| DeliveryError::InvalidHeader(API_KEY_HEADER))?,
    );
    headers.insert(
        USER_AGENT,
        HeaderValue::from_str(user_agent).map_err(|_| DeliveryError::InvalidHeader("user-agent"))?,
    );
    Ok(headers)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(url: String) -> DeliveryConfig {
        DeliveryConfig {
            ingest_url: url,
            api_key: "abc123".to_string(),
            user_agent: "delivery-test".to_string(),
            send_timeout: Duration::from_secs(5),
            retry: RetryPolicy {
                attempts: 2,
                delay: Duration::from_millis(1),
            },
        }
    }

    #[test]
    fn default_retry_policy_makes_two_attempts() {
        assert_eq!(RetryPolicy::default().attempts, 2);
    }

    #[test]
    fn rejects_key_that_is_not_a_header_value() {
        let mut cfg = config("http://127.0.0.1:1".to_string());
        cfg.api_key = "bad\nkey".to_string();

        let err = Delivery::new(cfg).unwrap_err();
        assert!(matches!(err, DeliveryError::InvalidHeader(API_KEY_HEADER)));
    }

    #[test]
    fn only_transport_and_server_errors_are_retryable() {
        assert!(DeliveryError::Server(StatusCode::INTERNAL_SERVER_ERROR).is_retryable());
        assert!(DeliveryError::Server(StatusCode::BAD_GATEWAY).is_retryable());
        assert!(!DeliveryError::Client(StatusCode::BAD_REQUEST).is_retryable());
        assert!(!DeliveryError::InvalidHeader(API_KEY_HEADER).is_retryable());
    }

    #[tokio::test]
    async fn sends_headers_and_body() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/logs/ingest")
            .match_header("content-type", "application/json")
            .match_header("apikey", "abc123")
            .match_header("user-agent", "delivery-test")
            .match_body(r#"{"apikey":"abc123","lines":[]}"#)
            .with_status(200)
            .with_body(r#"{"status":"ok"}"#)
            .expect(1)
            .create_async()
            .await;

        let delivery = Delivery::new(config(format!("{}/logs/ingest", server.url()))).unwrap();
        delivery
            .deliver(br#"{"apikey":"abc123","lines":[]}"#.to_vec())
            .await
            .unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn client_error_is_not_retried() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/")
            .with_status(400)
            .expect(1)
            .create_async()
            .await;

        let delivery = Delivery::new(config(server.url())).unwrap();
        let err = delivery.deliver(b"{}".to_vec()).await.unwrap_err();

        assert!(matches!(err, DeliveryError::Client(StatusCode::BAD_REQUEST)));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn server_error_exhausts_attempts() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/")
            .with_status(503)
            .expect(2)
            .create_async()
            .await;

        let delivery = Delivery::new(config(server.url())).unwrap();
        let err = delivery.deliver(b"{}".to_vec()).await.unwrap_err();

        assert!(matches!(err, DeliveryError::Server(StatusCode::SERVICE_UNAVAILABLE)));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn server_error_then_success_is_delivered() {
        let mut server = mockito::Server::new_async().await;
        let failing = server
            .mock("POST", "/")
            .with_status(500)
            .expect(1)
            .create_async()
            .await;
        let ok = server
            .mock("POST", "/")
            .with_status(200)
            .expect(1)
            .create_async()
            .await;

        let delivery = Delivery::new(config(server.url())).unwrap();
        delivery.deliver(b"{}".to_vec()).await.unwrap();

        failing.assert_async().await;
        ok.assert_async().await;
    }

    #[tokio::test]
    async fn unresponsive_endpoint_times_out_on_every_attempt() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::Arc;
        use tokio::net::TcpListener;

        // Accepts connections and never answers.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let accepted = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&accepted);
        let server = tokio::spawn(async move {
            let mut open = Vec::new();
            while let Ok((stream, _)) = listener.accept().await {
                counter.fetch_add(1, Ordering::SeqCst);
                open.push(stream);
            }
        });

        let mut cfg = config(format!("http://{addr}/"));
        cfg.send_timeout = Duration::from_millis(100);
        let delivery = Delivery::new(cfg).unwrap();

        let started = std::time::Instant::now();
        let err = delivery.deliver(b"{}".to_vec()).await.unwrap_err();

        assert!(matches!(&err, DeliveryError::Request(e) if e.is_timeout()), "{err:?}");
        assert_eq!(accepted.load(Ordering::SeqCst), 2);
        assert!(started.elapsed() < Duration::from_secs(2));
        server.abort();
    }

    #[tokio::test]
    async fn connection_failure_is_reported_after_retries() {
        // Nothing listens on port 1.
        let delivery = Delivery::new(config("http://127.0.0.1:1/".to_string())).unwrap();
        let err = delivery.deliver(b"{}".to_vec()).await.unwrap_err();

        assert!(matches!(err, DeliveryError::Request(_)));
    }
}
