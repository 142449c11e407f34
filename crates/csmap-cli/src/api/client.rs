//! HTTP client for the Cloud Secure activity API
//!
//! One call fetches one page. Transport failures (connection refused, reset,
//! timeout) are retried with exponential backoff; HTTP status failures are not.

use crate::api::endpoints::{self, API_KEY_HEADER};
use crate::api::types::{ActivityPage, PageRequest};
use crate::engine::PageFetcher;
use crate::error::{CliError, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

// ============================================================================
// API Client Constants
// ============================================================================

/// Default timeout for a single request in seconds.
/// Can be overridden via CS_API_TIMEOUT_SECS environment variable.
pub const DEFAULT_API_TIMEOUT_SECS: u64 = 60;

/// Attempts per page before a transport failure fails the page.
pub const MAX_ATTEMPTS: u32 = 3;

/// Delay before the first retry; doubled for each further retry.
pub const DEFAULT_RETRY_BASE_DELAY_MS: u64 = 500;

/// Retry budget for transport failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: MAX_ATTEMPTS,
            base_delay: Duration::from_millis(DEFAULT_RETRY_BASE_DELAY_MS),
        }
    }
}

impl RetryPolicy {
    /// Sleep before retrying after the failed `attempt` (1-based)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base_delay.saturating_mul(factor)
    }
}

enum Reply {
    Body(Vec<u8>),
    Status(StatusCode),
}

/// API client bound to one instance endpoint and API key
pub struct ApiClient {
    client: Client,
    base_url: String,
    api_key: String,
    retry: RetryPolicy,
}

impl ApiClient {
    /// Create a new API client
    pub fn new(endpoint: &str, api_key: impl Into<String>) -> Result<Self> {
        let timeout_secs = std::env::var("CS_API_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_API_TIMEOUT_SECS);

        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(concat!("cs-client-map/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url: endpoints::base_url(endpoint),
            api_key: api_key.into(),
            retry: RetryPolicy::default(),
        })
    }

    /// Replace the default retry policy
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetch one page of activities.
    ///
    /// Returns [`CliError::Unauthorized`] on 401 without retrying, and
    /// [`CliError::Cancelled`] as soon as `cancel` fires.
    #[instrument(skip(self, cancel), fields(offset = request.offset))]
    pub async fn fetch_page(
        &self,
        request: &PageRequest,
        cancel: &CancellationToken,
    ) -> Result<ActivityPage> {
        let url = endpoints::activities_url(&self.base_url, request);
        let offset = request.offset;
        let mut attempt = 0;

        let body = loop {
            attempt += 1;

            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(CliError::Cancelled),
                outcome = self.send_once(&url) => outcome,
            };

            match outcome {
                Ok(Reply::Body(body)) => break body,
                Ok(Reply::Status(StatusCode::UNAUTHORIZED)) => {
                    return Err(CliError::Unauthorized { offset });
                },
                Ok(Reply::Status(status)) => {
                    return Err(CliError::PageStatus {
                        offset,
                        status: status.as_u16(),
                    });
                },
                Err(e) if attempt < self.retry.max_attempts && !e.is_builder() => {
                    let delay = self.retry.delay_for(attempt);
                    warn!(
                        attempt,
                        max_attempts = self.retry.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Request failed, retrying"
                    );

                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => return Err(CliError::Cancelled),
                        _ = tokio::time::sleep(delay) => {},
                    }
                },
                Err(source) => {
                    return Err(CliError::Transport {
                        offset,
                        attempts: attempt,
                        source,
                    });
                },
            }
        };

        let page: ActivityPage =
            serde_json::from_slice(&body).map_err(|source| CliError::Decode { offset, source })?;

        debug!(
            attempt,
            count = page.count,
            records = page.results.len(),
            "Fetched page"
        );

        Ok(page)
    }

    async fn send_once(&self, url: &str) -> std::result::Result<Reply, reqwest::Error> {
        let response = self
            .client
            .get(url)
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Ok(Reply::Status(status));
        }

        Ok(Reply::Body(response.bytes().await?.to_vec()))
    }
}

#[async_trait]
impl PageFetcher for ApiClient {
    async fn fetch(
        &self,
        request: &PageRequest,
        cancel: &CancellationToken,
    ) -> Result<ActivityPage> {
        self.fetch_page(request, cancel).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::{
        matchers::{header, method, path, query_param},
        Mock, MockServer, ResponseTemplate,
    };

    fn no_delay() -> RetryPolicy {
        RetryPolicy {
            max_attempts: MAX_ATTEMPTS,
            base_delay: Duration::ZERO,
        }
    }

    fn request(offset: u64) -> PageRequest {
        PageRequest {
            from: 100,
            to: 200,
            offset,
            limit: 1000,
        }
    }

    #[test]
    fn test_retry_delay_doubles() {
        let policy = RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
        };
        assert_eq!(policy.delay_for(1), Duration::from_millis(500));
        assert_eq!(policy.delay_for(2), Duration::from_millis(1000));
        assert_eq!(policy.delay_for(3), Duration::from_millis(2000));
    }

    #[test]
    fn test_base_url_from_host() {
        let client = ApiClient::new("ps1.cs01.cloudinsights.netapp.com", "key").unwrap();
        assert_eq!(client.base_url(), "https://ps1.cs01.cloudinsights.netapp.com");
    }

    #[tokio::test]
    async fn test_fetch_page_sends_key_and_query() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/rest/v1/cloudsecure/activities"))
            .and(header("X-CloudInsights-ApiKey", "secret"))
            .and(query_param("from", "100"))
            .and(query_param("to", "200"))
            .and(query_param("offset", "1000"))
            .and(query_param("limit", "1000"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "count": 1001,
                "limit": 1000,
                "offset": 1000,
                "results": [{"accessLocation": "nfs1", "entityPath": "/a/b"}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = ApiClient::new(&server.uri(), "secret").unwrap();
        let page = client
            .fetch_page(&request(1000), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(page.count, 1001);
        assert_eq!(page.results.len(), 1);
        assert_eq!(page.results[0].access_location, "nfs1");
    }

    #[tokio::test]
    async fn test_unauthorized_is_not_retried() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&server)
            .await;

        let client = ApiClient::new(&server.uri(), "bad")
            .unwrap()
            .with_retry_policy(no_delay());
        let err = client
            .fetch_page(&request(2000), &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, CliError::Unauthorized { offset: 2000 }));
    }

    #[tokio::test]
    async fn test_server_error_fails_page() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .expect(1)
            .mount(&server)
            .await;

        let client = ApiClient::new(&server.uri(), "key")
            .unwrap()
            .with_retry_policy(no_delay());
        let err = client
            .fetch_page(&request(0), &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            CliError::PageStatus {
                offset: 0,
                status: 503
            }
        ));
    }

    #[tokio::test]
    async fn test_malformed_body_fails_page() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
            .mount(&server)
            .await;

        let client = ApiClient::new(&server.uri(), "key").unwrap();
        let err = client
            .fetch_page(&request(0), &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, CliError::Decode { offset: 0, .. }));
    }

    #[tokio::test]
    async fn test_connection_failure_exhausts_retries() {
        // Reserve a port, then free it so nothing is listening there.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let client = ApiClient::new(&format!("http://127.0.0.1:{}", port), "key")
            .unwrap()
            .with_retry_policy(no_delay());
        let err = client
            .fetch_page(&request(0), &CancellationToken::new())
            .await
            .unwrap_err();

        match err {
            CliError::Transport { attempts, .. } => assert_eq!(attempts, MAX_ATTEMPTS),
            other => panic!("expected transport error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_dropped_connection_is_retried() {
        use std::sync::atomic::{AtomicU32, Ordering};
        use std::sync::Arc;
        use tokio::io::{AsyncReadExt, AsyncWriteExt};
        use tokio::net::TcpListener;

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let accepted = Arc::new(AtomicU32::new(0));

        let counter = Arc::clone(&accepted);
        tokio::spawn(async move {
            loop {
                let (mut socket, _) = listener.accept().await.unwrap();
                // First connection is closed without a response.
                if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                    drop(socket);
                    continue;
                }

                let mut request = Vec::new();
                let mut buf = [0u8; 1024];
                while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                    let n = socket.read(&mut buf).await.unwrap();
                    if n == 0 {
                        break;
                    }
                    request.extend_from_slice(&buf[..n]);
                }

                let body = r#"{"count":1,"results":[{"accessLocation":"nfs1","entityPath":"/a"}]}"#;
                let response = format!(
                    "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    body.len(),
                    body
                );
                socket.write_all(response.as_bytes()).await.unwrap();
                socket.shutdown().await.unwrap();
            }
        });

        let client = ApiClient::new(&format!("http://127.0.0.1:{}", port), "key")
            .unwrap()
            .with_retry_policy(no_delay());
        let page = client
            .fetch_page(&request(0), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(page.count, 1);
        assert_eq!(page.results[0].entity_path, "/a");
        assert_eq!(accepted.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_waits_between_attempts() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let client = ApiClient::new(&format!("http://127.0.0.1:{}", port), "key")
            .unwrap()
            .with_retry_policy(RetryPolicy {
                max_attempts: 3,
                base_delay: Duration::from_millis(500),
            });

        let started = tokio::time::Instant::now();
        let err = client
            .fetch_page(&request(0), &CancellationToken::new())
            .await
            .unwrap_err();

        // 500ms after the first failure, 1000ms after the second
        assert!(started.elapsed() >= Duration::from_millis(1500));
        assert!(matches!(err, CliError::Transport { attempts: 3, .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_interrupts_backoff() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let client = ApiClient::new(&format!("http://127.0.0.1:{}", port), "key")
            .unwrap()
            .with_retry_policy(RetryPolicy {
                max_attempts: 3,
                base_delay: Duration::from_secs(3600),
            });

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(120)).await;
            trigger.cancel();
        });

        let err = client.fetch_page(&request(0), &cancel).await.unwrap_err();
        assert!(err.is_cancellation());
    }

    #[tokio::test]
    async fn test_cancelled_before_request() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"count": 0})))
            .expect(0)
            .mount(&server)
            .await;

        let cancel = CancellationToken::new();
        cancel.cancel();

        let client = ApiClient::new(&server.uri(), "key").unwrap();
        let err = client.fetch_page(&request(0), &cancel).await.unwrap_err();
        assert!(err.is_cancellation());
    }
}
