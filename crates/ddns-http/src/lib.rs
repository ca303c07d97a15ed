// # Resilient HTTP Transport
//
// This crate provides the production `HttpTransport` for the DDNS system.
//
// ## Behavior
//
// - ✅ Bounded attempts per request (`TransportConfig::retries`, default 3)
// - ✅ Per-attempt timeout (default 10 seconds)
// - ✅ Linear backoff between attempts: `retry_delay * attempt`
// - ✅ One pooled `reqwest::Client`, created on first use, dropped by `close()`
// - ✅ JSON body parsed only for `application/json` responses
// - ❌ NO retry on HTTP status codes: 4xx/5xx are completed exchanges and are
//   handed back to the caller
//
// ## Security
//
// Query strings routinely carry tokens (DuckDNS) and reqwest errors embed the
// request URL. Logs and `Error::Connection` only ever carry the URL without
// its query, and reqwest errors are stripped of their URL before being kept.

use async_trait::async_trait;
use ddns_core::config::TransportConfig;
use ddns_core::traits::{HttpRequest, HttpResponse, HttpTransport, Method};
use ddns_core::{Error, Result};
use reqwest::header::CONTENT_TYPE;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// User-Agent sent with every request
pub const USER_AGENT: &str = concat!("ddns/", env!("CARGO_PKG_VERSION"));

/// reqwest-backed transport with retry and backoff
pub struct ReqwestTransport {
    config: TransportConfig,

    /// Pooled client, `None` until first use and after `close()`
    client: Mutex<Option<reqwest::Client>>,
}

impl ReqwestTransport {
    /// Create a transport
    ///
    /// # Errors
    ///
    /// `Error::Configuration` if `config` does not validate.
    pub fn new(config: TransportConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            client: Mutex::new(None),
        })
    }

    /// Transport settings
    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    /// Check if a pooled client currently exists
    pub async fn is_open(&self) -> bool {
        self.client.lock().await.is_some()
    }

    async fn client(&self) -> Result<reqwest::Client> {
        let mut client = self.client.lock().await;
        if let Some(existing) = client.as_ref() {
            return Ok(existing.clone());
        }

        let created = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;
        debug!("HTTP client created");

        *client = Some(created.clone());
        Ok(created)
    }

    /// Linear backoff before the attempt following `attempt`
    fn backoff_delay(&self, attempt: u32) -> Duration {
        self.config
            .retry_delay()
            .checked_mul(attempt)
            .unwrap_or(Duration::MAX)
    }

    /// One attempt, bounded by the per-attempt timeout
    async fn attempt(
        &self,
        client: &reqwest::Client,
        request: &HttpRequest,
    ) -> std::result::Result<HttpResponse, String> {
        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Patch => reqwest::Method::PATCH,
        };

        let mut builder = client.request(method, &request.url);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.json {
            builder = builder.json(body);
        }

        let exchange = async {
            let response = builder.send().await?;
            let status = response.status().as_u16();
            let is_json = response
                .headers()
                .get(CONTENT_TYPE)
                .and_then(|value| value.to_str().ok())
                .is_some_and(|value| value.contains("application/json"));
            let text = response.text().await?;
            Ok::<_, reqwest::Error>((status, is_json, text))
        };

        match tokio::time::timeout(self.config.timeout(), exchange).await {
            Err(_) => Err(format!("Timed out after {}s", self.config.timeout_secs)),
            Ok(Err(e)) => Err(e.without_url().to_string()),
            Ok(Ok((status, is_json, text))) => {
                let json = if is_json {
                    serde_json::from_str(&text).ok()
                } else {
                    None
                };
                Ok(HttpResponse { status, text, json })
            }
        }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn request(&self, request: HttpRequest) -> Result<HttpResponse> {
        let client = self.client().await?;
        let attempts = self.config.retries.max(1);
        let mut last_error = String::new();

        for attempt in 1..=attempts {
            match self.attempt(&client, &request).await {
                Ok(response) => {
                    debug!("{} {} -> {}", request.method, request.url, response.status);
                    return Ok(response);
                }
                Err(e) => {
                    warn!(
                        "{} {} failed (attempt {}/{}): {}",
                        request.method, request.url, attempt, attempts, e
                    );
                    last_error = e;

                    if attempt < attempts {
                        tokio::time::sleep(self.backoff_delay(attempt)).await;
                    }
                }
            }
        }

        Err(Error::connection(request.url, last_error))
    }

    async fn close(&self) {
        if self.client.lock().await.take().is_some() {
            debug!("HTTP client closed");
        }
    }
}

impl std::fmt::Debug for ReqwestTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReqwestTransport")
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio_test::{assert_err, assert_ok};

    fn fast_config(retries: u32) -> TransportConfig {
        TransportConfig {
            retries,
            timeout_secs: 1,
            retry_delay_secs: 0.0,
        }
    }

    /// Serve `response` to every connection, counting connections
    async fn serve(response: &'static str) -> (String, Arc<AtomicUsize>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);

        tokio::spawn(async move {
            while let Ok((mut stream, _)) = listener.accept().await {
                counter.fetch_add(1, Ordering::SeqCst);
                let mut buf = [0u8; 4096];
                let _ = stream.read(&mut buf).await;
                let _ = stream.write_all(response.as_bytes()).await;
                let _ = stream.shutdown().await;
            }
        });

        (format!("http://{}", addr), hits)
    }

    #[tokio::test]
    async fn test_http_error_status_is_not_retried() {
        let (base, hits) = serve(
            "HTTP/1.1 500 Internal Server Error\r\nContent-Type: text/plain\r\nContent-Length: 4\r\nConnection: close\r\n\r\noops",
        )
        .await;
        let transport = ReqwestTransport::new(fast_config(3)).unwrap();

        let response = transport.get(&format!("{}/update", base)).await.unwrap();

        assert_eq!(response.status, 500);
        assert_eq!(response.text, "oops");
        assert!(response.json.is_none());
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_json_parsed_for_json_content_type() {
        let (base, _) = serve(
            "HTTP/1.1 200 OK\r\nContent-Type: application/json; charset=utf-8\r\nContent-Length: 17\r\nConnection: close\r\n\r\n{\"data\":{\"id\":1}}",
        )
        .await;
        let transport = ReqwestTransport::new(fast_config(1)).unwrap();

        let response = transport.get(&base).await.unwrap();

        assert_eq!(response.status, 200);
        assert_eq!(response.json, Some(serde_json::json!({"data": {"id": 1}})));
    }

    #[tokio::test]
    async fn test_json_not_parsed_for_plain_text() {
        let (base, _) = serve(
            "HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nContent-Length: 2\r\nConnection: close\r\n\r\n{}",
        )
        .await;
        let transport = ReqwestTransport::new(fast_config(1)).unwrap();

        let response = transport.get(&base).await.unwrap();

        assert_eq!(response.text, "{}");
        assert!(response.json.is_none());
    }

    #[tokio::test]
    async fn test_malformed_json_leaves_body_absent() {
        let (base, _) = serve(
            "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: 8\r\nConnection: close\r\n\r\nnot json",
        )
        .await;
        let transport = ReqwestTransport::new(fast_config(1)).unwrap();

        let response = transport.get(&base).await.unwrap();

        assert_eq!(response.text, "not json");
        assert!(response.json.is_none());
    }

    #[tokio::test]
    async fn test_unreachable_host_exhausts_attempts() {
        // Bind then drop to get a port nobody listens on
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let transport = ReqwestTransport::new(fast_config(2)).unwrap();
        let request = HttpRequest::get(format!("http://{}/update", addr)).query("token", "secret-token");

        let err = transport.request(request).await.unwrap_err();

        match &err {
            Error::Connection { url, .. } => assert_eq!(url, &format!("http://{}/update", addr)),
            other => panic!("expected connection error, got {:?}", other),
        }
        assert!(err.is_retryable());
        assert!(!err.to_string().contains("secret-token"));
    }

    #[tokio::test]
    async fn test_unresponsive_server_times_out_each_attempt() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);

        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((stream, _)) = listener.accept().await {
                counter.fetch_add(1, Ordering::SeqCst);
                held.push(stream);
            }
        });

        let transport = ReqwestTransport::new(fast_config(2)).unwrap();
        let err = assert_err!(transport.get(&format!("http://{}", addr)).await);

        assert!(err.to_string().contains("Timed out after 1s"));
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_close_releases_and_reopens_client() {
        let (base, hits) = serve(
            "HTTP/1.1 200 OK\r\nContent-Length: 7\r\nConnection: close\r\n\r\n1.2.3.4",
        )
        .await;
        let transport = ReqwestTransport::new(fast_config(1)).unwrap();
        assert!(!transport.is_open().await);

        assert_ok!(transport.get(&base).await);
        assert!(transport.is_open().await);

        transport.close().await;
        assert!(!transport.is_open().await);

        let response = assert_ok!(transport.get(&base).await);
        assert_eq!(response.text, "1.2.3.4");
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_backoff_is_linear() {
        let transport = ReqwestTransport::new(TransportConfig {
            retries: 3,
            timeout_secs: 1,
            retry_delay_secs: 1.5,
        })
        .unwrap();

        assert_eq!(transport.backoff_delay(1), Duration::from_millis(1500));
        assert_eq!(transport.backoff_delay(2), Duration::from_millis(3000));
    }

    #[test]
    fn test_backoff_at_ceiling_does_not_overflow() {
        let transport = ReqwestTransport::new(TransportConfig {
            retries: u32::MAX,
            timeout_secs: 1,
            retry_delay_secs: ddns_core::config::MAX_RETRY_DELAY_SECS,
        })
        .unwrap();

        assert_eq!(
            transport.backoff_delay(u32::MAX),
            Duration::from_secs(300) * u32::MAX
        );
    }

    #[test]
    fn test_out_of_range_retry_delay_rejected() {
        let config = TransportConfig {
            retry_delay_secs: 1e20,
            ..TransportConfig::default()
        };
        assert!(matches!(ReqwestTransport::new(config), Err(Error::Configuration(_))));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = TransportConfig {
            retries: 0,
            ..TransportConfig::default()
        };
        assert!(matches!(ReqwestTransport::new(config), Err(Error::Configuration(_))));
    }
}
