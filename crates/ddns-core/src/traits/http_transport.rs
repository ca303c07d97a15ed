// # HTTP Transport Trait
//
// Defines the interface every network-backed component (echo strategy,
// providers) uses to talk HTTP.
//
// ## Implementations
//
// - reqwest-based, with retry/backoff: `ddns-http` crate
// - Canned responses for tests: [`crate::transport::MockTransport`]
//
// ## Usage
//
// ```rust,ignore
// use ddns_core::traits::{HttpRequest, HttpTransport};
//
// let response = transport
//     .request(HttpRequest::get("https://dynupdate.no-ip.com/nic/update")
//         .query("hostname", "test.ddns.net")
//         .query("myip", "1.2.3.4"))
//     .await?;
//
// if response.status == 200 && response.text.starts_with("good") {
//     // ...
// }
// ```

use async_trait::async_trait;
use std::fmt;

/// HTTP methods used by the providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// GET
    Get,
    /// POST
    Post,
    /// PATCH
    Patch,
}

impl Method {
    /// Upper-case method name as sent on the wire
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Patch => "PATCH",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An outgoing HTTP request
///
/// Query parameters are kept apart from `url` so that the URL can be logged
/// and reported in errors without leaking credentials carried in the query.
#[derive(Clone, PartialEq)]
pub struct HttpRequest {
    /// Request method
    pub method: Method,
    /// Base URL, without query string
    pub url: String,
    /// Query parameters, in order
    pub query: Vec<(String, String)>,
    /// Extra headers for this request only
    pub headers: Vec<(String, String)>,
    /// JSON body
    pub json: Option<serde_json::Value>,
}

impl HttpRequest {
    /// Create a request with no query, headers or body
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            query: Vec::new(),
            headers: Vec::new(),
            json: None,
        }
    }

    /// Create a GET request
    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::Get, url)
    }

    /// Create a POST request
    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::Post, url)
    }

    /// Create a PATCH request
    pub fn patch(url: impl Into<String>) -> Self {
        Self::new(Method::Patch, url)
    }

    /// Append a query parameter
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Add a header
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Attach a JSON body
    pub fn json(mut self, body: serde_json::Value) -> Self {
        self.json = Some(body);
        self
    }

    /// URL with the percent-encoded query string appended
    pub fn full_url(&self) -> String {
        if self.query.is_empty() {
            return self.url.clone();
        }

        let query = self
            .query
            .iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&");

        let separator = if self.url.contains('?') { '&' } else { '?' };
        format!("{}{}{}", self.url, separator, query)
    }
}

// Query values and headers routinely carry tokens and passwords
impl fmt::Debug for HttpRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let query_keys: Vec<&str> = self.query.iter().map(|(k, _)| k.as_str()).collect();
        let header_names: Vec<&str> = self.headers.iter().map(|(k, _)| k.as_str()).collect();
        f.debug_struct("HttpRequest")
            .field("method", &self.method)
            .field("url", &self.url)
            .field("query", &query_keys)
            .field("headers", &header_names)
            .field("json", &self.json.is_some())
            .finish()
    }
}

/// Uniform result of a completed HTTP exchange
///
/// Any status code, including 4xx/5xx, is a completed exchange; callers
/// interpret the status themselves.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    /// HTTP status code
    pub status: u16,
    /// Response body as text
    pub text: String,
    /// Parsed body, present only when the response declared a JSON content type
    pub json: Option<serde_json::Value>,
}

impl HttpResponse {
    /// Create a plain-text response
    pub fn new(status: u16, text: impl Into<String>) -> Self {
        Self {
            status,
            text: text.into(),
            json: None,
        }
    }

    /// Create a response carrying a structured body
    pub fn with_json(status: u16, json: serde_json::Value) -> Self {
        Self {
            status,
            text: json.to_string(),
            json: Some(json),
        }
    }
}

/// Trait for HTTP transport implementations
///
/// # Failure Contract
///
/// - `Ok(HttpResponse)` for every completed exchange, whatever the status
/// - `Err(Error::Connection)` only once the implementation has given up on
///   reaching the server (timeouts, refused connections, TLS failures...)
///
/// Retry and backoff belong to the implementation. Callers never retry.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Perform a request
    async fn request(&self, request: HttpRequest) -> Result<HttpResponse, crate::Error>;

    /// Release pooled connections
    ///
    /// The transport stays usable: the next request opens a fresh pool.
    async fn close(&self) {}

    /// Perform a bare GET request
    async fn get(&self, url: &str) -> Result<HttpResponse, crate::Error> {
        self.request(HttpRequest::get(url)).await
    }
}
