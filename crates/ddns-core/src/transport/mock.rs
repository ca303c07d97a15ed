// # Mock Transport
//
// Deterministic `HttpTransport` for tests: maps exact URLs (query string
// included) to canned responses and records every request it sees.
//
// An unmapped URL fails with `Error::Connection`, the same failure a real
// transport reports once its retries are exhausted.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::error::{Error, Result};
use crate::traits::{HttpRequest, HttpResponse, HttpTransport, Method};

/// Canned-response transport
///
/// Responses registered for a (method, URL) pair take precedence over
/// responses registered for the URL alone.
#[derive(Debug, Default)]
pub struct MockTransport {
    responses: Mutex<HashMap<String, HttpResponse>>,
    method_responses: Mutex<HashMap<(Method, String), HttpResponse>>,
    requests: Mutex<Vec<HttpRequest>>,
    close_count: AtomicUsize,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MockTransport {
    /// Create a transport with no mapped URLs
    pub fn new() -> Self {
        Self::default()
    }

    /// Map `url` (any method) to a response
    pub fn mock_response(
        &self,
        url: impl Into<String>,
        status: u16,
        text: impl Into<String>,
        json: Option<serde_json::Value>,
    ) {
        let response = HttpResponse {
            status,
            text: text.into(),
            json,
        };
        lock(&self.responses).insert(url.into(), response);
    }

    /// Map `method` + `url` to a response
    pub fn mock_method_response(
        &self,
        method: Method,
        url: impl Into<String>,
        status: u16,
        text: impl Into<String>,
        json: Option<serde_json::Value>,
    ) {
        let response = HttpResponse {
            status,
            text: text.into(),
            json,
        };
        lock(&self.method_responses).insert((method, url.into()), response);
    }

    /// Map `url` to a JSON response
    pub fn mock_json(&self, url: impl Into<String>, status: u16, json: serde_json::Value) {
        lock(&self.responses).insert(url.into(), HttpResponse::with_json(status, json));
    }

    /// Every request seen so far, in order
    pub fn requests(&self) -> Vec<HttpRequest> {
        lock(&self.requests).clone()
    }

    /// Full URLs of every request seen so far, in order
    pub fn requested_urls(&self) -> Vec<String> {
        lock(&self.requests).iter().map(HttpRequest::full_url).collect()
    }

    /// Number of requests whose full URL equals `url`
    pub fn call_count(&self, url: &str) -> usize {
        lock(&self.requests)
            .iter()
            .filter(|request| request.full_url() == url)
            .count()
    }

    /// Number of requests issued with `method`
    pub fn method_count(&self, method: Method) -> usize {
        lock(&self.requests)
            .iter()
            .filter(|request| request.method == method)
            .count()
    }

    /// Number of times `close()` was called
    pub fn close_count(&self) -> usize {
        self.close_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HttpTransport for MockTransport {
    async fn request(&self, request: HttpRequest) -> Result<HttpResponse> {
        let full_url = request.full_url();
        let key = (request.method, full_url.clone());
        let url = request.url.clone();
        lock(&self.requests).push(request);

        if let Some(response) = lock(&self.method_responses).get(&key) {
            return Ok(response.clone());
        }

        lock(&self.responses)
            .get(&full_url)
            .cloned()
            .ok_or_else(|| Error::connection(url, "No mock response registered"))
    }

    async fn close(&self) {
        self.close_count.fetch_add(1, Ordering::SeqCst);
    }
}
