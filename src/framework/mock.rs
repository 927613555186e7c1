//! # Mock Transport
//!
//! Utilities for testing clients and actors without a network.
//!
//! [`MockTransport`] answers requests from a list of expectations keyed by
//! method and URL, records every call it sees, and panics on a request nobody
//! expected.
//!
//! # Example
//! ```ignore
//! let mock = MockTransport::new();
//! mock.expect(HttpMethod::Post, "/submissionEnvelopes")
//!     .return_json(json!({"_links": {"processes": {"href": "/p1"}}}));
//! mock.expect(HttpMethod::Get, "/s1").times(3).return_json(json!({}));
//!
//! let client = CoreClient::new(Arc::new(mock.clone()), auth);
//! // Use client in tests...
//! mock.verify(); // Ensures all expectations were met
//! ```

use crate::clients::transport::{HttpMethod, HttpRequest, HttpTransport, TransportError};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Clone)]
enum MockResponse {
    Json(Value),
    Status(u16),
}

#[derive(Debug)]
struct Expectation {
    method: HttpMethod,
    url: String,
    response: MockResponse,
    /// `None` answers any number of times.
    remaining: Option<u32>,
}

#[derive(Debug, Default)]
struct MockState {
    expectations: Vec<Expectation>,
    calls: Vec<HttpRequest>,
}

/// A transport with expectation tracking for fluent testing.
///
/// Expectations for the same method and URL are consumed in the order they
/// were registered, which lets a test script a sequence of poll responses.
#[derive(Debug, Clone, Default)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Expects a request. Answers once unless [`ExpectationBuilder::times`] or
    /// [`ExpectationBuilder::always`] says otherwise.
    pub fn expect(&self, method: HttpMethod, url: impl Into<String>) -> ExpectationBuilder {
        ExpectationBuilder {
            state: self.state.clone(),
            method,
            url: url.into(),
            remaining: Some(1),
        }
    }

    /// Every request seen so far, in arrival order.
    pub fn calls(&self) -> Vec<HttpRequest> {
        self.lock().calls.clone()
    }

    pub fn count(&self, method: HttpMethod, url: &str) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|call| call.method == method && call.url == url)
            .count()
    }

    /// Verifies that every counted expectation was used up.
    pub fn verify(&self) {
        let state = self.lock();
        let pending: Vec<String> = state
            .expectations
            .iter()
            .filter(|e| e.remaining.is_some_and(|n| n > 0))
            .map(|e| format!("{} {} (x{})", e.method, e.url, e.remaining.unwrap_or_default()))
            .collect();
        if !pending.is_empty() {
            panic!("Not all expectations were met: {}", pending.join(", "));
        }
    }
}

#[async_trait]
impl HttpTransport for MockTransport {
    async fn send(&self, request: HttpRequest) -> Result<Value, TransportError> {
        let response = {
            let mut state = self.lock();
            state.calls.push(request.clone());
            state
                .expectations
                .iter_mut()
                .find(|e| {
                    e.method == request.method
                        && e.url == request.url
                        && e.remaining.map_or(true, |n| n > 0)
                })
                .map(|expectation| {
                    if let Some(n) = expectation.remaining.as_mut() {
                        *n -= 1;
                    }
                    expectation.response.clone()
                })
        };

        let Some(response) = response else {
            panic!("Unexpected request: {} {}", request.method, request.url);
        };
        match response {
            MockResponse::Json(body) => Ok(body),
            MockResponse::Status(status) => Err(TransportError::Status {
                method: request.method,
                url: request.url,
                status,
            }),
        }
    }
}

/// Builder returned by [`MockTransport::expect`].
pub struct ExpectationBuilder {
    state: Arc<Mutex<MockState>>,
    method: HttpMethod,
    url: String,
    remaining: Option<u32>,
}

impl ExpectationBuilder {
    pub fn times(mut self, n: u32) -> Self {
        self.remaining = Some(n);
        self
    }

    /// Answers every matching request; ignored by [`MockTransport::verify`].
    pub fn always(mut self) -> Self {
        self.remaining = None;
        self
    }

    pub fn return_json(self, body: Value) {
        self.register(MockResponse::Json(body));
    }

    /// Fails matching requests with a non-2xx status.
    pub fn return_status(self, status: u16) {
        self.register(MockResponse::Status(status));
    }

    fn register(self, response: MockResponse) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.expectations.push(Expectation {
            method: self.method,
            url: self.url,
            response,
            remaining: self.remaining,
        });
    }
}
