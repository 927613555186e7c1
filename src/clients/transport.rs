//! # HTTP Transport
//!
//! Every outbound request goes through the single [`HttpTransport::send`] seam.
//! Production code uses [`ReqwestTransport`]; tests plug in
//! [`MockTransport`](crate::framework::mock::MockTransport). [`MeteredTransport`]
//! decorates either one and records per-request-name latency for the run summary.

use crate::lifecycle::RequestStats;
use async_trait::async_trait;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One outbound call.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    /// Absolute URL, or a path resolved against the transport's base URL.
    pub url: String,
    /// Statistics label, e.g. `"create analysis submission"`.
    pub name: String,
    pub bearer_token: Option<String>,
    pub body: Option<Value>,
}

impl HttpRequest {
    pub fn new(method: HttpMethod, url: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            name: name.into(),
            bearer_token: None,
            body: None,
        }
    }

    pub fn bearer(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}

/// Errors surfaced by a transport. None of them are retried locally.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid URL {url}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("{method} {url} returned status {status}")]
    Status {
        method: HttpMethod,
        url: String,
        status: u16,
    },

    #[error("Invalid JSON from {url}: {source}")]
    InvalidJson {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

/// The seam between the workflow code and the network.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Sends `request` and returns the decoded JSON body (`Value::Null` when empty).
    async fn send(&self, request: HttpRequest) -> Result<Value, TransportError>;
}

/// reqwest-backed transport sharing one connection pool across all actors.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
    base_url: Url,
}

impl ReqwestTransport {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, TransportError> {
        let base_url = Url::parse(base_url).map_err(|source| TransportError::InvalidUrl {
            url: base_url.to_string(),
            source,
        })?;
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .pool_idle_timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Absolute URLs pass through; anything else is joined onto the base URL.
    pub fn resolve(&self, url: &str) -> Result<Url, TransportError> {
        Url::parse(url)
            .or_else(|_| self.base_url.join(url))
            .map_err(|source| TransportError::InvalidUrl {
                url: url.to_string(),
                source,
            })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<Value, TransportError> {
        let url = self.resolve(&request.url)?;
        debug!(method = %request.method, %url, name = %request.name, "Sending request");

        let mut builder = match request.method {
            HttpMethod::Get => self.client.get(url.clone()),
            HttpMethod::Post => self.client.post(url.clone()),
            HttpMethod::Put => self.client.put(url.clone()),
        };
        if let Some(token) = &request.bearer_token {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status {
                method: request.method,
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let bytes = response.bytes().await?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Value::Null);
        }
        serde_json::from_slice(&bytes).map_err(|source| TransportError::InvalidJson {
            url: url.to_string(),
            source,
        })
    }
}

/// Records latency and failures per request name, then delegates.
#[derive(Clone)]
pub struct MeteredTransport {
    inner: Arc<dyn HttpTransport>,
    stats: Arc<RequestStats>,
}

impl MeteredTransport {
    pub fn new(inner: Arc<dyn HttpTransport>, stats: Arc<RequestStats>) -> Self {
        Self { inner, stats }
    }

    pub fn stats(&self) -> &Arc<RequestStats> {
        &self.stats
    }
}

#[async_trait]
impl HttpTransport for MeteredTransport {
    async fn send(&self, request: HttpRequest) -> Result<Value, TransportError> {
        let name = request.name.clone();
        let start = Instant::now();
        let result = self.inner.send(request).await;
        let latency_ms = start.elapsed().as_secs_f64() * 1000.0;

        match &result {
            Ok(_) => self.stats.record_success(&name, latency_ms),
            Err(e) => {
                warn!(name = %name, error = %e, "Request failed");
                self.stats.record_failure(&name, latency_ms);
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::framework::mock::MockTransport;
    use serde_json::json;

    #[test]
    fn test_resolve_joins_relative_paths() {
        let transport = ReqwestTransport::new("http://ingest.test", Duration::from_secs(5)).unwrap();
        assert_eq!(
            transport.resolve("/submissionEnvelopes").unwrap().as_str(),
            "http://ingest.test/submissionEnvelopes"
        );
        assert_eq!(
            transport.resolve("http://upload.test/v1/area/a/files").unwrap().as_str(),
            "http://upload.test/v1/area/a/files"
        );
    }

    #[test]
    fn test_invalid_base_url_is_rejected() {
        let result = ReqwestTransport::new("not a url", Duration::from_secs(5));
        assert!(matches!(result, Err(TransportError::InvalidUrl { .. })));
    }

    #[test]
    fn test_request_builder() {
        let request = HttpRequest::new(HttpMethod::Put, "/f1", "add file reference")
            .bearer("token")
            .json(json!({"fileName": "a"}));
        assert_eq!(request.bearer_token.as_deref(), Some("token"));
        assert_eq!(request.body, Some(json!({"fileName": "a"})));
        assert_eq!(request.method.to_string(), "PUT");
    }

    #[tokio::test]
    async fn test_metered_transport_records_success_and_failure() {
        let mock = MockTransport::new();
        mock.expect(HttpMethod::Get, "/ok").return_json(json!({}));
        mock.expect(HttpMethod::Get, "/down").return_status(503);

        let stats = Arc::new(RequestStats::new());
        let transport = MeteredTransport::new(Arc::new(mock.clone()), stats.clone());

        transport
            .send(HttpRequest::new(HttpMethod::Get, "/ok", "get submission data"))
            .await
            .unwrap();
        let failed = transport
            .send(HttpRequest::new(HttpMethod::Get, "/down", "get submission data"))
            .await;
        assert!(matches!(failed, Err(TransportError::Status { status: 503, .. })));

        let summary = stats.summary("get submission data").unwrap();
        assert_eq!(summary.count, 2);
        assert_eq!(summary.failures, 1);
    }
}
