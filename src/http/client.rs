//! HTTP client with built-in retry logic and error handling.

use anyhow::{Context, Result};
use log::debug;
use reqwest::header::HeaderMap;
use reqwest::{Client, Method, StatusCode};
use serde_json::Value;
use std::time::Duration;

use super::retry::{RetryPolicy, check_retryable};
use crate::error::ClientError;

/// Default timeout of a single request.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Timeout for requests which may block on provisioning (e.g. workspaces).
pub const DEFAULT_EXTENDED_TIMEOUT: Duration = Duration::from_secs(7200);

/// A successful response as received from the API.
#[derive(Debug, Clone, PartialEq)]
pub struct RawResponse {
    pub status: StatusCode,
    pub body: String,
}

impl RawResponse {
    /// Parses the body as JSON. An empty body is `Value::Null`.
    pub fn json(&self) -> Result<Value> {
        if self.body.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&self.body).context("Failed to parse JSON response from Storage API")
    }
}

/// One request to send. Headers are per request because the run id may
/// change during the client's lifetime.
#[derive(Debug, Clone)]
pub struct HttpRequest<'a> {
    pub method: Method,
    pub url: &'a str,
    pub headers: HeaderMap,
    pub body: Option<&'a Value>,
    pub extended_timeout: bool,
}

/// HTTP client with built-in retry logic for network operations.
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    retry: RetryPolicy,
    timeout: Duration,
    extended_timeout: Duration,
}

impl HttpClient {
    /// Creates a new HTTP client wrapping the given reqwest Client.
    pub fn new(client: Client, retry: RetryPolicy) -> Self {
        Self {
            client,
            retry,
            timeout: DEFAULT_TIMEOUT,
            extended_timeout: DEFAULT_EXTENDED_TIMEOUT,
        }
    }

    pub fn with_timeouts(mut self, timeout: Duration, extended_timeout: Duration) -> Self {
        self.timeout = timeout;
        self.extended_timeout = extended_timeout;
        self
    }

    /// Returns a reference to the underlying reqwest Client.
    pub fn inner(&self) -> &Client {
        &self.client
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Sends a request, retrying transient failures.
    ///
    /// Error responses are turned into [`ClientError`]s; 4xx responses
    /// fail immediately.
    #[tracing::instrument(skip(self, request), fields(method = %request.method, url = request.url))]
    pub async fn send(&self, request: HttpRequest<'_>) -> Result<RawResponse> {
        let operation = format!("{} {}", request.method, request.url);
        self.retry
            .run(&operation, || self.send_once(&request))
            .await
    }

    /// Single attempt without retry.
    async fn send_once(&self, request: &HttpRequest<'_>) -> Result<RawResponse> {
        debug!("{} {}...", request.method, request.url);

        let timeout = if request.extended_timeout {
            self.extended_timeout
        } else {
            self.timeout
        };

        let mut builder = self
            .client
            .request(request.method.clone(), request.url)
            .headers(request.headers.clone())
            .timeout(timeout);
        if let Some(body) = request.body {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .context("Failed to send request to Storage API")?;

        let status = response.status();
        let body = response
            .text()
            .await
            .context("Failed to read response body from Storage API")?;

        if status.is_success() {
            return Ok(RawResponse { status, body });
        }

        let fallback = status
            .canonical_reason()
            .map(str::to_string)
            .unwrap_or_else(|| format!("HTTP {} error", status.as_u16()));
        let error = ClientError::from_response_body(status.as_u16(), &body, &fallback);
        debug!(
            "{} {} failed with {}: {}",
            request.method, request.url, status, error
        );

        Err(check_retryable(status, error))
    }
}
