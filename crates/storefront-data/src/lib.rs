//! Async HTTP client utilities for the storefront.
//!
//! A thin builder over `reqwest` with a base URL, default headers (the
//! publishable key goes here), per-request timeouts and a retry policy
//! that only ever resends requests which are safe to repeat.
//!
//! # Example
//!
//! ```rust,no_run
//! use storefront_data::{FetchClient, RetryPolicy};
//! use serde::Deserialize;
//!
//! #[derive(Deserialize)]
//! struct CartEnvelope {
//!     cart: serde_json::Value,
//! }
//!
//! # async fn demo() -> Result<(), storefront_data::FetchError> {
//! let client = FetchClient::new()
//!     .with_base_url("http://localhost:9000")
//!     .with_default_header("x-publishable-api-key", "pk_test")
//!     .with_retry(RetryPolicy::new(3));
//!
//! let envelope: CartEnvelope = client
//!     .get("/store/carts/cart_01")
//!     .send()
//!     .await?
//!     .error_for_status()?
//!     .json()?;
//! # let _ = envelope.cart;
//! # Ok(())
//! # }
//! ```

mod error;
mod request;
mod response;
mod retry;

pub use error::FetchError;
pub use request::{Method, RequestBuilder};
pub use response::Response;
pub use retry::{BackoffStrategy, RetryCondition, RetryPolicy};

use std::collections::HashMap;
use std::time::Duration;

/// HTTP client for making outbound requests.
///
/// Cloning is cheap; the underlying connection pool is shared.
#[derive(Debug, Clone)]
pub struct FetchClient {
    http: reqwest::Client,
    base_url: Option<String>,
    default_headers: HashMap<String, String>,
    retry: RetryPolicy,
    timeout: Option<Duration>,
}

impl Default for FetchClient {
    fn default() -> Self {
        Self::new()
    }
}

impl FetchClient {
    /// Create a new HTTP client with no retries.
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: None,
            default_headers: HashMap::new(),
            retry: RetryPolicy::none(),
            timeout: None,
        }
    }

    /// Create a client with a base URL that will be prepended to all requests.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Add a default header that will be included in all requests.
    pub fn with_default_header(
        mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.default_headers.insert(key.into(), value.into());
        self
    }

    /// Retry policy for requests that are safe to resend.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Timeout applied to every request unless overridden.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn base_url(&self) -> Option<&str> {
        self.base_url.as_deref()
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Create a GET request.
    pub fn get(&self, url: impl Into<String>) -> ClientRequestBuilder {
        self.request(Method::Get, url)
    }

    /// Create a POST request.
    pub fn post(&self, url: impl Into<String>) -> ClientRequestBuilder {
        self.request(Method::Post, url)
    }

    /// Create a PUT request.
    pub fn put(&self, url: impl Into<String>) -> ClientRequestBuilder {
        self.request(Method::Put, url)
    }

    /// Create a PATCH request.
    pub fn patch(&self, url: impl Into<String>) -> ClientRequestBuilder {
        self.request(Method::Patch, url)
    }

    /// Create a DELETE request.
    pub fn delete(&self, url: impl Into<String>) -> ClientRequestBuilder {
        self.request(Method::Delete, url)
    }

    /// Create a request with a custom method.
    pub fn request(&self, method: Method, url: impl Into<String>) -> ClientRequestBuilder {
        let url = url.into();
        let full_url = match &self.base_url {
            Some(base) if !(url.starts_with("http://") || url.starts_with("https://")) => {
                format!(
                    "{}/{}",
                    base.trim_end_matches('/'),
                    url.trim_start_matches('/')
                )
            }
            _ => url,
        };

        let mut builder = RequestBuilder::new(method, full_url);
        for (key, value) in &self.default_headers {
            builder = builder.header(key.clone(), value.clone());
        }
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }

        ClientRequestBuilder {
            http: self.http.clone(),
            retry: self.retry.clone(),
            builder,
        }
    }
}

/// A request builder bound to a client.
#[derive(Debug)]
pub struct ClientRequestBuilder {
    http: reqwest::Client,
    retry: RetryPolicy,
    builder: RequestBuilder,
}

impl ClientRequestBuilder {
    /// Add a header to the request.
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.builder = self.builder.header(key, value);
        self
    }

    /// Append a query parameter.
    pub fn query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.builder = self.builder.query(key, value);
        self
    }

    /// Override the timeout for this request.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.builder = self.builder.timeout(timeout);
        self
    }

    /// Set the request body as raw bytes.
    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.builder = self.builder.body(body);
        self
    }

    /// Set the request body as JSON.
    pub fn json<T: serde::Serialize>(mut self, value: &T) -> Result<Self, FetchError> {
        self.builder = self.builder.json(value)?;
        Ok(self)
    }

    /// Add a bearer token authorization header.
    pub fn bearer_auth(mut self, token: impl AsRef<str>) -> Self {
        self.builder = self.builder.bearer_auth(token);
        self
    }

    /// Inspect the request that will be sent.
    pub fn as_request(&self) -> &RequestBuilder {
        &self.builder
    }

    /// Send the request and return the response.
    ///
    /// Non-2xx statuses are returned as a [`Response`], not an error; call
    /// [`Response::error_for_status`] to convert. Requests whose method is
    /// [retry safe](Method::is_retry_safe) are resent according to the
    /// client's [`RetryPolicy`].
    pub async fn send(self) -> Result<Response, FetchError> {
        let Self {
            http,
            retry,
            builder,
        } = self;
        let retryable = builder.method.is_retry_safe();
        let mut attempt = 0;

        loop {
            tracing::debug!(method = %builder.method, url = %builder.url, attempt, "sending request");
            let result = execute(&http, &builder).await;

            let again = retryable
                && match &result {
                    Ok(response) => retry.should_retry_status(response.status, attempt),
                    Err(e) => retry.should_retry(e, attempt),
                };
            if !again {
                return result;
            }

            let delay = retry.backoff.delay_for_attempt(attempt);
            tracing::warn!(
                method = %builder.method,
                url = %builder.url,
                attempt,
                delay_ms = delay.as_millis() as u64,
                "retrying request"
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}

async fn execute(http: &reqwest::Client, req: &RequestBuilder) -> Result<Response, FetchError> {
    let mut request = http.request(req.method.to_reqwest(), req.url.as_str());
    if !req.query.is_empty() {
        request = request.query(&req.query);
    }
    for (key, value) in &req.headers {
        request = request.header(key.as_str(), value.as_str());
    }
    if let Some(timeout) = req.timeout {
        request = request.timeout(timeout);
    }
    if let Some(body) = &req.body {
        request = request.body(body.clone());
    }

    let response = request.send().await?;
    Response::from_reqwest(response).await
}

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::{FetchClient, FetchError, Method, Response, RetryPolicy};
}
