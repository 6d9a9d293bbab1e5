//! Rate-limited, retrying request envelope shared by all provider clients

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use backoff::future::retry_notify;
use reqwest::{Client, Method};
use serde_json::Value;
use tracing::{debug, warn};

use super::{HttpRequest, HttpResponse, HttpTransport, ProviderError, RateLimiter, RetryPolicy};
use crate::config::ProviderConfig;

/// Default per-request timeout
pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;

/// Request envelope for one provider
///
/// Every attempt waits for a permit from the provider's [`RateLimiter`]
/// before touching the network. Transient failures are retried on the
/// [`RetryPolicy`] schedule; everything else fails on the first attempt.
pub struct ResilientClient {
    /// Provider name, used in logs and absence reasons
    provider: &'static str,
    base_url: String,
    headers: Vec<(String, String)>,
    timeout: Duration,
    limiter: Arc<RateLimiter>,
    retry: RetryPolicy,
    transport: Arc<dyn HttpTransport>,
}

impl ResilientClient {
    pub fn new(
        provider: &'static str,
        base_url: impl Into<String>,
        limiter: Arc<RateLimiter>,
        retry: RetryPolicy,
        transport: Arc<dyn HttpTransport>,
    ) -> Self {
        Self {
            provider,
            base_url: base_url.into(),
            headers: Vec::new(),
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            limiter,
            retry,
            transport,
        }
    }

    /// Build a reqwest-backed client with its own limiter from configuration
    pub fn from_config(
        provider: &'static str,
        config: &ProviderConfig,
        retry: RetryPolicy,
    ) -> Result<Self, ProviderError> {
        let timeout = Duration::from_millis(config.timeout_ms);
        let transport = ReqwestTransport::new(timeout)?;
        let limiter = Arc::new(RateLimiter::new(config.requests_per_second));

        let mut client = Self::new(
            provider,
            config.base_url.clone(),
            limiter,
            retry,
            Arc::new(transport),
        )
        .with_timeout(timeout);

        if let Some(key) = config.api_key.as_deref().filter(|k| !k.is_empty()) {
            client = client.with_header(config.api_key_header.clone(), key);
        }

        Ok(client)
    }

    /// Attach a header sent with every request (API keys)
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn provider(&self) -> &'static str {
        self.provider
    }

    /// Issue a request and parse the JSON body
    ///
    /// A retryable failure on the last attempt is reported as
    /// [`ProviderError::ExhaustedRetries`].
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<Value, ProviderError> {
        let request = self.build_request(method, path, params);
        let attempts = AtomicU32::new(0);

        let request = &request;
        let attempts_ref = &attempts;
        let provider = self.provider;

        let result = retry_notify(
            self.retry.clone(),
            move || async move {
                attempts_ref.fetch_add(1, Ordering::Relaxed);
                self.attempt(request.clone()).await.map_err(|e| {
                    if e.is_retryable() {
                        backoff::Error::transient(e)
                    } else {
                        backoff::Error::permanent(e)
                    }
                })
            },
            |e: ProviderError, delay: Duration| {
                warn!(
                    provider,
                    error = %e,
                    retry_in_ms = delay.as_millis() as u64,
                    "Transient provider error, retrying"
                );
            },
        )
        .await;

        match result {
            Ok(value) => Ok(value),
            Err(e) if e.is_retryable() => Err(ProviderError::ExhaustedRetries {
                attempts: attempts.load(Ordering::Relaxed),
                last: Box::new(e),
            }),
            Err(e) => Err(e),
        }
    }

    /// Release the underlying connection pool
    pub async fn close(&self) {
        debug!(provider = self.provider, "Closing provider client");
        self.transport.close().await;
    }

    /// Single rate-limited attempt
    async fn attempt(&self, request: HttpRequest) -> Result<Value, ProviderError> {
        self.limiter.acquire().await;

        debug!(provider = self.provider, url = %request.url, "Provider request");
        let response = self.transport.send(request).await?;

        if !(200..300).contains(&response.status) {
            return Err(ProviderError::from_status(response.status));
        }

        serde_json::from_str(&response.body).map_err(|e| ProviderError::Malformed(e.to_string()))
    }

    fn build_request(&self, method: Method, path: &str, params: &[(&str, String)]) -> HttpRequest {
        HttpRequest {
            method,
            url: format!(
                "{}/{}",
                self.base_url.trim_end_matches('/'),
                path.trim_start_matches('/')
            ),
            query: params
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
            headers: self.headers.clone(),
            timeout: self.timeout,
        }
    }
}

/// reqwest-backed transport owning one connection pool
pub struct ReqwestTransport {
    client: RwLock<Option<Client>>,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProviderError::Network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client: RwLock::new(Some(client)),
        })
    }

    fn client(&self) -> Option<Client> {
        self.client
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

fn classify_reqwest_error(e: reqwest::Error) -> ProviderError {
    if e.is_timeout() {
        ProviderError::Timeout
    } else {
        ProviderError::Network(e.to_string())
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, ProviderError> {
        let client = self.client().ok_or(ProviderError::Closed)?;

        let mut builder = client
            .request(request.method, &request.url)
            .query(&request.query)
            .timeout(request.timeout);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder.send().await.map_err(classify_reqwest_error)?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(classify_reqwest_error)?;

        Ok(HttpResponse { status, body })
    }

    async fn close(&self) {
        let taken = self
            .client
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        drop(taken);
    }
}
