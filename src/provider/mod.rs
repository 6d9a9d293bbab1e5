//! Data-provider plumbing
//!
//! Three independent HTTP JSON providers feed the risk analyzers. Each one is
//! a thin typed adapter over a [`ResilientClient`], which owns the rate
//! limiter, the retry policy and the network transport.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use crate::config::Config;

pub mod client;
pub mod creator_history;
pub mod fields;
pub mod holders;
pub mod pools;
pub mod rate_limit;
pub mod retry;

pub use client::{ResilientClient, ReqwestTransport};
pub use creator_history::{CreatorHistoryClient, CreatorHistorySource};
pub use holders::{HolderPnlClient, HolderPnlSource};
pub use pools::{PoolClient, PoolSource};
pub use rate_limit::RateLimiter;
pub use retry::RetryPolicy;

/// Failure of a single provider request
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProviderError {
    #[error("rate limited (HTTP 429)")]
    RateLimited,

    #[error("forbidden (HTTP {status})")]
    Forbidden { status: u16 },

    #[error("not found (HTTP 404)")]
    NotFound,

    #[error("client error (HTTP {status})")]
    ClientError { status: u16 },

    #[error("server error (HTTP {status})")]
    ServerError { status: u16 },

    #[error("network error: {0}")]
    Network(String),

    #[error("request timed out")]
    Timeout,

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("client closed")]
    Closed,

    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("gave up after {attempts} attempts: {last}")]
    ExhaustedRetries {
        attempts: u32,
        last: Box<ProviderError>,
    },
}

/// Flat classification of a [`ProviderError`], carried in absence reasons
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderErrorKind {
    RateLimited,
    Forbidden,
    NotFound,
    ClientError,
    ServerError,
    Network,
    Timeout,
    Malformed,
    Closed,
    InvalidAddress,
    ExhaustedRetries,
}

impl ProviderError {
    /// Map a non-success HTTP status to its error class
    pub fn from_status(status: u16) -> Self {
        match status {
            401 | 403 => ProviderError::Forbidden { status },
            404 => ProviderError::NotFound,
            429 => ProviderError::RateLimited,
            s if s >= 500 => ProviderError::ServerError { status },
            _ => ProviderError::ClientError { status },
        }
    }

    /// Transient failures: 429, 5xx, connection failure, timeout
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ProviderError::RateLimited
                | ProviderError::ServerError { .. }
                | ProviderError::Network(_)
                | ProviderError::Timeout
        )
    }

    pub fn kind(&self) -> ProviderErrorKind {
        match self {
            ProviderError::RateLimited => ProviderErrorKind::RateLimited,
            ProviderError::Forbidden { .. } => ProviderErrorKind::Forbidden,
            ProviderError::NotFound => ProviderErrorKind::NotFound,
            ProviderError::ClientError { .. } => ProviderErrorKind::ClientError,
            ProviderError::ServerError { .. } => ProviderErrorKind::ServerError,
            ProviderError::Network(_) => ProviderErrorKind::Network,
            ProviderError::Timeout => ProviderErrorKind::Timeout,
            ProviderError::Malformed(_) => ProviderErrorKind::Malformed,
            ProviderError::Closed => ProviderErrorKind::Closed,
            ProviderError::InvalidAddress(_) => ProviderErrorKind::InvalidAddress,
            ProviderError::ExhaustedRetries { .. } => ProviderErrorKind::ExhaustedRetries,
        }
    }
}

/// Outbound request handed to a transport
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: reqwest::Method,
    pub url: String,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub timeout: Duration,
}

/// Raw response: status plus undecoded body
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

/// Network seam under the resilient client
///
/// Implementations report connection failures as [`ProviderError::Network`],
/// timeouts as [`ProviderError::Timeout`] and use after close as
/// [`ProviderError::Closed`]. Status codes are returned, not interpreted.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, ProviderError>;

    /// Release pooled connections. Must be idempotent.
    async fn close(&self);
}

/// The three provider clients, each with its own limiter and connection pool
pub struct ProviderClients {
    pub creator_history: Arc<CreatorHistoryClient>,
    pub pools: Arc<PoolClient>,
    pub holders: Arc<HolderPnlClient>,
}

impl ProviderClients {
    pub fn from_config(config: &Config) -> Result<Self, ProviderError> {
        let retry = config.retry.policy();
        Ok(Self {
            creator_history: Arc::new(CreatorHistoryClient::from_config(
                &config.creator_history,
                retry.clone(),
            )?),
            pools: Arc::new(PoolClient::from_config(&config.pools, retry.clone())?),
            holders: Arc::new(HolderPnlClient::from_config(&config.holders, retry)?),
        })
    }

    /// Release every provider's connection pool
    pub async fn close(&self) {
        tokio::join!(
            self.creator_history.close(),
            self.pools.close(),
            self.holders.close()
        );
    }
}

/// Check that `address` is a base58-encoded 32-byte Solana key
pub fn validate_address(address: &str) -> Result<(), ProviderError> {
    match bs58::decode(address).into_vec() {
        Ok(bytes) if bytes.len() == 32 => Ok(()),
        _ => Err(ProviderError::InvalidAddress(address.to_string())),
    }
}
