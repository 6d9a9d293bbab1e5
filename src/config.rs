//! Configuration loading and validation

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

use crate::provider::retry::{DEFAULT_BACKOFF_SCHEDULE_MS, DEFAULT_MAX_RETRIES};
use crate::provider::RetryPolicy;

// Re-export analyzer configs
pub use crate::risk::holders::HolderAnalysisConfig;

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub retry: RetryConfig,
    pub creator_history: ProviderConfig,
    pub pools: ProviderConfig,
    pub holders: ProviderConfig,
    #[serde(default)]
    pub holder_analysis: HolderAnalysisConfig,
}

/// Retry bound and backoff schedule shared by every provider
#[derive(Debug, Clone, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Delay before each retry; the last entry repeats
    #[serde(default = "default_backoff_schedule_ms")]
    pub backoff_schedule_ms: Vec<u64>,
}

impl RetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy::from_millis(self.max_retries, &self.backoff_schedule_ms)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            backoff_schedule_ms: default_backoff_schedule_ms(),
        }
    }
}

/// One data provider endpoint
#[derive(Clone, Deserialize)]
pub struct ProviderConfig {
    pub base_url: String,
    /// Sustained request budget for this provider
    pub requests_per_second: f64,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_api_key_header")]
    pub api_key_header: String,
}

impl ProviderConfig {
    pub fn new(base_url: &str, requests_per_second: f64) -> Self {
        Self {
            base_url: base_url.to_string(),
            requests_per_second,
            timeout_ms: default_timeout_ms(),
            api_key: None,
            api_key_header: default_api_key_header(),
        }
    }

    /// API key with everything but the first four characters hidden
    pub fn masked_api_key(&self) -> Option<String> {
        self.api_key.as_deref().map(|key| {
            let visible: String = key.chars().take(4).collect();
            format!("{}****", visible)
        })
    }
}

// Keep keys out of logs
impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("base_url", &self.base_url)
            .field("requests_per_second", &self.requests_per_second)
            .field("timeout_ms", &self.timeout_ms)
            .field("api_key", &self.masked_api_key())
            .field("api_key_header", &self.api_key_header)
            .finish()
    }
}

pub const DEFAULT_CREATOR_HISTORY_URL: &str = "https://frontend-api-v3.pump.fun";
pub const DEFAULT_POOLS_URL: &str = "https://api-v3.raydium.io";
pub const DEFAULT_HOLDERS_URL: &str = "https://data.solanatracker.io";

const DEFAULT_CREATOR_HISTORY_RPS: f64 = 2.0;
const DEFAULT_POOLS_RPS: f64 = 5.0;
const DEFAULT_HOLDERS_RPS: f64 = 1.0;

/// Smallest accepted request budget (one request every ~17 minutes)
pub const MIN_REQUESTS_PER_SECOND: f64 = 0.001;

fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}

fn default_backoff_schedule_ms() -> Vec<u64> {
    DEFAULT_BACKOFF_SCHEDULE_MS.to_vec()
}

fn default_timeout_ms() -> u64 {
    10_000
}

fn default_api_key_header() -> String {
    "x-api-key".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            retry: RetryConfig::default(),
            creator_history: ProviderConfig::new(
                DEFAULT_CREATOR_HISTORY_URL,
                DEFAULT_CREATOR_HISTORY_RPS,
            ),
            pools: ProviderConfig::new(DEFAULT_POOLS_URL, DEFAULT_POOLS_RPS),
            holders: ProviderConfig::new(DEFAULT_HOLDERS_URL, DEFAULT_HOLDERS_RPS),
            holder_analysis: HolderAnalysisConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from file and environment variables
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let settings = config::Config::builder()
            // Start with defaults
            .set_default("creator_history.base_url", DEFAULT_CREATOR_HISTORY_URL)?
            .set_default(
                "creator_history.requests_per_second",
                DEFAULT_CREATOR_HISTORY_RPS,
            )?
            .set_default("pools.base_url", DEFAULT_POOLS_URL)?
            .set_default("pools.requests_per_second", DEFAULT_POOLS_RPS)?
            .set_default("holders.base_url", DEFAULT_HOLDERS_URL)?
            .set_default("holders.requests_per_second", DEFAULT_HOLDERS_RPS)?
            // Load from file if exists
            .add_source(config::File::from(path).required(false))
            // Override with environment variables (e.g. RISK__HOLDERS__API_KEY)
            .add_source(
                config::Environment::with_prefix("RISK")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to build configuration")?;

        let config: Config = settings
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        for (name, provider) in [
            ("creator_history", &self.creator_history),
            ("pools", &self.pools),
            ("holders", &self.holders),
        ] {
            let url = url::Url::parse(&provider.base_url)
                .with_context(|| format!("Invalid {}.base_url: {}", name, provider.base_url))?;
            if url.scheme() != "http" && url.scheme() != "https" {
                anyhow::bail!("{}.base_url must be http(s), got {}", name, url.scheme());
            }

            if !(provider.requests_per_second.is_finite()
                && provider.requests_per_second >= MIN_REQUESTS_PER_SECOND)
            {
                anyhow::bail!(
                    "{}.requests_per_second must be at least {}",
                    name,
                    MIN_REQUESTS_PER_SECOND
                );
            }

            if provider.timeout_ms == 0 {
                anyhow::bail!("{}.timeout_ms must be positive", name);
            }
        }

        if self.retry.backoff_schedule_ms.is_empty() {
            anyhow::bail!("retry.backoff_schedule_ms must not be empty");
        }

        if self.holder_analysis.max_holders == 0 {
            anyhow::bail!("holder_analysis.max_holders must be at least 1");
        }

        if self.holder_analysis.concurrency == 0 {
            anyhow::bail!("holder_analysis.concurrency must be at least 1");
        }

        if self.holders.api_key.as_deref().map_or(true, str::is_empty) {
            tracing::warn!("holders.api_key is not set - holder PnL requests will likely be rejected");
        }

        Ok(())
    }
}
