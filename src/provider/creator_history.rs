//! Creator-History client
//!
//! Fetches the list of tokens a wallet has deployed. Best-effort
//! enrichment: a 404 means the wallet never created anything, and every
//! other failure degrades to an absent result.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Method;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use super::fields::{self, FieldPath};
use super::{validate_address, ProviderError, ResilientClient, RetryPolicy};
use crate::config::ProviderConfig;
use crate::outcome::{AbsenceReason, Outcome};

pub const PROVIDER: &str = "creator_history";

/// Market cap (USD) below which a token is considered dead
pub const DUST_MARKET_CAP_USD: f64 = 100.0;

/// Page size requested from the provider
const PAGE_LIMIT: u32 = 50;

// Response envelope: bare array, or wrapped under one of these keys
const COINS: &[FieldPath] = &["", "coins", "data"];
const MINT: &[FieldPath] = &["mint", "address"];
const NAME: &[FieldPath] = &["name"];
const SYMBOL: &[FieldPath] = &["symbol"];
// Creation time in milliseconds since epoch
const CREATED_MS: &[FieldPath] = &["created_timestamp", "createdAt"];
// USD market cap first; some payloads only carry the generic field
const MARKET_CAP: &[FieldPath] = &["usd_market_cap", "market_cap"];

/// One token deployed by a profiled wallet
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreatedToken {
    pub mint: String,
    pub name: String,
    pub symbol: String,
    pub created_at: Option<DateTime<Utc>>,
    pub market_cap_usd: f64,
}

impl CreatedToken {
    pub fn is_dead(&self) -> bool {
        self.market_cap_usd < DUST_MARKET_CAP_USD
    }
}

/// A wallet's token-creation track record, newest token first
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreatorHistory {
    pub wallet: String,
    pub total_tokens: usize,
    pub dead_tokens: usize,
    pub tokens: Vec<CreatedToken>,
}

impl CreatorHistory {
    /// History of a wallet that never created a token
    pub fn empty(wallet: &str) -> Self {
        Self::from_tokens(wallet, Vec::new())
    }

    pub fn from_tokens(wallet: &str, mut tokens: Vec<CreatedToken>) -> Self {
        // Newest first; undated tokens last, input order otherwise
        tokens.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        let dead_tokens = tokens.iter().filter(|t| t.is_dead()).count();
        Self {
            wallet: wallet.to_string(),
            total_tokens: tokens.len(),
            dead_tokens,
            tokens,
        }
    }
}

/// Anything that can answer "what has this wallet launched?"
#[async_trait]
pub trait CreatorHistorySource: Send + Sync {
    async fn creator_history(&self, wallet: &str) -> Outcome<CreatorHistory>;
}

/// Creator-History provider adapter
pub struct CreatorHistoryClient {
    client: ResilientClient,
}

impl CreatorHistoryClient {
    pub fn new(client: ResilientClient) -> Self {
        Self { client }
    }

    pub fn from_config(config: &ProviderConfig, retry: RetryPolicy) -> Result<Self, ProviderError> {
        Ok(Self::new(ResilientClient::from_config(PROVIDER, config, retry)?))
    }

    /// Fetch the wallet's creation history
    pub async fn get_creator_history(&self, wallet: &str) -> Outcome<CreatorHistory> {
        match self.fetch(wallet).await {
            Ok(history) => {
                debug!(
                    wallet = %wallet,
                    total = history.total_tokens,
                    dead = history.dead_tokens,
                    "Fetched creator history"
                );
                Outcome::Value(history)
            }
            Err(ProviderError::NotFound) => {
                debug!(wallet = %wallet, "No tokens created by wallet");
                Outcome::Value(CreatorHistory::empty(wallet))
            }
            Err(e) => {
                warn!(wallet = %wallet, error = %e, "Creator history unavailable");
                AbsenceReason::provider(PROVIDER, &e).into()
            }
        }
    }

    async fn fetch(&self, wallet: &str) -> Result<CreatorHistory, ProviderError> {
        validate_address(wallet)?;
        let body = self
            .client
            .request(
                Method::GET,
                &format!("/coins/user-created-coins/{}", wallet),
                &[
                    ("offset", "0".to_string()),
                    ("limit", PAGE_LIMIT.to_string()),
                    ("includeNsfw", "true".to_string()),
                ],
            )
            .await?;
        parse_history(wallet, &body)
    }

    pub async fn close(&self) {
        self.client.close().await;
    }
}

#[async_trait]
impl CreatorHistorySource for CreatorHistoryClient {
    async fn creator_history(&self, wallet: &str) -> Outcome<CreatorHistory> {
        self.get_creator_history(wallet).await
    }
}

/// Decode a creator-history body
pub fn parse_history(wallet: &str, body: &Value) -> Result<CreatorHistory, ProviderError> {
    let coins = fields::first_array(body, COINS)
        .ok_or_else(|| ProviderError::Malformed("no coin list in creator history".to_string()))?;

    let tokens = coins.iter().filter_map(parse_coin).collect();
    Ok(CreatorHistory::from_tokens(wallet, tokens))
}

fn parse_coin(coin: &Value) -> Option<CreatedToken> {
    let Some(mint) = fields::first_str(coin, MINT) else {
        debug!("Skipping created coin without mint");
        return None;
    };

    Some(CreatedToken {
        mint,
        name: fields::first_str(coin, NAME).unwrap_or_default(),
        symbol: fields::first_str(coin, SYMBOL).unwrap_or_default(),
        created_at: fields::first_u64(coin, CREATED_MS)
            .and_then(|ms| i64::try_from(ms).ok())
            .and_then(DateTime::from_timestamp_millis),
        // Missing market cap counts as dust
        market_cap_usd: fields::first_f64(coin, MARKET_CAP).unwrap_or(0.0),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::testing::{ScriptedTransport, WALLET_A};
    use crate::provider::RateLimiter;
    use serde_json::json;
    use std::sync::Arc;

    fn client_with(transport: Arc<ScriptedTransport>) -> CreatorHistoryClient {
        CreatorHistoryClient::new(ResilientClient::new(
            PROVIDER,
            "https://frontend-api.example.com",
            Arc::new(RateLimiter::new(100.0)),
            RetryPolicy::default(),
            transport,
        ))
    }

    #[test]
    fn test_parse_bare_array() {
        let body = json!([
            { "mint": "m1", "name": "One", "symbol": "ONE", "created_timestamp": 1_700_000_000_000u64, "usd_market_cap": 50.0 },
            { "mint": "m2", "name": "Two", "symbol": "TWO", "created_timestamp": 1_700_000_100_000u64, "usd_market_cap": "25000" },
            { "name": "no mint" }
        ]);

        let history = parse_history(WALLET_A, &body).unwrap();

        assert_eq!(history.total_tokens, 2);
        assert_eq!(history.dead_tokens, 1);
        // Newest first
        assert_eq!(history.tokens[0].mint, "m2");
        assert_eq!(history.tokens[0].market_cap_usd, 25000.0);
    }

    #[test]
    fn test_parse_wrapped_and_fallback_market_cap() {
        let body = json!({ "coins": [ { "mint": "m1", "market_cap": 150.0 }, { "mint": "m2" } ] });

        let history = parse_history(WALLET_A, &body).unwrap();

        assert_eq!(history.total_tokens, 2);
        assert_eq!(history.dead_tokens, 1);
        assert!(history.dead_tokens <= history.total_tokens);
    }

    #[test]
    fn test_parse_rejects_unknown_shape() {
        assert!(matches!(
            parse_history(WALLET_A, &json!({ "error": "boom" })),
            Err(ProviderError::Malformed(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_not_found_is_empty_history() {
        let transport = Arc::new(ScriptedTransport::new(vec![ScriptedTransport::ok(404, "")]));
        let client = client_with(transport.clone());

        let outcome = client.get_creator_history(WALLET_A).await;

        assert_eq!(outcome, Outcome::Value(CreatorHistory::empty(WALLET_A)));
        let url = &transport.requests.lock().unwrap()[0].url;
        assert!(url.ends_with(&format!("/coins/user-created-coins/{}", WALLET_A)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failures_degrade_to_absent() {
        let transport = Arc::new(ScriptedTransport::new(vec![ScriptedTransport::ok(403, "")]));
        let client = client_with(transport);

        let outcome = client.get_creator_history(WALLET_A).await;

        assert_eq!(
            outcome.reason(),
            Some(&AbsenceReason::Provider {
                provider: PROVIDER.to_string(),
                kind: crate::provider::ProviderErrorKind::Forbidden,
            })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_wallet_skips_network() {
        let transport = Arc::new(ScriptedTransport::new(Vec::new()));
        let client = client_with(transport.clone());

        let outcome = client.get_creator_history("not a wallet").await;

        assert!(!outcome.is_value());
        assert_eq!(transport.request_count(), 0);
    }
}
