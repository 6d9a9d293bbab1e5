//! Holder-PnL client
//!
//! Top holders of a mint and per-wallet profit and loss. PnL lookups are
//! best-effort; a failed wallet is reported absent and never fails a batch.

use async_trait::async_trait;
use reqwest::Method;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use super::fields::{self, FieldPath};
use super::{validate_address, ProviderError, ResilientClient, RetryPolicy};
use crate::config::ProviderConfig;
use crate::outcome::{AbsenceReason, Outcome};

pub const PROVIDER: &str = "holders";

const HOLDERS: &[FieldPath] = &["", "accounts", "holders"];
const OWNER: &[FieldPath] = &["address", "owner"];
const BALANCE: &[FieldPath] = &["amount", "balance"];
const PERCENTAGE: &[FieldPath] = &["percentage", "percent"];

// PnL summary block, with flat fields as a fallback
const REALIZED: &[FieldPath] = &["summary.realized", "realized"];
const UNREALIZED: &[FieldPath] = &["summary.unrealized", "unrealized"];
const WINS: &[FieldPath] = &["summary.totalWins", "totalWins"];
const LOSSES: &[FieldPath] = &["summary.totalLosses", "totalLosses"];
// Absent on some plans; wins + losses is used instead
const TRADES: &[FieldPath] = &["summary.totalTrades", "totalTrades"];

/// A top holder of a token's supply
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Holder {
    pub owner: String,
    pub balance: f64,
    /// Share of supply, 0..=100
    pub percentage: f64,
    /// 1 = largest holder
    pub rank: usize,
}

/// Realized plus unrealized trading result of one wallet
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WalletPnl {
    pub owner: String,
    pub realized: f64,
    pub unrealized: f64,
    pub trade_count: u64,
    pub wins: u64,
    pub losses: u64,
}

impl WalletPnl {
    pub fn total(&self) -> f64 {
        self.realized + self.unrealized
    }
}

#[async_trait]
pub trait HolderPnlSource: Send + Sync {
    async fn top_holders(&self, mint: &str, limit: usize) -> Outcome<Vec<Holder>>;

    async fn wallet_pnl(&self, address: &str) -> Outcome<WalletPnl>;
}

/// Holder-PnL provider adapter
pub struct HolderPnlClient {
    client: ResilientClient,
}

impl HolderPnlClient {
    pub fn new(client: ResilientClient) -> Self {
        Self { client }
    }

    pub fn from_config(config: &ProviderConfig, retry: RetryPolicy) -> Result<Self, ProviderError> {
        Ok(Self::new(ResilientClient::from_config(PROVIDER, config, retry)?))
    }

    /// Largest holders of `mint`, at most `limit`, ranked from 1
    pub async fn get_top_holders(&self, mint: &str, limit: usize) -> Outcome<Vec<Holder>> {
        let result = async {
            validate_address(mint)?;
            let body = self
                .client
                .request(Method::GET, &format!("/tokens/{}/holders/top", mint), &[])
                .await?;
            parse_holders(&body, limit)
        }
        .await;

        match result {
            Ok(holders) => {
                debug!(mint = %mint, count = holders.len(), "Fetched top holders");
                Outcome::Value(holders)
            }
            Err(e) => {
                warn!(mint = %mint, error = %e, "Top holders unavailable");
                AbsenceReason::provider(PROVIDER, &e).into()
            }
        }
    }

    /// Profit and loss for one wallet
    pub async fn get_wallet_pnl(&self, address: &str) -> Outcome<WalletPnl> {
        let result = async {
            validate_address(address)?;
            let body = self
                .client
                .request(Method::GET, &format!("/pnl/{}", address), &[])
                .await?;
            parse_wallet_pnl(address, &body)
        }
        .await;

        match result {
            Ok(pnl) => Outcome::Value(pnl),
            Err(e) => {
                warn!(wallet = %address, error = %e, "Wallet PnL unavailable");
                AbsenceReason::provider(PROVIDER, &e).into()
            }
        }
    }

    pub async fn close(&self) {
        self.client.close().await;
    }
}

#[async_trait]
impl HolderPnlSource for HolderPnlClient {
    async fn top_holders(&self, mint: &str, limit: usize) -> Outcome<Vec<Holder>> {
        self.get_top_holders(mint, limit).await
    }

    async fn wallet_pnl(&self, address: &str) -> Outcome<WalletPnl> {
        self.get_wallet_pnl(address).await
    }
}

/// Decode a holder list, dropping entries without an owner
pub fn parse_holders(body: &Value, limit: usize) -> Result<Vec<Holder>, ProviderError> {
    let entries = fields::first_array(body, HOLDERS)
        .ok_or_else(|| ProviderError::Malformed("no holder list in response".to_string()))?;

    Ok(entries
        .iter()
        .filter_map(|entry| {
            Some((
                fields::first_str(entry, OWNER)?,
                fields::first_f64(entry, BALANCE).unwrap_or(0.0),
                fields::first_f64(entry, PERCENTAGE)
                    .unwrap_or(0.0)
                    .clamp(0.0, 100.0),
            ))
        })
        .take(limit)
        .enumerate()
        .map(|(i, (owner, balance, percentage))| Holder {
            owner,
            balance,
            percentage,
            rank: i + 1,
        })
        .collect())
}

pub fn parse_wallet_pnl(address: &str, body: &Value) -> Result<WalletPnl, ProviderError> {
    if !body.is_object() {
        return Err(ProviderError::Malformed("PnL body is not an object".to_string()));
    }

    let wins = fields::first_u64(body, WINS).unwrap_or(0);
    let losses = fields::first_u64(body, LOSSES).unwrap_or(0);

    Ok(WalletPnl {
        owner: address.to_string(),
        realized: fields::first_f64(body, REALIZED).unwrap_or(0.0),
        unrealized: fields::first_f64(body, UNREALIZED).unwrap_or(0.0),
        trade_count: fields::first_u64(body, TRADES).unwrap_or(wins + losses),
        wins,
        losses,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::testing::{ScriptedTransport, USDC, WALLET_A};
    use crate::provider::RateLimiter;
    use serde_json::json;
    use std::sync::Arc;

    fn client_with(transport: Arc<ScriptedTransport>) -> HolderPnlClient {
        HolderPnlClient::new(
            ResilientClient::new(
                PROVIDER,
                "https://data.example.com",
                Arc::new(RateLimiter::new(100.0)),
                RetryPolicy::default(),
                transport,
            )
            .with_header("x-api-key", "k"),
        )
    }

    #[test]
    fn test_parse_holders_ranks_and_limit() {
        let body = json!([
            { "address": "a", "amount": 500.0, "percentage": 50.0 },
            { "amount": 1.0 },
            { "owner": "b", "amount": "250", "percentage": 25.0 },
            { "address": "c", "amount": 100.0, "percentage": 140.0 }
        ]);

        let holders = parse_holders(&body, 2).unwrap();

        assert_eq!(holders.len(), 2);
        assert_eq!(holders[0].rank, 1);
        assert_eq!(holders[1].owner, "b");
        assert_eq!(holders[1].rank, 2);
        assert_eq!(holders[1].balance, 250.0);

        let clamped = parse_holders(&body, 10).unwrap();
        assert_eq!(clamped[2].percentage, 100.0);
    }

    #[test]
    fn test_parse_pnl_defaults() {
        let pnl = parse_wallet_pnl("w", &json!({ "summary": { "realized": 2.5, "totalWins": 3, "totalLosses": 1 } })).unwrap();
        assert_eq!(pnl.unrealized, 0.0);
        assert_eq!(pnl.total(), 2.5);
        assert_eq!(pnl.trade_count, 4);

        let pnl = parse_wallet_pnl("w", &json!({ "summary": { "totalTrades": 9 } })).unwrap();
        assert_eq!(pnl.trade_count, 9);
        assert_eq!(pnl.total(), 0.0);

        assert!(parse_wallet_pnl("w", &json!([1, 2])).is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_top_holders_request() {
        let transport = Arc::new(ScriptedTransport::new(vec![ScriptedTransport::ok(
            200,
            r#"{"accounts":[{"address":"a","amount":1,"percentage":12.5}]}"#,
        )]));
        let client = client_with(transport.clone());

        let holders = client.get_top_holders(USDC, 10).await.into_value().unwrap();

        assert_eq!(holders[0].percentage, 12.5);
        let request = &transport.requests.lock().unwrap()[0];
        assert!(request.url.ends_with(&format!("/tokens/{}/holders/top", USDC)));
        assert_eq!(request.headers[0].0, "x-api-key");
    }

    #[tokio::test(start_paused = true)]
    async fn test_wallet_pnl_failure_is_absent() {
        let transport = Arc::new(ScriptedTransport::new(vec![ScriptedTransport::ok(401, "")]));
        let client = client_with(transport);

        let outcome = client.get_wallet_pnl(WALLET_A).await;

        assert!(matches!(
            outcome.reason(),
            Some(AbsenceReason::Provider { kind: crate::provider::ProviderErrorKind::Forbidden, .. })
        ));
    }
}
