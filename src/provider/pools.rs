//! Pool/LP client
//!
//! Looks up the liquidity pools backing a mint and keeps the deepest one.

use async_trait::async_trait;
use reqwest::Method;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use super::fields::{self, FieldPath};
use super::{validate_address, ProviderError, ResilientClient, RetryPolicy};
use crate::config::ProviderConfig;
use crate::outcome::{AbsenceReason, Outcome};

pub const PROVIDER: &str = "pools";

/// LP burn percentage above which liquidity is considered locked
pub const BURNED_MAJORITY_PCT: f64 = 50.0;

/// Candidates requested per lookup
const PAGE_SIZE: u32 = 10;

// Paged envelope first, then flat list, then bare array
const POOLS: &[FieldPath] = &["data.data", "data", ""];
const POOL_ID: &[FieldPath] = &["id", "poolId"];
const BASE_MINT: &[FieldPath] = &["mintA.address", "mintA"];
const QUOTE_MINT: &[FieldPath] = &["mintB.address", "mintB"];
const LP_MINT: &[FieldPath] = &["lpMint.address", "lpMint"];
const LP_SUPPLY: &[FieldPath] = &["lpAmount", "lpSupply"];
const TVL: &[FieldPath] = &["tvl", "liquidity"];
// Older payloads use `lpBurnPercent`; anything unparsable means 0
const BURN_PERCENT: &[FieldPath] = &["burnPercent", "lpBurnPercent"];

/// A liquidity pool backing a token
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PoolInfo {
    pub pool_id: String,
    pub base_mint: String,
    pub quote_mint: String,
    pub lp_mint: String,
    pub lp_supply: f64,
    pub tvl_usd: f64,
    pub burn_percent: f64,
}

impl PoolInfo {
    pub fn is_burned(&self) -> bool {
        self.burn_percent > BURNED_MAJORITY_PCT
    }
}

#[async_trait]
pub trait PoolSource: Send + Sync {
    async fn pool_info(&self, mint: &str) -> Outcome<PoolInfo>;
}

/// Pool/LP provider adapter
pub struct PoolClient {
    client: ResilientClient,
}

impl PoolClient {
    pub fn new(client: ResilientClient) -> Self {
        Self { client }
    }

    pub fn from_config(config: &ProviderConfig, retry: RetryPolicy) -> Result<Self, ProviderError> {
        Ok(Self::new(ResilientClient::from_config(PROVIDER, config, retry)?))
    }

    /// Highest-liquidity pool for `mint`, if any
    pub async fn get_pool_info(&self, mint: &str) -> Outcome<PoolInfo> {
        let candidates = match self.fetch_candidates(mint).await {
            Ok(candidates) => candidates,
            Err(e) => {
                warn!(mint = %mint, error = %e, "Pool lookup failed");
                return AbsenceReason::provider(PROVIDER, &e).into();
            }
        };

        match select_deepest(candidates) {
            Some(pool) => {
                debug!(
                    mint = %mint,
                    pool = %pool.pool_id,
                    tvl_usd = pool.tvl_usd,
                    burn_percent = pool.burn_percent,
                    "Selected pool"
                );
                Outcome::Value(pool)
            }
            None => {
                debug!(mint = %mint, "No pools for mint");
                AbsenceReason::NoCandidatePools.into()
            }
        }
    }

    async fn fetch_candidates(&self, mint: &str) -> Result<Vec<PoolInfo>, ProviderError> {
        validate_address(mint)?;
        let body = self
            .client
            .request(
                Method::GET,
                "/pools/info/mint",
                &[
                    ("mint1", mint.to_string()),
                    ("poolType", "all".to_string()),
                    ("poolSortField", "liquidity".to_string()),
                    ("sortType", "desc".to_string()),
                    ("pageSize", PAGE_SIZE.to_string()),
                    ("page", "1".to_string()),
                ],
            )
            .await?;
        parse_pools(&body)
    }

    pub async fn close(&self) {
        self.client.close().await;
    }
}

#[async_trait]
impl PoolSource for PoolClient {
    async fn pool_info(&self, mint: &str) -> Outcome<PoolInfo> {
        self.get_pool_info(mint).await
    }
}

/// Decode the candidate list; entries without a pool id are dropped
pub fn parse_pools(body: &Value) -> Result<Vec<PoolInfo>, ProviderError> {
    let pools = fields::first_array(body, POOLS)
        .ok_or_else(|| ProviderError::Malformed("no pool list in response".to_string()))?;

    Ok(pools.iter().filter_map(parse_pool).collect())
}

fn parse_pool(pool: &Value) -> Option<PoolInfo> {
    Some(PoolInfo {
        pool_id: fields::first_str(pool, POOL_ID)?,
        base_mint: fields::first_str(pool, BASE_MINT).unwrap_or_default(),
        quote_mint: fields::first_str(pool, QUOTE_MINT).unwrap_or_default(),
        lp_mint: fields::first_str(pool, LP_MINT).unwrap_or_default(),
        lp_supply: fields::first_f64(pool, LP_SUPPLY).unwrap_or(0.0),
        tvl_usd: fields::first_f64(pool, TVL).unwrap_or(0.0),
        burn_percent: fields::first_f64(pool, BURN_PERCENT).unwrap_or(0.0),
    })
}

/// Highest TVL wins; on ties the provider's order is kept
pub fn select_deepest(candidates: Vec<PoolInfo>) -> Option<PoolInfo> {
    candidates.into_iter().fold(None, |best, pool| match best {
        Some(current) if current.tvl_usd >= pool.tvl_usd => Some(current),
        _ => Some(pool),
    })
}
