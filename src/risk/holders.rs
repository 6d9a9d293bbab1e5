//! Holder Concentration & PnL Analyzer
//!
//! Sums the supply share of the top holders and checks whether those
//! holders are winning or losing traders. One PnL lookup per holder makes
//! this the most expensive check; gate it behind a score threshold.

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::outcome::{AbsenceReason, Outcome};
use crate::provider::holders::{Holder, HolderPnlSource, WalletPnl};

/// Configuration for holder analysis
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HolderAnalysisConfig {
    /// Number of top holders to inspect
    #[serde(default = "default_max_holders")]
    pub max_holders: usize,

    /// PnL lookups in flight at once; 1 = strictly in rank order
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Skip the analysis for tokens scoring below this
    #[serde(default)]
    pub min_score_gate: Option<f64>,
}

fn default_max_holders() -> usize {
    10
}

fn default_concurrency() -> usize {
    1
}

impl Default for HolderAnalysisConfig {
    fn default() -> Self {
        Self {
            max_holders: default_max_holders(),
            concurrency: default_concurrency(),
            min_score_gate: None,
        }
    }
}

/// A holder left out of the profit/loss statistics
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExcludedWallet {
    pub owner: String,
    pub rank: usize,
    pub reason: AbsenceReason,
}

/// Concentration plus profitability of the top holders
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HolderPnlAggregate {
    /// Sum of the top holders' supply percentages
    pub top_holder_concentration_pct: f64,
    pub holders_requested: usize,
    pub holders_found: usize,
    /// Holders with a PnL record and at least one trade
    pub wallets_checked: usize,
    pub in_profit: usize,
    pub in_loss: usize,
    pub in_profit_pct: f64,
    pub avg_pnl: f64,
    /// Set when the holder list itself was unavailable or empty
    pub absence: Option<AbsenceReason>,
    pub excluded: Vec<ExcludedWallet>,
}

impl HolderPnlAggregate {
    fn without_holders(requested: usize, reason: AbsenceReason) -> Self {
        Self {
            holders_requested: requested,
            absence: Some(reason),
            ..Default::default()
        }
    }
}

/// Fold per-holder PnL results (in rank order) into an aggregate
pub fn aggregate(
    requested: usize,
    holders: &[Holder],
    results: Vec<(Holder, Outcome<WalletPnl>)>,
) -> HolderPnlAggregate {
    let mut agg = HolderPnlAggregate {
        top_holder_concentration_pct: holders.iter().map(|h| h.percentage).sum(),
        holders_requested: requested,
        holders_found: holders.len(),
        ..Default::default()
    };

    let mut pnl_sum = 0.0;
    for (holder, outcome) in results {
        let reason = match outcome {
            Outcome::Value(pnl) if pnl.trade_count > 0 => {
                let total = pnl.total();
                agg.wallets_checked += 1;
                pnl_sum += total;
                if total > 0.0 {
                    agg.in_profit += 1;
                } else if total < 0.0 {
                    agg.in_loss += 1;
                }
                continue;
            }
            Outcome::Value(_) => AbsenceReason::NoTrades,
            Outcome::Absent(reason) => reason,
        };
        agg.excluded.push(ExcludedWallet {
            owner: holder.owner,
            rank: holder.rank,
            reason,
        });
    }

    if agg.wallets_checked > 0 {
        let checked = agg.wallets_checked as f64;
        agg.in_profit_pct = agg.in_profit as f64 / checked * 100.0;
        agg.avg_pnl = pnl_sum / checked;
    }
    agg
}

pub struct HolderPnlAnalyzer {
    source: Arc<dyn HolderPnlSource>,
    config: HolderAnalysisConfig,
}

impl HolderPnlAnalyzer {
    pub fn new(source: Arc<dyn HolderPnlSource>, config: HolderAnalysisConfig) -> Self {
        Self { source, config }
    }

    pub fn config(&self) -> &HolderAnalysisConfig {
        &self.config
    }

    /// Analyze with the configured holder count
    pub async fn analyze(&self, mint: &str) -> HolderPnlAggregate {
        self.analyze_holders(mint, self.config.max_holders).await
    }

    /// Analyze only when `current_score` clears the configured gate
    pub async fn analyze_gated(&self, mint: &str, current_score: f64) -> Outcome<HolderPnlAggregate> {
        if let Some(gate) = self.config.min_score_gate {
            if current_score < gate {
                debug!(mint = %mint, score = current_score, gate, "Holder analysis gated");
                return AbsenceReason::BelowScoreGate {
                    score: current_score,
                    gate,
                }
                .into();
            }
        }
        Outcome::Value(self.analyze(mint).await)
    }

    /// Concentration and PnL statistics over the top `max_holders` holders
    ///
    /// Never fails: an unavailable holder list yields a zeroed aggregate
    /// with `absence` set, and unavailable wallets land in `excluded`.
    pub async fn analyze_holders(&self, mint: &str, max_holders: usize) -> HolderPnlAggregate {
        let holders = match self.source.top_holders(mint, max_holders).await {
            Outcome::Value(h) if h.is_empty() => {
                return HolderPnlAggregate::without_holders(max_holders, AbsenceReason::NoHolders)
            }
            Outcome::Value(mut h) => {
                h.truncate(max_holders);
                h
            }
            Outcome::Absent(reason) => return HolderPnlAggregate::without_holders(max_holders, reason),
        };

        // Rank order is kept; the provider's rate limiter paces the calls
        let results: Vec<(Holder, Outcome<WalletPnl>)> = stream::iter(holders.iter().cloned())
            .map(|holder| {
                let source = self.source.clone();
                async move {
                    let pnl = source.wallet_pnl(&holder.owner).await;
                    (holder, pnl)
                }
            })
            .buffered(self.config.concurrency.max(1))
            .collect()
            .await;

        let agg = aggregate(max_holders, &holders, results);
        info!(
            mint = %mint,
            concentration_pct = agg.top_holder_concentration_pct,
            checked = agg.wallets_checked,
            in_profit = agg.in_profit,
            in_loss = agg.in_loss,
            avg_pnl = agg.avg_pnl,
            "Holder PnL analysis complete"
        );
        agg
    }
}
