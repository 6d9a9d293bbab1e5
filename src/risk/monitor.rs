//! Runs every risk check for one token
//!
//! The checks share nothing but the provider rate limiters, so they are
//! awaited together. The report carries raw per-check values; folding them
//! into a persisted maximum is the caller's job.

use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use super::creator::{CreatorRiskProfile, CreatorRiskProfiler};
use super::holders::{HolderAnalysisConfig, HolderPnlAggregate, HolderPnlAnalyzer};
use super::lp_removal::{CumulativeRemoval, LpRemovalDetector, LpRemovalEvent};
use crate::outcome::{AbsenceReason, Outcome};
use crate::provider::pools::PoolInfo;
use crate::provider::{CreatorHistorySource, HolderPnlSource, PoolSource};
use crate::storage::SnapshotStore;

/// Token to assess
#[derive(Debug, Clone)]
pub struct TokenTarget {
    /// Persistence id used for snapshot lookups
    pub token_id: String,
    pub mint: String,
    pub creator: Option<String>,
    /// Score from the scoring engine so far, used to gate holder analysis
    pub current_score: f64,
}

/// Raw risk signals for one token
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TokenRiskReport {
    pub token_id: String,
    pub mint: String,
    pub lp_removal: Outcome<LpRemovalEvent>,
    pub cumulative_removal: Outcome<CumulativeRemoval>,
    pub creator: Outcome<CreatorRiskProfile>,
    pub pool: Outcome<PoolInfo>,
    pub holders: Outcome<HolderPnlAggregate>,
}

impl TokenRiskReport {
    /// Sum of this run's score deltas (LP impact minus creator boost)
    pub fn score_delta(&self) -> i32 {
        let lp = self.lp_removal.value().map_or(0, |e| e.score_impact);
        let creator = self
            .creator
            .value()
            .map_or(0, |p| i32::try_from(p.risk_boost).unwrap_or(i32::MAX));
        lp.saturating_sub(creator)
    }
}

/// Monotonic "maximum ever" risk score: the larger of the new and stored values
pub fn max_risk_score(new_score: f64, previous_max: Option<f64>) -> f64 {
    previous_max.map_or(new_score, |prev| prev.max(new_score))
}

pub struct RiskMonitor {
    lp: LpRemovalDetector,
    creator: CreatorRiskProfiler,
    pools: Arc<dyn PoolSource>,
    holders: HolderPnlAnalyzer,
}

impl RiskMonitor {
    pub fn new(
        store: Arc<dyn SnapshotStore>,
        creator_history: Arc<dyn CreatorHistorySource>,
        pools: Arc<dyn PoolSource>,
        holders: Arc<dyn HolderPnlSource>,
        holder_config: HolderAnalysisConfig,
    ) -> Self {
        Self {
            lp: LpRemovalDetector::new(store),
            creator: CreatorRiskProfiler::new(creator_history),
            pools,
            holders: HolderPnlAnalyzer::new(holders, holder_config),
        }
    }

    pub async fn assess(&self, target: &TokenTarget) -> TokenRiskReport {
        let creator = async {
            match target.creator.as_deref() {
                Some(wallet) => self.creator.assess(wallet).await,
                None => AbsenceReason::UnknownCreator.into(),
            }
        };

        let (lp_removal, cumulative_removal, creator, pool, holders) = tokio::join!(
            self.lp.detect(&target.token_id),
            self.lp.cumulative(&target.token_id),
            creator,
            self.pools.pool_info(&target.mint),
            self.holders.analyze_gated(&target.mint, target.current_score),
        );

        let report = TokenRiskReport {
            token_id: target.token_id.clone(),
            mint: target.mint.clone(),
            lp_removal,
            cumulative_removal,
            creator,
            pool,
            holders,
        };

        info!(
            token = %report.token_id,
            mint = %report.mint,
            score_delta = report.score_delta(),
            lp_event = report.lp_removal.is_value(),
            "Risk assessment complete"
        );
        report
    }
}
