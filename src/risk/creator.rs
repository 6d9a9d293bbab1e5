//! Creator Risk Profiler
//!
//! Serial deployers leave a trail of dead tokens. The boost grows in steps
//! with the number of dead launches and never shrinks as that count rises.

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use crate::outcome::Outcome;
use crate::provider::creator_history::{CreatorHistory, CreatorHistorySource};

/// Dead-token count at which a creator is a serial scammer
pub const SERIAL_SCAMMER_DEAD_TOKENS: usize = 10;

/// (minimum dead tokens, risk boost), checked from the top
const BOOST_STEPS: [(usize, u32); 3] = [(SERIAL_SCAMMER_DEAD_TOKENS, 40), (5, 20), (3, 10)];

/// Risk summary of a token's creator
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreatorRiskProfile {
    pub wallet: String,
    pub total_tokens: usize,
    pub dead_tokens: usize,
    pub risk_boost: u32,
    pub is_serial_scammer: bool,
}

pub fn risk_boost(dead_tokens: usize) -> u32 {
    BOOST_STEPS
        .iter()
        .find(|(min_dead, _)| dead_tokens >= *min_dead)
        .map_or(0, |(_, boost)| *boost)
}

pub fn is_serial_scammer(dead_tokens: usize) -> bool {
    dead_tokens >= SERIAL_SCAMMER_DEAD_TOKENS
}

pub fn profile(history: &CreatorHistory) -> CreatorRiskProfile {
    CreatorRiskProfile {
        wallet: history.wallet.clone(),
        total_tokens: history.total_tokens,
        dead_tokens: history.dead_tokens,
        risk_boost: risk_boost(history.dead_tokens),
        is_serial_scammer: is_serial_scammer(history.dead_tokens),
    }
}

pub struct CreatorRiskProfiler {
    source: Arc<dyn CreatorHistorySource>,
}

impl CreatorRiskProfiler {
    pub fn new(source: Arc<dyn CreatorHistorySource>) -> Self {
        Self { source }
    }

    /// Fetch the creator's history and profile it
    pub async fn assess(&self, wallet: &str) -> Outcome<CreatorRiskProfile> {
        let outcome = self.source.creator_history(wallet).await.map(|h| profile(&h));

        if let Outcome::Value(p) = &outcome {
            if p.is_serial_scammer {
                warn!(
                    wallet = %wallet,
                    dead = p.dead_tokens,
                    total = p.total_tokens,
                    "Serial scammer creator"
                );
            } else if p.risk_boost > 0 {
                info!(wallet = %wallet, dead = p.dead_tokens, boost = p.risk_boost, "Risky creator");
            }
        }
        outcome
    }
}
