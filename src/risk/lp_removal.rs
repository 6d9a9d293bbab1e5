//! LP Removal Detector
//!
//! Compares the two most recent snapshots of a token and flags sharp
//! liquidity drops that are not explained by price discovery. Also reports
//! the drawdown of current liquidity from its all-time peak.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::outcome::{AbsenceReason, Outcome};
use crate::storage::{Snapshot, SnapshotStore};

/// Liquidity change (percent) at or below which a drop is evaluated
pub const REMOVAL_GATE_PCT: f64 = -20.0;

/// A price drop at least this fraction of the liquidity drop reads as organic selling
pub const ORGANIC_PRICE_RATIO: f64 = 0.5;

/// Removed share (percent) from which a removal is critical
pub const CRITICAL_REMOVAL_PCT: f64 = 30.0;

/// Removed share (percent) from which a critical removal takes the heavy penalty
pub const SEVERE_REMOVAL_PCT: f64 = 50.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RemovalSeverity {
    Warning,
    Critical,
}

impl RemovalSeverity {
    /// Severity and score impact for a removed share `removed_pct`
    pub fn classify(removed_pct: f64) -> (Self, i32) {
        if removed_pct >= SEVERE_REMOVAL_PCT {
            (RemovalSeverity::Critical, -25)
        } else if removed_pct >= CRITICAL_REMOVAL_PCT {
            (RemovalSeverity::Critical, -15)
        } else {
            (RemovalSeverity::Warning, -8)
        }
    }
}

/// Detected liquidity-removal incident
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LpRemovalEvent {
    pub token_id: String,
    /// Share of liquidity removed between the two snapshots, 0..=100
    pub removed_pct: f64,
    pub severity: RemovalSeverity,
    /// Raw per-check score delta, always negative
    pub score_impact: i32,
    pub liquidity_before: f64,
    pub liquidity_after: f64,
    /// Price move over the same window, when both prices were known
    pub price_change_pct: Option<f64>,
}

/// Drawdown of current liquidity from the recorded peak
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CumulativeRemoval {
    pub peak_liquidity: f64,
    pub current_liquidity: f64,
    /// Floored at 0, rounded to two decimals
    pub removed_pct: f64,
}

fn change_pct(before: f64, after: f64) -> f64 {
    (after - before) / before * 100.0
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Classify the move from `previous` to `current`
pub fn classify_removal(previous: &Snapshot, current: &Snapshot) -> Outcome<LpRemovalEvent> {
    let (Some(before), Some(after)) = (previous.liquidity(), current.liquidity()) else {
        return AbsenceReason::MissingLiquidity.into();
    };
    if before <= 0.0 || after <= 0.0 {
        return AbsenceReason::NonPositiveLiquidity.into();
    }

    let liquidity_change_pct = change_pct(before, after);
    if liquidity_change_pct > REMOVAL_GATE_PCT {
        return AbsenceReason::BelowRemovalThreshold {
            change_pct: liquidity_change_pct,
        }
        .into();
    }

    let price_change_pct = match (previous.price(), current.price()) {
        (Some(p0), Some(p1)) if p0 > 0.0 && p1 > 0.0 => Some(change_pct(p0, p1)),
        _ => None,
    };

    // Price fell along with liquidity: sellers, not the deployer
    if let Some(price_change_pct) = price_change_pct {
        if price_change_pct < liquidity_change_pct * ORGANIC_PRICE_RATIO {
            return AbsenceReason::OrganicSelling {
                liquidity_change_pct,
                price_change_pct,
            }
            .into();
        }
    }

    let removed_pct = liquidity_change_pct.abs();
    let (severity, score_impact) = RemovalSeverity::classify(removed_pct);

    Outcome::Value(LpRemovalEvent {
        token_id: current.token_id.clone(),
        removed_pct,
        severity,
        score_impact,
        liquidity_before: before,
        liquidity_after: after,
        price_change_pct,
    })
}

/// Drawdown from `peak` to the liquidity of `latest`
pub fn cumulative_removal(peak: Option<f64>, latest: Option<&Snapshot>) -> Outcome<CumulativeRemoval> {
    let Some(latest) = latest else {
        return AbsenceReason::InsufficientSnapshots { found: 0 }.into();
    };
    let peak = match peak {
        Some(p) if p > 0.0 => p,
        _ => return AbsenceReason::UnknownPeak.into(),
    };
    let Some(current) = latest.liquidity() else {
        return AbsenceReason::MissingLiquidity.into();
    };

    Outcome::Value(CumulativeRemoval {
        peak_liquidity: peak,
        current_liquidity: current,
        removed_pct: round2(((peak - current) / peak * 100.0).max(0.0)),
    })
}

/// Detector bound to the snapshot store
pub struct LpRemovalDetector {
    store: Arc<dyn SnapshotStore>,
}

impl LpRemovalDetector {
    pub fn new(store: Arc<dyn SnapshotStore>) -> Self {
        Self { store }
    }

    /// Check the two most recent snapshots of `token_id` for a removal
    pub async fn detect(&self, token_id: &str) -> Outcome<LpRemovalEvent> {
        let snapshots = match self.store.recent_snapshots(token_id, 2).await {
            Ok(s) => s,
            Err(e) => {
                warn!(token = %token_id, error = %e, "Failed to read snapshots");
                return AbsenceReason::Storage {
                    message: e.to_string(),
                }
                .into();
            }
        };

        let [current, previous, ..] = snapshots.as_slice() else {
            debug!(token = %token_id, found = snapshots.len(), "Not enough snapshots for LP check");
            return AbsenceReason::InsufficientSnapshots {
                found: snapshots.len(),
            }
            .into();
        };

        let outcome = classify_removal(previous, current);
        match &outcome {
            Outcome::Value(event) if event.severity == RemovalSeverity::Critical => warn!(
                token = %token_id,
                removed_pct = event.removed_pct,
                impact = event.score_impact,
                "Critical LP removal detected"
            ),
            Outcome::Value(event) => info!(
                token = %token_id,
                removed_pct = event.removed_pct,
                impact = event.score_impact,
                "LP removal detected"
            ),
            Outcome::Absent(reason) => debug!(token = %token_id, ?reason, "No LP removal"),
        }
        outcome
    }

    /// Drawdown of the latest liquidity from the all-time peak
    pub async fn cumulative(&self, token_id: &str) -> Outcome<CumulativeRemoval> {
        let storage_absent = |e: crate::error::Error| {
            warn!(token = %token_id, error = %e, "Failed to read liquidity history");
            AbsenceReason::Storage {
                message: e.to_string(),
            }
        };

        let latest = match self.store.recent_snapshots(token_id, 1).await {
            Ok(s) => s,
            Err(e) => return storage_absent(e).into(),
        };
        let peak = match self.store.max_liquidity(token_id).await {
            Ok(p) => p,
            Err(e) => return storage_absent(e).into(),
        };

        cumulative_removal(peak, latest.first())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, Result};
    use crate::storage::testing::snapshot;
    use crate::storage::MemorySnapshotStore;
    use async_trait::async_trait;

    fn pair(l0: f64, l1: f64, p0: Option<f64>, p1: Option<f64>) -> (Snapshot, Snapshot) {
        (snapshot("tok", 0, Some(l0), p0), snapshot("tok", 1, Some(l1), p1))
    }

    #[test]
    fn test_small_drop_is_no_signal() {
        let (prev, curr) = pair(50_000.0, 45_000.0, Some(1.0), Some(1.0));
        match classify_removal(&prev, &curr) {
            Outcome::Absent(AbsenceReason::BelowRemovalThreshold { change_pct }) => {
                assert!((change_pct + 10.0).abs() < 1e-9)
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn test_increase_is_no_signal() {
        let (prev, curr) = pair(50_000.0, 80_000.0, None, None);
        assert!(!classify_removal(&prev, &curr).is_value());
    }

    #[test]
    fn test_sixty_percent_drop_stable_price_is_critical() {
        let (prev, curr) = pair(100_000.0, 40_000.0, Some(1.0), Some(0.95));

        let event = classify_removal(&prev, &curr).into_value().unwrap();

        assert_eq!(event.severity, RemovalSeverity::Critical);
        assert_eq!(event.score_impact, -25);
        assert!((event.removed_pct - 60.0).abs() < 1e-9);
        assert_eq!(event.token_id, "tok");
    }

    #[test]
    fn test_proportional_price_drop_is_organic() {
        let (prev, curr) = pair(100_000.0, 50_000.0, Some(1.0), Some(0.3));
        assert!(matches!(
            classify_removal(&prev, &curr),
            Outcome::Absent(AbsenceReason::OrganicSelling { .. })
        ));
    }

    #[test]
    fn test_severity_bands() {
        let (prev, curr) = pair(100_000.0, 65_000.0, None, None);
        let event = classify_removal(&prev, &curr).into_value().unwrap();
        assert_eq!((event.severity, event.score_impact), (RemovalSeverity::Critical, -15));
        assert_eq!(event.price_change_pct, None);

        let (prev, curr) = pair(100_000.0, 75_000.0, Some(1.0), Some(0.99));
        let event = classify_removal(&prev, &curr).into_value().unwrap();
        assert_eq!((event.severity, event.score_impact), (RemovalSeverity::Warning, -8));

        assert_eq!(RemovalSeverity::classify(50.0), (RemovalSeverity::Critical, -25));
        assert_eq!(RemovalSeverity::classify(30.0), (RemovalSeverity::Critical, -15));
    }

    #[test]
    fn test_twenty_percent_drop_is_warning() {
        let (prev, curr) = pair(100_000.0, 80_000.0, Some(1.0), Some(1.0));

        let event = classify_removal(&prev, &curr).into_value().unwrap();

        assert_eq!((event.severity, event.score_impact), (RemovalSeverity::Warning, -8));
        assert_eq!(event.removed_pct, 20.0);
        assert_eq!(event.price_change_pct, Some(0.0));
    }

    #[test]
    fn test_organic_selling_boundary() {
        // 40% liquidity drop: organic once the price falls more than 20%
        let (prev, curr) = pair(100_000.0, 60_000.0, Some(1.0), Some(0.82));
        let event = classify_removal(&prev, &curr).into_value().unwrap();
        assert_eq!((event.severity, event.score_impact), (RemovalSeverity::Critical, -15));

        let (prev, curr) = pair(100_000.0, 60_000.0, Some(1.0), Some(0.78));
        match classify_removal(&prev, &curr) {
            Outcome::Absent(AbsenceReason::OrganicSelling {
                liquidity_change_pct,
                price_change_pct,
            }) => {
                assert!((liquidity_change_pct + 40.0).abs() < 1e-9);
                assert!((price_change_pct + 22.0).abs() < 1e-9);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn test_non_positive_liquidity_guard() {
        let (prev, curr) = pair(0.0, 10.0, None, None);
        assert_eq!(classify_removal(&prev, &curr), Outcome::Absent(AbsenceReason::NonPositiveLiquidity));

        let (prev, curr) = pair(10.0, 0.0, None, None);
        assert_eq!(classify_removal(&prev, &curr), Outcome::Absent(AbsenceReason::NonPositiveLiquidity));
    }

    #[test]
    fn test_fallback_liquidity_source() {
        let prev = snapshot("tok", 0, Some(100_000.0), None);
        let mut curr = snapshot("tok", 1, None, None);
        curr.dex_liquidity_usd = Some(30_000.0);

        let event = classify_removal(&prev, &curr).into_value().unwrap();
        assert_eq!(event.liquidity_after, 30_000.0);
        assert_eq!(event.score_impact, -25);
    }

    #[test]
    fn test_classification_is_deterministic() {
        let (prev, curr) = pair(100_000.0, 40_000.0, Some(1.0), Some(0.95));
        assert_eq!(classify_removal(&prev, &curr), classify_removal(&prev, &curr));
    }

    #[test]
    fn test_cumulative_from_peak() {
        let latest = snapshot("tok", 3, Some(60_000.0), None);
        let removal = cumulative_removal(Some(100_000.0), Some(&latest)).into_value().unwrap();
        assert!((removal.removed_pct - 40.0).abs() <= 1.0);

        let removal = cumulative_removal(Some(50_000.0), Some(&latest)).into_value().unwrap();
        assert_eq!(removal.removed_pct, 0.0);

        assert_eq!(cumulative_removal(Some(0.0), Some(&latest)), Outcome::Absent(AbsenceReason::UnknownPeak));
        assert_eq!(cumulative_removal(None, Some(&latest)), Outcome::Absent(AbsenceReason::UnknownPeak));
        assert_eq!(
            cumulative_removal(Some(1.0), None),
            Outcome::Absent(AbsenceReason::InsufficientSnapshots { found: 0 })
        );
    }

    #[tokio::test]
    async fn test_detector_reads_two_latest() {
        let store = Arc::new(MemorySnapshotStore::from_snapshots(vec![
            snapshot("tok", 0, Some(500_000.0), Some(1.0)),
            snapshot("tok", 1, Some(100_000.0), Some(1.0)),
            snapshot("tok", 2, Some(40_000.0), Some(0.95)),
        ]));
        let detector = LpRemovalDetector::new(store);

        let event = detector.detect("tok").await.into_value().unwrap();
        assert_eq!(event.liquidity_before, 100_000.0);
        assert_eq!(event.score_impact, -25);

        let cumulative = detector.cumulative("tok").await.into_value().unwrap();
        assert_eq!(cumulative.peak_liquidity, 500_000.0);
        assert_eq!(cumulative.removed_pct, 92.0);
    }

    #[tokio::test]
    async fn test_detector_insufficient_snapshots() {
        let store = Arc::new(MemorySnapshotStore::from_snapshots(vec![snapshot(
            "tok",
            0,
            Some(1.0),
            None,
        )]));
        let detector = LpRemovalDetector::new(store);

        assert_eq!(
            detector.detect("tok").await,
            Outcome::Absent(AbsenceReason::InsufficientSnapshots { found: 1 })
        );
        assert_eq!(
            detector.cumulative("none").await,
            Outcome::Absent(AbsenceReason::InsufficientSnapshots { found: 0 })
        );
    }

    struct BrokenStore;

    #[async_trait]
    impl SnapshotStore for BrokenStore {
        async fn recent_snapshots(&self, _: &str, _: usize) -> Result<Vec<Snapshot>> {
            Err(Error::Storage("connection refused".to_string()))
        }

        async fn max_liquidity(&self, _: &str) -> Result<Option<f64>> {
            Err(Error::Storage("connection refused".to_string()))
        }
    }

    #[tokio::test]
    async fn test_store_failure_is_absent() {
        let detector = LpRemovalDetector::new(Arc::new(BrokenStore));
        assert!(matches!(
            detector.detect("tok").await,
            Outcome::Absent(AbsenceReason::Storage { .. })
        ));
        assert!(matches!(
            detector.cumulative("tok").await,
            Outcome::Absent(AbsenceReason::Storage { .. })
        ));
    }
}
