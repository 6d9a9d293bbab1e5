//! Snapshot read contract
//!
//! The relational store lives outside this crate. The LP detector only needs
//! two queries from it, expressed by [`SnapshotStore`]. An in-memory
//! implementation backs tests and the probe binary.

use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Point-in-time market state of a token
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub token_id: String,
    pub timestamp: DateTime<Utc>,
    /// Primary liquidity source (USD)
    #[serde(default)]
    pub liquidity_usd: Option<f64>,
    /// DEX-reported liquidity, used when the primary is missing
    #[serde(default)]
    pub dex_liquidity_usd: Option<f64>,
    #[serde(default)]
    pub price_usd: Option<f64>,
    #[serde(default)]
    pub dex_price_usd: Option<f64>,
    /// Growth stage tag assigned by the tracker
    #[serde(default)]
    pub stage: Option<String>,
}

impl Snapshot {
    /// Primary liquidity, falling back to the DEX-reported value
    pub fn liquidity(&self) -> Option<f64> {
        self.liquidity_usd.or(self.dex_liquidity_usd)
    }

    /// Primary price, falling back to the DEX-reported value
    pub fn price(&self) -> Option<f64> {
        self.price_usd.or(self.dex_price_usd)
    }
}

/// Read queries the risk layer needs from persistence
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Up to `limit` snapshots for `token_id`, most recent first
    async fn recent_snapshots(&self, token_id: &str, limit: usize) -> Result<Vec<Snapshot>>;

    /// Largest liquidity ever recorded for `token_id`
    async fn max_liquidity(&self, token_id: &str) -> Result<Option<f64>>;
}

/// Snapshot series held in memory, keyed by token id
#[derive(Debug, Default)]
pub struct MemorySnapshotStore {
    series: DashMap<String, Vec<Snapshot>>,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshots(snapshots: impl IntoIterator<Item = Snapshot>) -> Self {
        let store = Self::new();
        for snapshot in snapshots {
            store.insert(snapshot);
        }
        store
    }

    /// Load a JSON array of snapshots
    pub async fn load_json<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = tokio::fs::read_to_string(path).await?;
        let snapshots: Vec<Snapshot> = serde_json::from_str(&raw).map_err(|e| {
            Error::Storage(format!("Failed to parse snapshots in {}: {}", path.display(), e))
        })?;
        Ok(Self::from_snapshots(snapshots))
    }

    /// Add a snapshot, keeping each series ordered by timestamp
    pub fn insert(&self, snapshot: Snapshot) {
        let mut series = self.series.entry(snapshot.token_id.clone()).or_default();
        let at = series.partition_point(|s| s.timestamp <= snapshot.timestamp);
        series.insert(at, snapshot);
    }

    pub fn len(&self, token_id: &str) -> usize {
        self.series.get(token_id).map_or(0, |s| s.len())
    }
}

#[async_trait]
impl SnapshotStore for MemorySnapshotStore {
    async fn recent_snapshots(&self, token_id: &str, limit: usize) -> Result<Vec<Snapshot>> {
        Ok(self
            .series
            .get(token_id)
            .map(|series| series.iter().rev().take(limit).cloned().collect())
            .unwrap_or_default())
    }

    async fn max_liquidity(&self, token_id: &str) -> Result<Option<f64>> {
        Ok(self.series.get(token_id).and_then(|series| {
            series
                .iter()
                .filter_map(Snapshot::liquidity)
                .fold(None, |max: Option<f64>, l| Some(max.map_or(l, |m| m.max(l))))
        }))
    }
}


#[cfg(test)]
mod tests {
    use super::testing::snapshot;
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn test_recent_snapshots_newest_first() {
        let store = MemorySnapshotStore::from_snapshots(vec![
            snapshot("t", 2, Some(2.0), None),
            snapshot("t", 0, Some(0.5), None),
            snapshot("t", 1, Some(1.0), None),
            snapshot("other", 5, Some(9.0), None),
        ]);

        let recent = store.recent_snapshots("t", 2).await.unwrap();

        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].liquidity(), Some(2.0));
        assert_eq!(recent[1].liquidity(), Some(1.0));
        assert!(store.recent_snapshots("missing", 2).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_max_liquidity_uses_fallback_source() {
        let mut dex_only = snapshot("t", 1, None, None);
        dex_only.dex_liquidity_usd = Some(80.0);
        let store = MemorySnapshotStore::from_snapshots(vec![
            snapshot("t", 0, Some(50.0), None),
            dex_only,
            snapshot("t", 2, None, None),
        ]);

        assert_eq!(store.max_liquidity("t").await.unwrap(), Some(80.0));
        assert_eq!(store.max_liquidity("missing").await.unwrap(), None);
    }

    #[test]
    fn test_fallback_order() {
        let mut s = snapshot("t", 0, Some(10.0), Some(1.0));
        s.dex_liquidity_usd = Some(99.0);
        s.dex_price_usd = Some(9.0);
        assert_eq!(s.liquidity(), Some(10.0));
        assert_eq!(s.price(), Some(1.0));

        s.liquidity_usd = None;
        s.price_usd = None;
        assert_eq!(s.liquidity(), Some(99.0));
        assert_eq!(s.price(), Some(9.0));
    }

    #[tokio::test]
    async fn test_load_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{"token_id":"t","timestamp":"2026-01-01T00:00:00Z","liquidity_usd":100.0}},
                {{"token_id":"t","timestamp":"2026-01-01T00:05:00Z","dex_liquidity_usd":40.0,"price_usd":1.0}}]"#
        )
        .unwrap();

        let store = MemorySnapshotStore::load_json(file.path()).await.unwrap();

        assert_eq!(store.len("t"), 2);
        let recent = store.recent_snapshots("t", 1).await.unwrap();
        assert_eq!(recent[0].liquidity(), Some(40.0));
    }
}
