//! Risk analyzers
//!
//! Each analyzer returns [`Outcome`](crate::outcome::Outcome) values and never
//! fails the caller: missing data or provider trouble becomes a typed absence.

pub mod creator;
pub mod holders;
pub mod lp_removal;
pub mod monitor;

pub use creator::{CreatorRiskProfile, CreatorRiskProfiler};
pub use holders::{HolderAnalysisConfig, HolderPnlAggregate, HolderPnlAnalyzer};
pub use lp_removal::{CumulativeRemoval, LpRemovalDetector, LpRemovalEvent, RemovalSeverity};
pub use monitor::{max_risk_score, RiskMonitor, TokenRiskReport, TokenTarget};
