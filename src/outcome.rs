//! Value-or-reason results for fail-open risk signals
//!
//! Every analyzer answers with an [`Outcome`]: either the signal value or a
//! typed [`AbsenceReason`] saying why no signal was produced. Absence is not
//! an error; the scoring engine decides how to weigh it.

use serde::Serialize;

use crate::provider::{ProviderError, ProviderErrorKind};

/// A signal value or the reason it is absent
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum Outcome<T> {
    Value(T),
    Absent(AbsenceReason),
}

/// Why an analyzer produced no signal
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum AbsenceReason {
    /// Fewer than two snapshots recorded for the token
    InsufficientSnapshots { found: usize },
    /// One of the compared snapshots had zero or negative liquidity
    NonPositiveLiquidity,
    /// Neither liquidity source was populated
    MissingLiquidity,
    /// Liquidity moved, but not by enough to count as a removal
    BelowRemovalThreshold { change_pct: f64 },
    /// Liquidity fell together with price: organic selling
    OrganicSelling {
        liquidity_change_pct: f64,
        price_change_pct: f64,
    },
    /// No usable peak liquidity on record
    UnknownPeak,
    /// The token's creator wallet is not known
    UnknownCreator,
    /// The pool provider returned no candidate pools
    NoCandidatePools,
    /// The holder provider returned no holders
    NoHolders,
    /// The wallet has no trades to measure
    NoTrades,
    /// The caller's score is below the holder-analysis gate
    BelowScoreGate { score: f64, gate: f64 },
    /// A provider call failed (after retries where applicable)
    Provider {
        provider: String,
        kind: ProviderErrorKind,
    },
    /// The snapshot store could not be read
    Storage { message: String },
}

impl AbsenceReason {
    pub fn provider(provider: &str, error: &ProviderError) -> Self {
        AbsenceReason::Provider {
            provider: provider.to_string(),
            kind: error.kind(),
        }
    }
}

impl<T> Outcome<T> {
    pub fn value(&self) -> Option<&T> {
        match self {
            Outcome::Value(v) => Some(v),
            Outcome::Absent(_) => None,
        }
    }

    pub fn into_value(self) -> Option<T> {
        match self {
            Outcome::Value(v) => Some(v),
            Outcome::Absent(_) => None,
        }
    }

    pub fn reason(&self) -> Option<&AbsenceReason> {
        match self {
            Outcome::Value(_) => None,
            Outcome::Absent(r) => Some(r),
        }
    }

    pub fn is_value(&self) -> bool {
        matches!(self, Outcome::Value(_))
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Outcome<U> {
        match self {
            Outcome::Value(v) => Outcome::Value(f(v)),
            Outcome::Absent(r) => Outcome::Absent(r),
        }
    }
}

impl<T> From<AbsenceReason> for Outcome<T> {
    fn from(reason: AbsenceReason) -> Self {
        Outcome::Absent(reason)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accessors() {
        let present: Outcome<u32> = Outcome::Value(7);
        assert_eq!(present.value(), Some(&7));
        assert!(present.reason().is_none());
        assert_eq!(present.map(|v| v * 2).into_value(), Some(14));

        let absent: Outcome<u32> = AbsenceReason::NoHolders.into();
        assert!(!absent.is_value());
        assert_eq!(absent.reason(), Some(&AbsenceReason::NoHolders));
    }

    #[test]
    fn test_serializes_reason_tag() {
        let absent: Outcome<u32> = Outcome::Absent(AbsenceReason::InsufficientSnapshots { found: 1 });
        let json = serde_json::to_value(&absent).unwrap();
        assert_eq!(json["status"], "absent");
        assert_eq!(json["detail"]["reason"], "insufficient_snapshots");
        assert_eq!(json["detail"]["found"], 1);
    }
}
