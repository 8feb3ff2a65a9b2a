//! Verdict data structures handed to the persistence layer

use crate::types::transaction::ValidatedTransaction;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Business-facing outcome of a scoring call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VerdictStatus {
    /// Model flagged the transaction as an outlier
    Suspicious,
    /// Model considered the transaction an inlier
    Normal,
    /// Model unavailable; no verdict computed
    Unknown,
}

impl VerdictStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            VerdictStatus::Suspicious => "Suspicious",
            VerdictStatus::Normal => "Normal",
            VerdictStatus::Unknown => "Unknown",
        }
    }

    /// Parse the stored spelling back into a status
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "Suspicious" => Some(VerdictStatus::Suspicious),
            "Normal" => Some(VerdictStatus::Normal),
            "Unknown" => Some(VerdictStatus::Unknown),
            _ => None,
        }
    }
}

impl fmt::Display for VerdictStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Final verdict for one transaction. Created once and never mutated.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    pub status: VerdictStatus,
    /// 1 when the model flagged an anomaly, otherwise 0
    pub anomaly_flag: u8,
    /// Raw decision-function value; `None` in degraded mode
    pub anomaly_score: Option<f64>,
}

impl Verdict {
    pub fn is_anomaly(&self) -> bool {
        self.anomaly_flag == 1
    }
}

/// Validated input plus its verdict, ready to be persisted.
///
/// Carries no identity; the store assigns id and timestamp.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredTransaction {
    pub transaction: ValidatedTransaction,
    pub verdict: Verdict,
}
