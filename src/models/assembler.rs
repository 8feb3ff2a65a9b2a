//! Verdict assembly from raw inference output

use crate::models::inference::{Inference, OUTLIER_LABEL};
use crate::types::transaction::ValidatedTransaction;
use crate::types::verdict::{ScoredTransaction, Verdict, VerdictStatus};

/// Maps raw model output onto the stable verdict contract.
///
/// Total and side-effect free.
#[derive(Debug, Default, Clone, Copy)]
pub struct VerdictAssembler;

impl VerdictAssembler {
    pub fn new() -> Self {
        Self
    }

    /// Interpret an inference result.
    ///
    /// Only a raw `-1` counts as an anomaly; any other label is treated as
    /// normal. The score is passed through untouched.
    pub fn assemble(&self, inference: &Inference) -> Verdict {
        match *inference {
            Inference::Scored { label, score } if label == OUTLIER_LABEL => Verdict {
                status: VerdictStatus::Suspicious,
                anomaly_flag: 1,
                anomaly_score: Some(score),
            },
            Inference::Scored { score, .. } => Verdict {
                status: VerdictStatus::Normal,
                anomaly_flag: 0,
                anomaly_score: Some(score),
            },
            Inference::Degraded => Verdict {
                status: VerdictStatus::Unknown,
                anomaly_flag: 0,
                anomaly_score: None,
            },
        }
    }

    /// Pair the verdict with the validated input for the store
    pub fn package(
        &self,
        transaction: ValidatedTransaction,
        inference: &Inference,
    ) -> ScoredTransaction {
        ScoredTransaction {
            transaction,
            verdict: self.assemble(inference),
        }
    }
}
