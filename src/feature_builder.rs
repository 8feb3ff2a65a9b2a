//! Feature assembly for isolation forest inference.
//!
//! The vector layout matches the column order the scaler and model were
//! fit on in the PaySim training pipeline; reordering it silently corrupts
//! every prediction.

use crate::types::transaction::ValidatedTransaction;
use anyhow::{ensure, Result};

/// Number of model input features
pub const FEATURE_COUNT: usize = 7;

/// Feature names in model input order
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "step",
    "type",
    "amount",
    "oldbalanceOrg",
    "newbalanceOrig",
    "oldbalanceDest",
    "newbalanceDest",
];

/// Ordered model input: `[step, typeCode, amount, oldbalanceOrg,
/// newbalanceOrig, oldbalanceDest, newbalanceDest]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureVector([f64; FEATURE_COUNT]);

impl FeatureVector {
    pub fn new(values: [f64; FEATURE_COUNT]) -> Self {
        Self(values)
    }

    /// Build from a model output buffer, which must hold exactly
    /// [`FEATURE_COUNT`] values
    pub fn from_f32_slice(data: &[f32]) -> Result<Self> {
        ensure!(
            data.len() == FEATURE_COUNT,
            "expected {} features, got {}",
            FEATURE_COUNT,
            data.len()
        );
        let mut values = [0.0; FEATURE_COUNT];
        for (slot, v) in values.iter_mut().zip(data) {
            *slot = f64::from(*v);
        }
        Ok(Self(values))
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    /// Single-precision copy for ONNX input tensors
    pub fn to_f32_vec(&self) -> Vec<f32> {
        self.0.iter().map(|&v| v as f32).collect()
    }
}

/// Turns validated transactions into model input vectors.
pub struct FeatureBuilder;

impl FeatureBuilder {
    /// Create a new feature builder.
    pub fn new() -> Self {
        Self
    }

    /// Build the feature vector for a validated transaction.
    ///
    /// Infallible: the input has already passed validation.
    pub fn build(&self, tx: &ValidatedTransaction) -> FeatureVector {
        FeatureVector([
            tx.step,
            f64::from(tx.transaction_type().code()),
            tx.amount,
            tx.old_balance_org,
            tx.new_balance_orig,
            tx.old_balance_dest,
            tx.new_balance_dest,
        ])
    }

    /// Get the number of features produced.
    pub fn feature_count(&self) -> usize {
        FEATURE_COUNT
    }

    /// Get feature names (matching training order).
    pub fn feature_names(&self) -> &'static [&'static str] {
        &FEATURE_NAMES
    }
}

impl Default for FeatureBuilder {
    fn default() -> Self {
        Self::new()
    }
}
