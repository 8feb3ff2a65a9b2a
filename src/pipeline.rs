//! End-to-end scoring of a single raw transaction.

use crate::error::ScoreError;
use crate::feature_builder::FeatureBuilder;
use crate::models::assembler::VerdictAssembler;
use crate::models::inference::ScoringEngine;
use crate::types::verdict::ScoredTransaction;
use crate::validator::FieldValidator;
use serde_json::{Map, Value};
use tracing::debug;

/// Validation, feature building, inference and verdict assembly.
///
/// Holds no per-call state; one instance serves all concurrent requests.
pub struct ScoringPipeline {
    validator: FieldValidator,
    builder: FeatureBuilder,
    engine: ScoringEngine,
    assembler: VerdictAssembler,
}

impl ScoringPipeline {
    pub fn new(engine: ScoringEngine) -> Self {
        Self {
            validator: FieldValidator::new(),
            builder: FeatureBuilder::new(),
            engine,
            assembler: VerdictAssembler::new(),
        }
    }

    pub fn engine(&self) -> &ScoringEngine {
        &self.engine
    }

    /// Score a raw JSON payload. Anything other than an object is treated as
    /// an empty mapping and rejected on the first required field.
    pub fn score(&self, input: &Value) -> Result<ScoredTransaction, ScoreError> {
        match input {
            Value::Object(map) => self.score_fields(map),
            _ => self.score_fields(&Map::new()),
        }
    }

    /// Score a raw field mapping.
    ///
    /// Validation failures return before any feature or inference work.
    pub fn score_fields(
        &self,
        input: &Map<String, Value>,
    ) -> Result<ScoredTransaction, ScoreError> {
        let transaction = self.validator.validate(input)?;
        let features = self.builder.build(&transaction);
        let inference = self.engine.infer(&features)?;
        let scored = self.assembler.package(transaction, &inference);

        debug!(
            status = %scored.verdict.status,
            anomaly_score = ?scored.verdict.anomaly_score,
            "Transaction scored"
        );

        Ok(scored)
    }
}
