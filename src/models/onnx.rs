//! ONNX Runtime backends for the scaler and isolation forest.
//!
//! Both expect scikit-learn exports taking a `[1, 7]` float tensor. A session
//! needs exclusive access while running, so each one sits behind a mutex.

use crate::feature_builder::{FeatureVector, FEATURE_COUNT};
use crate::models::inference::{AnomalyModel, FeatureScaler};
use crate::models::loader::LoadedModel;
use anyhow::{Context, Result};
use ort::value::Tensor;
use std::sync::Mutex;

fn input_tensor(features: &FeatureVector) -> Result<Tensor<f32>> {
    let shape = vec![1_i64, FEATURE_COUNT as i64];
    Tensor::from_array((shape, features.to_f32_vec())).context("Failed to create input tensor")
}

/// Fitted StandardScaler export
pub struct OnnxScaler {
    model: Mutex<LoadedModel>,
    output_name: String,
}

impl OnnxScaler {
    pub fn new(model: LoadedModel, output_name: &str) -> Self {
        Self {
            model: Mutex::new(model),
            output_name: output_name.to_string(),
        }
    }
}

impl FeatureScaler for OnnxScaler {
    fn transform(&self, features: &FeatureVector) -> Result<FeatureVector> {
        let input = input_tensor(features)?;

        let mut guard = self
            .model
            .lock()
            .map_err(|e| anyhow::anyhow!("Lock error: {}", e))?;
        let model = &mut *guard;

        let outputs = model
            .session
            .run(ort::inputs![&model.input_name => input])?;

        let output = outputs.get(self.output_name.as_str()).with_context(|| {
            format!("{} has no output '{}'", model.name, self.output_name)
        })?;
        let (_, data) = output.try_extract_tensor::<f32>()?;

        FeatureVector::from_f32_slice(data)
    }
}

/// Fitted IsolationForest export with `label` and `scores` outputs
pub struct OnnxIsolationForest {
    model: Mutex<LoadedModel>,
    label_output: String,
    score_output: String,
}

impl OnnxIsolationForest {
    pub fn new(model: LoadedModel, label_output: &str, score_output: &str) -> Self {
        Self {
            model: Mutex::new(model),
            label_output: label_output.to_string(),
            score_output: score_output.to_string(),
        }
    }
}

impl AnomalyModel for OnnxIsolationForest {
    fn predict(&self, scaled: &FeatureVector) -> Result<i64> {
        self.evaluate(scaled).map(|(label, _)| label)
    }

    fn decision_score(&self, scaled: &FeatureVector) -> Result<f64> {
        self.evaluate(scaled).map(|(_, score)| score)
    }

    /// One session run yields both outputs
    fn evaluate(&self, scaled: &FeatureVector) -> Result<(i64, f64)> {
        let input = input_tensor(scaled)?;

        let mut guard = self
            .model
            .lock()
            .map_err(|e| anyhow::anyhow!("Lock error: {}", e))?;
        let model = &mut *guard;

        let outputs = model
            .session
            .run(ort::inputs![&model.input_name => input])?;

        let label_value = outputs.get(self.label_output.as_str()).with_context(|| {
            format!("{} has no output '{}'", model.name, self.label_output)
        })?;
        let (_, labels) = label_value.try_extract_tensor::<i64>()?;
        let label = *labels.first().context("Empty label output")?;

        let score_value = outputs.get(self.score_output.as_str()).with_context(|| {
            format!("{} has no output '{}'", model.name, self.score_output)
        })?;
        let (_, scores) = score_value.try_extract_tensor::<f32>()?;
        let score = f64::from(*scores.first().context("Empty score output")?);

        Ok((label, score))
    }
}
