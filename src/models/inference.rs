//! Anomaly scoring engine
//!
//! Owns the fitted scaler and isolation forest. The engine is either
//! `Ready` or `Degraded`, decided once at startup and never changed.

use crate::config::ModelsConfig;
use crate::feature_builder::FeatureVector;
use crate::models::loader::ModelLoader;
use anyhow::Result;
use tracing::{debug, info, warn};

/// Raw isolation forest label for an outlier
pub const OUTLIER_LABEL: i64 = -1;

/// Fitted feature transform applied before inference.
///
/// Implementations must be read-only: concurrent calls share one instance.
pub trait FeatureScaler: Send + Sync {
    fn transform(&self, features: &FeatureVector) -> Result<FeatureVector>;
}

/// Fitted unsupervised anomaly detector.
pub trait AnomalyModel: Send + Sync {
    /// Raw label: `-1` outlier, `+1` inlier
    fn predict(&self, scaled: &FeatureVector) -> Result<i64>;

    /// Decision function value, passed through without reinterpretation
    fn decision_score(&self, scaled: &FeatureVector) -> Result<f64>;

    /// Label and score together. Backends that produce both in one pass
    /// should override this.
    fn evaluate(&self, scaled: &FeatureVector) -> Result<(i64, f64)> {
        Ok((self.predict(scaled)?, self.decision_score(scaled)?))
    }
}

/// Outcome of a single inference call
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Inference {
    /// Model ran on the scaled features
    Scored { label: i64, score: f64 },
    /// No model available; nothing was computed
    Degraded,
}

enum EngineState {
    Ready {
        scaler: Box<dyn FeatureScaler>,
        model: Box<dyn AnomalyModel>,
    },
    Degraded {
        reason: String,
    },
}

/// Scaler + model pair, or the degraded stand-in when they failed to load.
pub struct ScoringEngine {
    state: EngineState,
}

impl ScoringEngine {
    /// Load the ONNX artifacts named by the configuration.
    ///
    /// Never fails: a load error is logged once and yields a degraded engine
    /// for the rest of the process lifetime.
    pub fn load(config: &ModelsConfig) -> Self {
        let loaded = ModelLoader::locate_artifacts(config)
            .and_then(|_| ModelLoader::with_threads(config.onnx_threads))
            .and_then(|loader| loader.load_artifacts(config));

        match loaded {
            Ok((scaler, model)) => {
                info!(
                    models_dir = %config.models_dir,
                    model = %config.model_file,
                    scaler = %config.scaler_file,
                    "Scoring engine ready"
                );
                Self::ready(Box::new(scaler), Box::new(model))
            }
            Err(e) => {
                warn!(
                    error = %format!("{e:#}"),
                    "Model/scaler could not be loaded, scoring in degraded mode"
                );
                Self::degraded(format!("{e:#}"))
            }
        }
    }

    /// Engine backed by already-loaded components
    pub fn ready(scaler: Box<dyn FeatureScaler>, model: Box<dyn AnomalyModel>) -> Self {
        Self {
            state: EngineState::Ready { scaler, model },
        }
    }

    /// Engine that never computes a verdict
    pub fn degraded(reason: impl Into<String>) -> Self {
        Self {
            state: EngineState::Degraded {
                reason: reason.into(),
            },
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.state, EngineState::Ready { .. })
    }

    /// Why the artifacts failed to load, if they did
    pub fn degraded_reason(&self) -> Option<&str> {
        match &self.state {
            EngineState::Ready { .. } => None,
            EngineState::Degraded { reason } => Some(reason.as_str()),
        }
    }

    /// Scale the features and run the model.
    ///
    /// Errors only come from the model runtime; a degraded engine always
    /// returns [`Inference::Degraded`].
    pub fn infer(&self, features: &FeatureVector) -> Result<Inference> {
        match &self.state {
            EngineState::Ready { scaler, model } => {
                let scaled = scaler.transform(features)?;
                let (label, score) = model.evaluate(&scaled)?;
                debug!(label = label, score = score, "Inference complete");
                Ok(Inference::Scored { label, score })
            }
            EngineState::Degraded { .. } => Ok(Inference::Degraded),
        }
    }
}
