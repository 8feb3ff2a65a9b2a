//! ONNX artifact loader

use crate::config::ModelsConfig;
use crate::models::onnx::{OnnxIsolationForest, OnnxScaler};
use anyhow::{Context, Result};
use ort::session::{builder::GraphOptimizationLevel, Session};
use std::path::{Path, PathBuf};
use tracing::info;

/// Loaded ONNX session with metadata
pub struct LoadedModel {
    /// Artifact name, for logs and errors
    pub name: String,
    /// ONNX Runtime session
    pub session: Session,
    /// Input name for the model
    pub input_name: String,
}

/// Loader for the scaler and isolation forest exports
pub struct ModelLoader {
    /// Number of threads for ONNX inference
    onnx_threads: usize,
}

impl ModelLoader {
    /// Create a new model loader with specified number of threads
    pub fn with_threads(onnx_threads: usize) -> Result<Self> {
        // Initialize ONNX Runtime
        ort::init().commit()?;
        info!(onnx_threads = onnx_threads, "ONNX Runtime initialized");
        Ok(Self { onnx_threads })
    }

    /// Resolve the scaler and model paths, failing if either file is absent
    pub fn locate_artifacts(config: &ModelsConfig) -> Result<(PathBuf, PathBuf)> {
        let scaler_path = config.scaler_path();
        let model_path = config.model_path();

        for path in [&scaler_path, &model_path] {
            if !path.is_file() {
                anyhow::bail!("Artifact not found: {}", path.display());
            }
        }

        Ok((scaler_path, model_path))
    }

    /// Load a single ONNX session from file
    pub fn load_model<P: AsRef<Path>>(&self, path: P, name: &str) -> Result<LoadedModel> {
        let path = path.as_ref();

        info!(model = %name, path = %path.display(), threads = self.onnx_threads, "Loading ONNX model");

        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(self.onnx_threads)?
            .commit_from_file(path)
            .context(format!("Failed to load model from {:?}", path))?;

        let input_name = session
            .inputs
            .first()
            .map(|i| i.name.clone())
            .unwrap_or_else(|| "X".to_string());

        let outputs: Vec<String> = session.outputs.iter().map(|o| o.name.clone()).collect();

        info!(
            model = %name,
            input = %input_name,
            outputs = ?outputs,
            "Model loaded successfully"
        );

        Ok(LoadedModel {
            name: name.to_string(),
            session,
            input_name,
        })
    }

    /// Load both artifacts. Either failing fails the whole load.
    pub fn load_artifacts(
        &self,
        config: &ModelsConfig,
    ) -> Result<(OnnxScaler, OnnxIsolationForest)> {
        let (scaler_path, model_path) = Self::locate_artifacts(config)?;

        let scaler = self
            .load_model(&scaler_path, "scaler")
            .context("Failed to load feature scaler")?;
        let model = self
            .load_model(&model_path, "isolation_forest")
            .context("Failed to load anomaly model")?;

        Ok((
            OnnxScaler::new(scaler, &config.scaler_output),
            OnnxIsolationForest::new(model, &config.label_output, &config.score_output),
        ))
    }
}
