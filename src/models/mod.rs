//! Model inference components

pub mod assembler;
pub mod inference;
pub mod loader;
pub mod onnx;

pub use assembler::VerdictAssembler;
pub use inference::{AnomalyModel, FeatureScaler, Inference, ScoringEngine};
pub use loader::ModelLoader;
