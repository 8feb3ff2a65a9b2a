//! Fraud Scoring Pipeline Library
//!
//! Real-time anomaly scoring for PaySim-style payment transactions:
//! field validation, feature building, Isolation Forest inference over
//! ONNX artifacts, and verdict persistence behind an HTTP API.

pub mod config;
pub mod error;
pub mod feature_builder;
pub mod metrics;
pub mod models;
pub mod pipeline;
pub mod server;
pub mod store;
pub mod types;
pub mod validator;

pub use config::AppConfig;
pub use error::{FieldError, ScoreError, StoreError};
pub use feature_builder::{FeatureBuilder, FeatureVector};
pub use models::{Inference, ScoringEngine, VerdictAssembler};
pub use pipeline::ScoringPipeline;
pub use store::TransactionStore;
pub use types::{encode_type, TransactionType, ValidatedTransaction, Verdict, VerdictStatus};
pub use validator::FieldValidator;
