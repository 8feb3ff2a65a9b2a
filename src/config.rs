//! Configuration management for the scoring service

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::Path;

/// Default configuration file, relative to the working directory
pub const DEFAULT_CONFIG_PATH: &str = "config/config.toml";

/// Environment variable that overrides the configuration file path
pub const CONFIG_PATH_ENV: &str = "FRAUD_SCORING_CONFIG";

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub models: ModelsConfig,
    pub storage: StorageConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    pub logging: LoggingConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Interface to bind
    pub host: String,
    /// TCP port to bind
    pub port: u16,
    /// Allowed CORS origins (empty = allow any)
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

/// Model and scaler artifact configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ModelsConfig {
    /// Directory containing the ONNX artifacts
    pub models_dir: String,
    /// Isolation forest export
    #[serde(default = "default_model_file")]
    pub model_file: String,
    /// Feature scaler export
    #[serde(default = "default_scaler_file")]
    pub scaler_file: String,
    /// Scaler output holding the transformed features
    #[serde(default = "default_scaler_output")]
    pub scaler_output: String,
    /// Model output holding the raw -1/+1 prediction
    #[serde(default = "default_label_output")]
    pub label_output: String,
    /// Model output holding the decision function
    #[serde(default = "default_score_output")]
    pub score_output: String,
    /// Number of threads for ONNX inference per session (default: 1)
    #[serde(default = "default_onnx_threads")]
    pub onnx_threads: usize,
}

fn default_model_file() -> String {
    "isolation_forest_paysim.onnx".to_string()
}

fn default_scaler_file() -> String {
    "scaler_paysim.onnx".to_string()
}

fn default_scaler_output() -> String {
    "variable".to_string()
}

fn default_label_output() -> String {
    "label".to_string()
}

fn default_score_output() -> String {
    "scores".to_string()
}

fn default_onnx_threads() -> usize {
    1
}

impl ModelsConfig {
    /// Full path of the model artifact
    pub fn model_path(&self) -> std::path::PathBuf {
        Path::new(&self.models_dir).join(&self.model_file)
    }

    /// Full path of the scaler artifact
    pub fn scaler_path(&self) -> std::path::PathBuf {
        Path::new(&self.models_dir).join(&self.scaler_file)
    }
}

/// Transaction store configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// SQLite database file (":memory:" for an ephemeral store)
    pub database_path: String,
}

/// Metrics reporting configuration
#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    /// Seconds between logged summaries (0 disables the reporter)
    #[serde(default = "default_report_interval")]
    pub report_interval_secs: u64,
}

fn default_report_interval() -> u64 {
    60
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            report_interval_secs: default_report_interval(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Log format (json, pretty)
    pub format: String,
}

impl AppConfig {
    /// Load configuration from the default path, or the one named by
    /// `FRAUD_SCORING_CONFIG`
    pub fn load() -> Result<Self> {
        let path =
            std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load_from_path(path)
    }

    /// Load configuration from a specific path, with `FRAUD__SECTION__KEY`
    /// environment overrides
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(Environment::with_prefix("FRAUD").separator("__"))
            .build()
            .context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    /// Socket address string for the HTTP listener
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 5000,
                allowed_origins: Vec::new(),
            },
            models: ModelsConfig {
                models_dir: "models".to_string(),
                model_file: default_model_file(),
                scaler_file: default_scaler_file(),
                scaler_output: default_scaler_output(),
                label_output: default_label_output(),
                score_output: default_score_output(),
                onnx_threads: default_onnx_threads(),
            },
            storage: StorageConfig {
                database_path: "fraud_guardian.db".to_string(),
            },
            metrics: MetricsConfig::default(),
            logging: LoggingConfig {
                level: "info".to_string(),
                format: "pretty".to_string(),
            },
        }
    }
}
