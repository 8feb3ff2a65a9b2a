//! Error types surfaced by the scoring pipeline and the transaction store

use thiserror::Error;

/// Rejection of a raw transaction before any feature work is done.
///
/// The display text is the client-facing message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldError {
    #[error("Missing field '{0}'")]
    MissingField(&'static str),
    #[error("Invalid numeric value for '{0}'")]
    InvalidNumericField(&'static str),
}

impl FieldError {
    /// Name of the offending input field
    pub fn field(&self) -> &'static str {
        match self {
            FieldError::MissingField(name) | FieldError::InvalidNumericField(name) => name,
        }
    }
}

/// Failure of a single scoring call
#[derive(Debug, Error)]
pub enum ScoreError {
    #[error(transparent)]
    Field(#[from] FieldError),
    #[error("inference failed: {0:#}")]
    Inference(#[from] anyhow::Error),
}

impl ScoreError {
    /// True when the caller sent bad input, as opposed to a server-side fault
    pub fn is_client_error(&self) -> bool {
        matches!(self, ScoreError::Field(_))
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("store lock poisoned")]
    LockPoisoned,
}

pub type StoreResult<T> = Result<T, StoreError>;
