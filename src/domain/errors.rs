use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the valuation pipeline (training, persistence, inference)
#[derive(Debug, Error)]
pub enum ValuationError {
    #[error("Model unavailable: no trained artifact is loaded")]
    ModelUnavailable,

    #[error("Artifact not found at {path:?}")]
    ArtifactNotFound { path: PathBuf },

    #[error("Artifact corrupt or incompatible: {reason}")]
    ArtifactCorrupt { reason: String },

    #[error("Unsupported artifact format version {found} (expected {expected})")]
    UnsupportedArtifactVersion { found: u32, expected: u32 },

    /// A categorical column has no fitted encoding table. The feature schema
    /// drifted between training and serving.
    #[error("Schema mismatch: no encoding table for column '{column}'")]
    SchemaMismatch { column: String },

    #[error("Malformed input: {field} {reason}")]
    MalformedInput { field: String, reason: String },

    #[error("Insufficient training data: {rows} usable rows, need at least {required}")]
    InsufficientData { rows: usize, required: usize },

    #[error("Training failed: {reason}")]
    Training { reason: String },

    #[error("Inference failed: {reason}")]
    Inference { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),
}

impl ValuationError {
    pub fn malformed(field: &str, reason: impl Into<String>) -> Self {
        ValuationError::MalformedInput {
            field: field.to_string(),
            reason: reason.into(),
        }
    }

    /// True when the request itself was bad and the caller should fix it
    /// rather than the operator.
    pub fn is_user_error(&self) -> bool {
        matches!(self, ValuationError::MalformedInput { .. })
    }
}

pub type ValuationResult<T> = Result<T, ValuationError>;
