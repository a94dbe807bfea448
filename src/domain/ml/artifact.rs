use super::encoding::EncoderSet;
use super::feature_schema::{self, CATEGORICAL_FEATURES, NUMERIC_FEATURES};
use crate::domain::errors::{ValuationError, ValuationResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use smartcore::ensemble::random_forest_regressor::RandomForestRegressor;
use smartcore::linalg::basic::matrix::DenseMatrix;
use std::collections::BTreeMap;

/// Bumped whenever the persisted layout or the feature schema changes.
pub const ARTIFACT_FORMAT_VERSION: u32 = 1;

pub type ForestModel = RandomForestRegressor<f64, f64, DenseMatrix<f64>, Vec<f64>>;

/// Training-set medians used to impute missing numeric features.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImputationStats {
    pub medians: BTreeMap<String, f64>,
}

impl ImputationStats {
    pub fn median(&self, column: &str) -> ValuationResult<f64> {
        self.medians
            .get(column)
            .copied()
            .ok_or_else(|| ValuationError::SchemaMismatch {
                column: column.to_string(),
            })
    }
}

/// Held-out evaluation of a training run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EvaluationMetrics {
    pub mae: f64,
    pub rmse: f64,
    pub r2: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingMetadata {
    pub trained_at: DateTime<Utc>,
    pub train_rows: usize,
    pub test_rows: usize,
    pub metrics: EvaluationMetrics,
}

/// Everything inference needs, persisted and loaded as one unit.
#[derive(Serialize, Deserialize)]
pub struct TrainedModelArtifact {
    pub format_version: u32,
    pub model: ForestModel,
    pub encoders: EncoderSet,
    pub feature_cols: Vec<String>,
    pub imputation: ImputationStats,
    pub metadata: TrainingMetadata,
}

impl std::fmt::Debug for TrainedModelArtifact {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrainedModelArtifact")
            .field("format_version", &self.format_version)
            .field("encoders", &self.encoders.len())
            .field("feature_cols", &self.feature_cols)
            .field("metadata", &self.metadata)
            .finish_non_exhaustive()
    }
}

impl TrainedModelArtifact {
    /// Checks that the artifact matches the schema this build serves.
    pub fn validate(&self) -> ValuationResult<()> {
        if self.format_version != ARTIFACT_FORMAT_VERSION {
            return Err(ValuationError::UnsupportedArtifactVersion {
                found: self.format_version,
                expected: ARTIFACT_FORMAT_VERSION,
            });
        }

        let expected = feature_schema::feature_columns();
        if self.feature_cols != expected {
            return Err(ValuationError::ArtifactCorrupt {
                reason: format!(
                    "feature column order differs from the serving schema ({} recorded, {} expected)",
                    self.feature_cols.len(),
                    expected.len()
                ),
            });
        }

        for column in CATEGORICAL_FEATURES {
            self.encoders.table(column)?;
        }
        for column in NUMERIC_FEATURES {
            self.imputation.median(column)?;
        }
        Ok(())
    }
}
