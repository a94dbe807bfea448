//! Offline training of the ensemble regressor.
//!
//! raw rows → feature engineering → encoder fit → seeded 80/20 split →
//! random forest fit → held-out evaluation → artifact.

use super::feature_engineering::{FeatureEngineer, FeatureVector};
use crate::domain::errors::{ValuationError, ValuationResult};
use crate::domain::ml::artifact::{
    ARTIFACT_FORMAT_VERSION, EvaluationMetrics, ForestModel, TrainedModelArtifact,
    TrainingMetadata,
};
use crate::domain::ml::encoding::EncoderSet;
use crate::domain::ml::feature_schema::{self, CATEGORICAL_FEATURES};
use crate::domain::vehicle::RawVehicleRecord;
use chrono::Utc;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use smartcore::ensemble::random_forest_regressor::{
    RandomForestRegressor, RandomForestRegressorParameters,
};
use smartcore::linalg::basic::matrix::DenseMatrix;
use tracing::{info, warn};

/// Smallest table that still leaves one row on each side of the split.
pub const MIN_TRAINING_ROWS: usize = 2;

/// Fixed forest configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ForestParameters {
    pub n_trees: usize,
    pub max_depth: u16,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    /// Fraction of features considered at each split
    pub max_features: f64,
    pub seed: u64,
}

impl Default for ForestParameters {
    fn default() -> Self {
        Self {
            n_trees: 150,
            max_depth: 25,
            min_samples_split: 10,
            min_samples_leaf: 4,
            max_features: 0.3,
            seed: 42,
        }
    }
}

impl ForestParameters {
    /// Number of features sampled per split for `n_features` columns.
    pub fn features_per_split(&self, n_features: usize) -> usize {
        ((self.max_features * n_features as f64) as usize).clamp(1, n_features.max(1))
    }

    fn to_smartcore(&self, n_features: usize) -> RandomForestRegressorParameters {
        RandomForestRegressorParameters::default()
            .with_n_trees(self.n_trees)
            .with_max_depth(self.max_depth)
            .with_min_samples_split(self.min_samples_split)
            .with_min_samples_leaf(self.min_samples_leaf)
            .with_m(self.features_per_split(n_features))
            .with_seed(self.seed)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrainingOptions {
    pub forest: ForestParameters,
    pub test_fraction: f64,
}

impl Default for TrainingOptions {
    fn default() -> Self {
        Self {
            forest: ForestParameters::default(),
            test_fraction: 0.2,
        }
    }
}

/// Row indices of a train/test partition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitIndices {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Seeded shuffle split. The test part holds `ceil(n * test_fraction)` rows,
/// clamped so both parts are non-empty.
pub fn train_test_split(n: usize, test_fraction: f64, seed: u64) -> SplitIndices {
    if n == 0 {
        return SplitIndices {
            train: Vec::new(),
            test: Vec::new(),
        };
    }
    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    // Epsilon keeps products like 600 * 0.2 from rounding up to an extra row
    let n_test = ((n as f64 * test_fraction - 1e-9).ceil() as usize)
        .clamp(1, n.saturating_sub(1).max(1));
    let train = indices.split_off(n_test);
    SplitIndices {
        train,
        test: indices,
    }
}

pub fn evaluate(predicted: &[f64], actual: &[f64]) -> EvaluationMetrics {
    let n = predicted.len().max(1) as f64;
    let sq_err: f64 = predicted
        .iter()
        .zip(actual)
        .map(|(p, t)| (p - t).powi(2))
        .sum();
    let mae = predicted
        .iter()
        .zip(actual)
        .map(|(p, t)| (p - t).abs())
        .sum::<f64>()
        / n;
    let rmse = (sq_err / n).sqrt();

    let mean_y = actual.iter().sum::<f64>() / n;
    let ss_tot: f64 = actual.iter().map(|t| (t - mean_y).powi(2)).sum();
    let r2 = if ss_tot > 0.0 { 1.0 - sq_err / ss_tot } else { 0.0 };

    EvaluationMetrics { mae, rmse, r2 }
}

/// Trains a model on historical listings. Rows without a price are dropped.
pub fn train(
    records: &[RawVehicleRecord],
    options: &TrainingOptions,
) -> ValuationResult<TrainedModelArtifact> {
    let rows: Vec<RawVehicleRecord> = records
        .iter()
        .filter(|r| r.price.is_some_and(f64::is_finite))
        .cloned()
        .collect();
    let dropped = records.len() - rows.len();
    if dropped > 0 {
        warn!(dropped, "Dropped training rows without a usable price");
    }
    if rows.len() < MIN_TRAINING_ROWS {
        return Err(ValuationError::InsufficientData {
            rows: rows.len(),
            required: MIN_TRAINING_ROWS,
        });
    }
    let targets: Vec<f64> = rows.iter().filter_map(|r| r.price).collect();

    let imputation = FeatureEngineer::capture_statistics(&rows);
    let vectors = FeatureEngineer::new(&imputation).engineer_batch(&rows)?;
    let encoders = fit_encoders(&vectors)?;
    let feature_cols = feature_schema::feature_columns();

    let x = vectors
        .iter()
        .map(|fv| fv.encode(&feature_cols, &encoders))
        .collect::<ValuationResult<Vec<Vec<f64>>>>()?;

    let split = train_test_split(x.len(), options.test_fraction, options.forest.seed);
    let (x_train, y_train) = gather(&x, &targets, &split.train);
    let (x_test, y_test) = gather(&x, &targets, &split.test);

    info!(
        rows = x.len(),
        train_rows = x_train.len(),
        test_rows = x_test.len(),
        features = feature_cols.len(),
        "Training Random Forest Regressor (Trees: {}, Depth: {}, MinSplit: {}, MinLeaf: {})",
        options.forest.n_trees,
        options.forest.max_depth,
        options.forest.min_samples_split,
        options.forest.min_samples_leaf
    );

    let model = fit_forest(&x_train, &y_train, &options.forest, feature_cols.len())?;
    let predicted = predict_rows(&model, &x_test)?;
    let metrics = evaluate(&predicted, &y_test);

    info!(
        "OOS Test (n={}): MAE=${:.2}, RMSE=${:.2}, R²={:.3}",
        y_test.len(),
        metrics.mae,
        metrics.rmse,
        metrics.r2
    );

    Ok(TrainedModelArtifact {
        format_version: ARTIFACT_FORMAT_VERSION,
        model,
        encoders,
        feature_cols,
        imputation,
        metadata: TrainingMetadata {
            trained_at: Utc::now(),
            train_rows: x_train.len(),
            test_rows: x_test.len(),
            metrics,
        },
    })
}

fn fit_encoders(vectors: &[FeatureVector]) -> ValuationResult<EncoderSet> {
    EncoderSet::fit(CATEGORICAL_FEATURES.iter().map(|column| {
        (
            *column,
            vectors.iter().filter_map(move |fv| fv.categorical(column)),
        )
    }))
}

fn gather(x: &[Vec<f64>], y: &[f64], indices: &[usize]) -> (Vec<Vec<f64>>, Vec<f64>) {
    indices.iter().map(|&i| (x[i].clone(), y[i])).unzip()
}

fn fit_forest(
    x: &[Vec<f64>],
    y: &[f64],
    params: &ForestParameters,
    n_features: usize,
) -> ValuationResult<ForestModel> {
    let x_matrix = DenseMatrix::from_2d_vec(&x.to_vec()).map_err(|e| ValuationError::Training {
        reason: format!("Matrix error: {}", e),
    })?;
    RandomForestRegressor::fit(&x_matrix, &y.to_vec(), params.to_smartcore(n_features)).map_err(
        |e| ValuationError::Training {
            reason: format!("Training error: {}", e),
        },
    )
}

/// Runs the forest over already-encoded rows.
pub fn predict_rows(model: &ForestModel, rows: &[Vec<f64>]) -> ValuationResult<Vec<f64>> {
    if rows.is_empty() {
        return Ok(Vec::new());
    }
    let matrix = DenseMatrix::from_2d_vec(&rows.to_vec()).map_err(|e| ValuationError::Inference {
        reason: format!("Matrix creation failed: {}", e),
    })?;
    model.predict(&matrix).map_err(|e| ValuationError::Inference {
        reason: format!("Prediction failed: {}", e),
    })
}
