//! Training configuration parsing from environment variables.
//!
//! This module handles loading data/model paths and the fixed forest
//! hyperparameters used by the offline training job.

use crate::application::ml::trainer::{ForestParameters, TrainingOptions};
use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;

pub const DEFAULT_TRAINING_DATA_PATH: &str = "data/processed/used_cars_data_cleaned.csv";
pub const DEFAULT_MODEL_PATH: &str = "models/saved/vehicle_predictor_model.json";

/// Training environment configuration
#[derive(Debug, Clone)]
pub struct TrainingEnvConfig {
    pub training_data_path: PathBuf,
    pub model_path: PathBuf,
    pub n_trees: usize,
    pub max_depth: u16,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub max_features: f64,
    pub seed: u64,
    pub test_fraction: f64,
}

impl Default for TrainingEnvConfig {
    fn default() -> Self {
        let forest = ForestParameters::default();
        Self {
            training_data_path: PathBuf::from(DEFAULT_TRAINING_DATA_PATH),
            model_path: PathBuf::from(DEFAULT_MODEL_PATH),
            n_trees: forest.n_trees,
            max_depth: forest.max_depth,
            min_samples_split: forest.min_samples_split,
            min_samples_leaf: forest.min_samples_leaf,
            max_features: forest.max_features,
            seed: forest.seed,
            test_fraction: TrainingOptions::default().test_fraction,
        }
    }
}

impl TrainingEnvConfig {
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let config = Self {
            training_data_path: env::var("TRAINING_DATA_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.training_data_path),
            model_path: env::var("MODEL_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.model_path),
            n_trees: Self::parse_usize("FOREST_N_TREES", defaults.n_trees)?,
            max_depth: env::var("FOREST_MAX_DEPTH")
                .unwrap_or_else(|_| defaults.max_depth.to_string())
                .parse::<u16>()
                .context("Failed to parse FOREST_MAX_DEPTH")?,
            min_samples_split: Self::parse_usize(
                "FOREST_MIN_SAMPLES_SPLIT",
                defaults.min_samples_split,
            )?,
            min_samples_leaf: Self::parse_usize(
                "FOREST_MIN_SAMPLES_LEAF",
                defaults.min_samples_leaf,
            )?,
            max_features: Self::parse_f64("FOREST_MAX_FEATURES", defaults.max_features)?,
            seed: env::var("TRAINING_SEED")
                .unwrap_or_else(|_| defaults.seed.to_string())
                .parse::<u64>()
                .context("Failed to parse TRAINING_SEED")?,
            test_fraction: Self::parse_f64("TEST_FRACTION", defaults.test_fraction)?,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.n_trees == 0 {
            anyhow::bail!("FOREST_N_TREES must be at least 1");
        }
        if !(self.max_features > 0.0 && self.max_features <= 1.0) {
            anyhow::bail!(
                "FOREST_MAX_FEATURES must be in (0, 1], got {}",
                self.max_features
            );
        }
        if !(self.test_fraction > 0.0 && self.test_fraction < 1.0) {
            anyhow::bail!("TEST_FRACTION must be in (0, 1), got {}", self.test_fraction);
        }
        Ok(())
    }

    pub fn to_options(&self) -> TrainingOptions {
        TrainingOptions {
            forest: ForestParameters {
                n_trees: self.n_trees,
                max_depth: self.max_depth,
                min_samples_split: self.min_samples_split,
                min_samples_leaf: self.min_samples_leaf,
                max_features: self.max_features,
                seed: self.seed,
            },
            test_fraction: self.test_fraction,
        }
    }

    fn parse_usize(key: &str, default: usize) -> Result<usize> {
        env::var(key)
            .unwrap_or_else(|_| default.to_string())
            .parse::<usize>()
            .context(format!("Failed to parse {}", key))
    }

    fn parse_f64(key: &str, default: f64) -> Result<f64> {
        env::var(key)
            .unwrap_or_else(|_| default.to_string())
            .parse::<f64>()
            .context(format!("Failed to parse {}", key))
    }
}
