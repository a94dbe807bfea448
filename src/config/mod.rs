//! Configuration module for Autovalue.
//!
//! This module provides structured configuration loading from environment variables,
//! organized by concern: Training and Projection.

mod projection_config;
mod training_config;

pub use projection_config::ProjectionEnvConfig;
pub use training_config::{DEFAULT_MODEL_PATH, DEFAULT_TRAINING_DATA_PATH, TrainingEnvConfig};

use anyhow::{Context, Result};

/// Main application configuration.
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub training: TrainingEnvConfig,
    pub projection: ProjectionEnvConfig,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        let training = TrainingEnvConfig::from_env().context("Failed to load training config")?;
        let projection =
            ProjectionEnvConfig::from_env().context("Failed to load projection config")?;

        Ok(Self {
            training,
            projection,
        })
    }
}
