//! Projection configuration parsing from environment variables.

use crate::application::ml::projection::ProjectionSettings;
use anyhow::{Context, Result};
use std::env;

/// Projection environment configuration
#[derive(Debug, Clone)]
pub struct ProjectionEnvConfig {
    pub horizon_years: u32,
    pub low_mileage_threshold: f64,
    pub default_annual_mileage: f64,
}

impl Default for ProjectionEnvConfig {
    fn default() -> Self {
        let settings = ProjectionSettings::default();
        Self {
            horizon_years: settings.horizon_years,
            low_mileage_threshold: settings.low_mileage_threshold,
            default_annual_mileage: settings.default_annual_mileage,
        }
    }
}

impl ProjectionEnvConfig {
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        let config = Self {
            horizon_years: env::var("PROJECTION_HORIZON_YEARS")
                .unwrap_or_else(|_| defaults.horizon_years.to_string())
                .parse::<u32>()
                .context("Failed to parse PROJECTION_HORIZON_YEARS")?,
            low_mileage_threshold: env::var("LOW_MILEAGE_THRESHOLD")
                .unwrap_or_else(|_| defaults.low_mileage_threshold.to_string())
                .parse::<f64>()
                .context("Failed to parse LOW_MILEAGE_THRESHOLD")?,
            default_annual_mileage: env::var("DEFAULT_ANNUAL_MILEAGE")
                .unwrap_or_else(|_| defaults.default_annual_mileage.to_string())
                .parse::<f64>()
                .context("Failed to parse DEFAULT_ANNUAL_MILEAGE")?,
        };

        if config.horizon_years == 0 {
            anyhow::bail!("PROJECTION_HORIZON_YEARS must be at least 1");
        }
        if !config.default_annual_mileage.is_finite() || config.default_annual_mileage <= 0.0 {
            anyhow::bail!(
                "DEFAULT_ANNUAL_MILEAGE must be a positive number, got {}",
                config.default_annual_mileage
            );
        }
        if !config.low_mileage_threshold.is_finite() || config.low_mileage_threshold < 0.0 {
            anyhow::bail!(
                "LOW_MILEAGE_THRESHOLD must be a non-negative number, got {}",
                config.low_mileage_threshold
            );
        }
        Ok(config)
    }

    pub fn to_settings(&self) -> ProjectionSettings {
        ProjectionSettings {
            horizon_years: self.horizon_years,
            low_mileage_threshold: self.low_mileage_threshold,
            default_annual_mileage: self.default_annual_mileage,
        }
    }
}
