//! Depreciation projection: value now and for each of the next N years.

use super::predictor::VehicleValuator;
use crate::domain::errors::{ValuationError, ValuationResult};
use crate::domain::vehicle::{FutureValue, PredictionResult, RawVehicleRecord};
use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use tracing::debug;

/// Oldest model year accepted for projection.
pub const EARLIEST_MODEL_YEAR: i32 = 1900;

#[derive(Debug, Clone, PartialEq)]
pub struct ProjectionSettings {
    pub horizon_years: u32,
    /// Implied annual mileage below this is considered unreliable
    pub low_mileage_threshold: f64,
    pub default_annual_mileage: f64,
}

impl Default for ProjectionSettings {
    fn default() -> Self {
        Self {
            horizon_years: 5,
            low_mileage_threshold: 1000.0,
            default_annual_mileage: 12000.0,
        }
    }
}

impl ProjectionSettings {
    /// Annual mileage implied by the odometer, replaced by the default for
    /// near-new or sparsely driven vehicles.
    pub fn annual_mileage(&self, current_mileage: f64, model_year: i32, current_year: i32) -> f64 {
        let age = current_year.saturating_sub(model_year).max(1);
        let implied = current_mileage / f64::from(age);
        if implied < self.low_mileage_threshold {
            debug!(
                implied,
                default = self.default_annual_mileage,
                "Implied annual mileage below threshold, using default"
            );
            self.default_annual_mileage
        } else {
            implied
        }
    }
}

pub fn project(
    valuator: &dyn VehicleValuator,
    record: &RawVehicleRecord,
    settings: &ProjectionSettings,
    today: NaiveDate,
) -> ValuationResult<PredictionResult> {
    let model_year = record
        .year
        .ok_or_else(|| ValuationError::malformed("year", "is required for projection"))?;
    let latest_model_year = today.year().saturating_add(1);
    if !(EARLIEST_MODEL_YEAR..=latest_model_year).contains(&model_year) {
        return Err(ValuationError::malformed(
            "year",
            format!(
                "must be between {} and {}, got {}",
                EARLIEST_MODEL_YEAR, latest_model_year, model_year
            ),
        ));
    }
    let current_mileage = record
        .mileage
        .ok_or_else(|| ValuationError::malformed("mileage", "is required for projection"))?;
    if !current_mileage.is_finite() || current_mileage < 0.0 {
        return Err(ValuationError::malformed(
            "mileage",
            format!("must be a non-negative number, got {}", current_mileage),
        ));
    }

    let current_value = to_currency(valuator.predict_current_as_of(record, today)?)?;
    let annual_mileage = settings.annual_mileage(current_mileage, model_year, today.year());

    let future_values = (1..=settings.horizon_years)
        .map(|year| {
            let value = valuator.predict_future_as_of(record, year, annual_mileage, today)?;
            Ok(FutureValue {
                year,
                value: to_currency(value)?,
                projected_mileage: current_mileage + annual_mileage * f64::from(year),
            })
        })
        .collect::<ValuationResult<Vec<_>>>()?;

    Ok(PredictionResult {
        current_value,
        annual_mileage,
        future_values,
    })
}

/// Rounds a model output to cents.
pub fn to_currency(value: f64) -> ValuationResult<Decimal> {
    Decimal::from_f64(value)
        .map(|d| d.round_dp(2))
        .ok_or_else(|| ValuationError::Inference {
            reason: format!("model produced a non-representable value: {}", value),
        })
}
