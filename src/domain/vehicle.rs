use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One listing (training) or one vehicle to value (inference).
///
/// Every attribute is optional: VIN-decoded records arrive partially populated
/// and the historical dataset has gaps. Field names match the dataset headers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawVehicleRecord {
    // Numeric
    pub year: Option<i32>,
    pub mileage: Option<f64>,
    pub horsepower: Option<f64>,
    pub torque: Option<f64>,
    pub city_fuel_economy: Option<f64>,
    pub highway_fuel_economy: Option<f64>,
    pub combine_fuel_economy: Option<f64>,
    pub owner_count: Option<f64>,
    pub daysonmarket: Option<f64>,
    /// `MM/DD/YYYY` or `YYYY-MM-DD`
    pub listed_date: Option<String>,

    // Categorical
    pub make_name: Option<String>,
    pub model_name: Option<String>,
    pub trim_name: Option<String>,
    pub exterior_color: Option<String>,
    pub interior_color: Option<String>,
    pub exterior_color_base: Option<String>,
    pub interior_color_base: Option<String>,
    pub transmission: Option<String>,
    pub body_type: Option<String>,
    pub wheel_system_display: Option<String>,
    pub engine_type: Option<String>,
    pub fuel_type: Option<String>,
    pub dealer_zip: Option<String>,

    // Boolean-like ("TRUE"/"FALSE" in the dataset)
    pub frame_damaged: Option<String>,
    pub has_accidents: Option<String>,
    pub is_new: Option<String>,
    pub salvage: Option<String>,
    pub theft_title: Option<String>,

    /// Realized listing price. Training target only.
    pub price: Option<f64>,
}

/// Projected value for one horizon year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FutureValue {
    /// Years ahead of today (1-based)
    pub year: u32,
    pub value: Decimal,
    pub projected_mileage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub current_value: Decimal,
    pub annual_mileage: f64,
    /// Ordered by `year`, ascending
    pub future_values: Vec<FutureValue>,
}
