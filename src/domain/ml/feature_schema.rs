//! Declared feature schema.
//!
//! The model consumes `NUMERIC_FEATURES ++ CATEGORICAL_FEATURES ++ BINARY_FEATURES`
//! in exactly this order. The order is recorded in every trained artifact and
//! checked again at load time; any change here is a breaking change for
//! persisted models.

/// Sentinel substituted for missing categorical values.
pub const UNKNOWN_CATEGORY: &str = "unknown";

/// Postal code assumed when a record carries none.
pub const MISSING_POSTAL_CODE: &str = "00000";

/// Length of the regional prefix cut from a postal code.
pub const REGION_PREFIX_LEN: usize = 3;

pub const NUMERIC_FEATURES: &[&str] = &[
    "year",
    "mileage",
    "horsepower",
    "torque",
    "vehicle_age",
    "mileage_per_year",
    "city_fuel_economy",
    "highway_fuel_economy",
    "combine_fuel_economy",
    "owner_count",
    "daysonmarket",
    "listed_year",
    "listed_month",
];

pub const CATEGORICAL_FEATURES: &[&str] = &[
    "make_name",
    "model_name",
    "trim_name",
    "exterior_color",
    "interior_color",
    "exterior_color_base",
    "interior_color_base",
    "transmission",
    "body_type",
    "wheel_system_display",
    "engine_type",
    "fuel_type",
    "zip_prefix",
];

pub const BINARY_FEATURES: &[&str] = &[
    "is_one_owner",
    "frame_damaged",
    "has_accidents",
    "is_new",
    "salvage",
    "theft_title",
];

/// Which block of the schema a column belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Numeric(usize),
    Categorical(usize),
    Binary(usize),
}

/// The full ordered column list the model is trained on.
pub fn feature_columns() -> Vec<String> {
    NUMERIC_FEATURES
        .iter()
        .chain(CATEGORICAL_FEATURES)
        .chain(BINARY_FEATURES)
        .map(|c| c.to_string())
        .collect()
}

/// Locates a column within the declared schema.
pub fn column_kind(name: &str) -> Option<ColumnKind> {
    if let Some(i) = NUMERIC_FEATURES.iter().position(|c| *c == name) {
        return Some(ColumnKind::Numeric(i));
    }
    if let Some(i) = CATEGORICAL_FEATURES.iter().position(|c| *c == name) {
        return Some(ColumnKind::Categorical(i));
    }
    BINARY_FEATURES
        .iter()
        .position(|c| *c == name)
        .map(ColumnKind::Binary)
}

/// Normalizes a boolean-like field to 0/1.
///
/// Only recognized true tokens map to 1. Anything else, including garbage and
/// absence, is 0.
pub fn normalize_flag(raw: Option<&str>) -> f64 {
    match raw.map(|s| s.trim().to_ascii_lowercase()) {
        Some(token) if matches!(token.as_str(), "true" | "t" | "yes" | "y" | "1") => 1.0,
        _ => 0.0,
    }
}
