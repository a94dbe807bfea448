//! Feature engineering: raw listing attributes → model-ready feature vectors.
//!
//! Engineering is a pure function of the record and the imputation statistics
//! captured at training time. Inference never recomputes statistics from its
//! own (single-row) batch.

use crate::domain::errors::{ValuationError, ValuationResult};
use crate::domain::ml::artifact::ImputationStats;
use crate::domain::ml::encoding::EncoderSet;
use crate::domain::ml::feature_schema::{
    BINARY_FEATURES, CATEGORICAL_FEATURES, ColumnKind, MISSING_POSTAL_CODE, NUMERIC_FEATURES,
    REGION_PREFIX_LEN, UNKNOWN_CATEGORY, column_kind, normalize_flag,
};
use crate::domain::vehicle::RawVehicleRecord;
use chrono::{Datelike, NaiveDate};
use rayon::prelude::*;
use statrs::statistics::{Data, Median};
use std::collections::BTreeMap;
use tracing::warn;

/// Fully populated features in schema order.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    numeric: Vec<f64>,
    categorical: Vec<String>,
    binary: Vec<f64>,
}

impl FeatureVector {
    pub fn numeric(&self, column: &str) -> Option<f64> {
        match column_kind(column)? {
            ColumnKind::Numeric(i) => self.numeric.get(i).copied(),
            _ => None,
        }
    }

    pub fn categorical(&self, column: &str) -> Option<&str> {
        match column_kind(column)? {
            ColumnKind::Categorical(i) => self.categorical.get(i).map(String::as_str),
            _ => None,
        }
    }

    pub fn binary(&self, column: &str) -> Option<f64> {
        match column_kind(column)? {
            ColumnKind::Binary(i) => self.binary.get(i).copied(),
            _ => None,
        }
    }

    /// Builds the model input row following `feature_cols` (the order recorded
    /// at training time), label-encoding every categorical column.
    pub fn encode(&self, feature_cols: &[String], encoders: &EncoderSet) -> ValuationResult<Vec<f64>> {
        feature_cols
            .iter()
            .map(|column| match column_kind(column) {
                Some(ColumnKind::Numeric(i)) => Ok(self.numeric[i]),
                Some(ColumnKind::Categorical(i)) => encoders
                    .transform(column, &self.categorical[i])
                    .map(|outcome| outcome.code() as f64),
                Some(ColumnKind::Binary(i)) => Ok(self.binary[i]),
                None => Err(ValuationError::SchemaMismatch {
                    column: column.clone(),
                }),
            })
            .collect()
    }
}

/// Features derived from one record before imputation.
#[derive(Debug, Clone)]
struct DerivedFeatures {
    numeric: Vec<Option<f64>>,
    categorical: Vec<Option<String>>,
    /// frame_damaged, has_accidents, is_new, salvage, theft_title
    flags: [f64; 5],
}

pub struct FeatureEngineer<'a> {
    stats: &'a ImputationStats,
}

impl<'a> FeatureEngineer<'a> {
    pub fn new(stats: &'a ImputationStats) -> Self {
        Self { stats }
    }

    /// Captures per-column medians over the training table.
    pub fn capture_statistics(records: &[RawVehicleRecord]) -> ImputationStats {
        let derived: Vec<DerivedFeatures> = records.par_iter().map(derive).collect();

        let mut medians = BTreeMap::new();
        for (i, column) in NUMERIC_FEATURES.iter().enumerate() {
            let observed: Vec<f64> = derived.iter().filter_map(|d| d.numeric[i]).collect();
            let median = if observed.is_empty() {
                warn!(column, "No observed values in training data, imputing 0.0");
                0.0
            } else {
                Data::new(observed).median()
            };
            medians.insert(column.to_string(), median);
        }
        ImputationStats { medians }
    }

    pub fn engineer(&self, record: &RawVehicleRecord) -> ValuationResult<FeatureVector> {
        let derived = derive(record);

        let numeric = NUMERIC_FEATURES
            .iter()
            .zip(derived.numeric)
            .map(|(column, value)| {
                let median = self.stats.median(column)?;
                Ok(value.unwrap_or(median))
            })
            .collect::<ValuationResult<Vec<f64>>>()?;

        let categorical: Vec<String> = derived
            .categorical
            .into_iter()
            .map(|value| value.unwrap_or_else(|| UNKNOWN_CATEGORY.to_string()))
            .collect();

        // owner_count is read after imputation
        let owner_count = numeric[numeric_index("owner_count")];
        let is_one_owner = if owner_count == 1.0 { 1.0 } else { 0.0 };
        let mut binary = Vec::with_capacity(BINARY_FEATURES.len());
        binary.push(is_one_owner);
        binary.extend_from_slice(&derived.flags);

        Ok(FeatureVector {
            numeric,
            categorical,
            binary,
        })
    }

    /// Engineers a batch in parallel; output order matches input order.
    pub fn engineer_batch(&self, records: &[RawVehicleRecord]) -> ValuationResult<Vec<FeatureVector>> {
        records.par_iter().map(|r| self.engineer(r)).collect()
    }
}

fn numeric_index(column: &str) -> usize {
    NUMERIC_FEATURES
        .iter()
        .position(|c| *c == column)
        .unwrap_or_default()
}

fn derive(record: &RawVehicleRecord) -> DerivedFeatures {
    let listed = record.listed_date.as_deref().and_then(parse_listing_date);
    let listed_year = listed.map(|d| d.year() as f64);
    let listed_month = listed.map(|d| d.month() as f64);

    let year = record.year.map(f64::from);
    let vehicle_age = match (listed_year, year) {
        (Some(listed), Some(built)) => Some((listed - built).max(0.0)),
        _ => None,
    };
    let mileage_per_year = match (record.mileage, vehicle_age) {
        (Some(mileage), Some(age)) => Some(mileage / (age + 1.0)),
        _ => None,
    };

    let numeric = NUMERIC_FEATURES
        .iter()
        .map(|column| match *column {
            "year" => year,
            "mileage" => record.mileage,
            "horsepower" => record.horsepower,
            "torque" => record.torque,
            "vehicle_age" => vehicle_age,
            "mileage_per_year" => mileage_per_year,
            "city_fuel_economy" => record.city_fuel_economy,
            "highway_fuel_economy" => record.highway_fuel_economy,
            "combine_fuel_economy" => record.combine_fuel_economy,
            "owner_count" => record.owner_count,
            "daysonmarket" => record.daysonmarket,
            "listed_year" => listed_year,
            "listed_month" => listed_month,
            _ => None,
        })
        .map(|value| value.filter(|v| v.is_finite()))
        .collect();

    let categorical = CATEGORICAL_FEATURES
        .iter()
        .map(|column| match *column {
            "make_name" => present(&record.make_name),
            "model_name" => present(&record.model_name),
            "trim_name" => present(&record.trim_name),
            "exterior_color" => present(&record.exterior_color),
            "interior_color" => present(&record.interior_color),
            "exterior_color_base" => present(&record.exterior_color_base),
            "interior_color_base" => present(&record.interior_color_base),
            "transmission" => present(&record.transmission),
            "body_type" => present(&record.body_type),
            "wheel_system_display" => present(&record.wheel_system_display),
            "engine_type" => present(&record.engine_type),
            "fuel_type" => present(&record.fuel_type),
            "zip_prefix" => Some(region_prefix(record.dealer_zip.as_deref())),
            _ => None,
        })
        .collect();

    let flags = [
        normalize_flag(record.frame_damaged.as_deref()),
        normalize_flag(record.has_accidents.as_deref()),
        normalize_flag(record.is_new.as_deref()),
        normalize_flag(record.salvage.as_deref()),
        normalize_flag(record.theft_title.as_deref()),
    ];

    DerivedFeatures {
        numeric,
        categorical,
        flags,
    }
}

fn present(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Parses `MM/DD/YYYY` (dataset format) or ISO `YYYY-MM-DD`.
pub fn parse_listing_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%m/%d/%Y")
        .or_else(|_| NaiveDate::parse_from_str(raw, "%Y-%m-%d"))
        .ok()
}

/// Regional prefix of a postal code. Float-formatted codes ("12345.0") are
/// cleaned first.
pub fn region_prefix(postal_code: Option<&str>) -> String {
    let code = postal_code
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .unwrap_or(MISSING_POSTAL_CODE);
    let code = code.strip_suffix(".0").unwrap_or(code);
    code.chars().take(REGION_PREFIX_LEN).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(year: i32, mileage: f64, listed: &str) -> RawVehicleRecord {
        RawVehicleRecord {
            year: Some(year),
            mileage: Some(mileage),
            listed_date: Some(listed.to_string()),
            make_name: Some("Honda".to_string()),
            owner_count: Some(1.0),
            dealer_zip: Some("94107".to_string()),
            has_accidents: Some("TRUE".to_string()),
            salvage: Some("FALSE".to_string()),
            price: Some(15000.0),
            ..Default::default()
        }
    }

    fn training_rows() -> Vec<RawVehicleRecord> {
        vec![
            record(2015, 60000.0, "06/15/2020"),
            RawVehicleRecord {
                horsepower: Some(200.0),
                ..record(2018, 30000.0, "01/10/2020")
            },
            RawVehicleRecord {
                horsepower: Some(300.0),
                ..record(2012, 90000.0, "11/02/2020")
            },
        ]
    }

    #[test]
    fn test_derived_age_and_mileage_rate() {
        let stats = FeatureEngineer::capture_statistics(&training_rows());
        let engineer = FeatureEngineer::new(&stats);

        let fv = engineer.engineer(&record(2016, 40000.0, "03/20/2020")).unwrap();
        assert_eq!(fv.numeric("listed_year"), Some(2020.0));
        assert_eq!(fv.numeric("listed_month"), Some(3.0));
        assert_eq!(fv.numeric("vehicle_age"), Some(4.0));
        assert_eq!(fv.numeric("mileage_per_year"), Some(8000.0));
    }

    #[test]
    fn test_age_is_clamped_at_zero() {
        let stats = FeatureEngineer::capture_statistics(&training_rows());
        let engineer = FeatureEngineer::new(&stats);

        // Next model-year vehicle listed the year before
        let fv = engineer.engineer(&record(2021, 500.0, "09/01/2020")).unwrap();
        assert_eq!(fv.numeric("vehicle_age"), Some(0.0));
        assert_eq!(fv.numeric("mileage_per_year"), Some(500.0));
    }

    #[test]
    fn test_unparseable_date_is_imputed_not_fatal() {
        let rows = training_rows();
        let stats = FeatureEngineer::capture_statistics(&rows);
        let engineer = FeatureEngineer::new(&stats);

        let fv = engineer.engineer(&record(2016, 40000.0, "sometime in spring")).unwrap();
        assert_eq!(fv.numeric("listed_year"), Some(stats.medians["listed_year"]));
        assert_eq!(fv.numeric("listed_month"), Some(stats.medians["listed_month"]));
        assert_eq!(fv.numeric("vehicle_age"), Some(stats.medians["vehicle_age"]));
    }

    #[test]
    fn test_missing_numeric_uses_training_median() {
        let stats = FeatureEngineer::capture_statistics(&training_rows());
        let engineer = FeatureEngineer::new(&stats);

        // horsepower observed as 200 and 300 in training
        assert_eq!(stats.medians["horsepower"], 250.0);
        let fv = engineer.engineer(&record(2016, 40000.0, "03/20/2020")).unwrap();
        assert_eq!(fv.numeric("horsepower"), Some(250.0));
    }

    #[test]
    fn test_column_without_observations_defaults_to_zero() {
        let stats = FeatureEngineer::capture_statistics(&training_rows());
        assert_eq!(stats.medians["torque"], 0.0);
    }

    #[test]
    fn test_categorical_and_flag_normalization() {
        let stats = FeatureEngineer::capture_statistics(&training_rows());
        let engineer = FeatureEngineer::new(&stats);

        let mut raw = record(2016, 40000.0, "03/20/2020");
        raw.model_name = Some("   ".to_string());
        raw.theft_title = Some("n/a".to_string());
        let fv = engineer.engineer(&raw).unwrap();

        assert_eq!(fv.categorical("make_name"), Some("Honda"));
        assert_eq!(fv.categorical("model_name"), Some(UNKNOWN_CATEGORY));
        assert_eq!(fv.categorical("trim_name"), Some(UNKNOWN_CATEGORY));
        assert_eq!(fv.binary("is_one_owner"), Some(1.0));
        assert_eq!(fv.binary("has_accidents"), Some(1.0));
        assert_eq!(fv.binary("salvage"), Some(0.0));
        assert_eq!(fv.binary("theft_title"), Some(0.0));
        assert_eq!(fv.binary("frame_damaged"), Some(0.0));
    }

    #[test]
    fn test_region_prefix() {
        assert_eq!(region_prefix(Some("94107")), "941");
        assert_eq!(region_prefix(Some("2116.0")), "211");
        assert_eq!(region_prefix(Some("")), "000");
        assert_eq!(region_prefix(None), "000");
    }

    #[test]
    fn test_parse_listing_date_formats() {
        assert_eq!(
            parse_listing_date("09/05/2020"),
            NaiveDate::from_ymd_opt(2020, 9, 5)
        );
        assert_eq!(
            parse_listing_date("2020-09-05"),
            NaiveDate::from_ymd_opt(2020, 9, 5)
        );
        assert_eq!(parse_listing_date("13/45/2020"), None);
    }

    #[test]
    fn test_batch_preserves_order() {
        let rows = training_rows();
        let stats = FeatureEngineer::capture_statistics(&rows);
        let engineer = FeatureEngineer::new(&stats);

        let batch = engineer.engineer_batch(&rows).unwrap();
        let years: Vec<f64> = batch.iter().filter_map(|fv| fv.numeric("year")).collect();
        assert_eq!(years, vec![2015.0, 2018.0, 2012.0]);
    }

    #[test]
    fn test_missing_statistics_is_schema_mismatch() {
        let stats = ImputationStats::default();
        let engineer = FeatureEngineer::new(&stats);

        let err = engineer.engineer(&record(2016, 40000.0, "03/20/2020")).unwrap_err();
        assert!(matches!(err, ValuationError::SchemaMismatch { .. }));
    }

    #[test]
    fn test_encode_follows_recorded_column_order() {
        let rows = training_rows();
        let stats = FeatureEngineer::capture_statistics(&rows);
        let engineer = FeatureEngineer::new(&stats);
        let batch = engineer.engineer_batch(&rows).unwrap();
        let encoders = EncoderSet::fit(CATEGORICAL_FEATURES.iter().map(|column| {
            (*column, batch.iter().filter_map(move |fv| fv.categorical(column)))
        }))
        .unwrap();

        let cols = vec!["mileage".to_string(), "year".to_string(), "is_one_owner".to_string()];
        let row = batch[0].encode(&cols, &encoders).unwrap();
        assert_eq!(row, vec![60000.0, 2015.0, 1.0]);

        let drifted = vec!["city".to_string()];
        assert!(matches!(
            batch[0].encode(&drifted, &encoders),
            Err(ValuationError::SchemaMismatch { .. })
        ));
    }
}
