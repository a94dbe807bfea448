use super::feature_engineering::FeatureEngineer;
use super::projection::{self, ProjectionSettings};
use super::trainer::predict_rows;
use crate::domain::errors::{ValuationError, ValuationResult};
use crate::domain::ml::artifact::TrainedModelArtifact;
use crate::domain::vehicle::{PredictionResult, RawVehicleRecord};
use crate::infrastructure::artifact_store::ArtifactStore;
use chrono::{Local, Months, NaiveDate};
use std::path::Path;
use std::sync::{Arc, RwLock};
use tracing::{error, info};

/// Date format written into records whose listing date is synthesized.
const LISTING_DATE_FORMAT: &str = "%m/%d/%Y";

/// Interface for vehicle value models
pub trait VehicleValuator: Send + Sync {
    /// Value of the vehicle as listed on `today` (or on its own listing date,
    /// when the record carries one).
    fn predict_current_as_of(
        &self,
        record: &RawVehicleRecord,
        today: NaiveDate,
    ) -> ValuationResult<f64>;

    /// Value `years_ahead` years after `today`, with mileage advanced by
    /// `annual_mileage` per year.
    fn predict_future_as_of(
        &self,
        record: &RawVehicleRecord,
        years_ahead: u32,
        annual_mileage: f64,
        today: NaiveDate,
    ) -> ValuationResult<f64>;

    /// Get model name/type
    fn name(&self) -> &str;

    /// Get model version (artifact format version of the serving model)
    fn version(&self) -> String;

    fn predict_current(&self, record: &RawVehicleRecord) -> ValuationResult<f64> {
        self.predict_current_as_of(record, today())
    }

    fn predict_future(
        &self,
        record: &RawVehicleRecord,
        years_ahead: u32,
        annual_mileage: f64,
    ) -> ValuationResult<f64> {
        self.predict_future_as_of(record, years_ahead, annual_mileage, today())
    }
}

pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// A read-only view of one artifact. Every call on it sees the same model,
/// regardless of concurrent reloads.
#[derive(Debug, Clone)]
pub struct LoadedModel {
    artifact: Arc<TrainedModelArtifact>,
}

impl LoadedModel {
    pub fn artifact(&self) -> &TrainedModelArtifact {
        &self.artifact
    }

    fn estimate(&self, record: &RawVehicleRecord, today: NaiveDate) -> ValuationResult<f64> {
        if record.year.is_none() {
            return Err(ValuationError::malformed("year", "is required"));
        }

        let mut record = record.clone();
        if record.listed_date.as_deref().is_none_or(|d| d.trim().is_empty()) {
            record.listed_date = Some(today.format(LISTING_DATE_FORMAT).to_string());
        }

        let artifact = &*self.artifact;
        let features = FeatureEngineer::new(&artifact.imputation).engineer(&record)?;
        let row = features.encode(&artifact.feature_cols, &artifact.encoders)?;
        predict_rows(&artifact.model, &[row])?
            .first()
            .copied()
            .ok_or_else(|| ValuationError::Inference {
                reason: "No prediction returned".to_string(),
            })
    }
}

impl VehicleValuator for LoadedModel {
    fn predict_current_as_of(
        &self,
        record: &RawVehicleRecord,
        today: NaiveDate,
    ) -> ValuationResult<f64> {
        self.estimate(record, today)
    }

    fn predict_future_as_of(
        &self,
        record: &RawVehicleRecord,
        years_ahead: u32,
        annual_mileage: f64,
        today: NaiveDate,
    ) -> ValuationResult<f64> {
        if !annual_mileage.is_finite() || annual_mileage < 0.0 {
            return Err(ValuationError::malformed(
                "annual_mileage",
                format!("must be a non-negative number, got {}", annual_mileage),
            ));
        }
        let listing_date = shift_years(today, years_ahead)?;

        // Age is derived from the shifted listing date during feature
        // engineering; only the date and mileage move here.
        let mut future = record.clone();
        future.listed_date = Some(listing_date.format(LISTING_DATE_FORMAT).to_string());
        future.mileage = record
            .mileage
            .map(|mileage| mileage + annual_mileage * years_ahead as f64);

        self.estimate(&future, today)
    }

    fn name(&self) -> &str {
        "SmartCore Random Forest"
    }

    fn version(&self) -> String {
        format!("v{}", self.artifact.format_version)
    }
}

fn shift_years(today: NaiveDate, years: u32) -> ValuationResult<NaiveDate> {
    years
        .checked_mul(12)
        .and_then(|months| today.checked_add_months(Months::new(months)))
        .ok_or_else(|| ValuationError::malformed("years_ahead", format!("{} is out of range", years)))
}

/// Shared slot for the live artifact.
///
/// Readers clone the inner `Arc`; a reload swaps the whole `Arc`, so an
/// in-flight prediction keeps using the artifact it started with.
#[derive(Debug, Default)]
pub struct ModelHandle {
    current: RwLock<Option<Arc<TrainedModelArtifact>>>,
}

impl ModelHandle {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Validates and publishes a new artifact, replacing any previous one.
    pub fn install(&self, artifact: TrainedModelArtifact) -> ValuationResult<()> {
        artifact.validate()?;
        let version = artifact.format_version;
        let trained_at = artifact.metadata.trained_at;
        let next = Some(Arc::new(artifact));

        let mut slot = match self.current.write() {
            Ok(guard) => guard,
            Err(poisoned) => {
                error!("ModelHandle: lock poisoned during install, recovering");
                poisoned.into_inner()
            }
        };
        *slot = next;
        info!(version, %trained_at, "Model artifact installed");
        Ok(())
    }

    /// Loads the artifact at `path` and swaps it in. On any load or
    /// validation failure the current artifact stays live.
    pub fn reload_from(&self, path: &Path) -> ValuationResult<()> {
        let store = ArtifactStore::new(path);
        let artifact = store.load()?;
        info!(path = %store.path().display(), "Reloading model artifact");
        self.install(artifact)
    }

    pub fn snapshot(&self) -> ValuationResult<LoadedModel> {
        let slot = match self.current.read() {
            Ok(guard) => guard,
            Err(poisoned) => {
                error!("ModelHandle: lock poisoned during read, recovering");
                poisoned.into_inner()
            }
        };
        slot.as_ref()
            .map(|artifact| LoadedModel {
                artifact: Arc::clone(artifact),
            })
            .ok_or(ValuationError::ModelUnavailable)
    }

    pub fn is_loaded(&self) -> bool {
        self.snapshot().is_ok()
    }
}

/// Entry point for valuations: a model slot plus projection policy.
#[derive(Debug, Default)]
pub struct Predictor {
    handle: ModelHandle,
    settings: ProjectionSettings,
}

impl Predictor {
    /// A predictor with no model. Every valuation fails with `ModelUnavailable`
    /// until an artifact is installed.
    pub fn new(settings: ProjectionSettings) -> Self {
        Self {
            handle: ModelHandle::empty(),
            settings,
        }
    }

    pub fn with_artifact(
        artifact: TrainedModelArtifact,
        settings: ProjectionSettings,
    ) -> ValuationResult<Self> {
        let predictor = Self::new(settings);
        predictor.handle.install(artifact)?;
        Ok(predictor)
    }

    pub fn handle(&self) -> &ModelHandle {
        &self.handle
    }

    pub fn settings(&self) -> &ProjectionSettings {
        &self.settings
    }

    /// Current value plus the multi-year depreciation projection, all from
    /// a single artifact snapshot.
    pub fn project(&self, record: &RawVehicleRecord) -> ValuationResult<PredictionResult> {
        self.project_as_of(record, today())
    }

    pub fn project_as_of(
        &self,
        record: &RawVehicleRecord,
        today: NaiveDate,
    ) -> ValuationResult<PredictionResult> {
        let model = self.handle.snapshot()?;
        projection::project(&model, record, &self.settings, today)
    }
}

impl VehicleValuator for Predictor {
    fn predict_current_as_of(
        &self,
        record: &RawVehicleRecord,
        today: NaiveDate,
    ) -> ValuationResult<f64> {
        self.handle.snapshot()?.predict_current_as_of(record, today)
    }

    fn predict_future_as_of(
        &self,
        record: &RawVehicleRecord,
        years_ahead: u32,
        annual_mileage: f64,
        today: NaiveDate,
    ) -> ValuationResult<f64> {
        self.handle
            .snapshot()?
            .predict_future_as_of(record, years_ahead, annual_mileage, today)
    }

    fn name(&self) -> &str {
        "SmartCore Random Forest"
    }

    fn version(&self) -> String {
        self.handle
            .snapshot()
            .map(|model| model.version())
            .unwrap_or_else(|_| "unloaded".to_string())
    }
}
