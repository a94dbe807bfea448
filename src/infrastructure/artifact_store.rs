//! Persistence of the trained model artifact.
//!
//! The artifact (model, encoding tables, feature order, imputation statistics)
//! is one JSON document. Saves go to a temporary sibling file that is renamed
//! over the destination, so readers only ever see a complete artifact.

use crate::domain::errors::{ValuationError, ValuationResult};
use crate::domain::ml::artifact::{
    ARTIFACT_FORMAT_VERSION, ForestModel, ImputationStats, TrainedModelArtifact, TrainingMetadata,
};
use crate::domain::ml::encoding::EncoderSet;
use serde::Deserialize;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;

/// On-disk shape, with every part optional so missing parts are reported
/// precisely instead of as a generic parse failure.
#[derive(Deserialize)]
struct PersistedArtifact {
    format_version: Option<u32>,
    model: Option<ForestModel>,
    encoders: Option<EncoderSet>,
    feature_cols: Option<Vec<String>>,
    imputation: Option<ImputationStats>,
    metadata: Option<TrainingMetadata>,
}

pub struct ArtifactStore {
    file_path: PathBuf,
}

impl ArtifactStore {
    pub fn new(file_path: impl Into<PathBuf>) -> Self {
        Self {
            file_path: file_path.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.file_path
    }

    pub fn exists(&self) -> bool {
        self.file_path.exists()
    }

    pub fn save(&self, artifact: &TrainedModelArtifact) -> ValuationResult<()> {
        if let Some(parent) = self.file_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        // Atomic write: write to temp file then rename
        let temp_path = self.temp_path();
        {
            let file = File::create(&temp_path)?;
            let mut writer = BufWriter::new(file);
            serde_json::to_writer(&mut writer, artifact).map_err(|e| {
                ValuationError::ArtifactCorrupt {
                    reason: format!("serialization failed: {}", e),
                }
            })?;
            writer.flush()?;
            writer.get_ref().sync_all()?;
        }
        fs::rename(&temp_path, &self.file_path)?;

        info!(
            version = artifact.format_version,
            "Model saved to {:?}", self.file_path
        );
        Ok(())
    }

    pub fn load(&self) -> ValuationResult<TrainedModelArtifact> {
        if !self.file_path.exists() {
            return Err(ValuationError::ArtifactNotFound {
                path: self.file_path.clone(),
            });
        }

        let reader = BufReader::new(File::open(&self.file_path)?);
        let document: serde_json::Value =
            serde_json::from_reader(reader).map_err(|e| corrupt(format!("not valid JSON: {}", e)))?;

        // Version is checked before the body so a newer layout is reported as
        // such rather than as a parse failure.
        let version = document
            .get("format_version")
            .ok_or_else(|| corrupt("missing format_version"))?
            .as_u64()
            .ok_or_else(|| corrupt("format_version is not an integer"))?;
        if version != u64::from(ARTIFACT_FORMAT_VERSION) {
            return Err(ValuationError::UnsupportedArtifactVersion {
                found: u32::try_from(version).unwrap_or(u32::MAX),
                expected: ARTIFACT_FORMAT_VERSION,
            });
        }

        let persisted: PersistedArtifact =
            serde_json::from_value(document).map_err(|e| corrupt(format!("unreadable body: {}", e)))?;
        let artifact = TrainedModelArtifact {
            format_version: persisted
                .format_version
                .ok_or_else(|| corrupt("missing format_version"))?,
            model: persisted.model.ok_or_else(|| corrupt("missing model"))?,
            encoders: persisted
                .encoders
                .filter(|e| !e.is_empty())
                .ok_or_else(|| corrupt("missing encoders"))?,
            feature_cols: persisted
                .feature_cols
                .filter(|c| !c.is_empty())
                .ok_or_else(|| corrupt("missing feature_cols"))?,
            imputation: persisted
                .imputation
                .ok_or_else(|| corrupt("missing imputation statistics"))?,
            metadata: persisted
                .metadata
                .ok_or_else(|| corrupt("missing training metadata"))?,
        };
        artifact.validate().map_err(|e| match e {
            ValuationError::SchemaMismatch { column } => {
                corrupt(format!("no fitted state for column '{}'", column))
            }
            other => other,
        })?;

        info!(version, "Model loaded from {:?}", self.file_path);
        Ok(artifact)
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .file_path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.file_path.with_file_name(name)
    }
}

fn corrupt(reason: impl Into<String>) -> ValuationError {
    ValuationError::ArtifactCorrupt {
        reason: reason.into(),
    }
}
