mod common;

use autovalue::application::ml::predictor::{ModelHandle, VehicleValuator};
use autovalue::application::ml::trainer;
use autovalue::domain::errors::ValuationError;
use autovalue::domain::ml::artifact::ARTIFACT_FORMAT_VERSION;
use autovalue::domain::ml::feature_schema;
use autovalue::domain::vehicle::RawVehicleRecord;
use autovalue::infrastructure::artifact_store::ArtifactStore;
use chrono::NaiveDate;
use common::{quick_options, reference_listings, sample_vehicle};

fn valuation_day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2021, 7, 15).unwrap()
}

fn probe_records() -> Vec<RawVehicleRecord> {
    let mut probes: Vec<RawVehicleRecord> = reference_listings(40).into_iter().step_by(7).collect();
    probes.push(sample_vehicle());
    probes.push(RawVehicleRecord {
        make_name: Some("Trabant".to_string()),
        ..sample_vehicle()
    });
    probes
}

#[test]
fn test_save_load_roundtrip_preserves_all_parts() {
    let dir = tempfile::tempdir().unwrap();
    let store = ArtifactStore::new(dir.path().join("saved").join("vehicle_model.json"));

    let artifact = trainer::train(&reference_listings(200), &quick_options()).unwrap();
    store.save(&artifact).unwrap();
    assert!(store.exists());

    let loaded = store.load().unwrap();
    assert_eq!(loaded.feature_cols, artifact.feature_cols);
    assert_eq!(loaded.feature_cols, feature_schema::feature_columns());
    assert_eq!(loaded.encoders, artifact.encoders);
    assert_eq!(loaded.imputation, artifact.imputation);
    assert_eq!(loaded.metadata, artifact.metadata);

    let day = valuation_day();
    let before = ModelHandle::empty();
    before.install(artifact).unwrap();
    let after = ModelHandle::empty();
    after.install(loaded).unwrap();

    let before = before.snapshot().unwrap();
    let after = after.snapshot().unwrap();
    for probe in probe_records() {
        assert_eq!(
            before.predict_current_as_of(&probe, day).unwrap(),
            after.predict_current_as_of(&probe, day).unwrap()
        );
    }
}

#[test]
fn test_save_leaves_no_temporary_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("model.json");
    let store = ArtifactStore::new(&path);

    let artifact = trainer::train(&reference_listings(60), &quick_options()).unwrap();
    store.save(&artifact).unwrap();
    // Overwrite in place
    store.save(&artifact).unwrap();

    let names: Vec<String> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["model.json".to_string()]);
}

#[test]
fn test_truncated_artifact_is_corrupt() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("model.json");
    let store = ArtifactStore::new(&path);

    let artifact = trainer::train(&reference_listings(60), &quick_options()).unwrap();
    store.save(&artifact).unwrap();

    let bytes = std::fs::read(&path).unwrap();
    std::fs::write(&path, &bytes[..bytes.len() / 2]).unwrap();

    assert!(matches!(
        store.load(),
        Err(ValuationError::ArtifactCorrupt { .. })
    ));
}

#[test]
fn test_reordered_feature_columns_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("model.json");
    let store = ArtifactStore::new(&path);

    let mut artifact = trainer::train(&reference_listings(60), &quick_options()).unwrap();
    artifact.feature_cols.swap(0, 1);
    // Saving is allowed; the drift is caught when the artifact is read back
    store.save(&artifact).unwrap();

    assert!(matches!(
        store.load(),
        Err(ValuationError::ArtifactCorrupt { .. })
    ));
}

#[test]
fn test_reload_from_path_swaps_in_saved_artifact() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("model.json");
    let store = ArtifactStore::new(&path);
    let day = valuation_day();
    let probe = sample_vehicle();

    let first = trainer::train(&reference_listings(120), &quick_options()).unwrap();
    let handle = ModelHandle::empty();
    handle.install(first).unwrap();
    let old_value = handle.snapshot().unwrap().predict_current_as_of(&probe, day).unwrap();

    let doubled: Vec<RawVehicleRecord> = reference_listings(120)
        .into_iter()
        .map(|r| RawVehicleRecord {
            price: r.price.map(|p| p * 2.0),
            ..r
        })
        .collect();
    let second = trainer::train(&doubled, &quick_options()).unwrap();
    store.save(&second).unwrap();

    handle.reload_from(store.path()).unwrap();

    let model = handle.snapshot().unwrap();
    assert_eq!(model.version(), format!("v{}", ARTIFACT_FORMAT_VERSION));
    assert_eq!(model.name(), "SmartCore Random Forest");
    assert!(model.predict_current_as_of(&probe, day).unwrap() > old_value);
}

#[test]
fn test_failed_reload_keeps_previous_artifact_live() {
    let dir = tempfile::tempdir().unwrap();
    let day = valuation_day();
    let probe = sample_vehicle();

    let artifact = trainer::train(&reference_listings(60), &quick_options()).unwrap();
    let handle = ModelHandle::empty();
    handle.install(artifact).unwrap();
    let before = handle.snapshot().unwrap().predict_current_as_of(&probe, day).unwrap();

    // Missing file
    let missing = dir.path().join("absent.json");
    assert!(matches!(
        handle.reload_from(&missing),
        Err(ValuationError::ArtifactNotFound { .. })
    ));

    // Unreadable file
    let garbage = dir.path().join("garbage.json");
    std::fs::write(&garbage, b"{ not an artifact").unwrap();
    assert!(matches!(
        handle.reload_from(&garbage),
        Err(ValuationError::ArtifactCorrupt { .. })
    ));

    // Future format version
    let future = dir.path().join("future.json");
    std::fs::write(&future, r#"{"format_version": 99}"#).unwrap();
    assert!(matches!(
        handle.reload_from(&future),
        Err(ValuationError::UnsupportedArtifactVersion { .. })
    ));

    let after = handle.snapshot().unwrap().predict_current_as_of(&probe, day).unwrap();
    assert_eq!(before, after);
}

#[test]
fn test_reload_swaps_without_disturbing_inflight_snapshot() {
    let day = valuation_day();
    let probe = sample_vehicle();

    let first = trainer::train(&reference_listings(120), &quick_options()).unwrap();
    let doubled: Vec<RawVehicleRecord> = reference_listings(120)
        .into_iter()
        .map(|r| RawVehicleRecord {
            price: r.price.map(|p| p * 2.0),
            ..r
        })
        .collect();
    let second = trainer::train(&doubled, &quick_options()).unwrap();

    let handle = ModelHandle::empty();
    handle.install(first).unwrap();
    let inflight = handle.snapshot().unwrap();
    let old_value = inflight.predict_current_as_of(&probe, day).unwrap();

    handle.install(second).unwrap();

    // The earlier snapshot still answers from the first model
    assert_eq!(inflight.predict_current_as_of(&probe, day).unwrap(), old_value);
    let new_value = handle
        .snapshot()
        .unwrap()
        .predict_current_as_of(&probe, day)
        .unwrap();
    assert!(new_value > old_value);
}
