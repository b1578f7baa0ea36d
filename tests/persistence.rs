use chrono::{TimeZone, Utc};
use metallograph::{
    AnalysisConfiguration, AnalysisError, AnalysisKind, CalibrationRecord, CalibrationStore,
    ConfigurationManager, NodularityOptions, RangeConstraint, SegmentationParams,
};
use tempfile::TempDir;

fn manager() -> (TempDir, ConfigurationManager) {
    let dir = TempDir::new().unwrap();
    let manager = ConfigurationManager::new(dir.path());
    (dir, manager)
}

fn porosity_config(name: &str) -> AnalysisConfiguration {
    let mut config =
        AnalysisConfiguration::new(name, AnalysisKind::Porosity, SegmentationParams::otsu());
    config.filter.circularity = RangeConstraint::new(0.2, 1.0);
    config.filter.area = RangeConstraint::new(4.0, None);
    config
}

#[test]
fn save_load_round_trips_exactly() {
    let (_dir, manager) = manager();
    let config = porosity_config("std-porosity");
    manager.save(&config).unwrap();
    let loaded = manager.load(AnalysisKind::Porosity, "std-porosity").unwrap();
    assert_eq!(loaded, config);
}

#[test]
fn nodularity_configuration_round_trips() {
    let (_dir, manager) = manager();
    let mut config = AnalysisConfiguration::new(
        "astm-a247",
        AnalysisKind::Nodularity,
        SegmentationParams::fixed_threshold(110),
    );
    config.nodularity = Some(NodularityOptions::default());
    manager.save(&config).unwrap();
    let loaded = manager.load(AnalysisKind::Nodularity, "astm-a247").unwrap();
    assert_eq!(loaded, config);
}

#[test]
fn delete_then_load_reports_not_found() {
    let (_dir, manager) = manager();
    manager.save(&porosity_config("std-porosity")).unwrap();
    manager.delete(AnalysisKind::Porosity, "std-porosity").unwrap();
    let err = manager
        .load(AnalysisKind::Porosity, "std-porosity")
        .unwrap_err();
    assert!(matches!(err, AnalysisError::ConfigurationNotFound(name) if name == "std-porosity"));
}

#[test]
fn delete_of_missing_configuration_fails() {
    let (_dir, manager) = manager();
    let err = manager.delete(AnalysisKind::Porosity, "never-saved").unwrap_err();
    assert!(matches!(err, AnalysisError::ConfigurationNotFound(_)));
}

#[test]
fn corrupt_file_fails_closed() {
    let (dir, manager) = manager();
    manager.save(&porosity_config("broken")).unwrap();
    let path = dir.path().join("porosity").join("broken.json");
    std::fs::write(&path, "{ not json").unwrap();
    let err = manager.load(AnalysisKind::Porosity, "broken").unwrap_err();
    assert!(matches!(err, AnalysisError::ConfigCorrupt { .. }));
}

#[test]
fn parseable_but_invalid_content_fails_closed() {
    let (dir, manager) = manager();
    manager.save(&porosity_config("tampered")).unwrap();
    // Rewrite with an out-of-range threshold behind the store's back.
    let path = dir.path().join("porosity").join("tampered.json");
    let mut doc: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    doc["segmentation"]["value"] = serde_json::json!(999);
    std::fs::write(&path, serde_json::to_string(&doc).unwrap()).unwrap();

    let err = manager.load(AnalysisKind::Porosity, "tampered").unwrap_err();
    assert!(matches!(err, AnalysisError::ConfigCorrupt { .. }));
}

#[test]
fn list_is_sorted_and_scoped_by_kind() {
    let (_dir, manager) = manager();
    manager.save(&porosity_config("zeta")).unwrap();
    manager.save(&porosity_config("alpha")).unwrap();
    let mut nodularity = AnalysisConfiguration::new(
        "graphite",
        AnalysisKind::Nodularity,
        SegmentationParams::otsu(),
    );
    nodularity.nodularity = Some(NodularityOptions::default());
    manager.save(&nodularity).unwrap();

    assert_eq!(manager.list(AnalysisKind::Porosity).unwrap(), ["alpha", "zeta"]);
    assert_eq!(manager.list(AnalysisKind::Nodularity).unwrap(), ["graphite"]);
    assert!(manager.list(AnalysisKind::Phase).unwrap().is_empty());
}

#[test]
fn save_overwrites_previous_version() {
    let (_dir, manager) = manager();
    manager.save(&porosity_config("std")).unwrap();
    let mut updated = porosity_config("std");
    updated.segmentation = SegmentationParams::fixed_threshold(90);
    manager.save(&updated).unwrap();
    let loaded = manager.load(AnalysisKind::Porosity, "std").unwrap();
    assert_eq!(loaded.segmentation, updated.segmentation);
}

#[test]
fn latest_calibration_record_wins() {
    let dir = TempDir::new().unwrap();
    let store = CalibrationStore::new(dir.path());

    let mut old = CalibrationRecord::from_measurement("100x", 50.0, 100.0).unwrap();
    old.timestamp = Utc.with_ymd_and_hms(2026, 1, 10, 9, 0, 0).unwrap();
    let mut new = CalibrationRecord::from_measurement("100x", 52.0, 100.0).unwrap();
    new.timestamp = Utc.with_ymd_and_hms(2026, 3, 2, 14, 30, 0).unwrap();

    // Write newest first to prove ordering comes from timestamps, not
    // insertion order.
    store.save(&new).unwrap();
    store.save(&old).unwrap();

    let latest = store.latest("100x").unwrap();
    assert_eq!(latest, new);
    assert_eq!(store.records("100x").unwrap().len(), 2);
}

#[test]
fn calibration_records_are_scoped_by_magnification() {
    let dir = TempDir::new().unwrap();
    let store = CalibrationStore::new(dir.path());
    store
        .save(&CalibrationRecord::from_measurement("100x", 50.0, 100.0).unwrap())
        .unwrap();

    assert!(store.latest("100x").is_ok());
    assert!(matches!(
        store.latest("500x"),
        Err(AnalysisError::CalibrationMissing(_))
    ));
}
