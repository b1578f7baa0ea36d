//! Pixel-to-physical-unit calibration, keyed by magnification.
//!
//! Records are immutable once written; a magnification may accumulate
//! several records over time and the most recent timestamp is
//! authoritative. On disk each record is one timestamped JSON document
//! inside a per-magnification directory.

use crate::error::{AnalysisError, Result};
use crate::image::io::write_json_atomic;
use chrono::{DateTime, Utc};
use log::warn;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// One pixel-to-physical-unit conversion measurement.
///
/// `pixel_size` is physical units per pixel: `known_distance / pixel_count`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalibrationRecord {
    pub magnification: String,
    pub pixel_size: f64,
    pub known_distance: f64,
    pub pixel_count: f64,
    pub timestamp: DateTime<Utc>,
}

impl CalibrationRecord {
    /// Derive a record from a measured known distance spanning
    /// `pixel_count` pixels.
    pub fn from_measurement(
        magnification: impl Into<String>,
        known_distance: f64,
        pixel_count: f64,
    ) -> Result<Self> {
        let magnification = magnification.into();
        check_magnification(&magnification)?;
        if !known_distance.is_finite() || known_distance <= 0.0 {
            return Err(AnalysisError::invalid(format!(
                "known distance must be positive, got {known_distance}"
            )));
        }
        if !pixel_count.is_finite() || pixel_count <= 0.0 {
            return Err(AnalysisError::invalid(format!(
                "pixel count must be positive, got {pixel_count}"
            )));
        }
        Ok(Self {
            magnification,
            pixel_size: known_distance / pixel_count,
            known_distance,
            pixel_count,
            timestamp: Utc::now(),
        })
    }
}

fn check_magnification(magnification: &str) -> Result<()> {
    if magnification.is_empty()
        || magnification.contains(['/', '\\'])
        || magnification == "."
        || magnification == ".."
    {
        return Err(AnalysisError::invalid(format!(
            "magnification key {magnification:?} is not usable as a directory name"
        )));
    }
    Ok(())
}

/// Persists and retrieves calibration records.
pub struct CalibrationStore {
    dir: PathBuf,
    write_lock: Mutex<()>,
}

impl CalibrationStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Persist a record as a new timestamped document. Existing records
    /// are never rewritten.
    pub fn save(&self, record: &CalibrationRecord) -> Result<()> {
        check_magnification(&record.magnification)?;
        if !record.pixel_size.is_finite() || record.pixel_size <= 0.0 {
            return Err(AnalysisError::invalid(format!(
                "pixel size must be positive, got {}",
                record.pixel_size
            )));
        }

        let _guard = self.write_lock.lock();
        let name = format!("{}.json", record.timestamp.format("%Y%m%dT%H%M%S%.9fZ"));
        let path = self.dir.join(&record.magnification).join(name);
        write_json_atomic(&path, record)
    }

    /// All records for a magnification, oldest first.
    ///
    /// Records that fail to parse are skipped with a warning: the store is
    /// append-only, so one damaged document must not mask the others.
    pub fn records(&self, magnification: &str) -> Result<Vec<CalibrationRecord>> {
        check_magnification(magnification)?;
        let dir = self.dir.join(magnification);
        let entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(AnalysisError::CalibrationMissing(magnification.to_string()))
            }
            Err(e) => return Err(AnalysisError::io(&dir, e)),
        };

        let mut records = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| AnalysisError::io(&dir, e))?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match read_record(&path) {
                Ok(record) => records.push(record),
                Err(e) => warn!("calibration: skipping unreadable record {}: {e}", path.display()),
            }
        }
        records.sort_by_key(|r| r.timestamp);
        Ok(records)
    }

    /// Most recent record for a magnification.
    pub fn latest(&self, magnification: &str) -> Result<CalibrationRecord> {
        self.records(magnification)?
            .pop()
            .ok_or_else(|| AnalysisError::CalibrationMissing(magnification.to_string()))
    }
}

fn read_record(path: &Path) -> Result<CalibrationRecord> {
    let data = std::fs::read_to_string(path).map_err(|e| AnalysisError::io(path, e))?;
    serde_json::from_str(&data).map_err(|e| AnalysisError::io(path, std::io::Error::other(e)))
}
