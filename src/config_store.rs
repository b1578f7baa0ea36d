//! Crash-safe persistence of named parameter sets.
//!
//! One JSON document per saved configuration, named by configuration
//! name, inside a per-analysis-kind directory. Saves go through a
//! temporary file and an atomic rename, so a crash mid-write never leaves
//! a corrupt or partial document and a failed rename leaves the previous
//! version intact.

use crate::analysis::AnalysisKind;
use crate::classify::NodularityOptions;
use crate::error::{AnalysisError, Result};
use crate::features::FilterConstraints;
use crate::image::io::write_json_atomic;
use crate::segment::SegmentationParams;
use chrono::{DateTime, Utc};
use log::info;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A named, persisted parameter set for one analysis kind.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AnalysisConfiguration {
    pub name: String,
    pub kind: AnalysisKind,
    pub segmentation: SegmentationParams,
    #[serde(default)]
    pub filter: FilterConstraints,
    /// Only meaningful (and only accepted) for the nodularity kind.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nodularity: Option<NodularityOptions>,
    pub updated_at: DateTime<Utc>,
}

impl AnalysisConfiguration {
    pub fn new(
        name: impl Into<String>,
        kind: AnalysisKind,
        segmentation: SegmentationParams,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            segmentation,
            filter: FilterConstraints::default(),
            nodularity: None,
            updated_at: Utc::now(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        check_name(&self.name)?;
        self.segmentation.validate()?;
        self.filter.validate()?;
        if let Some(nodularity) = &self.nodularity {
            if self.kind != AnalysisKind::Nodularity {
                return Err(AnalysisError::invalid(format!(
                    "nodularity options are not valid for {:?} configurations",
                    self.kind
                )));
            }
            nodularity.validate()?;
        }
        Ok(())
    }
}

fn check_name(name: &str) -> Result<()> {
    if name.is_empty() || name.contains(['/', '\\']) || name == "." || name == ".." {
        return Err(AnalysisError::invalid(format!(
            "configuration name {name:?} is not usable as a file name"
        )));
    }
    Ok(())
}

/// Atomic save/load/list/delete of named configurations.
pub struct ConfigurationManager {
    dir: PathBuf,
    write_lock: Mutex<()>,
}

impl ConfigurationManager {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            write_lock: Mutex::new(()),
        }
    }

    fn path_for(&self, kind: AnalysisKind, name: &str) -> PathBuf {
        self.dir.join(kind.dir_name()).join(format!("{name}.json"))
    }

    /// Save (create or overwrite) a configuration under its name.
    pub fn save(&self, config: &AnalysisConfiguration) -> Result<()> {
        config.validate()?;
        let _guard = self.write_lock.lock();
        let path = self.path_for(config.kind, &config.name);
        write_json_atomic(&path, config)?;
        info!(
            "configuration: saved {:?} for {}",
            config.name,
            config.kind.dir_name()
        );
        Ok(())
    }

    /// Load a configuration by name, failing closed on damaged files.
    pub fn load(&self, kind: AnalysisKind, name: &str) -> Result<AnalysisConfiguration> {
        check_name(name)?;
        let path = self.path_for(kind, name);
        let data = match std::fs::read_to_string(&path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(AnalysisError::ConfigurationNotFound(name.to_string()))
            }
            Err(e) => return Err(AnalysisError::io(&path, e)),
        };
        let config: AnalysisConfiguration =
            serde_json::from_str(&data).map_err(|e| AnalysisError::ConfigCorrupt {
                path: path.clone(),
                reason: e.to_string(),
            })?;
        config.validate().map_err(|e| AnalysisError::ConfigCorrupt {
            path,
            reason: e.to_string(),
        })?;
        Ok(config)
    }

    /// Names of all saved configurations of a kind, sorted.
    pub fn list(&self, kind: AnalysisKind) -> Result<Vec<String>> {
        let dir = self.dir.join(kind.dir_name());
        let entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(AnalysisError::io(&dir, e)),
        };
        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| AnalysisError::io(&dir, e))?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                names.push(stem.to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    /// Remove a configuration by name.
    pub fn delete(&self, kind: AnalysisKind, name: &str) -> Result<()> {
        check_name(name)?;
        let _guard = self.write_lock.lock();
        let path = self.path_for(kind, name);
        match std::fs::remove_file(&path) {
            Ok(()) => {
                info!("configuration: deleted {name:?} for {}", kind.dir_name());
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(AnalysisError::ConfigurationNotFound(name.to_string()))
            }
            Err(e) => Err(AnalysisError::io(&path, e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_with_separators_rejected() {
        let config = AnalysisConfiguration::new(
            "../escape",
            AnalysisKind::Porosity,
            SegmentationParams::otsu(),
        );
        assert!(matches!(
            config.validate(),
            Err(AnalysisError::InvalidParameter(_))
        ));
    }

    #[test]
    fn nodularity_options_only_for_nodularity_kind() {
        let mut config = AnalysisConfiguration::new(
            "std-porosity",
            AnalysisKind::Porosity,
            SegmentationParams::otsu(),
        );
        config.nodularity = Some(NodularityOptions::default());
        assert!(config.validate().is_err());

        config.kind = AnalysisKind::Nodularity;
        assert!(config.validate().is_ok());
    }
}
