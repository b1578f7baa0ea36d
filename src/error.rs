//! Error kinds shared across the analysis engine.
//!
//! Parameter and lookup errors surface immediately to the caller; nothing
//! is retried inside the engine. A missing calibration is deliberately
//! not fatal — the pipeline proceeds in pixel units and marks the result
//! as uncalibrated.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AnalysisError {
    /// Out-of-range or ill-typed segmentation/filter parameter, rejected
    /// before any pixel is touched.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("image not found: {0}")]
    ImageNotFound(PathBuf),

    #[error("failed to decode image {path}: {reason}")]
    ImageDecode { path: PathBuf, reason: String },

    /// No calibration record exists for the requested magnification.
    #[error("no calibration record for magnification {0:?}")]
    CalibrationMissing(String),

    #[error("configuration {0:?} not found")]
    ConfigurationNotFound(String),

    /// A persisted configuration failed to parse. Fail closed; never
    /// fabricate defaults from a broken file.
    #[error("configuration file {path} is corrupt: {reason}")]
    ConfigCorrupt { path: PathBuf, reason: String },

    #[error("i/o error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl AnalysisError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        AnalysisError::InvalidParameter(msg.into())
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        AnalysisError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T, E = AnalysisError> = std::result::Result<T, E>;
