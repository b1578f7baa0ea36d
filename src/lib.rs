#![doc = include_str!("../README.md")]

// Public modules (stable-ish surface)
pub mod analysis;
pub mod calibration;
pub mod classify;
pub mod config_store;
pub mod error;
pub mod image;
pub mod session;
pub mod stats;

// “Expert” modules – still public, but considered unstable internals.
pub mod features;
pub mod mask;
pub mod preprocess;
pub mod segment;

// --- High-level re-exports -------------------------------------------------

// Main entry points: engine + request/result types.
pub use crate::analysis::{AnalysisEngine, AnalysisKind, AnalysisRequest, AnalysisResult};
pub use crate::error::AnalysisError;

// Persistence and accumulation stores.
pub use crate::calibration::{CalibrationRecord, CalibrationStore};
pub use crate::config_store::{AnalysisConfiguration, ConfigurationManager};
pub use crate::session::{CumulativeResultStore, CumulativeSession};

// Frequently used pipeline types.
pub use crate::classify::{NodularityOptions, NodularityResult, PhaseResult, SizeRange};
pub use crate::features::{Feature, FilterConstraints, RangeConstraint};
pub use crate::image::SourceImage;
pub use crate::segment::SegmentationParams;
pub use crate::stats::{Measurement, Statistics};

// --- Prelude ---------------------------------------------------------------

/// Small prelude for quick experiments.
///
/// ```no_run
/// use metallograph::prelude::*;
///
/// # fn main() -> Result<(), AnalysisError> {
/// let image = SourceImage::from_gray_buffer("field-01", 640, 480, vec![0u8; 640 * 480]);
/// let request = AnalysisRequest::new(AnalysisKind::Porosity, SegmentationParams::otsu());
/// let result = AnalysisEngine::new().analyze(&image, &request)?;
/// println!("features={}", result.features.len());
/// # Ok(())
/// # }
/// ```
pub mod prelude {
    pub use crate::analysis::{AnalysisEngine, AnalysisKind, AnalysisRequest, AnalysisResult};
    pub use crate::error::AnalysisError;
    pub use crate::features::FilterConstraints;
    pub use crate::image::SourceImage;
    pub use crate::segment::SegmentationParams;
}
