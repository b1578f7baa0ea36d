//! Analysis engine orchestrating the segment → extract → filter →
//! classify/aggregate pipeline.
//!
//! One invocation is a synchronous, single-threaded computation over one
//! image: no suspension points, deterministic for fixed inputs and
//! parameters. The analysis kinds share the pipeline and differ only in
//! the classifier variant composed at the end.

use crate::calibration::CalibrationRecord;
use crate::classify::{self, NodularityOptions, NodularityResult, PhaseResult};
use crate::error::{AnalysisError, Result};
use crate::features::{self, Feature, FilterConstraints};
use crate::image::SourceImage;
use crate::preprocess::{self, PreprocessParams};
use crate::segment::{self, SegmentationParams};
use crate::stats::{self, Measurement, Statistics, DEFAULT_HISTOGRAM_BINS};
use chrono::{DateTime, Utc};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

/// The analysis module requesting the pipeline run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisKind {
    Porosity,
    Nodularity,
    Phase,
    Inclusion,
}

impl AnalysisKind {
    /// Directory name used by the persistence stores.
    pub fn dir_name(self) -> &'static str {
        match self {
            AnalysisKind::Porosity => "porosity",
            AnalysisKind::Nodularity => "nodularity",
            AnalysisKind::Phase => "phase",
            AnalysisKind::Inclusion => "inclusion",
        }
    }
}

/// Everything one analysis invocation needs besides the image.
#[derive(Clone, Debug)]
pub struct AnalysisRequest {
    pub kind: AnalysisKind,
    pub preprocess: Option<PreprocessParams>,
    pub segmentation: SegmentationParams,
    pub filter: FilterConstraints,
    /// Absent calibration is not fatal: the analysis proceeds in pixel
    /// units and the result is marked uncalibrated.
    pub calibration: Option<CalibrationRecord>,
    /// Nodularity classifier settings; defaults apply when `None` and the
    /// kind is nodularity.
    pub nodularity: Option<NodularityOptions>,
    pub measurement: Measurement,
    pub histogram_bins: usize,
}

impl AnalysisRequest {
    pub fn new(kind: AnalysisKind, segmentation: SegmentationParams) -> Self {
        Self {
            kind,
            preprocess: None,
            segmentation,
            filter: FilterConstraints::default(),
            calibration: None,
            nodularity: None,
            measurement: Measurement::default(),
            histogram_bins: DEFAULT_HISTOGRAM_BINS,
        }
    }

    /// Build a request from a saved configuration.
    pub fn from_configuration(config: &crate::config_store::AnalysisConfiguration) -> Self {
        let mut request = Self::new(config.kind, config.segmentation.clone());
        request.filter = config.filter.clone();
        request.nodularity = config.nodularity.clone();
        request
    }

    pub fn with_calibration(mut self, record: CalibrationRecord) -> Self {
        self.calibration = Some(record);
        self
    }

    fn validate(&self) -> Result<()> {
        self.segmentation.validate()?;
        self.filter.validate()?;
        if let Some(p) = &self.preprocess {
            p.validate()?;
        }
        if let Some(nodularity) = &self.nodularity {
            if self.kind != AnalysisKind::Nodularity {
                return Err(AnalysisError::invalid(format!(
                    "nodularity options are not valid for {:?} analysis",
                    self.kind
                )));
            }
            nodularity.validate()?;
        }
        if let Some(calibration) = &self.calibration {
            if !calibration.pixel_size.is_finite() || calibration.pixel_size <= 0.0 {
                return Err(AnalysisError::invalid(format!(
                    "calibration pixel size must be positive, got {}",
                    calibration.pixel_size
                )));
            }
        }
        if self.histogram_bins == 0 {
            return Err(AnalysisError::invalid("histogram needs at least one bin"));
        }
        Ok(())
    }
}

/// Outcome of one analysis invocation. Immutable after creation except
/// for `selected` toggles on contained features.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub source_image_id: String,
    pub kind: AnalysisKind,
    /// Accepted features in extraction order.
    pub features: Vec<Feature>,
    pub statistics: Statistics,
    pub nodularity: Option<NodularityResult>,
    pub phase: Option<PhaseResult>,
    /// Whether the measurements carry physical units.
    pub calibrated: bool,
    pub created_at: DateTime<Utc>,
}

impl AnalysisResult {
    /// Zero accepted features — a valid outcome, not an error.
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Sum of feature areas in measurement units.
    pub fn total_feature_area(&self) -> f64 {
        self.features.iter().map(|f| f.area()).sum()
    }

    /// Toggle a feature in or out of the aggregate score. Recomputes the
    /// nodularity score from the surviving selection without re-running
    /// segmentation.
    pub fn set_selected(&mut self, index: usize, selected: bool) -> Result<()> {
        let len = self.features.len();
        let feature = self.features.get_mut(index).ok_or_else(|| {
            AnalysisError::invalid(format!("feature index {index} out of range (0..{len})"))
        })?;
        feature.selected = selected;
        if let Some(nodularity) = &mut self.nodularity {
            classify::rescore(nodularity, &self.features);
        }
        Ok(())
    }
}

/// Shared feature-detection pipeline with a pluggable classifier variant
/// per analysis kind.
#[derive(Clone, Copy, Debug, Default)]
pub struct AnalysisEngine;

impl AnalysisEngine {
    pub fn new() -> Self {
        Self
    }

    pub fn analyze(&self, image: &SourceImage, request: &AnalysisRequest) -> Result<AnalysisResult> {
        request.validate()?;

        let prepared;
        let source = match &request.preprocess {
            Some(params) => {
                prepared = image.clone().with_gray(preprocess::apply(image.gray(), params));
                &prepared
            }
            None => image,
        };

        let mask = segment::segment(source, &request.segmentation)?;
        debug!(
            "analysis: {} mask covers {:.1}% of {}x{}",
            request.segmentation.method_name(),
            mask.foreground_fraction() * 100.0,
            mask.w,
            mask.h
        );

        let raw = features::extract(&mask);
        let mut accepted =
            features::filter(raw, &request.filter, request.calibration.as_ref())?;
        debug!("analysis: {} features accepted", accepted.len());

        let values: Vec<f64> = accepted
            .iter()
            .map(|f| match request.measurement {
                Measurement::Area => f.area(),
                Measurement::EquivalentDiameter => f.equivalent_diameter(),
            })
            .collect();
        let statistics = stats::aggregate(&values, request.histogram_bins);

        let nodularity = if request.kind == AnalysisKind::Nodularity {
            let options = request.nodularity.clone().unwrap_or_default();
            Some(classify::classify(&mut accepted, &options)?)
        } else {
            None
        };
        let phase = (request.kind == AnalysisKind::Phase).then(|| {
            classify::phase_fraction(&accepted, (source.width() * source.height()) as f64)
        });

        if accepted.is_empty() {
            warn!(
                "analysis: no features accepted for image {:?}",
                source.image_id()
            );
        }

        Ok(AnalysisResult {
            source_image_id: source.image_id().to_string(),
            kind: request.kind,
            features: accepted,
            statistics,
            nodularity,
            phase,
            calibrated: request.calibration.is_some(),
            created_at: Utc::now(),
        })
    }
}
