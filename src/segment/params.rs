//! Parameter schemas for the preparation methods.
//!
//! One tagged variant per method, each with an explicit set of recognized
//! keys and validated numeric ranges. Unknown keys and out-of-range values
//! are rejected at the boundary, before any pixel is touched.

use crate::error::{AnalysisError, Result};
use serde::{Deserialize, Serialize};

/// Segmentation parameters, tagged by preparation method.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum SegmentationParams {
    Threshold(ThresholdParams),
    EdgeDetect(EdgeDetectParams),
    Adaptive(AdaptiveParams),
    Morphological(MorphologicalParams),
    Color(ColorParams),
}

impl SegmentationParams {
    /// Global threshold with Otsu auto-selection.
    pub fn otsu() -> Self {
        SegmentationParams::Threshold(ThresholdParams::default())
    }

    /// Fixed global threshold at `value`.
    pub fn fixed_threshold(value: i32) -> Self {
        SegmentationParams::Threshold(ThresholdParams {
            value: Some(value),
            ..Default::default()
        })
    }

    pub fn method_name(&self) -> &'static str {
        match self {
            SegmentationParams::Threshold(_) => "threshold",
            SegmentationParams::EdgeDetect(_) => "edge_detect",
            SegmentationParams::Adaptive(_) => "adaptive",
            SegmentationParams::Morphological(_) => "morphological",
            SegmentationParams::Color(_) => "color",
        }
    }

    pub fn validate(&self) -> Result<()> {
        match self {
            SegmentationParams::Threshold(p) => p.validate(),
            SegmentationParams::EdgeDetect(p) => p.validate(),
            SegmentationParams::Adaptive(p) => p.validate(),
            SegmentationParams::Morphological(p) => p.validate(),
            SegmentationParams::Color(p) => p.validate(),
        }
    }
}

fn check_threshold_range(value: i32, what: &str) -> Result<()> {
    if !(0..=255).contains(&value) {
        return Err(AnalysisError::invalid(format!(
            "{what} must be in [0, 255], got {value}"
        )));
    }
    Ok(())
}

fn check_kernel(kernel: i32, what: &str) -> Result<()> {
    if kernel < 1 || kernel % 2 == 0 {
        return Err(AnalysisError::invalid(format!(
            "{what} must be a positive odd kernel size, got {kernel}"
        )));
    }
    if kernel > 63 {
        return Err(AnalysisError::invalid(format!(
            "{what} must not exceed 63, got {kernel}"
        )));
    }
    Ok(())
}

/// Fixed or Otsu-selected global intensity cut.
///
/// Foreground is `intensity <= value` — features of interest (pores,
/// graphite, inclusions) are dark on a bright matrix. `invert` selects the
/// opposite preparation.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ThresholdParams {
    /// Cut value in [0, 255]; `None` selects Otsu's threshold.
    pub value: Option<i32>,
    pub invert: bool,
}

impl ThresholdParams {
    pub fn validate(&self) -> Result<()> {
        if let Some(v) = self.value {
            check_threshold_range(v, "threshold value")?;
        }
        Ok(())
    }
}

/// Gradient-based boundary detection followed by contour closing.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EdgeDetectParams {
    /// Hysteresis low threshold in intensity units [0, 255].
    pub low_threshold: f32,
    /// Hysteresis high threshold in intensity units [0, 255]; must exceed `low_threshold`.
    pub high_threshold: f32,
    /// Radius of the morphological closing applied to the edge mask.
    pub closing_radius: i32,
}

impl Default for EdgeDetectParams {
    fn default() -> Self {
        Self {
            low_threshold: 40.0,
            high_threshold: 100.0,
            closing_radius: 1,
        }
    }
}

impl EdgeDetectParams {
    pub fn validate(&self) -> Result<()> {
        if !self.low_threshold.is_finite() || !self.high_threshold.is_finite() {
            return Err(AnalysisError::invalid("edge thresholds must be finite"));
        }
        if self.low_threshold < 0.0 || self.high_threshold > 255.0 {
            return Err(AnalysisError::invalid(format!(
                "edge thresholds must be in [0, 255], got low={} high={}",
                self.low_threshold, self.high_threshold
            )));
        }
        if self.low_threshold >= self.high_threshold {
            return Err(AnalysisError::invalid(format!(
                "edge low threshold {} must be below high threshold {}",
                self.low_threshold, self.high_threshold
            )));
        }
        if !(0..=15).contains(&self.closing_radius) {
            return Err(AnalysisError::invalid(format!(
                "closing radius must be in [0, 15], got {}",
                self.closing_radius
            )));
        }
        Ok(())
    }
}

/// Local-neighborhood thresholding, tolerant of uneven illumination.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AdaptiveParams {
    /// Odd window size (>= 3) of the local mean.
    pub window: i32,
    /// Subtracted from the local mean before comparison; may be negative.
    pub offset: f32,
    pub invert: bool,
}

impl Default for AdaptiveParams {
    fn default() -> Self {
        Self {
            window: 31,
            offset: 5.0,
            invert: false,
        }
    }
}

impl AdaptiveParams {
    pub fn validate(&self) -> Result<()> {
        if self.window < 3 || self.window % 2 == 0 {
            return Err(AnalysisError::invalid(format!(
                "adaptive window must be an odd size >= 3, got {}",
                self.window
            )));
        }
        if !self.offset.is_finite() || self.offset.abs() > 255.0 {
            return Err(AnalysisError::invalid(format!(
                "adaptive offset must be in [-255, 255], got {}",
                self.offset
            )));
        }
        Ok(())
    }
}

/// One step of mask denoising.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MorphOpKind {
    Erode,
    Dilate,
    Open,
    Close,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MorphOp {
    pub op: MorphOpKind,
    /// Odd square structuring-element size.
    pub kernel: i32,
}

/// Threshold followed by a sequence of erosion/dilation/opening/closing
/// steps to denoise the mask.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MorphologicalParams {
    /// Cut value in [0, 255]; `None` selects Otsu's threshold.
    pub value: Option<i32>,
    pub invert: bool,
    pub operations: Vec<MorphOp>,
}

impl Default for MorphologicalParams {
    fn default() -> Self {
        Self {
            value: None,
            invert: false,
            operations: vec![MorphOp {
                op: MorphOpKind::Open,
                kernel: 3,
            }],
        }
    }
}

impl MorphologicalParams {
    pub fn validate(&self) -> Result<()> {
        if let Some(v) = self.value {
            check_threshold_range(v, "threshold value")?;
        }
        for (i, op) in self.operations.iter().enumerate() {
            check_kernel(op.kernel, &format!("morphological operation {i} kernel"))?;
        }
        Ok(())
    }
}

/// Hue/saturation/value range selection for coloured phases/inclusions.
///
/// Hue is in degrees; `hue_min > hue_max` selects a range wrapping through
/// 360° (e.g. reds). Saturation and value are fractions in [0, 1].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ColorParams {
    pub hue_min: f32,
    pub hue_max: f32,
    pub sat_min: f32,
    pub sat_max: f32,
    pub val_min: f32,
    pub val_max: f32,
}

impl Default for ColorParams {
    fn default() -> Self {
        Self {
            hue_min: 0.0,
            hue_max: 360.0,
            sat_min: 0.0,
            sat_max: 1.0,
            val_min: 0.0,
            val_max: 1.0,
        }
    }
}

impl ColorParams {
    pub fn validate(&self) -> Result<()> {
        for (v, what) in [(self.hue_min, "hue_min"), (self.hue_max, "hue_max")] {
            if !v.is_finite() || !(0.0..=360.0).contains(&v) {
                return Err(AnalysisError::invalid(format!(
                    "{what} must be in [0, 360], got {v}"
                )));
            }
        }
        for (lo, hi, what) in [
            (self.sat_min, self.sat_max, "saturation"),
            (self.val_min, self.val_max, "value"),
        ] {
            if !lo.is_finite() || !hi.is_finite() || lo < 0.0 || hi > 1.0 {
                return Err(AnalysisError::invalid(format!(
                    "{what} range must lie in [0, 1], got [{lo}, {hi}]"
                )));
            }
            if lo > hi {
                return Err(AnalysisError::invalid(format!(
                    "{what} range is empty: [{lo}, {hi}]"
                )));
            }
        }
        Ok(())
    }
}
