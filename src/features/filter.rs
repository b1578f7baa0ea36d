//! Acceptance rules and calibration conversion for candidate features.
//!
//! A feature is accepted only if it satisfies every active constraint —
//! conjunctive, never best-effort. Size constraints apply in the units
//! the measurements are expressed in: calibrated units when a calibration
//! record is supplied, pixels otherwise. Calibrated fields are only ever
//! present with a record; their absence is surfaced, never defaulted.

use super::types::{Feature, RawFeature};
use crate::calibration::CalibrationRecord;
use crate::error::{AnalysisError, Result};
use serde::{Deserialize, Serialize};

/// Optional inclusive [min, max] bound on one measurement.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RangeConstraint {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl RangeConstraint {
    pub fn new(min: impl Into<Option<f64>>, max: impl Into<Option<f64>>) -> Self {
        Self {
            min: min.into(),
            max: max.into(),
        }
    }

    pub fn accepts(&self, value: f64) -> bool {
        self.min.is_none_or(|lo| value >= lo) && self.max.is_none_or(|hi| value <= hi)
    }

    fn validate(&self, what: &str, upper: Option<f64>) -> Result<()> {
        for bound in [self.min, self.max].into_iter().flatten() {
            if !bound.is_finite() || bound < 0.0 {
                return Err(AnalysisError::invalid(format!(
                    "{what} bound must be finite and non-negative, got {bound}"
                )));
            }
            if let Some(hi) = upper {
                if bound > hi {
                    return Err(AnalysisError::invalid(format!(
                        "{what} bound must not exceed {hi}, got {bound}"
                    )));
                }
            }
        }
        if let (Some(lo), Some(hi)) = (self.min, self.max) {
            if lo > hi {
                return Err(AnalysisError::invalid(format!(
                    "{what} range is empty: [{lo}, {hi}]"
                )));
            }
        }
        Ok(())
    }
}

/// Conjunctive acceptance rules for the filter stage.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FilterConstraints {
    /// Circularity range within [0, 1].
    pub circularity: RangeConstraint,
    pub area: RangeConstraint,
    pub length: RangeConstraint,
    pub width: RangeConstraint,
}

impl FilterConstraints {
    pub fn validate(&self) -> Result<()> {
        self.circularity.validate("circularity", Some(1.0))?;
        self.area.validate("area", None)?;
        self.length.validate("length", None)?;
        self.width.validate("width", None)?;
        Ok(())
    }
}

/// Apply the acceptance rules; accepted features receive calibrated
/// fields when `calibration` is supplied.
pub fn filter(
    raw_features: Vec<RawFeature>,
    constraints: &FilterConstraints,
    calibration: Option<&CalibrationRecord>,
) -> Result<Vec<Feature>> {
    constraints.validate()?;

    let scale = calibration.map(|c| c.pixel_size);
    let mut accepted = Vec::new();
    for raw in raw_features {
        let area = scale.map_or(raw.area_px, |s| raw.area_px * s * s);
        let length = scale.map_or(raw.length_px, |s| raw.length_px * s);
        let width = scale.map_or(raw.width_px, |s| raw.width_px * s);

        let keep = constraints.circularity.accepts(raw.circularity)
            && constraints.area.accepts(area)
            && constraints.length.accepts(length)
            && constraints.width.accepts(width);
        if !keep {
            continue;
        }

        accepted.push(Feature {
            boundary: raw.boundary,
            area_px: raw.area_px,
            perimeter_px: raw.perimeter_px,
            circularity: raw.circularity,
            length_px: raw.length_px,
            width_px: raw.width_px,
            bbox: raw.bbox,
            centroid: raw.centroid,
            area_calibrated: scale.map(|s| raw.area_px * s * s),
            length_calibrated: scale.map(|s| raw.length_px * s),
            selected: true,
            size_class: None,
        });
    }
    Ok(accepted)
}
