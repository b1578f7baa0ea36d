//! Per-analysis-kind classifiers.
//!
//! The pipeline composes a classifier variant instead of specializing the
//! whole analyzer: porosity and inclusion analysis use none, nodularity
//! uses a circularity cutoff with eight size ranges, phase segmentation
//! reports an area fraction.

use crate::error::{AnalysisError, Result};
use crate::features::Feature;
use serde::{Deserialize, Serialize};

/// One size bucket, `(min, max]` except the first which also owns its
/// lower edge. A value equal to the edge between two buckets belongs to
/// the lower bucket.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SizeRange {
    pub label: String,
    pub min: f64,
    pub max: f64,
}

impl SizeRange {
    pub fn new(min: f64, max: f64) -> Self {
        Self {
            label: format!("{min}-{max}"),
            min,
            max,
        }
    }
}

/// Nodularity classifier settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NodularityOptions {
    /// Features at or above this circularity count as nodular.
    pub circularity_cutoff: f64,
    /// Eight contiguous ascending buckets over equivalent diameter, in
    /// measurement units (calibrated when a calibration applies).
    pub size_ranges: Vec<SizeRange>,
}

impl Default for NodularityOptions {
    fn default() -> Self {
        let edges = [0.0, 5.0, 10.0, 15.0, 20.0, 30.0, 40.0, 60.0, 120.0];
        Self {
            circularity_cutoff: 0.6,
            size_ranges: edges
                .windows(2)
                .map(|e| SizeRange::new(e[0], e[1]))
                .collect(),
        }
    }
}

impl NodularityOptions {
    pub fn validate(&self) -> Result<()> {
        if !self.circularity_cutoff.is_finite() || !(0.0..=1.0).contains(&self.circularity_cutoff)
        {
            return Err(AnalysisError::invalid(format!(
                "circularity cutoff must be in [0, 1], got {}",
                self.circularity_cutoff
            )));
        }
        if self.size_ranges.len() != 8 {
            return Err(AnalysisError::invalid(format!(
                "nodularity needs exactly 8 size ranges, got {}",
                self.size_ranges.len()
            )));
        }
        for (i, range) in self.size_ranges.iter().enumerate() {
            if !range.min.is_finite() || !range.max.is_finite() || range.min >= range.max {
                return Err(AnalysisError::invalid(format!(
                    "size range {i} is empty or non-finite: [{}, {}]",
                    range.min, range.max
                )));
            }
            if i == 0 && range.min < 0.0 {
                return Err(AnalysisError::invalid(format!(
                    "size ranges must start at a non-negative value, got {}",
                    range.min
                )));
            }
            if i > 0 && (range.min - self.size_ranges[i - 1].max).abs() > 1e-9 {
                return Err(AnalysisError::invalid(format!(
                    "size ranges must be contiguous and ascending; range {i} starts at {} after {}",
                    range.min,
                    self.size_ranges[i - 1].max
                )));
            }
        }
        Ok(())
    }
}

/// Outcome of a nodularity classification.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodularityResult {
    pub circularity_cutoff: f64,
    pub size_ranges: Vec<SizeRange>,
    /// Feature counts per bucket; sums to the classified feature count.
    pub size_range_counts: Vec<u64>,
    pub nodular_count: u64,
    pub non_nodular_count: u64,
    pub nodular_size_sum: f64,
    pub total_size_sum: f64,
    /// Nodular size over total size, in [0, 1]; `None` when the total is
    /// zero — never reported as 0.
    pub score: Option<f64>,
}

/// Bucket index owning `value`: the first bucket whose upper edge is at or
/// above it. Values beyond the covered span land in the end buckets so
/// every feature is classified exactly once.
pub fn bucket_for(ranges: &[SizeRange], value: f64) -> usize {
    for (i, range) in ranges.iter().enumerate() {
        if value <= range.max {
            return i;
        }
    }
    ranges.len() - 1
}

/// Classify features as nodular/non-nodular, assign size buckets, and
/// compute the aggregate score over the selected features.
pub fn classify(features: &mut [Feature], options: &NodularityOptions) -> Result<NodularityResult> {
    options.validate()?;

    let mut counts = vec![0u64; options.size_ranges.len()];
    for feature in features.iter_mut() {
        let bucket = bucket_for(&options.size_ranges, feature.equivalent_diameter());
        feature.size_class = Some(bucket);
        counts[bucket] += 1;
    }

    let (nodular_count, non_nodular_count, nodular_sum, total_sum, score) =
        score_selected(features, options.circularity_cutoff);

    Ok(NodularityResult {
        circularity_cutoff: options.circularity_cutoff,
        size_ranges: options.size_ranges.clone(),
        size_range_counts: counts,
        nodular_count,
        non_nodular_count,
        nodular_size_sum: nodular_sum,
        total_size_sum: total_sum,
        score,
    })
}

/// Recompute the aggregate score from the currently selected features,
/// without re-running segmentation.
pub fn rescore(result: &mut NodularityResult, features: &[Feature]) {
    let (nodular_count, non_nodular_count, nodular_sum, total_sum, score) =
        score_selected(features, result.circularity_cutoff);
    result.nodular_count = nodular_count;
    result.non_nodular_count = non_nodular_count;
    result.nodular_size_sum = nodular_sum;
    result.total_size_sum = total_sum;
    result.score = score;
}

fn score_selected(features: &[Feature], cutoff: f64) -> (u64, u64, f64, f64, Option<f64>) {
    let mut nodular_count = 0u64;
    let mut non_nodular_count = 0u64;
    let mut nodular_sum = 0.0;
    let mut total_sum = 0.0;
    for feature in features.iter().filter(|f| f.selected) {
        let size = feature.area();
        total_sum += size;
        if feature.circularity >= cutoff {
            nodular_count += 1;
            nodular_sum += size;
        } else {
            non_nodular_count += 1;
        }
    }
    let score = (total_sum > 0.0).then(|| nodular_sum / total_sum);
    (nodular_count, non_nodular_count, nodular_sum, total_sum, score)
}

/// Phase-segmentation outcome: the fraction of the frame covered by the
/// accepted features.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhaseResult {
    pub feature_area_px: f64,
    pub image_area_px: f64,
    /// `feature_area / image_area` in [0, 1]; unit-free, so calibration
    /// does not change it.
    pub area_fraction: f64,
}

pub fn phase_fraction(features: &[Feature], image_area_px: f64) -> PhaseResult {
    let feature_area_px: f64 = features.iter().map(|f| f.area_px).sum();
    let area_fraction = if image_area_px > 0.0 {
        (feature_area_px / image_area_px).clamp(0.0, 1.0)
    } else {
        0.0
    };
    PhaseResult {
        feature_area_px,
        image_area_px,
        area_fraction,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::BoundingBox;

    fn feature(area_px: f64, circularity: f64) -> Feature {
        Feature {
            boundary: vec![[0.0, 0.0]],
            area_px,
            perimeter_px: 10.0,
            circularity,
            length_px: 4.0,
            width_px: 4.0,
            bbox: BoundingBox { x: 0, y: 0, w: 4, h: 4 },
            centroid: [0.0, 0.0],
            area_calibrated: None,
            length_calibrated: None,
            selected: true,
            size_class: None,
        }
    }

    #[test]
    fn boundary_value_belongs_to_lower_bucket() {
        let ranges: Vec<SizeRange> = [0.0, 5.0, 10.0, 15.0, 20.0, 30.0, 40.0, 60.0, 120.0]
            .windows(2)
            .map(|e| SizeRange::new(e[0], e[1]))
            .collect();
        assert_eq!(bucket_for(&ranges, 5.0), 0);
        assert_eq!(bucket_for(&ranges, 5.1), 1);
        assert_eq!(bucket_for(&ranges, 0.0), 0);
        assert_eq!(bucket_for(&ranges, 999.0), 7);
    }

    #[test]
    fn counts_sum_to_classified_features() {
        let mut features: Vec<Feature> =
            (1..=30).map(|i| feature((i * i) as f64, 0.5)).collect();
        let result = classify(&mut features, &NodularityOptions::default()).unwrap();
        let total: u64 = result.size_range_counts.iter().sum();
        assert_eq!(total, features.len() as u64);
        assert!(features.iter().all(|f| f.size_class.is_some()));
    }

    #[test]
    fn score_is_nodular_size_over_total() {
        let mut features = vec![feature(300.0, 0.9), feature(100.0, 0.3)];
        let result = classify(&mut features, &NodularityOptions::default()).unwrap();
        assert_eq!(result.nodular_count, 1);
        assert_eq!(result.non_nodular_count, 1);
        assert_eq!(result.score, Some(0.75));
    }

    #[test]
    fn zero_total_size_reports_null_score() {
        let mut features: Vec<Feature> = Vec::new();
        let result = classify(&mut features, &NodularityOptions::default()).unwrap();
        assert_eq!(result.score, None);
    }

    #[test]
    fn deselecting_excludes_from_rescore() {
        let mut features = vec![feature(300.0, 0.9), feature(100.0, 0.3)];
        let mut result = classify(&mut features, &NodularityOptions::default()).unwrap();
        features[0].selected = false;
        rescore(&mut result, &features);
        assert_eq!(result.score, Some(0.0));
        features[1].selected = false;
        rescore(&mut result, &features);
        assert_eq!(result.score, None);
    }

    #[test]
    fn gapped_ranges_rejected() {
        let mut options = NodularityOptions::default();
        options.size_ranges[3].min += 1.0;
        assert!(options.validate().is_err());
    }

    #[test]
    fn wrong_range_count_rejected() {
        let mut options = NodularityOptions::default();
        options.size_ranges.pop();
        assert!(options.validate().is_err());
    }

    #[test]
    fn phase_fraction_of_half_covered_frame() {
        let features = vec![feature(200.0, 0.5)];
        let result = phase_fraction(&features, 400.0);
        assert_eq!(result.area_fraction, 0.5);
    }
}
