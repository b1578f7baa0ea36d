//! Descriptive statistics and histogram over accepted feature
//! measurements.
//!
//! Central tendencies are `None` on empty input — an empty field is a
//! valid result, never a division error.

use serde::{Deserialize, Serialize};

pub const DEFAULT_HISTOGRAM_BINS: usize = 10;

/// Which measurement the aggregation runs over.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Measurement {
    #[default]
    Area,
    EquivalentDiameter,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistogramBin {
    pub lo: f64,
    pub hi: f64,
    pub count: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Statistics {
    pub count: usize,
    pub mean: Option<f64>,
    pub median: Option<f64>,
    pub q1: Option<f64>,
    pub q3: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub histogram: Vec<HistogramBin>,
}

impl Statistics {
    pub fn empty() -> Self {
        Self {
            count: 0,
            mean: None,
            median: None,
            q1: None,
            q3: None,
            min: None,
            max: None,
            histogram: Vec::new(),
        }
    }
}

/// Aggregate a set of measurement values into descriptive statistics and
/// a fixed-bin-count histogram.
pub fn aggregate(values: &[f64], bins: usize) -> Statistics {
    if values.is_empty() {
        return Statistics::empty();
    }

    let mut sorted: Vec<f64> = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let n = sorted.len();
    let mean = sorted.iter().sum::<f64>() / n as f64;
    let min = sorted[0];
    let max = sorted[n - 1];

    Statistics {
        count: n,
        mean: Some(mean),
        median: Some(quantile(&sorted, 0.5)),
        q1: Some(quantile(&sorted, 0.25)),
        q3: Some(quantile(&sorted, 0.75)),
        min: Some(min),
        max: Some(max),
        histogram: histogram(&sorted, min, max, bins.max(1)),
    }
}

/// Linear-interpolation quantile over sorted values.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let n = sorted.len();
    if n == 1 {
        return sorted[0];
    }
    let pos = q * (n - 1) as f64;
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    let frac = pos - lower as f64;
    sorted[lower] + frac * (sorted[upper] - sorted[lower])
}

fn histogram(sorted: &[f64], min: f64, max: f64, bins: usize) -> Vec<HistogramBin> {
    let span = max - min;
    if span <= 0.0 {
        // All values identical: one bin holds everything.
        return vec![HistogramBin {
            lo: min,
            hi: max,
            count: sorted.len() as u64,
        }];
    }

    let width = span / bins as f64;
    let mut out: Vec<HistogramBin> = (0..bins)
        .map(|i| HistogramBin {
            lo: min + i as f64 * width,
            hi: min + (i + 1) as f64 * width,
            count: 0,
        })
        .collect();
    for &v in sorted {
        let idx = (((v - min) / width) as usize).min(bins - 1);
        out[idx].count += 1;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_yields_count_zero() {
        let stats = aggregate(&[], DEFAULT_HISTOGRAM_BINS);
        assert_eq!(stats.count, 0);
        assert_eq!(stats.mean, None);
        assert_eq!(stats.median, None);
        assert!(stats.histogram.is_empty());
    }

    #[test]
    fn quartiles_interpolate_linearly() {
        // 1..=5: q1 = 2, median = 3, q3 = 4.
        let stats = aggregate(&[5.0, 1.0, 4.0, 2.0, 3.0], 4);
        assert_eq!(stats.q1, Some(2.0));
        assert_eq!(stats.median, Some(3.0));
        assert_eq!(stats.q3, Some(4.0));
        assert_eq!(stats.mean, Some(3.0));

        // Even count interpolates between the middle pair.
        let stats = aggregate(&[1.0, 2.0, 3.0, 4.0], 4);
        assert_eq!(stats.median, Some(2.5));
        assert_eq!(stats.q1, Some(1.75));
        assert_eq!(stats.q3, Some(3.25));
    }

    #[test]
    fn histogram_covers_full_span() {
        let values: Vec<f64> = (0..100).map(|i| i as f64).collect();
        let stats = aggregate(&values, 10);
        assert_eq!(stats.histogram.len(), 10);
        let total: u64 = stats.histogram.iter().map(|b| b.count).sum();
        assert_eq!(total, 100);
        // Maximum value lands in the last bin, not out of range.
        assert!(stats.histogram[9].count >= 10);
    }

    #[test]
    fn identical_values_fold_into_one_bin() {
        let stats = aggregate(&[7.0; 12], 10);
        assert_eq!(stats.histogram.len(), 1);
        assert_eq!(stats.histogram[0].count, 12);
        assert_eq!(stats.median, Some(7.0));
    }
}
