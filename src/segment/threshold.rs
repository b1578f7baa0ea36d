//! Global intensity thresholding with optional Otsu auto-selection.

use super::params::ThresholdParams;
use crate::image::GrayImageU8;
use crate::mask::BinaryMask;
use log::debug;

/// Apply a fixed or Otsu-selected global cut.
///
/// Foreground is `intensity <= cut` unless `invert` is set.
pub fn apply(gray: &GrayImageU8, params: &ThresholdParams) -> BinaryMask {
    let cut = match params.value {
        Some(v) => v as u8,
        None => {
            let t = otsu_threshold(&gray.histogram());
            debug!("threshold: otsu selected cut {t}");
            t
        }
    };

    let mut mask = BinaryMask::new(gray.width(), gray.height());
    for (i, &px) in gray.data().iter().enumerate() {
        let fg = (px <= cut) != params.invert;
        if fg {
            let x = i % gray.width();
            let y = i / gray.width();
            mask.set(x, y);
        }
    }
    mask
}

/// Otsu's threshold: the cut maximizing inter-class variance of the
/// intensity histogram.
pub fn otsu_threshold(hist: &[u64; 256]) -> u8 {
    let total: u64 = hist.iter().sum();
    if total == 0 {
        return 0;
    }

    let sum_all: f64 = hist
        .iter()
        .enumerate()
        .map(|(v, &n)| v as f64 * n as f64)
        .sum();

    let mut weight_bg = 0.0f64;
    let mut sum_bg = 0.0f64;
    let mut best_t = 0u8;
    let mut best_variance = -1.0f64;

    for t in 0..256usize {
        weight_bg += hist[t] as f64;
        if weight_bg == 0.0 {
            continue;
        }
        let weight_fg = total as f64 - weight_bg;
        if weight_fg == 0.0 {
            break;
        }
        sum_bg += t as f64 * hist[t] as f64;

        let mean_bg = sum_bg / weight_bg;
        let mean_fg = (sum_all - sum_bg) / weight_fg;
        let between = weight_bg * weight_fg * (mean_bg - mean_fg).powi(2);
        if between > best_variance {
            best_variance = between;
            best_t = t as u8;
        }
    }
    best_t
}
