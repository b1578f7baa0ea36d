//! Optional image conditioning ahead of segmentation: brightness and
//! contrast, gamma correction, Gaussian smoothing, histogram
//! equalization, inversion.
//!
//! All operations work on the grayscale plane and clamp back to 8 bits;
//! parameter ranges are validated before any pixel is touched.

use crate::error::{AnalysisError, Result};
use crate::image::{GrayImageU8, ImageF32, ImageView, ImageViewMut};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PreprocessParams {
    /// Added to every pixel, in [-100, 100].
    pub brightness: f32,
    /// Multiplied into every pixel, in [0, 3].
    pub contrast: f32,
    /// Gamma correction exponent in [0.1, 3]; `None` skips the step.
    pub gamma: Option<f32>,
    /// Odd Gaussian kernel size; `None` skips smoothing.
    pub blur_kernel: Option<i32>,
    pub equalize: bool,
    pub invert: bool,
}

impl Default for PreprocessParams {
    fn default() -> Self {
        Self {
            brightness: 0.0,
            contrast: 1.0,
            gamma: None,
            blur_kernel: None,
            equalize: false,
            invert: false,
        }
    }
}

impl PreprocessParams {
    pub fn validate(&self) -> Result<()> {
        if !self.brightness.is_finite() || self.brightness.abs() > 100.0 {
            return Err(AnalysisError::invalid(format!(
                "brightness must be in [-100, 100], got {}",
                self.brightness
            )));
        }
        if !self.contrast.is_finite() || !(0.0..=3.0).contains(&self.contrast) {
            return Err(AnalysisError::invalid(format!(
                "contrast must be in [0, 3], got {}",
                self.contrast
            )));
        }
        if let Some(gamma) = self.gamma {
            if !gamma.is_finite() || !(0.1..=3.0).contains(&gamma) {
                return Err(AnalysisError::invalid(format!(
                    "gamma must be in [0.1, 3], got {gamma}"
                )));
            }
        }
        if let Some(kernel) = self.blur_kernel {
            if kernel < 3 || kernel % 2 == 0 || kernel > 31 {
                return Err(AnalysisError::invalid(format!(
                    "blur kernel must be an odd size in [3, 31], got {kernel}"
                )));
            }
        }
        Ok(())
    }

    fn is_noop(&self) -> bool {
        self.brightness == 0.0
            && self.contrast == 1.0
            && self.gamma.is_none()
            && self.blur_kernel.is_none()
            && !self.equalize
            && !self.invert
    }
}

/// Apply the configured conditioning steps in a fixed order.
pub fn apply(gray: &GrayImageU8, params: &PreprocessParams) -> GrayImageU8 {
    if params.is_noop() {
        return gray.clone();
    }

    let mut image = ImageF32::from_gray(gray);

    if params.contrast != 1.0 || params.brightness != 0.0 {
        for v in &mut image.data {
            *v = (*v * params.contrast + params.brightness).clamp(0.0, 255.0);
        }
    }

    if let Some(gamma) = params.gamma {
        let inv = 1.0 / gamma;
        for v in &mut image.data {
            *v = (*v / 255.0).powf(inv) * 255.0;
        }
    }

    if let Some(kernel) = params.blur_kernel {
        image = gaussian_blur(&image, kernel as usize);
    }

    let mut out = image.to_gray();
    if params.equalize {
        out = equalize(&out);
    }
    if params.invert {
        let data = out.data().iter().map(|&v| 255 - v).collect();
        out = GrayImageU8::new(out.width(), out.height(), data);
    }
    out
}

/// Normalized binomial taps of the given odd length, e.g. `[1 4 6 4 1]/16`
/// for size 5.
fn binomial_taps(size: usize) -> Vec<f32> {
    let mut row = vec![1.0f64];
    for _ in 1..size {
        let mut next = vec![1.0f64; row.len() + 1];
        for i in 1..row.len() {
            next[i] = row[i - 1] + row[i];
        }
        row = next;
    }
    let total: f64 = row.iter().sum();
    row.iter().map(|&v| (v / total) as f32).collect()
}

/// Separable Gaussian smoothing with border clamping.
fn gaussian_blur(image: &ImageF32, kernel: usize) -> ImageF32 {
    let taps = binomial_taps(kernel);
    let r = kernel / 2;
    let (w, h) = (image.w, image.h);

    let mut horiz = ImageF32::new(w, h);
    for y in 0..h {
        let row = image.row(y);
        let out = horiz.row_mut(y);
        for x in 0..w {
            let mut acc = 0.0;
            for (k, &tap) in taps.iter().enumerate() {
                let xs = (x + k).saturating_sub(r).min(w - 1);
                acc += row[xs] * tap;
            }
            out[x] = acc;
        }
    }

    let mut blurred = ImageF32::new(w, h);
    for y in 0..h {
        for x in 0..w {
            let mut acc = 0.0;
            for (k, &tap) in taps.iter().enumerate() {
                let ys = (y + k).saturating_sub(r).min(h - 1);
                acc += horiz.get(x, ys) * tap;
            }
            blurred.set(x, y, acc);
        }
    }
    blurred
}

/// Histogram equalization over the full 8-bit range.
fn equalize(gray: &GrayImageU8) -> GrayImageU8 {
    let hist = gray.histogram();
    let total: u64 = hist.iter().sum();
    if total == 0 {
        return gray.clone();
    }

    let mut cdf = [0u64; 256];
    let mut running = 0u64;
    for (i, &count) in hist.iter().enumerate() {
        running += count;
        cdf[i] = running;
    }
    let cdf_min = cdf.iter().copied().find(|&v| v > 0).unwrap_or(0);
    let denom = (total - cdf_min).max(1) as f64;

    let map: Vec<u8> = cdf
        .iter()
        .map(|&c| (((c.saturating_sub(cdf_min)) as f64 / denom) * 255.0).round() as u8)
        .collect();
    let data = gray.data().iter().map(|&v| map[v as usize]).collect();
    GrayImageU8::new(gray.width(), gray.height(), data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_of_range_parameters_rejected() {
        let mut params = PreprocessParams::default();
        params.brightness = 150.0;
        assert!(params.validate().is_err());

        let mut params = PreprocessParams::default();
        params.gamma = Some(5.0);
        assert!(params.validate().is_err());

        let mut params = PreprocessParams::default();
        params.blur_kernel = Some(4);
        assert!(params.validate().is_err());
    }

    #[test]
    fn invert_flips_intensities() {
        let gray = GrayImageU8::new(2, 1, vec![0, 200]);
        let params = PreprocessParams {
            invert: true,
            ..Default::default()
        };
        let out = apply(&gray, &params);
        assert_eq!(out.data(), &[255, 55]);
    }

    #[test]
    fn brightness_shifts_and_clamps() {
        let gray = GrayImageU8::new(3, 1, vec![0, 100, 250]);
        let params = PreprocessParams {
            brightness: 50.0,
            ..Default::default()
        };
        let out = apply(&gray, &params);
        assert_eq!(out.data(), &[50, 150, 255]);
    }

    #[test]
    fn blur_preserves_flat_regions() {
        let gray = GrayImageU8::new(8, 8, vec![100; 64]);
        let params = PreprocessParams {
            blur_kernel: Some(5),
            ..Default::default()
        };
        let out = apply(&gray, &params);
        assert!(out.data().iter().all(|&v| v == 100));
    }

    #[test]
    fn equalization_spreads_contrast() {
        let mut data = vec![100u8; 32];
        data.extend(vec![110u8; 32]);
        let gray = GrayImageU8::new(8, 8, data);
        let params = PreprocessParams {
            equalize: true,
            ..Default::default()
        };
        let out = apply(&gray, &params);
        let min = *out.data().iter().min().unwrap();
        let max = *out.data().iter().max().unwrap();
        assert!(max as i32 - min as i32 > 100, "span {min}..{max}");
    }
}
