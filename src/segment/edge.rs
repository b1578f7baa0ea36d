//! Canny-style boundary detection: Sobel gradients, non-maximum
//! suppression with direction alignment, hysteresis linking, and a
//! morphological closing pass to seal the traced contours.
//!
//! Border handling clamps in the gradient computation and ignores the
//! outermost 1-pixel frame in NMS to avoid out-of-bounds neighbor lookups.

use super::params::{EdgeDetectParams, MorphOp, MorphOpKind};
use super::morphology;
use crate::image::{GrayImageU8, ImageF32, ImageView, ImageViewMut};
use crate::mask::BinaryMask;
use log::debug;

type Kernel3 = [[f32; 3]; 3];

const SOBEL_KERNEL_X: Kernel3 = [[-1.0, 0.0, 1.0], [-2.0, 0.0, 2.0], [-1.0, 0.0, 1.0]];
const SOBEL_KERNEL_Y: Kernel3 = [[-1.0, -2.0, -1.0], [0.0, 0.0, 0.0], [1.0, 2.0, 1.0]];

/// A Sobel step response spans 4× the intensity difference, so hysteresis
/// thresholds given in intensity units are compared against `mag / 4`.
const SOBEL_STEP_GAIN: f32 = 4.0;

const TAN_22_5_DEG: f32 = 0.41421356237;

/// Per-pixel gradient buffers.
#[derive(Clone, Debug)]
pub struct Grad {
    /// Horizontal derivative (convolution with kernel X)
    pub gx: ImageF32,
    /// Vertical derivative (convolution with kernel Y)
    pub gy: ImageF32,
    /// Euclidean magnitude per pixel: `sqrt(gx^2 + gy^2)`
    pub mag: ImageF32,
}

/// Compute Sobel gradients on a single-channel float image with border
/// clamping.
pub fn sobel_gradients(l: &ImageF32) -> Grad {
    let w = l.w;
    let h = l.h;
    let mut gx = ImageF32::new(w, h);
    let mut gy = ImageF32::new(w, h);
    let mut mag = ImageF32::new(w, h);

    if w == 0 || h == 0 {
        return Grad { gx, gy, mag };
    }

    for y in 0..h {
        let y_idx = [y.saturating_sub(1), y, (y + 1).min(h - 1)];
        let rows = [l.row(y_idx[0]), l.row(y_idx[1]), l.row(y_idx[2])];
        let out_gx = gx.row_mut(y);
        let out_gy = gy.row_mut(y);
        let out_mag = mag.row_mut(y);
        for x in 0..w {
            let x_idx = [x.saturating_sub(1), x, (x + 1).min(w - 1)];

            let mut sum_x = 0.0;
            let mut sum_y = 0.0;
            for (ky, row) in rows.iter().enumerate() {
                let kx_row = &SOBEL_KERNEL_X[ky];
                let ky_row = &SOBEL_KERNEL_Y[ky];
                sum_x += row[x_idx[0]] * kx_row[0]
                    + row[x_idx[1]] * kx_row[1]
                    + row[x_idx[2]] * kx_row[2];
                sum_y += row[x_idx[0]] * ky_row[0]
                    + row[x_idx[1]] * ky_row[1]
                    + row[x_idx[2]] * ky_row[2];
            }

            out_gx[x] = sum_x;
            out_gy[x] = sum_y;
            out_mag[x] = (sum_x * sum_x + sum_y * sum_y).sqrt();
        }
    }

    Grad { gx, gy, mag }
}

/// Detect boundaries and close the resulting contour mask.
pub fn apply(gray: &GrayImageU8, params: &EdgeDetectParams) -> BinaryMask {
    let image = ImageF32::from_gray(gray);
    let grad = sobel_gradients(&image);
    let (w, h) = (image.w, image.h);

    let low = params.low_threshold * SOBEL_STEP_GAIN;
    let high = params.high_threshold * SOBEL_STEP_GAIN;

    // 0 = suppressed, 1 = weak candidate, 2 = strong seed.
    let mut grades = vec![0u8; w * h];
    let mut strong = Vec::new();
    if w >= 3 && h >= 3 {
        for y in 1..h - 1 {
            let mag_prev = grad.mag.row(y - 1);
            let mag_row = grad.mag.row(y);
            let mag_next = grad.mag.row(y + 1);
            let gx_row = grad.gx.row(y);
            let gy_row = grad.gy.row(y);

            for x in 1..w - 1 {
                let mag = mag_row[x];
                if mag < low {
                    continue;
                }

                let gx = gx_row[x];
                let gy = gy_row[x];
                let abs_gx = gx.abs();
                let abs_gy = gy.abs();
                let same_sign = (gx >= 0.0 && gy >= 0.0) || (gx <= 0.0 && gy <= 0.0);

                let (neighbor1, neighbor2) = if abs_gx >= abs_gy {
                    if abs_gy <= abs_gx * TAN_22_5_DEG {
                        (mag_row[x - 1], mag_row[x + 1])
                    } else if same_sign {
                        (mag_prev[x + 1], mag_next[x - 1])
                    } else {
                        (mag_prev[x - 1], mag_next[x + 1])
                    }
                } else if abs_gx <= abs_gy * TAN_22_5_DEG {
                    (mag_prev[x], mag_next[x])
                } else if same_sign {
                    (mag_prev[x + 1], mag_next[x - 1])
                } else {
                    (mag_prev[x - 1], mag_next[x + 1])
                };

                // Asymmetric tie-break so a two-pixel magnitude plateau
                // keeps exactly one response instead of none.
                if mag < neighbor1 || mag <= neighbor2 {
                    continue;
                }

                let idx = y * w + x;
                if mag >= high {
                    grades[idx] = 2;
                    strong.push(idx);
                } else {
                    grades[idx] = 1;
                }
            }
        }
    }

    // Hysteresis: grow strong seeds into 8-connected weak candidates.
    let mut mask = BinaryMask::new(w, h);
    let mut stack = strong;
    for &idx in &stack {
        mask.set(idx % w, idx / w);
    }
    while let Some(idx) = stack.pop() {
        let x = idx % w;
        let y = idx / w;
        for dy in -1isize..=1 {
            for dx in -1isize..=1 {
                if dx == 0 && dy == 0 {
                    continue;
                }
                let xn = x as isize + dx;
                let yn = y as isize + dy;
                if xn < 0 || yn < 0 || xn >= w as isize || yn >= h as isize {
                    continue;
                }
                let nidx = yn as usize * w + xn as usize;
                if grades[nidx] == 1 && !mask.is_set(xn as usize, yn as usize) {
                    mask.set(xn as usize, yn as usize);
                    stack.push(nidx);
                }
            }
        }
    }

    debug!(
        "edge_detect: {} contour pixels before closing",
        mask.foreground_count()
    );

    if params.closing_radius > 0 {
        mask = morphology::apply_op(
            &mask,
            MorphOp {
                op: MorphOpKind::Close,
                kernel: params.closing_radius * 2 + 1,
            },
        );
    }
    mask
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step_image(width: usize, height: usize, split_x: usize) -> GrayImageU8 {
        let mut data = vec![0u8; width * height];
        for y in 0..height {
            for x in 0..width {
                data[y * width + x] = if x < split_x { 30 } else { 220 };
            }
        }
        GrayImageU8::new(width, height, data)
    }

    #[test]
    fn sobel_responds_on_vertical_step() {
        let img = ImageF32::from_gray(&step_image(32, 32, 16));
        let grad = sobel_gradients(&img);
        assert!(grad.mag.get(16, 16) > grad.mag.get(4, 16));
        assert!(grad.gx.get(16, 16).abs() > grad.gy.get(16, 16).abs());
    }

    #[test]
    fn step_edge_survives_nms_and_hysteresis() {
        let img = step_image(32, 32, 16);
        let mask = apply(
            &img,
            &EdgeDetectParams {
                low_threshold: 20.0,
                high_threshold: 60.0,
                closing_radius: 0,
            },
        );
        let on_edge: usize = (1..31).filter(|&y| mask.is_set(15, y) || mask.is_set(16, y)).count();
        assert!(on_edge >= 25, "edge column mostly detected, got {on_edge}");
        assert!(!mask.is_set(4, 16), "flat region stays empty");
    }

    #[test]
    fn flat_image_produces_empty_mask() {
        let img = GrayImageU8::new(16, 16, vec![128; 256]);
        let mask = apply(&img, &EdgeDetectParams::default());
        assert_eq!(mask.foreground_count(), 0);
    }
}
