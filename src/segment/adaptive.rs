//! Local-mean adaptive thresholding via an integral image.
//!
//! Compares each pixel against the mean of its surrounding window minus a
//! configurable offset; tolerant of the uneven illumination common in
//! low-magnification fields.

use super::params::AdaptiveParams;
use crate::image::GrayImageU8;
use crate::mask::BinaryMask;

pub fn apply(gray: &GrayImageU8, params: &AdaptiveParams) -> BinaryMask {
    let (w, h) = (gray.width(), gray.height());
    let mut mask = BinaryMask::new(w, h);
    if w == 0 || h == 0 {
        return mask;
    }

    // integral[y][x] = sum of pixels in [0, x) × [0, y)
    let iw = w + 1;
    let mut integral = vec![0u64; iw * (h + 1)];
    for y in 0..h {
        let mut row_sum = 0u64;
        for x in 0..w {
            row_sum += gray.get(x, y) as u64;
            integral[(y + 1) * iw + (x + 1)] = integral[y * iw + (x + 1)] + row_sum;
        }
    }

    let r = (params.window / 2) as isize;
    for y in 0..h {
        let y0 = (y as isize - r).max(0) as usize;
        let y1 = ((y as isize + r + 1).min(h as isize)) as usize;
        for x in 0..w {
            let x0 = (x as isize - r).max(0) as usize;
            let x1 = ((x as isize + r + 1).min(w as isize)) as usize;
            let area = ((x1 - x0) * (y1 - y0)) as f32;
            let sum = integral[y1 * iw + x1] + integral[y0 * iw + x0]
                - integral[y0 * iw + x1]
                - integral[y1 * iw + x0];
            let mean = sum as f32 / area;
            let fg = ((gray.get(x, y) as f32) <= mean - params.offset) != params.invert;
            if fg {
                mask.set(x, y);
            }
        }
    }
    mask
}
