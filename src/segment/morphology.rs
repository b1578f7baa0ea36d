//! Binary morphology with square structuring elements.

use super::params::{MorphOp, MorphOpKind, MorphologicalParams, ThresholdParams};
use super::threshold;
use crate::image::GrayImageU8;
use crate::mask::BinaryMask;

/// Threshold followed by the configured denoising sequence.
pub fn apply(gray: &GrayImageU8, params: &MorphologicalParams) -> BinaryMask {
    let mut mask = threshold::apply(
        gray,
        &ThresholdParams {
            value: params.value,
            invert: params.invert,
        },
    );
    for op in &params.operations {
        mask = apply_op(&mask, *op);
    }
    mask
}

pub fn apply_op(mask: &BinaryMask, op: MorphOp) -> BinaryMask {
    let radius = (op.kernel / 2) as usize;
    match op.op {
        MorphOpKind::Erode => erode(mask, radius),
        MorphOpKind::Dilate => dilate(mask, radius),
        MorphOpKind::Open => dilate(&erode(mask, radius), radius),
        MorphOpKind::Close => erode(&dilate(mask, radius), radius),
    }
}

/// Keep a pixel only if every pixel under the structuring element is set.
pub fn erode(mask: &BinaryMask, radius: usize) -> BinaryMask {
    sweep(mask, radius, true)
}

/// Set a pixel if any pixel under the structuring element is set.
pub fn dilate(mask: &BinaryMask, radius: usize) -> BinaryMask {
    sweep(mask, radius, false)
}

fn sweep(mask: &BinaryMask, radius: usize, require_all: bool) -> BinaryMask {
    if radius == 0 {
        return mask.clone();
    }
    let (w, h) = (mask.w, mask.h);
    let mut out = BinaryMask::new(w, h);
    let r = radius as isize;
    for y in 0..h {
        for x in 0..w {
            let mut hit = require_all;
            'window: for dy in -r..=r {
                for dx in -r..=r {
                    let xn = x as isize + dx;
                    let yn = y as isize + dy;
                    // Pixels outside the frame count as background.
                    let set = xn >= 0
                        && yn >= 0
                        && xn < w as isize
                        && yn < h as isize
                        && mask.is_set(xn as usize, yn as usize);
                    if require_all && !set {
                        hit = false;
                        break 'window;
                    }
                    if !require_all && set {
                        hit = true;
                        break 'window;
                    }
                }
            }
            if hit {
                out.set(x, y);
            }
        }
    }
    out
}
