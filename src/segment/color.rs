//! HSV range selection for coloured phases and inclusions.

use super::params::ColorParams;
use crate::image::RgbImageU8;
use crate::mask::BinaryMask;

pub fn apply(rgb: &RgbImageU8, params: &ColorParams) -> BinaryMask {
    let (w, h) = (rgb.width(), rgb.height());
    let mut mask = BinaryMask::new(w, h);
    for y in 0..h {
        for x in 0..w {
            let (hue, sat, val) = rgb_to_hsv(rgb.get(x, y));
            if hue_in_range(hue, params.hue_min, params.hue_max)
                && (params.sat_min..=params.sat_max).contains(&sat)
                && (params.val_min..=params.val_max).contains(&val)
            {
                mask.set(x, y);
            }
        }
    }
    mask
}

/// Convert an RGB triple to (hue in degrees [0, 360), saturation [0, 1],
/// value [0, 1]).
pub fn rgb_to_hsv(px: [u8; 3]) -> (f32, f32, f32) {
    let r = px[0] as f32 / 255.0;
    let g = px[1] as f32 / 255.0;
    let b = px[2] as f32 / 255.0;

    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;

    let hue = if delta == 0.0 {
        0.0
    } else if max == r {
        60.0 * (((g - b) / delta).rem_euclid(6.0))
    } else if max == g {
        60.0 * ((b - r) / delta + 2.0)
    } else {
        60.0 * ((r - g) / delta + 4.0)
    };
    let sat = if max == 0.0 { 0.0 } else { delta / max };
    (hue, sat, max)
}

/// `min > max` selects the range wrapping through 360° (e.g. reds).
fn hue_in_range(hue: f32, min: f32, max: f32) -> bool {
    if min <= max {
        (min..=max).contains(&hue)
    } else {
        hue >= min || hue <= max
    }
}
