//! Connected-component extraction: grow 8-connected foreground regions
//! seeded in row-major scan order, trace each region's outer boundary, and
//! measure area, perimeter, bounding box, principal axes and circularity.
//!
//! Seeding in scan order makes the output ordering deterministic, so
//! downstream indices are stable within one run. Degenerate contours
//! (zero area or vanishing perimeter) are dropped before the filter stage.

use super::types::{BoundingBox, RawFeature};
use crate::mask::BinaryMask;
use nalgebra::{Matrix2, SymmetricEigen};

const NEIGH_OFFSETS: [(isize, isize); 8] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (-1, 0),
    (1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

/// Clockwise Moore neighborhood, starting east.
const TRACE_DIRS: [(isize, isize); 8] = [
    (1, 0),
    (1, 1),
    (0, 1),
    (-1, 1),
    (-1, 0),
    (-1, -1),
    (0, -1),
    (1, -1),
];

struct RegionAccumulator {
    pixels: Vec<(usize, usize)>,
    sum_x: f64,
    sum_y: f64,
    sum_xx: f64,
    sum_yy: f64,
    sum_xy: f64,
    min_x: usize,
    max_x: usize,
    min_y: usize,
    max_y: usize,
}

impl RegionAccumulator {
    fn new() -> Self {
        Self {
            pixels: Vec::with_capacity(128),
            sum_x: 0.0,
            sum_y: 0.0,
            sum_xx: 0.0,
            sum_yy: 0.0,
            sum_xy: 0.0,
            min_x: usize::MAX,
            max_x: 0,
            min_y: usize::MAX,
            max_y: 0,
        }
    }

    fn reset(&mut self) {
        self.pixels.clear();
        self.sum_x = 0.0;
        self.sum_y = 0.0;
        self.sum_xx = 0.0;
        self.sum_yy = 0.0;
        self.sum_xy = 0.0;
        self.min_x = usize::MAX;
        self.max_x = 0;
        self.min_y = usize::MAX;
        self.max_y = 0;
    }

    fn push(&mut self, x: usize, y: usize) {
        self.pixels.push((x, y));
        let xf = x as f64;
        let yf = y as f64;
        self.sum_x += xf;
        self.sum_y += yf;
        self.sum_xx += xf * xf;
        self.sum_yy += yf * yf;
        self.sum_xy += xf * yf;
        self.min_x = self.min_x.min(x);
        self.max_x = self.max_x.max(x);
        self.min_y = self.min_y.min(y);
        self.max_y = self.max_y.max(y);
    }

    fn len(&self) -> usize {
        self.pixels.len()
    }
}

/// Extract every connected foreground region as a candidate feature.
pub fn extract(mask: &BinaryMask) -> Vec<RawFeature> {
    let (w, h) = (mask.w, mask.h);
    let mut visited = vec![0u8; w * h];
    let mut stack: Vec<usize> = Vec::with_capacity(64);
    let mut region = RegionAccumulator::new();
    let mut features = Vec::new();

    for seed in 0..w * h {
        if visited[seed] != 0 {
            continue;
        }
        let sx = seed % w;
        let sy = seed / w;
        if !mask.is_set(sx, sy) {
            continue;
        }

        region.reset();
        stack.clear();
        visited[seed] = 1;
        stack.push(seed);

        while let Some(idx) = stack.pop() {
            let x = idx % w;
            let y = idx / w;
            region.push(x, y);

            for (dx, dy) in NEIGH_OFFSETS {
                let xn = x as isize + dx;
                let yn = y as isize + dy;
                if xn < 0 || yn < 0 || xn >= w as isize || yn >= h as isize {
                    continue;
                }
                let nidx = yn as usize * w + xn as usize;
                if visited[nidx] == 0 && mask.is_set(xn as usize, yn as usize) {
                    visited[nidx] = 1;
                    stack.push(nidx);
                }
            }
        }

        if let Some(feature) = build_feature(mask, &region, (sx, sy)) {
            features.push(feature);
        }
    }

    features
}

fn build_feature(
    mask: &BinaryMask,
    region: &RegionAccumulator,
    seed: (usize, usize),
) -> Option<RawFeature> {
    let count = region.len();
    if count == 0 {
        return None;
    }

    let boundary = trace_boundary(mask, seed);
    let perimeter = chain_perimeter(&boundary);
    if perimeter < 1.0 {
        // Single pixels and broken traces carry no usable measurement.
        return None;
    }

    let area = count as f64;
    let circularity =
        (4.0 * std::f64::consts::PI * area / (perimeter * perimeter)).clamp(0.0, 1.0);

    let cx = region.sum_x / area;
    let cy = region.sum_y / area;
    let (length, width) = principal_extents(region, cx, cy);

    let boundary = boundary
        .iter()
        .map(|&(x, y)| [x as f32, y as f32])
        .collect();

    Some(RawFeature {
        boundary,
        area_px: area,
        perimeter_px: perimeter,
        circularity,
        length_px: length,
        width_px: width,
        bbox: BoundingBox {
            x: region.min_x as u32,
            y: region.min_y as u32,
            w: (region.max_x - region.min_x + 1) as u32,
            h: (region.max_y - region.min_y + 1) as u32,
        },
        centroid: [cx as f32, cy as f32],
    })
}

/// Extents along the principal axis and its normal, from the second
/// moments of the region. Spans are measured between pixel centres and
/// widened by one pixel to cover pixel extent.
fn principal_extents(region: &RegionAccumulator, cx: f64, cy: f64) -> (f64, f64) {
    let count = region.len() as f64;
    if region.len() == 1 {
        return (1.0, 1.0);
    }

    let cxx = region.sum_xx / count - cx * cx;
    let cyy = region.sum_yy / count - cy * cy;
    let cxy = region.sum_xy / count - cx * cy;
    let cov = Matrix2::new(cxx, cxy, cxy, cyy);
    let eig = SymmetricEigen::new(cov);
    let vmax = if eig.eigenvalues[0] >= eig.eigenvalues[1] {
        eig.eigenvectors.column(0)
    } else {
        eig.eigenvectors.column(1)
    };

    let mut tx = vmax[0];
    let mut ty = vmax[1];
    let norm = (tx * tx + ty * ty).sqrt();
    if !norm.is_finite() || norm < 1e-9 {
        // Isotropic region; fall back to the bounding box.
        let bw = (region.max_x - region.min_x + 1) as f64;
        let bh = (region.max_y - region.min_y + 1) as f64;
        return (bw.max(bh), bw.min(bh));
    }
    tx /= norm;
    ty /= norm;
    let nx = -ty;
    let ny = tx;

    let mut smin = f64::INFINITY;
    let mut smax = f64::NEG_INFINITY;
    let mut nmin = f64::INFINITY;
    let mut nmax = f64::NEG_INFINITY;
    for &(x, y) in &region.pixels {
        let dx = x as f64 - cx;
        let dy = y as f64 - cy;
        let s = dx * tx + dy * ty;
        let n = dx * nx + dy * ny;
        smin = smin.min(s);
        smax = smax.max(s);
        nmin = nmin.min(n);
        nmax = nmax.max(n);
    }

    (smax - smin + 1.0, nmax - nmin + 1.0)
}

/// Moore-neighbor boundary trace from the region's scan-order seed (its
/// topmost-leftmost pixel), clockwise, until the start pixel recurs.
fn trace_boundary(mask: &BinaryMask, start: (usize, usize)) -> Vec<(usize, usize)> {
    let is_fg = |x: isize, y: isize| {
        x >= 0 && y >= 0 && x < mask.w as isize && y < mask.h as isize
            && mask.is_set(x as usize, y as usize)
    };

    let start = (start.0 as isize, start.1 as isize);
    let mut boundary = Vec::new();
    let mut cur = start;
    // The seed was reached scanning from the west, so backtrack starts west.
    let mut backtrack = 4usize;
    let max_steps = 4 * mask.w * mask.h + 4;

    loop {
        boundary.push((cur.0 as usize, cur.1 as usize));
        if boundary.len() > max_steps {
            break;
        }

        let mut next = None;
        for i in 1..=8 {
            let d = (backtrack + i) % 8;
            let np = (cur.0 + TRACE_DIRS[d].0, cur.1 + TRACE_DIRS[d].1);
            if is_fg(np.0, np.1) {
                next = Some((d, np));
                break;
            }
        }

        match next {
            None => break, // isolated pixel
            Some((d, np)) => {
                backtrack = (d + 4) % 8;
                cur = np;
                if cur == start {
                    break;
                }
            }
        }
    }
    boundary
}

/// Chain-code perimeter: axial steps weigh 1, diagonal steps sqrt(2); the
/// closing step back to the first point is included.
fn chain_perimeter(boundary: &[(usize, usize)]) -> f64 {
    if boundary.len() < 2 {
        return 0.0;
    }
    let mut perimeter = 0.0;
    for i in 0..boundary.len() {
        let a = boundary[i];
        let b = boundary[(i + 1) % boundary.len()];
        let dx = (a.0 as f64 - b.0 as f64).abs();
        let dy = (a.1 as f64 - b.1 as f64).abs();
        perimeter += if dx + dy > 1.0 {
            std::f64::consts::SQRT_2
        } else {
            dx + dy
        };
    }
    perimeter
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mask_with_block(w: usize, h: usize, x0: usize, y0: usize, bw: usize, bh: usize) -> BinaryMask {
        let mut mask = BinaryMask::new(w, h);
        for y in y0..y0 + bh {
            for x in x0..x0 + bw {
                mask.set(x, y);
            }
        }
        mask
    }

    #[test]
    fn square_block_measurements() {
        let mask = mask_with_block(32, 32, 8, 8, 10, 10);
        let features = extract(&mask);
        assert_eq!(features.len(), 1);
        let f = &features[0];
        assert_eq!(f.area_px, 100.0);
        assert_eq!(f.bbox, BoundingBox { x: 8, y: 8, w: 10, h: 10 });
        assert!((f.perimeter_px - 36.0).abs() < 1e-9);
        assert!((f.centroid[0] - 12.5).abs() < 1e-4);
        assert!(f.circularity > 0.9, "square circularity {}", f.circularity);
    }

    #[test]
    fn elongated_block_axes() {
        let mask = mask_with_block(64, 32, 4, 10, 40, 10);
        let features = extract(&mask);
        assert_eq!(features.len(), 1);
        let f = &features[0];
        assert!((f.length_px - 40.0).abs() < 1.0, "length {}", f.length_px);
        assert!((f.width_px - 10.0).abs() < 1.0, "width {}", f.width_px);
        assert!(f.circularity < 0.7, "elongated circularity {}", f.circularity);
    }

    #[test]
    fn scan_order_is_deterministic() {
        let mut mask = BinaryMask::new(32, 32);
        for (x0, y0) in [(20usize, 2usize), (2, 10), (10, 20)] {
            for dy in 0..3 {
                for dx in 0..3 {
                    mask.set(x0 + dx, y0 + dy);
                }
            }
        }
        let features = extract(&mask);
        assert_eq!(features.len(), 3);
        // Seeded top-to-bottom, left-to-right.
        assert_eq!(features[0].bbox.y, 2);
        assert_eq!(features[1].bbox.y, 10);
        assert_eq!(features[2].bbox.y, 20);
    }

    #[test]
    fn single_pixel_is_degenerate() {
        let mut mask = BinaryMask::new(8, 8);
        mask.set(4, 4);
        assert!(extract(&mask).is_empty());
    }

    #[test]
    fn diagonal_neighbors_form_one_component() {
        let mut mask = BinaryMask::new(8, 8);
        mask.set(2, 2);
        mask.set(3, 3);
        mask.set(4, 4);
        let features = extract(&mask);
        assert_eq!(features.len(), 1);
        assert_eq!(features[0].area_px, 3.0);
    }
}
