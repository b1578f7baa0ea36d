use serde::{Deserialize, Serialize};

/// Axis-aligned bounding box in pixel coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

/// Candidate feature with raw geometric measurements, before filtering.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawFeature {
    /// Ordered boundary contour (pixel centres, closed implicitly).
    pub boundary: Vec<[f32; 2]>,
    /// Pixel count of the connected region.
    pub area_px: f64,
    /// Chain-code perimeter; diagonal steps weigh sqrt(2).
    pub perimeter_px: f64,
    /// Isoperimetric roundness `4π·area/perimeter²`, clamped to [0, 1].
    pub circularity: f64,
    /// Extent along the principal axis.
    pub length_px: f64,
    /// Extent along the normal of the principal axis.
    pub width_px: f64,
    pub bbox: BoundingBox,
    pub centroid: [f32; 2],
}

impl RawFeature {
    /// Diameter of the circle with the same pixel area.
    pub fn equivalent_diameter_px(&self) -> f64 {
        2.0 * (self.area_px / std::f64::consts::PI).sqrt()
    }
}

/// Accepted feature, measured and (when a calibration applies) converted
/// to physical units.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Feature {
    pub boundary: Vec<[f32; 2]>,
    pub area_px: f64,
    pub perimeter_px: f64,
    pub circularity: f64,
    pub length_px: f64,
    pub width_px: f64,
    pub bbox: BoundingBox,
    pub centroid: [f32; 2],
    /// `area_px · pixel_size²`; absent without a calibration record.
    pub area_calibrated: Option<f64>,
    /// `length_px · pixel_size`; absent without a calibration record.
    pub length_calibrated: Option<f64>,
    /// User-togglable post-hoc; excluded features drop out of aggregate
    /// score recomputation.
    pub selected: bool,
    /// Size-range bucket assigned by the classifier.
    pub size_class: Option<usize>,
}

impl Feature {
    /// Area in the units measurements are expressed in: calibrated when
    /// available, pixels otherwise.
    pub fn area(&self) -> f64 {
        self.area_calibrated.unwrap_or(self.area_px)
    }

    /// Principal-axis length, calibrated when available.
    pub fn length(&self) -> f64 {
        self.length_calibrated.unwrap_or(self.length_px)
    }

    /// Diameter of the circle with the same area, in measurement units.
    pub fn equivalent_diameter(&self) -> f64 {
        2.0 * (self.area() / std::f64::consts::PI).sqrt()
    }
}
