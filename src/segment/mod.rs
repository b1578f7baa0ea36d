//! Segmentation: pixel matrix + preparation method + parameters → binary
//! feature mask.
//!
//! Five methods, each a distinct algorithm rather than fallbacks of one
//! another:
//! - `threshold` – fixed or Otsu-selected global intensity cut.
//! - `edge_detect` – Sobel gradients, NMS, hysteresis, contour closing.
//! - `adaptive` – local-mean thresholding via an integral image.
//! - `morphological` – threshold plus erode/dilate/open/close denoising.
//! - `color` – HSV range selection on the RGB plane.
//!
//! Parameters are validated before any pixel is touched; the output mask
//! always has the spatial dimensions of the input.

pub mod adaptive;
pub mod color;
pub mod edge;
pub mod morphology;
pub mod params;
pub mod threshold;

pub use params::{
    AdaptiveParams, ColorParams, EdgeDetectParams, MorphOp, MorphOpKind, MorphologicalParams,
    SegmentationParams, ThresholdParams,
};

use crate::error::{AnalysisError, Result};
use crate::image::SourceImage;
use crate::mask::BinaryMask;

/// Convert an image into a binary feature mask using the given
/// preparation method.
pub fn segment(image: &SourceImage, params: &SegmentationParams) -> Result<BinaryMask> {
    params.validate()?;
    match params {
        SegmentationParams::Threshold(p) => Ok(threshold::apply(image.gray(), p)),
        SegmentationParams::EdgeDetect(p) => Ok(edge::apply(image.gray(), p)),
        SegmentationParams::Adaptive(p) => Ok(adaptive::apply(image.gray(), p)),
        SegmentationParams::Morphological(p) => Ok(morphology::apply(image.gray(), p)),
        SegmentationParams::Color(p) => {
            let rgb = image.rgb().ok_or_else(|| {
                AnalysisError::invalid("color segmentation requires an RGB image")
            })?;
            Ok(color::apply(rgb, p))
        }
    }
}
