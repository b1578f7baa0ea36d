pub mod f32;
pub mod io;
pub mod traits;
pub mod u8;

pub use self::f32::ImageF32;
pub use self::traits::{ImageView, ImageViewMut};
pub use self::u8::{GrayImageU8, ImageU8, RgbImageU8};

/// Decoded pixel matrix handed to the engine by the ImageSource collaborator.
///
/// Carries the grayscale plane every intensity-based method works on and,
/// when the source was a colour micrograph, the interleaved RGB plane the
/// colour segmenter needs. The `image_id` travels into the analysis result
/// so downstream reporting can reference the field it came from.
#[derive(Clone, Debug)]
pub struct SourceImage {
    image_id: String,
    gray: GrayImageU8,
    rgb: Option<RgbImageU8>,
}

impl SourceImage {
    pub fn new(image_id: impl Into<String>, gray: GrayImageU8, rgb: Option<RgbImageU8>) -> Self {
        Self {
            image_id: image_id.into(),
            gray,
            rgb,
        }
    }

    /// Wrap a raw 8-bit grayscale buffer (row-major, tightly packed).
    pub fn from_gray_buffer(
        image_id: impl Into<String>,
        width: usize,
        height: usize,
        data: Vec<u8>,
    ) -> Self {
        Self::new(image_id, GrayImageU8::new(width, height, data), None)
    }

    /// Copy a borrowed grayscale view (e.g. a camera frame with stride)
    /// into an owned source image.
    pub fn from_gray_view(image_id: impl Into<String>, view: ImageU8<'_>) -> Self {
        let mut data = Vec::with_capacity(view.w * view.h);
        for y in 0..view.h {
            data.extend_from_slice(view.row(y));
        }
        Self::new(image_id, GrayImageU8::new(view.w, view.h, data), None)
    }

    /// Wrap a raw interleaved 8-bit RGB buffer; the grayscale plane is
    /// derived with Rec. 601 luma weights.
    pub fn from_rgb_buffer(
        image_id: impl Into<String>,
        width: usize,
        height: usize,
        data: Vec<u8>,
    ) -> Self {
        let rgb = RgbImageU8::new(width, height, data);
        let gray = rgb.to_luma();
        Self::new(image_id, gray, Some(rgb))
    }

    pub fn image_id(&self) -> &str {
        &self.image_id
    }

    pub fn width(&self) -> usize {
        self.gray.width()
    }

    pub fn height(&self) -> usize {
        self.gray.height()
    }

    pub fn gray(&self) -> &GrayImageU8 {
        &self.gray
    }

    pub fn rgb(&self) -> Option<&RgbImageU8> {
        self.rgb.as_ref()
    }

    /// Replace the grayscale plane, e.g. after preprocessing.
    pub fn with_gray(mut self, gray: GrayImageU8) -> Self {
        self.gray = gray;
        self
    }
}
