//! In-memory raster produced by the store adapter.

use super::ImageRef;
use image::RgbaImage;

/// A decoded image owned by a single pipeline invocation.
#[derive(Debug, Clone)]
pub struct DecodedImage {
    reference: ImageRef,
    pixels: RgbaImage,
}

impl DecodedImage {
    /// Wraps decoded pixels with the reference they were read from.
    pub fn new(reference: ImageRef, pixels: RgbaImage) -> Self {
        Self { reference, pixels }
    }

    /// The reference this image was decoded from.
    #[inline]
    pub fn reference(&self) -> &ImageRef {
        &self.reference
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    /// Returns `(width, height)`.
    #[inline]
    pub fn dimensions(&self) -> (u32, u32) {
        self.pixels.dimensions()
    }

    #[inline]
    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    /// Consumes the image, returning its pixel buffer.
    pub fn into_pixels(self) -> RgbaImage {
        self.pixels
    }
}
