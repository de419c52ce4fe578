//! Decoded raster owned by whichever pipeline stage currently holds it.

use super::params::{Dimensions, SourceEncoding};
use image::DynamicImage;

/// An in-memory decoded bitmap plus the encoding family it came from.
///
/// Stages take a `RasterImage` by value and hand a new one to the next stage;
/// nothing aliases pixels across stages.
#[derive(Debug, Clone)]
pub struct RasterImage {
    pixels: DynamicImage,
    encoding: SourceEncoding,
}

impl RasterImage {
    pub fn new(pixels: DynamicImage, encoding: SourceEncoding) -> Self {
        Self { pixels, encoding }
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn dimensions(&self) -> Dimensions {
        Dimensions::new(self.width(), self.height())
    }

    pub fn encoding(&self) -> SourceEncoding {
        self.encoding
    }

    pub fn pixels(&self) -> &DynamicImage {
        &self.pixels
    }

    /// Replace the pixels, keeping the encoding family.
    pub fn with_pixels(self, pixels: DynamicImage) -> Self {
        Self {
            pixels,
            encoding: self.encoding,
        }
    }
}
