//! Shared test utilities for the fitcrop test suite.
//!
//! Synthetic images are generated in memory so no fixture files are needed.
//! Gradients compress well (useful for fast-path tests); seeded noise barely
//! compresses (useful for forcing the optimizer down its ladders).
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let jpeg = synthetic_jpeg(400, 300);
//! let raster = lossy_raster(noise_image(800, 600, 1));
//! ```

use crate::imaging::{RasterImage, SourceEncoding};
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use std::io::Cursor;

// =========================================================================
// Pixel generators
// =========================================================================

/// Smooth RGB gradient.
pub fn gradient_image(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    }))
}

/// Deterministic pseudo-random RGB noise (xorshift), keyed by `seed`.
pub fn noise_image(width: u32, height: u32, seed: u64) -> DynamicImage {
    let mut state = seed.wrapping_mul(0x9E37_79B9_7F4A_7C15) | 1;
    let mut next = move || {
        state ^= state << 13;
        state ^= state >> 7;
        state ^= state << 17;
        (state >> 24) as u8
    };
    DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |_, _| {
        Rgb([next(), next(), next()])
    }))
}

// =========================================================================
// Encoded buffers
// =========================================================================

/// Gradient encoded as JPEG at quality 90.
pub fn synthetic_jpeg(width: u32, height: u32) -> Vec<u8> {
    encode_jpeg(&gradient_image(width, height), 90)
}

/// Gradient encoded as PNG.
pub fn synthetic_png(width: u32, height: u32) -> Vec<u8> {
    let mut buf = Vec::new();
    gradient_image(width, height)
        .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .unwrap();
    buf
}

pub fn encode_jpeg(image: &DynamicImage, quality: u8) -> Vec<u8> {
    let mut buf = Vec::new();
    DynamicImage::ImageRgb8(image.to_rgb8())
        .write_with_encoder(JpegEncoder::new_with_quality(&mut buf, quality))
        .unwrap();
    buf
}

// =========================================================================
// Rasters
// =========================================================================

pub fn lossy_raster(pixels: DynamicImage) -> RasterImage {
    RasterImage::new(pixels, SourceEncoding::Lossy)
}

pub fn lossless_raster(pixels: DynamicImage) -> RasterImage {
    RasterImage::new(pixels, SourceEncoding::Lossless)
}
