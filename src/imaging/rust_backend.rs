//! Pure Rust codec backend.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Sniff format | `image::guess_format` (magic bytes) |
//! | Identify | `image::ImageReader::into_dimensions` (header only) |
//! | Decode (JPEG, PNG) | `image::ImageReader::decode` |
//! | Encode → JPEG | `image::codecs::jpeg::JpegEncoder` at the requested quality |
//! | Encode → PNG | `image::codecs::png::PngEncoder` (best compression, adaptive filter) |

use super::backend::{BackendError, Identified, ImageBackend};
use super::params::{Dimensions, OutputFormat, Quality, SourceEncoding};
use super::raster::RasterImage;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{DynamicImage, ImageFormat, ImageReader};
use std::io::Cursor;

/// Map an encoded buffer's magic bytes to its encoding family.
///
/// Only JPEG and PNG are accepted; everything else is `None`.
pub fn sniff_encoding(bytes: &[u8]) -> Option<SourceEncoding> {
    match image::guess_format(bytes).ok()? {
        ImageFormat::Png => Some(SourceEncoding::Lossless),
        ImageFormat::Jpeg => Some(SourceEncoding::Lossy),
        _ => None,
    }
}

fn image_format(encoding: SourceEncoding) -> ImageFormat {
    match encoding {
        SourceEncoding::Lossless => ImageFormat::Png,
        SourceEncoding::Lossy => ImageFormat::Jpeg,
    }
}

/// Pure Rust backend using the `image` crate.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn reader(bytes: &[u8]) -> Result<(ImageReader<Cursor<&[u8]>>, SourceEncoding), BackendError> {
    let encoding = sniff_encoding(bytes).ok_or(BackendError::UnsupportedFormat)?;
    let reader = ImageReader::with_format(Cursor::new(bytes), image_format(encoding));
    Ok((reader, encoding))
}

fn encode_jpeg(pixels: &DynamicImage, quality: Quality) -> Result<Vec<u8>, BackendError> {
    // JPEG has no alpha: transparent canvas pixels flatten to black.
    let rgb = DynamicImage::ImageRgb8(pixels.to_rgb8());
    let mut buf = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut buf, quality.percent());
    rgb.write_with_encoder(encoder)
        .map_err(|e| BackendError::EncodeFailed(format!("JPEG encode failed: {e}")))?;
    Ok(buf)
}

fn encode_png(pixels: &DynamicImage) -> Result<Vec<u8>, BackendError> {
    let mut buf = Vec::new();
    let encoder = PngEncoder::new_with_quality(&mut buf, CompressionType::Best, FilterType::Adaptive);
    pixels
        .write_with_encoder(encoder)
        .map_err(|e| BackendError::EncodeFailed(format!("PNG encode failed: {e}")))?;
    Ok(buf)
}

impl ImageBackend for RustBackend {
    fn identify(&self, bytes: &[u8]) -> Result<Identified, BackendError> {
        let (reader, encoding) = reader(bytes)?;
        let (width, height) = reader
            .into_dimensions()
            .map_err(|e| BackendError::Decode(format!("failed to read dimensions: {e}")))?;
        Ok(Identified {
            dimensions: Dimensions::new(width, height),
            encoding,
        })
    }

    fn decode(&self, bytes: &[u8]) -> Result<RasterImage, BackendError> {
        let (reader, encoding) = reader(bytes)?;
        let pixels = reader
            .decode()
            .map_err(|e| BackendError::Decode(e.to_string()))?;
        Ok(RasterImage::new(pixels, encoding))
    }

    fn encode(
        &self,
        pixels: &DynamicImage,
        format: OutputFormat,
        quality: Quality,
    ) -> Result<Vec<u8>, BackendError> {
        match format {
            OutputFormat::Jpeg => encode_jpeg(pixels, quality),
            OutputFormat::Png => encode_png(pixels),
        }
    }
}
