//! Geometry extraction: crop + rotation.
//!
//! Crop rectangles are expressed in the space the user sees after rotating
//! the photo in an editor: the source is painted centred, rotated by θ about
//! the centre of a canvas just large enough to hold it
//! ([`rotated_canvas_size`]), and the crop is read from that canvas.
//!
//! Only the crop window of the rotated canvas is ever rasterised. The window
//! is a [`Canvas`] the size of the crop, with the pivot and paint origin
//! shifted by the crop offset, which yields the same pixels as painting the
//! full canvas and cutting the block out afterwards.
//!
//! Rotations that are whole turns take the unrotated path: an exact,
//! pixel-aligned copy in the source's own pixel format, so 16-bit and
//! grayscale PNGs come out untouched.

use super::backend::{BackendError, ImageBackend};
use super::calculations::{is_identity_rotation, radians, rotated_canvas_size, round_crop};
use super::params::{CropRect, Dimensions, OutputFormat, PixelRect, Quality};
use super::raster::RasterImage;
use super::surface::{Canvas, Channel, RasterSurface, RgbaBuffer, SurfaceError};
use image::{DynamicImage, Pixel, Rgba};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExtractError {
    #[error("invalid crop: {0}")]
    InvalidCrop(String),
    #[error("invalid rotation: {0} degrees")]
    InvalidRotation(f64),
    #[error("render failed: {0}")]
    RenderFailed(String),
}

impl From<SurfaceError> for ExtractError {
    fn from(err: SurfaceError) -> Self {
        match err {
            SurfaceError::Allocation { .. } => ExtractError::RenderFailed(err.to_string()),
            SurfaceError::OutOfBounds { .. } | SurfaceError::SourceOutOfBounds { .. } => {
                ExtractError::InvalidCrop(err.to_string())
            }
        }
    }
}

/// Size of the canvas crop coordinates refer to for a given rotation.
pub fn crop_space(source: Dimensions, rotation_degrees: f64) -> Dimensions {
    if is_identity_rotation(rotation_degrees) {
        source
    } else {
        rotated_canvas_size(source, rotation_degrees)
    }
}

/// Cut `crop` out of `source` rotated by `rotation_degrees`.
///
/// The returned raster is exactly `round(crop.width) × round(crop.height)`
/// and keeps the source's encoding family. Unrotated crops also keep the
/// source's pixel format; rotated crops are RGBA at the source's bit depth.
pub fn extract(
    source: RasterImage,
    crop: &CropRect,
    rotation_degrees: f64,
) -> Result<RasterImage, ExtractError> {
    if !rotation_degrees.is_finite() {
        return Err(ExtractError::InvalidRotation(rotation_degrees));
    }
    let rect = round_crop(crop).map_err(ExtractError::InvalidCrop)?;

    let source_dims = source.dimensions();
    let space = crop_space(source_dims, rotation_degrees);
    if !rect.fits_within(space) {
        return Err(ExtractError::InvalidCrop(format!(
            "crop {}×{} at ({}, {}) exceeds the {} canvas",
            rect.width, rect.height, rect.x, rect.y, space
        )));
    }

    let pixels = if is_identity_rotation(rotation_degrees) {
        source
            .pixels()
            .crop_imm(rect.x, rect.y, rect.width, rect.height)
    } else if is_high_depth(source.pixels()) {
        let src = source.pixels().to_rgba16();
        DynamicImage::ImageRgba16(render_rotated(&src, rect, space, rotation_degrees)?)
    } else {
        let src = source.pixels().to_rgba8();
        DynamicImage::ImageRgba8(render_rotated(&src, rect, space, rotation_degrees)?)
    };

    log::debug!(
        "extracted {}×{} at ({}, {}) from {} rotated {}°",
        rect.width,
        rect.height,
        rect.x,
        rect.y,
        source_dims,
        rotation_degrees
    );
    Ok(source.with_pixels(pixels))
}

fn is_high_depth(pixels: &DynamicImage) -> bool {
    let color = pixels.color();
    color.bytes_per_pixel() > color.channel_count()
}

/// Paint the rotated source into a crop-sized window and read it back.
fn render_rotated<S: Channel>(
    src: &RgbaBuffer<S>,
    rect: PixelRect,
    space: Dimensions,
    rotation_degrees: f64,
) -> Result<RgbaBuffer<S>, ExtractError>
where
    Rgba<S>: Pixel<Subpixel = S>,
{
    let (shift_x, shift_y) = (f64::from(rect.x), f64::from(rect.y));
    let centre = (f64::from(space.width) / 2.0, f64::from(space.height) / 2.0);
    let origin = (
        centre.0 - f64::from(src.width()) / 2.0 - shift_x,
        centre.1 - f64::from(src.height()) / 2.0 - shift_y,
    );

    let mut window = Canvas::<S>::new(rect.dimensions())?;
    window.rotate(
        radians(rotation_degrees),
        (centre.0 - shift_x, centre.1 - shift_y),
    );
    window.blit(src, PixelRect::new(0, 0, src.width(), src.height()), origin)?;
    Ok(window.read_pixels(PixelRect::new(0, 0, rect.width, rect.height))?)
}

/// Encode an extracted raster at crop-stage fidelity.
///
/// Lossless sources are written as PNG; lossy sources as JPEG at
/// `lossy_quality`. A lossless source never turns lossy here.
pub fn encode_extracted(
    backend: &impl ImageBackend,
    raster: &RasterImage,
    lossy_quality: Quality,
) -> Result<(Vec<u8>, OutputFormat), BackendError> {
    let format = raster.encoding().native_format();
    let bytes = backend.encode(raster.pixels(), format, lossy_quality)?;
    Ok((bytes, format))
}
