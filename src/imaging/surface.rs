//! Software raster surface used by the geometry extractor.
//!
//! [`RasterSurface`] is the small drawing capability the extractor needs:
//! set a rotation about a pivot, paint a source block at an origin, read a
//! block back. [`Canvas`] implements it over an RGBA buffer with bilinear
//! sampling for rotated draws and exact copies for unrotated, pixel-aligned
//! ones. Unpainted pixels stay fully transparent.
//!
//! The canvas is generic over its [`Channel`] type so 16-bit sources are
//! painted at 16 bits.

use super::params::{Dimensions, PixelRect};
use image::{ImageBuffer, Pixel, Primitive, Rgba};
use thiserror::Error;

/// Upper bound on canvas memory. A 10000×10000 source rotated 45° needs
/// roughly 800 MB at 8 bits; anything beyond this is refused outright.
const MAX_CANVAS_BYTES: u64 = 1 << 30;

/// RGBA pixel buffer with `S` subpixels.
pub type RgbaBuffer<S> = ImageBuffer<Rgba<S>, Vec<S>>;

/// Subpixel types a [`Canvas`] can hold.
pub trait Channel: Primitive + 'static {
    fn as_f64(self) -> f64;

    /// Round and saturate into the channel's range.
    fn from_f64_saturating(value: f64) -> Self;
}

impl Channel for u8 {
    fn as_f64(self) -> f64 {
        f64::from(self)
    }

    fn from_f64_saturating(value: f64) -> Self {
        value.round().clamp(0.0, f64::from(u8::MAX)) as u8
    }
}

impl Channel for u16 {
    fn as_f64(self) -> f64 {
        f64::from(self)
    }

    fn from_f64_saturating(value: f64) -> Self {
        value.round().clamp(0.0, f64::from(u16::MAX)) as u16
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SurfaceError {
    #[error("cannot allocate a {width}×{height} canvas")]
    Allocation { width: u32, height: u32 },
    #[error("region {rect:?} lies outside the {bounds} canvas")]
    OutOfBounds { rect: PixelRect, bounds: Dimensions },
    #[error("source region {rect:?} lies outside the {bounds} source")]
    SourceOutOfBounds { rect: PixelRect, bounds: Dimensions },
}

/// Imperative 2D drawing capability.
pub trait RasterSurface<S: Channel>
where
    Rgba<S>: Pixel<Subpixel = S>,
{
    /// Size of the drawable area.
    fn dimensions(&self) -> Dimensions;

    /// Rotate subsequent draws by `radians` (clockwise, y-down) about `pivot`.
    fn rotate(&mut self, radians: f64, pivot: (f64, f64));

    /// Paint `src_rect` of `src` with its top-left corner at `dst_origin`,
    /// through the current rotation.
    fn blit(
        &mut self,
        src: &RgbaBuffer<S>,
        src_rect: PixelRect,
        dst_origin: (f64, f64),
    ) -> Result<(), SurfaceError>;

    /// Copy a block of painted pixels out of the surface.
    fn read_pixels(&self, rect: PixelRect) -> Result<RgbaBuffer<S>, SurfaceError>;
}

/// RGBA software canvas.
pub struct Canvas<S: Channel = u8>
where
    Rgba<S>: Pixel<Subpixel = S>,
{
    buffer: RgbaBuffer<S>,
    rotation: f64,
    pivot: (f64, f64),
}

impl<S: Channel> Canvas<S>
where
    Rgba<S>: Pixel<Subpixel = S>,
{
    /// Allocate a transparent canvas, failing instead of aborting when the
    /// buffer cannot be reserved.
    pub fn new(dims: Dimensions) -> Result<Self, SurfaceError> {
        let alloc_err = SurfaceError::Allocation {
            width: dims.width,
            height: dims.height,
        };
        let subpixels = u64::from(dims.width) * u64::from(dims.height) * 4;
        let bytes = subpixels * std::mem::size_of::<S>() as u64;
        if dims.width == 0 || dims.height == 0 || bytes > MAX_CANVAS_BYTES {
            return Err(alloc_err);
        }

        let len = usize::try_from(subpixels).map_err(|_| alloc_err.clone())?;
        let mut raw: Vec<S> = Vec::new();
        raw.try_reserve_exact(len).map_err(|_| alloc_err.clone())?;
        raw.resize(len, S::DEFAULT_MIN_VALUE);

        let buffer = ImageBuffer::from_raw(dims.width, dims.height, raw).ok_or(alloc_err)?;
        Ok(Self {
            buffer,
            rotation: 0.0,
            pivot: (0.0, 0.0),
        })
    }

    fn is_axis_aligned(&self, origin: (f64, f64)) -> bool {
        self.rotation == 0.0 && origin.0.fract() == 0.0 && origin.1.fract() == 0.0
    }

    /// Unrotated, pixel-aligned draw: a straight copy with clipping.
    fn copy_block(&mut self, src: &RgbaBuffer<S>, src_rect: PixelRect, origin: (i64, i64)) {
        let canvas_w = i64::from(self.buffer.width());
        let canvas_h = i64::from(self.buffer.height());

        for row in 0..i64::from(src_rect.height) {
            let dy = origin.1 + row;
            if dy < 0 || dy >= canvas_h {
                continue;
            }
            for col in 0..i64::from(src_rect.width) {
                let dx = origin.0 + col;
                if dx < 0 || dx >= canvas_w {
                    continue;
                }
                let pixel = *src.get_pixel(src_rect.x + col as u32, src_rect.y + row as u32);
                self.buffer.put_pixel(dx as u32, dy as u32, pixel);
            }
        }
    }

    /// Rotated draw: inverse-map each covered canvas pixel back into the
    /// source block and sample bilinearly.
    fn sample_block(&mut self, src: &RgbaBuffer<S>, src_rect: PixelRect, origin: (f64, f64)) {
        let (sin, cos) = self.rotation.sin_cos();
        let (px, py) = self.pivot;
        let (ox, oy) = origin;
        let w = f64::from(src_rect.width);
        let h = f64::from(src_rect.height);

        // Forward-map the block corners to bound the pixels worth visiting.
        let corners = [(ox, oy), (ox + w, oy), (ox, oy + h), (ox + w, oy + h)];
        let (mut min_x, mut min_y) = (f64::INFINITY, f64::INFINITY);
        let (mut max_x, mut max_y) = (f64::NEG_INFINITY, f64::NEG_INFINITY);
        for (x, y) in corners {
            let (rx, ry) = (x - px, y - py);
            let fx = rx * cos - ry * sin + px;
            let fy = rx * sin + ry * cos + py;
            min_x = min_x.min(fx);
            min_y = min_y.min(fy);
            max_x = max_x.max(fx);
            max_y = max_y.max(fy);
        }

        let canvas_w = self.buffer.width();
        let canvas_h = self.buffer.height();
        let x0 = clamp_index(min_x.floor() - 1.0, canvas_w);
        let y0 = clamp_index(min_y.floor() - 1.0, canvas_h);
        let x1 = clamp_index(max_x.ceil() + 1.0, canvas_w);
        let y1 = clamp_index(max_y.ceil() + 1.0, canvas_h);

        // Grouped so a translated window samples bit-identically.
        let (off_x, off_y) = (px - ox, py - oy);
        for dy in y0..y1 {
            for dx in x0..x1 {
                let cx = f64::from(dx) + 0.5 - px;
                let cy = f64::from(dy) + 0.5 - py;
                // Inverse rotation back into the unrotated drawing space.
                let ux = cx * cos + cy * sin + off_x;
                let uy = -cx * sin + cy * cos + off_y;
                if ux < 0.0 || uy < 0.0 || ux >= w || uy >= h {
                    continue;
                }
                let pixel = bilinear(src, src_rect, ux - 0.5, uy - 0.5);
                self.buffer.put_pixel(dx, dy, pixel);
            }
        }
    }
}

fn clamp_index(value: f64, limit: u32) -> u32 {
    value.clamp(0.0, f64::from(limit)) as u32
}

/// Bilinear sample at block-local coordinates, clamping taps to the block.
fn bilinear<S: Channel>(src: &RgbaBuffer<S>, rect: PixelRect, x: f64, y: f64) -> Rgba<S>
where
    Rgba<S>: Pixel<Subpixel = S>,
{
    let max_x = f64::from(rect.width - 1);
    let max_y = f64::from(rect.height - 1);
    let x = x.clamp(0.0, max_x);
    let y = y.clamp(0.0, max_y);

    let x0 = x.floor();
    let y0 = y.floor();
    let x1 = (x0 + 1.0).min(max_x);
    let y1 = (y0 + 1.0).min(max_y);
    let tx = x - x0;
    let ty = y - y0;

    let tap = |sx: f64, sy: f64| src.get_pixel(rect.x + sx as u32, rect.y + sy as u32).0;
    let (p00, p10, p01, p11) = (tap(x0, y0), tap(x1, y0), tap(x0, y1), tap(x1, y1));

    let mut out = [S::DEFAULT_MIN_VALUE; 4];
    for (c, slot) in out.iter_mut().enumerate() {
        let top = p00[c].as_f64() * (1.0 - tx) + p10[c].as_f64() * tx;
        let bottom = p01[c].as_f64() * (1.0 - tx) + p11[c].as_f64() * tx;
        *slot = S::from_f64_saturating(top * (1.0 - ty) + bottom * ty);
    }
    Rgba(out)
}

impl<S: Channel> RasterSurface<S> for Canvas<S>
where
    Rgba<S>: Pixel<Subpixel = S>,
{
    fn dimensions(&self) -> Dimensions {
        Dimensions::new(self.buffer.width(), self.buffer.height())
    }

    fn rotate(&mut self, radians: f64, pivot: (f64, f64)) {
        self.rotation = radians;
        self.pivot = pivot;
    }

    fn blit(
        &mut self,
        src: &RgbaBuffer<S>,
        src_rect: PixelRect,
        dst_origin: (f64, f64),
    ) -> Result<(), SurfaceError> {
        let src_bounds = Dimensions::new(src.width(), src.height());
        if src_rect.width == 0 || src_rect.height == 0 || !src_rect.fits_within(src_bounds) {
            return Err(SurfaceError::SourceOutOfBounds {
                rect: src_rect,
                bounds: src_bounds,
            });
        }

        if self.is_axis_aligned(dst_origin) {
            self.copy_block(src, src_rect, (dst_origin.0 as i64, dst_origin.1 as i64));
        } else {
            self.sample_block(src, src_rect, dst_origin);
        }
        Ok(())
    }

    fn read_pixels(&self, rect: PixelRect) -> Result<RgbaBuffer<S>, SurfaceError> {
        let bounds = self.dimensions();
        if rect.width == 0 || rect.height == 0 || !rect.fits_within(bounds) {
            return Err(SurfaceError::OutOfBounds { rect, bounds });
        }
        Ok(image::imageops::crop_imm(&self.buffer, rect.x, rect.y, rect.width, rect.height)
            .to_image())
    }
}
