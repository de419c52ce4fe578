//! Parameter types for image operations.
//!
//! These structs describe *what* to do, not *how* to do it. They are the
//! interface between the pipeline stages ([`extract`](super::extract),
//! [`optimize`](super::optimize)) and the [`backend`](super::backend) that
//! does the actual decoding and encoding.
//!
//! ## Types
//!
//! - [`Quality`]: Lossy encoding quality as a fraction in `(0, 1]`. Clamped on construction.
//! - [`OutputFormat`]: Encoded container written by the backend (JPEG or PNG).
//! - [`SourceEncoding`]: Whether a raster came from a lossless or lossy file.
//! - [`CropRect`]: Editor-space crop rectangle, fractional pixels.
//! - [`PixelRect`]: Integer rectangle after rounding, used for all pixel reads.
//! - [`Dimensions`]: Width and height of a raster.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Quality setting for lossy image encoding, as a fraction in `(0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct Quality(f32);

impl Quality {
    /// Smallest quality the encoder is ever asked for (1 on the 1–100 scale).
    pub const MIN: Quality = Quality(0.01);
    /// Full fidelity, used by the optimizer's fast path.
    pub const FULL: Quality = Quality(1.0);
    /// Quality of the crop-stage JPEG written for lossy sources.
    pub const EXTRACTION: Quality = Quality(0.95);

    pub fn new(value: f32) -> Self {
        if value.is_nan() || value <= 0.0 {
            return Self::MIN;
        }
        Self(value.clamp(Self::MIN.0, 1.0))
    }

    pub fn value(self) -> f32 {
        self.0
    }

    /// Quality on the 1–100 scale used by JPEG encoders.
    pub fn percent(self) -> u8 {
        (self.0 * 100.0).round().clamp(1.0, 100.0) as u8
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

/// Encoded output container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Jpeg,
    Png,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "jpg",
            OutputFormat::Png => "png",
        }
    }
}

/// Encoding family of the file a raster was decoded from.
///
/// A lossless source keeps lossless output through the crop stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceEncoding {
    Lossless,
    Lossy,
}

impl SourceEncoding {
    /// Container that preserves this encoding family.
    pub fn native_format(self) -> OutputFormat {
        match self {
            SourceEncoding::Lossless => OutputFormat::Png,
            SourceEncoding::Lossy => OutputFormat::Jpeg,
        }
    }
}

/// Width and height of a raster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// `max(width, height)`.
    pub fn long_edge(self) -> u32 {
        self.width.max(self.height)
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}×{}", self.width, self.height)
    }
}

/// Crop rectangle as delivered by an editor, in post-rotation canvas pixels.
///
/// Values may be fractional; they are rounded before any pixel is read.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CropRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl CropRect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// A crop covering the whole of a `width × height` canvas.
    pub fn full(dims: Dimensions) -> Self {
        Self::new(0.0, 0.0, dims.width as f64, dims.height as f64)
    }
}

/// Integer rectangle in canvas pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl PixelRect {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn dimensions(self) -> Dimensions {
        Dimensions::new(self.width, self.height)
    }

    /// Whether the rectangle lies entirely inside a canvas of `bounds`.
    pub fn fits_within(self, bounds: Dimensions) -> bool {
        u64::from(self.x) + u64::from(self.width) <= u64::from(bounds.width)
            && u64::from(self.y) + u64::from(self.height) <= u64::from(bounds.height)
    }
}
