//! Image processing: geometry extraction and size-constrained encoding.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Identify** | `image::ImageReader::into_dimensions` (header only) |
//! | **Decode** | `image::ImageReader::decode` (JPEG, PNG) |
//! | **Crop + rotate** | software [`Canvas`], bilinear inverse mapping |
//! | **Resample** | `DynamicImage::resize_exact` with Lanczos3 |
//! | **Encode** | `JpegEncoder` at the requested quality, `PngEncoder` |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for geometry and ladder math (unit testable)
//! - **Parameters**: Data structures describing image operations
//! - **Surface**: [`RasterSurface`] trait + the in-memory [`Canvas`]
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **Extract**: crop and rotation of a decoded raster
//! - **Optimize**: fast path, grid search and fallback against a byte budget

pub mod backend;
mod calculations;
pub mod extract;
pub mod optimize;
mod params;
mod raster;
pub mod rust_backend;
pub mod surface;

pub use backend::{BackendError, Identified, ImageBackend};
pub use calculations::{
    dimension_sequence, fit_long_edge, quality_sequence, rotated_bounds, rotated_canvas_size,
};
pub use extract::{ExtractError, crop_space, encode_extracted, extract};
pub use optimize::{
    OptimizationResult, OptimizeError, Optimizer, OptimizerSettings, Outcome, SizeBudget,
};
pub use params::{CropRect, Dimensions, OutputFormat, PixelRect, Quality, SourceEncoding};
pub use raster::RasterImage;
pub use rust_backend::{RustBackend, sniff_encoding};
pub use surface::{Canvas, RasterSurface, SurfaceError};
