//! # fitcrop
//!
//! Crop, rotate and squeeze a photograph until it fits a byte budget.
//!
//! # Architecture: Three-Stage Pipeline
//!
//! Every image goes through three stages, strictly in order, each handing
//! its raster to the next by value:
//!
//! ```text
//! 1. Validate   bytes    →  dimensions       (format, upload size, pixel bounds)
//! 2. Extract    raster   →  cropped raster   (rotate about the centre, cut the crop)
//! 3. Optimize   raster   →  encoded bytes    (fast path, grid search, fallback)
//! ```
//!
//! The cropped raster is validated again with the same bounds before it is
//! optimized. Validation and extraction fail fast; the optimizer tolerates
//! individual encode failures and always produces output unless every
//! encode failed.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`validate`] | Source checks and per-side dimension bounds |
//! | [`imaging`] | Rotation canvas, extraction, codec backend, size-constrained optimizer |
//! | [`pipeline`] | Runs the stages for one image; crop-only and inspect variants |
//! | [`progress`] | Phase-relative progress, the plan that weights phases, cancellation |
//! | [`report`] | Compression statistics, quality tier, human-readable sizes |
//! | [`config`] | Layered `fitcrop.toml` loading, presets, validation |
//! | [`batch`] | Parallel directory processing with content-addressed output names |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Crop Coordinates Live in the Rotated Canvas
//!
//! An editor shows the photo rotated inside a canvas grown to hold it, and
//! the user draws the crop on that. The extractor reproduces exactly that
//! canvas geometry, so a crop made in the editor cuts the same pixels here.
//! Only the crop window is rasterised.
//!
//! ## First Fit, Largest First
//!
//! The optimizer prefers resolution over quality: it walks long-edge caps
//! from largest to smallest and, at each cap, qualities from highest to
//! lowest, stopping at the first encode that fits. A source that already
//! fits at full fidelity is returned untouched in its own format.
//!
//! ## Pure-Rust Codecs
//!
//! Decoding and encoding use the `image` crate only, behind the
//! [`imaging::ImageBackend`] trait, so tests swap in a recording mock and the
//! binary has no system dependencies.

pub mod batch;
pub mod config;
pub mod imaging;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod report;
pub mod validate;

#[cfg(test)]
pub(crate) mod test_helpers;
